//! Public service keys.

use std::fmt;

/// The public key a service is registered under: an optional contract name.
///
/// Most services use the anonymous contract ([`Contract::default`]); named
/// contracts distinguish multiple registrations of the same value type. The
/// full public key is (value type, contract): the value type selects the
/// per-type registry, the contract is the key within it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Contract(Option<Box<str>>);

impl Contract {
	/// A named contract.
	pub fn named(name: impl Into<Box<str>>) -> Self {
		Self(Some(name.into()))
	}

	/// The contract name, or `None` for the anonymous contract.
	pub fn name(&self) -> Option<&str> {
		self.0.as_deref()
	}

	pub fn is_anonymous(&self) -> bool {
		self.0.is_none()
	}
}

impl From<&str> for Contract {
	fn from(name: &str) -> Self {
		Self::named(name)
	}
}

impl From<String> for Contract {
	fn from(name: String) -> Self {
		Self::named(name)
	}
}

impl From<Option<&str>> for Contract {
	fn from(name: Option<&str>) -> Self {
		name.map_or_else(Self::default, Self::named)
	}
}

impl fmt::Display for Contract {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.name() {
			Some(name) => f.write_str(name),
			None => f.write_str("(default)"),
		}
	}
}
