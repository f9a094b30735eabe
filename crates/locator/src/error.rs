//! Resolver error and teardown-outcome types.

use quay_registry::RegistryError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by resolver mutations.
///
/// Reads never raise: an empty key resolves to nothing and a disposed
/// resolver reads as empty.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
	/// The resolver has been disposed; no further mutations are accepted.
	#[error("resolver has been disposed")]
	Disposed,

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

/// One failed teardown hook.
///
/// The hook's position preserves registration order, so a report can say
/// which teardown step failed.
#[derive(Debug, thiserror::Error)]
#[error("teardown hook #{hook} failed: {source}")]
pub struct DisposeError {
	pub hook: usize,
	pub source: BoxError,
}

/// Result of disposing a resolver.
///
/// Teardown failures are collected and reported rather than swallowed; the
/// registries are released either way.
#[derive(Debug)]
pub enum DisposeOutcome {
	/// Every teardown hook succeeded (or none were registered).
	Clean,
	/// One or more teardown hooks failed; the rest still ran.
	Faulted(Vec<DisposeError>),
}

impl DisposeOutcome {
	pub fn is_clean(&self) -> bool {
		matches!(self, Self::Clean)
	}

	/// The collected hook failures; empty for a clean outcome.
	pub fn errors(&self) -> &[DisposeError] {
		match self {
			Self::Clean => &[],
			Self::Faulted(errors) => errors,
		}
	}
}
