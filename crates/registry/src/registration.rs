//! Registration payloads: a pre-built value or a deferred factory.

use std::fmt;
use std::sync::Arc;

/// Zero-argument producer for a registered value.
///
/// A factory may legitimately produce `None`; resolution skips such results.
pub type FactoryFn<V> = Arc<dyn Fn() -> Option<V> + Send + Sync>;

/// One registered value for a key: a concrete instance or a factory that
/// produces the value on demand.
///
/// The variant is fixed at construction and never changes. Invoking a stored
/// factory is entirely the caller's responsibility; panics raised by the
/// factory propagate uncaught.
pub enum Registration<V> {
	/// A pre-built value, cloned out on resolution.
	Instance(V),
	/// A deferred producer, invoked once per resolution.
	Factory(FactoryFn<V>),
}

impl<V> Registration<V> {
	/// Wraps a pre-built value.
	pub fn from_instance(value: V) -> Self {
		Self::Instance(value)
	}

	/// Wraps a factory.
	pub fn from_factory(factory: FactoryFn<V>) -> Self {
		Self::Factory(factory)
	}

	/// Returns true if this registration defers to a factory.
	pub fn is_factory(&self) -> bool {
		matches!(self, Self::Factory(_))
	}

	/// Returns the stored instance, or `None` for factory registrations.
	pub fn instance(&self) -> Option<&V> {
		match self {
			Self::Instance(value) => Some(value),
			Self::Factory(_) => None,
		}
	}

	/// Returns the stored factory, or `None` for instance registrations.
	pub fn factory(&self) -> Option<&FactoryFn<V>> {
		match self {
			Self::Instance(_) => None,
			Self::Factory(factory) => Some(factory),
		}
	}
}

impl<V: Clone> Registration<V> {
	/// Produces the registered value: clones an instance or invokes the
	/// factory. Factories may produce `None`.
	pub fn resolve(&self) -> Option<V> {
		match self {
			Self::Instance(value) => Some(value.clone()),
			Self::Factory(factory) => factory(),
		}
	}
}

impl<V: Clone> Clone for Registration<V> {
	fn clone(&self) -> Self {
		match self {
			Self::Instance(value) => Self::Instance(value.clone()),
			Self::Factory(factory) => Self::Factory(factory.clone()),
		}
	}
}

impl<V: fmt::Debug> fmt::Debug for Registration<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Instance(value) => f.debug_tuple("Instance").field(value).finish(),
			Self::Factory(_) => f.debug_tuple("Factory").finish(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[test]
	fn test_instance_accessors() {
		let reg = Registration::from_instance(42u32);
		assert!(!reg.is_factory());
		assert_eq!(reg.instance(), Some(&42));
		assert!(reg.factory().is_none());
		assert_eq!(reg.resolve(), Some(42));
	}

	#[test]
	fn test_factory_accessors() {
		let reg: Registration<u32> = Registration::from_factory(Arc::new(|| Some(7)));
		assert!(reg.is_factory());
		assert!(reg.instance().is_none());
		assert!(reg.factory().is_some());
		assert_eq!(reg.resolve(), Some(7));
	}

	/// A factory is invoked on every resolution; nothing memoizes here.
	#[test]
	fn test_factory_reinvocation() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let reg: Registration<usize> = Registration::from_factory(Arc::new(move || {
			Some(counter.fetch_add(1, Ordering::Relaxed))
		}));

		assert_eq!(reg.resolve(), Some(0));
		assert_eq!(reg.resolve(), Some(1));
		assert_eq!(calls.load(Ordering::Relaxed), 2);
	}

	/// A factory may produce nothing; resolution reports that as absent.
	#[test]
	fn test_factory_absent_result() {
		let reg: Registration<u32> = Registration::from_factory(Arc::new(|| None));
		assert_eq!(reg.resolve(), None);
	}

	/// Cloning a factory registration shares the underlying factory.
	#[test]
	fn test_clone_shares_factory() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let reg: Registration<u32> = Registration::from_factory(Arc::new(move || {
			counter.fetch_add(1, Ordering::Relaxed);
			Some(1)
		}));

		let cloned = reg.clone();
		reg.resolve();
		cloned.resolve();
		assert_eq!(calls.load(Ordering::Relaxed), 2);
	}
}
