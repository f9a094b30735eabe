//! The resolver facade: one logical container instance over the registry core.
//!
//! # Role
//!
//! A [`Resolver`] owns one arena owner token and orchestrates the public
//! register/unregister/resolve verbs over the per-type registries scoped to
//! it. Memoization (lazy singletons), change broadcasting, and teardown
//! bookkeeping all live here; the core registries stay pure data structures.
//!
//! # Invariants
//!
//! - Change callbacks run after the mutation is visible, with no registry
//!   locks held.
//! - Disposal is idempotent, releases every registry of the owner, and
//!   reports teardown-hook failures instead of swallowing them.
//! - A disposed resolver rejects mutations and reads as empty.

use std::any::type_name;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use quay_registry::{KeyedRegistry, OwnerId, Registration, RegistryArena, RegistryValue};

use crate::callbacks::{CallbackRegistry, CallbackToken, ChangeEvent, ChangeKind};
use crate::contract::Contract;
use crate::error::{BoxError, DisposeError, DisposeOutcome, ResolverError};

type TeardownHook = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// One logical container instance.
///
/// Every resolver is scoped to its own arena owner: registrations made
/// through one resolver are invisible to every other, even when resolvers
/// share an arena.
pub struct Resolver {
	arena: Arc<RegistryArena<Contract>>,
	owner: OwnerId,
	disposed: AtomicBool,
	callbacks: CallbackRegistry,
	teardown: Mutex<Vec<TeardownHook>>,
}

impl Resolver {
	/// A resolver over its own private arena.
	pub fn new() -> Self {
		Self::with_arena(Arc::new(RegistryArena::new()))
	}

	/// A resolver over a shared arena. Isolation between resolvers holds
	/// either way; sharing only pools their storage.
	pub fn with_arena(arena: Arc<RegistryArena<Contract>>) -> Self {
		let owner = arena.create_owner();
		Self {
			arena,
			owner,
			disposed: AtomicBool::new(false),
			callbacks: CallbackRegistry::default(),
			teardown: Mutex::new(Vec::new()),
		}
	}

	/// The arena owner token backing this resolver.
	pub fn owner(&self) -> OwnerId {
		self.owner
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	fn registry<V: RegistryValue>(&self) -> Result<Arc<KeyedRegistry<Contract, V>>, ResolverError> {
		if self.is_disposed() {
			return Err(ResolverError::Disposed);
		}
		Ok(self.arena.registry_for::<V>(self.owner)?)
	}

	/// Read-path registry lookup: a disposed or released owner degrades to
	/// an absent registry rather than an error.
	fn read_registry<V: RegistryValue>(&self) -> Option<Arc<KeyedRegistry<Contract, V>>> {
		self.arena.registry_for::<V>(self.owner).ok()
	}

	fn notify<V>(&self, contract: Contract, kind: ChangeKind) {
		self.callbacks.broadcast(&ChangeEvent {
			service: type_name::<V>(),
			contract,
			kind,
		});
	}

	/// Registers a pre-built value for `contract`.
	pub fn register_instance<V: RegistryValue>(
		&self,
		contract: impl Into<Contract>,
		value: V,
	) -> Result<(), ResolverError> {
		let contract = contract.into();
		self.registry::<V>()?
			.add(contract.clone(), Registration::from_instance(value));
		tracing::debug!(service = type_name::<V>(), contract = %contract, "registered instance");
		self.notify::<V>(contract, ChangeKind::Registered);
		Ok(())
	}

	/// Registers a factory, invoked on every resolution.
	///
	/// The factory may produce `None`; resolution skips such results. It is
	/// invoked with no locks held, so it may itself register services; it
	/// observes its own registration only after it returns.
	pub fn register_factory<V: RegistryValue>(
		&self,
		contract: impl Into<Contract>,
		factory: impl Fn() -> Option<V> + Send + Sync + 'static,
	) -> Result<(), ResolverError> {
		let contract = contract.into();
		self.registry::<V>()?
			.add(contract.clone(), Registration::from_factory(Arc::new(factory)));
		tracing::debug!(service = type_name::<V>(), contract = %contract, "registered factory");
		self.notify::<V>(contract, ChangeKind::Registered);
		Ok(())
	}

	/// Registers a factory whose first product is cached and reused.
	///
	/// The memoization lives in this wrapper; the core registry still sees
	/// an ordinary factory and invokes it per resolution, but every
	/// invocation after the first returns the cached value.
	pub fn register_lazy_singleton<V: RegistryValue>(
		&self,
		contract: impl Into<Contract>,
		init: impl Fn() -> V + Send + Sync + 'static,
	) -> Result<(), ResolverError> {
		let cell: Arc<Mutex<Option<V>>> = Arc::new(Mutex::new(None));
		self.register_factory(contract, move || {
			Some(cell.lock().get_or_insert_with(&init).clone())
		})
	}

	/// Removes the most recent registration for `contract` (LIFO).
	///
	/// A no-op (no registration to remove) broadcasts nothing.
	pub fn unregister_current<V: RegistryValue>(
		&self,
		contract: impl Into<Contract>,
	) -> Result<(), ResolverError> {
		let contract = contract.into();
		if self.registry::<V>()?.remove_last(&contract) {
			tracing::debug!(service = type_name::<V>(), contract = %contract, "unregistered current");
			self.notify::<V>(contract, ChangeKind::Unregistered);
		}
		Ok(())
	}

	/// Removes every registration for `contract`.
	pub fn unregister_all<V: RegistryValue>(
		&self,
		contract: impl Into<Contract>,
	) -> Result<(), ResolverError> {
		let contract = contract.into();
		if self.registry::<V>()?.remove_all(&contract) {
			tracing::debug!(service = type_name::<V>(), contract = %contract, "unregistered all");
			self.notify::<V>(contract, ChangeKind::Cleared);
		}
		Ok(())
	}

	/// Resolves the most recently registered value for `contract`.
	pub fn resolve<V: RegistryValue>(&self, contract: impl Into<Contract>) -> Option<V> {
		self.read_registry::<V>()?.resolve_last(&contract.into())
	}

	/// Resolves every registered value for `contract`, in registration order.
	pub fn resolve_all<V: RegistryValue>(&self, contract: impl Into<Contract>) -> Vec<V> {
		match self.read_registry::<V>() {
			Some(registry) => registry.resolve_all(&contract.into()),
			None => Vec::new(),
		}
	}

	/// True if `contract` currently has at least one registration.
	pub fn has_registration<V: RegistryValue>(&self, contract: impl Into<Contract>) -> bool {
		self.read_registry::<V>()
			.is_some_and(|registry| registry.has_any(&contract.into()))
	}

	/// Current registration count for `contract`.
	pub fn registration_count<V: RegistryValue>(&self, contract: impl Into<Contract>) -> usize {
		self.read_registry::<V>()
			.map_or(0, |registry| registry.count(&contract.into()))
	}

	/// Subscribes to mutation events. Callbacks run after each mutation
	/// completes, with no registry locks held.
	pub fn on_change(&self, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> CallbackToken {
		self.callbacks.subscribe(callback)
	}

	/// Unsubscribes a change callback; false if already removed.
	pub fn remove_callback(&self, token: CallbackToken) -> bool {
		self.callbacks.remove(token)
	}

	/// Registers a hook to run during disposal, in registration order.
	pub fn on_teardown(
		&self,
		hook: impl FnOnce() -> Result<(), BoxError> + Send + 'static,
	) -> Result<(), ResolverError> {
		if self.is_disposed() {
			return Err(ResolverError::Disposed);
		}
		self.teardown.lock().push(Box::new(hook));
		Ok(())
	}

	/// Disposes the resolver: runs every teardown hook, then clears and
	/// releases every registry of this owner.
	///
	/// Hook failures are collected into [`DisposeOutcome::Faulted`]; a
	/// failing hook never prevents later hooks or the registry release from
	/// running. Idempotent: the second and later calls do nothing and
	/// report [`DisposeOutcome::Clean`].
	pub fn dispose(&self) -> DisposeOutcome {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return DisposeOutcome::Clean;
		}

		let hooks = std::mem::take(&mut *self.teardown.lock());
		let mut errors = Vec::new();
		for (hook, run) in hooks.into_iter().enumerate() {
			if let Err(source) = run() {
				errors.push(DisposeError { hook, source });
			}
		}

		for handle in self.arena.release_owner(self.owner) {
			tracing::debug!(
				service = handle.type_name(),
				registrations = handle.total_registrations(),
				"releasing registry"
			);
			handle.clear();
		}
		self.callbacks.clear();

		if errors.is_empty() {
			DisposeOutcome::Clean
		} else {
			DisposeOutcome::Faulted(errors)
		}
	}
}

impl Default for Resolver {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Resolver {
	fn drop(&mut self) {
		if self.is_disposed() {
			return;
		}
		if let DisposeOutcome::Faulted(errors) = self.dispose() {
			tracing::warn!(failures = errors.len(), "resolver dropped with failing teardown hooks");
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	/// The end-to-end scenario over the public verbs: register, resolve,
	/// pop, clear.
	#[test]
	fn test_register_resolve_unregister_scenario() {
		let resolver = Resolver::new();
		for v in [1u32, 2, 3] {
			resolver.register_instance("svc", v).unwrap();
		}

		assert_eq!(resolver.resolve_all::<u32>("svc"), vec![1, 2, 3]);
		assert_eq!(resolver.resolve::<u32>("svc"), Some(3));
		assert_eq!(resolver.registration_count::<u32>("svc"), 3);
		assert!(resolver.has_registration::<u32>("svc"));

		resolver.unregister_current::<u32>("svc").unwrap();
		assert_eq!(resolver.resolve::<u32>("svc"), Some(2));

		resolver.unregister_all::<u32>("svc").unwrap();
		assert!(!resolver.has_registration::<u32>("svc"));
		assert_eq!(resolver.resolve_all::<u32>("svc"), Vec::<u32>::new());
	}

	/// The anonymous contract and a named contract are distinct keys, and
	/// distinct value types never collide.
	#[test]
	fn test_contracts_and_types_are_distinct() {
		let resolver = Resolver::new();
		resolver.register_instance(Contract::default(), 1u32).unwrap();
		resolver.register_instance("named", 2u32).unwrap();
		resolver
			.register_instance(Contract::default(), "s".to_string())
			.unwrap();

		assert_eq!(resolver.resolve::<u32>(Contract::default()), Some(1));
		assert_eq!(resolver.resolve::<u32>("named"), Some(2));
		assert_eq!(resolver.resolve::<String>(Contract::default()), Some("s".to_string()));
		assert_eq!(resolver.resolve::<String>("named"), None);
	}

	/// A plain factory runs once per resolution.
	#[test]
	fn test_factory_runs_per_resolution() {
		let resolver = Resolver::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		resolver
			.register_factory("svc", move || Some(counter.fetch_add(1, Ordering::Relaxed)))
			.unwrap();

		assert_eq!(resolver.resolve::<usize>("svc"), Some(0));
		assert_eq!(resolver.resolve::<usize>("svc"), Some(1));
		assert_eq!(calls.load(Ordering::Relaxed), 2);
	}

	/// A lazy singleton initializer runs at most once, even when the first
	/// resolutions race.
	#[test]
	fn test_lazy_singleton_initializes_once() {
		let resolver = Arc::new(Resolver::new());
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		resolver
			.register_lazy_singleton("svc", move || {
				counter.fetch_add(1, Ordering::Relaxed);
				42u32
			})
			.unwrap();

		let threads: Vec<_> = (0..8)
			.map(|_| {
				let resolver = resolver.clone();
				std::thread::spawn(move || resolver.resolve::<u32>("svc"))
			})
			.collect();
		for thread in threads {
			assert_eq!(thread.join().unwrap(), Some(42));
		}

		assert_eq!(resolver.resolve::<u32>("svc"), Some(42));
		assert_eq!(calls.load(Ordering::Relaxed), 1);
	}

	/// Each mutation broadcasts exactly one event of the right kind, after
	/// the mutation is visible through the registry.
	#[test]
	fn test_change_notifications() {
		let resolver = Resolver::new();
		let events: Arc<Mutex<Vec<(String, ChangeKind)>>> = Arc::new(Mutex::new(Vec::new()));
		let sink = events.clone();
		let token = resolver.on_change(move |event| {
			sink.lock().push((event.contract.to_string(), event.kind));
		});

		resolver.register_instance("svc", 1u32).unwrap();
		resolver.register_instance("svc", 2u32).unwrap();
		resolver.unregister_current::<u32>("svc").unwrap();
		resolver.unregister_all::<u32>("svc").unwrap();

		// A removal with nothing to remove is a no-op and broadcasts nothing.
		resolver.unregister_current::<u32>("svc").unwrap();
		resolver.unregister_all::<u32>("svc").unwrap();

		assert_eq!(
			*events.lock(),
			vec![
				("svc".to_string(), ChangeKind::Registered),
				("svc".to_string(), ChangeKind::Registered),
				("svc".to_string(), ChangeKind::Unregistered),
				("svc".to_string(), ChangeKind::Cleared),
			]
		);

		assert!(resolver.remove_callback(token));
		resolver.register_instance("svc", 3u32).unwrap();
		assert_eq!(events.lock().len(), 4);
	}

	/// The event fires only after the mutation is observable.
	#[test]
	fn test_notification_after_mutation_visible() {
		let arena = Arc::new(RegistryArena::new());
		let resolver = Resolver::with_arena(arena.clone());
		let owner = resolver.owner();

		let observed = Arc::new(Mutex::new(Vec::new()));
		let sink = observed.clone();
		resolver.on_change(move |event| {
			let registry = arena.registry_for::<u32>(owner).unwrap();
			sink.lock().push((event.kind, registry.resolve_last(&event.contract)));
		});

		resolver.register_instance("svc", 7u32).unwrap();
		resolver.unregister_current::<u32>("svc").unwrap();

		assert_eq!(
			*observed.lock(),
			vec![(ChangeKind::Registered, Some(7)), (ChangeKind::Unregistered, None)]
		);
	}

	/// Resolvers sharing one arena stay fully isolated.
	#[test]
	fn test_isolation_across_shared_arena() {
		let arena = Arc::new(RegistryArena::new());
		let a = Resolver::with_arena(arena.clone());
		let b = Resolver::with_arena(arena.clone());

		a.register_instance("svc", 1u32).unwrap();

		assert_eq!(b.resolve::<u32>("svc"), None);
		assert!(!b.has_registration::<u32>("svc"));
		assert_eq!(a.resolve::<u32>("svc"), Some(1));
		assert_eq!(arena.owner_count(), 2);
	}

	/// Disposal runs hooks in registration order, reports the failures, and
	/// still releases the registries. Later calls are no-ops.
	#[test]
	fn test_dispose_collects_hook_failures() {
		let arena = Arc::new(RegistryArena::new());
		let resolver = Resolver::with_arena(arena.clone());
		resolver.register_instance("svc", 1u32).unwrap();

		let ran: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
		let first = ran.clone();
		resolver
			.on_teardown(move || {
				first.lock().push("first");
				Ok(())
			})
			.unwrap();
		resolver
			.on_teardown(|| Err("connection still open".into()))
			.unwrap();
		let last = ran.clone();
		resolver
			.on_teardown(move || {
				last.lock().push("last");
				Ok(())
			})
			.unwrap();

		let outcome = resolver.dispose();
		assert!(!outcome.is_clean());
		let errors = outcome.errors();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].hook, 1);
		assert!(errors[0].to_string().contains("connection still open"));

		// The failing hook did not stop the others or the release.
		assert_eq!(*ran.lock(), vec!["first", "last"]);
		assert_eq!(arena.owner_count(), 0);
		assert!(resolver.is_disposed());

		// Disposed: mutations fail, reads are empty, re-dispose is a no-op.
		assert!(matches!(
			resolver.register_instance("svc", 2u32),
			Err(ResolverError::Disposed)
		));
		assert!(matches!(resolver.on_teardown(|| Ok(())), Err(ResolverError::Disposed)));
		assert_eq!(resolver.resolve::<u32>("svc"), None);
		assert_eq!(resolver.resolve_all::<u32>("svc"), Vec::<u32>::new());
		assert!(!resolver.has_registration::<u32>("svc"));
		assert_eq!(resolver.registration_count::<u32>("svc"), 0);
		assert!(resolver.dispose().is_clean());
	}

	/// Disposal never invokes registered factories.
	#[test]
	fn test_dispose_does_not_invoke_factories() {
		let resolver = Resolver::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		resolver
			.register_factory("svc", move || Some(counter.fetch_add(1, Ordering::Relaxed)))
			.unwrap();

		assert!(resolver.dispose().is_clean());
		assert_eq!(calls.load(Ordering::Relaxed), 0);
	}

	/// Dropping an undisposed resolver releases its owner.
	#[test]
	fn test_drop_disposes() {
		let arena = Arc::new(RegistryArena::new());
		{
			let resolver = Resolver::with_arena(arena.clone());
			resolver.register_instance("svc", 1u32).unwrap();
			assert_eq!(arena.owner_count(), 1);
		}
		assert_eq!(arena.owner_count(), 0);
	}
}
