//! Owner-scoped registry cache.
//!
//! # Role
//!
//! Maps opaque owner tokens to private per-value-type [`KeyedRegistry`]
//! instances. Registries for different owners are fully isolated; an
//! owner's registries live exactly until the owner is released.
//!
//! # Invariants
//!
//! - At most one registry exists per (owner, value type); racing first
//!   lookups observe a single instance.
//! - The arena holds only the owner's token, never the owning object, so
//!   it cannot extend the owner's lifetime.
//! - Releasing an owner is idempotent and never fails.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::RegistryError;
use crate::keyed::{KeyedRegistry, RegistryKey, RegistryValue};
use crate::typemap::TypeMap;

/// Opaque identity of one logical container instance.
///
/// Allocated by [`RegistryArena::create_owner`] and never reused within an
/// arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OwnerId(u64);

impl std::fmt::Display for OwnerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "owner#{}", self.0)
	}
}

/// Type-erased view of one owner's registry, used on the teardown path.
pub trait RegistryHandle: Send + Sync {
	/// Name of the registry's value type.
	fn type_name(&self) -> &'static str;

	/// Number of keys with at least one registration.
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Total registrations across all keys.
	fn total_registrations(&self) -> usize;

	/// Number of pre-built instances, counted without invoking factories.
	fn instance_count(&self) -> usize;

	/// Erases every registration.
	fn clear(&self);
}

impl<K: RegistryKey, V: RegistryValue> RegistryHandle for KeyedRegistry<K, V> {
	fn type_name(&self) -> &'static str {
		type_name::<V>()
	}

	fn len(&self) -> usize {
		KeyedRegistry::len(self)
	}

	fn total_registrations(&self) -> usize {
		KeyedRegistry::total_registrations(self)
	}

	fn instance_count(&self) -> usize {
		self.snapshot_all_for_disposal()
			.iter()
			.filter(|reg| !reg.is_factory())
			.count()
	}

	fn clear(&self) {
		KeyedRegistry::clear(self)
	}
}

#[derive(Default)]
struct OwnerSlot {
	registries: TypeMap,
	handles: Vec<Arc<dyn RegistryHandle>>,
}

/// Explicit arena mapping owners to their per-value-type registries.
///
/// Owners are created and released explicitly; there is no finalizer or
/// weak-reference machinery to wait on, and releasing an owner makes its
/// registries unreachable through the arena immediately.
pub struct RegistryArena<K> {
	next_owner: AtomicU64,
	slots: RwLock<FxHashMap<OwnerId, OwnerSlot>>,
	marker: PhantomData<fn(K)>,
}

impl<K: RegistryKey> RegistryArena<K> {
	pub fn new() -> Self {
		Self {
			next_owner: AtomicU64::new(1),
			slots: RwLock::new(FxHashMap::default()),
			marker: PhantomData,
		}
	}

	/// Registers a new live owner and returns its token.
	pub fn create_owner(&self) -> OwnerId {
		let owner = OwnerId(self.next_owner.fetch_add(1, Ordering::Relaxed));
		self.slots.write().insert(owner, OwnerSlot::default());
		owner
	}

	/// Returns the registry scoped to `owner` for value type `V`, creating
	/// it on first use.
	///
	/// Repeated calls for the same owner and type return the same instance.
	/// Concurrent first calls race on the write lock and all observe the
	/// single winner; no duplicate registry is ever handed out.
	pub fn registry_for<V: RegistryValue>(
		&self,
		owner: OwnerId,
	) -> Result<Arc<KeyedRegistry<K, V>>, RegistryError> {
		{
			let slots = self.slots.read();
			let slot = slots
				.get(&owner)
				.ok_or(RegistryError::OwnerReleased(owner))?;
			if let Some(registry) = slot.registries.get::<KeyedRegistry<K, V>>() {
				return Ok(registry);
			}
		}

		let mut slots = self.slots.write();
		let slot = slots
			.get_mut(&owner)
			.ok_or(RegistryError::OwnerReleased(owner))?;
		let mut created = None;
		let registry = slot.registries.get_or_insert_with(|| {
			let registry = Arc::new(KeyedRegistry::new());
			created = Some(registry.clone());
			registry
		});
		if let Some(new_registry) = created {
			slot.handles.push(new_registry);
		}
		Ok(registry)
	}

	/// True while `owner` has not been released.
	pub fn is_live(&self, owner: OwnerId) -> bool {
		self.slots.read().contains_key(&owner)
	}

	/// Number of live owners.
	pub fn owner_count(&self) -> usize {
		self.slots.read().len()
	}

	/// Releases `owner`, handing back type-erased handles to its
	/// registries for deterministic teardown.
	///
	/// Idempotent: releasing an unknown or already-released owner returns
	/// no handles. Registry handles held elsewhere keep working; they are
	/// simply no longer reachable through the arena.
	pub fn release_owner(&self, owner: OwnerId) -> Vec<Arc<dyn RegistryHandle>> {
		match self.slots.write().remove(&owner) {
			Some(slot) => slot.handles,
			None => Vec::new(),
		}
	}
}

impl<K: RegistryKey> Default for RegistryArena<K> {
	fn default() -> Self {
		Self::new()
	}
}
