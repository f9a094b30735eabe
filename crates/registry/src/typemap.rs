//! `TypeId`-keyed memoization of per-value-type state.

use std::any::{Any, TypeId};
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// One slot per value type: the type-parameterized instance table.
///
/// Memoizes exactly one `R` per `TypeId`, so repeated lookups for the same
/// type return the same instance without re-resolving the association.
#[derive(Default)]
pub struct TypeMap {
	slots: FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TypeMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the memoized instance for `R`, if one exists.
	pub fn get<R: Any + Send + Sync>(&self) -> Option<Arc<R>> {
		let slot = self.slots.get(&TypeId::of::<R>())?.clone();
		Some(downcast_slot(slot))
	}

	/// Returns the memoized instance for `R`, creating it on first use.
	pub fn get_or_insert_with<R: Any + Send + Sync>(
		&mut self,
		make: impl FnOnce() -> Arc<R>,
	) -> Arc<R> {
		let slot = self
			.slots
			.entry(TypeId::of::<R>())
			.or_insert_with(|| {
				let made: Arc<dyn Any + Send + Sync> = make();
				made
			})
			.clone();
		downcast_slot(slot)
	}

	/// Number of memoized types.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

fn downcast_slot<R: Any + Send + Sync>(slot: Arc<dyn Any + Send + Sync>) -> Arc<R> {
	match slot.downcast::<R>() {
		Ok(typed) => typed,
		// Slots are keyed by TypeId, so a mismatch means the table itself
		// is corrupted.
		Err(_) => panic!("type table slot does not match its TypeId"),
	}
}
