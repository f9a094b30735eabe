//! Concurrent key-to-registrations map with a lock-free existence index.
//!
//! # Role
//!
//! [`KeyedRegistry`] maps keys to [`VersionedEntry`] lists and resolves
//! values against their published snapshots. A secondary existence index is
//! kept as a working set under the registry lock plus an atomically
//! republished membership snapshot, so "does any registration exist" never
//! takes a lock.
//!
//! # Invariants
//!
//! - A key is in the existence snapshot iff its entry holds at least one
//!   registration (eventually consistent under concurrent mutation).
//! - No key maps to an empty entry: a removal that drains an entry erases
//!   it from the map in the same critical section.
//! - Factories are never invoked while any lock is held.

use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::entry::{EntrySnapshot, RemoveLast, VersionedEntry};
use crate::registration::Registration;

/// Marker trait for registry key types.
pub trait RegistryKey: Eq + Hash + Clone + Send + Sync + 'static {}
impl<K> RegistryKey for K where K: Eq + Hash + Clone + Send + Sync + 'static {}

/// Marker trait for registry value types.
pub trait RegistryValue: Clone + Send + Sync + 'static {}
impl<V> RegistryValue for V where V: Clone + Send + Sync + 'static {}

struct Inner<K, V> {
	entries: FxHashMap<K, Arc<VersionedEntry<V>>>,
	live_keys: FxHashSet<K>,
}

/// Concurrent mapping from key to [`VersionedEntry`].
///
/// Mutations serialize on the registry-level write lock, which is distinct
/// from the per-entry locks. Reads clone the entry `Arc` under the read
/// lock and then work lock-free against the entry's published snapshot;
/// [`Self::has_any`] takes no lock at all.
pub struct KeyedRegistry<K, V> {
	inner: RwLock<Inner<K, V>>,
	existence: ArcSwap<FxHashSet<K>>,
}

impl<K: RegistryKey, V: RegistryValue> KeyedRegistry<K, V> {
	pub fn new() -> Self {
		Self {
			inner: RwLock::new(Inner {
				entries: FxHashMap::default(),
				live_keys: FxHashSet::default(),
			}),
			existence: ArcSwap::from_pointee(FxHashSet::default()),
		}
	}

	fn republish(&self, live_keys: &FxHashSet<K>) {
		self.existence.store(Arc::new(live_keys.clone()));
	}

	fn entry(&self, key: &K) -> Option<Arc<VersionedEntry<V>>> {
		self.inner.read().entries.get(key).cloned()
	}

	/// Appends a registration for `key`, creating the entry on first use.
	///
	/// The key's first registration inserts it into the existence set and
	/// republishes the membership snapshot.
	pub fn add(&self, key: K, registration: Registration<V>) {
		let mut guard = self.inner.write();
		let inner = &mut *guard;
		let entry = inner
			.entries
			.entry(key.clone())
			.or_insert_with(|| Arc::new(VersionedEntry::new()))
			.clone();
		entry.push(registration);
		if inner.live_keys.insert(key) {
			self.republish(&inner.live_keys);
		}
	}

	/// Removes the most recent registration for `key` (LIFO).
	///
	/// An entry drained by the removal is erased from the map and the
	/// existence set. Returns false if the key had no registrations.
	pub fn remove_last(&self, key: &K) -> bool {
		let mut guard = self.inner.write();
		let inner = &mut *guard;
		let Some(entry) = inner.entries.get(key) else {
			return false;
		};
		match entry.remove_last() {
			RemoveLast::Removed => true,
			RemoveLast::Emptied => {
				inner.entries.remove(key);
				inner.live_keys.remove(key);
				self.republish(&inner.live_keys);
				true
			}
			// Empty entries are erased eagerly, so a mapped entry is never
			// empty; kept for the exhaustive match.
			RemoveLast::AlreadyEmpty => false,
		}
	}

	/// Unconditionally removes every registration for `key`.
	///
	/// Returns false if the key had no registrations.
	pub fn remove_all(&self, key: &K) -> bool {
		let mut guard = self.inner.write();
		let inner = &mut *guard;
		if inner.entries.remove(key).is_none() {
			return false;
		}
		inner.live_keys.remove(key);
		self.republish(&inner.live_keys);
		true
	}

	/// Erases the entire registry; used when an owner is torn down.
	pub fn clear(&self) {
		let mut guard = self.inner.write();
		let inner = &mut *guard;
		inner.entries.clear();
		inner.live_keys.clear();
		self.republish(&inner.live_keys);
	}

	/// Point-in-time snapshot of `key`'s registrations, rebuilt if stale.
	pub fn registrations(&self, key: &K) -> Option<Arc<EntrySnapshot<V>>> {
		Some(self.entry(key)?.snapshot())
	}

	/// Resolves the most recently registered value for `key`.
	///
	/// Scans the snapshot from the tail, skipping registrations that
	/// resolve to nothing. Factories run with no locks held, and a factory
	/// panic propagates without unregistering the factory.
	pub fn resolve_last(&self, key: &K) -> Option<V> {
		let snap = self.registrations(key)?;
		snap.iter().rev().find_map(Registration::resolve)
	}

	/// Resolves every registered value for `key`, in registration order.
	///
	/// Factories are invoked once per call; memoization, if wanted, is the
	/// caller's concern. Absent results are skipped.
	pub fn resolve_all(&self, key: &K) -> Vec<V> {
		match self.registrations(key) {
			Some(snap) => snap.iter().filter_map(Registration::resolve).collect(),
			None => Vec::new(),
		}
	}

	/// Lock-free existence test against the published membership snapshot.
	///
	/// Eventually consistent: a call racing a mutation of the same key may
	/// see either answer, but never true for a key that was never
	/// registered.
	pub fn has_any(&self, key: &K) -> bool {
		self.existence.load().contains(key)
	}

	/// Current registration count for `key`.
	pub fn count(&self, key: &K) -> usize {
		self.entry(key).map_or(0, |entry| entry.len())
	}

	/// Keys that currently hold at least one registration.
	pub fn keys(&self) -> Vec<K> {
		self.existence.load().iter().cloned().collect()
	}

	/// Number of keys with at least one registration.
	pub fn len(&self) -> usize {
		self.existence.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Total registrations across all keys.
	pub fn total_registrations(&self) -> usize {
		let entries: Vec<_> = self.inner.read().entries.values().cloned().collect();
		entries.iter().map(|entry| entry.len()).sum()
	}

	/// Best-effort enumeration of every current registration across all
	/// keys, for teardown bookkeeping.
	///
	/// Not atomic across keys, and never invokes factories.
	pub fn snapshot_all_for_disposal(&self) -> Vec<Registration<V>> {
		let entries: Vec<_> = self.inner.read().entries.values().cloned().collect();
		let mut out = Vec::new();
		for entry in entries {
			out.extend(entry.snapshot().iter().cloned());
		}
		out
	}
}

impl<K: RegistryKey, V: RegistryValue> Default for KeyedRegistry<K, V> {
	fn default() -> Self {
		Self::new()
	}
}
