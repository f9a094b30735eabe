//! Versioned registration lists with lazily rebuilt snapshots.
//!
//! # Role
//!
//! [`VersionedEntry`] is the concurrency primitive behind every key: a
//! mutable registration list, a monotonic version counter, and an atomically
//! published snapshot tagged with the version it was built from.
//!
//! # Invariants
//!
//! - A published snapshot is trusted iff its version equals the entry's
//!   current version; any mismatch means stale, rebuild before use.
//! - Snapshots are immutable once published. They are replaced, never
//!   mutated in place, so a reader can never observe a torn list.
//! - Every mutation bumps the version exactly once, under the entry lock.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::registration::Registration;

/// Immutable point-in-time view of an entry's registration list.
///
/// Derefs to the registration slice in registration order.
pub struct EntrySnapshot<V> {
	version: u64,
	items: Box<[Registration<V>]>,
}

impl<V> EntrySnapshot<V> {
	/// The entry version this snapshot was built from.
	pub fn version(&self) -> u64 {
		self.version
	}
}

impl<V> Deref for EntrySnapshot<V> {
	type Target = [Registration<V>];

	fn deref(&self) -> &[Registration<V>] {
		&self.items
	}
}

/// Outcome of a LIFO removal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RemoveLast {
	/// Tail registration removed; others remain.
	Removed,
	/// Tail registration removed and the list is now empty.
	Emptied,
	/// The list was already empty; nothing changed.
	AlreadyEmpty,
}

/// Ordered registration list for one key, with an amortized O(1) read path.
///
/// Mutations are O(1) and bump the version without touching the snapshot.
/// The snapshot is rebuilt lazily on read, at most once per version bump, no
/// matter how many readers hit the stale window.
pub struct VersionedEntry<V> {
	regs: Mutex<Vec<Registration<V>>>,
	version: AtomicU64,
	snap: ArcSwapOption<EntrySnapshot<V>>,
}

impl<V: Clone> VersionedEntry<V> {
	pub fn new() -> Self {
		Self {
			regs: Mutex::new(Vec::new()),
			version: AtomicU64::new(0),
			snap: ArcSwapOption::empty(),
		}
	}

	/// Appends a registration and bumps the version.
	///
	/// Never rebuilds the snapshot; the next read pays for that.
	pub fn push(&self, registration: Registration<V>) {
		let mut regs = self.regs.lock();
		regs.push(registration);
		self.version.fetch_add(1, Ordering::Release);
	}

	/// Removes the most recent registration and bumps the version.
	///
	/// No-op if the list is already empty.
	pub fn remove_last(&self) -> RemoveLast {
		let mut regs = self.regs.lock();
		if regs.pop().is_none() {
			return RemoveLast::AlreadyEmpty;
		}
		self.version.fetch_add(1, Ordering::Release);
		if regs.is_empty() {
			RemoveLast::Emptied
		} else {
			RemoveLast::Removed
		}
	}

	/// Returns the current snapshot, rebuilding it if stale.
	///
	/// Fast path: an acquire load of the version plus the published
	/// snapshot, no lock taken. Slow path: take the entry lock, re-check
	/// (another thread may have rebuilt while this one waited), then
	/// materialize and publish a fresh copy of the list.
	pub fn snapshot(&self) -> Arc<EntrySnapshot<V>> {
		let version = self.version.load(Ordering::Acquire);
		if let Some(snap) = self.snap.load_full() {
			if snap.version == version {
				return snap;
			}
		}
		self.rebuild()
	}

	fn rebuild(&self) -> Arc<EntrySnapshot<V>> {
		let regs = self.regs.lock();
		// The version cannot move while the entry lock is held; mutations
		// bump it under the same lock.
		let version = self.version.load(Ordering::Acquire);
		if let Some(snap) = self.snap.load_full() {
			if snap.version == version {
				return snap;
			}
		}
		let snap = Arc::new(EntrySnapshot {
			version,
			items: regs.iter().cloned().collect(),
		});
		self.snap.store(Some(snap.clone()));
		snap
	}

	/// Current registration count, preferring the published snapshot when
	/// it is fresh.
	pub fn len(&self) -> usize {
		let version = self.version.load(Ordering::Acquire);
		if let Some(snap) = self.snap.load_full() {
			if snap.version == version {
				return snap.len();
			}
		}
		self.regs.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Current version; bumped on every mutation.
	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}
}

impl<V: Clone> Default for VersionedEntry<V> {
	fn default() -> Self {
		Self::new()
	}
}
