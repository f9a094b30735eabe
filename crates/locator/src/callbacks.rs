//! Change-notification subscriber table.
//!
//! Subscribers are keyed by an opaque token so they can be removed again.
//! Broadcasting clones the subscriber list out of the table first, so no
//! table lock (and no registry lock) is held while user callbacks run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::contract::Contract;

/// What a mutation did to a registration list.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChangeKind {
	/// A registration was appended.
	Registered,
	/// The most recent registration was removed.
	Unregistered,
	/// Every registration for the key was removed.
	Cleared,
}

/// One mutation, as reported to change subscribers.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
	/// Name of the registered value type.
	pub service: &'static str,
	pub contract: Contract,
	pub kind: ChangeKind,
}

/// Handle for unsubscribing a change callback.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CallbackToken(u64);

type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct CallbackRegistry {
	next: AtomicU64,
	subscribers: RwLock<FxHashMap<u64, ChangeCallback>>,
}

impl CallbackRegistry {
	pub(crate) fn subscribe(&self, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> CallbackToken {
		let token = self.next.fetch_add(1, Ordering::Relaxed);
		self.subscribers.write().insert(token, Arc::new(callback));
		CallbackToken(token)
	}

	/// Returns false if the token was already removed.
	pub(crate) fn remove(&self, token: CallbackToken) -> bool {
		self.subscribers.write().remove(&token.0).is_some()
	}

	/// Invokes every subscriber with no locks held.
	pub(crate) fn broadcast(&self, event: &ChangeEvent) {
		let subscribers: Vec<ChangeCallback> = self.subscribers.read().values().cloned().collect();
		for subscriber in subscribers {
			subscriber(event);
		}
	}

	pub(crate) fn clear(&self) {
		self.subscribers.write().clear();
	}
}
