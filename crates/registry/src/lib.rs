//! Owner-scoped, versioned-snapshot service registries.
//!
//! # Mental Model
//!
//! 1. **Registration:** a [`Registration`] holds either a pre-built value or
//!    a factory that produces one on demand.
//! 2. **Versioned entries:** each key owns a [`VersionedEntry`], a mutable
//!    registration list whose immutable snapshot is rebuilt lazily, at most
//!    once per mutation, so reads are amortized O(1).
//! 3. **Keyed registries:** a [`KeyedRegistry`] maps keys to entries and
//!    publishes a membership snapshot for lock-free existence tests.
//! 4. **Owner scoping:** a [`RegistryArena`] hands each owner token its own
//!    per-value-type registries; releasing the owner releases them.
//!
//! # Concurrency
//!
//! - **Reads:** lock-free against published snapshots once the entry handle
//!   is cloned out of the map.
//! - **Writes:** serialized per registry; O(1) list mutation plus an O(n)
//!   snapshot rebuild deferred to the next read.
//!
//! Factories are always invoked with no locks held, so a factory may call
//! back into the registry that is resolving it; it observes its own
//! registration only after it returns.
//!
//! This crate is a pure data structure: it never logs, never retries, and
//! never catches panics raised by user-supplied factories.

pub mod arena;
pub mod entry;
pub mod error;
pub mod keyed;
pub mod registration;
pub mod typemap;

pub use arena::{OwnerId, RegistryArena, RegistryHandle};
pub use entry::{EntrySnapshot, RemoveLast, VersionedEntry};
pub use error::RegistryError;
pub use keyed::{KeyedRegistry, RegistryKey, RegistryValue};
pub use registration::{FactoryFn, Registration};
pub use typemap::TypeMap;
