//! Resolver facade over owner-scoped service registries.
//!
//! `quay-registry` is a pure data structure; this crate is the orchestration
//! layer a caller actually talks to. A [`Resolver`] is one logical container
//! instance: it owns the opaque owner token, maps public (value type,
//! [`Contract`]) keys onto per-type registries, wraps factories with
//! lazy-singleton memoization where asked, broadcasts [`ChangeEvent`]s after
//! each mutation, and turns teardown into a reported [`DisposeOutcome`]
//! instead of swallowed failures.
//!
//! ```
//! use quay_locator::Resolver;
//!
//! let resolver = Resolver::new();
//! resolver.register_instance("greeting", "hello".to_string())?;
//! assert_eq!(resolver.resolve::<String>("greeting").as_deref(), Some("hello"));
//! assert!(resolver.dispose().is_clean());
//! # Ok::<(), quay_locator::ResolverError>(())
//! ```

pub mod callbacks;
pub mod contract;
pub mod error;
pub mod resolver;

pub use callbacks::{CallbackToken, ChangeEvent, ChangeKind};
pub use contract::Contract;
pub use error::{BoxError, DisposeError, DisposeOutcome, ResolverError};
pub use resolver::Resolver;
