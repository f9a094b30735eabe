//! Registry error types.

use crate::arena::OwnerId;

/// Errors raised by registry operations.
///
/// Absent keys and empty results are not errors: removal of a missing key
/// is a no-op and resolution of an empty key returns nothing. The one real
/// error condition is operating on an owner that no longer exists.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
	/// The owner token does not name a live owner: it was released, or it
	/// belongs to a different arena.
	#[error("{0} has been released")]
	OwnerReleased(OwnerId),
}
