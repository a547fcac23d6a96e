//! Storage abstraction for lyceum invitations.
//!
//! Backend crates (e.g., lyceum-store-memory, lyceum-store-sqlite) implement the
//! [`InvitationStore`] trait so the invitation lifecycle code doesn't depend on any
//! specific database engine or schema details.

use thiserror::Error;

mod store;
mod types;

pub use store::InvitationStore;
#[cfg(feature = "test-support")]
pub use store::MockInvitationStore;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    /// Revision-checked update lost the race; the caller saw a stale record.
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
