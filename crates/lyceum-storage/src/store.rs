//! The InvitationStore trait that backends implement.

use crate::StoreError;
use crate::types::*;

/// The storage trait the invitation lifecycle depends on.
///
/// A code is unique among live invitations; `add` refuses collisions. All
/// list operations intersect the supplied filter predicates and return
/// results newest-first by creation time, which makes "first match wins"
/// callers deterministic.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait InvitationStore: Send + Sync {
    /// Persist a new invitation. Fails with `StoreError::AlreadyExists` if
    /// the code collides with a live invitation.
    async fn add(&self, invitation: &Invitation) -> Result<(), StoreError>;

    /// Remove an invitation by code.
    async fn remove(&self, code: &InvitationCode) -> Result<(), StoreError>;

    /// Look up an invitation by code.
    async fn get(&self, code: &InvitationCode) -> Result<Option<Invitation>, StoreError>;

    /// Revision-checked update: applies the mutation only if the stored
    /// revision equals `invitation.revision`, then bumps it. A stale caller
    /// gets `StoreError::Conflict` and must re-read.
    async fn update(&self, invitation: &Invitation) -> Result<Invitation, StoreError>;

    /// Explicit administrative rewrite of a redemption code.
    async fn replace_code(
        &self,
        old: &InvitationCode,
        new: &InvitationCode,
    ) -> Result<(), StoreError>;

    /// Invitations that are not accepted, not expired and not disabled.
    async fn pending(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError>;

    /// Unaccepted invitations whose expiry has passed. Accepted records are
    /// terminal and never reported here.
    async fn expired(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError>;

    /// Invitations that have been accepted.
    async fn accepted(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError>;

    /// Every invitation matching the filter, regardless of state.
    async fn all(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError>;
}
