//! Administrative operations over the invitation store.
//!
//! These are free functions so an admin tool can drive them against a bare
//! store; [`InvitationService`](crate::InvitationService) delegates here.

use chrono::{Duration, Utc};
use tracing::info;

use lyceum_storage::{InvitationCode, InvitationFilter, InvitationStore};

use crate::error::InvitationError;

/// Soft-deleting backdates expiry to just before now, so the record stays
/// around for audit but can never validate again.
const SOFT_DELETE_BACKDATE_SECONDS: i64 = 1;

/// Delete an invitation, or retire it in place.
///
/// Refuses for accepted invitations (they are terminal audit records);
/// hard-deletes records that are already expired; otherwise backdates the
/// expiry.
pub async fn delete_or_soft_delete(
    store: &dyn InvitationStore,
    code: &InvitationCode,
) -> Result<(), InvitationError> {
    let invitation = store
        .get(code)
        .await?
        .ok_or_else(|| InvitationError::CodeNotFound(code.0.clone()))?;
    if invitation.accepted {
        return Err(InvitationError::AlreadyAccepted);
    }
    if invitation.is_expired() {
        store.remove(code).await?;
        return Ok(());
    }
    let mut softened = invitation;
    softened.expires_at = Some(Utc::now() - Duration::seconds(SOFT_DELETE_BACKDATE_SECONDS));
    store.update(&softened).await?;
    Ok(())
}

/// Flip the administrative kill-switch on an invitation.
pub async fn set_disabled(
    store: &dyn InvitationStore,
    code: &InvitationCode,
    disabled: bool,
) -> Result<(), InvitationError> {
    let mut invitation = store
        .get(code)
        .await?
        .ok_or_else(|| InvitationError::CodeNotFound(code.0.clone()))?;
    invitation.disabled = disabled;
    store.update(&invitation).await?;
    Ok(())
}

/// Remove expired invitations matching the filter. Expiry is otherwise only
/// evaluated lazily at validation time; this is the explicit sweep.
pub async fn delete_expired(
    store: &dyn InvitationStore,
    filter: &InvitationFilter,
) -> Result<usize, InvitationError> {
    let expired = store.expired(filter).await?;
    let count = expired.len();
    for invitation in expired {
        store.remove(&invitation.code).await?;
    }
    if count > 0 {
        info!(count, "deleted expired invitations");
    }
    Ok(count)
}

/// Remove every unaccepted invitation sent by any of the given identifiers
/// (a departing user's username and email). Accepted invitations stay as
/// audit records.
pub async fn purge_unaccepted_from_sender(
    store: &dyn InvitationStore,
    sender_identifiers: &[String],
) -> Result<usize, InvitationError> {
    let filter = InvitationFilter {
        senders: Some(sender_identifiers.to_vec()),
        ..Default::default()
    };
    let mut count = 0;
    for invitation in store.all(&filter).await? {
        if !invitation.accepted {
            store.remove(&invitation.code).await?;
            count += 1;
        }
    }
    if count > 0 {
        info!(count, "purged unaccepted invitations from departing sender");
    }
    Ok(count)
}
