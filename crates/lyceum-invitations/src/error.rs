//! Invitation lifecycle errors.

use lyceum_signer::SignerError;
use lyceum_storage::StoreError;
use thiserror::Error;

use crate::directory::DirectoryError;

/// Typed outcome of a failed invitation operation.
///
/// Validation and actor failures always propagate to the caller; nothing in
/// the lifecycle is retried automatically.
#[derive(Debug, Error)]
pub enum InvitationError {
    /// No invitation matches the presented code (after fuzzy fallback).
    #[error("no invitation matches code {0}")]
    CodeNotFound(String),
    #[error("invitation has expired")]
    Expired,
    #[error("invitation was already accepted")]
    AlreadyAccepted,
    #[error("invitation has been disabled")]
    Disabled,
    #[error("email does not match the invitation")]
    EmailNotMatching,
    #[error("invitation is not valid for this site")]
    SiteNotMatching,
    /// The sender lacked the privilege to grant the requested role at
    /// acceptance time.
    #[error("sender {0} may not grant site admin")]
    SenderNotAuthorized(String),
    #[error("invitation code is already in use")]
    DuplicateCode,
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("actor failure: {0}")]
    Actor(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl InvitationError {
    /// Message safe to show the end user.
    ///
    /// The three state rejections share one message so a response does not
    /// reveal whether a code exists or why it stopped working; they stay
    /// distinguishable internally for logging.
    pub fn user_message(&self) -> &'static str {
        match self {
            InvitationError::CodeNotFound(_) => "The provided invitation code is not valid.",
            InvitationError::Expired
            | InvitationError::AlreadyAccepted
            | InvitationError::Disabled => "The invitation is no longer valid.",
            InvitationError::EmailNotMatching => {
                "This invitation was issued to a different email address."
            }
            InvitationError::SiteNotMatching => {
                "The invitation you are trying to accept is not valid for this site."
            }
            InvitationError::SenderNotAuthorized(_) => {
                "The invitation could not grant the requested role."
            }
            InvitationError::Signer(_) => "The invitation link is not valid.",
            _ => "The invitation could not be accepted.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_rejections_share_a_user_message() {
        let expired = InvitationError::Expired.user_message();
        assert_eq!(expired, InvitationError::AlreadyAccepted.user_message());
        assert_eq!(expired, InvitationError::Disabled.user_message());
        // but stay distinguishable internally
        assert_ne!(
            InvitationError::Expired.to_string(),
            InvitationError::Disabled.to_string()
        );
    }

    #[test]
    fn mismatch_rejections_are_specific() {
        assert_ne!(
            InvitationError::EmailNotMatching.user_message(),
            InvitationError::SiteNotMatching.user_message()
        );
    }
}
