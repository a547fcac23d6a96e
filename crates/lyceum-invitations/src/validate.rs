//! Pure validation checks over an invitation record.

use lyceum_storage::Invitation;

use crate::context::SiteContext;
use crate::error::InvitationError;

/// Lifecycle validation, evaluated in fixed order; first failure wins.
///
/// Expiry is checked first: it is a time-based fact independent of any
/// action taken, and must dominate a stale accepted flag left by a race.
/// The disabled override is checked last as the rarest case.
pub fn validate(invitation: &Invitation) -> Result<(), InvitationError> {
    if invitation.is_expired() {
        return Err(InvitationError::Expired);
    }
    if invitation.accepted {
        return Err(InvitationError::AlreadyAccepted);
    }
    if invitation.disabled {
        return Err(InvitationError::Disabled);
    }
    Ok(())
}

/// Email matching for site-scoped acceptance.
///
/// When matching is required, or when no link email is available, the
/// accepting account's email must equal the invited address. Otherwise the
/// weaker contract applies: the link itself must still correspond to the
/// invitation, but the account email may differ.
pub fn check_email(
    account_email: Option<&str>,
    link_email: Option<&str>,
    invitation: &Invitation,
) -> Result<(), InvitationError> {
    let invited = invitation
        .invited_identifier
        .as_deref()
        .ok_or(InvitationError::EmailNotMatching)?;

    if invitation.require_matching_email || link_email.is_none() {
        let account = account_email.ok_or(InvitationError::EmailNotMatching)?;
        if !account.eq_ignore_ascii_case(invited) {
            return Err(InvitationError::EmailNotMatching);
        }
    } else if let Some(link) = link_email {
        if !link.eq_ignore_ascii_case(invited) {
            return Err(InvitationError::EmailNotMatching);
        }
    }
    Ok(())
}

/// The invitation must be scoped to the evaluating site. Generic
/// invitations without an explicit target default to the evaluating site.
pub fn check_site(invitation: &Invitation, ctx: &SiteContext) -> Result<(), InvitationError> {
    let effective = invitation.target_site.as_ref().unwrap_or(&ctx.site);
    if *effective != ctx.site {
        return Err(InvitationError::SiteNotMatching);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use lyceum_storage::{InvitationCode, InvitationKind, SiteName};

    fn invitation() -> Invitation {
        let mut inv = Invitation::new(
            InvitationCode("CODE".to_string()),
            InvitationKind::Site,
            "admin",
        );
        inv.invited_identifier = Some("ricky@x.com".to_string());
        inv.target_site = Some(SiteName("campus".to_string()));
        inv
    }

    #[test]
    fn pending_invitation_passes() {
        assert!(validate(&invitation()).is_ok());
    }

    #[test]
    fn expired_fails() {
        let mut inv = invitation();
        inv.expires_at = Some(Utc::now() - Duration::seconds(1000));
        assert!(matches!(validate(&inv), Err(InvitationError::Expired)));
    }

    #[test]
    fn accepted_fails() {
        let mut inv = invitation();
        inv.accepted = true;
        assert!(matches!(
            validate(&inv),
            Err(InvitationError::AlreadyAccepted)
        ));
    }

    #[test]
    fn disabled_fails() {
        let mut inv = invitation();
        inv.disabled = true;
        assert!(matches!(validate(&inv), Err(InvitationError::Disabled)));
    }

    #[test]
    fn expiry_dominates_other_states() {
        let mut inv = invitation();
        inv.expires_at = Some(Utc::now() - Duration::seconds(1));
        inv.accepted = true;
        inv.disabled = true;
        assert!(matches!(validate(&inv), Err(InvitationError::Expired)));
    }

    #[test]
    fn accepted_dominates_disabled() {
        let mut inv = invitation();
        inv.accepted = true;
        inv.disabled = true;
        assert!(matches!(
            validate(&inv),
            Err(InvitationError::AlreadyAccepted)
        ));
    }

    #[test]
    fn account_email_must_match_without_link_email() {
        let inv = invitation();
        assert!(check_email(Some("RICKY@X.COM"), None, &inv).is_ok());
        assert!(matches!(
            check_email(Some("other@x.com"), None, &inv),
            Err(InvitationError::EmailNotMatching)
        ));
        assert!(matches!(
            check_email(None, None, &inv),
            Err(InvitationError::EmailNotMatching)
        ));
    }

    #[test]
    fn required_match_ignores_link_email() {
        let mut inv = invitation();
        inv.require_matching_email = true;
        // link matches but the account does not: still a mismatch
        assert!(matches!(
            check_email(Some("other@x.com"), Some("ricky@x.com"), &inv),
            Err(InvitationError::EmailNotMatching)
        ));
        assert!(check_email(Some("ricky@x.com"), Some("ricky@x.com"), &inv).is_ok());
    }

    #[test]
    fn link_email_satisfies_the_weaker_contract() {
        let inv = invitation();
        // matching not required: the link must correspond to the invite,
        // the account email may differ
        assert!(check_email(Some("personal@x.com"), Some("ricky@x.com"), &inv).is_ok());
        assert!(matches!(
            check_email(Some("personal@x.com"), Some("stolen@x.com"), &inv),
            Err(InvitationError::EmailNotMatching)
        ));
    }

    #[test]
    fn site_must_match() {
        let inv = invitation();
        assert!(check_site(&inv, &SiteContext::new("campus")).is_ok());
        assert!(matches!(
            check_site(&inv, &SiteContext::new("elsewhere")),
            Err(InvitationError::SiteNotMatching)
        ));
    }

    #[test]
    fn unscoped_invitation_defaults_to_the_evaluating_site() {
        let mut inv = invitation();
        inv.target_site = None;
        assert!(check_site(&inv, &SiteContext::new("anything")).is_ok());
    }
}
