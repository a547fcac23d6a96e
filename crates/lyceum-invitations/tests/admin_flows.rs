//! Administrative lifecycle: delete/soft-delete, expiry sweeps, sender
//! purges.

mod common;

use chrono::{Duration, Utc};
use common::*;
use lyceum_invitations::{InvitationError, NewInvitation, maintenance};
use lyceum_storage::{InvitationFilter, InvitationStore};

#[tokio::test]
async fn soft_delete_backdates_expiry() {
    let h = Harness::new();
    let invitation = h
        .service
        .create_invitation(&h.ctx, NewInvitation::site("admin", "ricky@x.com"))
        .await
        .unwrap();

    h.service.delete_or_soft_delete(&invitation.code).await.unwrap();

    // still stored for audit, but permanently unacceptable
    let stored = h.store.get(&invitation.code).await.unwrap().unwrap();
    assert!(stored.is_expired());

    let user = h.user("ricky", "ricky@x.com");
    let err = h
        .service
        .accept_by_code(&h.ctx, &user, &invitation.code, None)
        .await
        .unwrap_err();
    assert!(matches!(err, InvitationError::Expired));
}

#[tokio::test]
async fn already_expired_invitation_is_hard_deleted() {
    let h = Harness::new();
    let mut new = NewInvitation::site("admin", "ricky@x.com");
    new.expires_at = Some(Utc::now() - Duration::hours(1));
    let invitation = h.service.create_invitation(&h.ctx, new).await.unwrap();

    h.service.delete_or_soft_delete(&invitation.code).await.unwrap();
    assert!(h.store.get(&invitation.code).await.unwrap().is_none());
}

#[tokio::test]
async fn accepted_invitation_refuses_deletion() {
    let h = Harness::new();
    let user = h.user("ricky", "ricky@x.com");
    let invitation = h
        .service
        .create_invitation(&h.ctx, NewInvitation::site("admin", "ricky@x.com"))
        .await
        .unwrap();
    h.service
        .accept_by_code(&h.ctx, &user, &invitation.code, None)
        .await
        .unwrap();

    let err = h
        .service
        .delete_or_soft_delete(&invitation.code)
        .await
        .unwrap_err();
    assert!(matches!(err, InvitationError::AlreadyAccepted));
    assert!(h.store.get(&invitation.code).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_expired_sweeps_only_expired_records() {
    let h = Harness::new();
    h.service
        .create_invitation(&h.ctx, NewInvitation::site("admin", "keep@x.com"))
        .await
        .unwrap();
    for email in ["a@x.com", "b@x.com"] {
        let mut new = NewInvitation::site("admin", email);
        new.expires_at = Some(Utc::now() - Duration::hours(1));
        h.service.create_invitation(&h.ctx, new).await.unwrap();
    }

    let removed = h
        .service
        .delete_expired(&InvitationFilter::default())
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        h.store.all(&InvitationFilter::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn purging_a_sender_spares_accepted_invitations() {
    let h = Harness::new();
    let departing = h.user("boss", "boss@x.com");

    let kept = h
        .service
        .create_invitation(&h.ctx, NewInvitation::site("boss", "done@x.com"))
        .await
        .unwrap();
    let done = h.user("done_user", "done@x.com");
    h.service
        .accept_by_code(&h.ctx, &done, &kept.code, None)
        .await
        .unwrap();

    let dropped = h
        .service
        .create_invitation(&h.ctx, NewInvitation::site("boss", "open@x.com"))
        .await
        .unwrap();

    let purged = h.service.purge_sender(&departing).await.unwrap();
    assert_eq!(purged, 1);
    assert!(h.store.get(&dropped.code).await.unwrap().is_none());
    assert!(h.store.get(&kept.code).await.unwrap().is_some());
}

#[tokio::test]
async fn disable_and_reenable() {
    let h = Harness::new();
    let user = h.user("ricky", "ricky@x.com");
    let invitation = h
        .service
        .create_invitation(&h.ctx, NewInvitation::site("admin", "ricky@x.com"))
        .await
        .unwrap();

    maintenance::set_disabled(h.store.as_ref(), &invitation.code, true)
        .await
        .unwrap();
    let err = h
        .service
        .accept_by_code(&h.ctx, &user, &invitation.code, None)
        .await
        .unwrap_err();
    assert!(matches!(err, InvitationError::Disabled));

    maintenance::set_disabled(h.store.as_ref(), &invitation.code, false)
        .await
        .unwrap();
    let accepted = h
        .service
        .accept_by_code(&h.ctx, &user, &invitation.code, None)
        .await
        .unwrap();
    assert!(accepted.invitation.accepted);
}

#[tokio::test]
async fn pending_invitations_for_either_identity() {
    let h = Harness::new();
    h.service
        .create_invitation(&h.ctx, NewInvitation::site("admin", "ricky@x.com"))
        .await
        .unwrap();
    h.service
        .create_invitation(
            &h.ctx,
            NewInvitation::join_entity("friend", "ricky", "book-club"),
        )
        .await
        .unwrap();

    let pending = h
        .service
        .pending_invitations_for(vec!["ricky".to_string(), "ricky@x.com".to_string()])
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
}
