//! The acceptance orchestrator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use lyceum_events::{EventBus, InvitationEvent, InvitationEventKind};
use lyceum_signer::{SIGNED_LINK_VERSION, SignedLink, Signer, SignerError};
use lyceum_storage::{
    Invitation, InvitationCode, InvitationFilter, InvitationKind, InvitationStore, SiteName,
    StoreError,
};

use crate::actors::ActorRegistry;
use crate::context::SiteContext;
use crate::directory::{EntityDirectory, RoleService, User, UserDirectory};
use crate::error::InvitationError;
use crate::maintenance;
use crate::validate::validate;

/// Parameters for creating an invitation.
#[derive(Clone, Debug)]
pub struct NewInvitation {
    pub kind: InvitationKind,
    pub sender: String,
    pub invited_identifier: Option<String>,
    pub receiver_name: Option<String>,
    pub entity: Option<String>,
    /// Defaults to the issuing site for site-scoped kinds.
    pub target_site: Option<SiteName>,
    pub require_matching_email: bool,
    pub message: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Random unless supplied.
    pub code: Option<InvitationCode>,
}

impl NewInvitation {
    fn base(kind: InvitationKind, sender: impl Into<String>) -> Self {
        NewInvitation {
            kind,
            sender: sender.into(),
            invited_identifier: None,
            receiver_name: None,
            entity: None,
            target_site: None,
            require_matching_email: false,
            message: None,
            expires_at: None,
            code: None,
        }
    }

    /// Ordinary site membership invitation addressed to an email.
    pub fn site(sender: impl Into<String>, email: impl Into<String>) -> Self {
        let mut new = Self::base(InvitationKind::Site, sender);
        new.invited_identifier = Some(email.into());
        new
    }

    /// Site invitation that grants site-admin on acceptance.
    pub fn site_admin(sender: impl Into<String>, email: impl Into<String>) -> Self {
        let mut new = Self::base(InvitationKind::SiteAdmin, sender);
        new.invited_identifier = Some(email.into());
        new
    }

    /// Invitation to join a community or friends list.
    pub fn join_entity(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        let mut new = Self::base(InvitationKind::JoinEntity, sender);
        new.invited_identifier = Some(receiver.into());
        new.entity = Some(entity.into());
        new
    }
}

/// Result of a successful acceptance call.
#[derive(Clone, Debug)]
pub struct Acceptance {
    /// The freshest stored view of the invitation that was presented. For a
    /// generic invitation this is the untouched generic record; the minted
    /// membership record is reachable through the accepted queries.
    pub invitation: Invitation,
    /// `false` only when a best-effort entity join found nothing to join.
    pub applied: bool,
}

/// Ties together lookup, validation, actor dispatch and the idempotent
/// short-circuit.
///
/// Accept calls serialize on an internal lock, and every accepting write is
/// revision-checked in the store, so a lost race surfaces as
/// [`StoreError::Conflict`] instead of a lost update.
pub struct InvitationService {
    store: Arc<dyn InvitationStore>,
    users: Arc<dyn UserDirectory>,
    bus: Arc<dyn EventBus>,
    signer: Signer,
    actors: ActorRegistry,
    accept_lock: Mutex<()>,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        users: Arc<dyn UserDirectory>,
        entities: Arc<dyn EntityDirectory>,
        roles: Arc<dyn RoleService>,
        bus: Arc<dyn EventBus>,
        signer: Signer,
    ) -> Self {
        let actors = ActorRegistry::new(
            store.clone(),
            users.clone(),
            entities,
            roles,
            bus.clone(),
        );
        InvitationService {
            store,
            users,
            bus,
            signer,
            actors,
            accept_lock: Mutex::new(()),
        }
    }

    // ──────────────────────────────── Sending ────────────────────────────────

    /// Create and persist an invitation, publishing a `Sent` event.
    ///
    /// For ordinary site invitations an outstanding pending invitation for
    /// the same email and site is reused rather than stacking a duplicate;
    /// the caller just mails the receiver again.
    pub async fn create_invitation(
        &self,
        ctx: &SiteContext,
        new: NewInvitation,
    ) -> Result<Invitation, InvitationError> {
        let target_site = match new.target_site {
            Some(site) => Some(site),
            None if new.kind.is_site_scoped() => Some(ctx.site.clone()),
            None => None,
        };

        if new.kind == InvitationKind::Site {
            if let Some(email) = &new.invited_identifier {
                let filter = InvitationFilter::by_receiver(email.clone())
                    .kinds([InvitationKind::Site])
                    .site(ctx.site.clone());
                if let Some(existing) = self.store.pending(&filter).await?.into_iter().next() {
                    debug!(code = %existing.code.0, email = %email, "reusing pending site invitation");
                    self.publish_sent(&existing, ctx).await;
                    return Ok(existing);
                }
            }
        }

        let mut invitation = Invitation::new(
            new.code.unwrap_or_else(InvitationCode::random),
            new.kind,
            new.sender,
        );
        invitation.invited_identifier = new.invited_identifier;
        invitation.receiver_name = new.receiver_name;
        invitation.entity = new.entity;
        invitation.target_site = target_site;
        invitation.require_matching_email = new.require_matching_email;
        invitation.message = new.message;
        invitation.expires_at = new.expires_at;

        self.store.add(&invitation).await.map_err(|e| match e {
            StoreError::AlreadyExists => InvitationError::DuplicateCode,
            other => InvitationError::Store(other),
        })?;
        info!(code = %invitation.code.0, kind = invitation.kind.as_str(), "invitation created");
        self.publish_sent(&invitation, ctx).await;
        Ok(invitation)
    }

    /// Install the site's generic invitation. At most one non-accepted
    /// generic invitation exists per site: an outstanding one is removed
    /// before the replacement is added.
    pub async fn set_generic_invitation(
        &self,
        ctx: &SiteContext,
        sender: impl Into<String>,
        code: Option<InvitationCode>,
    ) -> Result<Invitation, InvitationError> {
        let filter = InvitationFilter::default()
            .kinds([InvitationKind::GenericSite])
            .site(ctx.site.clone());
        for stale in self.store.pending(&filter).await? {
            info!(code = %stale.code.0, "replacing pending generic invitation");
            self.store.remove(&stale.code).await?;
        }

        let mut invitation = Invitation::new(
            code.unwrap_or_else(InvitationCode::random),
            InvitationKind::GenericSite,
            sender,
        );
        invitation.target_site = Some(ctx.site.clone());
        self.store.add(&invitation).await.map_err(|e| match e {
            StoreError::AlreadyExists => InvitationError::DuplicateCode,
            other => InvitationError::Store(other),
        })?;
        self.publish_sent(&invitation, ctx).await;
        Ok(invitation)
    }

    /// Signed redemption link for an invitation (embedded in emails).
    pub fn signed_link(&self, invitation: &Invitation) -> Result<String, InvitationError> {
        let email = invitation.invited_identifier.clone().unwrap_or_default();
        Ok(self
            .signer
            .encode(&SignedLink::new(invitation.code.0.clone(), email))?)
    }

    // ─────────────────────────────── Accepting ───────────────────────────────

    /// Accept by redemption code.
    ///
    /// When the code matches nothing, falls back to the newest pending
    /// site/site-admin invitation addressed to the user's current account
    /// email in this site. A repeat acceptance by the already-resolved user
    /// short-circuits to success without touching the record, because
    /// account-creation and login hooks can both fire for one session.
    pub async fn accept_by_code(
        &self,
        ctx: &SiteContext,
        user: &User,
        code: &InvitationCode,
        link_email: Option<&str>,
    ) -> Result<Acceptance, InvitationError> {
        let _guard = self.accept_lock.lock().await;
        let invitation = match self.store.get(code).await? {
            Some(found) => found,
            None => self
                .pending_site_invitation_for(ctx, user)
                .await?
                .ok_or_else(|| InvitationError::CodeNotFound(code.0.clone()))?,
        };
        self.accept_resolved(ctx, user, invitation, link_email).await
    }

    /// Accept an invitation already in hand, without a code lookup.
    pub async fn accept_invitation(
        &self,
        ctx: &SiteContext,
        user: &User,
        invitation: &Invitation,
        link_email: Option<&str>,
    ) -> Result<Acceptance, InvitationError> {
        let _guard = self.accept_lock.lock().await;
        self.accept_resolved(ctx, user, invitation.clone(), link_email)
            .await
    }

    /// Accept through a signed redemption link.
    ///
    /// Old link payload shapes fail closed: a verified token with any other
    /// version is rejected before the code is even looked at.
    pub async fn accept_signed(
        &self,
        ctx: &SiteContext,
        user: &User,
        token: &str,
    ) -> Result<Acceptance, InvitationError> {
        let link = self.signer.decode(token)?;
        if link.version != SIGNED_LINK_VERSION {
            return Err(SignerError::UnsupportedVersion(link.version).into());
        }
        self.accept_by_code(
            ctx,
            user,
            &InvitationCode(link.code),
            Some(link.email.as_str()),
        )
        .await
    }

    /// Lifecycle validation for a candidate invitation.
    pub fn validate(&self, invitation: &Invitation) -> Result<(), InvitationError> {
        validate(invitation)
    }

    async fn accept_resolved(
        &self,
        ctx: &SiteContext,
        user: &User,
        invitation: Invitation,
        link_email: Option<&str>,
    ) -> Result<Acceptance, InvitationError> {
        if invitation.accepted && invitation.accepted_by.as_deref() == Some(user.username.as_str())
        {
            debug!(code = %invitation.code.0, user = %user.username,
                   "repeat acceptance by the resolved user; nothing to do");
            return Ok(Acceptance {
                invitation,
                applied: true,
            });
        }

        validate(&invitation)?;
        let actor = self.actors.actor_for(invitation.kind);
        let applied = actor.accept(user, &invitation, link_email, ctx).await?;

        // hand back the freshest stored view; the generic record is left
        // untouched by its actor and may have been minted around, not onto
        let invitation = match self.store.get(&invitation.code).await? {
            Some(fresh) => fresh,
            None => invitation,
        };
        Ok(Acceptance { invitation, applied })
    }

    /// Newest pending site/site-admin invitation addressed to the user's
    /// current account email within this site. Most-recently-sent wins when
    /// several match.
    async fn pending_site_invitation_for(
        &self,
        ctx: &SiteContext,
        user: &User,
    ) -> Result<Option<Invitation>, InvitationError> {
        let Some(email) = self.users.current_email(user).await? else {
            return Ok(None);
        };
        let filter = InvitationFilter::by_receiver(email)
            .kinds([InvitationKind::Site, InvitationKind::SiteAdmin])
            .site(ctx.site.clone());
        Ok(self.store.pending(&filter).await?.into_iter().next())
    }

    // ───────────────────────────── Administration ─────────────────────────────

    /// Pending invitations addressed to any of the given identifiers.
    pub async fn pending_invitations_for(
        &self,
        receivers: Vec<String>,
    ) -> Result<Vec<Invitation>, InvitationError> {
        let filter = InvitationFilter {
            receivers: Some(receivers),
            ..Default::default()
        };
        Ok(self.store.pending(&filter).await?)
    }

    /// See [`maintenance::delete_or_soft_delete`].
    pub async fn delete_or_soft_delete(
        &self,
        code: &InvitationCode,
    ) -> Result<(), InvitationError> {
        maintenance::delete_or_soft_delete(self.store.as_ref(), code).await
    }

    /// See [`maintenance::set_disabled`].
    pub async fn set_disabled(
        &self,
        code: &InvitationCode,
        disabled: bool,
    ) -> Result<(), InvitationError> {
        maintenance::set_disabled(self.store.as_ref(), code, disabled).await
    }

    /// See [`maintenance::delete_expired`].
    pub async fn delete_expired(
        &self,
        filter: &InvitationFilter,
    ) -> Result<usize, InvitationError> {
        maintenance::delete_expired(self.store.as_ref(), filter).await
    }

    /// Drop a departing user's unaccepted invitations (sent under their
    /// username or email).
    pub async fn purge_sender(&self, user: &User) -> Result<usize, InvitationError> {
        let mut identifiers = vec![user.username.clone()];
        if let Some(email) = self.users.current_email(user).await? {
            identifiers.push(email);
        }
        maintenance::purge_unaccepted_from_sender(self.store.as_ref(), &identifiers).await
    }

    async fn publish_sent(&self, invitation: &Invitation, ctx: &SiteContext) {
        let site = invitation
            .target_site
            .clone()
            .unwrap_or_else(|| ctx.site.clone());
        let event = InvitationEvent {
            event: InvitationEventKind::Sent,
            code: invitation.code.0.clone(),
            invitation_kind: invitation.kind,
            site: site.0.clone(),
            subject: invitation.invited_identifier.clone(),
            timestamp: Utc::now().timestamp(),
        };
        // fire-and-forget; a deaf bus must not fail the send flow
        let _ = self.bus.publish(&site, event).await;
    }
}
