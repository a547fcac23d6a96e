//! Acceptance actors, one per invitation variant.
//!
//! An actor knows how to apply acceptance for its variant. Dispatch is a
//! `match` over the closed [`InvitationKind`] enum, so an unhandled variant
//! is a compile error rather than a runtime configuration gap.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use lyceum_events::{EventBus, InvitationEvent, InvitationEventKind};
use lyceum_storage::{
    Invitation, InvitationCode, InvitationKind, InvitationStore, SiteName,
};

use crate::context::SiteContext;
use crate::directory::{EntityDirectory, EntityKind, RoleService, User, UserDirectory};
use crate::error::InvitationError;
use crate::validate::{check_email, check_site, validate};

/// Applies acceptance for one invitation variant.
///
/// `Ok(true)` means acceptance was applied; `Ok(false)` is the best-effort
/// failure signal reserved for entity joins. Everything an actor persists
/// happens only after all of its checks have passed.
#[async_trait::async_trait]
pub trait InvitationActor: Send + Sync {
    async fn accept(
        &self,
        user: &User,
        invitation: &Invitation,
        link_email: Option<&str>,
        ctx: &SiteContext,
    ) -> Result<bool, InvitationError>;
}

fn accepted_event(invitation: &Invitation, username: &str, site: &SiteName) -> InvitationEvent {
    InvitationEvent {
        event: InvitationEventKind::Accepted,
        code: invitation.code.0.clone(),
        invitation_kind: invitation.kind,
        site: site.0.clone(),
        subject: Some(username.to_string()),
        timestamp: Utc::now().timestamp(),
    }
}

/// Persist the accepting transition and publish the notification.
/// The revision check on `update` rejects a concurrent writer.
async fn mark_accepted(
    store: &dyn InvitationStore,
    bus: &dyn EventBus,
    invitation: &Invitation,
    user: &User,
    ctx: &SiteContext,
) -> Result<Invitation, InvitationError> {
    let mut updated = invitation.clone();
    updated.accepted = true;
    updated.accepted_at = Some(Utc::now());
    updated.accepted_by = Some(user.username.clone());
    let committed = store.update(&updated).await?;

    let site = committed.target_site.clone().unwrap_or_else(|| ctx.site.clone());
    let _ = bus
        .publish(&site, accepted_event(&committed, &user.username, &site))
        .await;
    Ok(committed)
}

/// Joins the accepting user to a community or friends list.
///
/// Entity invitations are best-effort social actions: a missing or
/// unresolvable entity logs and reports `false` instead of raising.
pub struct JoinEntityActor {
    store: Arc<dyn InvitationStore>,
    entities: Arc<dyn EntityDirectory>,
    bus: Arc<dyn EventBus>,
}

#[async_trait::async_trait]
impl InvitationActor for JoinEntityActor {
    async fn accept(
        &self,
        user: &User,
        invitation: &Invitation,
        _link_email: Option<&str>,
        ctx: &SiteContext,
    ) -> Result<bool, InvitationError> {
        let Some(entity_name) = invitation.entity.as_deref() else {
            warn!(code = %invitation.code.0, "entity invitation names no entity");
            return Ok(false);
        };
        match self.entities.resolve_entity(entity_name).await? {
            None => {
                warn!(entity = entity_name, "entity does not exist");
                return Ok(false);
            }
            Some(EntityKind::Community) => {
                info!(entity = entity_name, user = %user.username, "joining community");
                self.entities.join_community(user, entity_name).await?;
            }
            Some(EntityKind::FriendsList) => {
                info!(entity = entity_name, user = %user.username, "joining friends list");
                self.entities.add_to_friends_list(entity_name, user).await?;
            }
        }
        mark_accepted(self.store.as_ref(), self.bus.as_ref(), invitation, user, ctx).await?;
        Ok(true)
    }
}

/// Admits the accepting user to the target site as an ordinary member.
pub struct SiteInvitationActor {
    store: Arc<dyn InvitationStore>,
    users: Arc<dyn UserDirectory>,
    bus: Arc<dyn EventBus>,
}

impl SiteInvitationActor {
    async fn run_checks(
        &self,
        user: &User,
        invitation: &Invitation,
        link_email: Option<&str>,
        ctx: &SiteContext,
    ) -> Result<(), InvitationError> {
        validate(invitation)?;
        check_site(invitation, ctx)?;
        let account_email = self.users.current_email(user).await?;
        check_email(account_email.as_deref(), link_email, invitation)
    }
}

#[async_trait::async_trait]
impl InvitationActor for SiteInvitationActor {
    async fn accept(
        &self,
        user: &User,
        invitation: &Invitation,
        link_email: Option<&str>,
        ctx: &SiteContext,
    ) -> Result<bool, InvitationError> {
        self.run_checks(user, invitation, link_email, ctx).await?;
        mark_accepted(self.store.as_ref(), self.bus.as_ref(), invitation, user, ctx).await?;
        Ok(true)
    }
}

/// Redeems the per-site generic invitation.
///
/// The generic record is never mutated; acceptance mints a brand-new,
/// already-accepted ordinary site invitation for the accepting user.
pub struct GenericSiteInvitationActor {
    store: Arc<dyn InvitationStore>,
    bus: Arc<dyn EventBus>,
}

#[async_trait::async_trait]
impl InvitationActor for GenericSiteInvitationActor {
    async fn accept(
        &self,
        user: &User,
        invitation: &Invitation,
        _link_email: Option<&str>,
        ctx: &SiteContext,
    ) -> Result<bool, InvitationError> {
        validate(invitation)?;
        check_site(invitation, ctx)?;

        let mut minted = Invitation::new(
            InvitationCode::random(),
            InvitationKind::Site,
            invitation.sender.clone(),
        );
        minted.target_site = Some(ctx.site.clone());
        minted.accepted = true;
        minted.accepted_at = Some(Utc::now());
        minted.accepted_by = Some(user.username.clone());
        self.store.add(&minted).await.map_err(|e| match e {
            lyceum_storage::StoreError::AlreadyExists => InvitationError::DuplicateCode,
            other => InvitationError::Store(other),
        })?;

        let _ = self
            .bus
            .publish(&ctx.site, accepted_event(&minted, &user.username, &ctx.site))
            .await;
        Ok(true)
    }
}

/// As [`SiteInvitationActor`], plus the role grant.
///
/// The sender must hold admin or site-admin at acceptance time, not merely
/// at send time; a since-demoted sender's invitations stop granting.
pub struct SiteAdminInvitationActor {
    site: SiteInvitationActor,
    roles: Arc<dyn RoleService>,
}

#[async_trait::async_trait]
impl InvitationActor for SiteAdminInvitationActor {
    async fn accept(
        &self,
        user: &User,
        invitation: &Invitation,
        link_email: Option<&str>,
        ctx: &SiteContext,
    ) -> Result<bool, InvitationError> {
        self.site.run_checks(user, invitation, link_email, ctx).await?;

        if !self
            .roles
            .is_admin_or_site_admin(&invitation.sender, &ctx.site)
            .await?
        {
            warn!(
                sender = %invitation.sender,
                site = %ctx.site.0,
                "sender no longer authorized to grant site admin"
            );
            return Err(InvitationError::SenderNotAuthorized(
                invitation.sender.clone(),
            ));
        }

        mark_accepted(
            self.site.store.as_ref(),
            self.site.bus.as_ref(),
            invitation,
            user,
            ctx,
        )
        .await?;
        self.roles.grant_site_admin(user, &ctx.site).await?;
        Ok(true)
    }
}

/// Maps an invitation variant to its actor.
pub struct ActorRegistry {
    join_entity: JoinEntityActor,
    site: SiteInvitationActor,
    generic_site: GenericSiteInvitationActor,
    site_admin: SiteAdminInvitationActor,
}

impl ActorRegistry {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        users: Arc<dyn UserDirectory>,
        entities: Arc<dyn EntityDirectory>,
        roles: Arc<dyn RoleService>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        ActorRegistry {
            join_entity: JoinEntityActor {
                store: store.clone(),
                entities,
                bus: bus.clone(),
            },
            site: SiteInvitationActor {
                store: store.clone(),
                users: users.clone(),
                bus: bus.clone(),
            },
            generic_site: GenericSiteInvitationActor {
                store: store.clone(),
                bus: bus.clone(),
            },
            site_admin: SiteAdminInvitationActor {
                site: SiteInvitationActor { store, users, bus },
                roles,
            },
        }
    }

    pub fn actor_for(&self, kind: InvitationKind) -> &dyn InvitationActor {
        match kind {
            InvitationKind::JoinEntity => &self.join_entity,
            InvitationKind::Site => &self.site,
            InvitationKind::GenericSite => &self.generic_site,
            InvitationKind::SiteAdmin => &self.site_admin,
        }
    }
}
