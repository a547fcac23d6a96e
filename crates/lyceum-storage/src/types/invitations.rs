//! Invitation record types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{InvitationCode, InvitationId, SiteName};

/// Closed set of invitation variants. The variant selects the actor that
/// applies acceptance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum InvitationKind {
    /// Invitation to join a community or friends list inside a site.
    JoinEntity,
    /// Invitation to join a site as an ordinary member.
    Site,
    /// Invitation to join a site with site-admin privileges.
    SiteAdmin,
    /// Per-site singleton link invitation; accepting one mints an ordinary
    /// accepted `Site` invitation and leaves this record untouched.
    GenericSite,
}

impl InvitationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationKind::JoinEntity => "join-entity",
            InvitationKind::Site => "site",
            InvitationKind::SiteAdmin => "site-admin",
            InvitationKind::GenericSite => "generic-site",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "join-entity" => Some(InvitationKind::JoinEntity),
            "site" => Some(InvitationKind::Site),
            "site-admin" => Some(InvitationKind::SiteAdmin),
            "generic-site" => Some(InvitationKind::GenericSite),
            _ => None,
        }
    }

    /// Site-scoped variants carry a `target_site` and participate in the
    /// email/site matching checks.
    pub fn is_site_scoped(&self) -> bool {
        !matches!(self, InvitationKind::JoinEntity)
    }
}

/// Invitation record.
///
/// The pre-acceptance target (`invited_identifier`, an email or username) and
/// the post-acceptance resolved identity (`accepted_by`, always a username)
/// are separate fields; neither is ever rewritten once set.
#[derive(Clone, Debug)]
pub struct Invitation {
    pub id: InvitationId,
    pub code: InvitationCode,
    pub kind: InvitationKind,
    /// Inviter username or system identifier.
    pub sender: String,
    /// Who the invitation was addressed to. `None` for generic invitations.
    pub invited_identifier: Option<String>,
    /// Username of the accepting account; set exactly once at acceptance.
    pub accepted_by: Option<String>,
    /// Realname of the receiver, for account creation and email templates.
    pub receiver_name: Option<String>,
    /// Target community/friends-list username (`JoinEntity` only).
    pub entity: Option<String>,
    /// Site this invitation admits to. Generic invitations may leave this
    /// unset and default to the evaluating site.
    pub target_site: Option<SiteName>,
    /// Require the accepting account's email to equal `invited_identifier`.
    pub require_matching_email: bool,
    /// Optional free text shown to the receiver.
    pub message: Option<String>,
    pub accepted: bool,
    pub accepted_at: Option<DateTime<Utc>>,
    /// Expired iff `now >= expires_at`. `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Administrative kill-switch; a disabled invitation is permanently
    /// unusable without being deleted.
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by every successful update.
    pub revision: i64,
}

impl Invitation {
    /// New pending invitation with a fresh id, created now.
    pub fn new(code: InvitationCode, kind: InvitationKind, sender: impl Into<String>) -> Self {
        Invitation {
            id: InvitationId(Uuid::now_v7()),
            code,
            kind,
            sender: sender.into(),
            invited_identifier: None,
            accepted_by: None,
            receiver_name: None,
            entity: None,
            target_site: None,
            require_matching_email: false,
            message: None,
            accepted: false,
            accepted_at: None,
            expires_at: None,
            disabled: false,
            created_at: Utc::now(),
            revision: 0,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Not accepted, not expired, not disabled.
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        !self.accepted && !self.disabled && !self.is_expired_at(now)
    }

    /// The current receiver identity: the accepting username once accepted,
    /// the invited identifier before that.
    pub fn receiver(&self) -> Option<&str> {
        self.accepted_by
            .as_deref()
            .or(self.invited_identifier.as_deref())
    }

    /// Case-insensitive receiver match against either identity field.
    pub fn matches_receiver(&self, needle: &str) -> bool {
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(needle))
        };
        matches(&self.invited_identifier) || matches(&self.accepted_by)
    }
}

/// Query filter for the list operations. Filtering is the intersection of
/// all supplied predicates; `None` means "don't care".
#[derive(Clone, Debug, Default)]
pub struct InvitationFilter {
    /// Matches `invited_identifier` or `accepted_by`, case-insensitively.
    pub receivers: Option<Vec<String>>,
    pub senders: Option<Vec<String>>,
    pub kinds: Option<Vec<InvitationKind>>,
    pub sites: Option<Vec<SiteName>>,
}

impl InvitationFilter {
    pub fn by_receiver(receiver: impl Into<String>) -> Self {
        InvitationFilter {
            receivers: Some(vec![receiver.into()]),
            ..Default::default()
        }
    }

    pub fn by_sender(sender: impl Into<String>) -> Self {
        InvitationFilter {
            senders: Some(vec![sender.into()]),
            ..Default::default()
        }
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = InvitationKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn site(mut self, site: SiteName) -> Self {
        self.sites = Some(vec![site]);
        self
    }

    /// Shared predicate so every backend filters identically.
    pub fn matches(&self, invitation: &Invitation) -> bool {
        if let Some(receivers) = &self.receivers {
            if !receivers.iter().any(|r| invitation.matches_receiver(r)) {
                return false;
            }
        }
        if let Some(senders) = &self.senders {
            if !senders.iter().any(|s| invitation.sender.eq_ignore_ascii_case(s)) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&invitation.kind) {
                return false;
            }
        }
        if let Some(sites) = &self.sites {
            match &invitation.target_site {
                Some(site) if sites.contains(site) => {}
                _ => return false,
            }
        }
        true
    }
}
