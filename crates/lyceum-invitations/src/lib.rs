//! Invitation lifecycle for lyceum sites.
//!
//! The heart of this crate is the acceptance state machine: an invitation is
//! created, waits in a store, and transitions exactly once to accepted,
//! unless it is first retired by expiry, disablement or deletion.
//! Acceptance runs through
//! one orchestrator ([`InvitationService`]) that looks the invitation up,
//! validates it, and dispatches to the actor for its variant; a repeat
//! acceptance by the same resolved user is a no-op success because multiple
//! application hooks can race to redeem one session's invitation.
//!
//! Host-application concerns (users, communities, roles) are reached
//! through the [`UserDirectory`], [`EntityDirectory`] and [`RoleService`]
//! traits; persistence through [`lyceum_storage::InvitationStore`];
//! notifications through [`lyceum_events::EventBus`].

mod actors;
mod context;
mod directory;
mod error;
pub mod maintenance;
mod service;
mod validate;

pub use actors::{ActorRegistry, InvitationActor};
pub use context::SiteContext;
pub use directory::{DirectoryError, EntityDirectory, EntityKind, RoleService, User, UserDirectory};
#[cfg(feature = "test-support")]
pub use directory::{MockEntityDirectory, MockRoleService, MockUserDirectory};
pub use error::InvitationError;
pub use service::{Acceptance, InvitationService, NewInvitation};
pub use validate::{check_email, check_site, validate};
