//! Event bus abstraction for invitation lifecycle notifications.
//!
//! The acceptance flows publish an event after the accepting mutation has
//! been persisted; senders publish one when an invitation goes out. The bus
//! is an explicit, injected capability so the lifecycle code stays testable
//! without an application event loop. Nothing in the lifecycle consumes a
//! return value from `publish`.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

use lyceum_storage::{InvitationKind, SiteName};

/// What happened to the invitation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationEventKind {
    Sent,
    Accepted,
}

/// Event describing an invitation transition, scoped to a site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvitationEvent {
    pub event: InvitationEventKind,
    pub code: String,
    pub invitation_kind: InvitationKind,
    pub site: String,
    /// Receiver identifier for `Sent` (may be absent for generic
    /// invitations), accepting username for `Accepted`.
    pub subject: Option<String>,
    pub timestamp: i64,
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of invitation events
pub type EventStream = Pin<Box<dyn Stream<Item = InvitationEvent> + Send>>;

/// Event bus trait for publishing and subscribing to invitation events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to all watchers of this site. Fire-and-forget.
    async fn publish(&self, site: &SiteName, event: InvitationEvent) -> Result<(), EventBusError>;

    /// Subscribe to invitation events for a site. The stream yields events
    /// as they occur until dropped.
    async fn subscribe(&self, site: &SiteName) -> Result<EventStream, EventBusError>;
}
