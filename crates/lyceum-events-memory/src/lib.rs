//! In-memory event bus implementation using tokio broadcast channels.
//!
//! Events are only broadcast within a single process; use a shared-broker
//! implementation for multi-replica deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use lyceum_events::{EventBus, EventBusError, EventStream, InvitationEvent};
use lyceum_storage::SiteName;

const CHANNEL_CAPACITY: usize = 100;

/// In-memory event bus with one broadcast channel per site.
pub struct MemoryEventBus {
    channels: Arc<DashMap<SiteName, broadcast::Sender<InvitationEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    fn get_or_create_channel(&self, site: &SiteName) -> broadcast::Sender<InvitationEvent> {
        self.channels
            .entry(site.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, site: &SiteName, event: InvitationEvent) -> Result<(), EventBusError> {
        let tx = self.get_or_create_channel(site);
        // no receivers is fine; publish is fire-and-forget
        let _ = tx.send(event);
        Ok(())
    }

    async fn subscribe(&self, site: &SiteName) -> Result<EventStream, EventBusError> {
        let tx = self.get_or_create_channel(site);
        let rx = tx.subscribe();
        // lagged receivers just miss events; they were too slow to matter
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());
        Ok(Box::pin(stream))
    }
}
