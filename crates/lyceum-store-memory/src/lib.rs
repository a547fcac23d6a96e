//! In-memory invitation store.
//!
//! Suitable for tests and single-process embeddings. All operations take a
//! single process-wide lock, so every store call is atomic; the revision
//! check on `update` rejects writes made against a stale read.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use lyceum_storage::{
    Invitation, InvitationCode, InvitationFilter, InvitationStore, StoreError,
};

pub struct MemoryInvitationStore {
    inner: RwLock<HashMap<String, Invitation>>,
}

impl MemoryInvitationStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Invitation>>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Invitation>>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn select<F>(&self, filter: &InvitationFilter, keep: F) -> Result<Vec<Invitation>, StoreError>
    where
        F: Fn(&Invitation) -> bool,
    {
        let map = self.read()?;
        let mut out: Vec<Invitation> = map
            .values()
            .filter(|inv| keep(inv) && filter.matches(inv))
            .cloned()
            .collect();
        // newest first, so "first match wins" callers are deterministic
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

impl Default for MemoryInvitationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InvitationStore for MemoryInvitationStore {
    async fn add(&self, invitation: &Invitation) -> Result<(), StoreError> {
        let mut map = self.write()?;
        if map.contains_key(invitation.code.as_str()) {
            return Err(StoreError::AlreadyExists);
        }
        map.insert(invitation.code.0.clone(), invitation.clone());
        Ok(())
    }

    async fn remove(&self, code: &InvitationCode) -> Result<(), StoreError> {
        let mut map = self.write()?;
        map.remove(code.as_str())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn get(&self, code: &InvitationCode) -> Result<Option<Invitation>, StoreError> {
        let map = self.read()?;
        Ok(map.get(code.as_str()).cloned())
    }

    async fn update(&self, invitation: &Invitation) -> Result<Invitation, StoreError> {
        let mut map = self.write()?;
        let stored = map
            .get_mut(invitation.code.as_str())
            .ok_or(StoreError::NotFound)?;
        if stored.revision != invitation.revision {
            return Err(StoreError::Conflict);
        }
        let mut updated = invitation.clone();
        updated.revision += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn replace_code(
        &self,
        old: &InvitationCode,
        new: &InvitationCode,
    ) -> Result<(), StoreError> {
        let mut map = self.write()?;
        if map.contains_key(new.as_str()) {
            return Err(StoreError::AlreadyExists);
        }
        let mut invitation = map.remove(old.as_str()).ok_or(StoreError::NotFound)?;
        invitation.code = new.clone();
        map.insert(new.0.clone(), invitation);
        Ok(())
    }

    async fn pending(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        let now = Utc::now();
        self.select(filter, |inv| inv.is_pending_at(now))
    }

    async fn expired(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        let now = Utc::now();
        self.select(filter, |inv| !inv.accepted && inv.is_expired_at(now))
    }

    async fn accepted(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        self.select(filter, |inv| inv.accepted)
    }

    async fn all(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        self.select(filter, |_| true)
    }
}
