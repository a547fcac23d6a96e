//! Shared test doubles for the acceptance flow tests: a user directory,
//! entity directory and role service backed by plain maps, wired to the
//! in-memory store and event bus.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use lyceum_events_memory::MemoryEventBus;
use lyceum_invitations::{
    DirectoryError, EntityDirectory, EntityKind, InvitationService, RoleService, SiteContext,
    User, UserDirectory,
};
use lyceum_signer::Signer;
use lyceum_storage::SiteName;
use lyceum_store_memory::MemoryInvitationStore;

pub const TEST_SITE: &str = "campus.example.com";
pub const SIGNING_KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

#[derive(Default)]
pub struct FakeUsers {
    users: RwLock<Vec<User>>,
}

impl FakeUsers {
    pub fn add(&self, username: &str, email: Option<&str>, realname: Option<&str>) -> User {
        let user = User {
            username: username.to_string(),
            email: email.map(str::to_string),
            realname: realname.map(str::to_string),
        };
        self.users.write().unwrap().push(user.clone());
        user
    }

    pub fn set_email(&self, username: &str, email: &str) {
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.email = Some(email.to_string());
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for FakeUsers {
    async fn resolve_user(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().unwrap();
        Ok(users
            .iter()
            .find(|u| {
                u.username.eq_ignore_ascii_case(username_or_email)
                    || u.email
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(username_or_email))
            })
            .cloned())
    }

    async fn current_email(&self, user: &User) -> Result<Option<String>, DirectoryError> {
        // consult the directory, not the handed-in snapshot, so email
        // corrections made mid-test are observed
        let users = self.users.read().unwrap();
        Ok(users
            .iter()
            .find(|u| u.username == user.username)
            .and_then(|u| u.email.clone())
            .or_else(|| user.email.clone()))
    }

    async fn create_user(&self, email: &str, realname: &str) -> Result<User, DirectoryError> {
        let username = email
            .split('@')
            .next()
            .unwrap_or(email)
            .to_ascii_lowercase();
        Ok(self.add(&username, Some(email), Some(realname)))
    }
}

#[derive(Default)]
pub struct FakeEntities {
    entities: RwLock<HashMap<String, EntityKind>>,
    pub joins: RwLock<Vec<(String, String)>>,
}

impl FakeEntities {
    pub fn add_community(&self, name: &str) {
        self.entities
            .write()
            .unwrap()
            .insert(name.to_string(), EntityKind::Community);
    }

    pub fn add_friends_list(&self, name: &str) {
        self.entities
            .write()
            .unwrap()
            .insert(name.to_string(), EntityKind::FriendsList);
    }

    pub fn joined(&self) -> Vec<(String, String)> {
        self.joins.read().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EntityDirectory for FakeEntities {
    async fn resolve_entity(&self, name: &str) -> Result<Option<EntityKind>, DirectoryError> {
        Ok(self.entities.read().unwrap().get(name).copied())
    }

    async fn join_community(&self, user: &User, community: &str) -> Result<(), DirectoryError> {
        self.joins
            .write()
            .unwrap()
            .push((community.to_string(), user.username.clone()));
        Ok(())
    }

    async fn add_to_friends_list(&self, list: &str, user: &User) -> Result<(), DirectoryError> {
        self.joins
            .write()
            .unwrap()
            .push((list.to_string(), user.username.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRoles {
    admins: RwLock<HashSet<String>>,
    pub granted: RwLock<Vec<(String, String)>>,
}

impl FakeRoles {
    pub fn make_admin(&self, username: &str) {
        self.admins.write().unwrap().insert(username.to_string());
    }

    pub fn revoke_admin(&self, username: &str) {
        self.admins.write().unwrap().remove(username);
    }

    pub fn grants(&self) -> Vec<(String, String)> {
        self.granted.read().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RoleService for FakeRoles {
    async fn is_admin_or_site_admin(
        &self,
        username: &str,
        _site: &SiteName,
    ) -> Result<bool, DirectoryError> {
        Ok(self.admins.read().unwrap().contains(username))
    }

    async fn grant_site_admin(&self, user: &User, site: &SiteName) -> Result<(), DirectoryError> {
        self.granted
            .write()
            .unwrap()
            .push((user.username.clone(), site.0.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryInvitationStore>,
    pub users: Arc<FakeUsers>,
    pub entities: Arc<FakeEntities>,
    pub roles: Arc<FakeRoles>,
    pub bus: Arc<MemoryEventBus>,
    pub service: InvitationService,
    pub ctx: SiteContext,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryInvitationStore::new());
        let users = Arc::new(FakeUsers::default());
        let entities = Arc::new(FakeEntities::default());
        let roles = Arc::new(FakeRoles::default());
        let bus = Arc::new(MemoryEventBus::new());
        let service = InvitationService::new(
            store.clone(),
            users.clone(),
            entities.clone(),
            roles.clone(),
            bus.clone(),
            Signer::new(*SIGNING_KEY),
        );
        Harness {
            store,
            users,
            entities,
            roles,
            bus,
            service,
            ctx: SiteContext::new(TEST_SITE),
        }
    }

    pub fn user(&self, username: &str, email: &str) -> User {
        self.users.add(username, Some(email), None)
    }
}
