//! Capability stubs for send-only administration.
//!
//! The admin tool creates, lists and retires invitations; it never runs the
//! acceptance path, which is the application server's job. The directory
//! and role capabilities therefore report themselves unavailable instead of
//! pretending to resolve anything.

use async_trait::async_trait;
use lyceum_invitations::{
    DirectoryError, EntityDirectory, EntityKind, RoleService, User, UserDirectory,
};
use lyceum_storage::SiteName;

pub struct OfflineDirectory;

fn unavailable() -> DirectoryError {
    DirectoryError::Backend("user directory is not available in the admin tool".to_string())
}

#[async_trait]
impl UserDirectory for OfflineDirectory {
    async fn resolve_user(&self, _username_or_email: &str) -> Result<Option<User>, DirectoryError> {
        Err(unavailable())
    }

    async fn current_email(&self, _user: &User) -> Result<Option<String>, DirectoryError> {
        Err(unavailable())
    }

    async fn create_user(&self, _email: &str, _realname: &str) -> Result<User, DirectoryError> {
        Err(unavailable())
    }
}

#[async_trait]
impl EntityDirectory for OfflineDirectory {
    async fn resolve_entity(&self, _name: &str) -> Result<Option<EntityKind>, DirectoryError> {
        Err(unavailable())
    }

    async fn join_community(&self, _user: &User, _community: &str) -> Result<(), DirectoryError> {
        Err(unavailable())
    }

    async fn add_to_friends_list(&self, _list: &str, _user: &User) -> Result<(), DirectoryError> {
        Err(unavailable())
    }
}

#[async_trait]
impl RoleService for OfflineDirectory {
    async fn is_admin_or_site_admin(
        &self,
        _username: &str,
        _site: &SiteName,
    ) -> Result<bool, DirectoryError> {
        Err(unavailable())
    }

    async fn grant_site_admin(&self, _user: &User, _site: &SiteName) -> Result<(), DirectoryError> {
        Err(unavailable())
    }
}
