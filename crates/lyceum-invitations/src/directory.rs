//! Host-application capabilities the invitation lifecycle calls through.
//!
//! The user/entity/role model lives in the host application; these traits
//! are the narrow boundary the lifecycle depends on. Backends are expected
//! to be request-scoped adapters over whatever directory the host runs.

use thiserror::Error;

use lyceum_storage::SiteName;

/// Uniform error type for directory/role backends.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// A resolved account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub email: Option<String>,
    pub realname: Option<String>,
}

/// Account lookup and creation.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve an account by username or email.
    async fn resolve_user(&self, username_or_email: &str)
    -> Result<Option<User>, DirectoryError>;

    /// The account's current contact email, which may have changed since
    /// the account (or any invitation naming it) was created.
    async fn current_email(&self, user: &User) -> Result<Option<String>, DirectoryError>;

    /// Create an account for an invited email address.
    async fn create_user(&self, email: &str, realname: &str) -> Result<User, DirectoryError>;
}

/// The kinds of joinable entity an invitation can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Community,
    FriendsList,
}

/// Communities and friends lists inside a site.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait EntityDirectory: Send + Sync {
    async fn resolve_entity(&self, name: &str) -> Result<Option<EntityKind>, DirectoryError>;

    /// Record membership and follow the community.
    async fn join_community(&self, user: &User, community: &str) -> Result<(), DirectoryError>;

    async fn add_to_friends_list(&self, list: &str, user: &User) -> Result<(), DirectoryError>;
}

/// Role and permission checks.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait RoleService: Send + Sync {
    /// Whether the named account currently holds admin or site-admin on the
    /// site. Evaluated at call time, never cached.
    async fn is_admin_or_site_admin(
        &self,
        username: &str,
        site: &SiteName,
    ) -> Result<bool, DirectoryError>;

    async fn grant_site_admin(&self, user: &User, site: &SiteName) -> Result<(), DirectoryError>;
}
