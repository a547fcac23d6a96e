//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

/// Invitation record identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvitationId(pub Uuid);

/// Redemption code handed out to receivers. Unique among live invitations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InvitationCode(pub String);

/// Tenant site name wrapper.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SiteName(pub String);

const CODE_LEN: usize = 12;

impl InvitationCode {
    /// Generate a random alphanumeric redemption code.
    pub fn random() -> Self {
        let code: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(CODE_LEN)
            .map(char::from)
            .collect();
        InvitationCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SiteName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
