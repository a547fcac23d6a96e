//! SQLite-backed invitation store.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use lyceum_storage::{
    Invitation, InvitationCode, InvitationFilter, InvitationId, InvitationKind, InvitationStore,
    SiteName, StoreError,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteInvitationStore {
    pool: SqlitePool,
}

impl SqliteInvitationStore {
    /// `~/.lyceum/invitations.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".lyceum");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("invitations.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Fetch rows with an optional acceptance pre-filter, then apply the
    /// shared filter predicate in process. Invitation volumes are
    /// administrative, not hot-path, so the finer receiver/site matching
    /// (case-insensitive, two columns) stays in one place.
    async fn select(
        &self,
        accepted: Option<bool>,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        let sql = match accepted {
            Some(true) => {
                "SELECT * FROM invitations WHERE accepted = 1 ORDER BY created_at DESC, id DESC"
            }
            Some(false) => {
                "SELECT * FROM invitations WHERE accepted = 0 ORDER BY created_at DESC, id DESC"
            }
            None => "SELECT * FROM invitations ORDER BY created_at DESC, id DESC",
        };
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let invitation = row_to_invitation(&row)?;
            if filter.matches(&invitation) {
                out.push(invitation);
            }
        }
        Ok(out)
    }
}

fn timestamp(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn row_to_invitation(row: &SqliteRow) -> Result<Invitation, StoreError> {
    let backend = |e: sqlx::Error| StoreError::Backend(e.to_string());

    let id: String = row.try_get("id").map_err(backend)?;
    let id = Uuid::try_parse(&id).map_err(|e| StoreError::Backend(e.to_string()))?;

    let kind: String = row.try_get("kind").map_err(backend)?;
    let kind = InvitationKind::parse(&kind)
        .ok_or_else(|| StoreError::Backend(format!("unknown invitation kind: {}", kind)))?;

    let created_at: i64 = row.try_get("created_at").map_err(backend)?;
    let created_at = DateTime::from_timestamp(created_at, 0)
        .ok_or_else(|| StoreError::Backend("created_at out of range".into()))?;

    Ok(Invitation {
        id: InvitationId(id),
        code: InvitationCode(row.try_get("code").map_err(backend)?),
        kind,
        sender: row.try_get("sender").map_err(backend)?,
        invited_identifier: row.try_get("invited_identifier").map_err(backend)?,
        accepted_by: row.try_get("accepted_by").map_err(backend)?,
        receiver_name: row.try_get("receiver_name").map_err(backend)?,
        entity: row.try_get("entity").map_err(backend)?,
        target_site: row
            .try_get::<Option<String>, _>("target_site")
            .map_err(backend)?
            .map(SiteName),
        require_matching_email: row.try_get("require_matching_email").map_err(backend)?,
        message: row.try_get("message").map_err(backend)?,
        accepted: row.try_get("accepted").map_err(backend)?,
        accepted_at: timestamp(row.try_get("accepted_at").map_err(backend)?),
        expires_at: timestamp(row.try_get("expires_at").map_err(backend)?),
        disabled: row.try_get("disabled").map_err(backend)?,
        created_at,
        revision: row.try_get("revision").map_err(backend)?,
    })
}

#[async_trait::async_trait]
impl InvitationStore for SqliteInvitationStore {
    async fn add(&self, invitation: &Invitation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO invitations(
                 id, code, kind, sender, invited_identifier, accepted_by,
                 receiver_name, entity, target_site, require_matching_email,
                 message, accepted, accepted_at, expires_at, disabled,
                 created_at, revision)
             VALUES(?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(invitation.id.0.to_string())
        .bind(invitation.code.as_str())
        .bind(invitation.kind.as_str())
        .bind(&invitation.sender)
        .bind(&invitation.invited_identifier)
        .bind(&invitation.accepted_by)
        .bind(&invitation.receiver_name)
        .bind(&invitation.entity)
        .bind(invitation.target_site.as_ref().map(|s| s.0.clone()))
        .bind(invitation.require_matching_email)
        .bind(&invitation.message)
        .bind(invitation.accepted)
        .bind(invitation.accepted_at.map(|t| t.timestamp()))
        .bind(invitation.expires_at.map(|t| t.timestamp()))
        .bind(invitation.disabled)
        .bind(invitation.created_at.timestamp())
        .bind(invitation.revision)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let s = e.to_string();
            if s.contains("UNIQUE") {
                StoreError::AlreadyExists
            } else {
                StoreError::Backend(s)
            }
        })?;
        Ok(())
    }

    async fn remove(&self, code: &InvitationCode) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM invitations WHERE code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get(&self, code: &InvitationCode) -> Result<Option<Invitation>, StoreError> {
        let row = sqlx::query("SELECT * FROM invitations WHERE code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Ok(None),
            Some(row) => Ok(Some(row_to_invitation(&row)?)),
        }
    }

    async fn update(&self, invitation: &Invitation) -> Result<Invitation, StoreError> {
        let result = sqlx::query(
            "UPDATE invitations
                SET sender = ?, invited_identifier = ?, accepted_by = ?,
                    receiver_name = ?, entity = ?, target_site = ?,
                    require_matching_email = ?, message = ?, accepted = ?,
                    accepted_at = ?, expires_at = ?, disabled = ?,
                    revision = revision + 1
              WHERE code = ? AND revision = ?",
        )
        .bind(&invitation.sender)
        .bind(&invitation.invited_identifier)
        .bind(&invitation.accepted_by)
        .bind(&invitation.receiver_name)
        .bind(&invitation.entity)
        .bind(invitation.target_site.as_ref().map(|s| s.0.clone()))
        .bind(invitation.require_matching_email)
        .bind(&invitation.message)
        .bind(invitation.accepted)
        .bind(invitation.accepted_at.map(|t| t.timestamp()))
        .bind(invitation.expires_at.map(|t| t.timestamp()))
        .bind(invitation.disabled)
        .bind(invitation.code.as_str())
        .bind(invitation.revision)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            // distinguish a vanished record from a lost race
            return match self.get(&invitation.code).await? {
                Some(_) => Err(StoreError::Conflict),
                None => Err(StoreError::NotFound),
            };
        }

        let mut updated = invitation.clone();
        updated.revision += 1;
        Ok(updated)
    }

    async fn replace_code(
        &self,
        old: &InvitationCode,
        new: &InvitationCode,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE invitations SET code = ? WHERE code = ?")
            .bind(new.as_str())
            .bind(old.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let s = e.to_string();
                if s.contains("UNIQUE") {
                    StoreError::AlreadyExists
                } else {
                    StoreError::Backend(s)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn pending(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        let now = Utc::now();
        let mut rows = self.select(Some(false), filter).await?;
        rows.retain(|inv| inv.is_pending_at(now));
        Ok(rows)
    }

    async fn expired(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        let now = Utc::now();
        let mut rows = self.select(Some(false), filter).await?;
        rows.retain(|inv| inv.is_expired_at(now));
        Ok(rows)
    }

    async fn accepted(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        self.select(Some(true), filter).await
    }

    async fn all(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, StoreError> {
        self.select(None, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn site_invitation(code: &str, email: &str) -> Invitation {
        let mut inv = Invitation::new(
            InvitationCode(code.to_string()),
            InvitationKind::Site,
            "admin",
        );
        inv.invited_identifier = Some(email.to_string());
        inv.target_site = Some(SiteName("campus".to_string()));
        inv
    }

    #[tokio::test]
    async fn add_get_round_trip_preserves_fields() {
        let store = SqliteInvitationStore::open_in_memory().await.unwrap();
        let mut inv = site_invitation("ROUNDTRIP", "r@example.com");
        inv.receiver_name = Some("Ricky".to_string());
        inv.require_matching_email = true;
        inv.message = Some("welcome aboard".to_string());
        inv.expires_at = Some(Utc::now() + Duration::hours(24));
        store.add(&inv).await.unwrap();

        let loaded = store.get(&inv.code).await.unwrap().unwrap();
        assert_eq!(loaded.kind, InvitationKind::Site);
        assert_eq!(loaded.sender, "admin");
        assert_eq!(loaded.invited_identifier.as_deref(), Some("r@example.com"));
        assert_eq!(loaded.receiver_name.as_deref(), Some("Ricky"));
        assert!(loaded.require_matching_email);
        assert_eq!(loaded.message.as_deref(), Some("welcome aboard"));
        assert_eq!(loaded.target_site.as_ref().unwrap().0, "campus");
        assert!(!loaded.accepted);
        assert_eq!(loaded.revision, 0);
    }

    #[tokio::test]
    async fn duplicate_code_maps_to_already_exists() {
        let store = SqliteInvitationStore::open_in_memory().await.unwrap();
        store
            .add(&site_invitation("DUP", "a@example.com"))
            .await
            .unwrap();
        let err = store
            .add(&site_invitation("DUP", "b@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let store = SqliteInvitationStore::open_in_memory().await.unwrap();
        let inv = site_invitation("RACE", "a@example.com");
        store.add(&inv).await.unwrap();

        let mut winner = store.get(&inv.code).await.unwrap().unwrap();
        winner.accepted = true;
        winner.accepted_by = Some("a_user".to_string());
        winner.accepted_at = Some(Utc::now());
        let committed = store.update(&winner).await.unwrap();
        assert_eq!(committed.revision, 1);

        let mut loser = inv.clone();
        loser.disabled = true;
        assert!(matches!(
            store.update(&loser).await.unwrap_err(),
            StoreError::Conflict
        ));
    }

    #[tokio::test]
    async fn pending_excludes_expired_disabled_and_accepted() {
        let store = SqliteInvitationStore::open_in_memory().await.unwrap();

        store
            .add(&site_invitation("PEND", "p@example.com"))
            .await
            .unwrap();

        let mut expired = site_invitation("EXPD", "e@example.com");
        expired.expires_at = Some(Utc::now() - Duration::seconds(1000));
        store.add(&expired).await.unwrap();

        let mut disabled = site_invitation("DIS", "d@example.com");
        disabled.disabled = true;
        store.add(&disabled).await.unwrap();

        let mut accepted = site_invitation("ACPT", "c@example.com");
        accepted.accepted = true;
        accepted.accepted_by = Some("c_user".to_string());
        accepted.accepted_at = Some(Utc::now());
        store.add(&accepted).await.unwrap();

        let filter = InvitationFilter::default();
        let pending: Vec<_> = store
            .pending(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.code.0)
            .collect();
        assert_eq!(pending, vec!["PEND".to_string()]);

        let expired: Vec<_> = store
            .expired(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.code.0)
            .collect();
        assert_eq!(expired, vec!["EXPD".to_string()]);
    }

    #[tokio::test]
    async fn filter_by_receiver_and_site() {
        let store = SqliteInvitationStore::open_in_memory().await.unwrap();
        store
            .add(&site_invitation("ONE", "one@example.com"))
            .await
            .unwrap();
        store
            .add(&site_invitation("TWO", "two@example.com"))
            .await
            .unwrap();

        let filter = InvitationFilter::by_receiver("ONE@EXAMPLE.COM")
            .site(SiteName("campus".to_string()));
        let found = store.pending(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code.0, "ONE");
    }
}
