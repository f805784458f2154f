//! SQLite-backed user store
//!
//! Single source of truth for user rows, including the per-user
//! `token_version` epoch counter that drives refresh-token revocation.

use super::jwt::AuthError;
use sqlx::{Row, SqlitePool};
use stockify_core::{Identity, Role};
use tracing::{debug, error, info};

/// A user row as stored in the database
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image_url: Option<String>,
    pub role: String,
    pub token_version: i64,
    pub created_at: String,
}

impl UserRecord {
    /// Snapshot the row into the identity embedded in access tokens
    pub fn to_identity(&self) -> Result<Identity, AuthError> {
        let role: Role = self.role.parse().map_err(|_| {
            error!("User {} has unknown role '{}'", self.id, self.role);
            AuthError::InvalidToken
        })?;

        Ok(Identity {
            id: self.id.to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
            role,
            image: self.image_url.clone(),
        })
    }
}

/// Database-backed user store with an explicitly injected pool.
///
/// The pool is opened by the server at startup and closed at shutdown; the
/// store never creates connections on its own.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, AuthError> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_tables(&self) -> Result<(), AuthError> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                image_url TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                token_version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#;

        sqlx::query(query).execute(&self.pool).await.map_err(|e| {
            error!("Failed to create users table: {}", e);
            AuthError::Storage(e.to_string())
        })?;

        debug!("Users table ready");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> UserRecord {
        UserRecord {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            image_url: row.get("image_url"),
            role: row.get("role"),
            token_version: row.get("token_version"),
            created_at: row.get("created_at"),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to query user by email: {}", e);
                AuthError::Storage(e.to_string())
            })?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to query user by id: {}", e);
                AuthError::Storage(e.to_string())
            })?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>, AuthError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list users: {}", e);
                AuthError::Storage(e.to_string())
            })?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    /// Insert a new user with token_version 0; returns the new row id.
    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        image_url: Option<&str>,
        role: Role,
    ) -> Result<i64, AuthError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, image_url, role, token_version)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(image_url)
        .bind(role.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AuthError::Validation("Email is already in use".to_string())
            }
            other => {
                error!("Failed to insert user: {}", other);
                AuthError::Storage(other.to_string())
            }
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Increment the user's token-version epoch, revoking every outstanding
    /// refresh token. Incrementing twice is safe; each call advances the
    /// epoch by exactly one.
    pub async fn bump_token_version(&self, id: i64) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE users
            SET token_version = token_version + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to bump token version for user {}: {}", id, e);
            AuthError::Storage(e.to_string())
        })?;

        debug!("Token version bumped for user {}", id);
        Ok(())
    }

    /// Store a new password hash and advance the epoch in the same statement,
    /// invalidating all refresh tokens issued before the change.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?,
                token_version = token_version + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update password for user {}: {}", id, e);
            AuthError::Storage(e.to_string())
        })?;

        Ok(())
    }

    /// Seed the default admin account if no admin exists yet
    pub async fn ensure_default_admin(&self, password_hash: &str) -> Result<(), AuthError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to check for admin user: {}", e);
                AuthError::Storage(e.to_string())
            })?;

        let count: i64 = row.get("count");
        if count > 0 {
            debug!("Admin user already exists");
            return Ok(());
        }

        self.insert(
            "Administrator",
            "admin@stockify.local",
            password_hash,
            None,
            Role::Admin,
        )
        .await?;

        info!("Created default admin user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteUserStore {
        // In-memory SQLite: one connection, one database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteUserStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let store = test_store().await;
        let id = store
            .insert("Ana", "ana@example.com", "hash", None, Role::User)
            .await
            .unwrap();

        let by_id = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ana@example.com");
        assert_eq!(by_id.token_version, 0);

        let by_email = store.get_by_email("ana@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let store = test_store().await;
        store
            .insert("Ana", "ana@example.com", "hash", None, Role::User)
            .await
            .unwrap();

        let err = store
            .insert("Other", "ana@example.com", "hash2", None, Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn bump_advances_version_by_one_each_time() {
        let store = test_store().await;
        let id = store
            .insert("Ana", "ana@example.com", "hash", None, Role::User)
            .await
            .unwrap();

        store.bump_token_version(id).await.unwrap();
        store.bump_token_version(id).await.unwrap();

        let user = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.token_version, 2);
    }

    #[tokio::test]
    async fn password_update_advances_version() {
        let store = test_store().await;
        let id = store
            .insert("Ana", "ana@example.com", "hash", None, Role::User)
            .await
            .unwrap();

        store.update_password(id, "new-hash").await.unwrap();

        let user = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");
        assert_eq!(user.token_version, 1);
    }

    #[tokio::test]
    async fn default_admin_is_seeded_once() {
        let store = test_store().await;
        store.ensure_default_admin("hash").await.unwrap();
        store.ensure_default_admin("hash").await.unwrap();

        let admins: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|u| u.role == "admin")
            .collect();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, "admin@stockify.local");
    }

    #[tokio::test]
    async fn record_maps_to_identity() {
        let store = test_store().await;
        let id = store
            .insert("Ana", "ana@example.com", "hash", Some("http://img"), Role::Manager)
            .await
            .unwrap();

        let identity = store
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .to_identity()
            .unwrap();
        assert_eq!(identity.id, id.to_string());
        assert_eq!(identity.role, Role::Manager);
        assert_eq!(identity.image.as_deref(), Some("http://img"));
    }
}
