use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// An unverified registration. Lives outside the users table so an abandoned
/// signup can never block a later real one for the same email.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRegistration {
    pub email: String,
    pub username: String,
    /// Hashed before it is ever written anywhere.
    pub password_hash: String,
    pub code: String,
    pub expires_at: OffsetDateTime,
}

/// Holding area for pending registrations, keyed by email. `put` replaces any
/// existing entry for the same email, which is what keeps at most one code
/// live per address.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn get(&self, email: &str) -> anyhow::Result<Option<PendingRegistration>>;
    async fn put(&self, entry: PendingRegistration) -> anyhow::Result<()>;
    async fn delete(&self, email: &str) -> anyhow::Result<()>;
    /// Drop entries whose code window has passed. Returns how many went.
    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64>;
}

/// Production store: a TTL-swept table, so in-flight registrations survive a
/// process restart and are visible to every instance.
pub struct PgPendingStore {
    db: PgPool,
}

impl PgPendingStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PendingStore for PgPendingStore {
    async fn get(&self, email: &str) -> anyhow::Result<Option<PendingRegistration>> {
        let entry = sqlx::query_as::<_, PendingRegistration>(
            r#"
            SELECT email, username, password_hash, code, expires_at
            FROM pending_registrations
            WHERE email = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(entry)
    }

    async fn put(&self, entry: PendingRegistration) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_registrations (email, username, password_hash, code, expires_at)
            VALUES (LOWER($1), $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET username = EXCLUDED.username,
                password_hash = EXCLUDED.password_hash,
                code = EXCLUDED.code,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&entry.email)
        .bind(&entry.username)
        .bind(&entry.password_hash)
        .bind(&entry.code)
        .bind(entry.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM pending_registrations WHERE email = LOWER($1)")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM pending_registrations WHERE expires_at < $1")
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

/// In-memory store used by `AppState::fake()` and the OTP manager tests.
#[derive(Default)]
pub struct MemoryPendingStore {
    entries: Mutex<HashMap<String, PendingRegistration>>,
}

#[async_trait]
impl PendingStore for MemoryPendingStore {
    async fn get(&self, email: &str) -> anyhow::Result<Option<PendingRegistration>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&email.to_lowercase())
            .cloned())
    }

    async fn put(&self, entry: PendingRegistration) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.email.to_lowercase(), entry);
        Ok(())
    }

    async fn delete(&self, email: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(&email.to_lowercase());
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn entry(email: &str, code: &str, expires_at: OffsetDateTime) -> PendingRegistration {
        PendingRegistration {
            email: email.into(),
            username: "someone".into(),
            password_hash: "$argon2id$fake".into(),
            code: code.into(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn put_replaces_the_previous_entry() {
        let store = MemoryPendingStore::default();
        let now = OffsetDateTime::now_utc();
        store.put(entry("a@b.c", "111111", now)).await.unwrap();
        store.put(entry("a@b.c", "222222", now)).await.unwrap();
        let got = store.get("a@b.c").await.unwrap().unwrap();
        assert_eq!(got.code, "222222");
    }

    #[tokio::test]
    async fn lookups_ignore_email_case() {
        let store = MemoryPendingStore::default();
        let now = OffsetDateTime::now_utc();
        store.put(entry("Alice@Example.com", "123456", now)).await.unwrap();
        assert!(store.get("alice@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_expired_sweeps_only_past_entries() {
        let store = MemoryPendingStore::default();
        let now = OffsetDateTime::now_utc();
        store
            .put(entry("old@x.y", "111111", now - Duration::minutes(1)))
            .await
            .unwrap();
        store
            .put(entry("new@x.y", "222222", now + Duration::minutes(5)))
            .await
            .unwrap();
        let swept = store.delete_expired(now).await.unwrap();
        assert_eq!(swept, 1);
        assert!(store.get("old@x.y").await.unwrap().is_none());
        assert!(store.get("new@x.y").await.unwrap().is_some());
    }
}
