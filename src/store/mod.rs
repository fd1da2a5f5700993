use crate::models::{NewVerificationRecord, User, VerificationRecord};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

/// Connect to SQLite and bring the schema up to date.
pub async fn setup_database(database_url: &str) -> anyhow::Result<SqlitePool> {
    info!("📂 Database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✅ Database connected, migrations applied");

    Ok(pool)
}

/// Read-only access to login accounts.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Append-only access to verification records.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        record: NewVerificationRecord,
    ) -> Result<VerificationRecord, sqlx::Error> {
        sqlx::query_as::<_, VerificationRecord>(
            r#"
            INSERT INTO verification_records (
                user_id, file_name, upload_date, status,
                ai_score, human_score, deepfake_score,
                summary, detailed_explanation,
                metadata_score, linguistic_score, pixel_inconsistency_score,
                source_tokens
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(record.user_id)
        .bind(&record.file_name)
        .bind(record.upload_date)
        .bind(record.status)
        .bind(record.ai_score)
        .bind(record.human_score)
        .bind(record.deepfake_score)
        .bind(&record.summary)
        .bind(&record.detailed_explanation)
        .bind(record.metadata_score)
        .bind(record.linguistic_score)
        .bind(record.pixel_inconsistency_score)
        .bind(&record.source_tokens)
        .fetch_one(&self.pool)
        .await
    }

    /// Every stored record, in storage order. No further ordering is implied.
    pub async fn list_all(&self) -> Result<Vec<VerificationRecord>, sqlx::Error> {
        sqlx::query_as::<_, VerificationRecord>("SELECT * FROM verification_records")
            .fetch_all(&self.pool)
            .await
    }

    /// Records owned by one user. An unknown user yields an empty list,
    /// not an error.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<VerificationRecord>, sqlx::Error> {
        sqlx::query_as::<_, VerificationRecord>(
            "SELECT * FROM verification_records WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationStatus;
    use chrono::Utc;

    async fn test_pool() -> SqlitePool {
        // one connection: each pooled :memory: connection is its own db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn sample_record(user_id: i64) -> NewVerificationRecord {
        NewVerificationRecord {
            user_id,
            file_name: "essay.pdf".to_string(),
            upload_date: Utc::now(),
            status: VerificationStatus::Completed,
            ai_score: 80.0,
            human_score: 20.0,
            deepfake_score: 10.0,
            summary: Some("summary".to_string()),
            detailed_explanation: None,
            metadata_score: 5.0,
            linguistic_score: 12.0,
            pixel_inconsistency_score: 0.0,
            source_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_insert_returns_generated_id() {
        let pool = test_pool().await;
        let store = RecordStore::new(pool);

        let stored = store.insert(sample_record(1)).await.unwrap();
        assert!(stored.id > 0);
        assert_eq!(stored.user_id, 1);
        assert_eq!(stored.status, VerificationStatus::Completed);
        assert_eq!(stored.ai_score, 80.0);
    }

    #[tokio::test]
    async fn test_list_by_user_empty_is_ok() {
        let pool = test_pool().await;
        let store = RecordStore::new(pool);

        let records = store.list_by_user(9999).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_user_filters_owner() {
        let pool = test_pool().await;

        // second owner for the filter check
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (2, 'bob', '!locked')")
            .execute(&pool)
            .await
            .unwrap();

        let store = RecordStore::new(pool);
        store.insert(sample_record(1)).await.unwrap();
        store.insert(sample_record(2)).await.unwrap();
        store.insert(sample_record(1)).await.unwrap();

        assert_eq!(store.list_by_user(1).await.unwrap().len(), 2);
        assert_eq!(store.list_by_user(2).await.unwrap().len(), 1);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_guest_user_is_seeded() {
        let pool = test_pool().await;
        let users = UserStore::new(pool);

        let guest = users.find_by_username("guest").await.unwrap().unwrap();
        assert_eq!(guest.id, 1);
    }
}
