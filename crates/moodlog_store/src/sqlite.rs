use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use moodlog_core::{Emotion, EmotionScores, Entry, EntryStore};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Entries keyed by `(user_id, date)`; a second save on the same day
/// replaces the first.
#[derive(Clone)]
pub struct SqliteEntryStore {
    pool: Pool<Sqlite>,
}

impl SqliteEntryStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().display();
        let db_url = format!("sqlite://{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .connect(&db_url)
            .await
            .with_context(|| format!("Failed to open entry database at {}", path))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self> {
        // Each connection to :memory: is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory entry database")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                diary TEXT NOT NULL,
                face_json TEXT NOT NULL,
                voice_json TEXT NOT NULL,
                final TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, date)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create entries table")?;
        Ok(())
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<Entry> {
    let date: String = row.try_get("date")?;
    let face: String = row.try_get("face_json")?;
    let voice: String = row.try_get("voice_json")?;
    let label: String = row.try_get("final")?;
    Ok(Entry {
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .with_context(|| format!("Bad date in entries table: {}", date))?,
        diary: row.try_get("diary")?,
        face: serde_json::from_str::<EmotionScores>(&face).context("Bad face scores")?,
        voice: serde_json::from_str::<EmotionScores>(&voice).context("Bad voice scores")?,
        final_emotion: label
            .parse::<Emotion>()
            .map_err(|_| anyhow::anyhow!("Bad final emotion in entries table: {}", label))?,
    })
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn upsert(&self, user: &str, entry: &Entry) -> Result<()> {
        let face = serde_json::to_string(&entry.face)?;
        let voice = serde_json::to_string(&entry.voice)?;
        sqlx::query(
            r#"
            INSERT INTO entries (user_id, date, diary, face_json, voice_json, final, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, date) DO UPDATE SET
                diary = excluded.diary,
                face_json = excluded.face_json,
                voice_json = excluded.voice_json,
                final = excluded.final,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user)
        .bind(entry.date.format(DATE_FORMAT).to_string())
        .bind(&entry.diary)
        .bind(face)
        .bind(voice)
        .bind(entry.final_emotion.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to upsert entry")?;

        tracing::debug!("Stored {} entry for {} on {}", entry.final_emotion, user, entry.date);
        Ok(())
    }

    async fn list(&self, user: &str) -> Result<Vec<Entry>> {
        let rows = sqlx::query(
            r#"
            SELECT date, diary, face_json, voice_json, final
            FROM entries
            WHERE user_id = ?
            ORDER BY date ASC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entries")?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn remove(&self, user: &str, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query("DELETE FROM entries WHERE user_id = ? AND date = ?")
            .bind(user)
            .bind(date.format(DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete entry")?;
        Ok(result.rows_affected() > 0)
    }
}
