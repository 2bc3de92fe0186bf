//! SQLite store via sqlx. Selected when DATABASE_URL is set.
//!
//! The schema is bootstrapped with CREATE TABLE IF NOT EXISTS at startup;
//! there is no migration machinery.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;

use crate::domain::{LearningRecord, ShareRecord, UserProfile, UserStatistics};

use super::{Store, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
  user_id    TEXT PRIMARY KEY,
  nickname   TEXT NOT NULL DEFAULT '',
  level      TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS records (
  id         TEXT PRIMARY KEY,
  user_id    TEXT NOT NULL,
  mandarin   TEXT NOT NULL,
  cantonese  TEXT NOT NULL,
  score      INTEGER,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_user ON records(user_id);
CREATE TABLE IF NOT EXISTS shares (
  code       TEXT PRIMARY KEY,
  record_id  TEXT NOT NULL,
  user_id    TEXT NOT NULL,
  created_at TEXT NOT NULL,
  expires_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS statistics (
  user_id           TEXT PRIMARY KEY,
  total_recordings  INTEGER NOT NULL DEFAULT 0,
  total_score       INTEGER NOT NULL DEFAULT 0,
  average_score     INTEGER NOT NULL DEFAULT 0,
  best_score        INTEGER NOT NULL DEFAULT 0,
  streak_days       INTEGER NOT NULL DEFAULT 0,
  last_practice_day TEXT
);
"#;

#[derive(Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Connect and bootstrap the schema.
  pub async fn connect(url: &str) -> StoreResult<Self> {
    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .connect(url)
      .await?;
    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    info!(target: "lingsnap_backend", %url, "SQLite store ready");
    Ok(Self { pool })
  }
}

fn profile_from_row(row: &SqliteRow) -> Result<UserProfile, sqlx::Error> {
  Ok(UserProfile {
    user_id: row.try_get("user_id")?,
    nickname: row.try_get("nickname")?,
    level: row.try_get("level")?,
    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
  })
}

fn record_from_row(row: &SqliteRow) -> Result<LearningRecord, sqlx::Error> {
  Ok(LearningRecord {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    mandarin: row.try_get("mandarin")?,
    cantonese: row.try_get("cantonese")?,
    score: row.try_get::<Option<u8>, _>("score")?,
    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
  })
}

fn share_from_row(row: &SqliteRow) -> Result<ShareRecord, sqlx::Error> {
  Ok(ShareRecord {
    code: row.try_get("code")?,
    record_id: row.try_get("record_id")?,
    user_id: row.try_get("user_id")?,
    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
  })
}

fn statistics_from_row(row: &SqliteRow) -> Result<UserStatistics, sqlx::Error> {
  Ok(UserStatistics {
    user_id: row.try_get("user_id")?,
    total_recordings: row.try_get::<u32, _>("total_recordings")?,
    total_score: row.try_get::<i64, _>("total_score")? as u64,
    average_score: row.try_get::<u8, _>("average_score")?,
    best_score: row.try_get::<u8, _>("best_score")?,
    streak_days: row.try_get::<u32, _>("streak_days")?,
    last_practice_day: row.try_get::<Option<NaiveDate>, _>("last_practice_day")?,
  })
}

#[async_trait]
impl Store for SqliteStore {
  async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
    let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(profile_from_row).transpose().map_err(StoreError::from)
  }

  async fn upsert_profile(&self, profile: UserProfile) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO profiles (user_id, nickname, level, created_at) VALUES (?, ?, ?, ?)
       ON CONFLICT(user_id) DO UPDATE SET nickname = excluded.nickname, level = excluded.level",
    )
    .bind(&profile.user_id)
    .bind(&profile.nickname)
    .bind(&profile.level)
    .bind(profile.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn append_record(&self, record: LearningRecord) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO records (id, user_id, mandarin, cantonese, score, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.mandarin)
    .bind(&record.cantonese)
    .bind(record.score)
    .bind(record.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn list_records(&self, user_id: &str) -> StoreResult<Vec<LearningRecord>> {
    let rows = sqlx::query("SELECT * FROM records WHERE user_id = ? ORDER BY created_at DESC")
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    rows
      .iter()
      .map(record_from_row)
      .collect::<Result<Vec<_>, _>>()
      .map_err(StoreError::from)
  }

  async fn get_record(&self, record_id: &str) -> StoreResult<Option<LearningRecord>> {
    let row = sqlx::query("SELECT * FROM records WHERE id = ?")
      .bind(record_id)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(record_from_row).transpose().map_err(StoreError::from)
  }

  async fn delete_record(&self, user_id: &str, record_id: &str) -> StoreResult<bool> {
    let done = sqlx::query("DELETE FROM records WHERE id = ? AND user_id = ?")
      .bind(record_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }

  async fn update_record_score(&self, record_id: &str, score: u8) -> StoreResult<()> {
    sqlx::query(
      "UPDATE records SET score = ? WHERE id = ? AND (score IS NULL OR score < ?)",
    )
    .bind(score)
    .bind(record_id)
    .bind(score)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn get_statistics(&self, user_id: &str) -> StoreResult<Option<UserStatistics>> {
    let row = sqlx::query("SELECT * FROM statistics WHERE user_id = ?")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(statistics_from_row).transpose().map_err(StoreError::from)
  }

  async fn put_statistics(&self, stats: UserStatistics) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO statistics (user_id, total_recordings, total_score, average_score, best_score, streak_days, last_practice_day)
       VALUES (?, ?, ?, ?, ?, ?, ?)
       ON CONFLICT(user_id) DO UPDATE SET
         total_recordings = excluded.total_recordings,
         total_score = excluded.total_score,
         average_score = excluded.average_score,
         best_score = excluded.best_score,
         streak_days = excluded.streak_days,
         last_practice_day = excluded.last_practice_day",
    )
    .bind(&stats.user_id)
    .bind(stats.total_recordings)
    .bind(stats.total_score as i64)
    .bind(stats.average_score)
    .bind(stats.best_score)
    .bind(stats.streak_days)
    .bind(stats.last_practice_day)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn create_share(&self, share: ShareRecord) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO shares (code, record_id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&share.code)
    .bind(&share.record_id)
    .bind(&share.user_id)
    .bind(share.created_at)
    .bind(share.expires_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn get_share(&self, code: &str) -> StoreResult<Option<ShareRecord>> {
    let row = sqlx::query("SELECT * FROM shares WHERE code = ?")
      .bind(code)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(share_from_row).transpose().map_err(StoreError::from)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  #[tokio::test]
  async fn sqlite_store_crud_round_trip() {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();

    let profile = UserProfile {
      user_id: "u1".into(),
      nickname: "阿明".into(),
      level: "beginner".into(),
      created_at: Utc::now(),
    };
    store.upsert_profile(profile).await.unwrap();
    assert_eq!(store.get_profile("u1").await.unwrap().unwrap().nickname, "阿明");

    let record = LearningRecord {
      id: "r1".into(),
      user_id: "u1".into(),
      mandarin: "今天天气很好".into(),
      cantonese: "今日天气几好".into(),
      score: Some(91),
      created_at: Utc::now(),
    };
    store.append_record(record).await.unwrap();
    assert_eq!(store.list_records("u1").await.unwrap().len(), 1);
    assert_eq!(store.get_record("r1").await.unwrap().unwrap().score, Some(91));
    store.update_record_score("r1", 95).await.unwrap();
    store.update_record_score("r1", 40).await.unwrap();
    assert_eq!(store.get_record("r1").await.unwrap().unwrap().score, Some(95));
    assert!(!store.delete_record("someone-else", "r1").await.unwrap());
    assert!(store.delete_record("u1", "r1").await.unwrap());

    let mut stats = UserStatistics::new("u1");
    stats.record_evaluation(80, Utc::now());
    store.put_statistics(stats).await.unwrap();
    let got = store.get_statistics("u1").await.unwrap().unwrap();
    assert_eq!(got.total_recordings, 1);
    assert_eq!(got.best_score, 80);

    let now = Utc::now();
    let share = ShareRecord {
      code: "abcd2345".into(),
      record_id: "r1".into(),
      user_id: "u1".into(),
      created_at: now,
      expires_at: now + chrono::Duration::days(30),
    };
    store.create_share(share).await.unwrap();
    assert!(store.get_share("abcd2345").await.unwrap().is_some());
    assert!(store.get_share("missing1").await.unwrap().is_none());
  }
}
