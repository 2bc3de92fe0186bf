//! Persistence behind one CRUD contract, with two interchangeable
//! implementations: an in-memory map store (default) and a SQLite store
//! selected by setting `DATABASE_URL`.

use async_trait::async_trait;

use crate::domain::{LearningRecord, ShareRecord, UserProfile, UserStatistics};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed storage with list-append and point-delete. No invariant beyond
/// primary-key uniqueness; share expiry is enforced by the caller.
#[async_trait]
pub trait Store: Send + Sync {
  async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>>;
  async fn upsert_profile(&self, profile: UserProfile) -> StoreResult<()>;

  async fn append_record(&self, record: LearningRecord) -> StoreResult<()>;
  /// Records for a user, newest first.
  async fn list_records(&self, user_id: &str) -> StoreResult<Vec<LearningRecord>>;
  async fn get_record(&self, record_id: &str) -> StoreResult<Option<LearningRecord>>;
  /// Returns false when no such record exists for the user.
  async fn delete_record(&self, user_id: &str, record_id: &str) -> StoreResult<bool>;
  /// Record the best score achieved for a story. No-op when the record
  /// is missing or already holds a higher score.
  async fn update_record_score(&self, record_id: &str, score: u8) -> StoreResult<()>;

  async fn get_statistics(&self, user_id: &str) -> StoreResult<Option<UserStatistics>>;
  async fn put_statistics(&self, stats: UserStatistics) -> StoreResult<()>;

  async fn create_share(&self, share: ShareRecord) -> StoreResult<()>;
  async fn get_share(&self, code: &str) -> StoreResult<Option<ShareRecord>>;
}
