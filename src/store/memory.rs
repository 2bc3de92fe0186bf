//! In-memory store: HashMaps behind RwLocks. The default backend when no
//! DATABASE_URL is configured; state lives for the process lifetime only.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{LearningRecord, ShareRecord, UserProfile, UserStatistics};

use super::{Store, StoreResult};

#[derive(Clone, Default)]
pub struct MemoryStore {
  profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
  // record id → record; per-user ordering is reconstructed on read
  records: Arc<RwLock<HashMap<String, LearningRecord>>>,
  statistics: Arc<RwLock<HashMap<String, UserStatistics>>>,
  shares: Arc<RwLock<HashMap<String, ShareRecord>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
    Ok(self.profiles.read().await.get(user_id).cloned())
  }

  async fn upsert_profile(&self, profile: UserProfile) -> StoreResult<()> {
    self.profiles.write().await.insert(profile.user_id.clone(), profile);
    Ok(())
  }

  async fn append_record(&self, record: LearningRecord) -> StoreResult<()> {
    self.records.write().await.insert(record.id.clone(), record);
    Ok(())
  }

  async fn list_records(&self, user_id: &str) -> StoreResult<Vec<LearningRecord>> {
    let mut out: Vec<LearningRecord> = self
      .records
      .read()
      .await
      .values()
      .filter(|r| r.user_id == user_id)
      .cloned()
      .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(out)
  }

  async fn get_record(&self, record_id: &str) -> StoreResult<Option<LearningRecord>> {
    Ok(self.records.read().await.get(record_id).cloned())
  }

  async fn delete_record(&self, user_id: &str, record_id: &str) -> StoreResult<bool> {
    let mut records = self.records.write().await;
    match records.get(record_id) {
      Some(r) if r.user_id == user_id => {
        records.remove(record_id);
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn update_record_score(&self, record_id: &str, score: u8) -> StoreResult<()> {
    if let Some(r) = self.records.write().await.get_mut(record_id) {
      if r.score.map_or(true, |prev| score > prev) {
        r.score = Some(score);
      }
    }
    Ok(())
  }

  async fn get_statistics(&self, user_id: &str) -> StoreResult<Option<UserStatistics>> {
    Ok(self.statistics.read().await.get(user_id).cloned())
  }

  async fn put_statistics(&self, stats: UserStatistics) -> StoreResult<()> {
    self.statistics.write().await.insert(stats.user_id.clone(), stats);
    Ok(())
  }

  async fn create_share(&self, share: ShareRecord) -> StoreResult<()> {
    self.shares.write().await.insert(share.code.clone(), share);
    Ok(())
  }

  async fn get_share(&self, code: &str) -> StoreResult<Option<ShareRecord>> {
    Ok(self.shares.read().await.get(code).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn record(id: &str, user: &str) -> LearningRecord {
    LearningRecord {
      id: id.into(),
      user_id: user.into(),
      mandarin: "我想喝咖啡".into(),
      cantonese: "我想饮咖啡".into(),
      score: None,
      created_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn records_append_list_delete() {
    let store = MemoryStore::new();
    store.append_record(record("r1", "u1")).await.unwrap();
    store.append_record(record("r2", "u1")).await.unwrap();
    store.append_record(record("r3", "u2")).await.unwrap();

    let listed = store.list_records("u1").await.unwrap();
    assert_eq!(listed.len(), 2);

    // Deleting someone else's record does nothing.
    assert!(!store.delete_record("u2", "r1").await.unwrap());
    assert!(store.delete_record("u1", "r1").await.unwrap());
    assert!(!store.delete_record("u1", "r1").await.unwrap());
    assert_eq!(store.list_records("u1").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn record_score_only_improves() {
    let store = MemoryStore::new();
    store.append_record(record("r1", "u1")).await.unwrap();
    store.update_record_score("r1", 70).await.unwrap();
    store.update_record_score("r1", 55).await.unwrap();
    assert_eq!(store.get_record("r1").await.unwrap().unwrap().score, Some(70));
    // unknown record is a no-op
    store.update_record_score("ghost", 99).await.unwrap();
  }

  #[tokio::test]
  async fn profile_upsert_overwrites() {
    let store = MemoryStore::new();
    let mut p = UserProfile {
      user_id: "u1".into(),
      nickname: "阿明".into(),
      level: "beginner".into(),
      created_at: Utc::now(),
    };
    store.upsert_profile(p.clone()).await.unwrap();
    p.nickname = "小美".into();
    store.upsert_profile(p).await.unwrap();
    let got = store.get_profile("u1").await.unwrap().unwrap();
    assert_eq!(got.nickname, "小美");
  }

  #[tokio::test]
  async fn statistics_round_trip() {
    let store = MemoryStore::new();
    assert!(store.get_statistics("u1").await.unwrap().is_none());
    let mut s = UserStatistics::new("u1");
    s.record_evaluation(88, Utc::now());
    store.put_statistics(s).await.unwrap();
    let got = store.get_statistics("u1").await.unwrap().unwrap();
    assert_eq!(got.best_score, 88);
  }
}
