//! Registry of negotiated contract agreements.
//!
//! A controller records, per contract agreement id, the provider address
//! and asset the agreement was negotiated for, so a later transfer can be
//! issued from the agreement id alone. Storage sits behind the
//! [`AgreementStore`] trait; [`InMemoryAgreementStore`] keeps records for the
//! lifetime of the process.

use crate::traits::ConnectorResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// What a controller remembers about a contract agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRecord {
    /// IDS data address of the provider the agreement was negotiated with.
    pub provider_url: String,
    pub asset_id: String,
    pub negotiated_at: DateTime<Utc>,
}

impl AgreementRecord {
    pub fn new(provider_url: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            provider_url: provider_url.into(),
            asset_id: asset_id.into(),
            negotiated_at: Utc::now(),
        }
    }
}

/// Storage for agreement records, keyed by contract agreement id.
#[async_trait]
pub trait AgreementStore: Send + Sync + 'static {
    /// Returns the record for `agreement_id`, if one was stored.
    async fn get(&self, agreement_id: &str) -> ConnectorResult<Option<AgreementRecord>>;

    /// Stores `record` under `agreement_id`, replacing any previous record.
    async fn put(&self, agreement_id: &str, record: AgreementRecord) -> ConnectorResult<()>;

    /// Removes the record for `agreement_id`, returning it if it existed.
    async fn remove(&self, agreement_id: &str) -> ConnectorResult<Option<AgreementRecord>>;

    /// Lists all agreement ids currently stored.
    async fn list(&self) -> ConnectorResult<Vec<String>>;
}

/// Process-local agreement store.
#[derive(Debug, Default)]
pub struct InMemoryAgreementStore {
    records: RwLock<HashMap<String, AgreementRecord>>,
}

impl InMemoryAgreementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgreementStore for InMemoryAgreementStore {
    async fn get(&self, agreement_id: &str) -> ConnectorResult<Option<AgreementRecord>> {
        Ok(self.records.read().await.get(agreement_id).cloned())
    }

    async fn put(&self, agreement_id: &str, record: AgreementRecord) -> ConnectorResult<()> {
        self.records
            .write()
            .await
            .insert(agreement_id.to_string(), record);
        Ok(())
    }

    async fn remove(&self, agreement_id: &str) -> ConnectorResult<Option<AgreementRecord>> {
        Ok(self.records.write().await.remove(agreement_id))
    }

    async fn list(&self) -> ConnectorResult<Vec<String>> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = InMemoryAgreementStore::new();
        assert_eq!(store.get("ag-1").await.unwrap(), None);

        let record = AgreementRecord::new("http://provider:8282/api/v1/ids/data", "a1");
        store.put("ag-1", record.clone()).await.unwrap();
        assert_eq!(store.get("ag-1").await.unwrap(), Some(record.clone()));

        assert_eq!(store.remove("ag-1").await.unwrap(), Some(record));
        assert_eq!(store.get("ag-1").await.unwrap(), None);
        assert_eq!(store.remove("ag-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_record() {
        let store = InMemoryAgreementStore::new();
        store
            .put("ag-1", AgreementRecord::new("http://p1", "a1"))
            .await
            .unwrap();
        store
            .put("ag-1", AgreementRecord::new("http://p2", "a2"))
            .await
            .unwrap();

        let record = store.get("ag-1").await.unwrap().unwrap();
        assert_eq!(record.provider_url, "http://p2");
        assert_eq!(record.asset_id, "a2");
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = InMemoryAgreementStore::new();
        for id in ["ag-3", "ag-1", "ag-2"] {
            store
                .put(id, AgreementRecord::new("http://p", "a"))
                .await
                .unwrap();
        }
        assert_eq!(store.list().await.unwrap(), vec!["ag-1", "ag-2", "ag-3"]);
    }

    #[tokio::test]
    async fn test_concurrent_puts_keep_distinct_keys() {
        let store = std::sync::Arc::new(InMemoryAgreementStore::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .put(&format!("ag-{}", i), AgreementRecord::new("http://p", "a"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list().await.unwrap().len(), 10);
    }
}
