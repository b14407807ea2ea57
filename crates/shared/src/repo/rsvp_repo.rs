use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{NoFlakeError, Result};
use crate::storage::KvBackend;

pub const RSVPS_KEY: &str = "noflake_rsvps";

/// Free-event RSVPs: event id to participant addresses, append-only.
#[derive(Clone)]
pub struct RsvpRepo {
    backend: Arc<dyn KvBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl RsvpRepo {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend, write_lock: Arc::new(Mutex::new(())) }
    }

    async fn try_load(&self) -> Result<HashMap<String, Vec<String>>> {
        match self.backend.get(RSVPS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| NoFlakeError::Storage(format!("stored rsvps are not valid json: {e}"))),
            None => Ok(HashMap::new()),
        }
    }

    pub async fn list(&self, event_id: &str) -> Vec<String> {
        match self.try_load().await {
            Ok(mut all) => all.remove(event_id).unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "reading rsvps from storage failed");
                Vec::new()
            }
        }
    }

    /// Returns `false` when the address was already on the list. Addresses compare
    /// case-insensitively so checksummed and lowercase forms are one participant.
    /// An unreadable document is left untouched and the add is reported as accepted.
    pub async fn add(&self, event_id: &str, address: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut all = match self.try_load().await {
            Ok(all) => all,
            Err(e) => {
                tracing::error!(error = %e, event_id, "rsvps unreadable; write skipped");
                return true;
            }
        };
        let entry = all.entry(event_id.to_string()).or_default();
        if entry.iter().any(|a| a.eq_ignore_ascii_case(address)) {
            return false;
        }
        entry.push(address.to_string());
        match serde_json::to_string(&all) {
            Ok(raw) => {
                if let Err(e) = self.backend.put(RSVPS_KEY, &raw).await {
                    tracing::error!(error = %e, event_id, "saving rsvp failed");
                }
            }
            Err(e) => tracing::error!(error = %e, "serializing rsvps failed"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let repo = RsvpRepo::new(Arc::new(MemoryKv::new()));
        let addr = "0xAbC0000000000000000000000000000000000001";
        assert!(repo.add("event_1_x", addr).await);
        assert!(!repo.add("event_1_x", addr).await);
        assert!(!repo.add("event_1_x", &addr.to_lowercase()).await);
        assert_eq!(repo.list("event_1_x").await, vec![addr.to_string()]);
    }

    #[tokio::test]
    async fn test_lists_are_per_event() {
        let repo = RsvpRepo::new(Arc::new(MemoryKv::new()));
        repo.add("event_a", "0x1").await;
        repo.add("event_a", "0x2").await;
        repo.add("event_b", "0x1").await;
        assert_eq!(repo.list("event_a").await.len(), 2);
        assert_eq!(repo.list("event_b").await, vec!["0x1".to_string()]);
        assert!(repo.list("event_c").await.is_empty());
    }

    #[tokio::test]
    async fn test_layout_is_object_of_arrays() {
        let kv = Arc::new(MemoryKv::new());
        let repo = RsvpRepo::new(kv.clone());
        repo.add("event_a", "0x1").await;
        let raw = kv.get(RSVPS_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"event_a": ["0x1"]}));
    }

    #[tokio::test]
    async fn test_failed_read_keeps_other_events() {
        let kv = Arc::new(MemoryKv::new());
        let repo = RsvpRepo::new(kv.clone());
        repo.add("event_a", "0x1").await;
        kv.set_failing_reads(true);
        repo.add("event_b", "0x2").await;
        kv.set_failing_reads(false);
        assert_eq!(repo.list("event_a").await, vec!["0x1".to_string()]);
        assert!(repo.list("event_b").await.is_empty());

        kv.put(RSVPS_KEY, "[1,2").await.unwrap();
        repo.add("event_c", "0x3").await;
        assert_eq!(kv.get(RSVPS_KEY).await.unwrap().as_deref(), Some("[1,2"));
    }
}
