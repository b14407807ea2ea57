use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::Mutex;

use crate::domain::event::{EventMetadata, EventPatch, NewEventMetadata};
use crate::error::{NoFlakeError, Result};
use crate::storage::KvBackend;

pub const EVENTS_KEY: &str = "noflake_events";
/// Marks an id as a metadata record rather than an on-chain event number.
pub const EVENT_ID_PREFIX: &str = "event_";

/// Event metadata kept as a single JSON list.
///
/// Storage failures never reach the caller: reads fall back to an empty list and
/// writes are logged and dropped. A write never replaces a document it could not read.
#[derive(Clone)]
pub struct EventRepo {
    backend: Arc<dyn KvBackend>,
    write_lock: Arc<Mutex<()>>,
}

pub fn generate_event_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{EVENT_ID_PREFIX}{}_{suffix}", now.timestamp_millis())
}

impl EventRepo {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend, write_lock: Arc::new(Mutex::new(())) }
    }

    async fn try_load(&self) -> Result<Vec<EventMetadata>> {
        match self.backend.get(EVENTS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| NoFlakeError::Storage(format!("stored events are not valid json: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn load(&self) -> Vec<EventMetadata> {
        self.try_load().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "reading events from storage failed");
            Vec::new()
        })
    }

    /// Base document for a read-modify-write; `None` means the write must be skipped.
    async fn load_for_write(&self) -> Option<Vec<EventMetadata>> {
        match self.try_load().await {
            Ok(events) => Some(events),
            Err(e) => {
                tracing::error!(error = %e, "events unreadable; write skipped");
                None
            }
        }
    }

    async fn save(&self, events: &[EventMetadata]) {
        let raw = match serde_json::to_string(events) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "serializing events failed");
                return;
            }
        };
        if let Err(e) = self.backend.put(EVENTS_KEY, &raw).await {
            tracing::error!(error = %e, count = events.len(), "saving events to storage failed");
        }
    }

    pub async fn create(&self, new: NewEventMetadata) -> EventMetadata {
        let _guard = self.write_lock.lock().await;
        let existing = self.load_for_write().await;
        let now = Utc::now();
        let mut id = generate_event_id(now);
        while existing.iter().flatten().any(|e| e.id == id) {
            id = generate_event_id(now);
        }
        let event = EventMetadata {
            id,
            title: new.title,
            description: new.description,
            location: new.location,
            datetime: new.datetime,
            kind: new.kind,
            deposit_amount: new.deposit_amount,
            organizer_address: new.organizer_address,
            created_at: now,
            on_chain_event_id: new.on_chain_event_id,
            participant_fields: new.participant_fields,
        };
        if let Some(mut events) = existing {
            events.push(event.clone());
            self.save(&events).await;
        }
        tracing::info!(id = %event.id, kind = event.kind.as_str(), "event metadata created");
        event
    }

    pub async fn get(&self, id: &str) -> Option<EventMetadata> {
        self.load().await.into_iter().find(|e| e.id == id)
    }

    pub async fn list(&self) -> Vec<EventMetadata> {
        self.load().await
    }

    /// Linear scan; nothing prevents two records from naming the same foreign id,
    /// in which case the first stored wins.
    pub async fn find_by_foreign_id(&self, foreign_id: &str) -> Option<EventMetadata> {
        self.load()
            .await
            .into_iter()
            .find(|e| e.on_chain_event_id.as_deref() == Some(foreign_id))
    }

    pub async fn update(&self, id: &str, patch: EventPatch) -> Option<EventMetadata> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.load_for_write().await?;
        let event = events.iter_mut().find(|e| e.id == id)?;
        event.apply(patch);
        let updated = event.clone();
        self.save(&events).await;
        Some(updated)
    }

    pub async fn link_foreign_id(&self, id: &str, foreign_id: String) -> Option<EventMetadata> {
        let linked = self
            .update(id, EventPatch { on_chain_event_id: Some(foreign_id), ..Default::default() })
            .await;
        if let Some(ev) = &linked {
            tracing::info!(id = %ev.id, foreign_id = ?ev.on_chain_event_id, "linked on-chain event");
        }
        linked
    }

    pub async fn delete(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let Some(events) = self.load_for_write().await else {
            return false;
        };
        let before = events.len();
        let remaining: Vec<_> = events.into_iter().filter(|e| e.id != id).collect();
        if remaining.len() == before {
            return false;
        }
        self.save(&remaining).await;
        true
    }
}
