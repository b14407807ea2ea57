use alloy::primitives::Address;
use chrono::{DateTime, Duration, Utc};

use crate::domain::event::{EventKind, EventMetadata, NewEventMetadata};
use crate::repo::event_repo::EventRepo;

pub const SAMPLE_EVENT_TITLE: &str = "Base ItugInova Jump Start Program Demo Day";

/// Seeds the demo FREE event a week ahead. Idempotent by title.
pub async fn seed_sample_event(repo: &EventRepo, now: DateTime<Utc>) -> Option<EventMetadata> {
    if repo.list().await.iter().any(|e| e.title == SAMPLE_EVENT_TITLE) {
        return None;
    }
    let sample = NewEventMetadata {
        title: SAMPLE_EVENT_TITLE.into(),
        description: Some(
            "Join us for an exciting demo day showcasing innovative projects built on Base. \
             Meet the builders, see live demos, and network with the Base ecosystem."
                .into(),
        ),
        location: Some("Base HQ, San Francisco (or Virtual via Base Camp)".into()),
        datetime: now + Duration::days(7),
        kind: EventKind::Free,
        deposit_amount: None,
        organizer_address: Address::ZERO.to_string(),
        on_chain_event_id: None,
        participant_fields: None,
    };
    let created = repo.create(sample).await;
    tracing::info!(id = %created.id, "seeded sample event");
    Some(created)
}
