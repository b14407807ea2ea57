use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::contracts::ContractGateway;
use shared::domain::event::{EventForm, EventKind, EventMetadata, OnChainEvent};
use shared::domain::participant::ParticipantStatus;
use shared::error::{ApiError, NoFlakeError};
use shared::reconcile::{Eligibility, EventRef, EventView};
use shared::service::{EventService, JoinOutcome};

pub struct AppState {
    pub service: EventService<dyn ContractGateway>,
    pub chain_id: Option<u64>,
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events).post(create_event))
        .route("/events/:id", get(get_event))
        .route("/events/:id/participants", get(participants))
        .route("/events/:id/rsvp", post(rsvp))
        .route("/events/:id/join", post(join))
        .route("/events/:id/check-in", post(check_in))
        .route("/contracts/addresses", get(get_addresses))
        .with_state(state)
}

fn parse_ref(raw: &str) -> ApiResult<EventRef> {
    EventRef::parse(raw).map_err(|e| NoFlakeError::from(e).into())
}

fn parse_address(raw: &str) -> ApiResult<Address> {
    Address::from_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("invalid address: {raw}")))
}

fn signer(state: &AppState) -> ApiResult<Address> {
    state
        .service
        .gateway()
        .account()
        .ok_or_else(|| ApiError::Unavailable("no signer configured; write operations need NF_PRIVATE_KEY".into()))
}

fn config_warning(state: &AppState) -> Option<String> {
    state.service.gateway().addresses().config_warning()
}

#[derive(Serialize)]
struct OnChainEventBody {
    id: String,
    organizer: String,
    deposit_amount: String,
    start_time: u64,
    settled: bool,
    participants: Vec<String>,
    total_deposits: String,
    checked_in_count: String,
}

impl From<&OnChainEvent> for OnChainEventBody {
    fn from(e: &OnChainEvent) -> Self {
        Self {
            id: e.id.to_string(),
            organizer: e.organizer.to_string(),
            deposit_amount: e.deposit_amount.to_string(),
            start_time: e.start_time,
            settled: e.settled,
            participants: e.participants.iter().map(|a| a.to_string()).collect(),
            total_deposits: e.total_deposits.to_string(),
            checked_in_count: e.checked_in_count.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EventBody {
    reference: String,
    title: String,
    kind: EventKind,
    starts_at: Option<DateTime<Utc>>,
    deposit: Option<String>,
    metadata: Option<EventMetadata>,
    on_chain: Option<OnChainEventBody>,
    participant_status: Option<ParticipantStatus>,
    rsvps: Vec<String>,
    balance: Option<String>,
    allowance: Option<String>,
    eligibility: Eligibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_warning: Option<String>,
}

impl EventBody {
    fn render(view: &EventView, participant: Option<&str>, state: &AppState, now: DateTime<Utc>) -> Self {
        let decimals = state.service.token_decimals();
        Self {
            reference: view.reference.to_string(),
            title: view.title(),
            kind: view.kind(),
            starts_at: view.starts_at(),
            deposit: view.deposit_display(decimals),
            metadata: view.metadata.clone(),
            on_chain: view.on_chain.as_ref().map(OnChainEventBody::from),
            participant_status: view.participant,
            rsvps: view.rsvps.clone(),
            balance: view.balance.map(|b| b.to_string()),
            allowance: view.allowance.map(|a| a.to_string()),
            eligibility: view.eligibility(participant, now),
            config_warning: config_warning(state),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct EventList {
    events: Vec<EventMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_warning: Option<String>,
}

async fn list_events(State(state): State<Arc<AppState>>) -> Json<EventList> {
    let events = state.service.list_events().await;
    Json(EventList { events, config_warning: config_warning(&state) })
}

#[derive(Deserialize)]
struct CreateEventRequest {
    #[serde(flatten)]
    form: EventForm,
    /// Defaults to the signer account.
    organizer: Option<String>,
}

#[derive(Serialize)]
struct CreatedBody {
    event: EventMetadata,
    tx_hash: Option<String>,
    linked: bool,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<CreatedBody>)> {
    let organizer = match req.organizer.as_deref() {
        Some(raw) => parse_address(raw)?,
        None => signer(&state)
            .map_err(|_| ApiError::BadRequest("organizer address required when no signer is configured".into()))?,
    };
    let created = state.service.create_event(req.form, organizer, Utc::now()).await?;
    if !created.linked {
        tracing::warn!(id = %created.metadata.id, "event stored without on-chain id");
    }
    Ok((
        StatusCode::CREATED,
        Json(CreatedBody {
            event: created.metadata,
            tx_hash: created.tx_hash.map(|h| format!("{h:#x}")),
            linked: created.linked,
        }),
    ))
}

#[derive(Deserialize)]
struct ViewQuery {
    participant: Option<String>,
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ViewQuery>,
) -> ApiResult<Json<EventBody>> {
    let reference = parse_ref(&id)?;
    let participant = q.participant.as_deref().map(parse_address).transpose()?;
    let view = state.service.view(&reference, participant).await?;
    Ok(Json(EventBody::render(&view, q.participant.as_deref(), &state, Utc::now())))
}

#[derive(Serialize)]
struct ParticipantsBody {
    event_id: String,
    participants: Vec<String>,
}

async fn participants(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<ParticipantsBody>> {
    let reference = parse_ref(&id)?;
    let participants = state.service.participants(&reference).await?;
    Ok(Json(ParticipantsBody {
        event_id: reference.to_string(),
        participants: participants.iter().map(|a| a.to_string()).collect(),
    }))
}

#[derive(Deserialize)]
struct RsvpRequest {
    address: String,
}

#[derive(Serialize)]
struct RsvpBody {
    event_id: String,
    rsvps: Vec<String>,
}

async fn rsvp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RsvpRequest>,
) -> ApiResult<Json<RsvpBody>> {
    let reference = parse_ref(&id)?;
    let address = parse_address(&req.address)?;
    let rsvps = state.service.rsvp(&reference, &address.to_string(), Utc::now()).await?;
    Ok(Json(RsvpBody { event_id: reference.to_string(), rsvps }))
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JoinBody {
    ApprovalConfirmed { tx_hash: String, amount: String },
    Joined { tx_hash: String, event: Box<EventBody> },
}

async fn join(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<JoinBody>> {
    let reference = parse_ref(&id)?;
    let account = signer(&state)?;
    let now = Utc::now();
    let body = match state.service.join(&reference, account, now).await? {
        JoinOutcome::ApprovalConfirmed { tx_hash, amount } => JoinBody::ApprovalConfirmed {
            tx_hash: format!("{tx_hash:#x}"),
            amount: amount.to_string(),
        },
        JoinOutcome::Joined { tx_hash, view } => {
            let who = account.to_string();
            JoinBody::Joined {
                tx_hash: format!("{tx_hash:#x}"),
                event: Box::new(EventBody::render(&view, Some(&who), &state, now)),
            }
        }
    };
    Ok(Json(body))
}

async fn check_in(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<EventBody>> {
    let reference = parse_ref(&id)?;
    let account = signer(&state)?;
    let now = Utc::now();
    let view = state.service.check_in(&reference, account, now).await?;
    let who = account.to_string();
    Ok(Json(EventBody::render(&view, Some(&who), &state, now)))
}

#[derive(Serialize)]
struct AddressesBody {
    chain_id: Option<u64>,
    event_staking: Option<String>,
    token: Option<String>,
    signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_warning: Option<String>,
}

async fn get_addresses(State(state): State<Arc<AppState>>) -> Json<AddressesBody> {
    let gateway = state.service.gateway();
    let addresses = gateway.addresses();
    Json(AddressesBody {
        chain_id: state.chain_id,
        event_staking: addresses.event_staking.map(|a| a.to_string()),
        token: addresses.token.map(|a| a.to_string()),
        signer: gateway.account().map(|a| a.to_string()),
        config_warning: addresses.config_warning(),
    })
}
