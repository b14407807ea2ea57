use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::token::parse_token_amount;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    /// Off-chain RSVP only.
    Free,
    /// Participants lock a token deposit through the staking contract.
    Stake,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Free => "FREE",
            EventKind::Stake => "STAKE",
        }
    }
}

/// What the organizer asks participants to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParticipantFieldId {
    Name,
    Email,
    Phone,
    WalletAddress,
    Telegram,
    Farcaster,
    Note,
    Custom(String),
}

const CUSTOM_FIELD_PREFIX: &str = "custom_";

impl TryFrom<String> for ParticipantFieldId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Ok(match raw.as_str() {
            "name" => Self::Name,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "walletAddress" => Self::WalletAddress,
            "telegram" => Self::Telegram,
            "farcaster" => Self::Farcaster,
            "note" => Self::Note,
            other => match other.strip_prefix(CUSTOM_FIELD_PREFIX) {
                Some(suffix) if !suffix.is_empty() => Self::Custom(suffix.to_string()),
                _ => return Err(ValidationError::InvalidParticipantField(raw)),
            },
        })
    }
}

impl From<ParticipantFieldId> for String {
    fn from(id: ParticipantFieldId) -> Self {
        match id {
            ParticipantFieldId::Name => "name".into(),
            ParticipantFieldId::Email => "email".into(),
            ParticipantFieldId::Phone => "phone".into(),
            ParticipantFieldId::WalletAddress => "walletAddress".into(),
            ParticipantFieldId::Telegram => "telegram".into(),
            ParticipantFieldId::Farcaster => "farcaster".into(),
            ParticipantFieldId::Note => "note".into(),
            ParticipantFieldId::Custom(s) => format!("{CUSTOM_FIELD_PREFIX}{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantFieldKind {
    Text,
    Textarea,
    Email,
    Phone,
    Wallet,
    Social,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantFieldConfig {
    pub id: ParticipantFieldId,
    pub label: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: ParticipantFieldKind,
}

/// Off-chain description of an event, persisted under `noflake_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub datetime: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Human amount as entered, e.g. "5".
    #[serde(rename = "depositAmountUSDC", default, skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<String>,
    pub organizer_address: String,
    pub created_at: DateTime<Utc>,
    /// Decimal on-chain event id once the creation transaction is confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_chain_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_fields: Option<Vec<ParticipantFieldConfig>>,
}

impl EventMetadata {
    pub fn foreign_id(&self) -> Option<U256> {
        self.on_chain_event_id
            .as_deref()
            .and_then(|s| U256::from_str_radix(s, 10).ok())
    }

    pub fn apply(&mut self, patch: EventPatch) {
        if let Some(title) = patch.title { self.title = title; }
        if let Some(description) = patch.description { self.description = Some(description); }
        if let Some(location) = patch.location { self.location = Some(location); }
        if let Some(datetime) = patch.datetime { self.datetime = datetime; }
        if let Some(deposit) = patch.deposit_amount { self.deposit_amount = Some(deposit); }
        if let Some(foreign) = patch.on_chain_event_id { self.on_chain_event_id = Some(foreign); }
        if let Some(fields) = patch.participant_fields { self.participant_fields = Some(fields); }
    }
}

/// An [`EventMetadata`] before the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEventMetadata {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub datetime: DateTime<Utc>,
    pub kind: EventKind,
    pub deposit_amount: Option<String>,
    pub organizer_address: String,
    pub on_chain_event_id: Option<String>,
    pub participant_fields: Option<Vec<ParticipantFieldConfig>>,
}

/// Partial update; `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub deposit_amount: Option<String>,
    pub on_chain_event_id: Option<String>,
    pub participant_fields: Option<Vec<ParticipantFieldConfig>>,
}

fn default_deposit_amount() -> String { "5".into() }

/// Event creation form as submitted by an organizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub datetime: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default = "default_deposit_amount")]
    pub deposit_amount: String,
    #[serde(default)]
    pub participant_fields: Vec<ParticipantFieldConfig>,
}

impl EventForm {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.datetime.timestamp() <= now.timestamp() {
            return Err(ValidationError::StartTimeNotInFuture);
        }
        let mut seen = Vec::with_capacity(self.participant_fields.len());
        for field in &self.participant_fields {
            if field.label.trim().is_empty() {
                return Err(ValidationError::InvalidParticipantField(format!(
                    "{} has an empty label",
                    String::from(field.id.clone())
                )));
            }
            if seen.contains(&&field.id) {
                return Err(ValidationError::InvalidParticipantField(format!(
                    "{} listed twice",
                    String::from(field.id.clone())
                )));
            }
            seen.push(&field.id);
        }
        Ok(())
    }

    /// Start time in unix seconds; only meaningful after [`EventForm::validate`].
    pub fn start_time_secs(&self) -> Result<u64, ValidationError> {
        u64::try_from(self.datetime.timestamp()).map_err(|_| ValidationError::StartTimeNotInFuture)
    }

    pub fn deposit_units(&self, decimals: u8) -> Result<U256, ValidationError> {
        parse_token_amount(&self.deposit_amount, decimals)
    }

    pub fn into_metadata(self, organizer: &str, on_chain_event_id: Option<String>) -> NewEventMetadata {
        let non_empty = |s: String| if s.trim().is_empty() { None } else { Some(s) };
        let deposit_amount = match self.kind {
            EventKind::Stake => Some(self.deposit_amount.trim().to_string()),
            EventKind::Free => None,
        };
        NewEventMetadata {
            title: self.title,
            description: non_empty(self.description),
            location: non_empty(self.location),
            datetime: self.datetime,
            kind: self.kind,
            deposit_amount,
            organizer_address: organizer.to_string(),
            on_chain_event_id,
            participant_fields: if self.participant_fields.is_empty() {
                None
            } else {
                Some(self.participant_fields)
            },
        }
    }
}

/// Event state as held by the staking contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainEvent {
    pub id: U256,
    pub organizer: Address,
    pub deposit_amount: U256,
    /// Unix seconds.
    pub start_time: u64,
    pub settled: bool,
    pub participants: Vec<Address>,
    pub total_deposits: U256,
    pub checked_in_count: U256,
}
