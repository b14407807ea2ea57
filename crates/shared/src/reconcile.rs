use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::domain::event::{EventKind, EventMetadata, OnChainEvent};
use crate::domain::participant::ParticipantStatus;
use crate::domain::token::format_token_amount;
use crate::error::{NoFlakeError, ValidationError};
use crate::repo::event_repo::EVENT_ID_PREFIX;

/// How an event was addressed: by metadata id or by on-chain number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRef {
    Metadata(String),
    OnChain(U256),
}

impl EventRef {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.starts_with(EVENT_ID_PREFIX) && raw.len() > EVENT_ID_PREFIX.len() {
            return Ok(Self::Metadata(raw.to_string()));
        }
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            return U256::from_str_radix(raw, 10)
                .map(Self::OnChain)
                .map_err(|_| ValidationError::InvalidEventRef(raw.to_string()));
        }
        Err(ValidationError::InvalidEventRef(raw.to_string()))
    }
}

impl FromStr for EventRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventRef::Metadata(id) => f.write_str(id),
            EventRef::OnChain(id) => write!(f, "{id}"),
        }
    }
}

/// Display fields from metadata overlaid on authoritative chain state.
#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    pub reference: EventRef,
    pub metadata: Option<EventMetadata>,
    pub on_chain: Option<OnChainEvent>,
    /// `None` when no participant was given or the contract is not configured.
    pub participant: Option<ParticipantStatus>,
    pub rsvps: Vec<String>,
    pub balance: Option<U256>,
    pub allowance: Option<U256>,
}

impl EventView {
    pub fn kind(&self) -> EventKind {
        match &self.metadata {
            Some(m) => m.kind,
            None => EventKind::Stake,
        }
    }

    pub fn title(&self) -> String {
        match (&self.metadata, &self.on_chain) {
            (Some(m), _) => m.title.clone(),
            (None, Some(e)) => format!("Event #{}", e.id),
            (None, None) => format!("Event {}", self.reference),
        }
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        if let Some(m) = &self.metadata {
            return Some(m.datetime);
        }
        let secs = i64::try_from(self.on_chain.as_ref()?.start_time).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    /// On-chain id, from the chain itself or from the metadata link.
    pub fn foreign_id(&self) -> Option<U256> {
        match (&self.on_chain, &self.reference) {
            (Some(e), _) => Some(e.id),
            (None, EventRef::OnChain(id)) => Some(*id),
            (None, EventRef::Metadata(_)) => self.metadata.as_ref()?.foreign_id(),
        }
    }

    pub fn deposit_display(&self, decimals: u8) -> Option<String> {
        match (&self.on_chain, &self.metadata) {
            (Some(e), _) => Some(format_token_amount(e.deposit_amount, decimals)),
            (None, Some(m)) => m.deposit_amount.clone(),
            (None, None) => None,
        }
    }

    pub fn has_rsvp(&self, address: &str) -> bool {
        self.rsvps.iter().any(|a| a.eq_ignore_ascii_case(address))
    }

    pub fn eligibility(&self, participant: Option<&str>, now: DateTime<Utc>) -> Eligibility {
        let now_secs = u64::try_from(now.timestamp()).unwrap_or(0);
        let event = self.on_chain.as_ref();
        let is_past = self.starts_at().map(|t| t < now).unwrap_or(false);
        let can_rsvp = self.kind() == EventKind::Free
            && self.metadata.is_some()
            && !is_past
            && participant.map(|p| !self.has_rsvp(p)).unwrap_or(false);
        Eligibility {
            can_join: can_join(event, self.participant, now_secs),
            can_check_in: can_check_in(event, self.participant, now_secs),
            needs_approval: match (event, self.allowance) {
                (Some(e), Some(allowance)) => needs_approval(allowance, e.deposit_amount),
                _ => false,
            },
            can_rsvp,
            is_past,
        }
    }
}

/// Derived on every read, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub can_join: bool,
    pub can_check_in: bool,
    pub needs_approval: bool,
    pub can_rsvp: bool,
    pub is_past: bool,
}

/// Unknown participant state counts as not joined.
pub fn can_join(event: Option<&OnChainEvent>, status: Option<ParticipantStatus>, now_secs: u64) -> bool {
    let Some(event) = event else { return false };
    let joined = status.map(|s| s.has_joined()).unwrap_or(false);
    !joined && !event.settled && now_secs < event.start_time
}

pub fn can_check_in(event: Option<&OnChainEvent>, status: Option<ParticipantStatus>, now_secs: u64) -> bool {
    let Some(event) = event else { return false };
    status == Some(ParticipantStatus::Joined) && now_secs >= event.start_time
}

pub fn needs_approval(allowance: U256, deposit: U256) -> bool {
    allowance < deposit
}

/// Next write needed to get a participant into a staked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRoute {
    /// Allowance is short; approval has to confirm before a join is attempted.
    Approve { spender: Address, amount: U256 },
    Join { event_id: U256 },
}

pub fn plan_join(
    view: &EventView,
    spender: Address,
    now: DateTime<Utc>,
    decimals: u8,
) -> Result<JoinRoute, NoFlakeError> {
    if view.kind() == EventKind::Free {
        return Err(ValidationError::WrongEventKind(EventKind::Free.as_str().into()).into());
    }
    let event = view
        .on_chain
        .as_ref()
        .ok_or_else(|| NoFlakeError::NotFound(format!("on-chain data for event {}", view.reference)))?;
    let now_secs = u64::try_from(now.timestamp()).unwrap_or(0);
    if !can_join(Some(event), view.participant, now_secs) {
        let reason = if view.participant.map(|s| s.has_joined()).unwrap_or(false) {
            "already joined"
        } else if event.settled {
            "event is settled"
        } else {
            "event has already started"
        };
        return Err(ValidationError::NotEligible(reason.into()).into());
    }
    if let Some(balance) = view.balance {
        if balance < event.deposit_amount {
            return Err(ValidationError::InsufficientBalance {
                required: format_token_amount(event.deposit_amount, decimals),
                available: format_token_amount(balance, decimals),
            }
            .into());
        }
    }
    let allowance = view
        .allowance
        .ok_or_else(|| NoFlakeError::Configuration("token allowance unavailable; token address not configured".into()))?;
    if needs_approval(allowance, event.deposit_amount) {
        Ok(JoinRoute::Approve { spender, amount: event.deposit_amount })
    } else {
        Ok(JoinRoute::Join { event_id: event.id })
    }
}
