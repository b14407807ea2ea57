use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::contracts::gateway::ContractGateway;
use crate::contracts::logs::decode_event_created;
use crate::domain::event::{EventForm, EventKind, EventMetadata};
use crate::domain::participant::{ParticipantAction, ParticipantStatus};
use crate::error::{NoFlakeError, Result, ValidationError};
use crate::reconcile::{can_check_in, plan_join, EventRef, EventView, JoinRoute};
use crate::repo::{EventRepo, RsvpRepo};

#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub metadata: EventMetadata,
    pub tx_hash: Option<TxHash>,
    /// False when a staked event was created on chain but its id could not be
    /// recovered from the receipt; the metadata is then stored without a link.
    pub linked: bool,
}

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// Spending was approved; the join itself has to be requested again.
    ApprovalConfirmed { tx_hash: TxHash, amount: U256 },
    Joined { tx_hash: TxHash, view: Box<EventView> },
}

pub struct EventService<G: ContractGateway + ?Sized> {
    events: EventRepo,
    rsvps: RsvpRepo,
    gateway: Arc<G>,
    token_decimals: u8,
}

impl<G: ContractGateway + ?Sized> EventService<G> {
    pub fn new(events: EventRepo, rsvps: RsvpRepo, gateway: Arc<G>, token_decimals: u8) -> Self {
        Self { events, rsvps, gateway, token_decimals }
    }

    pub fn events(&self) -> &EventRepo {
        &self.events
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn token_decimals(&self) -> u8 {
        self.token_decimals
    }

    pub async fn create_event(&self, form: EventForm, organizer: Address, now: DateTime<Utc>) -> Result<CreatedEvent> {
        form.validate(now)?;
        let organizer = organizer.to_string();
        match form.kind {
            EventKind::Free => {
                let metadata = self.events.create(form.into_metadata(&organizer, None)).await;
                Ok(CreatedEvent { metadata, tx_hash: None, linked: true })
            }
            EventKind::Stake => {
                let deposit = form.deposit_units(self.token_decimals)?;
                let start_time = form.start_time_secs()?;
                let staking = self.gateway.addresses().require_staking()?;

                let pending = self.gateway.create_event(deposit, start_time).await?;
                let confirmation = self.gateway.confirm(&pending).await?.ensure_success()?;
                let foreign_id = match decode_event_created(&confirmation.logs, staking) {
                    Ok(id) => Some(id.to_string()),
                    Err(e) => {
                        warn!(error = %e, tx = %confirmation.tx_hash, "storing staked event without on-chain link");
                        None
                    }
                };
                let linked = foreign_id.is_some();
                let metadata = self.events.create(form.into_metadata(&organizer, foreign_id)).await;
                info!(id = %metadata.id, foreign_id = ?metadata.on_chain_event_id, "staked event created");
                Ok(CreatedEvent { metadata, tx_hash: Some(confirmation.tx_hash), linked })
            }
        }
    }

    /// All stored events, earliest start first.
    pub async fn list_events(&self) -> Vec<EventMetadata> {
        let mut events = self.events.list().await;
        events.sort_by_key(|e| e.datetime);
        events
    }

    pub async fn view(&self, reference: &EventRef, participant: Option<Address>) -> Result<EventView> {
        let (metadata, foreign_id) = match reference {
            EventRef::Metadata(id) => {
                let metadata = self
                    .events
                    .get(id)
                    .await
                    .ok_or_else(|| NoFlakeError::NotFound(format!("event {id}")))?;
                let foreign_id = metadata.foreign_id();
                (Some(metadata), foreign_id)
            }
            EventRef::OnChain(id) => (self.events.find_by_foreign_id(&id.to_string()).await, Some(*id)),
        };

        let rsvps = match &metadata {
            Some(m) if m.kind == EventKind::Free => self.rsvps.list(&m.id).await,
            _ => Vec::new(),
        };

        let mut view = EventView {
            reference: reference.clone(),
            metadata,
            on_chain: None,
            participant: None,
            rsvps,
            balance: None,
            allowance: None,
        };

        if let Some(foreign_id) = foreign_id {
            view.on_chain = self.gateway.get_event(foreign_id).await?;
            if let Some(who) = participant {
                view.participant = self
                    .gateway
                    .participant_info(foreign_id, who)
                    .await?
                    .map(ParticipantStatus::try_from)
                    .transpose()?;
                view.balance = self.gateway.balance_of(who).await?;
                if let Some(spender) = self.gateway.addresses().event_staking {
                    view.allowance = self.gateway.allowance(who, spender).await?;
                }
            }
        }

        if view.metadata.is_none() && view.on_chain.is_none() {
            return Err(NoFlakeError::NotFound(format!(
                "event {reference} not found or contract addresses not configured"
            )));
        }
        Ok(view)
    }

    /// Addresses that joined a staked event, as reported by the contract.
    pub async fn participants(&self, reference: &EventRef) -> Result<Vec<Address>> {
        let foreign_id = match reference {
            EventRef::OnChain(id) => *id,
            EventRef::Metadata(id) => {
                let metadata = self
                    .events
                    .get(id)
                    .await
                    .ok_or_else(|| NoFlakeError::NotFound(format!("event {id}")))?;
                match metadata.foreign_id() {
                    Some(foreign_id) => foreign_id,
                    None if metadata.kind == EventKind::Free => {
                        return Err(ValidationError::WrongEventKind(EventKind::Free.as_str().into()).into())
                    }
                    None => return Err(NoFlakeError::NotFound(format!("on-chain link for event {id}"))),
                }
            }
        };
        self.gateway
            .event_participants(foreign_id)
            .await?
            .ok_or_else(|| NoFlakeError::Configuration("event staking contract address not configured".into()))
    }

    pub async fn rsvp(&self, reference: &EventRef, address: &str, now: DateTime<Utc>) -> Result<Vec<String>> {
        let EventRef::Metadata(id) = reference else {
            return Err(ValidationError::WrongEventKind(EventKind::Stake.as_str().into()).into());
        };
        let metadata = self
            .events
            .get(id)
            .await
            .ok_or_else(|| NoFlakeError::NotFound(format!("event {id}")))?;
        if metadata.kind != EventKind::Free {
            return Err(ValidationError::WrongEventKind(metadata.kind.as_str().into()).into());
        }
        if metadata.datetime < now {
            return Err(ValidationError::NotEligible("event has already started".into()).into());
        }
        if !self.rsvps.add(id, address).await {
            return Err(ValidationError::DuplicateRsvp.into());
        }
        info!(event_id = %id, address, "rsvp recorded");
        Ok(self.rsvps.list(id).await)
    }

    /// Approval and join are separate confirmations; an approval never chains into a join.
    pub async fn join(&self, reference: &EventRef, participant: Address, now: DateTime<Utc>) -> Result<JoinOutcome> {
        let view = self.view(reference, Some(participant)).await?;
        let spender = self.gateway.addresses().require_staking()?;
        match plan_join(&view, spender, now, self.token_decimals)? {
            JoinRoute::Approve { spender, amount } => {
                let pending = self.gateway.approve(spender, amount).await?;
                let confirmation = self.gateway.confirm(&pending).await?.ensure_success()?;
                info!(event = %reference, %participant, "token spending approved");
                Ok(JoinOutcome::ApprovalConfirmed { tx_hash: confirmation.tx_hash, amount })
            }
            JoinRoute::Join { event_id } => {
                let expected = view
                    .participant
                    .unwrap_or(ParticipantStatus::NotJoined)
                    .transition(ParticipantAction::Join)?;
                let pending = self.gateway.join_event(event_id).await?;
                let confirmation = self.gateway.confirm(&pending).await?.ensure_success()?;
                let view = self.view(reference, Some(participant)).await?;
                if view.participant != Some(expected) {
                    warn!(event = %reference, %participant, status = ?view.participant, "join confirmed but contract reports a different status");
                }
                Ok(JoinOutcome::Joined { tx_hash: confirmation.tx_hash, view: Box::new(view) })
            }
        }
    }

    pub async fn check_in(&self, reference: &EventRef, participant: Address, now: DateTime<Utc>) -> Result<EventView> {
        let view = self.view(reference, Some(participant)).await?;
        let event = view
            .on_chain
            .as_ref()
            .ok_or_else(|| NoFlakeError::NotFound(format!("on-chain data for event {reference}")))?;
        let now_secs = u64::try_from(now.timestamp()).unwrap_or(0);
        if !can_check_in(Some(event), view.participant, now_secs) {
            let status = view.participant.unwrap_or(ParticipantStatus::NotJoined);
            // Surfaces the precise reason for out-of-order attempts.
            status.transition(ParticipantAction::CheckIn)?;
            return Err(ValidationError::NotEligible("event has not started yet".into()).into());
        }
        let pending = self.gateway.check_in(event.id, participant).await?;
        self.gateway.confirm(&pending).await?.ensure_success()?;
        self.view(reference, Some(participant)).await
    }
}
