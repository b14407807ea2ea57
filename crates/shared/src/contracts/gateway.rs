use std::fmt;
use std::time::Duration;

use alloy::primitives::{Address, Log, TxHash, U256};
use alloy::providers::{DynProvider, Provider};
use async_trait::async_trait;
use tracing::{debug, info};

use super::bindings::{IEventStaking, IERC20};
use super::provider::SharedProvider;
use super::registry::ContractAddresses;
use crate::domain::event::OnChainEvent;
use crate::domain::participant::ParticipantInfo;
use crate::error::{NoFlakeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    CreateEvent,
    JoinEvent,
    CheckIn,
    SettleEvent,
    Approve,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxKind::CreateEvent => "createEvent",
            TxKind::JoinEvent => "joinEvent",
            TxKind::CheckIn => "checkIn",
            TxKind::SettleEvent => "settleEvent",
            TxKind::Approve => "approve",
        };
        f.write_str(s)
    }
}

/// A submitted, not yet confirmed write. Cannot be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub kind: TxKind,
}

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub kind: TxKind,
    pub success: bool,
    pub logs: Vec<Log>,
}

impl Confirmation {
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(NoFlakeError::TransactionReverted(format!("{} {:#x}", self.kind, self.tx_hash)))
        }
    }
}

/// Writes only submit; state depending on them is trusted after `confirm`.
/// Reads against an unset contract address yield `None`.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    fn addresses(&self) -> &ContractAddresses;
    /// Account that signs writes, if any.
    fn account(&self) -> Option<Address>;

    async fn create_event(&self, deposit_amount: U256, start_time: u64) -> Result<PendingTx>;
    async fn join_event(&self, event_id: U256) -> Result<PendingTx>;
    async fn check_in(&self, event_id: U256, participant: Address) -> Result<PendingTx>;
    async fn settle_event(&self, event_id: U256) -> Result<PendingTx>;
    async fn approve(&self, spender: Address, amount: U256) -> Result<PendingTx>;
    async fn confirm(&self, pending: &PendingTx) -> Result<Confirmation>;

    async fn get_event(&self, event_id: U256) -> Result<Option<OnChainEvent>>;
    async fn participant_info(&self, event_id: U256, participant: Address) -> Result<Option<ParticipantInfo>>;
    async fn event_participants(&self, event_id: U256) -> Result<Option<Vec<Address>>>;
    async fn balance_of(&self, owner: Address) -> Result<Option<U256>>;
    async fn allowance(&self, owner: Address, spender: Address) -> Result<Option<U256>>;
    async fn decimals(&self) -> Result<Option<u8>>;
}

pub struct AlloyGateway {
    provider: DynProvider,
    account: Option<Address>,
    addresses: ContractAddresses,
    poll_interval: Duration,
}

fn call_err(e: impl fmt::Display) -> NoFlakeError {
    NoFlakeError::ContractCall(e.to_string())
}

fn tx_err(e: impl fmt::Display) -> NoFlakeError {
    NoFlakeError::Transaction(e.to_string())
}

impl AlloyGateway {
    pub fn new(shared: SharedProvider, addresses: ContractAddresses, poll_interval: Duration) -> Self {
        Self {
            provider: shared.provider,
            account: shared.account,
            addresses,
            poll_interval,
        }
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(call_err)
    }

    fn require_signer(&self) -> Result<Address> {
        self.account.ok_or_else(|| {
            NoFlakeError::Configuration("no signer configured; write operations need a private key".into())
        })
    }

    fn staking_for_write(&self) -> Result<IEventStaking::IEventStakingInstance<&DynProvider>> {
        self.require_signer()?;
        let address = self.addresses.require_staking()?;
        Ok(IEventStaking::new(address, &self.provider))
    }

    fn submitted(&self, hash: TxHash, kind: TxKind) -> PendingTx {
        info!(tx = %hash, %kind, "transaction submitted");
        PendingTx { hash, kind }
    }
}

#[async_trait]
impl ContractGateway for AlloyGateway {
    fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn create_event(&self, deposit_amount: U256, start_time: u64) -> Result<PendingTx> {
        let pending = self
            .staking_for_write()?
            .createEvent(deposit_amount, U256::from(start_time))
            .send()
            .await
            .map_err(tx_err)?;
        Ok(self.submitted(*pending.tx_hash(), TxKind::CreateEvent))
    }

    async fn join_event(&self, event_id: U256) -> Result<PendingTx> {
        let pending = self.staking_for_write()?.joinEvent(event_id).send().await.map_err(tx_err)?;
        Ok(self.submitted(*pending.tx_hash(), TxKind::JoinEvent))
    }

    async fn check_in(&self, event_id: U256, participant: Address) -> Result<PendingTx> {
        let pending = self
            .staking_for_write()?
            .checkIn(event_id, participant)
            .send()
            .await
            .map_err(tx_err)?;
        Ok(self.submitted(*pending.tx_hash(), TxKind::CheckIn))
    }

    async fn settle_event(&self, event_id: U256) -> Result<PendingTx> {
        let pending = self.staking_for_write()?.settleEvent(event_id).send().await.map_err(tx_err)?;
        Ok(self.submitted(*pending.tx_hash(), TxKind::SettleEvent))
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<PendingTx> {
        self.require_signer()?;
        let token = IERC20::new(self.addresses.require_token()?, &self.provider);
        let pending = token.approve(spender, amount).send().await.map_err(tx_err)?;
        Ok(self.submitted(*pending.tx_hash(), TxKind::Approve))
    }

    async fn confirm(&self, pending: &PendingTx) -> Result<Confirmation> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(pending.hash)
                .await
                .map_err(tx_err)?;
            match receipt {
                Some(receipt) => {
                    let success = receipt.status();
                    let logs = receipt.inner.logs().iter().map(|l| l.inner.clone()).collect();
                    info!(tx = %pending.hash, kind = %pending.kind, success, "transaction confirmed");
                    return Ok(Confirmation { tx_hash: pending.hash, kind: pending.kind, success, logs });
                }
                None => {
                    debug!(tx = %pending.hash, "receipt not available yet");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn get_event(&self, event_id: U256) -> Result<Option<OnChainEvent>> {
        let Some(staking) = self.addresses.event_staking else {
            debug!("staking address unset; skipping getEvent");
            return Ok(None);
        };
        let data = IEventStaking::new(staking, &self.provider)
            .getEvent(event_id)
            .call()
            .await
            .map_err(call_err)?;
        // Unknown ids come back zeroed.
        if data.id.is_zero() {
            return Ok(None);
        }
        Ok(Some(data.into()))
    }

    async fn participant_info(&self, event_id: U256, participant: Address) -> Result<Option<ParticipantInfo>> {
        let Some(staking) = self.addresses.event_staking else {
            return Ok(None);
        };
        let data = IEventStaking::new(staking, &self.provider)
            .getParticipantInfo(event_id, participant)
            .call()
            .await
            .map_err(call_err)?;
        Ok(Some(data.into()))
    }

    async fn event_participants(&self, event_id: U256) -> Result<Option<Vec<Address>>> {
        let Some(staking) = self.addresses.event_staking else {
            return Ok(None);
        };
        let participants = IEventStaking::new(staking, &self.provider)
            .getEventParticipants(event_id)
            .call()
            .await
            .map_err(call_err)?;
        Ok(Some(participants))
    }

    async fn balance_of(&self, owner: Address) -> Result<Option<U256>> {
        let Some(token) = self.addresses.token else {
            return Ok(None);
        };
        let balance = IERC20::new(token, &self.provider).balanceOf(owner).call().await.map_err(call_err)?;
        Ok(Some(balance))
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<Option<U256>> {
        let Some(token) = self.addresses.token else {
            return Ok(None);
        };
        let allowance = IERC20::new(token, &self.provider)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(call_err)?;
        Ok(Some(allowance))
    }

    async fn decimals(&self) -> Result<Option<u8>> {
        let Some(token) = self.addresses.token else {
            return Ok(None);
        };
        let decimals = IERC20::new(token, &self.provider).decimals().call().await.map_err(call_err)?;
        Ok(Some(decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::provider::build_provider_from_url;

    // Nothing listens here; every test below must return before touching the network.
    const DEAD_RPC: &str = "http://127.0.0.1:9";

    fn gateway(addresses: ContractAddresses, key: Option<&str>) -> AlloyGateway {
        let shared = build_provider_from_url(DEAD_RPC, key).unwrap();
        AlloyGateway::new(shared, addresses, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_reads_skip_when_unconfigured() {
        let gw = gateway(ContractAddresses::default(), None);
        let who = Address::repeat_byte(0x33);
        assert!(gw.get_event(U256::from(1u64)).await.unwrap().is_none());
        assert!(gw.participant_info(U256::from(1u64), who).await.unwrap().is_none());
        assert!(gw.event_participants(U256::from(1u64)).await.unwrap().is_none());
        assert!(gw.balance_of(who).await.unwrap().is_none());
        assert!(gw.allowance(who, who).await.unwrap().is_none());
        assert!(gw.decimals().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_need_signer_and_address() {
        let addresses = ContractAddresses {
            event_staking: Some(Address::repeat_byte(0x01)),
            token: None,
        };
        let gw = gateway(addresses, None);
        let err = gw.join_event(U256::from(1u64)).await.unwrap_err();
        assert!(err.is_configuration_error());

        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let gw = gateway(ContractAddresses::default(), Some(key));
        assert!(gw.create_event(U256::from(5u64), 1).await.unwrap_err().is_configuration_error());
        assert!(gw
            .approve(Address::repeat_byte(0x01), U256::from(5u64))
            .await
            .unwrap_err()
            .is_configuration_error());
    }

    #[test]
    fn test_reverted_confirmation() {
        let c = Confirmation { tx_hash: TxHash::ZERO, kind: TxKind::JoinEvent, success: false, logs: vec![] };
        assert!(matches!(c.ensure_success(), Err(NoFlakeError::TransactionReverted(_))));
    }
}
