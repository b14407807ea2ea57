use alloy::primitives::{Address, Log, U256};
use alloy::sol_types::SolEvent;

use super::bindings::IEventStaking::EventCreated;
use crate::error::{NoFlakeError, Result};

/// Extract the new event id from a `createEvent` receipt.
///
/// One attempt: the first log emitted by `staking` whose first topic is the
/// `EventCreated` signature is decoded; anything else is an [`NoFlakeError::EventParse`].
pub fn decode_event_created(logs: &[Log], staking: Address) -> Result<U256> {
    let log = logs
        .iter()
        .find(|l| l.address == staking && l.data.topics().first() == Some(&EventCreated::SIGNATURE_HASH))
        .ok_or_else(|| NoFlakeError::EventParse("no EventCreated log from the staking contract".into()))?;
    let decoded = EventCreated::decode_log_data(&log.data)
        .map_err(|e| NoFlakeError::EventParse(format!("EventCreated: {e}")))?;
    Ok(decoded.eventId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::LogData;

    fn created_log(staking: Address, id: u64) -> Log {
        let ev = EventCreated {
            eventId: U256::from(id),
            organizer: Address::repeat_byte(0xaa),
            depositAmount: U256::from(5_000_000u64),
            startTime: U256::from(1_900_000_000u64),
        };
        Log { address: staking, data: ev.encode_log_data() }
    }

    #[test]
    fn test_decodes_event_id() {
        let staking = Address::repeat_byte(0x01);
        let token_noise = Log {
            address: Address::repeat_byte(0x02),
            data: LogData::new_unchecked(vec![EventCreated::SIGNATURE_HASH], Default::default()),
        };
        let logs = vec![token_noise, created_log(staking, 17)];
        assert_eq!(decode_event_created(&logs, staking).unwrap(), U256::from(17u64));
    }

    #[test]
    fn test_ignores_other_emitters() {
        let staking = Address::repeat_byte(0x01);
        let logs = vec![created_log(Address::repeat_byte(0x09), 3)];
        assert!(matches!(decode_event_created(&logs, staking), Err(NoFlakeError::EventParse(_))));
    }

    #[test]
    fn test_truncated_log_fails_once() {
        let staking = Address::repeat_byte(0x01);
        let broken = Log {
            address: staking,
            data: LogData::new_unchecked(vec![EventCreated::SIGNATURE_HASH], Default::default()),
        };
        assert!(matches!(decode_event_created(&[broken], staking), Err(NoFlakeError::EventParse(_))));
        assert!(decode_event_created(&[], staking).is_err());
    }
}
