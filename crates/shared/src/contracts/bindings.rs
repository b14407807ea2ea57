use alloy::sol;

use crate::domain::event::OnChainEvent;
use crate::domain::participant::ParticipantInfo;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IEventStaking {
        struct EventData {
            uint256 id;
            address organizer;
            uint256 depositAmount;
            uint256 startTime;
            bool settled;
            address[] participants;
            uint256 totalDeposits;
            uint256 checkedInCount;
        }

        struct ParticipantData {
            bool joined;
            bool checkedIn;
            bool payoutClaimed;
        }

        function createEvent(uint256 depositAmount, uint256 startTime) external returns (uint256);
        function joinEvent(uint256 eventId) external;
        function checkIn(uint256 eventId, address participant) external;
        function settleEvent(uint256 eventId) external;
        function getEvent(uint256 eventId) external view returns (EventData memory);
        function getParticipantInfo(uint256 eventId, address participant) external view returns (ParticipantData memory);
        function getEventParticipants(uint256 eventId) external view returns (address[] memory);

        event EventCreated(uint256 indexed eventId, address indexed organizer, uint256 depositAmount, uint256 startTime);
        event ParticipantJoined(uint256 indexed eventId, address indexed participant, uint256 depositAmount);
        event ParticipantCheckedIn(uint256 indexed eventId, address indexed participant);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

impl From<IEventStaking::EventData> for OnChainEvent {
    fn from(e: IEventStaking::EventData) -> Self {
        Self {
            id: e.id,
            organizer: e.organizer,
            deposit_amount: e.depositAmount,
            start_time: e.startTime.saturating_to::<u64>(),
            settled: e.settled,
            participants: e.participants,
            total_deposits: e.totalDeposits,
            checked_in_count: e.checkedInCount,
        }
    }
}

impl From<IEventStaking::ParticipantData> for ParticipantInfo {
    fn from(p: IEventStaking::ParticipantData) -> Self {
        Self { joined: p.joined, checked_in: p.checkedIn, payout_claimed: p.payoutClaimed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    #[test]
    fn test_event_data_conversion() {
        let organizer = Address::repeat_byte(0x11);
        let data = IEventStaking::EventData {
            id: U256::from(3u64),
            organizer,
            depositAmount: U256::from(5_000_000u64),
            startTime: U256::from(1_900_000_000u64),
            settled: false,
            participants: vec![Address::repeat_byte(0x22)],
            totalDeposits: U256::from(5_000_000u64),
            checkedInCount: U256::ZERO,
        };
        let ev = OnChainEvent::from(data);
        assert_eq!(ev.id, U256::from(3u64));
        assert_eq!(ev.organizer, organizer);
        assert_eq!(ev.start_time, 1_900_000_000);
        assert_eq!(ev.participants.len(), 1);
    }

    #[test]
    fn test_oversized_start_time_saturates() {
        let data = IEventStaking::EventData {
            id: U256::from(1u64),
            organizer: Address::ZERO,
            depositAmount: U256::from(1u64),
            startTime: U256::MAX,
            settled: false,
            participants: vec![],
            totalDeposits: U256::ZERO,
            checkedInCount: U256::ZERO,
        };
        assert_eq!(OnChainEvent::from(data).start_time, u64::MAX);
    }
}
