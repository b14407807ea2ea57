use serde::Serialize;

use crate::error::ValidationError;

/// Raw participant flags as returned by `getParticipantInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub joined: bool,
    pub checked_in: bool,
    pub payout_claimed: bool,
}

/// Where a participant stands for one staked event. Ordered; no state is ever left backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    NotJoined,
    Joined,
    CheckedIn,
    PayoutClaimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantAction {
    Join,
    CheckIn,
    ClaimPayout,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotJoined => "not_joined",
            Self::Joined => "joined",
            Self::CheckedIn => "checked_in",
            Self::PayoutClaimed => "payout_claimed",
        }
    }

    pub fn has_joined(&self) -> bool {
        *self >= Self::Joined
    }

    pub fn from_info(info: &ParticipantInfo) -> Result<Self, ValidationError> {
        match (info.joined, info.checked_in, info.payout_claimed) {
            (false, false, false) => Ok(Self::NotJoined),
            (true, false, false) => Ok(Self::Joined),
            (true, true, false) => Ok(Self::CheckedIn),
            (true, true, true) => Ok(Self::PayoutClaimed),
            (joined, checked_in, payout_claimed) => Err(ValidationError::IllegalTransition(format!(
                "inconsistent participant flags: joined={joined} checked_in={checked_in} payout_claimed={payout_claimed}"
            ))),
        }
    }

    pub fn transition(self, action: ParticipantAction) -> Result<Self, ValidationError> {
        match (self, action) {
            (Self::NotJoined, ParticipantAction::Join) => Ok(Self::Joined),
            (Self::Joined, ParticipantAction::CheckIn) => Ok(Self::CheckedIn),
            (Self::CheckedIn, ParticipantAction::ClaimPayout) => Ok(Self::PayoutClaimed),
            (from, action) => Err(ValidationError::IllegalTransition(format!(
                "cannot {action:?} from {}",
                from.as_str()
            ))),
        }
    }
}

impl TryFrom<ParticipantInfo> for ParticipantStatus {
    type Error = ValidationError;

    fn try_from(info: ParticipantInfo) -> Result<Self, Self::Error> {
        Self::from_info(&info)
    }
}
