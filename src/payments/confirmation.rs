use serde::{Deserialize, Serialize};

use crate::errors::{PacError, Result};
use crate::types::ConfirmationStatus;

/// decision taken on a pending payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Confirm,
    Reject,
}

/// PENDING -> CONFIRMED | REJECTED; both targets are terminal
pub fn transition(current: ConfirmationStatus, decision: Decision) -> Result<ConfirmationStatus> {
    match (current, decision) {
        (ConfirmationStatus::Pending, Decision::Confirm) => Ok(ConfirmationStatus::Confirmed),
        (ConfirmationStatus::Pending, Decision::Reject) => Ok(ConfirmationStatus::Rejected),
        (status, _) => Err(PacError::ConfirmationAlreadyDecided { status }),
    }
}
