//! Operator alert texts.

use crate::core::{Outcome, StageId};

/// Returns the alert for a failed stage, worded by outcome kind.
#[must_use]
pub fn alert_for(stage: &StageId, outcome: Outcome) -> String {
    match outcome {
        Outcome::Timeout => format!("ALERT: TIMEOUT in {stage}. Check network or increase timeout."),
        Outcome::ConnectionFailure => {
            format!("ALERT: UNREACHABLE NODE during {stage}. Verify inventory and SSH keys.")
        }
        other => format!("ALERT: Execution failed in {stage}: {other}"),
    }
}
