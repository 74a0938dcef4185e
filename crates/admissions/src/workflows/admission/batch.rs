use std::str::FromStr;

use serde::Serialize;

use super::domain::ApplicationId;
use super::lifecycle::AdmissionAction;

/// Actions a batch run may apply. Only actions expressible as
/// `(id, optional remarks)` qualify; billing and payment submission carry
/// per-application payloads and stay single-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Review,
    VerifyDocs,
    Recommend,
    Approve,
    Reject,
    Enrol,
    Revoke,
}

impl BatchAction {
    pub const fn action(self) -> AdmissionAction {
        match self {
            BatchAction::Review => AdmissionAction::Review,
            BatchAction::VerifyDocs => AdmissionAction::VerifyDocs,
            BatchAction::Recommend => AdmissionAction::Recommend,
            BatchAction::Approve => AdmissionAction::Approve,
            BatchAction::Reject => AdmissionAction::Reject,
            BatchAction::Enrol => AdmissionAction::Enrol,
            BatchAction::Revoke => AdmissionAction::Revoke,
        }
    }

    pub const fn wire_name(self) -> &'static str {
        self.action().wire_name()
    }
}

impl FromStr for BatchAction {
    type Err = UnknownBatchAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "review" => Ok(Self::Review),
            "verify_docs" => Ok(Self::VerifyDocs),
            "recommend" => Ok(Self::Recommend),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "enrol" => Ok(Self::Enrol),
            "revoke" => Ok(Self::Revoke),
            other => Err(UnknownBatchAction(other.to_string())),
        }
    }
}

/// Raised when a batch request names an action the processor cannot apply.
#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a batch-applicable action")]
pub struct UnknownBatchAction(pub String);

/// Per-run bookkeeping. The processor never returns updated records; callers
/// re-fetch the affected set afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: Vec<ApplicationId>,
}

impl BatchOutcome {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}
