use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{AdmissionStatus, ApplicationId};

/// Where an application stands against its status's time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingState {
    Within,
    Approaching,
    Breached,
}

impl AgingState {
    pub const fn label(self) -> &'static str {
        match self {
            AgingState::Within => "within",
            AgingState::Approaching => "approaching",
            AgingState::Breached => "breached",
        }
    }
}

/// Result of classifying one application's dwell time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgingProfile {
    pub elapsed_hours: i64,
    pub sla_hours: i64,
    pub state: AgingState,
}

/// One row of a bulk aging sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationAging {
    pub application_id: ApplicationId,
    pub status: AdmissionStatus,
    pub profile: AgingProfile,
}

/// Hours an application may dwell in a status before it counts as stalled.
/// Zero means the status has no budget (terminal happy state).
pub const fn sla_hours(status: AdmissionStatus) -> i64 {
    match status {
        AdmissionStatus::Submitted => 24,
        AdmissionStatus::UnderReview => 48,
        AdmissionStatus::DocsVerified => 24,
        AdmissionStatus::PaymentSubmitted => 48,
        AdmissionStatus::PaymentVerified => 24,
        AdmissionStatus::Recommended => 72,
        AdmissionStatus::Approved => 168,
        AdmissionStatus::Enrolled => 0,
        _ => 72,
    }
}

/// Classify dwell time against the per-status budget.
///
/// Stateless by design: the same function serves single-record display and
/// bulk dashboard sweeps. A zero budget never breaches and never counts as
/// approaching.
pub fn classify(
    status: AdmissionStatus,
    last_transition_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AgingProfile {
    let sla = sla_hours(status);
    let elapsed = (now - last_transition_at).num_hours().max(0);

    let state = if sla == 0 {
        AgingState::Within
    } else if elapsed >= sla {
        AgingState::Breached
    } else if elapsed as f64 >= 0.7 * sla as f64 {
        AgingState::Approaching
    } else {
        AgingState::Within
    };

    AgingProfile {
        elapsed_hours: elapsed,
        sla_hours: sla,
        state,
    }
}
