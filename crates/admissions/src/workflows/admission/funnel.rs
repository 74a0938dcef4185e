use serde::Serialize;

use super::domain::{AdmissionApplication, AdmissionStatus};

/// Fixed stage sequence the structural funnel is computed over.
pub const FUNNEL_STAGES: [AdmissionStatus; 8] = [
    AdmissionStatus::Submitted,
    AdmissionStatus::UnderReview,
    AdmissionStatus::DocsVerified,
    AdmissionStatus::PaymentSubmitted,
    AdmissionStatus::PaymentVerified,
    AdmissionStatus::Recommended,
    AdmissionStatus::Approved,
    AdmissionStatus::Enrolled,
];

/// Per-stage funnel metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMetric {
    pub stage: AdmissionStatus,
    pub stage_label: &'static str,
    /// Applications whose current position is at or beyond this stage.
    pub reached: usize,
    /// Applications currently parked at this stage (excluding rejected ones).
    pub at_stage: usize,
    /// Share of applications that finished the previous stage but never
    /// reached this one, as a percentage.
    pub drop_off_pct: f64,
}

/// Point-in-time structural funnel over the current status distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelReport {
    pub stages: Vec<StageMetric>,
    pub total: usize,
    pub enrolled: usize,
    pub rejected: usize,
    pub conversion_rate: f64,
}

/// Furthest funnel index the application's current state evidences, or
/// `None` for drafts (not yet in the funnel).
///
/// Intermediate billing statuses sit at the stage they have completed:
/// `payment_pending` at docs-verified, `payment_correction` at
/// payment-submitted. Rejected applications are placed from their stage
/// timestamps and payment flags, since the status alone no longer says how
/// far they got.
fn funnel_index(application: &AdmissionApplication) -> Option<usize> {
    match application.status {
        AdmissionStatus::Draft => None,
        AdmissionStatus::Submitted => Some(0),
        AdmissionStatus::UnderReview => Some(1),
        AdmissionStatus::DocsVerified | AdmissionStatus::PaymentPending => Some(2),
        AdmissionStatus::PaymentSubmitted | AdmissionStatus::PaymentCorrection => Some(3),
        AdmissionStatus::PaymentVerified => Some(4),
        AdmissionStatus::Recommended => Some(5),
        AdmissionStatus::Approved => Some(6),
        AdmissionStatus::Enrolled => Some(7),
        AdmissionStatus::Rejected => Some(rejected_index(application)),
    }
}

fn rejected_index(application: &AdmissionApplication) -> usize {
    if application.approved_at.is_some() {
        6
    } else if application.recommended_at.is_some() {
        5
    } else if application.payment.verified {
        4
    } else if application.payment.reference.is_some() {
        3
    } else if application.payment.enabled {
        2
    } else {
        0
    }
}

/// Build the funnel over the given applications. Drafts are ignored;
/// everything else counts toward `total` and the conversion rate.
pub fn build(applications: &[AdmissionApplication]) -> FunnelReport {
    let positioned: Vec<(usize, bool)> = applications
        .iter()
        .filter_map(|app| {
            funnel_index(app).map(|index| (index, app.status == AdmissionStatus::Rejected))
        })
        .collect();

    let total = positioned.len();
    let reached = |stage: usize| {
        positioned
            .iter()
            .filter(|(index, _)| *index >= stage)
            .count()
    };
    let at_stage = |stage: usize| {
        positioned
            .iter()
            .filter(|(index, rejected)| *index == stage && !rejected)
            .count()
    };

    let mut stages = Vec::with_capacity(FUNNEL_STAGES.len());
    for (i, stage) in FUNNEL_STAGES.iter().enumerate() {
        let drop_off_pct = if i == 0 {
            0.0
        } else {
            let finished_prev = reached(i - 1).saturating_sub(at_stage(i - 1));
            let lost = finished_prev.saturating_sub(reached(i));
            if finished_prev == 0 {
                0.0
            } else {
                lost as f64 / finished_prev as f64 * 100.0
            }
        };

        stages.push(StageMetric {
            stage: *stage,
            stage_label: stage.label(),
            reached: reached(i),
            at_stage: at_stage(i),
            drop_off_pct,
        });
    }

    let enrolled = applications
        .iter()
        .filter(|app| app.status == AdmissionStatus::Enrolled)
        .count();
    let rejected = applications
        .iter()
        .filter(|app| app.status == AdmissionStatus::Rejected)
        .count();
    let conversion_rate = if total == 0 {
        0.0
    } else {
        enrolled as f64 / total as f64
    };

    FunnelReport {
        stages,
        total,
        enrolled,
        rejected,
        conversion_rate,
    }
}
