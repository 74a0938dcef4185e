use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ApplicationId;

/// Transition names recorded on the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Submitted,
    Reviewed,
    DocsVerified,
    BillingFinalized,
    PaymentSubmitted,
    PaymentVerified,
    CorrectionRequested,
    Recommended,
    Approved,
    Rejected,
    Enrolled,
    Revoked,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Submitted => "SUBMITTED",
            AuditAction::Reviewed => "REVIEWED",
            AuditAction::DocsVerified => "DOCS_VERIFIED",
            AuditAction::BillingFinalized => "BILLING_FINALIZED",
            AuditAction::PaymentSubmitted => "PAYMENT_SUBMITTED",
            AuditAction::PaymentVerified => "PAYMENT_VERIFIED",
            AuditAction::CorrectionRequested => "CORRECTION_REQUESTED",
            AuditAction::Recommended => "RECOMMENDED",
            AuditAction::Approved => "APPROVED",
            AuditAction::Rejected => "REJECTED",
            AuditAction::Enrolled => "ENROLLED",
            AuditAction::Revoked => "REVOKED",
        }
    }

    /// Actions surfaced to the applicant-facing log. Everything else is a
    /// staff-only entry; the filter is a confidentiality boundary enforced in
    /// the query path, not a presentation concern.
    pub const fn is_public(self) -> bool {
        matches!(
            self,
            AuditAction::Submitted
                | AuditAction::Approved
                | AuditAction::Rejected
                | AuditAction::Enrolled
        )
    }
}

/// One append-only trail entry; never updated or deleted after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub application_id: ApplicationId,
    pub action: AuditAction,
    pub performed_by: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only storage for the audit trail.
pub trait AuditLogStore: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
    fn entries_for(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Audit store failure.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}

/// Order entries by creation time and drop staff-only actions for non-staff
/// viewers.
pub fn visible_entries(mut entries: Vec<AuditEntry>, viewer_is_staff: bool) -> Vec<AuditEntry> {
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    if viewer_is_staff {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| entry.action.is_public())
        .collect()
}
