use std::fmt;

use serde::{Deserialize, Serialize};

use super::audit::{AuditAction, AuditError};
use super::domain::{
    AdmissionApplication, AdmissionStatus, Actor, ApplicationId, Permission,
};
use super::repository::{CollaboratorError, PermissionEvaluator, RepositoryError};

/// Workflow action requested against an application.
///
/// Fee verification is a two-outcome decision, so it appears here as the two
/// concrete edges (`ConfirmFee`, `RequestCorrection`) the table can resolve
/// deterministically; callers go through [`FeeVerdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionAction {
    Submit,
    Review,
    VerifyDocs,
    FinalizeBilling,
    SubmitPayment,
    ConfirmFee,
    RequestCorrection,
    Recommend,
    Approve,
    Reject,
    Enrol,
    Revoke,
}

impl AdmissionAction {
    pub const fn wire_name(self) -> &'static str {
        match self {
            AdmissionAction::Submit => "submit",
            AdmissionAction::Review => "review",
            AdmissionAction::VerifyDocs => "verify_docs",
            AdmissionAction::FinalizeBilling => "finalize_billing",
            AdmissionAction::SubmitPayment => "submit_payment",
            AdmissionAction::ConfirmFee => "confirm_fee",
            AdmissionAction::RequestCorrection => "request_correction",
            AdmissionAction::Recommend => "recommend",
            AdmissionAction::Approve => "approve",
            AdmissionAction::Reject => "reject",
            AdmissionAction::Enrol => "enrol",
            AdmissionAction::Revoke => "revoke",
        }
    }

    pub const fn audit_action(self) -> AuditAction {
        match self {
            AdmissionAction::Submit => AuditAction::Submitted,
            AdmissionAction::Review => AuditAction::Reviewed,
            AdmissionAction::VerifyDocs => AuditAction::DocsVerified,
            AdmissionAction::FinalizeBilling => AuditAction::BillingFinalized,
            AdmissionAction::SubmitPayment => AuditAction::PaymentSubmitted,
            AdmissionAction::ConfirmFee => AuditAction::PaymentVerified,
            AdmissionAction::RequestCorrection => AuditAction::CorrectionRequested,
            AdmissionAction::Recommend => AuditAction::Recommended,
            AdmissionAction::Approve => AuditAction::Approved,
            AdmissionAction::Reject => AuditAction::Rejected,
            AdmissionAction::Enrol => AuditAction::Enrolled,
            AdmissionAction::Revoke => AuditAction::Revoked,
        }
    }
}

impl fmt::Display for AdmissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the manual fee verification decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeVerdict {
    Verified,
    Correction,
}

impl FeeVerdict {
    pub const fn action(self) -> AdmissionAction {
        match self {
            FeeVerdict::Verified => AdmissionAction::ConfirmFee,
            FeeVerdict::Correction => AdmissionAction::RequestCorrection,
        }
    }
}

/// Precondition that must hold before a transition executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGuard {
    /// Restricted to the applicant account that owns the record.
    ApplicantOwner,
    /// Requires the named permission from the external evaluator.
    Permission(Permission),
}

/// One row of the authoritative transition table.
#[derive(Debug)]
pub struct TransitionRule {
    pub action: AdmissionAction,
    pub from: &'static [AdmissionStatus],
    pub to: AdmissionStatus,
    pub guard: TransitionGuard,
}

use AdmissionStatus::*;

/// The single source of truth for legal lifecycle edges. Every caller, single
/// item or batch, resolves its transition here; no call site re-derives
/// legality on its own.
pub static TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        action: AdmissionAction::Submit,
        from: &[Draft],
        to: Submitted,
        guard: TransitionGuard::ApplicantOwner,
    },
    TransitionRule {
        action: AdmissionAction::Review,
        from: &[Submitted],
        to: UnderReview,
        guard: TransitionGuard::Permission(Permission::Review),
    },
    TransitionRule {
        action: AdmissionAction::VerifyDocs,
        from: &[UnderReview],
        to: DocsVerified,
        guard: TransitionGuard::Permission(Permission::Review),
    },
    // PaymentPending is a legal source so an open quote can be re-priced
    // idempotently; once a payment reference exists the billing lock takes
    // over regardless of status.
    TransitionRule {
        action: AdmissionAction::FinalizeBilling,
        from: &[DocsVerified, PaymentCorrection, PaymentPending],
        to: PaymentPending,
        guard: TransitionGuard::Permission(Permission::Review),
    },
    TransitionRule {
        action: AdmissionAction::SubmitPayment,
        from: &[PaymentPending, PaymentCorrection],
        to: PaymentSubmitted,
        guard: TransitionGuard::ApplicantOwner,
    },
    TransitionRule {
        action: AdmissionAction::ConfirmFee,
        from: &[PaymentSubmitted],
        to: PaymentVerified,
        guard: TransitionGuard::Permission(Permission::Approve),
    },
    TransitionRule {
        action: AdmissionAction::RequestCorrection,
        from: &[PaymentSubmitted],
        to: PaymentCorrection,
        guard: TransitionGuard::Permission(Permission::Approve),
    },
    TransitionRule {
        action: AdmissionAction::Recommend,
        from: &[PaymentVerified],
        to: Recommended,
        guard: TransitionGuard::Permission(Permission::Recommend),
    },
    TransitionRule {
        action: AdmissionAction::Approve,
        from: &[Recommended],
        to: Approved,
        guard: TransitionGuard::Permission(Permission::Approve),
    },
    TransitionRule {
        action: AdmissionAction::Enrol,
        from: &[Approved],
        to: Enrolled,
        guard: TransitionGuard::Permission(Permission::Enrol),
    },
    TransitionRule {
        action: AdmissionAction::Reject,
        from: &[
            Submitted,
            UnderReview,
            DocsVerified,
            PaymentPending,
            PaymentSubmitted,
            PaymentVerified,
            Recommended,
        ],
        to: Rejected,
        guard: TransitionGuard::Permission(Permission::Reject),
    },
    // Backward edge for operator error-correction; deliberately bound to the
    // same permission that can reject.
    TransitionRule {
        action: AdmissionAction::Revoke,
        from: &[Rejected],
        to: Submitted,
        guard: TransitionGuard::Permission(Permission::Review),
    },
];

/// Resolve the rule for `action` when the application currently sits in
/// `status`, or fail with [`AdmissionError::InvalidTransition`].
pub fn plan(
    action: AdmissionAction,
    status: AdmissionStatus,
) -> Result<&'static TransitionRule, AdmissionError> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.action == action && rule.from.contains(&status))
        .ok_or(AdmissionError::InvalidTransition { action, status })
}

/// Actions that could legally fire from `status`, ignoring guards.
pub fn allowed_actions(status: AdmissionStatus) -> Vec<AdmissionAction> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from.contains(&status))
        .map(|rule| rule.action)
        .collect()
}

/// Enforce the rule's guard for the acting identity.
///
/// `Actor::System` passes permission guards (it is the engine's own trusted
/// identity) but never the ownership guard.
pub(crate) fn check_guard(
    rule: &TransitionRule,
    actor: &Actor,
    application: &AdmissionApplication,
    permissions: &dyn PermissionEvaluator,
) -> Result<(), AdmissionError> {
    match rule.guard {
        TransitionGuard::ApplicantOwner => match actor {
            Actor::Applicant(id) if application.owned_by(id) => Ok(()),
            _ => Err(AdmissionError::NotRecordOwner {
                action: rule.action,
            }),
        },
        TransitionGuard::Permission(permission) => match actor {
            Actor::System => Ok(()),
            Actor::Staff(id) if permissions.has_permission(id, permission) => Ok(()),
            _ => Err(AdmissionError::PermissionDenied {
                action: rule.action,
                permission,
            }),
        },
    }
}

/// Error surface of the lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("action '{action}' is not allowed while the application is '{status}'")]
    InvalidTransition {
        action: AdmissionAction,
        status: AdmissionStatus,
    },
    #[error("action '{action}' requires the '{permission}' permission")]
    PermissionDenied {
        action: AdmissionAction,
        permission: Permission,
    },
    #[error("action '{action}' is restricted to the applicant that owns the record")]
    NotRecordOwner { action: AdmissionAction },
    #[error("{0}")]
    Validation(String),
    #[error("billing is locked for application '{0}': a payment reference already exists")]
    BillingLocked(ApplicationId),
    #[error("application '{id}' changed concurrently: expected '{expected}', found '{found}'")]
    Conflict {
        id: ApplicationId,
        expected: AdmissionStatus,
        found: AdmissionStatus,
    },
    #[error("application '{0}' was not found")]
    NotFound(ApplicationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}
