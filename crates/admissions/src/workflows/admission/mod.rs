//! Admission intake, lifecycle, billing, and oversight.
//!
//! `lifecycle` owns the one authoritative transition table; `service` is the
//! orchestrating facade and the only writer of application status. Billing
//! snapshots, the audit trail, SLA aging, batch processing, and the funnel
//! aggregator hang off the same module so every caller shares one source of
//! truth for what a legal transition is.

pub mod aging;
pub mod audit;
pub mod batch;
pub mod billing;
pub mod domain;
pub mod funnel;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aging::{classify, sla_hours, AgingProfile, AgingState, ApplicationAging};
pub use audit::{visible_entries, AuditAction, AuditEntry, AuditError, AuditLogStore};
pub use batch::{BatchAction, BatchOutcome, UnknownBatchAction};
pub use domain::{
    AdmissionApplication, AdmissionStatus, Actor, ApplicantId, ApplicationId, ApplicationIntake,
    ApplicationStatusView, FeeCategory, FeeLineItem, FeeStructure, FeeStructureId, GuardianContact,
    LineItemStatus, LoginStatus, PaymentDetails, PaymentMode, PaymentProof, Permission, StaffId,
    StudentId, StudentProfile,
};
pub use funnel::{FunnelReport, StageMetric, FUNNEL_STAGES};
pub use lifecycle::{
    allowed_actions, plan, AdmissionAction, AdmissionError, FeeVerdict, TransitionGuard,
    TransitionRule, TRANSITIONS,
};
pub use repository::{
    ApplicantDirectory, ApplicationRepository, CollaboratorError, FeeCatalog,
    NotificationDispatcher, PermissionEvaluator, ProofStorage, RepositoryError,
    StudentRecordProvisioner,
};
pub use router::admission_router;
pub use service::{AdmissionService, Collaborators};
