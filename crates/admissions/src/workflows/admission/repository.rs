use super::audit::AuditAction;
use super::domain::{
    AdmissionApplication, AdmissionStatus, ApplicantId, ApplicationId, FeeStructure, LoginStatus,
    Permission, StaffId, StudentId,
};

/// Storage abstraction for admission applications.
///
/// `update` is the optimistic write used by every transition: the stored
/// status must still match `expected` at write time or the call fails with
/// [`RepositoryError::Conflict`], so a losing concurrent caller never
/// double-applies an edge.
pub trait ApplicationRepository: Send + Sync {
    fn insert(
        &self,
        record: AdmissionApplication,
    ) -> Result<AdmissionApplication, RepositoryError>;
    fn fetch(&self, id: &ApplicationId)
        -> Result<Option<AdmissionApplication>, RepositoryError>;
    fn update(
        &self,
        record: AdmissionApplication,
        expected: AdmissionStatus,
    ) -> Result<(), RepositoryError>;
    fn list(&self) -> Result<Vec<AdmissionApplication>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
    #[error("stale write: stored status is '{found}'")]
    Conflict { found: AdmissionStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// External permission evaluator; authentication and role mapping live
/// outside this crate.
pub trait PermissionEvaluator: Send + Sync {
    fn has_permission(&self, staff: &StaffId, permission: Permission) -> bool;
}

/// External fee-structure master catalog. Only point-in-time values matter
/// here; the rows returned are already filtered to the session and grade.
pub trait FeeCatalog: Send + Sync {
    fn selectable(
        &self,
        academic_session: &str,
        grade_level: &str,
    ) -> Result<Vec<FeeStructure>, CollaboratorError>;
}

/// External applicant account directory; login status gates enrolment.
pub trait ApplicantDirectory: Send + Sync {
    fn login_status(&self, id: &ApplicantId) -> Result<LoginStatus, CollaboratorError>;
}

/// External object storage for payment-proof artifacts. The engine stores
/// only the reference string returned by `upload`.
pub trait ProofStorage: Send + Sync {
    fn upload(&self, bytes: &[u8]) -> Result<String, CollaboratorError>;
    fn resolve(&self, reference: &str) -> Result<String, CollaboratorError>;
}

/// Outbound notification hook. Dispatch is fire-and-forget: failures are
/// logged by the caller and never roll back a transition.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, id: &ApplicationId, event: AuditAction) -> Result<(), CollaboratorError>;
}

/// Downstream student-record provisioner invoked synchronously by enrolment.
/// A failure here aborts the enrol transition before any state change.
pub trait StudentRecordProvisioner: Send + Sync {
    fn create_student_record(
        &self,
        application: &AdmissionApplication,
    ) -> Result<StudentId, CollaboratorError>;
}

/// Failure reported by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}
