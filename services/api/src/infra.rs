use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use admissions::workflows::admission::{
    AdmissionApplication, AdmissionStatus, ApplicantDirectory, ApplicantId, ApplicationId,
    ApplicationRepository, AuditAction, AuditEntry, AuditError, AuditLogStore, CollaboratorError,
    Collaborators, FeeCatalog, FeeCategory, FeeStructure, FeeStructureId, LoginStatus,
    NotificationDispatcher, Permission, PermissionEvaluator, ProofStorage, RepositoryError,
    StaffId, StudentId, StudentRecordProvisioner,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal_macros::dec;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, AdmissionApplication>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(
        &self,
        record: AdmissionApplication,
    ) -> Result<AdmissionApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<AdmissionApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        record: AdmissionApplication,
        expected: AdmissionStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict {
                found: stored.status,
            });
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<AdmissionApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditLogStore for InMemoryAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn entries_for(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self
            .entries
            .lock()
            .expect("audit mutex poisoned")
            .iter()
            .filter(|entry| &entry.application_id == id)
            .cloned()
            .collect())
    }
}

/// Role-prefix permission evaluator standing in for the external auth
/// service: the segment before the first '-' in the staff id names the role.
pub(crate) struct RolePrefixPermissions;

impl PermissionEvaluator for RolePrefixPermissions {
    fn has_permission(&self, staff: &StaffId, permission: Permission) -> bool {
        let role = staff.0.split('-').next().unwrap_or_default();
        match role {
            "admin" => true,
            "officer" => matches!(
                permission,
                Permission::Review | Permission::Recommend | Permission::Reject
            ),
            "finance" => matches!(permission, Permission::Approve),
            "head" => matches!(permission, Permission::Approve | Permission::Reject),
            "registrar" => matches!(permission, Permission::Enrol),
            _ => false,
        }
    }
}

/// Built-in fee catalog used until the master-data service is wired in.
pub(crate) struct StaticFeeCatalog {
    rows: Vec<FeeStructure>,
}

impl Default for StaticFeeCatalog {
    fn default() -> Self {
        Self {
            rows: default_fee_rows(),
        }
    }
}

impl FeeCatalog for StaticFeeCatalog {
    fn selectable(
        &self,
        academic_session: &str,
        grade_level: &str,
    ) -> Result<Vec<FeeStructure>, CollaboratorError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                row.academic_session == academic_session
                    && row
                        .grade_level
                        .as_deref()
                        .map(|grade| grade == grade_level)
                        .unwrap_or(true)
            })
            .cloned()
            .collect())
    }
}

pub(crate) fn default_fee_rows() -> Vec<FeeStructure> {
    vec![
        FeeStructure {
            id: FeeStructureId("fee-tuition-2026".to_string()),
            name: "Tuition Fee".to_string(),
            amount: dec!(24000),
            category: FeeCategory::Tuition,
            mandatory: true,
            academic_session: "2026-27".to_string(),
            grade_level: None,
        },
        FeeStructure {
            id: FeeStructureId("fee-admission-2026".to_string()),
            name: "Admission Fee".to_string(),
            amount: dec!(7500),
            category: FeeCategory::Admission,
            mandatory: true,
            academic_session: "2026-27".to_string(),
            grade_level: None,
        },
        FeeStructure {
            id: FeeStructureId("fee-caution-2026".to_string()),
            name: "Caution Deposit".to_string(),
            amount: dec!(5000),
            category: FeeCategory::Caution,
            mandatory: true,
            academic_session: "2026-27".to_string(),
            grade_level: None,
        },
        FeeStructure {
            id: FeeStructureId("fee-transport-2026".to_string()),
            name: "Transport Fee".to_string(),
            amount: dec!(9000),
            category: FeeCategory::Transport,
            mandatory: false,
            academic_session: "2026-27".to_string(),
            grade_level: None,
        },
        FeeStructure {
            id: FeeStructureId("fee-activity-2026".to_string()),
            name: "Activity Fee".to_string(),
            amount: dec!(2000),
            category: FeeCategory::Activity,
            mandatory: false,
            academic_session: "2026-27".to_string(),
            grade_level: None,
        },
    ]
}

/// Applicant directory stub: every known login is approved. The production
/// deployment points this trait at the identity service instead.
pub(crate) struct ApprovedApplicantDirectory;

impl ApplicantDirectory for ApprovedApplicantDirectory {
    fn login_status(&self, _id: &ApplicantId) -> Result<LoginStatus, CollaboratorError> {
        Ok(LoginStatus::Approved)
    }
}

/// Notification dispatcher that records intent in the service log. Delivery
/// is best-effort by contract, so logging is a faithful stand-in.
pub(crate) struct LoggingNotifier;

impl NotificationDispatcher for LoggingNotifier {
    fn notify(&self, id: &ApplicationId, event: AuditAction) -> Result<(), CollaboratorError> {
        info!(application = %id.0, event = event.label(), "notification dispatched");
        Ok(())
    }
}

static STUDENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Sequential student-record provisioner used by the in-memory deployment.
pub(crate) struct SequentialProvisioner;

impl StudentRecordProvisioner for SequentialProvisioner {
    fn create_student_record(
        &self,
        application: &AdmissionApplication,
    ) -> Result<StudentId, CollaboratorError> {
        let id = STUDENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        info!(application = %application.id.0, "provisioning student record");
        Ok(StudentId(format!("stu-{id:06}")))
    }
}

/// Proof storage keeping artifacts in memory; `resolve` hands back a
/// pseudo-URL good enough for demos and tests.
#[derive(Default)]
pub(crate) struct InMemoryProofStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    sequence: AtomicU64,
}

impl ProofStorage for InMemoryProofStorage {
    fn upload(&self, bytes: &[u8]) -> Result<String, CollaboratorError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let key = format!("proofs/payment-{id:06}");
        self.blobs
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    fn resolve(&self, reference: &str) -> Result<String, CollaboratorError> {
        let guard = self.blobs.lock().expect("storage mutex poisoned");
        if guard.contains_key(reference) {
            Ok(format!("memory://{reference}"))
        } else {
            Err(CollaboratorError::Rejected(format!(
                "unknown proof reference '{reference}'"
            )))
        }
    }
}

pub(crate) fn default_collaborators() -> Collaborators {
    Collaborators {
        permissions: Arc::new(RolePrefixPermissions),
        catalog: Arc::new(StaticFeeCatalog::default()),
        directory: Arc::new(ApprovedApplicantDirectory),
        notifier: Arc::new(LoggingNotifier),
        provisioner: Arc::new(SequentialProvisioner),
    }
}
