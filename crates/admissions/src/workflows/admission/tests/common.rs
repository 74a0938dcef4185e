use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::workflows::admission::audit::{AuditEntry, AuditError, AuditLogStore};
use crate::workflows::admission::domain::{
    AdmissionApplication, AdmissionStatus, Actor, ApplicantId, ApplicationId, ApplicationIntake,
    FeeCategory, FeeStructure, FeeStructureId, GuardianContact, LoginStatus, PaymentMode,
    PaymentProof, Permission, StaffId, StudentId, StudentProfile,
};
use crate::workflows::admission::lifecycle::FeeVerdict;
use crate::workflows::admission::repository::{
    ApplicantDirectory, ApplicationRepository, CollaboratorError, FeeCatalog,
    NotificationDispatcher, PermissionEvaluator, RepositoryError, StudentRecordProvisioner,
};
use crate::workflows::admission::service::{AdmissionService, Collaborators};
use crate::workflows::admission::{admission_router, AuditAction};

pub(super) const SESSION: &str = "2026-27";
pub(super) const GRADE: &str = "grade-5";

pub(super) fn applicant_id() -> ApplicantId {
    ApplicantId("guardian-0147".to_string())
}

pub(super) fn applicant() -> Actor {
    Actor::Applicant(applicant_id())
}

pub(super) fn officer() -> Actor {
    Actor::Staff(StaffId("officer-01".to_string()))
}

pub(super) fn finance() -> Actor {
    Actor::Staff(StaffId("finance-01".to_string()))
}

pub(super) fn head() -> Actor {
    Actor::Staff(StaffId("head-01".to_string()))
}

pub(super) fn intake() -> ApplicationIntake {
    ApplicationIntake {
        school_code: "GHS".to_string(),
        academic_session: SESSION.to_string(),
        grade_level: GRADE.to_string(),
        applicant_id: applicant_id(),
        student: StudentProfile {
            first_name: "Asha".to_string(),
            last_name: "Verma".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2016, 4, 18).expect("valid date"),
            prior_school: Some("Sunrise Primary".to_string()),
        },
        guardian: GuardianContact {
            name: "Meera Verma".to_string(),
            relationship: "mother".to_string(),
            phone: "+91-98100-22334".to_string(),
            email: "meera.verma@example.com".to_string(),
        },
    }
}

pub(super) fn tuition_id() -> FeeStructureId {
    FeeStructureId("fee-tuition".to_string())
}

pub(super) fn admission_fee_id() -> FeeStructureId {
    FeeStructureId("fee-admission".to_string())
}

pub(super) fn transport_id() -> FeeStructureId {
    FeeStructureId("fee-transport".to_string())
}

pub(super) fn activity_id() -> FeeStructureId {
    FeeStructureId("fee-activity".to_string())
}

pub(super) fn catalog_rows() -> Vec<FeeStructure> {
    vec![
        FeeStructure {
            id: tuition_id(),
            name: "Tuition Fee".to_string(),
            amount: dec!(25000),
            category: FeeCategory::Tuition,
            mandatory: true,
            academic_session: SESSION.to_string(),
            grade_level: Some(GRADE.to_string()),
        },
        FeeStructure {
            id: admission_fee_id(),
            name: "Admission Fee".to_string(),
            amount: dec!(10000),
            category: FeeCategory::Admission,
            mandatory: true,
            academic_session: SESSION.to_string(),
            grade_level: None,
        },
        FeeStructure {
            id: transport_id(),
            name: "Transport Fee".to_string(),
            amount: dec!(8000),
            category: FeeCategory::Transport,
            mandatory: false,
            academic_session: SESSION.to_string(),
            grade_level: None,
        },
        FeeStructure {
            id: activity_id(),
            name: "Activity Fee".to_string(),
            amount: dec!(1500),
            category: FeeCategory::Activity,
            mandatory: false,
            academic_session: SESSION.to_string(),
            grade_level: Some(GRADE.to_string()),
        },
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, AdmissionApplication>>>,
}

impl ApplicationRepository for MemoryRepository {
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
pub(super) struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub(super) fn all(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditLogStore for MemoryAuditLog {
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

/// Grants everything; the default for tests that are not about permissions.
pub(super) struct AllowAll;

impl PermissionEvaluator for AllowAll {
    fn has_permission(&self, _staff: &StaffId, _permission: Permission) -> bool {
        true
    }
}

/// Grants nothing.
pub(super) struct DenyAll;

impl PermissionEvaluator for DenyAll {
    fn has_permission(&self, _staff: &StaffId, _permission: Permission) -> bool {
        false
    }
}

/// Grants a fixed permission list to every staff identity.
pub(super) struct GrantList(pub(super) Vec<Permission>);

impl PermissionEvaluator for GrantList {
    fn has_permission(&self, _staff: &StaffId, permission: Permission) -> bool {
        self.0.contains(&permission)
    }
}

pub(super) struct StaticCatalog {
    rows: Vec<FeeStructure>,
}

impl FeeCatalog for StaticCatalog {
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

#[derive(Default)]
pub(super) struct MemoryDirectory {
    statuses: Mutex<HashMap<ApplicantId, LoginStatus>>,
}

impl MemoryDirectory {
    pub(super) fn set(&self, id: ApplicantId, status: LoginStatus) {
        self.statuses
            .lock()
            .expect("directory mutex poisoned")
            .insert(id, status);
    }
}

impl ApplicantDirectory for MemoryDirectory {
    fn login_status(&self, id: &ApplicantId) -> Result<LoginStatus, CollaboratorError> {
        Ok(self
            .statuses
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .copied()
            .unwrap_or(LoginStatus::Approved))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<(ApplicationId, AuditAction)>>,
    fail: AtomicBool,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<(ApplicationId, AuditAction)> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail_next_dispatches(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl NotificationDispatcher for MemoryNotifier {
    fn notify(&self, id: &ApplicationId, event: AuditAction) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "notification transport offline".to_string(),
            ));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push((id.clone(), event));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryProvisioner {
    provisioned: Mutex<Vec<ApplicationId>>,
    fail: AtomicBool,
}

impl MemoryProvisioner {
    pub(super) fn provisioned(&self) -> Vec<ApplicationId> {
        self.provisioned
            .lock()
            .expect("provisioner mutex poisoned")
            .clone()
    }

    pub(super) fn fail_next_calls(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl StudentRecordProvisioner for MemoryProvisioner {
    fn create_student_record(
        &self,
        application: &AdmissionApplication,
    ) -> Result<StudentId, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "student information system offline".to_string(),
            ));
        }
        self.provisioned
            .lock()
            .expect("provisioner mutex poisoned")
            .push(application.id.clone());
        Ok(StudentId(format!("stu-{}", application.id.0)))
    }
}

pub(super) struct TestWorld {
    pub(super) service: Arc<AdmissionService<MemoryRepository, MemoryAuditLog>>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) audit: Arc<MemoryAuditLog>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) provisioner: Arc<MemoryProvisioner>,
}

pub(super) fn world() -> TestWorld {
    world_with_permissions(Arc::new(AllowAll))
}

pub(super) fn world_with_permissions(permissions: Arc<dyn PermissionEvaluator>) -> TestWorld {
    let repository = Arc::new(MemoryRepository::default());
    let audit = Arc::new(MemoryAuditLog::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let directory = Arc::new(MemoryDirectory::default());
    let provisioner = Arc::new(MemoryProvisioner::default());

    let collaborators = Collaborators {
        permissions,
        catalog: Arc::new(StaticCatalog {
            rows: catalog_rows(),
        }),
        directory: directory.clone(),
        notifier: notifier.clone(),
        provisioner: provisioner.clone(),
    };

    let service = Arc::new(AdmissionService::new(
        repository.clone(),
        audit.clone(),
        collaborators,
    ));

    TestWorld {
        service,
        repository,
        audit,
        notifier,
        directory,
        provisioner,
    }
}

pub(super) fn submitted_application(world: &TestWorld) -> AdmissionApplication {
    let draft = world
        .service
        .create_draft(intake())
        .expect("draft can be created");
    world
        .service
        .submit(&applicant(), &draft.id)
        .expect("draft can be submitted")
}

pub(super) fn payment_pending_application(world: &TestWorld) -> AdmissionApplication {
    let record = submitted_application(world);
    world
        .service
        .review(&officer(), &record.id, Some("documents received".to_string()))
        .expect("review succeeds");
    world
        .service
        .verify_docs(&officer(), &record.id, None)
        .expect("docs verify");
    world
        .service
        .finalize_billing(&officer(), &record.id, &[transport_id()])
        .expect("billing finalizes")
}

pub(super) fn payment_submitted_application(world: &TestWorld) -> AdmissionApplication {
    let record = payment_pending_application(world);
    world
        .service
        .submit_payment(
            &applicant(),
            &record.id,
            PaymentMode::BankTransfer,
            "TXN-88412".to_string(),
            Some(PaymentProof::ExternalUrl(
                "https://bank.example.com/receipt/88412".to_string(),
            )),
        )
        .expect("payment submits")
}

pub(super) fn recommended_application(world: &TestWorld) -> AdmissionApplication {
    let record = payment_submitted_application(world);
    world
        .service
        .verify_fee(&finance(), &record.id, FeeVerdict::Verified, None)
        .expect("fee verifies");
    world
        .service
        .recommend(&officer(), &record.id, Some("strong candidate".to_string()))
        .expect("recommend succeeds")
}

pub(super) fn approved_application(world: &TestWorld) -> AdmissionApplication {
    let record = recommended_application(world);
    world
        .service
        .approve(&head(), &record.id, None)
        .expect("approve succeeds")
}

pub(super) fn enrolled_application(world: &TestWorld) -> AdmissionApplication {
    let record = approved_application(world);
    world
        .service
        .enrol(&officer(), &record.id)
        .expect("enrol succeeds")
}

pub(super) fn admission_router_with(world: &TestWorld) -> axum::Router {
    admission_router(world.service.clone())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
