use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for admission applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier of the applicant (parent/guardian) account that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

/// Identifier of a staff account acting on applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

/// Identifier of the student record provisioned on enrolment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier of a fee-structure master row, kept on snapshots as provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeeStructureId(pub String);

/// Workflow status tracked throughout the admission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Draft,
    Submitted,
    UnderReview,
    DocsVerified,
    PaymentPending,
    PaymentSubmitted,
    PaymentVerified,
    PaymentCorrection,
    Recommended,
    Approved,
    Rejected,
    Enrolled,
}

impl AdmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AdmissionStatus::Draft => "draft",
            AdmissionStatus::Submitted => "submitted",
            AdmissionStatus::UnderReview => "under_review",
            AdmissionStatus::DocsVerified => "docs_verified",
            AdmissionStatus::PaymentPending => "payment_pending",
            AdmissionStatus::PaymentSubmitted => "payment_submitted",
            AdmissionStatus::PaymentVerified => "payment_verified",
            AdmissionStatus::PaymentCorrection => "payment_correction",
            AdmissionStatus::Recommended => "recommended",
            AdmissionStatus::Approved => "approved",
            AdmissionStatus::Rejected => "rejected",
            AdmissionStatus::Enrolled => "enrolled",
        }
    }
}

/// Biographical details captured on the application form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub prior_school: Option<String>,
}

/// Parent/guardian contact details kept with the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
    pub email: String,
}

/// Inbound payload used to open a draft application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationIntake {
    pub school_code: String,
    pub academic_session: String,
    pub grade_level: String,
    pub applicant_id: ApplicantId,
    pub student: StudentProfile,
    pub guardian: GuardianContact,
}

/// Attested payment channel; capture is manual, not a gateway transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    BankTransfer,
    Online,
}

impl PaymentMode {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::BankTransfer => "bank_transfer",
            PaymentMode::Online => "online",
        }
    }
}

/// Reference to the payment proof artifact; the engine never stores bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PaymentProof {
    ExternalUrl(String),
    Stored(String),
}

impl PaymentProof {
    pub fn reference(&self) -> &str {
        match self {
            PaymentProof::ExternalUrl(url) => url,
            PaymentProof::Stored(key) => key,
        }
    }
}

/// Payment state carried on the application record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub enabled: bool,
    pub amount: Decimal,
    pub mode: Option<PaymentMode>,
    pub reference: Option<String>,
    pub proof: Option<PaymentProof>,
    pub paid_on: Option<DateTime<Utc>>,
    pub verified: bool,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: Decimal::ZERO,
            mode: None,
            reference: None,
            proof: None,
            paid_on: None,
            verified: false,
        }
    }
}

/// Fee component classification mirrored from the master catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    Tuition,
    Admission,
    Transport,
    Activity,
    Caution,
    Misc,
}

impl FeeCategory {
    pub const fn label(self) -> &'static str {
        match self {
            FeeCategory::Tuition => "tuition",
            FeeCategory::Admission => "admission",
            FeeCategory::Transport => "transport",
            FeeCategory::Activity => "activity",
            FeeCategory::Caution => "caution",
            FeeCategory::Misc => "misc",
        }
    }
}

/// Payment state of a single frozen line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    Enabled,
    Paid,
    Voided,
}

/// One billed component, frozen from the master catalog at billing time.
///
/// `name`/`amount`/`category`/`mandatory` never change after creation; later
/// edits to the originating master row must not reprice an existing snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLineItem {
    pub structure_id: FeeStructureId,
    pub name: String,
    pub amount: Decimal,
    pub category: FeeCategory,
    pub mandatory: bool,
    pub payment_status: LineItemStatus,
    pub enabled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Master-catalog row as served by the external fee catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: FeeStructureId,
    pub name: String,
    pub amount: Decimal,
    pub category: FeeCategory,
    pub mandatory: bool,
    pub academic_session: String,
    pub grade_level: Option<String>,
}

/// Login state of the owning applicant account, gating enrolment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    Pending,
    Approved,
    Rejected,
    Blocked,
}

impl LoginStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoginStatus::Pending => "pending",
            LoginStatus::Approved => "approved",
            LoginStatus::Rejected => "rejected",
            LoginStatus::Blocked => "blocked",
        }
    }
}

/// Permission codes evaluated by the external permission collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Review,
    Recommend,
    Approve,
    Reject,
    Enrol,
}

impl Permission {
    pub const fn code(self) -> &'static str {
        match self {
            Permission::Review => "review",
            Permission::Recommend => "recommend",
            Permission::Approve => "approve",
            Permission::Reject => "reject",
            Permission::Enrol => "enrol",
        }
    }
}

/// Identity performing a transition; `System` is used by automated paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    System,
    Applicant(ApplicantId),
    Staff(StaffId),
}

impl Actor {
    /// Label persisted on audit entries.
    pub fn audit_label(&self) -> String {
        match self {
            Actor::System => "system".to_string(),
            Actor::Applicant(id) => format!("applicant:{}", id.0),
            Actor::Staff(id) => format!("staff:{}", id.0),
        }
    }
}

/// The central admission record, mutated exclusively by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionApplication {
    pub id: ApplicationId,
    pub school_code: String,
    pub academic_session: String,
    pub grade_level: String,
    pub applicant_id: ApplicantId,
    pub student: StudentProfile,
    pub guardian: GuardianContact,
    pub status: AdmissionStatus,
    pub officer_remarks: Option<String>,
    pub head_remarks: Option<String>,
    pub finance_remarks: Option<String>,
    pub rejection_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub recommended_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub payment: PaymentDetails,
    pub fee_snapshot: Vec<FeeLineItem>,
    pub last_transition_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdmissionApplication {
    pub fn from_intake(id: ApplicationId, intake: ApplicationIntake, now: DateTime<Utc>) -> Self {
        Self {
            id,
            school_code: intake.school_code,
            academic_session: intake.academic_session,
            grade_level: intake.grade_level,
            applicant_id: intake.applicant_id,
            student: intake.student,
            guardian: intake.guardian,
            status: AdmissionStatus::Draft,
            officer_remarks: None,
            head_remarks: None,
            finance_remarks: None,
            rejection_reason: None,
            submitted_at: None,
            recommended_at: None,
            approved_at: None,
            rejected_at: None,
            payment: PaymentDetails::default(),
            fee_snapshot: Vec::new(),
            last_transition_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of the non-voided snapshot line items.
    pub fn snapshot_total(&self) -> Decimal {
        self.fee_snapshot
            .iter()
            .filter(|item| item.payment_status != LineItemStatus::Voided)
            .map(|item| item.amount)
            .sum()
    }

    pub fn owned_by(&self, applicant: &ApplicantId) -> bool {
        &self.applicant_id == applicant
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            status: self.status.label(),
            payment_enabled: self.payment.enabled,
            payment_amount: self.payment.amount,
            payment_verified: self.payment.verified,
            rejection_reason: self.rejection_reason.clone(),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub payment_enabled: bool,
    pub payment_amount: Decimal,
    pub payment_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}
