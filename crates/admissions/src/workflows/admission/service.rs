use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::aging::{classify, AgingProfile, ApplicationAging};
use super::audit::{visible_entries, AuditEntry, AuditLogStore};
use super::batch::{BatchAction, BatchOutcome};
use super::billing;
use super::domain::{
    AdmissionApplication, AdmissionStatus, Actor, ApplicationId, ApplicationIntake,
    FeeStructureId, LineItemStatus, LoginStatus, PaymentMode, PaymentProof,
};
use super::funnel::FunnelReport;
use super::lifecycle::{self, AdmissionAction, AdmissionError, FeeVerdict};
use super::repository::{
    ApplicantDirectory, ApplicationRepository, FeeCatalog, NotificationDispatcher,
    PermissionEvaluator, RepositoryError, StudentRecordProvisioner,
};

/// External collaborators the engine consumes but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub permissions: Arc<dyn PermissionEvaluator>,
    pub catalog: Arc<dyn FeeCatalog>,
    pub directory: Arc<dyn ApplicantDirectory>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub provisioner: Arc<dyn StudentRecordProvisioner>,
}

/// Facade over the lifecycle state machine, billing engine, audit trail,
/// aging classifier, batch processor, and funnel aggregator. This is the sole
/// writer of application status.
pub struct AdmissionService<R, L> {
    repository: Arc<R>,
    audit: Arc<L>,
    collaborators: Collaborators,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("adm-{id:06}"))
}

impl<R, L> AdmissionService<R, L>
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<L>, collaborators: Collaborators) -> Self {
        Self {
            repository,
            audit,
            collaborators,
        }
    }

    /// Open a new application in `draft` for the applicant named by the
    /// intake payload.
    pub fn create_draft(
        &self,
        intake: ApplicationIntake,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let now = Utc::now();
        let record = AdmissionApplication::from_intake(next_application_id(), intake, now);
        let stored = self.repository.insert(record)?;
        Ok(stored)
    }

    /// Applicant hands the draft over for processing.
    pub fn submit(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<AdmissionApplication, AdmissionError> {
        self.apply_transition(actor, id, AdmissionAction::Submit, None, |record, now| {
            record.submitted_at = Some(now);
            Ok(())
        })
    }

    /// Officer takes the application under review.
    pub fn review(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        remarks: Option<String>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let note = remarks.clone();
        self.apply_transition(actor, id, AdmissionAction::Review, remarks, |record, _| {
            if note.is_some() {
                record.officer_remarks = note;
            }
            Ok(())
        })
    }

    /// Officer confirms the submitted documents.
    pub fn verify_docs(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        remarks: Option<String>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let note = remarks.clone();
        self.apply_transition(
            actor,
            id,
            AdmissionAction::VerifyDocs,
            remarks,
            |record, _| {
                if note.is_some() {
                    record.officer_remarks = note;
                }
                Ok(())
            },
        )
    }

    /// Freeze the selected fee structures into an immutable snapshot and open
    /// the payment window.
    ///
    /// The billing lock is checked before anything else: once a payment
    /// reference exists, the quote can never be silently re-priced, no matter
    /// what state the application is in.
    pub fn finalize_billing(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        selected: &[FeeStructureId],
    ) -> Result<AdmissionApplication, AdmissionError> {
        let mut record = self.fetch_required(id)?;
        if !record.fee_snapshot.is_empty() && record.payment.reference.is_some() {
            return Err(AdmissionError::BillingLocked(record.id.clone()));
        }

        let rule = lifecycle::plan(AdmissionAction::FinalizeBilling, record.status)?;
        lifecycle::check_guard(
            rule,
            actor,
            &record,
            self.collaborators.permissions.as_ref(),
        )?;

        let selectable = self
            .collaborators
            .catalog
            .selectable(&record.academic_session, &record.grade_level)?;
        let now = Utc::now();
        let items = billing::freeze_snapshot(&selectable, selected, now)?;

        let from = record.status;
        // Latest call wins: the prior snapshot set is superseded wholesale.
        record.payment.amount = billing::snapshot_total(&items);
        record.fee_snapshot = items;
        record.payment.enabled = true;
        record.status = rule.to;
        record.last_transition_at = now;
        record.updated_at = now;

        self.persist_transition(record, from, AdmissionAction::FinalizeBilling, actor, None, now)
    }

    /// Applicant attests a payment: mode, reference number, and proof.
    pub fn submit_payment(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        mode: PaymentMode,
        reference: String,
        proof: Option<PaymentProof>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        if reference.trim().is_empty() {
            return Err(AdmissionError::Validation(
                "payment submission requires a reference number".to_string(),
            ));
        }

        self.apply_transition(
            actor,
            id,
            AdmissionAction::SubmitPayment,
            None,
            |record, now| {
                record.payment.mode = Some(mode);
                record.payment.reference = Some(reference);
                record.payment.proof = proof;
                record.payment.paid_on = Some(now);
                // A resubmission clears the correction note that asked for it.
                record.finance_remarks = None;
                Ok(())
            },
        )
    }

    /// Finance renders the manual verification verdict: advance or send back
    /// one step for correction.
    pub fn verify_fee(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        verdict: FeeVerdict,
        remarks: Option<String>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let note = remarks.clone();
        match verdict {
            FeeVerdict::Verified => self.apply_transition(
                actor,
                id,
                verdict.action(),
                remarks,
                |record, _| {
                    record.payment.verified = true;
                    for item in &mut record.fee_snapshot {
                        if item.payment_status == LineItemStatus::Enabled {
                            item.payment_status = LineItemStatus::Paid;
                        }
                    }
                    if note.is_some() {
                        record.finance_remarks = note;
                    }
                    Ok(())
                },
            ),
            FeeVerdict::Correction => {
                let reason = note
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .ok_or_else(|| {
                        AdmissionError::Validation(
                            "a correction request requires a finance remark".to_string(),
                        )
                    })?
                    .to_string();
                self.apply_transition(
                    actor,
                    id,
                    verdict.action(),
                    remarks,
                    move |record, _| {
                        record.finance_remarks = Some(reason);
                        Ok(())
                    },
                )
            }
        }
    }

    /// Officer recommends the application for head-of-institution sign-off.
    pub fn recommend(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        remarks: Option<String>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let note = remarks.clone();
        self.apply_transition(
            actor,
            id,
            AdmissionAction::Recommend,
            remarks,
            |record, now| {
                record.recommended_at = Some(now);
                if note.is_some() {
                    record.officer_remarks = note;
                }
                Ok(())
            },
        )
    }

    /// Head of institution approves the recommendation.
    pub fn approve(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        remarks: Option<String>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let note = remarks.clone();
        self.apply_transition(
            actor,
            id,
            AdmissionAction::Approve,
            remarks,
            |record, now| {
                record.approved_at = Some(now);
                if note.is_some() {
                    record.head_remarks = note;
                }
                Ok(())
            },
        )
    }

    /// Reject with a mandatory, non-empty reason.
    pub fn reject(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        reason: &str,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AdmissionError::Validation(
                "rejection requires a non-empty reason".to_string(),
            ));
        }

        let reason = reason.to_string();
        let audit_note = Some(reason.clone());
        self.apply_transition(
            actor,
            id,
            AdmissionAction::Reject,
            audit_note,
            move |record, now| {
                record.rejection_reason = Some(reason);
                record.rejected_at = Some(now);
                Ok(())
            },
        )
    }

    /// Convert the approved application into an enrolled student record.
    ///
    /// The applicant's login must already be approved, and the downstream
    /// provisioner call happens before any state change: if it fails, the
    /// application stays `approved`.
    pub fn enrol(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<AdmissionApplication, AdmissionError> {
        self.apply_transition(actor, id, AdmissionAction::Enrol, None, |record, _| {
            let login = self
                .collaborators
                .directory
                .login_status(&record.applicant_id)?;
            if login != LoginStatus::Approved {
                return Err(AdmissionError::Validation(format!(
                    "applicant login must be approved before enrolment (currently '{}')",
                    login.label()
                )));
            }

            let student = self
                .collaborators
                .provisioner
                .create_student_record(record)?;
            info!(application = %record.id, student = %student.0, "student record provisioned");
            Ok(())
        })
    }

    /// Operator error-correction: reopen a rejected application.
    pub fn revoke(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        remarks: Option<String>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        let note = remarks.clone();
        self.apply_transition(actor, id, AdmissionAction::Revoke, remarks, |record, _| {
            record.rejection_reason = None;
            record.rejected_at = None;
            if note.is_some() {
                record.officer_remarks = note;
            }
            Ok(())
        })
    }

    /// Apply one action to many applications, sequentially and in input
    /// order. One item's failure never aborts the batch; the outcome carries
    /// per-item bookkeeping only.
    pub fn batch_apply(
        &self,
        actor: &Actor,
        action: &str,
        ids: &[ApplicationId],
        remarks: Option<String>,
    ) -> Result<BatchOutcome, AdmissionError> {
        let action: BatchAction = action
            .parse()
            .map_err(|err: super::batch::UnknownBatchAction| {
                AdmissionError::Validation(err.to_string())
            })?;
        if ids.is_empty() {
            return Err(AdmissionError::Validation(
                "batch requires at least one application id".to_string(),
            ));
        }

        let mut succeeded = 0;
        let mut failed = Vec::new();
        for id in ids {
            let result = match action {
                BatchAction::Review => self.review(actor, id, remarks.clone()),
                BatchAction::VerifyDocs => self.verify_docs(actor, id, remarks.clone()),
                BatchAction::Recommend => self.recommend(actor, id, remarks.clone()),
                BatchAction::Approve => self.approve(actor, id, remarks.clone()),
                BatchAction::Reject => self.reject(actor, id, remarks.as_deref().unwrap_or("")),
                BatchAction::Enrol => self.enrol(actor, id),
                BatchAction::Revoke => self.revoke(actor, id, remarks.clone()),
            };
            match result {
                Ok(_) => succeeded += 1,
                Err(error) => {
                    warn!(application = %id, action = action.wire_name(), %error, "batch item failed");
                    failed.push(id.clone());
                }
            }
        }

        Ok(BatchOutcome { succeeded, failed })
    }

    /// Fetch an application for API responses.
    pub fn get(&self, id: &ApplicationId) -> Result<AdmissionApplication, AdmissionError> {
        self.fetch_required(id)
    }

    /// Classify one application's dwell time against its status budget.
    pub fn aging(
        &self,
        id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<AgingProfile, AdmissionError> {
        let record = self.fetch_required(id)?;
        Ok(classify(record.status, record.last_transition_at, now))
    }

    /// Bulk aging sweep over a set of ids. Unknown ids are skipped; the sweep
    /// serves dashboards, not integrity checks.
    pub fn aging_bulk(
        &self,
        ids: &[ApplicationId],
        now: DateTime<Utc>,
    ) -> Result<Vec<ApplicationAging>, AdmissionError> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.repository.fetch(id)? {
                rows.push(ApplicationAging {
                    application_id: record.id.clone(),
                    status: record.status,
                    profile: classify(record.status, record.last_transition_at, now),
                });
            }
        }
        Ok(rows)
    }

    /// Ordered audit trail for one application, filtered for the viewer.
    pub fn list_audit_log(
        &self,
        id: &ApplicationId,
        viewer_is_staff: bool,
    ) -> Result<Vec<AuditEntry>, AdmissionError> {
        let entries = self.audit.entries_for(id)?;
        Ok(visible_entries(entries, viewer_is_staff))
    }

    /// Structural funnel over every non-draft application.
    pub fn funnel(&self) -> Result<FunnelReport, AdmissionError> {
        let applications = self.repository.list()?;
        Ok(super::funnel::build(&applications))
    }

    fn fetch_required(&self, id: &ApplicationId) -> Result<AdmissionApplication, AdmissionError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| AdmissionError::NotFound(id.clone()))
    }

    /// Shared single-item transition path: plan against the table, enforce
    /// the guard, apply the action's mutations, then persist atomically.
    fn apply_transition<F>(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        action: AdmissionAction,
        remarks: Option<String>,
        mutate: F,
    ) -> Result<AdmissionApplication, AdmissionError>
    where
        F: FnOnce(&mut AdmissionApplication, DateTime<Utc>) -> Result<(), AdmissionError>,
    {
        let mut record = self.fetch_required(id)?;
        let rule = lifecycle::plan(action, record.status)?;
        lifecycle::check_guard(
            rule,
            actor,
            &record,
            self.collaborators.permissions.as_ref(),
        )?;

        let from = record.status;
        let now = Utc::now();
        mutate(&mut record, now)?;
        record.status = rule.to;
        record.last_transition_at = now;
        record.updated_at = now;

        self.persist_transition(record, from, action, actor, remarks, now)
    }

    /// Optimistic write plus the audit append; one logical unit per
    /// transition. The notification afterwards is best-effort.
    fn persist_transition(
        &self,
        record: AdmissionApplication,
        from: AdmissionStatus,
        action: AdmissionAction,
        actor: &Actor,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AdmissionApplication, AdmissionError> {
        self.repository
            .update(record.clone(), from)
            .map_err(|err| match err {
                RepositoryError::Conflict { found } => AdmissionError::Conflict {
                    id: record.id.clone(),
                    expected: from,
                    found,
                },
                other => AdmissionError::Repository(other),
            })?;

        self.audit.append(AuditEntry {
            application_id: record.id.clone(),
            action: action.audit_action(),
            performed_by: actor.audit_label(),
            remarks,
            created_at: now,
        })?;

        if let Err(error) = self
            .collaborators
            .notifier
            .notify(&record.id, action.audit_action())
        {
            warn!(application = %record.id, action = action.wire_name(), %error, "notification dispatch failed");
        }

        Ok(record)
    }
}
