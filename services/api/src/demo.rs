use std::sync::Arc;

use crate::infra::{
    default_collaborators, InMemoryApplicationRepository, InMemoryAuditLog, InMemoryProofStorage,
};
use admissions::error::AppError;
use admissions::workflows::admission::{
    AdmissionService, AdmissionStatus, Actor, ApplicantId, ApplicationId, ApplicationIntake,
    FeeVerdict, GuardianContact, PaymentMode, PaymentProof, ProofStorage, StaffId, StudentProfile,
};
use chrono::{NaiveDate, Utc};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of extra cohort applications used for the batch and funnel output
    #[arg(long, default_value_t = 5)]
    pub(crate) cohort: usize,
    /// Skip the batch-processing portion of the demo
    #[arg(long)]
    pub(crate) skip_batch: bool,
}

fn demo_intake(index: usize) -> ApplicationIntake {
    ApplicationIntake {
        school_code: "GHS".to_string(),
        academic_session: "2026-27".to_string(),
        grade_level: "grade-4".to_string(),
        applicant_id: ApplicantId(format!("guardian-demo-{index}")),
        student: StudentProfile {
            first_name: format!("Student{index}"),
            last_name: "Demo".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2017, 6, 1).expect("valid date"),
            prior_school: None,
        },
        guardian: GuardianContact {
            name: format!("Guardian {index}"),
            relationship: "father".to_string(),
            phone: format!("+91-90000-000{index:02}"),
            email: format!("guardian{index}@example.com"),
        },
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = AdmissionService::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        default_collaborators(),
    );
    let storage = InMemoryProofStorage::default();

    let applicant = Actor::Applicant(ApplicantId("guardian-demo-0".to_string()));
    let officer = Actor::Staff(StaffId("officer-01".to_string()));
    let finance = Actor::Staff(StaffId("finance-01".to_string()));
    let head = Actor::Staff(StaffId("head-01".to_string()));
    let registrar = Actor::Staff(StaffId("registrar-01".to_string()));

    println!("Admission pipeline demo");
    println!("=======================");

    let draft = service.create_draft(demo_intake(0))?;
    println!("opened {} in '{}'", draft.id.0, draft.status.label());

    let record = service.submit(&applicant, &draft.id)?;
    println!("submitted -> '{}'", record.status.label());

    service.review(&officer, &draft.id, Some("forms complete".to_string()))?;
    let record = service.verify_docs(&officer, &draft.id, None)?;
    println!("documents verified -> '{}'", record.status.label());

    let record = service.finalize_billing(&officer, &draft.id, &[])?;
    println!(
        "billing finalized -> '{}' (total {})",
        record.status.label(),
        record.payment.amount
    );
    for item in &record.fee_snapshot {
        println!("  {:<18} {:>10}  [{}]", item.name, item.amount, item.category.label());
    }

    let proof_key = storage
        .upload(b"demo payment receipt")
        .map_err(admissions::workflows::admission::AdmissionError::from)?;
    let proof_url = storage
        .resolve(&proof_key)
        .map_err(admissions::workflows::admission::AdmissionError::from)?;
    let record = service.submit_payment(
        &applicant,
        &draft.id,
        PaymentMode::BankTransfer,
        "TXN-DEMO-0001".to_string(),
        Some(PaymentProof::Stored(proof_key)),
    )?;
    println!(
        "payment attested via {} -> '{}' (proof at {proof_url})",
        record
            .payment
            .mode
            .map(|mode| mode.label())
            .unwrap_or("unknown"),
        record.status.label()
    );

    // Re-billing after the payment reference exists must be refused.
    match service.finalize_billing(&officer, &draft.id, &[]) {
        Err(error) => println!("re-billing refused as expected: {error}"),
        Ok(_) => println!("warning: billing lock did not hold"),
    }

    service.verify_fee(&finance, &draft.id, FeeVerdict::Verified, None)?;
    service.recommend(&officer, &draft.id, Some("meets criteria".to_string()))?;
    service.approve(&head, &draft.id, None)?;
    let record = service.enrol(&registrar, &draft.id)?;
    println!("enrolled -> '{}'", record.status.label());

    println!("\nAudit trail (staff view)");
    for entry in service.list_audit_log(&draft.id, true)? {
        println!(
            "  {} {} by {}{}",
            entry.created_at.format("%H:%M:%S"),
            entry.action.label(),
            entry.performed_by,
            entry
                .remarks
                .map(|remarks| format!(" ({remarks})"))
                .unwrap_or_default()
        );
    }
    println!("Audit trail (applicant view)");
    for entry in service.list_audit_log(&draft.id, false)? {
        println!("  {}", entry.action.label());
    }

    if !args.skip_batch {
        println!("\nBatch processing {} cohort applications", args.cohort);
        let mut ids: Vec<ApplicationId> = Vec::new();
        for index in 1..=args.cohort {
            let cohort_applicant = Actor::Applicant(ApplicantId(format!("guardian-demo-{index}")));
            let draft = service.create_draft(demo_intake(index))?;
            // Leave the last one unsubmitted so the batch has a failure to report.
            if index != args.cohort {
                service.submit(&cohort_applicant, &draft.id)?;
            }
            ids.push(draft.id);
        }

        let outcome = service.batch_apply(&officer, "review", &ids, None)?;
        println!(
            "batch review: {} succeeded, {} failed {:?}",
            outcome.succeeded,
            outcome.failed.len(),
            outcome
                .failed
                .iter()
                .map(|id| id.0.as_str())
                .collect::<Vec<_>>()
        );
    }

    println!("\nFunnel");
    let report = service.funnel()?;
    println!(
        "{} in pipeline, {} enrolled, conversion {:.1}%",
        report.total,
        report.enrolled,
        report.conversion_rate * 100.0
    );
    for stage in &report.stages {
        println!(
            "  {:<18} reached {:>3}  at stage {:>3}  drop-off {:>5.1}%",
            stage.stage_label, stage.reached, stage.at_stage, stage.drop_off_pct
        );
    }

    println!("\nAging sweep");
    for row in service.aging_bulk(&[draft.id.clone()], Utc::now())? {
        println!(
            "  {} [{}] {}h elapsed of {}h budget -> {}",
            row.application_id.0,
            row.status.label(),
            row.profile.elapsed_hours,
            row.profile.sla_hours,
            row.profile.state.label()
        );
    }

    if record.status == AdmissionStatus::Enrolled {
        println!("\ndemo complete");
    }

    Ok(())
}
