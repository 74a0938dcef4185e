use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{FeeLineItem, FeeStructure, FeeStructureId, LineItemStatus};
use super::lifecycle::AdmissionError;

/// Freeze the chosen master rows into immutable snapshot line items.
///
/// Mandatory rows are force-included regardless of the caller's selection;
/// optional rows are included only when selected. A selected id that is not
/// in the selectable set is a validation error rather than being silently
/// dropped.
pub fn freeze_snapshot(
    selectable: &[FeeStructure],
    selected: &[FeeStructureId],
    now: DateTime<Utc>,
) -> Result<Vec<FeeLineItem>, AdmissionError> {
    let known: BTreeSet<&FeeStructureId> = selectable.iter().map(|row| &row.id).collect();
    if let Some(unknown) = selected.iter().find(|id| !known.contains(id)) {
        return Err(AdmissionError::Validation(format!(
            "fee structure '{}' is not selectable for this application",
            unknown.0
        )));
    }

    let chosen: BTreeSet<&FeeStructureId> = selected.iter().collect();
    let items: Vec<FeeLineItem> = selectable
        .iter()
        .filter(|row| row.mandatory || chosen.contains(&row.id))
        .map(|row| FeeLineItem {
            structure_id: row.id.clone(),
            name: row.name.clone(),
            amount: row.amount,
            category: row.category,
            mandatory: row.mandatory,
            payment_status: LineItemStatus::Enabled,
            enabled_at: now,
            created_at: now,
        })
        .collect();

    if items.is_empty() {
        return Err(AdmissionError::Validation(
            "billing requires at least one fee line item".to_string(),
        ));
    }

    Ok(items)
}

/// Sum of the non-voided line items; this is what the applicant owes.
pub fn snapshot_total(items: &[FeeLineItem]) -> Decimal {
    items
        .iter()
        .filter(|item| item.payment_status != LineItemStatus::Voided)
        .map(|item| item.amount)
        .sum()
}
