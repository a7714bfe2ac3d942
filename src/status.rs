use std::collections::HashSet;

use chrono::NaiveDate;

use crate::records::{Installment, Payment};
use crate::types::LoanStatus;

/// derive a loan's aggregate status from the current state of its
/// installments and payments
///
/// Recomputed from scratch on every call rather than incrementally: settled
/// iff every installment has a payment (terminal), in-default iff any unpaid
/// installment's due date is strictly before `as_of`, active otherwise. A
/// previously-defaulted loan therefore reads active again once no unpaid
/// installment remains past due.
pub fn derive_status(
    installments: &[Installment],
    payments: &[Payment],
    as_of: NaiveDate,
) -> LoanStatus {
    let paid: HashSet<u32> = payments.iter().map(|p| p.installment_number).collect();

    if !installments.is_empty() && installments.iter().all(|c| paid.contains(&c.number)) {
        return LoanStatus::Settled;
    }

    let any_past_due = installments
        .iter()
        .any(|c| !paid.contains(&c.number) && c.is_past_due(as_of));

    if any_past_due {
        LoanStatus::InDefault
    } else {
        LoanStatus::Active
    }
}
