use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::records::Installment;
use crate::types::LoanId;

/// significant precision kept when inverting (1+r)^n
const RECIPROCAL_SCALE: u32 = 10;

/// generate the full installment schedule for a loan
/// (French / constant-payment method)
///
/// Due dates fall on `start_date + i months`, i in 1..=term. The last
/// installment's principal portion absorbs all residual rounding drift so the
/// schedule amortizes to exactly zero; a non-zero residual after the last
/// installment is an arithmetic defect and fails the whole generation.
pub fn generate_schedule(
    loan_id: LoanId,
    principal: Money,
    annual_rate: Rate,
    term_months: u32,
    start_date: NaiveDate,
) -> Result<Vec<Installment>> {
    if !principal.is_positive() {
        return Err(LedgerError::InvalidScheduleInput {
            message: format!("principal must be positive, got {}", principal),
        });
    }
    if annual_rate.is_negative() {
        return Err(LedgerError::InvalidScheduleInput {
            message: format!("annual rate must not be negative, got {}", annual_rate),
        });
    }
    if term_months == 0 {
        return Err(LedgerError::InvalidScheduleInput {
            message: "term must be at least one installment".to_string(),
        });
    }

    let monthly = annual_rate.monthly_factor();
    let fixed_amount = constant_installment(principal, monthly, term_months);

    let mut installments = Vec::with_capacity(term_months as usize);
    let mut outstanding = principal;

    for number in 1..=term_months {
        let interest = Money::from_decimal(outstanding.as_decimal() * monthly);

        let (amount, principal_portion) = if number == term_months {
            // last installment: amortize the whole remaining balance and
            // recompute the total from the forced principal portion
            (outstanding + interest, outstanding)
        } else {
            (fixed_amount, fixed_amount - interest)
        };

        outstanding -= principal_portion;

        let due_date = start_date
            .checked_add_months(Months::new(number))
            .ok_or_else(|| LedgerError::InvalidDate {
                message: format!("due date overflows {} + {} months", start_date, number),
            })?;

        installments.push(Installment {
            loan_id,
            number,
            amount,
            rate_applied: annual_rate,
            due_date,
            principal_portion,
        });
    }

    if !outstanding.is_zero() {
        return Err(LedgerError::ScheduleResidual {
            residual: outstanding,
        });
    }

    Ok(installments)
}

/// constant installment amount: A = P * r / (1 - (1+r)^-n)
///
/// (1+r)^n is carried at full decimal precision; its reciprocal is taken at
/// 10 fractional digits before entering the quotient.
fn constant_installment(principal: Money, monthly: Decimal, term_months: u32) -> Money {
    if monthly.is_zero() {
        return Money::from_decimal(principal.as_decimal() / Decimal::from(term_months));
    }

    let base = Decimal::ONE + monthly;
    let mut compounded = Decimal::ONE;
    for _ in 0..term_months {
        compounded *= base;
    }

    let reciprocal = (Decimal::ONE / compounded)
        .round_dp_with_strategy(RECIPROCAL_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let factor = Decimal::ONE - reciprocal;

    Money::from_decimal(principal.as_decimal() * monthly / factor)
}
