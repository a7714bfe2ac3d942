use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{LoanCategory, LoanId, LoanStatus};

/// loan record
///
/// Created once at origination. Only `outstanding_balance` and `status` change
/// afterwards, and only through the payment ledger / status resolver path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub client_id: String,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub category: LoanCategory,
    pub created_on: NaiveDate,
    pub outstanding_balance: Money,
    pub status: LoanStatus,
}

impl Loan {
    /// new loan at origination: balance equals principal, status is active
    pub fn new(
        id: LoanId,
        client_id: String,
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        category: LoanCategory,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            client_id,
            principal,
            annual_rate,
            term_months,
            category,
            created_on,
            outstanding_balance: principal,
            status: LoanStatus::Active,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == LoanStatus::Settled
    }
}

/// one scheduled repayment of a loan
///
/// Immutable once created; the full set is generated atomically at
/// origination and never regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub loan_id: LoanId,
    /// 1..=term, unique per loan
    pub number: u32,
    /// total amount due (principal portion + interest portion)
    pub amount: Money,
    /// annual nominal rate frozen at schedule generation
    pub rate_applied: Rate,
    pub due_date: NaiveDate,
    /// portion of `amount` that reduces outstanding principal
    pub principal_portion: Money,
}

impl Installment {
    /// an installment is overdue when its due date is strictly before `as_of`
    /// and no payment exists for it; the payment check is the caller's
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        self.due_date < as_of
    }

    /// interest portion implied by the frozen split
    pub fn interest_portion(&self) -> Money {
        self.amount - self.principal_portion
    }
}

/// payment against one installment; at most one per installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub loan_id: LoanId,
    pub installment_number: u32,
    /// installment amount plus any penalty settled with it
    pub amount: Money,
    pub paid_on: NaiveDate,
}

/// one-time late fee on an overdue installment; at most one per installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub loan_id: LoanId,
    pub installment_number: u32,
    pub amount: Money,
    pub applied_on: NaiveDate,
}
