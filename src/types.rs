use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// loan product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanCategory {
    Personal,
    Mortgage,
}

/// aggregate loan status, derived from the state of its installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// performing, no unpaid installment past due
    Active,
    /// at least one unpaid installment past its due date
    InDefault,
    /// every installment paid; terminal
    Settled,
}

impl LoanStatus {
    /// settled loans accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Settled)
    }
}
