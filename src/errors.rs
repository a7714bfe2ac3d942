use thiserror::Error;

use crate::decimal::Money;
use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid schedule input: {message}")]
    InvalidScheduleInput {
        message: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("installment {number} not found for loan {loan_id}")]
    InstallmentNotFound {
        loan_id: LoanId,
        number: u32,
    },

    #[error("installment {number} of loan {loan_id} is already paid")]
    AlreadyPaid {
        loan_id: LoanId,
        number: u32,
    },

    #[error("schedule does not amortize to zero: residual {residual}")]
    ScheduleResidual {
        residual: Money,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
