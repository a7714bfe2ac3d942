pub mod memory;

pub use memory::MemoryStore;

use crate::decimal::Money;
use crate::errors::Result;
use crate::records::{Installment, Loan, Payment, Penalty};
use crate::types::{LoanId, LoanStatus};

/// durable record store for loans, installments, payments and penalties
///
/// Records are keyed by loan id, plus installment number where applicable.
/// Ordered reads return rows sorted by installment number. Implementations
/// must provide read-after-write consistency inside a `transaction` closure.
pub trait LoanStore {
    // loans
    fn insert_loan(&mut self, loan: &Loan) -> Result<()>;
    fn loan(&self, id: LoanId) -> Result<Option<Loan>>;
    fn loans_for_client(&self, client_id: &str) -> Result<Vec<Loan>>;
    /// set the loan's outstanding principal balance
    fn set_outstanding_balance(&mut self, id: LoanId, balance: Money) -> Result<()>;
    /// set the loan's aggregate status
    fn set_status(&mut self, id: LoanId, status: LoanStatus) -> Result<()>;

    // installments
    fn insert_installments(&mut self, installments: &[Installment]) -> Result<()>;
    fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>>;
    fn installment(&self, loan_id: LoanId, number: u32) -> Result<Option<Installment>>;

    // payments
    fn insert_payment(&mut self, payment: &Payment) -> Result<()>;
    fn payments(&self, loan_id: LoanId) -> Result<Vec<Payment>>;
    fn payment(&self, loan_id: LoanId, number: u32) -> Result<Option<Payment>>;

    // penalties
    fn insert_penalty(&mut self, penalty: &Penalty) -> Result<()>;
    fn penalties(&self, loan_id: LoanId) -> Result<Vec<Penalty>>;
    fn penalty(&self, loan_id: LoanId, number: u32) -> Result<Option<Penalty>>;

    /// run `op` as one atomic unit
    ///
    /// Every write performed inside the closure commits iff the closure
    /// returns `Ok`; on `Err` (including a storage failure mid-protocol) all
    /// of its writes are rolled back and the error is surfaced unchanged.
    /// There is no partial-commit path.
    fn transaction<T, F>(&mut self, op: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}
