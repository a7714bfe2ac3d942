use std::collections::{BTreeMap, HashMap};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::records::{Installment, Loan, Payment, Penalty};
use crate::store::LoanStore;
use crate::types::{LoanId, LoanStatus};

/// in-memory reference store
///
/// Used by the test suite and by embedders that do not bring their own
/// backend. `transaction` snapshots the maps and restores them wholesale when
/// the closure fails, which satisfies the all-or-nothing contract at this
/// scale.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    loans: HashMap<LoanId, Loan>,
    installments: BTreeMap<(LoanId, u32), Installment>,
    payments: BTreeMap<(LoanId, u32), Payment>,
    penalties: BTreeMap<(LoanId, u32), Penalty>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan> {
        self.loans
            .get_mut(&id)
            .ok_or(LedgerError::LoanNotFound { id })
    }

    fn rows_for<'a, T: Clone>(
        map: &'a BTreeMap<(LoanId, u32), T>,
        loan_id: LoanId,
    ) -> impl Iterator<Item = &'a T> {
        map.range((loan_id, 0)..=(loan_id, u32::MAX)).map(|(_, v)| v)
    }
}

impl LoanStore for MemoryStore {
    fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        if self.loans.contains_key(&loan.id) {
            return Err(LedgerError::Storage {
                message: format!("loan {} already exists", loan.id),
            });
        }
        self.loans.insert(loan.id, loan.clone());
        Ok(())
    }

    fn loan(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.loans.get(&id).cloned())
    }

    fn loans_for_client(&self, client_id: &str) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans
            .values()
            .filter(|l| l.client_id == client_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| (l.created_on, l.id));
        Ok(loans)
    }

    fn set_outstanding_balance(&mut self, id: LoanId, balance: Money) -> Result<()> {
        self.loan_mut(id)?.outstanding_balance = balance;
        Ok(())
    }

    fn set_status(&mut self, id: LoanId, status: LoanStatus) -> Result<()> {
        self.loan_mut(id)?.status = status;
        Ok(())
    }

    fn insert_installments(&mut self, installments: &[Installment]) -> Result<()> {
        for installment in installments {
            let key = (installment.loan_id, installment.number);
            if self.installments.contains_key(&key) {
                return Err(LedgerError::Storage {
                    message: format!(
                        "installment {} already exists for loan {}",
                        installment.number, installment.loan_id
                    ),
                });
            }
            self.installments.insert(key, installment.clone());
        }
        Ok(())
    }

    fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        Ok(Self::rows_for(&self.installments, loan_id).cloned().collect())
    }

    fn installment(&self, loan_id: LoanId, number: u32) -> Result<Option<Installment>> {
        Ok(self.installments.get(&(loan_id, number)).cloned())
    }

    fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        let key = (payment.loan_id, payment.installment_number);
        if self.payments.contains_key(&key) {
            return Err(LedgerError::AlreadyPaid {
                loan_id: payment.loan_id,
                number: payment.installment_number,
            });
        }
        self.payments.insert(key, payment.clone());
        Ok(())
    }

    fn payments(&self, loan_id: LoanId) -> Result<Vec<Payment>> {
        Ok(Self::rows_for(&self.payments, loan_id).cloned().collect())
    }

    fn payment(&self, loan_id: LoanId, number: u32) -> Result<Option<Payment>> {
        Ok(self.payments.get(&(loan_id, number)).cloned())
    }

    fn insert_penalty(&mut self, penalty: &Penalty) -> Result<()> {
        let key = (penalty.loan_id, penalty.installment_number);
        if self.penalties.contains_key(&key) {
            return Err(LedgerError::Storage {
                message: format!(
                    "penalty already applied to installment {} of loan {}",
                    penalty.installment_number, penalty.loan_id
                ),
            });
        }
        self.penalties.insert(key, penalty.clone());
        Ok(())
    }

    fn penalties(&self, loan_id: LoanId) -> Result<Vec<Penalty>> {
        Ok(Self::rows_for(&self.penalties, loan_id).cloned().collect())
    }

    fn penalty(&self, loan_id: LoanId, number: u32) -> Result<Option<Penalty>> {
        Ok(self.penalties.get(&(loan_id, number)).cloned())
    }

    fn transaction<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.clone();
        match op(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }
}
