use std::collections::HashSet;

use chrono::{Months, NaiveDate};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::penalty::{PenaltyConfig, PenaltyEngine};
use crate::records::{Installment, Loan, Payment, Penalty};
use crate::schedule::generate_schedule;
use crate::status::derive_status;
use crate::store::LoanStore;
use crate::types::{LoanCategory, LoanId, LoanStatus};

/// inputs for loan origination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginationRequest {
    pub client_id: String,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub category: LoanCategory,
    pub start_date: NaiveDate,
}

/// result of a registered payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub loan_id: LoanId,
    pub installment_number: u32,
    /// installment amount plus any penalty settled with it
    pub amount_paid: Money,
    pub penalty: Money,
    pub paid_on: NaiveDate,
    pub outstanding_balance: Money,
    pub status: LoanStatus,
}

/// an unpaid installment annotated with its applicable penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInstallment {
    pub installment: Installment,
    /// zero unless the installment is overdue
    pub penalty: Money,
}

impl PendingInstallment {
    /// amount that settles this installment today
    pub fn total_due(&self) -> Money {
        self.installment.amount + self.penalty
    }
}

/// unpaid installments of a loan, partitioned by due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInstallments {
    pub overdue: Vec<PendingInstallment>,
    pub upcoming: Vec<PendingInstallment>,
}

impl PendingInstallments {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.upcoming.is_empty()
    }

    pub fn count(&self) -> usize {
        self.overdue.len() + self.upcoming.len()
    }

    /// sum of all pending installment amounts plus penalties on overdue ones
    pub fn total_pending(&self) -> Money {
        self.overdue
            .iter()
            .chain(self.upcoming.iter())
            .map(|p| p.total_due())
            .fold(Money::ZERO, |acc, x| acc + x)
    }
}

/// a payment joined with the penalty settled alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub payment: Payment,
    pub penalty: Money,
}

/// aggregate view of one loan as of a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatement {
    pub loan_id: LoanId,
    pub client_id: String,
    pub category: LoanCategory,
    pub status: LoanStatus,
    pub principal: Money,
    pub term_months: u32,
    pub paid_count: u32,
    pub pending_count: u32,
    pub overdue: Vec<PendingInstallment>,
    /// all penalties ever applied, including ones already settled
    pub total_penalties: Money,
    /// remaining capital only
    pub outstanding_balance: Money,
    /// capital, interest and penalties across pending installments
    pub total_pending: Money,
    pub as_of: NaiveDate,
}

impl LoanStatement {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// expected inflow from unpaid installments due within a horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivableProjection {
    pub from: NaiveDate,
    pub horizon_end: NaiveDate,
    pub installments: Vec<Installment>,
    pub total: Money,
}

struct PaymentOutcome {
    receipt: PaymentReceipt,
    penalty_created: Option<Penalty>,
    old_status: LoanStatus,
}

/// loan servicing engine over a transactional record store
///
/// The store is the single source of truth; the ledger never caches balances
/// or statuses between operations. Balance and status are only written from
/// inside `register_payment`'s transaction.
pub struct LoanLedger<S: LoanStore> {
    store: S,
    penalties: PenaltyEngine,
    events: EventStore,
}

impl<S: LoanStore> LoanLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_penalty_config(store, PenaltyConfig::default())
    }

    pub fn with_penalty_config(store: S, config: PenaltyConfig) -> Self {
        Self {
            store,
            penalties: PenaltyEngine::new(config),
            events: EventStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// get events emitted since the last take
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// originate a loan: validate, generate the schedule and persist loan
    /// plus installments as one atomic unit
    pub fn originate_loan(&mut self, request: OriginationRequest) -> Result<Loan> {
        let loan_id = Uuid::new_v4();

        // input validation happens here, before any state is touched
        let installments = generate_schedule(
            loan_id,
            request.principal,
            request.annual_rate,
            request.term_months,
            request.start_date,
        )?;

        let loan = Loan::new(
            loan_id,
            request.client_id.clone(),
            request.principal,
            request.annual_rate,
            request.term_months,
            request.category,
            request.start_date,
        );

        self.store.transaction(|tx| {
            tx.insert_loan(&loan)?;
            tx.insert_installments(&installments)
        })?;

        info!(
            "originated loan {} for client {}: {} over {} installments",
            loan_id, request.client_id, request.principal, request.term_months
        );
        self.events.emit(Event::LoanOriginated {
            loan_id,
            client_id: request.client_id,
            principal: request.principal,
            term_months: request.term_months,
            created_on: request.start_date,
        });

        Ok(loan)
    }

    /// fetch a loan
    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .loan(loan_id)?
            .ok_or(LedgerError::LoanNotFound { id: loan_id })
    }

    /// all loans belonging to a client
    pub fn loans_for_client(&self, client_id: &str) -> Result<Vec<Loan>> {
        self.store.loans_for_client(client_id)
    }

    /// the frozen installment schedule of a loan
    pub fn schedule(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        self.loan(loan_id)?;
        self.store.installments(loan_id)
    }

    /// register a payment against one installment
    ///
    /// Runs the whole protocol as one transaction: reject if already paid,
    /// resolve the installment, settle any late penalty (idempotent), insert
    /// the payment, reduce the balance by the installment's frozen principal
    /// portion and re-derive the loan status. When the final installment is
    /// paid the balance is forced to exactly zero and the loan settles.
    pub fn register_payment(
        &mut self,
        loan_id: LoanId,
        installment_number: u32,
        paid_on: NaiveDate,
    ) -> Result<PaymentReceipt> {
        let engine = &self.penalties;
        let outcome = self.store.transaction(|tx| {
            let loan = tx
                .loan(loan_id)?
                .ok_or(LedgerError::LoanNotFound { id: loan_id })?;

            if tx.payment(loan_id, installment_number)?.is_some() {
                return Err(LedgerError::AlreadyPaid {
                    loan_id,
                    number: installment_number,
                });
            }

            let installment = tx
                .installment(loan_id, installment_number)?
                .ok_or(LedgerError::InstallmentNotFound {
                    loan_id,
                    number: installment_number,
                })?;

            // settle the late fee before recording the payment; at most one
            // penalty ever exists per installment
            let (penalty, penalty_created) = if installment.is_past_due(paid_on) {
                match tx.penalty(loan_id, installment_number)? {
                    Some(existing) => (existing.amount, None),
                    None => {
                        let record = Penalty {
                            loan_id,
                            installment_number,
                            amount: engine.assess(&installment),
                            applied_on: paid_on,
                        };
                        tx.insert_penalty(&record)?;
                        (record.amount, Some(record))
                    }
                }
            } else {
                (Money::ZERO, None)
            };

            let amount_paid = installment.amount + penalty;
            tx.insert_payment(&Payment {
                loan_id,
                installment_number,
                amount: amount_paid,
                paid_on,
            })?;

            // interest and penalty never reduce principal
            let mut balance = loan.outstanding_balance - installment.principal_portion;

            let payments = tx.payments(loan_id)?;
            let status = if payments.len() as u32 == loan.term_months {
                // final installment: absorb any residual rounding drift
                balance = Money::ZERO;
                LoanStatus::Settled
            } else {
                let installments = tx.installments(loan_id)?;
                derive_status(&installments, &payments, paid_on)
            };

            tx.set_outstanding_balance(loan_id, balance)?;
            tx.set_status(loan_id, status)?;

            Ok(PaymentOutcome {
                receipt: PaymentReceipt {
                    loan_id,
                    installment_number,
                    amount_paid,
                    penalty,
                    paid_on,
                    outstanding_balance: balance,
                    status,
                },
                penalty_created,
                old_status: loan.status,
            })
        })?;

        if let Some(record) = &outcome.penalty_created {
            debug!(
                "penalty {} applied to installment {} of loan {}",
                record.amount, installment_number, loan_id
            );
            self.events.emit(Event::PenaltyApplied {
                loan_id,
                installment_number,
                amount: record.amount,
                applied_on: record.applied_on,
            });
        }

        info!(
            "payment {} registered for installment {} of loan {}",
            outcome.receipt.amount_paid, installment_number, loan_id
        );
        self.events.emit(Event::PaymentRegistered {
            loan_id,
            installment_number,
            amount: outcome.receipt.amount_paid,
            penalty: outcome.receipt.penalty,
            paid_on,
        });

        if outcome.old_status != outcome.receipt.status {
            self.events.emit(Event::StatusChanged {
                loan_id,
                old_status: outcome.old_status,
                new_status: outcome.receipt.status,
            });
        }
        if outcome.receipt.status == LoanStatus::Settled {
            info!("loan {} fully settled", loan_id);
            self.events.emit(Event::LoanSettled {
                loan_id,
                settled_on: paid_on,
            });
        }

        Ok(outcome.receipt)
    }

    /// register a payment dated with the system clock
    pub fn register_payment_now(
        &mut self,
        loan_id: LoanId,
        installment_number: u32,
    ) -> Result<PaymentReceipt> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.register_payment(loan_id, installment_number, time.now().date_naive())
    }

    /// apply the one-time late fee to an overdue unpaid installment
    ///
    /// Returns the fee amount, or zero when nothing is due. Re-applying is a
    /// no-op that returns the previously stored amount; the stored penalty
    /// never changes no matter how much further time elapses.
    pub fn apply_penalty_if_overdue(
        &mut self,
        loan_id: LoanId,
        installment_number: u32,
        as_of: NaiveDate,
    ) -> Result<Money> {
        let engine = &self.penalties;
        let (amount, created) = self.store.transaction(|tx| {
            tx.loan(loan_id)?
                .ok_or(LedgerError::LoanNotFound { id: loan_id })?;

            let installment = tx
                .installment(loan_id, installment_number)?
                .ok_or(LedgerError::InstallmentNotFound {
                    loan_id,
                    number: installment_number,
                })?;

            let already_paid = tx.payment(loan_id, installment_number)?.is_some();
            if already_paid || !installment.is_past_due(as_of) {
                return Ok((Money::ZERO, None));
            }

            match tx.penalty(loan_id, installment_number)? {
                Some(existing) => Ok((existing.amount, None)),
                None => {
                    let record = Penalty {
                        loan_id,
                        installment_number,
                        amount: engine.assess(&installment),
                        applied_on: as_of,
                    };
                    tx.insert_penalty(&record)?;
                    let amount = record.amount;
                    Ok((amount, Some(record)))
                }
            }
        })?;

        if let Some(record) = created {
            debug!(
                "penalty {} applied to installment {} of loan {}",
                record.amount, installment_number, loan_id
            );
            self.events.emit(Event::PenaltyApplied {
                loan_id,
                installment_number,
                amount: record.amount,
                applied_on: record.applied_on,
            });
        }

        Ok(amount)
    }

    /// unpaid installments partitioned into overdue and not-yet-due
    ///
    /// Overdue entries are annotated with their penalty; querying creates the
    /// penalty record for any overdue installment that does not have one yet
    /// (first-query-or-payment rule). Loan status is not touched here.
    pub fn pending_installments(
        &mut self,
        loan_id: LoanId,
        as_of: NaiveDate,
    ) -> Result<PendingInstallments> {
        let engine = &self.penalties;
        let (pending, created) = self.store.transaction(|tx| {
            tx.loan(loan_id)?
                .ok_or(LedgerError::LoanNotFound { id: loan_id })?;

            let installments = tx.installments(loan_id)?;
            let payments = tx.payments(loan_id)?;
            let paid: HashSet<u32> = payments.iter().map(|p| p.installment_number).collect();

            let mut overdue = Vec::new();
            let mut upcoming = Vec::new();
            let mut created = Vec::new();

            for installment in installments {
                if paid.contains(&installment.number) {
                    continue;
                }
                if installment.is_past_due(as_of) {
                    let penalty = match tx.penalty(loan_id, installment.number)? {
                        Some(existing) => existing.amount,
                        None => {
                            let record = Penalty {
                                loan_id,
                                installment_number: installment.number,
                                amount: engine.assess(&installment),
                                applied_on: as_of,
                            };
                            tx.insert_penalty(&record)?;
                            let amount = record.amount;
                            created.push(record);
                            amount
                        }
                    };
                    overdue.push(PendingInstallment {
                        installment,
                        penalty,
                    });
                } else {
                    upcoming.push(PendingInstallment {
                        installment,
                        penalty: Money::ZERO,
                    });
                }
            }

            Ok((PendingInstallments { overdue, upcoming }, created))
        })?;

        for record in created {
            debug!(
                "penalty {} applied to installment {} of loan {}",
                record.amount, record.installment_number, loan_id
            );
            self.events.emit(Event::PenaltyApplied {
                loan_id,
                installment_number: record.installment_number,
                amount: record.amount,
                applied_on: record.applied_on,
            });
        }

        Ok(pending)
    }

    /// derive the loan's status from current installment and payment state
    ///
    /// Read-only and idempotent; persists nothing.
    pub fn resolve_status(&self, loan_id: LoanId, as_of: NaiveDate) -> Result<LoanStatus> {
        self.loan(loan_id)?;
        let installments = self.store.installments(loan_id)?;
        let payments = self.store.payments(loan_id)?;
        Ok(derive_status(&installments, &payments, as_of))
    }

    /// derive the loan's status as of the system date
    pub fn resolve_status_now(&self, loan_id: LoanId) -> Result<LoanStatus> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.resolve_status(loan_id, time.now().date_naive())
    }

    /// payments made against a loan, each with the penalty settled alongside
    pub fn payment_history(&self, loan_id: LoanId) -> Result<Vec<PaymentEntry>> {
        self.loan(loan_id)?;
        let payments = self.store.payments(loan_id)?;

        let mut history = Vec::with_capacity(payments.len());
        for payment in payments {
            let penalty = self
                .store
                .penalty(loan_id, payment.installment_number)?
                .map(|p| p.amount)
                .unwrap_or(Money::ZERO);
            history.push(PaymentEntry { payment, penalty });
        }
        Ok(history)
    }

    /// aggregate statement for a loan as of a date
    ///
    /// Querying counts as observing overdue installments, so missing
    /// penalties are applied on the way.
    pub fn statement(&mut self, loan_id: LoanId, as_of: NaiveDate) -> Result<LoanStatement> {
        let pending = self.pending_installments(loan_id, as_of)?;
        let loan = self.loan(loan_id)?;
        let status = self.resolve_status(loan_id, as_of)?;

        let paid_count = self.store.payments(loan_id)?.len() as u32;
        let total_penalties = self
            .store
            .penalties(loan_id)?
            .iter()
            .fold(Money::ZERO, |acc, p| acc + p.amount);
        let total_pending = pending.total_pending();

        Ok(LoanStatement {
            loan_id,
            client_id: loan.client_id,
            category: loan.category,
            status,
            principal: loan.principal,
            term_months: loan.term_months,
            paid_count,
            pending_count: pending.count() as u32,
            overdue: pending.overdue,
            total_penalties,
            outstanding_balance: loan.outstanding_balance,
            total_pending,
            as_of,
        })
    }

    /// expected inflow from unpaid installments due within the next `months`
    /// months, overdue ones included
    pub fn project_receivables(
        &self,
        loan_id: LoanId,
        from: NaiveDate,
        months: u32,
    ) -> Result<ReceivableProjection> {
        self.loan(loan_id)?;
        let horizon_end =
            from.checked_add_months(Months::new(months))
                .ok_or_else(|| LedgerError::InvalidDate {
                    message: format!("horizon overflows {} + {} months", from, months),
                })?;

        let payments = self.store.payments(loan_id)?;
        let paid: HashSet<u32> = payments.iter().map(|p| p.installment_number).collect();

        let installments: Vec<Installment> = self
            .store
            .installments(loan_id)?
            .into_iter()
            .filter(|c| !paid.contains(&c.number) && c.due_date <= horizon_end)
            .collect();

        let total = installments
            .iter()
            .map(|c| c.amount)
            .fold(Money::ZERO, |acc, x| acc + x);

        Ok(ReceivableProjection {
            from,
            horizon_end,
            installments,
            total,
        })
    }
}
