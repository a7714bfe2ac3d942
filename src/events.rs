use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LoanOriginated {
        loan_id: LoanId,
        client_id: String,
        principal: Money,
        term_months: u32,
        created_on: NaiveDate,
    },
    PaymentRegistered {
        loan_id: LoanId,
        installment_number: u32,
        amount: Money,
        penalty: Money,
        paid_on: NaiveDate,
    },
    PenaltyApplied {
        loan_id: LoanId,
        installment_number: u32,
        amount: Money,
        applied_on: NaiveDate,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
    },
    LoanSettled {
        loan_id: LoanId,
        settled_on: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
