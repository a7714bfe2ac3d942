//! End-to-end walks over the in-memory store: origination through full
//! settlement, default and recovery, and the ledger's consistency guarantees.

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use installment_ledger_rs::{
    LedgerError, LoanCategory, LoanLedger, LoanStatus, LoanStore, MemoryStore, Money,
    OriginationRequest, Rate,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn money(s: &str) -> Money {
    Money::from_str_exact(s).unwrap()
}

fn ledger() -> LoanLedger<MemoryStore> {
    LoanLedger::new(MemoryStore::new())
}

fn originate(
    ledger: &mut LoanLedger<MemoryStore>,
    principal: i64,
    rate: &str,
    term: u32,
    start: NaiveDate,
) -> installment_ledger_rs::Loan {
    ledger
        .originate_loan(OriginationRequest {
            client_id: "30123456".to_string(),
            principal: Money::from_major(principal),
            annual_rate: Rate::from_percent(rate.parse().unwrap()),
            term_months: term,
            category: LoanCategory::Personal,
            start_date: start,
        })
        .unwrap()
}

#[test]
fn full_repayment_settles_the_loan_at_exactly_zero() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 1_200_000, "12", 12, date(2025, 1, 15));
    let schedule = ledger.schedule(loan.id).unwrap();

    let mut previous_balance = loan.outstanding_balance;
    for installment in &schedule {
        let receipt = ledger
            .register_payment(loan.id, installment.number, installment.due_date)
            .unwrap();

        // balance is non-increasing over the payment sequence
        assert!(receipt.outstanding_balance <= previous_balance);
        assert_eq!(receipt.penalty, Money::ZERO);
        previous_balance = receipt.outstanding_balance;
    }

    let settled = ledger.loan(loan.id).unwrap();
    assert_eq!(settled.status, LoanStatus::Settled);
    assert_eq!(settled.outstanding_balance, Money::ZERO);
    assert!(settled.is_settled());
    assert!(settled.status.is_terminal());

    // settled is terminal and the schedule is exhausted
    assert_eq!(
        ledger.resolve_status(loan.id, date(2030, 1, 1)).unwrap(),
        LoanStatus::Settled
    );
    assert!(ledger
        .pending_installments(loan.id, date(2030, 1, 1))
        .unwrap()
        .is_empty());
}

#[test]
fn six_installment_loan_defaults_then_settles() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 600_000, "18", 6, date(2025, 1, 10));
    let schedule = ledger.schedule(loan.id).unwrap();

    // pay the first five on their due dates
    for installment in &schedule[..5] {
        ledger
            .register_payment(loan.id, installment.number, installment.due_date)
            .unwrap();
    }

    // the sixth (due 2025-07-10) is now overdue
    let as_of = date(2025, 8, 1);
    assert_eq!(
        ledger.resolve_status(loan.id, as_of).unwrap(),
        LoanStatus::InDefault
    );

    // paying it late settles the loan and forces the balance to zero
    let last = &schedule[5];
    let expected_penalty = last.amount.percentage(Rate::from_percent(dec!(5)));
    let receipt = ledger.register_payment(loan.id, 6, as_of).unwrap();

    assert_eq!(receipt.penalty, expected_penalty);
    assert_eq!(receipt.amount_paid, last.amount + expected_penalty);
    assert_eq!(receipt.status, LoanStatus::Settled);
    assert_eq!(receipt.outstanding_balance, Money::ZERO);

    let stored = ledger.loan(loan.id).unwrap();
    assert_eq!(stored.status, LoanStatus::Settled);
    assert_eq!(stored.outstanding_balance, Money::ZERO);
}

#[test]
fn default_clears_when_the_overdue_installment_is_paid() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 300_000, "24", 12, date(2025, 1, 1));

    // installment 1 due 2025-02-01; skip it until March
    let as_of = date(2025, 3, 10);
    assert_eq!(
        ledger.resolve_status(loan.id, as_of).unwrap(),
        LoanStatus::InDefault
    );

    let receipt = ledger.register_payment(loan.id, 1, as_of).unwrap();
    assert!(receipt.penalty.is_positive());

    // installment 2 (due 2025-03-01) is still unpaid and past due, so the
    // loan stays in default after the payment
    assert_eq!(receipt.status, LoanStatus::InDefault);

    // paying installment 2 brings the loan current again
    let receipt = ledger.register_payment(loan.id, 2, as_of).unwrap();
    assert_eq!(receipt.status, LoanStatus::Active);
    assert_eq!(
        ledger.resolve_status(loan.id, as_of).unwrap(),
        LoanStatus::Active
    );
}

#[test]
fn overdue_query_applies_the_penalty_once_and_payment_reuses_it() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 120_000, "12", 12, date(2025, 1, 1));
    let schedule = ledger.schedule(loan.id).unwrap();
    let first = &schedule[0];

    // querying three weeks after the due date materializes the 5% penalty
    let as_of = date(2025, 2, 21);
    let pending = ledger.pending_installments(loan.id, as_of).unwrap();
    assert_eq!(pending.overdue.len(), 1);
    let expected_penalty = first.amount.percentage(Rate::from_percent(dec!(5)));
    assert_eq!(pending.overdue[0].penalty, expected_penalty);

    // the later payment settles the stored penalty, not a recomputed one
    let receipt = ledger.register_payment(loan.id, 1, date(2025, 6, 1)).unwrap();
    assert_eq!(receipt.penalty, expected_penalty);
    assert_eq!(
        ledger.store().penalties(loan.id).unwrap().len(),
        1,
        "query and payment share one penalty record"
    );
}

#[test]
fn rejected_operations_leave_the_ledger_consistent() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 500_000, "15", 10, date(2025, 2, 1));

    ledger.register_payment(loan.id, 1, date(2025, 3, 1)).unwrap();
    let before = ledger.loan(loan.id).unwrap();
    let payments_before = ledger.payment_history(loan.id).unwrap().len();

    assert!(matches!(
        ledger.register_payment(loan.id, 1, date(2025, 3, 2)),
        Err(LedgerError::AlreadyPaid { .. })
    ));
    assert!(matches!(
        ledger.register_payment(loan.id, 99, date(2025, 3, 2)),
        Err(LedgerError::InstallmentNotFound { .. })
    ));

    let after = ledger.loan(loan.id).unwrap();
    assert_eq!(after, before);
    assert_eq!(ledger.payment_history(loan.id).unwrap().len(), payments_before);
}

#[test]
fn zero_rate_loan_amortizes_principal_only() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 9_000, "0", 7, date(2025, 1, 1));
    let schedule = ledger.schedule(loan.id).unwrap();

    // 9000 / 7 = 1285.71 with the last installment absorbing the remainder
    for installment in &schedule[..6] {
        assert_eq!(installment.amount, money("1285.71"));
        assert_eq!(installment.principal_portion, money("1285.71"));
    }
    assert_eq!(schedule[6].amount, money("1285.74"));

    for installment in &schedule {
        let receipt = ledger
            .register_payment(loan.id, installment.number, installment.due_date)
            .unwrap();
        assert_eq!(receipt.amount_paid, installment.amount);
    }

    let settled = ledger.loan(loan.id).unwrap();
    assert_eq!(settled.status, LoanStatus::Settled);
    assert_eq!(settled.outstanding_balance, Money::ZERO);
}

#[test]
fn statement_tracks_a_loan_through_its_life() {
    let mut ledger = ledger();
    let loan = originate(&mut ledger, 240_000, "12", 4, date(2025, 1, 1));
    let schedule = ledger.schedule(loan.id).unwrap();

    // fresh loan: everything pending, nothing overdue
    let statement = ledger.statement(loan.id, date(2025, 1, 20)).unwrap();
    assert_eq!(statement.paid_count, 0);
    assert_eq!(statement.pending_count, 4);
    assert!(statement.overdue.is_empty());
    assert_eq!(statement.status, LoanStatus::Active);
    assert_eq!(statement.outstanding_balance, Money::from_major(240_000));

    // pay two, let the third run late
    ledger
        .register_payment(loan.id, 1, schedule[0].due_date)
        .unwrap();
    ledger
        .register_payment(loan.id, 2, schedule[1].due_date)
        .unwrap();

    let as_of = date(2025, 4, 15);
    let statement = ledger.statement(loan.id, as_of).unwrap();
    assert_eq!(statement.paid_count, 2);
    assert_eq!(statement.pending_count, 2);
    assert_eq!(statement.overdue.len(), 1);
    assert_eq!(statement.status, LoanStatus::InDefault);
    assert_eq!(
        statement.total_penalties,
        schedule[2].amount.percentage(Rate::from_percent(dec!(5)))
    );

    // settle the rest
    ledger.register_payment(loan.id, 3, as_of).unwrap();
    ledger
        .register_payment(loan.id, 4, schedule[3].due_date.max(as_of))
        .unwrap();

    let statement = ledger.statement(loan.id, date(2025, 6, 1)).unwrap();
    assert_eq!(statement.paid_count, 4);
    assert_eq!(statement.pending_count, 0);
    assert_eq!(statement.status, LoanStatus::Settled);
    assert_eq!(statement.outstanding_balance, Money::ZERO);
    assert_eq!(statement.total_pending, Money::ZERO);
}

#[test]
fn events_narrate_the_loan_lifecycle() {
    use installment_ledger_rs::Event;

    let mut ledger = ledger();
    let loan = originate(&mut ledger, 100_000, "12", 2, date(2025, 1, 1));
    ledger.take_events();

    ledger.register_payment(loan.id, 1, date(2025, 2, 1)).unwrap();
    ledger.register_payment(loan.id, 2, date(2025, 3, 1)).unwrap();

    let events = ledger.take_events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::LoanOriginated { .. } => "originated",
            Event::PaymentRegistered { .. } => "payment",
            Event::PenaltyApplied { .. } => "penalty",
            Event::StatusChanged { .. } => "status",
            Event::LoanSettled { .. } => "settled",
        })
        .collect();

    assert_eq!(kinds, vec!["payment", "payment", "status", "settled"]);
}
