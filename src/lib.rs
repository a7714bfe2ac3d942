pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod penalty;
pub mod records;
pub mod schedule;
pub mod status;
pub mod store;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::{
    LoanLedger, LoanStatement, OriginationRequest, PaymentEntry, PaymentReceipt,
    PendingInstallment, PendingInstallments, ReceivableProjection,
};
pub use penalty::{PenaltyConfig, PenaltyEngine};
pub use records::{Installment, Loan, Payment, Penalty};
pub use schedule::generate_schedule;
pub use status::derive_status;
pub use store::{LoanStore, MemoryStore};
pub use types::{LoanCategory, LoanId, LoanStatus};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
