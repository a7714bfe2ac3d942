use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::records::Installment;

/// late-fee configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// one-time fee as a percent of the installment's total amount
    pub rate: Rate,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            rate: Rate::from_percent(dec!(5)),
        }
    }
}

/// engine assessing one-time late fees on overdue installments
///
/// The engine only computes the amount. Idempotent creation (at most one
/// penalty record per installment, never recomputed) is enforced by the
/// ledger against the store.
#[derive(Debug, Clone, Default)]
pub struct PenaltyEngine {
    config: PenaltyConfig,
}

impl PenaltyEngine {
    pub fn new(config: PenaltyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    /// fee owed on an overdue installment
    pub fn assess(&self, installment: &Installment) -> Money {
        installment.amount.percentage(self.config.rate)
    }
}
