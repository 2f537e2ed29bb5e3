use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::models::{CalculationDetails, ReconciledTransaction};
use crate::error::ReconcileError;

/// Batch totals.
///
/// `fee_totals` holds one `total_<fee>` entry per fee name seen anywhere in
/// the batch; records without that fee contribute nothing to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub total_transactions: u64,
    pub total_net_amount: Decimal,
    pub total_net_affiliate_value: Decimal,
    #[serde(flatten)]
    pub fee_totals: BTreeMap<String, Decimal>,
}

impl AggregateTotals {
    pub fn from_transactions(transactions: &[ReconciledTransaction]) -> Result<Self, ReconcileError> {
        let mut totals = Self::default();
        for transaction in transactions {
            totals.add(transaction.calculation_details.as_ref())?;
        }
        Ok(totals)
    }

    /// Count one transaction. Transactions without details are counted but
    /// add nothing to the sums.
    pub fn add(&mut self, details: Option<&CalculationDetails>) -> Result<(), ReconcileError> {
        self.total_transactions += 1;

        let details = match details {
            Some(details) => details,
            None => return Ok(()),
        };

        self.total_net_amount = checked_sum(self.total_net_amount, details.net_amount, "total_net_amount")?;
        self.total_net_affiliate_value = checked_sum(
            self.total_net_affiliate_value,
            details.net_affiliate_value,
            "total_net_affiliate_value",
        )?;

        for (fee, amount) in details.discounts.entries() {
            let key = format!("total_{}", fee);
            let running = self.fee_totals.get(&key).copied().unwrap_or(Decimal::ZERO);
            let sum = checked_sum(running, amount, &key)?;
            self.fee_totals.insert(key, sum);
        }

        Ok(())
    }

    pub fn fee_total(&self, fee: &str) -> Option<Decimal> {
        self.fee_totals.get(&format!("total_{}", fee)).copied()
    }
}

fn checked_sum(running: Decimal, amount: Decimal, field: &str) -> Result<Decimal, ReconcileError> {
    running
        .checked_add(amount)
        .ok_or_else(|| ReconcileError::TotalsOverflow {
            field: field.to_string(),
        })
}
