// Settlement pipeline: retrieval followed by reconciliation

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::reconciliation::{AggregateTotals, ReconciledTransaction, Reconciler};
use crate::retrieval::range::DEFAULT_LOOKBACK_DAYS;
use crate::retrieval::{DateRange, Retriever};
use crate::upstream::TransactionStatus;

/// Result of one settlement request
#[derive(Debug, Serialize)]
pub struct SettlementReport {
    pub data: Vec<ReconciledTransaction>,
    pub totals: AggregateTotals,
    pub total_rows: u64,
    /// Windows that could not be fetched
    #[serde(skip)]
    pub failed_chunks: Vec<DateRange>,
}

pub struct SettlementService {
    retriever: Retriever,
    reconciler: Reconciler,
    default_lookback_days: u32,
}

impl SettlementService {
    pub fn new(retriever: Retriever, reconciler: Reconciler) -> Self {
        Self {
            retriever,
            reconciler,
            default_lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_default_lookback(mut self, days: u32) -> Self {
        self.default_lookback_days = days;
        self
    }

    pub fn default_lookback_days(&self) -> u32 {
        self.default_lookback_days
    }

    /// The window used when a request names no dates
    pub fn default_range(&self, today: NaiveDate) -> DateRange {
        DateRange::last_days(today, self.default_lookback_days)
    }

    /// Fetch every `status` transaction in `range` (or the default window)
    /// and reconcile the batch.
    pub async fn fetch_and_reconcile(
        &self,
        status: TransactionStatus,
        range: Option<DateRange>,
    ) -> AppResult<SettlementReport> {
        let range = range.unwrap_or_else(|| self.default_range(Utc::now().date_naive()));
        info!(
            "🔄 Settlement run for {} transactions from {} to {}",
            status.as_str(),
            range.start_instant().to_rfc3339(),
            range.end_instant().to_rfc3339()
        );

        let retrieval = self.retriever.fetch_all(range, status).await?;
        if !retrieval.failed_chunks.is_empty() {
            warn!(
                "⚠️  Partial result: {} window(s) could not be fetched",
                retrieval.failed_chunks.len()
            );
        }

        let reconciliation = self.reconciler.reconcile(&retrieval.records)?;

        info!(
            "✓ Settlement run complete: {} transactions, net {}",
            reconciliation.totals.total_transactions, reconciliation.totals.total_net_amount
        );

        Ok(SettlementReport {
            data: reconciliation.transactions,
            totals: reconciliation.totals,
            total_rows: retrieval.total_rows,
            failed_chunks: retrieval.failed_chunks.iter().map(|f| f.range).collect(),
        })
    }
}
