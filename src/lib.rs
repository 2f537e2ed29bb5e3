pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod reconciliation;
pub mod retrieval;
pub mod server;
pub mod settlement;
pub mod upstream;

pub use error::{AppError, AppResult};
pub use reconciliation::{AggregateTotals, ReconciledTransaction, Reconciler};
pub use retrieval::{DateRange, Retriever};
pub use settlement::{SettlementReport, SettlementService};
pub use upstream::{GuruClient, TransactionRecord, TransactionSource, TransactionStatus};
