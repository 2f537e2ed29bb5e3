// Fee decomposition and batch totals
pub mod engine;
pub mod fees;
pub mod models;
pub mod totals;

pub use engine::{Reconciler, Reconciliation};
pub use fees::{AnticipationPolicy, AnticipationPolicyKind, FeeSchedule};
pub use models::{CalculationDetails, Discounts, Payment, PaymentMethod, ReconciledTransaction};
pub use totals::AggregateTotals;
