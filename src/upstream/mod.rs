pub mod client;
pub mod models;
pub mod traits;

pub use client::GuruClient;
pub use models::{PageQuery, TransactionPage, TransactionRecord, TransactionStatus};
pub use traits::TransactionSource;
