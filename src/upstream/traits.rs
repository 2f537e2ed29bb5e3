use async_trait::async_trait;

use super::models::{PageQuery, TransactionPage};
use crate::error::UpstreamError;

/// Anything that can serve pages of gateway transactions.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_page(&self, query: &PageQuery) -> Result<TransactionPage, UpstreamError>;

    /// Prepare the source for use. Must be safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), UpstreamError> {
        Ok(())
    }
}
