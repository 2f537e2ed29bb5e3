use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::range::{DateRange, MAX_CHUNK_DAYS};
use crate::error::UpstreamError;
use crate::upstream::{PageQuery, TransactionRecord, TransactionSource, TransactionStatus};

/// A chunk whose pagination failed. It contributed no records.
#[derive(Debug)]
pub struct ChunkFailure {
    pub range: DateRange,
    pub error: UpstreamError,
}

/// Everything retrieved for one date range
#[derive(Debug, Default)]
pub struct Retrieval {
    /// Records in chunk order, then page order within a chunk
    pub records: Vec<TransactionRecord>,
    /// Sum of the upstream-reported row counts of the successful chunks
    pub total_rows: u64,
    pub failed_chunks: Vec<ChunkFailure>,
}

/// Upper bound on pages requested for one chunk.
pub const MAX_PAGES_PER_CHUNK: usize = 10_000;

struct ChunkRetrieval {
    records: Vec<TransactionRecord>,
    total_rows: u64,
}

/// Drives upstream pagination to exhaustion over a chunked date range.
pub struct Retriever {
    source: Arc<dyn TransactionSource>,
    max_chunk_days: u32,
}

impl Retriever {
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self {
            source,
            max_chunk_days: MAX_CHUNK_DAYS,
        }
    }

    pub fn with_max_chunk_days(mut self, max_chunk_days: u32) -> Self {
        self.max_chunk_days = max_chunk_days.max(1);
        self
    }

    /// Fetch every transaction with `status` ordered inside `range`.
    ///
    /// Chunks are fetched one after another. A chunk that fails is logged
    /// and skipped; the call only fails when every chunk failed.
    pub async fn fetch_all(
        &self,
        range: DateRange,
        status: TransactionStatus,
    ) -> Result<Retrieval, UpstreamError> {
        self.source.ensure_ready().await?;

        let chunks = range.chunks(self.max_chunk_days);
        let chunk_count = chunks.len();
        info!(
            "Fetching {} transactions from {} for {} ({} chunk(s))",
            status.as_str(),
            self.source.name(),
            range,
            chunk_count
        );

        let mut retrieval = Retrieval::default();
        for chunk in chunks {
            match self.fetch_chunk(chunk, status).await {
                Ok(fetched) => {
                    retrieval.records.extend(fetched.records);
                    retrieval.total_rows += fetched.total_rows;
                }
                Err(error) => {
                    error!(
                        "❌ Chunk {} failed, skipping: {} (status: {:?}, detail: {})",
                        chunk,
                        error,
                        error.status(),
                        error.detail()
                    );
                    retrieval.failed_chunks.push(ChunkFailure { range: chunk, error });
                }
            }
        }

        if chunk_count > 0 && retrieval.failed_chunks.len() == chunk_count {
            return Err(retrieval.failed_chunks.remove(0).error);
        }

        info!(
            "✓ Fetch finished: {} records, {} expected, {} failed chunk(s)",
            retrieval.records.len(),
            retrieval.total_rows,
            retrieval.failed_chunks.len()
        );

        Ok(retrieval)
    }

    async fn fetch_chunk(
        &self,
        chunk: DateRange,
        status: TransactionStatus,
    ) -> Result<ChunkRetrieval, UpstreamError> {
        let query = PageQuery::first(status, chunk);
        let first = self.source.fetch_page(&query).await?;

        let mut records = first.data;
        let mut has_more = first.has_more_pages;
        let mut cursor = non_empty(first.next_cursor);
        let mut total_rows = first.total_rows;

        debug!(
            "First page for {}: {} records, total_rows={:?}, has_more={}, cursor={:?}",
            chunk,
            records.len(),
            total_rows,
            has_more,
            cursor
        );

        let mut requested = HashSet::new();
        let mut pages = 1;

        while has_more && below_total(records.len(), total_rows) {
            let next = match cursor.take() {
                Some(next) => next,
                None => break,
            };
            if !requested.insert(next.clone()) {
                return Err(UpstreamError::Pagination(format!(
                    "cursor {:?} repeated for {}",
                    next, chunk
                )));
            }
            if pages >= MAX_PAGES_PER_CHUNK {
                return Err(UpstreamError::Pagination(format!(
                    "more than {} pages for {}",
                    MAX_PAGES_PER_CHUNK, chunk
                )));
            }
            pages += 1;
            debug!(
                "Fetching next page for {}. Progress: {}/{:?}",
                chunk,
                records.len(),
                total_rows
            );

            let page = self.source.fetch_page(&query.with_cursor(next)).await?;
            if page.data.is_empty() && total_rows.is_none() && page.total_rows.is_none() {
                warn!(
                    "Empty page for {} while more pages were announced, stopping",
                    chunk
                );
                break;
            }
            records.extend(page.data);
            has_more = page.has_more_pages;
            cursor = non_empty(page.next_cursor);
            if page.total_rows.is_some() {
                total_rows = page.total_rows;
            }
        }

        if let Some(expected) = total_rows {
            if (records.len() as u64) < expected {
                warn!(
                    "Chunk {} ended short: {} of {} records",
                    chunk,
                    records.len(),
                    expected
                );
            }
        }

        Ok(ChunkRetrieval {
            total_rows: total_rows.unwrap_or(records.len() as u64),
            records,
        })
    }
}

fn non_empty(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.is_empty())
}

/// An absent `total_rows` never stops pagination on its own.
fn below_total(fetched: usize, total_rows: Option<u64>) -> bool {
    total_rows.map_or(true, |total| (fetched as u64) < total)
}
