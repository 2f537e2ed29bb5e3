pub mod range;
pub mod retriever;

pub use range::DateRange;
pub use retriever::{ChunkFailure, Retrieval, Retriever};
