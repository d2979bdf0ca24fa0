use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cuid2::CuidConstructor;
use std::fmt::Debug;
use thiserror::Error;

#[cfg(any(test, feature = "mocks"))]
use mockall::{automock, predicate::*};

/// Largest number of records a single GetRecords call may return.
pub const MAX_RECORDS_PER_FETCH: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("{0}")]
    Configuration(String),
    #[error("Stream not found: {0}")]
    StreamNotFound(String),
    #[error("Shard iterator expired: {0}")]
    ExpiredIterator(String),
    #[error("{0}")]
    Fetch(String),
    #[error("Failed to decode record: {0}")]
    Decode(String),
    #[error("{0}")]
    Service(String),
}

/// A single entry as returned by the stream, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub data: Vec<u8>,
    pub sequence_number: String,
    pub partition_key: String,
    pub approximate_arrival_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub records: Vec<RawRecord>,
    pub next_shard_iterator: Option<String>,
}

impl RecordBatch {
    pub fn new(records: Vec<RawRecord>, next_shard_iterator: Option<String>) -> Self {
        Self {
            records,
            next_shard_iterator,
        }
    }
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait StreamReader: Debug {
    async fn list_shards(&self, stream_name: &str) -> Result<Vec<String>, StreamError>;
    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, StreamError>;
    async fn get_records(&self, shard_iterator: &str, limit: i32)
        -> Result<RecordBatch, StreamError>;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait StreamWriter: Debug {
    /// Returns the sequence number assigned by the stream.
    async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: Vec<u8>,
    ) -> Result<String, StreamError>;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
pub trait IdGenerator {
    fn generate_id(&self) -> String;
}

pub struct CuidGenerator {
    gen: CuidConstructor,
}

impl CuidGenerator {
    pub fn new() -> Self {
        Self {
            gen: CuidConstructor::new().with_length(24),
        }
    }
}

impl Default for CuidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for CuidGenerator {
    fn generate_id(&self) -> String {
        self.gen.create_id()
    }
}
