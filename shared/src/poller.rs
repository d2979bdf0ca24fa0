//! Bounded polling of every shard of a stream.
//!
//! A session starts one iterator per shard at `now - hours_ago` and then reads
//! the shards round-robin until the record budget is met, `max_empty_reads`
//! consecutive rounds come back empty, or no shard has an iterator left.
//! Nothing is checkpointed; every session starts from the lookback boundary.

use crate::core::{StreamError, StreamReader, MAX_RECORDS_PER_FETCH};
use crate::records::{decode_record, RecordEnvelope};
use chrono::{DateTime, Duration, Utc};
use opentelemetry::{global, KeyValue};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    pub stream_name: String,
    pub hours_ago: f64,
    pub batch_size: usize,
    pub max_empty_reads: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSummary {
    pub records_processed: usize,
    pub records: Vec<RecordEnvelope>,
    pub truncated: bool,
    pub start_time: String,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Setup(#[from] StreamError),
    #[error("Error processing shard: {source}")]
    Shard {
        source: StreamError,
        records_processed: usize,
    },
}

impl PollError {
    /// Records accumulated before the session was aborted, if it got that far.
    pub fn records_processed(&self) -> Option<usize> {
        match self {
            PollError::Setup(_) => None,
            PollError::Shard {
                records_processed, ..
            } => Some(*records_processed),
        }
    }
}

/// Subtracts a fractional number of hours from `now`.
pub fn lookback_start(now: DateTime<Utc>, hours_ago: f64) -> DateTime<Utc> {
    let millis = (hours_ago * 3_600_000.0).round() as i64;
    Duration::try_milliseconds(millis)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[tracing::instrument(skip(reader, request), fields(
    messaging.operation.name = "receive",
    messaging.destination = "aws_kinesis",
    messaging.destination.name = %request.stream_name,
    messaging.batch.message_count = tracing::field::Empty,
))]
pub async fn poll_stream<R: StreamReader>(
    reader: &R,
    request: &PollRequest,
    now: DateTime<Utc>,
) -> Result<PollSummary, PollError> {
    let start_time = lookback_start(now, request.hours_ago);
    let meter = global::meter("read_stream");
    let records_read_counter = meter.u64_counter("records_read").build();

    let mut shard_iterators = initial_iterators(reader, &request.stream_name, start_time).await?;
    let mut all_records: Vec<RecordEnvelope> = vec![];
    let mut empty_rounds = 0u32;

    while !shard_iterators.is_empty()
        && empty_rounds < request.max_empty_reads
        && all_records.len() < request.batch_size
    {
        let mut next_iterators = Vec::with_capacity(shard_iterators.len());
        let mut round_had_records = false;

        for (position, shard_iterator) in shard_iterators.iter().enumerate() {
            let remaining = request.batch_size - all_records.len();
            if remaining == 0 {
                // budget met mid-round, keep the untouched iterators so the
                // live set stays accurate
                next_iterators.extend(shard_iterators[position..].iter().cloned());
                break;
            }
            let limit = remaining.min(MAX_RECORDS_PER_FETCH);

            let batch = match reader.get_records(shard_iterator, limit as i32).await {
                Ok(batch) => batch,
                Err(StreamError::ExpiredIterator(reason)) => {
                    tracing::warn!("Dropping shard with expired iterator: {}", reason);
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        "Aborting poll after {} records: {}",
                        all_records.len(),
                        e
                    );
                    return Err(PollError::Shard {
                        source: e,
                        records_processed: all_records.len(),
                    });
                }
            };

            if !batch.records.is_empty() {
                round_had_records = true;
                let fetched = batch.records.len().min(limit);
                records_read_counter.add(
                    fetched as u64,
                    &[KeyValue::new("stream_name", request.stream_name.clone())],
                );
                all_records.extend(batch.records.iter().take(limit).map(decode_record));
            }

            if let Some(next_iterator) = batch.next_shard_iterator {
                next_iterators.push(next_iterator);
            }
        }

        if round_had_records {
            empty_rounds = 0;
        } else {
            empty_rounds += 1;
        }
        tracing::debug!(
            records = all_records.len(),
            live_shards = next_iterators.len(),
            empty_rounds,
            "Completed polling round"
        );

        shard_iterators = next_iterators;
    }

    let records_processed = all_records.len();
    let truncated = records_processed >= request.batch_size;
    all_records.truncate(request.batch_size);

    tracing::Span::current().record("messaging.batch.message_count", records_processed);
    tracing::info!(
        "Read {} records from {} (truncated: {})",
        records_processed,
        request.stream_name,
        truncated
    );

    Ok(PollSummary {
        records_processed,
        records: all_records,
        truncated,
        start_time: start_time.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
    })
}

async fn initial_iterators<R: StreamReader>(
    reader: &R,
    stream_name: &str,
    start_time: DateTime<Utc>,
) -> Result<Vec<String>, StreamError> {
    let shard_ids = reader.list_shards(stream_name).await?;
    let mut shard_iterators = Vec::with_capacity(shard_ids.len());

    for shard_id in shard_ids {
        match reader
            .get_shard_iterator(stream_name, &shard_id, start_time)
            .await?
        {
            Some(shard_iterator) => shard_iterators.push(shard_iterator),
            None => tracing::warn!("No iterator returned for shard {}", shard_id),
        }
    }

    Ok(shard_iterators)
}
