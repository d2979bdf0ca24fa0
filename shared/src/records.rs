use crate::core::RawRecord;
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;

/// Outcome of decoding one stream entry. Both shapes carry the entry's
/// sequence number and partition key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordEnvelope {
    Decoded {
        data: Value,
        sequence_number: String,
        partition_key: String,
        approximate_arrival_timestamp: Option<String>,
    },
    Failed {
        error: String,
        sequence_number: String,
        partition_key: String,
    },
}

impl RecordEnvelope {
    pub fn sequence_number(&self) -> &str {
        match self {
            RecordEnvelope::Decoded {
                sequence_number, ..
            }
            | RecordEnvelope::Failed {
                sequence_number, ..
            } => sequence_number,
        }
    }

    pub fn partition_key(&self) -> &str {
        match self {
            RecordEnvelope::Decoded { partition_key, .. }
            | RecordEnvelope::Failed { partition_key, .. } => partition_key,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RecordEnvelope::Failed { .. })
    }
}

pub fn decode_record(record: &RawRecord) -> RecordEnvelope {
    match serde_json::from_slice::<Value>(&record.data) {
        Ok(data) => RecordEnvelope::Decoded {
            data,
            sequence_number: record.sequence_number.clone(),
            partition_key: record.partition_key.clone(),
            approximate_arrival_timestamp: record
                .approximate_arrival_timestamp
                .map(|timestamp| timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        },
        Err(e) => {
            tracing::debug!(
                "Failed to decode record {}: {}",
                record.sequence_number,
                e
            );
            RecordEnvelope::Failed {
                error: e.to_string(),
                sequence_number: record.sequence_number.clone(),
                partition_key: record.partition_key.clone(),
            }
        }
    }
}
