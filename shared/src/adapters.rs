use crate::core::{RawRecord, RecordBatch, StreamError, StreamReader, StreamWriter};
use async_trait::async_trait;
use aws_sdk_kinesis::{
    error::DisplayErrorContext,
    primitives::{Blob, DateTime as AwsDateTime},
    types::{Record, ShardIteratorType},
    Client,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct KinesisStreamClient {
    kinesis_client: Client,
}

impl KinesisStreamClient {
    pub fn new(kinesis_client: Client) -> Self {
        Self { kinesis_client }
    }
}

#[async_trait]
impl StreamReader for KinesisStreamClient {
    async fn list_shards(&self, stream_name: &str) -> Result<Vec<String>, StreamError> {
        let mut shard_ids = vec![];
        let mut next_token: Option<String> = None;

        loop {
            // stream name and next token are mutually exclusive
            let request = match &next_token {
                Some(token) => self.kinesis_client.list_shards().next_token(token),
                None => self.kinesis_client.list_shards().stream_name(stream_name),
            };

            let output = match request.send().await {
                Ok(output) => output,
                Err(e) => {
                    let generic_err_msg =
                        format!("Error listing shards: {}", DisplayErrorContext(&e));
                    let service_error = e.into_service_error();
                    if service_error.is_resource_not_found_exception() {
                        return Err(StreamError::StreamNotFound(stream_name.to_string()));
                    }
                    return Err(StreamError::Service(generic_err_msg));
                }
            };

            shard_ids.extend(
                output
                    .shards()
                    .iter()
                    .map(|shard| shard.shard_id().to_string()),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(shard_ids)
    }

    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, StreamError> {
        let result = self
            .kinesis_client
            .get_shard_iterator()
            .stream_name(stream_name)
            .shard_id(shard_id)
            .shard_iterator_type(ShardIteratorType::AtTimestamp)
            .timestamp(AwsDateTime::from_millis(at.timestamp_millis()))
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.shard_iterator().map(|s| s.to_string())),
            Err(e) => {
                let generic_err_msg = format!(
                    "Error getting iterator for shard {}: {}",
                    shard_id,
                    DisplayErrorContext(&e)
                );
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Err(StreamError::StreamNotFound(stream_name.to_string()))
                } else {
                    Err(StreamError::Service(generic_err_msg))
                }
            }
        }
    }

    async fn get_records(
        &self,
        shard_iterator: &str,
        limit: i32,
    ) -> Result<RecordBatch, StreamError> {
        let result = self
            .kinesis_client
            .get_records()
            .shard_iterator(shard_iterator)
            .limit(limit)
            .send()
            .await;

        match result {
            Ok(output) => Ok(RecordBatch::new(
                output.records().iter().map(RawRecord::from).collect(),
                output.next_shard_iterator().map(|s| s.to_string()),
            )),
            Err(e) => {
                let generic_err_msg = format!("{}", DisplayErrorContext(&e));
                let service_error = e.into_service_error();
                if service_error.is_expired_iterator_exception() {
                    Err(StreamError::ExpiredIterator(generic_err_msg))
                } else {
                    Err(StreamError::Fetch(generic_err_msg))
                }
            }
        }
    }
}

#[async_trait]
impl StreamWriter for KinesisStreamClient {
    async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: Vec<u8>,
    ) -> Result<String, StreamError> {
        let result = self
            .kinesis_client
            .put_record()
            .stream_name(stream_name)
            .partition_key(partition_key)
            .data(Blob::new(data))
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.sequence_number().to_string()),
            Err(e) => {
                let generic_err_msg =
                    format!("Error publishing record: {}", DisplayErrorContext(&e));
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Err(StreamError::StreamNotFound(stream_name.to_string()))
                } else {
                    Err(StreamError::Service(generic_err_msg))
                }
            }
        }
    }
}

impl From<&Record> for RawRecord {
    fn from(record: &Record) -> Self {
        let approximate_arrival_timestamp = record
            .approximate_arrival_timestamp()
            .and_then(|timestamp| timestamp.to_millis().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        RawRecord {
            data: record.data().as_ref().to_vec(),
            sequence_number: record.sequence_number().to_string(),
            partition_key: record.partition_key().to_string(),
            approximate_arrival_timestamp,
        }
    }
}
