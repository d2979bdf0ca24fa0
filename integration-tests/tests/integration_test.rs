use chrono::Utc;
use serde_json::json;
use shared::adapters::KinesisStreamClient;
use shared::core::{CuidGenerator, IdGenerator, StreamError, StreamReader, StreamWriter};
use shared::poller::{poll_stream, PollError, PollRequest};
use shared::records::RecordEnvelope;
use std::env;

async fn stream_client() -> KinesisStreamClient {
    let config = aws_config::load_from_env().await;
    KinesisStreamClient::new(aws_sdk_kinesis::Client::new(&config))
}

fn stream_name() -> String {
    env::var("STREAM_NAME").unwrap_or("kinesis-reader-test".to_string())
}

#[ignore]
#[tokio::test]
async fn when_record_is_published_should_be_read_back() {
    let client = stream_client().await;
    let id = CuidGenerator::new().generate_id();
    let payload = json!({"id": id, "message": "integration test"});

    let sequence_number = client
        .put_record(&stream_name(), &id, serde_json::to_vec(&payload).unwrap())
        .await
        .unwrap();

    let summary = poll_stream(
        &client,
        &PollRequest {
            stream_name: stream_name(),
            hours_ago: 0.25,
            batch_size: 10_000,
            max_empty_reads: 3,
        },
        Utc::now(),
    )
    .await
    .unwrap();

    let found = summary
        .records
        .iter()
        .find(|record| record.sequence_number() == sequence_number);
    match found {
        Some(RecordEnvelope::Decoded {
            data,
            partition_key,
            ..
        }) => {
            assert_eq!(data, &payload);
            assert_eq!(partition_key, &id);
        }
        other => panic!("Published record not found or not decoded: {:?}", other),
    }
}

#[ignore]
#[tokio::test]
async fn when_stream_does_not_exist_should_report_not_found() {
    let client = stream_client().await;

    let shards = client.list_shards("this-stream-does-not-exist").await;
    assert!(matches!(shards, Err(StreamError::StreamNotFound(_))));

    let result = poll_stream(
        &client,
        &PollRequest {
            stream_name: "this-stream-does-not-exist".to_string(),
            hours_ago: 1.0,
            batch_size: 10,
            max_empty_reads: 1,
        },
        Utc::now(),
    )
    .await;
    assert!(matches!(
        result,
        Err(PollError::Setup(StreamError::StreamNotFound(_)))
    ));
}
