use aws_lambda_events::{event::kinesis::KinesisEvent, kinesis::KinesisEventRecord};
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde_json::Value;
use shared::core::StreamError;
use shared::utils::ApiResponse;

const PROCESSED_BODY: &str = "Successfully processed records";

#[tracing::instrument(skip(event), fields(
    messaging.batch.message_count = event.payload.records.len(),
))]
pub(crate) async fn function_handler(
    event: LambdaEvent<KinesisEvent>,
) -> Result<ApiResponse, Error> {
    // a record that cannot be decoded fails the whole batch
    for record in event.payload.records {
        let payload = process_record(&record)?;
        tracing::info!("Decoded payload: {}", payload);
    }

    Ok(ApiResponse::new(200, PROCESSED_BODY.to_string()))
}

#[tracing::instrument("process stream_record", skip(record), fields(
    messaging.message.id = %record.kinesis.sequence_number,
    messaging.operation.name = "process",
    messaging.destination = "aws_kinesis",
    messaging.client.id = "process_stream_records",
))]
fn process_record(record: &KinesisEventRecord) -> Result<Value, StreamError> {
    // the event types have already base64-decoded the data
    let data = record.kinesis.data.as_slice();

    serde_json::from_slice(data).map_err(|e| {
        tracing::error!(
            "Failed to decode record {}: {:?}",
            record.kinesis.sequence_number,
            e
        );
        StreamError::Decode(e.to_string())
    })
}
