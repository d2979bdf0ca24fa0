use chrono::Utc;
use lambda_runtime::{tracing, Context, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::core::{IdGenerator, StreamError, StreamWriter};
use shared::utils::{error_response, json_response, ApiResponse};

const PRODUCER_MESSAGE: &str = "Hello from producer!";

#[derive(Debug, Default, Deserialize)]
pub struct PutRecordRequest {
    pub stream_name: Option<String>,
}

impl PutRecordRequest {
    /// An invocation without a payload is treated as an empty request.
    fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        match payload {
            Value::Null => Ok(PutRecordRequest::default()),
            payload => serde_json::from_value(payload),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ProducerEvent {
    pub id: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct PutRecordResponse {
    message: String,
    #[serde(rename = "sequenceNumber")]
    sequence_number: String,
}

pub(crate) struct HandlerDeps<W: StreamWriter, I: IdGenerator> {
    pub stream_writer: W,
    pub id_generator: I,
    pub default_stream_name: Option<String>,
}

/// Milliseconds left before the invocation deadline.
fn remaining_time_millis(context: &Context) -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    context.deadline.saturating_sub(now)
}

#[tracing::instrument("publish producer_event", skip(deps, event), fields(
    messaging.message.id = tracing::field::Empty,
    messaging.operation.name = "publish",
    messaging.destination = "aws_kinesis",
    messaging.client.id = "put_record",
))]
pub(crate) async fn function_handler<W: StreamWriter, I: IdGenerator>(
    deps: &HandlerDeps<W, I>,
    event: LambdaEvent<Value>,
) -> Result<ApiResponse, Error> {
    let request = match PutRecordRequest::from_payload(event.payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("Malformed request: {}", e);
            return error_response(500, &e.to_string(), None);
        }
    };

    let stream_name = match request
        .stream_name
        .filter(|name| !name.is_empty())
        .or_else(|| deps.default_stream_name.clone())
        .filter(|name| !name.is_empty())
    {
        Some(stream_name) => stream_name,
        None => {
            let e = StreamError::Configuration("STREAM_NAME is not set".to_string());
            tracing::error!("{}", e);
            return error_response(500, &e.to_string(), None);
        }
    };

    let producer_event = ProducerEvent {
        id: deps.id_generator.generate_id(),
        message: PRODUCER_MESSAGE.to_string(),
        timestamp: remaining_time_millis(&event.context).to_string(),
    };
    tracing::Span::current().record("messaging.message.id", &producer_event.id);

    let data = serde_json::to_vec(&producer_event)?;
    // a fresh key per record, so records spread across shards
    let partition_key = deps.id_generator.generate_id();

    match deps
        .stream_writer
        .put_record(&stream_name, &partition_key, data)
        .await
    {
        Ok(sequence_number) => {
            tracing::info!(
                "Record {} published to {} with sequence number {}",
                producer_event.id,
                stream_name,
                sequence_number
            );
            json_response(
                200,
                &PutRecordResponse {
                    message: "Data sent to Kinesis".to_string(),
                    sequence_number,
                },
            )
        }
        Err(e) => {
            tracing::error!("Error publishing record: {}", e);
            error_response(500, &e.to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{function_handler, HandlerDeps, ProducerEvent};
    use lambda_runtime::{Context, LambdaEvent};
    use mockall::predicate::{always, eq, function};
    use mockall::Sequence;
    use serde_json::{json, Value};
    use shared::core::{MockIdGenerator, MockStreamWriter, StreamError};

    fn create_lambda_event(stream_name: Option<&str>) -> LambdaEvent<Value> {
        let payload = match stream_name {
            Some(stream_name) => json!({ "stream_name": stream_name }),
            None => json!({}),
        };
        LambdaEvent::new(payload, Context::default())
    }

    fn id_generator(ids: &[&'static str]) -> MockIdGenerator {
        let mut id_generator = MockIdGenerator::new();
        let mut seq = Sequence::new();
        for id in ids {
            id_generator
                .expect_generate_id()
                .times(1)
                .in_sequence(&mut seq)
                .return_const(id.to_string());
        }
        id_generator
    }

    #[tokio::test]
    async fn when_stream_configured_should_publish_and_return_sequence_number() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer
            .expect_put_record()
            .times(1)
            .with(
                eq("clicks"),
                eq("partition-id"),
                function(|data: &Vec<u8>| {
                    let event: ProducerEvent = serde_json::from_slice(data).unwrap();
                    event.id == "record-id"
                        && event.message == "Hello from producer!"
                        && event.timestamp.parse::<u64>().is_ok()
                }),
            )
            .returning(|_, _, _| {
                Ok("49590338271490256608559692538361571095921575989136588898".to_string())
            });
        let deps = HandlerDeps {
            stream_writer,
            id_generator: id_generator(&["record-id", "partition-id"]),
            default_stream_name: Some("clicks".to_string()),
        };

        let response = function_handler(&deps, create_lambda_event(None))
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "Data sent to Kinesis",
                "sequenceNumber": "49590338271490256608559692538361571095921575989136588898"
            })
        );
    }

    #[tokio::test]
    async fn when_request_names_stream_should_override_environment() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer
            .expect_put_record()
            .times(1)
            .with(eq("from-request"), always(), always())
            .returning(|_, _, _| Ok("1".to_string()));
        let deps = HandlerDeps {
            stream_writer,
            id_generator: id_generator(&["record-id", "partition-id"]),
            default_stream_name: Some("from-env".to_string()),
        };

        let response = function_handler(&deps, create_lambda_event(Some("from-request")))
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn when_no_stream_configured_should_return_500() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer.expect_put_record().times(0);
        let mut id_generator = MockIdGenerator::new();
        id_generator.expect_generate_id().times(0);
        let deps = HandlerDeps {
            stream_writer,
            id_generator,
            default_stream_name: None,
        };

        let response = function_handler(&deps, create_lambda_event(None))
            .await
            .unwrap();

        assert_eq!(response.status_code, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, json!({"error": "STREAM_NAME is not set"}));
    }

    #[tokio::test]
    async fn when_publish_fails_should_return_500() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer
            .expect_put_record()
            .times(1)
            .returning(|_, _, _| {
                Err(StreamError::Service(
                    "Error publishing record: throttled".to_string(),
                ))
            });
        let deps = HandlerDeps {
            stream_writer,
            id_generator: id_generator(&["record-id", "partition-id"]),
            default_stream_name: Some("clicks".to_string()),
        };

        let response = function_handler(&deps, create_lambda_event(None))
            .await
            .unwrap();

        assert_eq!(response.status_code, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"], "Error publishing record: throttled");
    }

    #[test]
    fn remaining_time_is_zero_once_deadline_passed() {
        let context = Context::default();

        assert_eq!(super::remaining_time_millis(&context), 0);
    }

    #[tokio::test]
    async fn when_environment_stream_name_is_empty_should_return_configuration_error() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer.expect_put_record().times(0);
        let mut id_generator = MockIdGenerator::new();
        id_generator.expect_generate_id().times(0);
        let deps = HandlerDeps {
            stream_writer,
            id_generator,
            default_stream_name: Some(String::new()),
        };

        let response = function_handler(&deps, create_lambda_event(Some("")))
            .await
            .unwrap();

        assert_eq!(response.status_code, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, json!({"error": "STREAM_NAME is not set"}));
    }

    #[tokio::test]
    async fn when_request_is_malformed_should_return_500() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer.expect_put_record().times(0);
        let deps = HandlerDeps {
            stream_writer,
            id_generator: MockIdGenerator::new(),
            default_stream_name: Some("clicks".to_string()),
        };
        let event = LambdaEvent::new(json!({"stream_name": 42}), Context::default());

        let response = function_handler(&deps, event).await.unwrap();

        assert_eq!(response.status_code, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn when_invoked_without_payload_should_use_environment_stream() {
        let mut stream_writer = MockStreamWriter::new();
        stream_writer
            .expect_put_record()
            .times(1)
            .with(eq("clicks"), always(), always())
            .returning(|_, _, _| Ok("1".to_string()));
        let deps = HandlerDeps {
            stream_writer,
            id_generator: id_generator(&["record-id", "partition-id"]),
            default_stream_name: Some("clicks".to_string()),
        };
        let event = LambdaEvent::new(Value::Null, Context::default());

        let response = function_handler(&deps, event).await.unwrap();

        assert_eq!(response.status_code, 200);
    }
}
