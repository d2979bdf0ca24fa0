use chrono::Utc;
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::Deserialize;
use serde_json::Value;
use shared::configuration::PollDefaults;
use shared::core::{StreamError, StreamReader};
use shared::poller::{poll_stream, PollRequest};
use shared::utils::{error_response, json_response, ApiResponse};

#[derive(Debug, Default, Deserialize)]
pub struct ReadStreamRequest {
    pub stream_name: Option<String>,
    pub hours_ago: Option<f64>,
    pub batch_size: Option<usize>,
    pub max_empty_reads: Option<u32>,
}

pub(crate) struct HandlerDeps<R: StreamReader> {
    pub stream_reader: R,
    pub default_stream_name: Option<String>,
    pub poll_defaults: PollDefaults,
}

impl ReadStreamRequest {
    /// An invocation without a payload is treated as an empty request.
    fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        match payload {
            Value::Null => Ok(ReadStreamRequest::default()),
            payload => serde_json::from_value(payload),
        }
    }
}

impl<R: StreamReader> HandlerDeps<R> {
    fn poll_request(&self, request: ReadStreamRequest) -> Result<PollRequest, StreamError> {
        let stream_name = request
            .stream_name
            .filter(|name| !name.is_empty())
            .or_else(|| self.default_stream_name.clone())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StreamError::Configuration("Stream name not provided".to_string()))?;

        Ok(PollRequest {
            stream_name,
            hours_ago: request.hours_ago.unwrap_or(self.poll_defaults.hours_ago),
            batch_size: request.batch_size.unwrap_or(self.poll_defaults.batch_size),
            max_empty_reads: request
                .max_empty_reads
                .unwrap_or(self.poll_defaults.max_empty_reads),
        })
    }
}

#[tracing::instrument(skip(deps, event))]
pub(crate) async fn function_handler<R: StreamReader>(
    deps: &HandlerDeps<R>,
    event: LambdaEvent<Value>,
) -> Result<ApiResponse, Error> {
    tracing::info!("Received event: {}", event.payload);

    let request = match ReadStreamRequest::from_payload(event.payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("Malformed request: {}", e);
            return error_response(500, &e.to_string(), None);
        }
    };

    let poll_request = match deps.poll_request(request) {
        Ok(poll_request) => poll_request,
        Err(e) => {
            tracing::error!("Invalid request: {}", e);
            return error_response(500, &e.to_string(), None);
        }
    };

    match poll_stream(&deps.stream_reader, &poll_request, Utc::now()).await {
        Ok(summary) => json_response(200, &summary),
        Err(e) => {
            tracing::error!("Failed to read stream {}: {}", poll_request.stream_name, e);
            error_response(500, &e.to_string(), e.records_processed())
        }
    }
}
