use std::sync::Arc;

use crate::config::Config;
use crate::event_handler::{function_handler, HandlerDeps};
use lambda_runtime::{run, service_fn, Error};
use shared::adapters::KinesisStreamClient;
use shared::configuration::PollDefaults;

mod config;
mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let otel_guard = Arc::new(
        shared::observability::init_otel("read_stream").expect("Failed to initialize telemetry"),
    );

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let kinesis_client = aws_sdk_kinesis::Client::new(&aws_config);
    let config = Config::load()?;
    let deps = HandlerDeps {
        stream_reader: KinesisStreamClient::new(kinesis_client),
        default_stream_name: config.stream_name,
        poll_defaults: PollDefaults::load(),
    };

    run(service_fn(|event| async {
        let res = function_handler(&deps, event).await;

        otel_guard.flush();

        res
    }))
    .await
}
