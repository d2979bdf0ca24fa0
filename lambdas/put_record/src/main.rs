use std::sync::Arc;

use crate::config::Config;
use crate::event_handler::{function_handler, HandlerDeps};
use lambda_runtime::{run, service_fn, Error};
use shared::adapters::KinesisStreamClient;
use shared::core::CuidGenerator;

mod config;
mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let otel_guard = Arc::new(
        shared::observability::init_otel("put_record").expect("Failed to initialize telemetry"),
    );

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let kinesis_client = aws_sdk_kinesis::Client::new(&aws_config);
    let config = Config::load()?;
    let deps = HandlerDeps {
        stream_writer: KinesisStreamClient::new(kinesis_client),
        id_generator: CuidGenerator::new(),
        default_stream_name: config.stream_name,
    };

    run(service_fn(|event| async {
        let res = function_handler(&deps, event).await;

        otel_guard.flush();

        res
    }))
    .await
}
