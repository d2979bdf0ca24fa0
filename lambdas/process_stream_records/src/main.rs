use std::sync::Arc;

use event_handler::function_handler;
use lambda_runtime::{run, service_fn, Error};

mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let otel_guard = Arc::new(
        shared::observability::init_otel("process_stream_records")
            .expect("Failed to initialize telemetry"),
    );

    run(service_fn(|event| async {
        let res = function_handler(event).await;

        otel_guard.flush();

        res
    }))
    .await
}
