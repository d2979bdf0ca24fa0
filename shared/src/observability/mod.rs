mod configuration;

pub use configuration::{init_otel, OtelGuard};
