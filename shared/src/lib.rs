pub mod adapters;
pub mod configuration;
pub mod core;
pub mod observability;
pub mod poller;
pub mod records;
pub mod utils;
