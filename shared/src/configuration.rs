use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Poll settings used when a request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollDefaults {
    pub hours_ago: f64,
    pub batch_size: usize,
    pub max_empty_reads: u32,
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            hours_ago: 24.0,
            batch_size: 10_000,
            max_empty_reads: 3,
        }
    }
}

impl PollDefaults {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(PollDefaults::default()))
            // .merge overrides the built-in values with anything set in the environment
            .merge(Env::prefixed("POLL_"))
    }

    pub fn load() -> Self {
        match Self::figment().extract() {
            Ok(defaults) => {
                tracing::info!("{}", defaults);
                defaults
            }
            Err(e) => {
                tracing::error!("Failed to load poll defaults: {:?}", e);
                PollDefaults::default()
            }
        }
    }
}

impl std::fmt::Display for PollDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PollDefaults {{ hours_ago: {}, batch_size: {}, max_empty_reads: {} }}",
            self.hours_ago, self.batch_size, self.max_empty_reads
        )
    }
}
