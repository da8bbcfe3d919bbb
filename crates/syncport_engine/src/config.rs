//! Configuration for the batch engine.

use std::time::Duration;

/// Configuration for batch execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on concurrent record writes per batch.
    ///
    /// The effective bound is the smaller of this and the writer's own
    /// capacity.
    pub max_concurrency: usize,
    /// Deadline for a single record write; `None` waits forever.
    pub record_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            max_concurrency: 16,
            record_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Sets the concurrency bound; zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets the per-record deadline.
    pub fn with_record_timeout(mut self, timeout: Duration) -> Self {
        self.record_timeout = Some(timeout);
        self
    }

    /// Removes the per-record deadline.
    pub fn without_record_timeout(mut self) -> Self {
        self.record_timeout = None;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_builder() {
        let config = EngineConfig::new()
            .with_max_concurrency(4)
            .with_record_timeout(Duration::from_secs(5));

        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.record_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.without_record_timeout().record_timeout, None);
    }

    #[test]
    fn zero_concurrency_is_one() {
        assert_eq!(EngineConfig::new().with_max_concurrency(0).max_concurrency, 1);
    }
}
