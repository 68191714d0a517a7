//! Bridge and runtime configuration

use clap::ValueEnum;
use tracing::warn;

/// How operations behave when the connection is not established
///
/// The native layer reports `SERVICE_DISCONNECTED` on its own for calls issued
/// while disconnected, so leaving operations unguarded is always safe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReadinessPolicy {
    /// Issue native calls regardless of connection state
    #[default]
    Unguarded,
    /// Fail with `BridgeError::NotConnected` unless the connection is ready
    Require,
    /// Connect first and return the connection outcome if it is not OK
    Connect,
}

/// Configuration for a `BillingBridge`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub readiness: ReadinessPolicy,
}

impl BridgeConfig {
    pub fn new(readiness: ReadinessPolicy) -> Self {
        Self { readiness }
    }
}

/// Configuration for the harness runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Worker threads of the multi-threaded tokio runtime
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
        }
    }
}

impl RuntimeConfig {
    /// Create a RuntimeConfig, falling back to the default for invalid values
    pub fn new(worker_threads: usize) -> Self {
        let default = Self::default();

        let worker_threads = if worker_threads == 0 {
            warn!(
                worker_threads,
                default = default.worker_threads,
                "invalid worker_threads, using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self { worker_threads }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_policy_is_unguarded() {
        assert_eq!(BridgeConfig::default().readiness, ReadinessPolicy::Unguarded);
    }

    #[rstest]
    #[case::explicit(4, 4)]
    #[case::zero_falls_back(0, num_cpus::get())]
    fn test_runtime_config_worker_threads(#[case] requested: usize, #[case] expected: usize) {
        assert_eq!(RuntimeConfig::new(requested).worker_threads, expected);
    }
}
