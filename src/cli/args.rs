use crate::config::{BridgeConfig, ReadinessPolicy, RuntimeConfig};
use crate::harness::{ReportFormat, ScenarioOptions};
use clap::Parser;
use std::path::PathBuf;

/// Run the billing bridge integration scenario against a simulated store
#[derive(Parser, Debug)]
#[command(name = "billing-bridge")]
#[command(about = "Run the billing bridge integration scenario against a simulated store", long_about = None)]
pub struct CliArgs {
    /// JSON catalog of native product details for the simulated store
    #[arg(
        long = "catalog",
        value_name = "FILE",
        help = "Path to a JSON product catalog (default: built-in demo catalog)"
    )]
    pub catalog: Option<PathBuf>,

    /// Readiness policy applied to billing operations
    #[arg(
        long = "readiness",
        value_name = "POLICY",
        default_value = "unguarded",
        help = "Readiness policy: 'unguarded', 'require' or 'connect'"
    )]
    pub readiness: ReadinessPolicy,

    /// Report output format
    #[arg(
        long = "format",
        value_name = "FORMAT",
        default_value = "json",
        help = "Report format: 'json' or 'csv'"
    )]
    pub format: ReportFormat,

    /// Worker threads of the tokio runtime
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Run without a foreground activity
    #[arg(long = "no-foreground", help = "Run without a foreground activity to host billing flows")]
    pub no_foreground: bool,

    /// Make the simulated store reject the connection
    #[arg(long = "fail-connection", help = "Make the simulated store reject the connection attempt")]
    pub fail_connection: bool,

    /// Log filter directives
    #[arg(
        long = "log-filter",
        value_name = "FILTER",
        help = "tracing filter directives, e.g. 'billing_bridge=debug' (default: RUST_LOG or 'warn')"
    )]
    pub log_filter: Option<String>,
}

impl CliArgs {
    /// Create a RuntimeConfig from CLI arguments
    ///
    /// Invalid values fall back to the defaults with a warning.
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        match self.worker_threads {
            Some(worker_threads) => RuntimeConfig::new(worker_threads),
            None => RuntimeConfig::default(),
        }
    }

    pub fn to_scenario_options(&self) -> ScenarioOptions {
        ScenarioOptions {
            bridge: BridgeConfig::new(self.readiness),
            foreground: !self.no_foreground,
            fail_connection: self.fail_connection,
        }
    }
}
