//! Billing Bridge harness CLI
//!
//! Runs the bridge integration scenario against the simulated store and
//! prints one report row per step.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --format csv
//! cargo run -- --catalog catalog.json --readiness connect
//! cargo run -- --no-foreground --fail-connection --log-filter billing_bridge=debug
//! ```
//!
//! The report goes to stdout; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Scenario ran (individual steps may still report failures)
//! - 1: Error (catalog not readable or invalid, runtime failure, report not writable)

use billing_bridge::cli::{self, CliArgs};
use billing_bridge::harness::{self, write_report};
use billing_bridge::{BridgeError, SimulatedBillingClient};
use std::fs::File;
use std::io::BufReader;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let args = cli::parse_args();
    init_tracing(args.log_filter.as_deref());

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: &CliArgs) -> Result<(), BridgeError> {
    let native = match &args.catalog {
        Some(path) => {
            let file = File::open(path).map_err(|e| BridgeError::Io {
                message: format!("{}: {}", path.display(), e),
            })?;
            SimulatedBillingClient::from_catalog_json(BufReader::new(file))?
        }
        None => SimulatedBillingClient::with_demo_catalog(),
    };

    let runtime_config = args.to_runtime_config();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(runtime_config.worker_threads)
        .enable_all()
        .build()?;

    let rows = runtime.block_on(harness::run_scenario(&native, args.to_scenario_options()));

    let mut output = std::io::stdout().lock();
    write_report(&rows, args.format, &mut output)
}
