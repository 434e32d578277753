//! `pass-ssm-sync`: publishes a `pass` secret as an SSM SecureString parameter.
//!
//! Startup sequence:
//! 1. Parse the command line and load [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP export).
//! 3. Initialise AWS SDK clients and resolve the caller identity.
//! 4. Build the [`ParameterFromPass`] reconciler.
//! 5. Run the requested command and print its JSON result.

mod aws;
mod cli;
mod config;
mod data_source;
mod document;
mod fingerprint;
mod pass;
mod resource;
mod telemetry;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use config::Config;
use fingerprint::{FingerprintEngine, FingerprintParams};
use pass::PassSecretSource;
use resource::ParameterFromPass;

#[tokio::main]
async fn main() -> ExitCode {
    // -----------------------------------------------------------------------
    // 1. Command line and configuration
    // -----------------------------------------------------------------------
    let cli = Cli::parse();
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) =
        telemetry::init_telemetry(&cfg.log_level, cfg.otel_exporter_otlp_endpoint.as_deref())
    {
        eprintln!("ERROR: telemetry initialisation failed: {e:#}");
        return ExitCode::FAILURE;
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        binding = %cli.binding.display(),
        "pass-ssm-sync starting"
    );

    // Events logged after shutdown are not exported.
    let status = report(run(&cli, &cfg).await);
    telemetry::shutdown();
    ExitCode::from(status)
}

/// Print a successful result to stdout, or log the error once. Returns the
/// process exit status.
fn report(result: Result<serde_json::Value>) -> u8 {
    match result.and_then(|output| Ok(serde_json::to_string_pretty(&output)?)) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            1
        }
    }
}

async fn run(cli: &Cli, cfg: &Config) -> Result<serde_json::Value> {
    // -----------------------------------------------------------------------
    // 3. AWS clients and caller identity
    // -----------------------------------------------------------------------
    let aws = aws::AwsClients::init(cfg).await?;
    let identity = aws::identity::resolve(&aws, cfg).await?;

    // -----------------------------------------------------------------------
    // 4. Reconciler
    // -----------------------------------------------------------------------
    let reconciler = ParameterFromPass::new(
        PassSecretSource::new(cfg.pass_binary.clone()),
        aws::SsmParameterStore::new(aws.ssm.clone()),
        identity,
        FingerprintEngine::new(FingerprintParams::default()),
    );

    // -----------------------------------------------------------------------
    // 5. Command
    // -----------------------------------------------------------------------
    cli::execute(&cli.command, &cli.binding, &reconciler).await
}
