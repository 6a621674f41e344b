// File: wpsnapshots/src/main.rs
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use wpsnapshots::cli::Cli;
use wpsnapshots::errors::{SnapshotError, SpawnError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = log_filter().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("wpsnapshots=info".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?))
}

/// Carry the failing child's status through when it fits in a process exit code.
fn exit_status(err: &anyhow::Error) -> u8 {
    let code = if let Some(e) = err.downcast_ref::<SnapshotError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<SpawnError>() {
        e.exit_code()
    } else {
        1
    };
    u8::try_from(code).ok().filter(|c| *c > 0).unwrap_or(1)
}
