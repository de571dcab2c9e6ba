//! Fedquery CLI - run federated requests over JSON datasets.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod dataset;
mod error;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use fedquery_proto::Request;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, Mode};
use dataset::Dataset;
use error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the response
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedquery=info,fedquery_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "request failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<String, CliError> {
    let config = args.to_config();
    tracing::info!(
        dataset = %args.dataset.display(),
        max_iterations = config.max_iterations,
        max_offset = config.max_offset,
        default_limit = config.default_limit,
        concurrent = config.concurrent_fan_out,
        "configuration loaded"
    );

    let federation = Dataset::from_path(&args.dataset)?.into_federation(config)?;
    let request = match &args.request {
        Some(path) => read_request(path)?,
        None => Request::new(),
    };

    let output = match args.mode() {
        Mode::Explain => serde_json::to_string_pretty(&federation.explain(&request)?)?,
        Mode::One => serde_json::to_string_pretty(&federation.get_one(&request).await?)?,
        Mode::Many => serde_json::to_string_pretty(&federation.get_many(&request).await?)?,
    };
    Ok(output)
}

fn read_request(path: &Path) -> Result<Request, CliError> {
    let contents = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
