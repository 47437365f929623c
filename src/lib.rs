mod cli;
pub mod csv_export;
pub mod error;
pub mod export;
pub mod files;
pub mod history;
pub mod model;
pub mod names;
pub mod settings;
pub mod slack;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use error::{AppError, Result};
pub use export::{ExportSummary, export_channel};

use files::Downloader;
use settings::{ExportContext, Settings};
use slack::SlackWebApi;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves configuration from the CLI, environment and settings file, then exports.
///
/// Configuration errors surface before any client is built.
pub async fn run(cli: Cli) -> Result<ExportSummary> {
    let settings = Settings::load(&cli.settings)?;
    let ctx = ExportContext::resolve(settings, cli.channel, cli.output, |key| std::env::var(key).ok())?;

    let http = reqwest::Client::new();
    let api = SlackWebApi::new(&ctx, http.clone())?;
    let downloader = Downloader::new(http, ctx.token.clone());

    export_channel(&ctx, &api, &downloader).await
}

/// Process exit status for a finished run.
///
/// Only fatal errors exit non-zero; any other failure has already been logged
/// and whatever output was produced stays on disk.
pub fn exit_code(result: &Result<ExportSummary>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) if e.is_fatal() => 1,
        Err(e) => {
            error!(error = %e, "export aborted");
            0
        }
    }
}
