use clap::Parser;
use slack_channel_export::Cli;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    slack_channel_export::init_tracing();
    // Fails only when a provider is already installed.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    let result = slack_channel_export::run(cli).await;
    match &result {
        Ok(summary) => info!(
            channel = %summary.channel_name,
            messages = summary.messages,
            records = summary.records,
            downloaded = summary.downloads.downloaded,
            failed = summary.downloads.failed,
            "export finished"
        ),
        Err(e) if e.is_fatal() => eprintln!("Error: {}", e),
        Err(_) => {}
    }

    let code = slack_channel_export::exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }
}
