use std::path::PathBuf;

use clap::Parser;

use crate::settings::SETTINGS_FILE;

#[derive(Parser, Debug)]
#[command(name = "slack-channel-export")]
#[command(about = "Export a Slack channel's history and shared files to a local archive")]
pub struct Cli {
    /// Channel id to export, overrides CHANNEL_ID
    #[arg(short, long)]
    pub channel: Option<String>,

    /// Output root directory, overrides the settings file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Settings file path
    #[arg(short, long, default_value = SETTINGS_FILE)]
    pub settings: PathBuf,
}
