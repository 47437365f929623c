use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("USER_OAUTH_TOKEN environment variable not set")]
    MissingToken,

    #[error("channel id not set (use --channel or CHANNEL_ID)")]
    MissingChannelId,

    #[error("unrecognized channel type for {0}")]
    UnknownChannelType(String),

    #[error("failed to look up channel: {0}")]
    ChannelLookup(String),

    #[error("invalid api-base-url {url}: {reason}")]
    InvalidApiBaseUrl { url: String, reason: String },

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(String),

    #[error("attachment {0} has no file id")]
    MissingAttachmentId(String),

    #[error("attachment {0} has no download url")]
    MissingAttachmentUrl(String),

    #[error("download of {name} failed with status {status}")]
    DownloadStatus { name: String, status: u16 },
}

impl AppError {
    /// Startup and configuration errors that abort a run before any output.
    ///
    /// Only these make the process exit non-zero.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::MissingToken
                | AppError::MissingChannelId
                | AppError::UnknownChannelType(_)
                | AppError::ChannelLookup(_)
                | AppError::InvalidApiBaseUrl { .. }
                | AppError::ReadFile { .. }
                | AppError::TomlParse(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
