use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "settings.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "_downloads";
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api/";
pub const DEFAULT_PAGE_SIZE: u16 = 500;
/// Upper bound for history and reply page requests.
pub const MAX_PAGE_SIZE: u16 = 500;

const TOKEN_VARS: [&str; 2] = ["USER_OAUTH_TOKEN", "SLACK_TOKEN"];
const CHANNEL_VAR: &str = "CHANNEL_ID";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    #[serde(rename = "output-dir")]
    pub output_dir: String,
    #[serde(rename = "page-size")]
    pub page_size: u16,
    #[serde(rename = "api-base-url")]
    pub api_base_url: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// Operator-facing strings written into the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    #[serde(rename = "timestamp-header")]
    pub timestamp_header: String,
    #[serde(rename = "user-header")]
    pub user_header: String,
    #[serde(rename = "text-header")]
    pub text_header: String,
    #[serde(rename = "unknown-user")]
    pub unknown_user: String,
    #[serde(rename = "missing-text")]
    pub missing_text: String,
    #[serde(rename = "group-separator")]
    pub group_separator: String,
    #[serde(rename = "timestamp-format")]
    pub timestamp_format: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            timestamp_header: "時刻".to_string(),
            user_header: "送信者".to_string(),
            text_header: "メッセージ".to_string(),
            unknown_user: "[ユーザー名取得失敗]".to_string(),
            missing_text: "[メッセージ内容取得失敗]".to_string(),
            group_separator: "、".to_string(),
            timestamp_format: "%Y/%-m/%-d %-H:%M:%S".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, returning defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::TomlSerialize(e.to_string()))
    }
}

/// Everything one export run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub token: String,
    pub channel_id: String,
    pub output_root: PathBuf,
    pub page_size: u16,
    pub api_base_url: Url,
    pub labels: Labels,
}

impl ExportContext {
    /// Combines CLI overrides, environment and settings.
    ///
    /// `env` is consulted for the token and, when no `--channel` flag was given,
    /// for the channel id. Fails before anything touches the network.
    pub fn resolve<F>(
        settings: Settings,
        channel_flag: Option<String>,
        output_flag: Option<PathBuf>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel_id = channel_flag
            .or_else(|| env(CHANNEL_VAR))
            .filter(|c| !c.trim().is_empty())
            .ok_or(AppError::MissingChannelId)?;

        let token = TOKEN_VARS
            .iter()
            .find_map(|var| env(var).filter(|t| !t.trim().is_empty()))
            .ok_or(AppError::MissingToken)?;

        let mut base = settings.export.api_base_url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base_url = Url::parse(&base).map_err(|e| AppError::InvalidApiBaseUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            token,
            channel_id,
            output_root: output_flag.unwrap_or_else(|| PathBuf::from(settings.export.output_dir)),
            page_size: settings.export.page_size.clamp(1, MAX_PAGE_SIZE),
            api_base_url,
            labels: settings.labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();

        assert_eq!(settings.export.output_dir, "_downloads");
        assert_eq!(settings.export.page_size, 500);
        assert_eq!(settings.labels.unknown_user, "[ユーザー名取得失敗]");
        assert_eq!(settings.labels.group_separator, "、");
    }

    #[test]
    fn test_settings_load_missing_file() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.toml")).unwrap();

        assert_eq!(settings.export.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_settings_deserialization_partial() {
        let toml_content = r#"
[export]
output-dir = "backups"

[labels]
unknown-user = "(unknown)"
"#;

        let settings: Settings = toml::from_str(toml_content).unwrap();

        assert_eq!(settings.export.output_dir, "backups");
        assert_eq!(settings.export.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.labels.unknown_user, "(unknown)");
        assert_eq!(settings.labels.missing_text, "[メッセージ内容取得失敗]");
    }

    #[test]
    fn test_settings_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[export\noutput-dir = ").unwrap();

        let result = Settings::load(&path);
        assert!(matches!(result, Err(AppError::TomlParse(_))));
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = Settings::default();
        settings.export.page_size = 200;
        settings.labels.group_separator = ", ".to_string();

        let toml = settings.to_toml().unwrap();
        assert!(toml.contains("page-size"));

        let back: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(back.export.page_size, 200);
        assert_eq!(back.labels, settings.labels);
    }

    #[test]
    fn test_resolve_from_env() {
        let env = env_from(&[("CHANNEL_ID", "C123"), ("USER_OAUTH_TOKEN", "xoxp-1")]);
        let ctx = ExportContext::resolve(Settings::default(), None, None, env).unwrap();

        assert_eq!(ctx.channel_id, "C123");
        assert_eq!(ctx.token, "xoxp-1");
        assert_eq!(ctx.output_root, PathBuf::from("_downloads"));
        assert_eq!(ctx.api_base_url.as_str(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_resolve_flag_overrides_env() {
        let env = env_from(&[("CHANNEL_ID", "C123"), ("SLACK_TOKEN", "xoxb-2")]);
        let ctx = ExportContext::resolve(
            Settings::default(),
            Some("D999".to_string()),
            Some(PathBuf::from("/tmp/out")),
            env,
        )
        .unwrap();

        assert_eq!(ctx.channel_id, "D999");
        assert_eq!(ctx.token, "xoxb-2");
        assert_eq!(ctx.output_root, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_resolve_missing_channel() {
        let env = env_from(&[("USER_OAUTH_TOKEN", "xoxp-1")]);
        let err = ExportContext::resolve(Settings::default(), None, None, env).unwrap_err();

        assert!(matches!(err, AppError::MissingChannelId));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resolve_missing_or_blank_token() {
        let env = env_from(&[("CHANNEL_ID", "C1"), ("USER_OAUTH_TOKEN", "  ")]);
        let err = ExportContext::resolve(Settings::default(), None, None, env).unwrap_err();

        assert!(matches!(err, AppError::MissingToken));
    }

    #[test]
    fn test_resolve_caps_page_size_at_500() {
        let mut settings = Settings::default();
        settings.export.page_size = 800;
        let env = env_from(&[("CHANNEL_ID", "C1"), ("USER_OAUTH_TOKEN", "t")]);

        let ctx = ExportContext::resolve(settings, None, None, env).unwrap();

        assert_eq!(ctx.page_size, 500);
    }

    #[test]
    fn test_resolve_page_size_zero_becomes_one() {
        let mut settings = Settings::default();
        settings.export.page_size = 0;
        let env = env_from(&[("CHANNEL_ID", "C1"), ("USER_OAUTH_TOKEN", "t")]);

        let ctx = ExportContext::resolve(settings, None, None, env).unwrap();

        assert_eq!(ctx.page_size, 1);
    }

    #[test]
    fn test_resolve_invalid_base_url_is_fatal() {
        let mut settings = Settings::default();
        settings.export.api_base_url = "not a url".to_string();
        let env = env_from(&[("CHANNEL_ID", "C1"), ("USER_OAUTH_TOKEN", "t")]);

        let err = ExportContext::resolve(settings, None, None, env).unwrap_err();

        assert!(matches!(err, AppError::InvalidApiBaseUrl { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resolve_clamps_page_size() {
        let mut settings = Settings::default();
        settings.export.page_size = 5000;
        settings.export.api_base_url = "http://localhost:9999/api".to_string();
        let env = env_from(&[("CHANNEL_ID", "C1"), ("USER_OAUTH_TOKEN", "t")]);

        let ctx = ExportContext::resolve(settings, None, None, env).unwrap();

        assert_eq!(ctx.page_size, MAX_PAGE_SIZE);
        assert_eq!(ctx.api_base_url.as_str(), "http://localhost:9999/api/");
    }
}
