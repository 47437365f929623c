use std::path::Path;

use tracing::{error, info};

use crate::model::FileAttachment;
use crate::slack::SlackApi;
use crate::{AppError, Result};

/// Outcome counts for one attachment batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Lists every file shared in `channel`, following `files.list` page numbers.
pub async fn fetch_file_list(api: &dyn SlackApi, channel: &str) -> Result<Vec<FileAttachment>> {
    let mut files = Vec::new();
    let mut page = 1;

    loop {
        let result = api.files_page(channel, page).await?;
        files.extend(result.files);

        if result.page >= result.pages {
            break;
        }
        page = result.page + 1;
    }

    Ok(files)
}

/// Drops Slack's own to-do list file, which is not user content.
pub fn exclude_service_artifacts(files: Vec<FileAttachment>) -> Vec<FileAttachment> {
    files.into_iter().filter(|f| !f.is_service_artifact()).collect()
}

/// Makes a name safe to use as a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".repeat(cleaned.len().max(1)),
        _ => cleaned,
    }
}

/// Local names for each attachment, in order: `0001_report.pdf`, `0002_unknown_file_1`, ...
///
/// The numeric prefix counts every attachment; the unknown-file counter only
/// counts unnamed ones.
pub fn output_names(files: &[FileAttachment]) -> Vec<String> {
    let mut unknown = 0;
    files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let prefix = format!("{:04}", i + 1);
            match file.name.as_deref() {
                Some(name) if !name.is_empty() => format!("{}_{}", prefix, sanitize_file_name(name)),
                _ => {
                    unknown += 1;
                    format!("{}_unknown_file_{}", prefix, unknown)
                }
            }
        })
        .collect()
}

/// Authenticated fetcher for `url_private` links.
pub struct Downloader {
    http: reqwest::Client,
    token: String,
}

impl Downloader {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
        }
    }

    pub async fn fetch(&self, url: &str, name: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::DownloadStatus {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn download_one(&self, file: &FileAttachment, path: &Path) -> Result<()> {
        let name = file.display_name();
        if file.id.as_deref().is_none_or(str::is_empty) {
            return Err(AppError::MissingAttachmentId(name.to_string()));
        }
        let url = file
            .url_private
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::MissingAttachmentUrl(name.to_string()))?;

        let bytes = self.fetch(url, name).await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| AppError::WriteFile {
                path: path.display().to_string(),
                source: e,
            })
    }

    /// Downloads each attachment into `dest`, one at a time.
    ///
    /// Every failure is logged and counted; the batch always runs to the end.
    pub async fn export_files(&self, files: &[FileAttachment], dest: &Path) -> DownloadReport {
        let mut report = DownloadReport::default();

        for (file, local_name) in files.iter().zip(output_names(files)) {
            let path = dest.join(&local_name);
            match self.download_one(file, &path).await {
                Ok(()) => {
                    report.downloaded += 1;
                    info!(file = file.display_name(), path = %path.display(), "downloaded");
                }
                Err(e @ (AppError::MissingAttachmentId(_) | AppError::MissingAttachmentUrl(_))) => {
                    report.skipped += 1;
                    error!(file = file.display_name(), error = %e, "download skipped");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(file = file.display_name(), error = %e, "download failed");
                }
            }
        }

        report
    }
}
