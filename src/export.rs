use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::csv_export::write_transcript;
use crate::files::{DownloadReport, Downloader, exclude_service_artifacts, fetch_file_list, sanitize_file_name};
use crate::history::fetch_all_messages;
use crate::model::{Channel, ChannelKind, ConversationInfo, direct_counterpart};
use crate::names::NameResolver;
use crate::settings::ExportContext;
use crate::slack::SlackApi;
use crate::transcript::TranscriptBuilder;
use crate::{AppError, Result};

/// What a finished run produced.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub channel_name: String,
    pub messages: usize,
    pub records: usize,
    pub csv_path: Option<PathBuf>,
    pub downloads: DownloadReport,
}

async fn all_members(api: &dyn SlackApi, channel: &str) -> Result<Vec<String>> {
    let mut members = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = api.conversation_members(channel, cursor.as_deref()).await?;
        members.extend(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(members)
}

/// Classifies the conversation and gathers what naming it requires.
pub async fn describe_channel(api: &dyn SlackApi, info: ConversationInfo) -> Result<Channel> {
    let kind = ChannelKind::classify(&info)?;
    let id = info.id;

    let channel = match kind {
        ChannelKind::Public => Channel::Public { id, name: info.name },
        ChannelKind::Private => Channel::Private { id, name: info.name },
        ChannelKind::Direct | ChannelKind::Group => {
            let members = all_members(api, &id).await.unwrap_or_else(|e| {
                warn!(channel = %id, error = %e, "failed to list conversation members");
                Vec::new()
            });
            if kind == ChannelKind::Group {
                Channel::Group { id, members }
            } else {
                let me = match api.auth_user_id().await {
                    Ok(me) => Some(me),
                    Err(e) => {
                        warn!(channel = %id, error = %e, "failed to identify token owner");
                        None
                    }
                };
                let user = direct_counterpart(&members, me.as_deref());
                Channel::Direct { id, user }
            }
        }
    };

    Ok(channel)
}

/// Runs a full channel export: transcript CSV, then attachments.
pub async fn export_channel(
    ctx: &ExportContext,
    api: &dyn SlackApi,
    downloader: &Downloader,
) -> Result<ExportSummary> {
    let mut info = api
        .conversation_info(&ctx.channel_id)
        .await
        .map_err(|e| AppError::ChannelLookup(e.to_string()))?;
    if info.id.is_empty() {
        info.id = ctx.channel_id.clone();
    }
    let channel = describe_channel(api, info).await?;

    let mut names = NameResolver::new(api, ctx.labels.group_separator.clone());
    let channel_name = names.resolve_channel_name(&channel).await;
    info!(kind = %channel.kind(), channel = %channel_name, "exporting channel");

    let dir = ctx.output_root.join(sanitize_file_name(&channel_name));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::WriteFile {
            path: dir.display().to_string(),
            source: e,
        })?;

    let messages = fetch_all_messages(api, channel.id(), ctx.page_size).await?;
    let message_count = messages.len();

    let records = TranscriptBuilder::new(api, &mut names, &ctx.labels, ctx.page_size)
        .build(channel.id(), messages)
        .await;

    let csv_path = if records.is_empty() {
        warn!("no messages to export");
        None
    } else {
        let path = dir.join(format!("_chat_history_{}.csv", sanitize_file_name(&channel_name)));
        write_transcript(&path, &ctx.labels, &records)?;
        info!(path = %path.display(), records = records.len(), "chat history exported");
        Some(path)
    };

    let files = match fetch_file_list(api, channel.id()).await {
        Ok(files) => exclude_service_artifacts(files),
        Err(e) => {
            error!(error = %e, "failed to list channel files");
            Vec::new()
        }
    };
    info!(count = files.len(), "files found");

    let downloads = if files.is_empty() {
        info!("no files to download");
        DownloadReport::default()
    } else {
        info!("starting file downloads");
        let report = downloader.export_files(&files, &dir).await;
        info!(
            downloaded = report.downloaded,
            failed = report.failed,
            skipped = report.skipped,
            "file downloads finished"
        );
        report
    };

    Ok(ExportSummary {
        channel_name,
        messages: message_count,
        records: records.len(),
        csv_path,
        downloads,
    })
}
