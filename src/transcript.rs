use std::collections::HashSet;

use tracing::{error, info};

use crate::history::fetch_thread_replies;
use crate::model::{ExportRecord, FileAttachment, Message};
use crate::names::NameResolver;
use crate::settings::Labels;
use crate::slack::SlackApi;

const BRANCH: &str = "├";
const LAST_BRANCH: &str = "└";

/// `[file: a.png, b.pdf]`
fn file_annotation(files: &[FileAttachment]) -> String {
    let names: Vec<&str> = files.iter().map(|f| f.display_name()).collect();
    format!("[file: {}]", names.join(", "))
}

/// Text column for a message: file annotation first, placeholder when empty.
pub fn render_text(message: &Message, labels: &Labels) -> String {
    if !message.files.is_empty() {
        return format!("{} {}", file_annotation(&message.files), message.text())
            .trim()
            .to_string();
    }
    match message.text() {
        "" => labels.missing_text.clone(),
        text => text.to_string(),
    }
}

pub fn render_reply_text(reply: &Message, is_last: bool, labels: &Labels) -> String {
    let glyph = if is_last { LAST_BRANCH } else { BRANCH };
    format!("{} {}", glyph, render_text(reply, labels))
}

/// Orders messages and expands threads into transcript rows.
pub struct TranscriptBuilder<'a, 'n> {
    api: &'a dyn SlackApi,
    names: &'n mut NameResolver<'a>,
    labels: &'a Labels,
    page_size: u16,
}

impl<'a, 'n> TranscriptBuilder<'a, 'n> {
    pub fn new(
        api: &'a dyn SlackApi,
        names: &'n mut NameResolver<'a>,
        labels: &'a Labels,
        page_size: u16,
    ) -> Self {
        Self {
            api,
            names,
            labels,
            page_size,
        }
    }

    async fn record(&mut self, message: &Message, text: String) -> ExportRecord {
        let user = match &message.user {
            Some(user) => self.names.resolve_user_name(user).await,
            None => self.labels.unknown_user.clone(),
        };
        ExportRecord {
            timestamp: message.ts.to_local_string(&self.labels.timestamp_format),
            user,
            text,
        }
    }

    /// Sorted top-level messages, each followed directly by its thread replies.
    ///
    /// A thread whose replies cannot be fetched keeps its parent row and loses
    /// only its replies. Each thread is expanded once even if several messages
    /// in the history point at it.
    pub async fn build(&mut self, channel: &str, mut messages: Vec<Message>) -> Vec<ExportRecord> {
        messages.sort_by(|a, b| a.ts.cmp(&b.ts));

        let thread_total = messages.iter().filter(|m| m.thread_root().is_some()).count();
        let mut thread_count = 0;
        let mut expanded = HashSet::new();
        let mut records = Vec::with_capacity(messages.len());

        for message in &messages {
            if message.has_content() {
                let text = render_text(message, self.labels);
                records.push(self.record(message, text).await);
            }

            let Some(root) = message.thread_root() else {
                continue;
            };
            thread_count += 1;
            if !expanded.insert(root.clone()) {
                continue;
            }
            info!("fetching thread {} / {}", thread_count, thread_total);

            let thread = match fetch_thread_replies(self.api, channel, root, self.page_size).await {
                Ok(thread) => thread,
                Err(e) => {
                    error!(thread = %root, error = %e, "failed to fetch thread replies, skipping thread");
                    continue;
                }
            };

            let replies: Vec<&Message> = thread.iter().filter(|r| &r.ts != root).collect();
            let last = replies.len().saturating_sub(1);
            for (i, reply) in replies.into_iter().enumerate() {
                let text = render_reply_text(reply, i == last, self.labels);
                records.push(self.record(reply, text).await);
            }
        }

        records
    }
}
