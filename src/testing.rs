//! In-memory `SlackApi` for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::{ConversationInfo, FileAttachment, FilesPage, Message, Page, Timestamp, UserProfile};
use crate::slack::SlackApi;
use crate::{AppError, Result};

pub fn msg(ts: &str, user: Option<&str>, text: &str) -> Message {
    Message {
        ts: Timestamp::new(ts),
        user: user.map(|u| u.to_string()),
        text: Some(text.to_string()),
        files: Vec::new(),
        thread_ts: None,
    }
}

pub fn file(id: Option<&str>, name: Option<&str>, url: Option<&str>) -> FileAttachment {
    FileAttachment {
        id: id.map(|s| s.to_string()),
        name: name.map(|s| s.to_string()),
        url_private: url.map(|s| s.to_string()),
    }
}

#[derive(Default)]
pub struct FakeSlack {
    pub info: Option<ConversationInfo>,
    pub members: Vec<String>,
    pub me: Option<String>,
    /// History pages in order. Cursors are `page-<index>`.
    pub history: Vec<Vec<Message>>,
    /// Thread root ts to every message of the thread, root included.
    pub threads: HashMap<String, Vec<Message>>,
    pub failing_threads: HashSet<String>,
    pub users: HashMap<String, UserProfile>,
    pub file_pages: Vec<Vec<FileAttachment>>,
    pub fail_files: bool,
    pub user_lookups: Mutex<Vec<String>>,
    pub history_calls: Mutex<usize>,
    pub reply_calls: Mutex<usize>,
}

impl FakeSlack {
    pub fn with_user(mut self, id: &str, real_name: &str) -> Self {
        self.users.insert(
            id.to_string(),
            UserProfile {
                real_name: Some(real_name.to_string()),
                name: None,
            },
        );
        self
    }

    pub fn with_thread(mut self, root: &str, messages: Vec<Message>) -> Self {
        self.threads.insert(root.to_string(), messages);
        self
    }

    pub fn lookups_for(&self, user: &str) -> usize {
        self.user_lookups
            .lock()
            .map(|l| l.iter().filter(|u| u.as_str() == user).count())
            .unwrap_or(0)
    }
}

fn bump(counter: &Mutex<usize>) {
    if let Ok(mut n) = counter.lock() {
        *n += 1;
    }
}

fn cursor_index(cursor: Option<&str>, prefix: &str) -> usize {
    cursor
        .and_then(|c| c.strip_prefix(prefix))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn conversation_info(&self, channel: &str) -> Result<ConversationInfo> {
        self.info
            .clone()
            .ok_or_else(|| AppError::SlackApi(format!("channel_not_found: {}", channel)))
    }

    async fn conversation_members(&self, _channel: &str, _cursor: Option<&str>) -> Result<Page<String>> {
        Ok(Page::new(self.members.clone(), None))
    }

    async fn auth_user_id(&self) -> Result<String> {
        self.me
            .clone()
            .ok_or_else(|| AppError::SlackApi("not_authed".to_string()))
    }

    async fn history_page(&self, _channel: &str, cursor: Option<&str>, _limit: u16) -> Result<Page<Message>> {
        bump(&self.history_calls);
        let index = cursor_index(cursor, "page-");
        let items = self.history.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < self.history.len()).then(|| format!("page-{}", index + 1));
        Ok(Page::new(items, next))
    }

    async fn replies_page(
        &self,
        _channel: &str,
        thread_ts: &Timestamp,
        cursor: Option<&str>,
        limit: u16,
    ) -> Result<Page<Message>> {
        bump(&self.reply_calls);
        if self.failing_threads.contains(thread_ts.as_str()) {
            return Err(AppError::SlackApi("thread_not_found".to_string()));
        }
        let all = self.threads.get(thread_ts.as_str()).cloned().unwrap_or_default();
        let offset = cursor_index(cursor, "offset-");
        let end = (offset + limit as usize).min(all.len());
        let items = all.get(offset..end).map(|s| s.to_vec()).unwrap_or_default();
        let next = (end < all.len()).then(|| format!("offset-{}", end));
        Ok(Page::new(items, next))
    }

    async fn user_info(&self, user: &str) -> Result<UserProfile> {
        if let Ok(mut lookups) = self.user_lookups.lock() {
            lookups.push(user.to_string());
        }
        self.users
            .get(user)
            .cloned()
            .ok_or_else(|| AppError::SlackApi("user_not_found".to_string()))
    }

    async fn files_page(&self, _channel: &str, page: u32) -> Result<FilesPage> {
        if self.fail_files {
            return Err(AppError::SlackApi("missing_scope".to_string()));
        }
        let pages = self.file_pages.len().max(1) as u32;
        let files = self
            .file_pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        Ok(FilesPage { files, page, pages })
    }
}
