use std::cmp::Ordering;
use std::fmt::{self, Write as _};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Name Slack gives the per-user to-do list it exposes as a file.
pub const TODO_LIST_ARTIFACT: &str = "To-do_list";

/// Slack message timestamp, e.g. `"1705300000.000100"`.
///
/// Serves as both the ordering key and the message id within a channel.
/// Ordering is numeric; values that fail to parse sort before everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    pub fn new(ts: impl Into<String>) -> Self {
        Self(ts.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits into whole seconds and microseconds without going through floats.
    fn parts(&self) -> Option<(i64, u32)> {
        let (secs, frac) = match self.0.split_once('.') {
            Some((s, f)) => (s, f),
            None => (self.0.as_str(), ""),
        };
        let secs: i64 = secs.parse().ok()?;
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut micros = 0u32;
        for (i, c) in frac.chars().chain(std::iter::repeat('0')).take(6).enumerate() {
            let digit = c.to_digit(10)?;
            micros += digit * 10u32.pow(5 - i as u32);
        }
        Some((secs, micros))
    }

    /// Renders in local time with a chrono format string, falling back to the raw value.
    pub fn to_local_string(&self, format: &str) -> String {
        let Some((secs, micros)) = self.parts() else {
            return self.0.clone();
        };
        let Some(datetime) = Local.timestamp_opt(secs, micros * 1000).single() else {
            return self.0.clone();
        };
        let mut out = String::new();
        match write!(out, "{}", datetime.format(format)) {
            Ok(()) => out,
            Err(_) => self.0.clone(),
        }
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts()
            .cmp(&other.parts())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file reference as it appears on messages and in `files.list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url_private: Option<String>,
}

impl FileAttachment {
    pub fn is_service_artifact(&self) -> bool {
        self.name.as_deref() == Some(TODO_LIST_ARTIFACT)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// A channel message or thread reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: Timestamp,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
    #[serde(default)]
    pub thread_ts: Option<Timestamp>,
}

impl Message {
    /// Reads a message out of its JSON form. Entries without `ts` are dropped.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn has_content(&self) -> bool {
        !self.text().is_empty() || !self.files.is_empty()
    }

    /// The thread this message starts, if any.
    pub fn thread_root(&self) -> Option<&Timestamp> {
        self.thread_ts.as_ref()
    }
}

/// One row of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub timestamp: String,
    pub user: String,
    pub text: String,
}

/// The subset of `conversations.info` used to classify a channel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversationInfo {
    pub id: String,
    pub name: Option<String>,
    pub is_channel: Option<bool>,
    pub is_group: Option<bool>,
    pub is_im: Option<bool>,
    pub is_mpim: Option<bool>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Public,
    Private,
    Direct,
    Group,
}

impl ChannelKind {
    /// Decides the kind from the conversation flags.
    ///
    /// DMs and group DMs are checked first: Slack sets `is_group` on some
    /// legacy group DMs, and `is_channel` on private channels.
    pub fn classify(info: &ConversationInfo) -> Result<Self> {
        let flag = |f: Option<bool>| f.unwrap_or(false);

        if flag(info.is_im) {
            Ok(ChannelKind::Direct)
        } else if flag(info.is_mpim) {
            Ok(ChannelKind::Group)
        } else if flag(info.is_group) || (flag(info.is_channel) && flag(info.is_private)) {
            Ok(ChannelKind::Private)
        } else if flag(info.is_channel) {
            Ok(ChannelKind::Public)
        } else {
            Err(AppError::UnknownChannelType(info.id.clone()))
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Public => "public_channel",
            ChannelKind::Private => "private_channel",
            ChannelKind::Direct => "direct_message",
            ChannelKind::Group => "group_dm",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified channel, carrying only what its kind needs for naming.
#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    Public { id: String, name: Option<String> },
    Private { id: String, name: Option<String> },
    Direct { id: String, user: Option<String> },
    Group { id: String, members: Vec<String> },
}

impl Channel {
    pub fn id(&self) -> &str {
        match self {
            Channel::Public { id, .. }
            | Channel::Private { id, .. }
            | Channel::Direct { id, .. }
            | Channel::Group { id, .. } => id,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Public { .. } => ChannelKind::Public,
            Channel::Private { .. } => ChannelKind::Private,
            Channel::Direct { .. } => ChannelKind::Direct,
            Channel::Group { .. } => ChannelKind::Group,
        }
    }
}

/// Picks the other participant of a DM out of its member list.
///
/// Without knowing `me`, only a single-member list is unambiguous.
pub fn direct_counterpart(members: &[String], me: Option<&str>) -> Option<String> {
    match (me, members) {
        (_, [only]) => Some(only.clone()),
        (Some(me), _) => members.iter().find(|m| m.as_str() != me).cloned(),
        (None, _) => None,
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        // An empty cursor means the same as no cursor.
        let next_cursor = next_cursor.filter(|c| !c.is_empty());
        Self { items, next_cursor }
    }
}

/// One page of `files.list`, which uses page numbers rather than cursors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilesPage {
    pub files: Vec<FileAttachment>,
    pub page: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub real_name: Option<String>,
    pub name: Option<String>,
}

impl UserProfile {
    /// Real name, then short name, then the raw id.
    pub fn display_name(&self, id: &str) -> String {
        [&self.real_name, &self.name]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}
