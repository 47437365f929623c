use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slack_morphism::prelude::*;
use tracing::debug;
use url::Url;

use crate::model::{ConversationInfo, FileAttachment, FilesPage, Message, Page, Timestamp, UserProfile};
use crate::settings::ExportContext;
use crate::{AppError, Result};

/// `files.list` page size; Slack's default is 100.
const FILES_PAGE_COUNT: u32 = 100;
const MEMBERS_PAGE_SIZE: u16 = 200;

/// The remote calls an export needs, expressed in domain types.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn conversation_info(&self, channel: &str) -> Result<ConversationInfo>;

    async fn conversation_members(&self, channel: &str, cursor: Option<&str>) -> Result<Page<String>>;

    /// Id of the user the token belongs to.
    async fn auth_user_id(&self) -> Result<String>;

    async fn history_page(&self, channel: &str, cursor: Option<&str>, limit: u16) -> Result<Page<Message>>;

    /// One page of a thread. The root message is part of the first page.
    async fn replies_page(
        &self,
        channel: &str,
        thread_ts: &Timestamp,
        cursor: Option<&str>,
        limit: u16,
    ) -> Result<Page<Message>>;

    async fn user_info(&self, user: &str) -> Result<UserProfile>;

    /// Page numbers start at 1.
    async fn files_page(&self, channel: &str, page: u32) -> Result<FilesPage>;
}

/// Production client: slack-morphism for conversations and users, plain HTTP for `files.list`.
pub struct SlackWebApi {
    client: SlackHyperClient,
    token: SlackApiToken,
    files: FilesListClient,
}

impl SlackWebApi {
    pub fn new(ctx: &ExportContext, http: reqwest::Client) -> Result<Self> {
        let connector = SlackClientHyperConnector::new()
            .map_err(|e| AppError::SlackApi(format!("failed to create Slack client connector: {}", e)))?;
        let client = SlackClient::new(connector);
        let token = SlackApiToken::new(SlackApiTokenValue(ctx.token.clone()));
        let files = FilesListClient::new(http, ctx.api_base_url.clone(), ctx.token.clone());

        Ok(Self { client, token, files })
    }
}

fn slack_err(e: impl std::fmt::Display) -> AppError {
    AppError::SlackApi(e.to_string())
}

fn next_cursor(meta: Option<SlackResponseMetadata>) -> Option<String> {
    meta.and_then(|m| m.next_cursor).map(|c| c.0)
}

/// Converts SDK messages to domain messages through their JSON form.
fn flatten_messages<T: Serialize>(messages: &[T]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| {
            let value = serde_json::to_value(m).ok()?;
            let message = Message::from_json(value);
            if message.is_none() {
                debug!("dropping message without ts");
            }
            message
        })
        .collect()
}

fn profile_from_json(user: &serde_json::Value) -> UserProfile {
    fn non_empty(v: Option<&serde_json::Value>) -> Option<&str> {
        v.and_then(|n| n.as_str()).filter(|s| !s.is_empty())
    }
    let real_name = non_empty(user.get("real_name"))
        .or_else(|| non_empty(user.get("profile").and_then(|p| p.get("real_name"))))
        .map(|s| s.to_string());
    let name = user.get("name").and_then(|n| n.as_str()).map(|s| s.to_string());

    UserProfile { real_name, name }
}

#[async_trait]
impl SlackApi for SlackWebApi {
    async fn conversation_info(&self, channel: &str) -> Result<ConversationInfo> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsInfoRequest::new(SlackChannelId(channel.to_string()));

        let response = session.conversations_info(&request).await.map_err(slack_err)?;

        let value = serde_json::to_value(&response.channel).map_err(|e| AppError::JsonParse(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| AppError::JsonParse(e.to_string()))
    }

    async fn conversation_members(&self, channel: &str, cursor: Option<&str>) -> Result<Page<String>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsMembersRequest::new()
            .with_channel(SlackChannelId(channel.to_string()))
            .with_limit(MEMBERS_PAGE_SIZE)
            .opt_cursor(cursor.map(|c| SlackCursorId(c.to_string())));

        let response = session.conversations_members(&request).await.map_err(slack_err)?;

        let members = response.members.into_iter().map(|m| m.0).collect();
        Ok(Page::new(members, next_cursor(response.response_metadata)))
    }

    async fn auth_user_id(&self) -> Result<String> {
        let session = self.client.open_session(&self.token);
        let response = session.auth_test().await.map_err(slack_err)?;
        Ok(response.user_id.0)
    }

    async fn history_page(&self, channel: &str, cursor: Option<&str>, limit: u16) -> Result<Page<Message>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel.to_string()))
            .with_limit(limit)
            .opt_cursor(cursor.map(|c| SlackCursorId(c.to_string())));

        let response = session.conversations_history(&request).await.map_err(slack_err)?;

        Ok(Page::new(
            flatten_messages(&response.messages),
            next_cursor(response.response_metadata),
        ))
    }

    async fn replies_page(
        &self,
        channel: &str,
        thread_ts: &Timestamp,
        cursor: Option<&str>,
        limit: u16,
    ) -> Result<Page<Message>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsRepliesRequest::new(
            SlackChannelId(channel.to_string()),
            SlackTs(thread_ts.as_str().to_string()),
        )
        .with_limit(limit)
        .opt_cursor(cursor.map(|c| SlackCursorId(c.to_string())));

        let response = session.conversations_replies(&request).await.map_err(slack_err)?;

        Ok(Page::new(
            flatten_messages(&response.messages),
            next_cursor(response.response_metadata),
        ))
    }

    async fn user_info(&self, user: &str) -> Result<UserProfile> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user.to_string()));

        let response = session.users_info(&request).await.map_err(slack_err)?;

        let value = serde_json::to_value(&response.user).map_err(|e| AppError::JsonParse(e.to_string()))?;
        Ok(profile_from_json(&value))
    }

    async fn files_page(&self, channel: &str, page: u32) -> Result<FilesPage> {
        self.files.list(channel, page).await
    }
}

#[derive(Debug, Deserialize)]
struct FilesListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    files: Vec<FileAttachment>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    pages: u32,
}

/// `files.list` over plain HTTP; the SDK does not cover this method.
pub struct FilesListClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl FilesListClient {
    pub fn new(http: reqwest::Client, base_url: Url, token: String) -> Self {
        Self { http, base_url, token }
    }

    pub async fn list(&self, channel: &str, page: u32) -> Result<FilesPage> {
        let mut url = self
            .base_url
            .join("files.list")
            .map_err(|e| AppError::Http(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("channel", channel)
            .append_pair("count", &FILES_PAGE_COUNT.to_string())
            .append_pair("page", &page.to_string());

        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http(format!("files.list returned HTTP {}", status)));
        }

        let body: FilesListResponse = response.json().await?;
        if !body.ok {
            return Err(AppError::SlackApi(
                body.error.unwrap_or_else(|| "files.list failed".to_string()),
            ));
        }

        let (page, pages) = body.paging.map(|p| (p.page, p.pages)).unwrap_or((page, page));
        Ok(FilesPage {
            files: body.files,
            page,
            pages,
        })
    }
}
