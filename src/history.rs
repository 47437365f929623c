use tracing::{debug, info};

use crate::Result;
use crate::model::{Message, Timestamp};
use crate::slack::SlackApi;

/// Pulls every top-level message of a channel.
///
/// Pages are followed until the cursor runs out; an empty page with a cursor
/// does not end the walk. The result is in API order, not sorted.
pub async fn fetch_all_messages(api: &dyn SlackApi, channel: &str, page_size: u16) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page_count = 0;

    loop {
        let page = api.history_page(channel, cursor.as_deref(), page_size).await?;
        page_count += 1;
        info!(page = page_count, messages = page.items.len(), "fetched history page");

        messages.extend(page.items);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(channel, total = messages.len(), "fetched channel history");
    Ok(messages)
}

/// Fetches a whole thread, root message included.
pub async fn fetch_thread_replies(
    api: &dyn SlackApi,
    channel: &str,
    thread_ts: &Timestamp,
    page_size: u16,
) -> Result<Vec<Message>> {
    let mut replies = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api
            .replies_page(channel, thread_ts, cursor.as_deref(), page_size)
            .await?;
        replies.extend(page.items);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!(thread = %thread_ts, count = replies.len(), "fetched thread");
    Ok(replies)
}
