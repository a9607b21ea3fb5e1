//! The Result Reader
//!
//! Lists thread messages oldest-first and renders their text content.
//! Non-text content items (images, file references) are skipped silently.

use anyhow::Result;

use crate::types::{AgentService, MessageContent, MessageOrder, MessageRole, ThreadMessage};

/// List all messages in a thread in creation order.
pub async fn read_thread(
    service: &dyn AgentService,
    thread_id: &str,
) -> Result<Vec<ThreadMessage>> {
    service
        .list_messages(thread_id, MessageOrder::Ascending)
        .await
}

/// Flatten the text content items of one message, in item order. Messages
/// with no text content render as an empty string.
pub fn extract_text(message: &ThreadMessage) -> String {
    message
        .content
        .iter()
        .filter_map(|item| match item {
            MessageContent::Text { value } => Some(value.as_str()),
            MessageContent::Other { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The rendered text of every assistant message in the thread, oldest
/// first, skipping assistant messages with no text content.
pub async fn assistant_replies(
    service: &dyn AgentService,
    thread_id: &str,
) -> Result<Vec<String>> {
    let messages = read_thread(service, thread_id).await?;
    Ok(messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .map(extract_text)
        .filter(|text| !text.is_empty())
        .collect())
}
