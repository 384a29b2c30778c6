pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::InMemoryMailClient;

/// Mailbox label as listed by the mail provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Search hit; only the id is needed to fetch the full message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: String,
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub id: String,
    pub label_ids: Vec<String>,
    /// MIME parts flattened depth-first.
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default)]
pub struct MessagePart {
    pub filename: String,
    pub attachment_id: Option<String>,
}

/// The mailbox operations the bill matcher relies on.
///
/// Implementations return attachment bodies already decoded from the
/// transport's URL-safe base64 encoding.
#[async_trait]
pub trait MailClient: Send + Sync {
    async fn list_labels(&self) -> Result<Vec<Label>>;

    async fn search_messages(&self, query: &str) -> Result<Vec<MessageSummary>>;

    async fn get_message(&self, message_id: &str) -> Result<Message>;

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;
}
