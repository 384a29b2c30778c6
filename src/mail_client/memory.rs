//! In-memory mailbox standing in for Gmail in tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{Label, MailClient, Message, MessagePart, MessageSummary};

/// Mailbox contents held in memory.
///
/// Every search returns all stored messages in insertion order; the query is
/// only recorded, since the remote side is the one applying label and date
/// filters.
#[derive(Default)]
pub struct InMemoryMailClient {
    labels: Vec<Label>,
    messages: Vec<Message>,
    attachments: HashMap<(String, String), Vec<u8>>,
    failing_messages: HashSet<String>,
    queries: Mutex<Vec<String>>,
    label_list_calls: AtomicUsize,
    message_get_calls: AtomicUsize,
}

impl InMemoryMailClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, id: &str, name: &str) -> Self {
        self.labels.push(Label {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Add a message with a single PDF attachment.
    pub fn with_pdf_message(self, id: &str, label_ids: &[&str], filename: &str, data: Vec<u8>) -> Self {
        let attachment_id = format!("{id}-att-0");
        let parts = vec![MessagePart {
            filename: filename.to_string(),
            attachment_id: Some(attachment_id.clone()),
        }];
        self.with_message(id, label_ids, parts)
            .with_attachment(id, &attachment_id, data)
    }

    pub fn with_message(mut self, id: &str, label_ids: &[&str], parts: Vec<MessagePart>) -> Self {
        self.messages.push(Message {
            id: id.to_string(),
            label_ids: label_ids.iter().map(|l| l.to_string()).collect(),
            parts,
        });
        self
    }

    pub fn with_attachment(mut self, message_id: &str, attachment_id: &str, data: Vec<u8>) -> Self {
        self.attachments
            .insert((message_id.to_string(), attachment_id.to_string()), data);
        self
    }

    /// Make `get_message` fail for this id.
    pub fn failing_on(mut self, message_id: &str) -> Self {
        self.failing_messages.insert(message_id.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn label_list_calls(&self) -> usize {
        self.label_list_calls.load(Ordering::SeqCst)
    }

    pub fn message_get_calls(&self) -> usize {
        self.message_get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailClient for InMemoryMailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        self.label_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels.clone())
    }

    async fn search_messages(&self, query: &str) -> Result<Vec<MessageSummary>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        Ok(self
            .messages
            .iter()
            .map(|m| MessageSummary { id: m.id.clone() })
            .collect())
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        self.message_get_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_messages.contains(message_id) {
            return Err(anyhow!("simulated transport failure"));
        }
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| anyhow!("message {} not found", message_id))
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        self.attachments
            .get(&(message_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("attachment {} not found in message {}", attachment_id, message_id))
    }
}
