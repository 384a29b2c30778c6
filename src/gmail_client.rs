use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use google_gmail1::api::{MessagePart as GmailPart, Scope};
use google_gmail1::{hyper, hyper_rustls, oauth2, Gmail};
use log::{debug, info};

use crate::config::GmailConfig;
use crate::mail_client::{Label, MailClient, Message, MessagePart, MessageSummary};

const USER_ID: &str = "me";

/// [`MailClient`] backed by the Gmail REST API with read-only scope.
pub struct GmailClient {
    hub: Gmail<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>,
}

impl GmailClient {
    pub async fn new(config: &GmailConfig) -> Result<Self> {
        info!("Connecting to Gmail API via OAuth2");

        let secret = match (&config.credentials_path, &config.credentials_base64) {
            (Some(path), _) => oauth2::read_application_secret(path)
                .await
                .context("Unable to read OAuth2 client credentials file")?,
            (None, Some(encoded)) => decode_application_secret(encoded)?,
            (None, None) => anyhow::bail!(
                "Missing Gmail credentials: set GMAIL_CREDENTIALS_PATH or GOOGLE_API_CREDENTIALS"
            ),
        };

        // Tokens are cached so the browser flow only runs once
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(&config.token_cache_path)
        .build()
        .await
        .context("Unable to create OAuth2 authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = hyper::Client::builder().build(connector);
        let hub = Gmail::new(client, auth);

        info!("✅ Gmail API connection established successfully");

        Ok(GmailClient { hub })
    }
}

/// Client secret JSON passed base64-encoded through `GOOGLE_API_CREDENTIALS`.
fn decode_application_secret(encoded: &str) -> Result<oauth2::ApplicationSecret> {
    let json = general_purpose::STANDARD
        .decode(encoded.trim())
        .context("Unable to decode GOOGLE_API_CREDENTIALS")?;
    oauth2::parse_application_secret(json).context("Unable to parse OAuth2 client credentials")
}

#[async_trait]
impl MailClient for GmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        info!("Listing labels from Gmail");

        let result = self
            .hub
            .users()
            .labels_list(USER_ID)
            .add_scope(Scope::Readonly)
            .doit()
            .await
            .context("Unable to list labels")?;

        let labels: Vec<Label> = result
            .1
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|label| match (label.id, label.name) {
                (Some(id), Some(name)) => Some(Label { id, name }),
                _ => None,
            })
            .collect();

        debug!("Listed labels: {}", labels.len());
        Ok(labels)
    }

    async fn search_messages(&self, query: &str) -> Result<Vec<MessageSummary>> {
        debug!("Search criteria: {}", query);

        let mut summaries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut call = self
                .hub
                .users()
                .messages_list(USER_ID)
                .q(query)
                .add_scope(Scope::Readonly);
            if let Some(token) = &page_token {
                call = call.page_token(token);
            }

            let (_, response) = call.doit().await.context("Error searching for emails")?;

            summaries.extend(
                response
                    .messages
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|msg| msg.id)
                    .map(|id| MessageSummary { id }),
            );

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Listed emails: {}", summaries.len());
        Ok(summaries)
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        debug!("Fetching email {}", message_id);

        let (_, message) = self
            .hub
            .users()
            .messages_get(USER_ID, message_id)
            .format("full")
            .add_scope(Scope::Readonly)
            .doit()
            .await
            .with_context(|| format!("Unable to retrieve email {}", message_id))?;

        let mut parts = Vec::new();
        if let Some(payload) = message.payload {
            flatten_parts(payload, &mut parts);
        }

        Ok(Message {
            id: message.id.unwrap_or_else(|| message_id.to_string()),
            label_ids: message.label_ids.unwrap_or_default(),
            parts,
        })
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        debug!("Fetching attachment {} of email {}", attachment_id, message_id);

        // google-gmail1 decodes the URL-safe base64 body while deserializing
        let (_, body) = self
            .hub
            .users()
            .messages_attachments_get(USER_ID, message_id, attachment_id)
            .add_scope(Scope::Readonly)
            .doit()
            .await
            .with_context(|| format!("Unable to retrieve attachment of email {}", message_id))?;

        body.data.context("Attachment has no content")
    }
}

/// Depth-first walk over the MIME tree, keeping parts that carry a filename.
fn flatten_parts(part: GmailPart, out: &mut Vec<MessagePart>) {
    if let Some(filename) = part.filename.filter(|f| !f.is_empty()) {
        out.push(MessagePart {
            filename,
            attachment_id: part.body.and_then(|body| body.attachment_id),
        });
    }
    for child in part.parts.unwrap_or_default() {
        flatten_parts(child, out);
    }
}
