//! Pull side of the client: the durable store as reached over HTTP.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use chatsync_shared::{Conversation, ConversationId, Message, MessageContent, UserSummary};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn fetch_me(&self) -> Result<UserSummary>;

    /// Most recently active first.
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>>;

    /// Ascending history. Also marks the conversation seen for the caller.
    async fn fetch_messages(&self, conversation: ConversationId) -> Result<Vec<Message>>;

    async fn send_message(
        &self,
        conversation: ConversationId,
        content: &MessageContent,
    ) -> Result<Message>;

    async fn fetch_contacts(&self) -> Result<Vec<UserSummary>>;
}

pub struct HttpBackend {
    http: reqwest::Client,
    config: ClientConfig,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.config.http_url(path))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json().await?)
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn fetch_me(&self) -> Result<UserSummary> {
        self.get("/api/users/me").await
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        self.get("/api/messages/conversations").await
    }

    async fn fetch_messages(&self, conversation: ConversationId) -> Result<Vec<Message>> {
        self.get(&format!("/api/messages/{conversation}")).await
    }

    async fn send_message(
        &self,
        conversation: ConversationId,
        content: &MessageContent,
    ) -> Result<Message> {
        let resp = self
            .http
            .post(
                self.config
                    .http_url(&format!("/api/messages/send/{conversation}")),
            )
            .bearer_auth(&self.config.token)
            .json(content)
            .send()
            .await?;
        decode(resp).await
    }

    async fn fetch_contacts(&self) -> Result<Vec<UserSummary>> {
        self.get("/api/users/contacts").await
    }
}
