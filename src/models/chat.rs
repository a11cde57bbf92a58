use async_graphql::{ InputObject, Object, SimpleObject };
use chrono::{ DateTime, SecondsFormat, Utc };
use serde::{ Deserialize, Serialize };
use std::fmt;
use uuid::Uuid;

/// Generates an opaque id shaped `<prefix>_<unix millis>_<hex>`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), Uuid::new_v4().simple())
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: String, content: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }
}

#[Object]
impl Message {
    async fn id(&self) -> &str {
        &self.id
    }

    async fn content(&self) -> &str {
        &self.content
    }

    async fn role(&self) -> &str {
        self.role.as_str()
    }

    async fn timestamp(&self) -> String {
        iso_timestamp(&self.timestamp)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// An empty conversation stamped with the current time.
    pub fn empty(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[Object]
impl Conversation {
    async fn id(&self) -> &str {
        &self.id
    }

    async fn messages(&self) -> &[Message] {
        &self.messages
    }

    async fn created_at(&self) -> String {
        iso_timestamp(&self.created_at)
    }

    async fn updated_at(&self) -> String {
        iso_timestamp(&self.updated_at)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct ChatResponse {
    pub id: String,
    pub message: String,
}
