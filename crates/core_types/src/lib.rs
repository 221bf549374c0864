use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type CandidateId = Uuid;
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UiLanguage {
    ZhCn,
    EnUs,
}

/// One answered question. History entries name the sources field `source`,
/// fresh answers name it `source_file_names`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Message {
    pub question: String,
    pub response: String,
    #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
    pub source_file_names: Option<Vec<String>>,
}

impl Message {
    pub fn new(question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            response: response.into(),
            source_file_names: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Document {
    pub id: String,
    pub filename: String,
}

impl Document {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChatQuestion {
    pub question: String,
    pub timestamp: String,
}

impl ChatQuestion {
    /// The backend serializes datetimes in RFC 2822 form
    /// (`Mon, 19 Oct 2026 10:00:00 GMT`).
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(self.timestamp.trim())
            .or_else(|_| DateTime::parse_from_rfc3339(self.timestamp.trim()))
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// A file staged for upload. Identity is `id`, not the file contents:
/// the same file added twice yields two distinct candidates.
#[derive(Clone, Eq, PartialEq)]
pub struct UploadCandidate {
    pub id: CandidateId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            id: CandidateId::new_v4(),
            name: name.into(),
            size_bytes: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let mime_type = mime_guess::MimeGuess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self::from_bytes(name, mime_type, bytes))
    }

    /// Short type label such as `pdf`, taken from the MIME subtype.
    pub fn kind(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or("default")
    }
}

impl fmt::Debug for UploadCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCandidate")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Credential attached to every backend call. The value is an opaque
/// `Cookie` header; nothing in the client reads inside it.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct SessionContext {
    cookie: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        Self {
            cookie: (!cookie.trim().is_empty()).then_some(cookie),
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upload failed with status {status}")]
    Upload { status: u16 },
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Protocol(_) => "protocol",
            Self::NotFound(_) => "not_found",
            Self::Upload { .. } => "upload",
            Self::Rejected { .. } => "rejected",
        }
    }
}

#[async_trait]
pub trait SessionGateway: Send + Sync {
    async fn fetch_chat_history(&self, session: &SessionContext) -> GatewayResult<Vec<Message>>;

    async fn send_message(&self, session: &SessionContext, text: &str) -> GatewayResult<Message>;

    async fn list_documents(&self, session: &SessionContext) -> GatewayResult<Vec<Document>>;

    async fn fetch_document_text(
        &self,
        session: &SessionContext,
        document_id: &str,
    ) -> GatewayResult<String>;

    async fn upload_files(
        &self,
        session: &SessionContext,
        files: &[UploadCandidate],
    ) -> GatewayResult<()>;

    async fn logout(&self, session: &SessionContext) -> GatewayResult<()>;

    async fn fetch_latest_question(
        &self,
        session: &SessionContext,
    ) -> GatewayResult<Option<ChatQuestion>>;

    async fn start_new_chat(&self, session: &SessionContext) -> GatewayResult<()>;

    async fn login(&self, username: &str, password: &str) -> GatewayResult<SessionContext>;

    async fn register(&self, username: &str, email: &str, password: &str) -> GatewayResult<()>;
}
