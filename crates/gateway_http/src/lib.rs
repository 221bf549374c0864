use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_types::{
    ChatQuestion, Document, GatewayError, GatewayResult, Message, SessionContext, SessionGateway,
    UploadCandidate,
};
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Multipart field shared by every uploaded file.
pub const UPLOAD_FIELD: &str = "file";

pub struct HttpSessionGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client with an optional overall request timeout. Without one
    /// a hung backend keeps the caller waiting.
    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        user_agent: &str,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build http client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: &SessionContext) -> RequestBuilder {
        debug!(%method, path, "backend request");
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match session.cookie() {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        builder.send().await.map_err(network)
    }

    async fn expect_success(&self, builder: RequestBuilder) -> GatewayResult<()> {
        let response = self.send(builder).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }
}

#[async_trait]
impl SessionGateway for HttpSessionGateway {
    async fn fetch_chat_history(&self, session: &SessionContext) -> GatewayResult<Vec<Message>> {
        let response = self
            .send(self.request(Method::GET, "/chat", session))
            .await?;
        let (_, body) = read_json::<ChatHistoryBody>(response).await?;
        Ok(body.chat_history)
    }

    async fn send_message(&self, session: &SessionContext, text: &str) -> GatewayResult<Message> {
        let question = text.trim();
        if question.is_empty() {
            return Err(GatewayError::Protocol("message text is empty".to_string()));
        }
        let response = self
            .send(
                self.request(Method::POST, "/chat", session)
                    .json(&json!({ "user-message": question })),
            )
            .await?;
        let (status, body) = read_json::<SendMessageBody>(response).await?;
        let answer = body.response.filter(|answer| !answer.is_empty());
        let Some(answer) = answer else {
            let detail = body.error.unwrap_or_else(|| "missing `response` field".into());
            return Err(GatewayError::Protocol(format!("{detail} (status {status})")));
        };
        Ok(Message {
            question: question.to_string(),
            response: answer,
            source_file_names: body.source_file_names,
        })
    }

    async fn list_documents(&self, session: &SessionContext) -> GatewayResult<Vec<Document>> {
        let response = self
            .send(self.request(Method::GET, "/get_documents", session))
            .await?;
        let (_, documents) = read_json::<Vec<Document>>(response).await?;
        Ok(documents)
    }

    async fn fetch_document_text(
        &self,
        session: &SessionContext,
        document_id: &str,
    ) -> GatewayResult<String> {
        let path = format!("/read_document/{}", urlencoding::encode(document_id));
        let response = self.send(self.request(Method::GET, &path, session)).await?;
        let status = response.status();
        let text = response.text().await.map_err(network)?;

        if !status.is_success() {
            if status.is_client_error()
                && let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(&text)
            {
                return Err(GatewayError::NotFound(error));
            }
            return Err(GatewayError::Network(format!(
                "reading document {document_id} failed: {status} {text}"
            )));
        }

        let body: DocumentTextBody = parse_json(&text)?;
        Ok(body.document_text)
    }

    async fn upload_files(
        &self,
        session: &SessionContext,
        files: &[UploadCandidate],
    ) -> GatewayResult<()> {
        if files.is_empty() {
            return Err(GatewayError::Protocol("no files to upload".to_string()));
        }
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .map_err(|err| {
                    GatewayError::Protocol(format!("invalid mime type `{}`: {err}", file.mime_type))
                })?;
            form = form.part(UPLOAD_FIELD, part);
        }

        let response = self
            .send(self.request(Method::POST, "/upload", session).multipart(form))
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, count = files.len(), "upload rejected");
            return Err(GatewayError::Upload {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn logout(&self, session: &SessionContext) -> GatewayResult<()> {
        self.expect_success(self.request(Method::GET, "/logout", session))
            .await
    }

    async fn fetch_latest_question(
        &self,
        session: &SessionContext,
    ) -> GatewayResult<Option<ChatQuestion>> {
        let response = self
            .send(self.request(Method::GET, "/get_chat_questions", session))
            .await?;
        let (_, body) = read_json::<LatestQuestionBody>(response).await?;
        // Without a timestamp the question text is the backend's
        // "no question" placeholder.
        Ok(match (body.question, body.timestamp) {
            (Some(question), Some(timestamp)) if !question.is_empty() => Some(ChatQuestion {
                question,
                timestamp: timestamp_text(timestamp),
            }),
            _ => None,
        })
    }

    async fn start_new_chat(&self, session: &SessionContext) -> GatewayResult<()> {
        self.expect_success(self.request(Method::POST, "/new_chat", session))
            .await
    }

    async fn login(&self, username: &str, password: &str) -> GatewayResult<SessionContext> {
        let response = self
            .send(
                self.request(Method::POST, "/login", &SessionContext::anonymous())
                    .json(&json!({ "username": username, "password": password })),
            )
            .await?;
        let status = response.status();
        let session = session_from_headers(response.headers());
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        if !session.is_authenticated() {
            return Err(GatewayError::Protocol(
                "login response carried no session cookie".to_string(),
            ));
        }
        Ok(session)
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> GatewayResult<()> {
        self.expect_success(
            self.request(Method::POST, "/register", &SessionContext::anonymous())
                .json(&json!({ "username": username, "email": email, "password": password })),
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ChatHistoryBody {
    chat_history: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct SendMessageBody {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    source_file_names: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentTextBody {
    document_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct LatestQuestionBody {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
}

fn network(err: reqwest::Error) -> GatewayError {
    GatewayError::Network(err.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> GatewayResult<(StatusCode, T)> {
    let status = response.status();
    let text = response.text().await.map_err(network)?;
    Ok((status, parse_json(&text)?))
}

fn parse_json<T: DeserializeOwned>(text: &str) -> GatewayResult<T> {
    serde_json::from_str(text).map_err(|err| GatewayError::Protocol(err.to_string()))
}

fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|body| {
            ["error", "message"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| text.trim().to_string())
}

fn timestamp_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn session_from_headers(headers: &HeaderMap) -> SessionContext {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();
    SessionContext::with_cookie(pairs.join("; "))
}
