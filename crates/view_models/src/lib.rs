//! Framework-independent view models for the document chat client.
//!
//! Each view model owns its state and exposes async transition methods that
//! call a shared [`core_types::SessionGateway`]. Gateway failures never escape
//! as errors: they are logged and queued as [`Notification`]s for the view.

mod chat;
mod documents;
mod sidebar;
mod upload;

pub use chat::{ChatViewModel, Key};
pub use documents::DocumentPickerViewModel;
pub use sidebar::ChatSidebarViewModel;
pub use upload::UploadViewModel;

use core_types::GatewayError;

/// Outcome of the most recent call of one operation kind. `Loading` only
/// holds while the call is awaited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

impl OpStatus {
    fn settled<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Self::Idle
        } else {
            Self::Failed
        }
    }
}

/// Screen the view should switch to after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Login,
    Chat,
    Upload,
}

/// Non-fatal message for the view. `key` is an i18n key, `detail` the
/// underlying error text (may be empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub key: &'static str,
    pub detail: String,
}

impl Notification {
    pub fn new(key: &'static str, detail: impl Into<String>) -> Self {
        Self {
            key,
            detail: detail.into(),
        }
    }

    fn from_error(key: &'static str, err: &GatewayError) -> Self {
        let detail = match err {
            GatewayError::NotFound(body) => body.clone(),
            other => other.to_string(),
        };
        Self::new(key, detail)
    }
}

#[derive(Debug, Default)]
struct Notifications {
    queue: Vec<Notification>,
}

impl Notifications {
    fn push(&mut self, notification: Notification) {
        self.queue.push(notification);
    }

    fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.queue)
    }

    fn peek(&self) -> &[Notification] {
        &self.queue
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use core_types::{
        ChatQuestion, Document, GatewayError, GatewayResult, Message, SessionContext,
        SessionGateway, UploadCandidate,
    };
    use parking_lot::Mutex;

    /// Scripted gateway that records every call.
    #[derive(Default)]
    pub struct FakeGateway {
        calls: Mutex<Vec<&'static str>>,
        history: Mutex<Option<GatewayResult<Vec<Message>>>>,
        reply: Mutex<Option<GatewayResult<Message>>>,
        sent: Mutex<Vec<String>>,
        documents: Mutex<Option<GatewayResult<Vec<Document>>>>,
        text: Mutex<Option<GatewayResult<String>>>,
        requested_documents: Mutex<Vec<String>>,
        upload: Mutex<Option<GatewayResult<()>>>,
        uploaded: Mutex<Vec<Vec<String>>>,
        latest: Mutex<Option<GatewayResult<Option<ChatQuestion>>>>,
        logout_fails: Mutex<bool>,
        new_chat_fails: Mutex<bool>,
    }

    impl FakeGateway {
        pub fn history_with(&self, result: GatewayResult<Vec<Message>>) {
            *self.history.lock() = Some(result);
        }

        pub fn reply_with(&self, result: GatewayResult<Message>) {
            *self.reply.lock() = Some(result);
        }

        pub fn documents_with(&self, result: GatewayResult<Vec<Document>>) {
            *self.documents.lock() = Some(result);
        }

        pub fn text_with(&self, result: GatewayResult<String>) {
            *self.text.lock() = Some(result);
        }

        pub fn upload_with(&self, result: GatewayResult<()>) {
            *self.upload.lock() = Some(result);
        }

        pub fn latest_with(&self, result: GatewayResult<Option<ChatQuestion>>) {
            *self.latest.lock() = Some(result);
        }

        pub fn fail_logout(&self) {
            *self.logout_fails.lock() = true;
        }

        pub fn fail_new_chat(&self) {
            *self.new_chat_fails.lock() = true;
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }

        pub fn requested_documents(&self) -> Vec<String> {
            self.requested_documents.lock().clone()
        }

        pub fn uploaded(&self) -> Vec<Vec<String>> {
            self.uploaded.lock().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait]
    impl SessionGateway for FakeGateway {
        async fn fetch_chat_history(&self, _: &SessionContext) -> GatewayResult<Vec<Message>> {
            self.record("fetch_chat_history");
            self.history.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn send_message(&self, _: &SessionContext, text: &str) -> GatewayResult<Message> {
            self.record("send_message");
            self.sent.lock().push(text.to_string());
            self.reply
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(Message::new(text, "ok")))
        }

        async fn list_documents(&self, _: &SessionContext) -> GatewayResult<Vec<Document>> {
            self.record("list_documents");
            self.documents.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_document_text(
            &self,
            _: &SessionContext,
            document_id: &str,
        ) -> GatewayResult<String> {
            self.record("fetch_document_text");
            self.requested_documents.lock().push(document_id.to_string());
            self.text
                .lock()
                .clone()
                .unwrap_or_else(|| Err(GatewayError::NotFound("not found".into())))
        }

        async fn upload_files(
            &self,
            _: &SessionContext,
            files: &[UploadCandidate],
        ) -> GatewayResult<()> {
            self.record("upload_files");
            self.uploaded
                .lock()
                .push(files.iter().map(|f| f.name.clone()).collect());
            self.upload.lock().clone().unwrap_or(Ok(()))
        }

        async fn logout(&self, _: &SessionContext) -> GatewayResult<()> {
            self.record("logout");
            if *self.logout_fails.lock() {
                return Err(GatewayError::Rejected {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(())
        }

        async fn fetch_latest_question(
            &self,
            _: &SessionContext,
        ) -> GatewayResult<Option<ChatQuestion>> {
            self.record("fetch_latest_question");
            self.latest.lock().clone().unwrap_or(Ok(None))
        }

        async fn start_new_chat(&self, _: &SessionContext) -> GatewayResult<()> {
            self.record("start_new_chat");
            if *self.new_chat_fails.lock() {
                return Err(GatewayError::Rejected {
                    status: 500,
                    message: "no session".into(),
                });
            }
            Ok(())
        }

        async fn login(&self, _: &str, _: &str) -> GatewayResult<SessionContext> {
            self.record("login");
            Ok(SessionContext::with_cookie("session=fake"))
        }

        async fn register(&self, _: &str, _: &str, _: &str) -> GatewayResult<()> {
            self.record("register");
            Ok(())
        }
    }
}
