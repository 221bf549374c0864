use std::sync::Arc;
use std::time::{Duration, Instant};

use core_types::{Message, SessionContext, SessionGateway};
use tracing::{debug, info, warn};

use crate::{Navigation, Notification, Notifications, OpStatus};

pub const DEFAULT_SENT_INDICATOR: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

pub struct ChatViewModel {
    gateway: Arc<dyn SessionGateway>,
    session: SessionContext,
    history: Vec<Message>,
    draft: String,
    send_in_flight: bool,
    sent_indicator: Duration,
    sent_indicator_until: Option<Instant>,
    focus_requested: bool,
    history_status: OpStatus,
    notifications: Notifications,
}

impl ChatViewModel {
    pub fn new(gateway: Arc<dyn SessionGateway>, session: SessionContext) -> Self {
        Self {
            gateway,
            session,
            history: Vec::new(),
            draft: String::new(),
            send_in_flight: false,
            sent_indicator: DEFAULT_SENT_INDICATOR,
            sent_indicator_until: None,
            focus_requested: false,
            history_status: OpStatus::Idle,
            notifications: Notifications::default(),
        }
    }

    pub fn with_sent_indicator(mut self, duration: Duration) -> Self {
        self.sent_indicator = duration;
        self
    }

    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_sending(&self) -> bool {
        self.send_in_flight
    }

    pub fn history_status(&self) -> OpStatus {
        self.history_status
    }

    pub fn can_send(&self) -> bool {
        !self.send_in_flight && !self.draft.trim().is_empty()
    }

    /// Cosmetic "sent" marker shown briefly after a successful send.
    /// Purely time-based; it says nothing about requests in flight.
    pub fn sent_indicator_visible(&self, now: Instant) -> bool {
        self.sent_indicator_until
            .is_some_and(|deadline| now < deadline)
    }

    /// Returns whether the view should move focus back to the input, and
    /// clears the request.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    pub fn notifications(&self) -> &[Notification] {
        self.notifications.peek()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.take()
    }

    pub async fn load_history(&mut self) {
        self.history_status = OpStatus::Loading;
        let result = self.gateway.fetch_chat_history(&self.session).await;
        self.history_status = OpStatus::settled(&result);

        match result {
            Ok(history) => {
                debug!(count = history.len(), "chat history loaded");
                self.history = history;
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "failed to fetch chat history");
                self.notifications
                    .push(Notification::from_error("notify.history_failed", &err));
            }
        }
    }

    /// Sends the trimmed draft. Returns `true` when a message was appended.
    pub async fn submit_draft(&mut self) -> bool {
        let question = self.draft.trim().to_string();
        if question.is_empty() {
            return false;
        }

        self.send_in_flight = true;
        let result = self.gateway.send_message(&self.session, &question).await;
        self.send_in_flight = false;

        match result {
            Ok(reply) => {
                self.history.push(Message { question, ..reply });
                self.draft.clear();
                self.focus_requested = true;
                self.sent_indicator_until = Some(Instant::now() + self.sent_indicator);
                debug!(count = self.history.len(), "message appended");
                true
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "failed to send message");
                self.notifications
                    .push(Notification::from_error("notify.send_failed", &err));
                false
            }
        }
    }

    pub async fn on_key(&mut self, key: Key) -> bool {
        match key {
            Key::Enter => self.submit_draft().await,
            Key::Other => false,
        }
    }

    pub async fn start_new_chat(&mut self) -> Option<Navigation> {
        match self.gateway.start_new_chat(&self.session).await {
            Ok(()) => {
                info!("new chat started");
                self.history.clear();
                self.draft.clear();
                self.sent_indicator_until = None;
                Some(Navigation::Chat)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "failed to create chat session");
                self.notifications
                    .push(Notification::from_error("notify.new_chat_failed", &err));
                None
            }
        }
    }

    pub async fn logout(&mut self) -> Option<Navigation> {
        match self.gateway.logout(&self.session).await {
            Ok(()) => {
                info!("logged out");
                self.history.clear();
                self.draft.clear();
                self.sent_indicator_until = None;
                self.session = SessionContext::anonymous();
                Some(Navigation::Login)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "logout failed");
                self.notifications
                    .push(Notification::from_error("notify.logout_failed", &err));
                None
            }
        }
    }
}
