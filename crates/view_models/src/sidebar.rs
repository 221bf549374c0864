use std::sync::Arc;

use core_types::{ChatQuestion, SessionContext, SessionGateway};
use tracing::{info, warn};

use crate::{Notification, Notifications, OpStatus};

/// "Chat History" panel: the latest question of the user's chat.
pub struct ChatSidebarViewModel {
    gateway: Arc<dyn SessionGateway>,
    session: SessionContext,
    entries: Vec<ChatQuestion>,
    status: OpStatus,
    notifications: Notifications,
}

impl ChatSidebarViewModel {
    pub fn new(gateway: Arc<dyn SessionGateway>, session: SessionContext) -> Self {
        Self {
            gateway,
            session,
            entries: Vec::new(),
            status: OpStatus::Idle,
            notifications: Notifications::default(),
        }
    }

    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    pub fn entries(&self) -> &[ChatQuestion] {
        &self.entries
    }

    pub fn status(&self) -> OpStatus {
        self.status
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.take()
    }

    pub async fn refresh(&mut self) {
        self.status = OpStatus::Loading;
        let result = self.gateway.fetch_latest_question(&self.session).await;
        self.status = OpStatus::settled(&result);

        match result {
            Ok(Some(entry)) => self.entries = vec![entry],
            Ok(None) => {
                info!("no question found for this user");
                self.entries.clear();
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "failed to fetch chat questions");
                self.notifications
                    .push(Notification::from_error("notify.questions_failed", &err));
            }
        }
    }
}
