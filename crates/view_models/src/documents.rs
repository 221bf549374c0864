use std::sync::Arc;

use core_types::{Document, SessionContext, SessionGateway};
use tracing::{debug, error, warn};

use crate::{Notification, Notifications, OpStatus};

pub struct DocumentPickerViewModel {
    gateway: Arc<dyn SessionGateway>,
    session: SessionContext,
    documents: Vec<Document>,
    selected_id: Option<String>,
    loaded_text: Option<String>,
    list_status: OpStatus,
    text_status: OpStatus,
    notifications: Notifications,
}

impl DocumentPickerViewModel {
    pub fn new(gateway: Arc<dyn SessionGateway>, session: SessionContext) -> Self {
        Self {
            gateway,
            session,
            documents: Vec::new(),
            selected_id: None,
            loaded_text: None,
            list_status: OpStatus::Idle,
            text_status: OpStatus::Idle,
            notifications: Notifications::default(),
        }
    }

    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&Document> {
        let id = self.selected_id.as_deref()?;
        self.documents.iter().find(|doc| doc.id == id)
    }

    pub fn loaded_text(&self) -> Option<&str> {
        self.loaded_text.as_deref()
    }

    pub fn list_status(&self) -> OpStatus {
        self.list_status
    }

    pub fn text_status(&self) -> OpStatus {
        self.text_status
    }

    pub fn notifications(&self) -> &[Notification] {
        self.notifications.peek()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.take()
    }

    pub async fn refresh_documents(&mut self) {
        self.list_status = OpStatus::Loading;
        let result = self.gateway.list_documents(&self.session).await;
        self.list_status = OpStatus::settled(&result);

        match result {
            Ok(documents) => {
                debug!(count = documents.len(), "documents loaded");
                self.documents = documents;
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "failed to fetch documents");
                self.documents.clear();
                self.notifications
                    .push(Notification::from_error("notify.documents_failed", &err));
            }
        }
    }

    /// Selection is local state only. An empty id clears it.
    pub fn select_document(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.selected_id = (!id.is_empty()).then_some(id);
    }

    pub async fn load_selected_text(&mut self) {
        let Some(document_id) = self.selected_id.clone() else {
            error!("no document selected");
            self.notifications
                .push(Notification::new("notify.no_document_selected", ""));
            return;
        };

        self.text_status = OpStatus::Loading;
        let result = self
            .gateway
            .fetch_document_text(&self.session, &document_id)
            .await;
        self.text_status = OpStatus::settled(&result);

        match result {
            Ok(text) => {
                debug!(document_id = %document_id, len = text.len(), "document text loaded");
                self.loaded_text = Some(text);
            }
            Err(err) => {
                error!(document_id = %document_id, kind = err.kind(), error = %err, "failed to read document");
                self.notifications
                    .push(Notification::from_error("notify.document_text_failed", &err));
            }
        }
    }

    /// Drops the list and any selection, as happens when a new chat starts.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.selected_id = None;
        self.loaded_text = None;
    }
}
