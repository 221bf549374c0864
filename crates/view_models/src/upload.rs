use std::sync::Arc;

use core_types::{CandidateId, SessionContext, SessionGateway, UploadCandidate};
use tracing::{info, warn};

use crate::{Navigation, Notification, Notifications, OpStatus};

pub struct UploadViewModel {
    gateway: Arc<dyn SessionGateway>,
    session: SessionContext,
    candidates: Vec<UploadCandidate>,
    status: OpStatus,
    notifications: Notifications,
}

impl UploadViewModel {
    pub fn new(gateway: Arc<dyn SessionGateway>, session: SessionContext) -> Self {
        Self {
            gateway,
            session,
            candidates: Vec::new(),
            status: OpStatus::Idle,
            notifications: Notifications::default(),
        }
    }

    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    pub fn candidates(&self) -> &[UploadCandidate] {
        &self.candidates
    }

    pub fn status(&self) -> OpStatus {
        self.status
    }

    pub fn notifications(&self) -> &[Notification] {
        self.notifications.peek()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.take()
    }

    /// Duplicates are kept; each candidate has its own id.
    pub fn add_file(&mut self, candidate: UploadCandidate) -> CandidateId {
        let id = candidate.id;
        self.candidates.push(candidate);
        id
    }

    pub fn remove_file(&mut self, id: CandidateId) -> Option<UploadCandidate> {
        let index = self.candidates.iter().position(|c| c.id == id)?;
        Some(self.candidates.remove(index))
    }

    pub async fn submit_upload(&mut self) -> Option<Navigation> {
        if self.candidates.is_empty() {
            return None;
        }

        self.status = OpStatus::Loading;
        let result = self
            .gateway
            .upload_files(&self.session, &self.candidates)
            .await;
        self.status = OpStatus::settled(&result);

        match result {
            Ok(()) => {
                info!(count = self.candidates.len(), "files uploaded");
                self.candidates.clear();
                Some(Navigation::Chat)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "upload failed");
                self.notifications
                    .push(Notification::from_error("notify.upload_failed", &err));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core_types::GatewayError;

    use super::*;
    use crate::tests::FakeGateway;

    fn pdf(name: &str) -> UploadCandidate {
        UploadCandidate::from_bytes(name, "application/pdf", b"%PDF".to_vec())
    }

    fn upload(gateway: &Arc<FakeGateway>) -> UploadViewModel {
        UploadViewModel::new(gateway.clone(), SessionContext::with_cookie("session=t"))
    }

    #[test]
    fn add_then_remove_restores_list() {
        let gateway = Arc::new(FakeGateway::default());
        let mut vm = upload(&gateway);
        vm.add_file(pdf("a.pdf"));
        let before: Vec<CandidateId> = vm.candidates().iter().map(|c| c.id).collect();

        let id = vm.add_file(pdf("b.pdf"));
        let removed = vm.remove_file(id).expect("removed");
        assert_eq!(removed.name, "b.pdf");

        let after: Vec<CandidateId> = vm.candidates().iter().map(|c| c.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn duplicates_are_removed_individually() {
        let gateway = Arc::new(FakeGateway::default());
        let mut vm = upload(&gateway);
        let first = vm.add_file(pdf("same.pdf"));
        let second = vm.add_file(pdf("same.pdf"));
        assert_eq!(vm.candidates().len(), 2);

        vm.remove_file(first);
        assert_eq!(vm.candidates().len(), 1);
        assert_eq!(vm.candidates()[0].id, second);
        assert!(vm.remove_file(first).is_none());
    }

    #[tokio::test]
    async fn empty_submit_issues_no_request() {
        let gateway = Arc::new(FakeGateway::default());
        let mut vm = upload(&gateway);
        assert_eq!(vm.submit_upload().await, None);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_upload_clears_and_navigates() {
        let gateway = Arc::new(FakeGateway::default());
        let mut vm = upload(&gateway);
        vm.add_file(pdf("a.pdf"));
        vm.add_file(pdf("b.pdf"));

        assert_eq!(vm.submit_upload().await, Some(Navigation::Chat));
        assert!(vm.candidates().is_empty());
        assert_eq!(gateway.uploaded(), vec![vec!["a.pdf".to_string(), "b.pdf".to_string()]]);
    }

    #[tokio::test]
    async fn failed_upload_keeps_candidates() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.upload_with(Err(GatewayError::Upload { status: 500 }));
        let mut vm = upload(&gateway);
        vm.add_file(pdf("a.pdf"));

        assert_eq!(vm.submit_upload().await, None);
        assert_eq!(vm.candidates().len(), 1);
        assert_eq!(vm.status(), OpStatus::Failed);
        assert_eq!(vm.take_notifications()[0].key, "notify.upload_failed");

        gateway.upload_with(Ok(()));
        assert_eq!(vm.submit_upload().await, Some(Navigation::Chat));
        assert_eq!(vm.status(), OpStatus::Idle);
    }
}
