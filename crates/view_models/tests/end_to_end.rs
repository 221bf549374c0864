use std::sync::Arc;

use core_types::{Message, SessionContext, SessionGateway, UploadCandidate};
use gateway_http::HttpSessionGateway;
use serde_json::json;
use view_models::{ChatViewModel, DocumentPickerViewModel, Navigation, UploadViewModel};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

async fn backend() -> (MockServer, Arc<dyn SessionGateway>) {
    init_tracing();
    let server = MockServer::start().await;
    let gateway: Arc<dyn SessionGateway> = Arc::new(HttpSessionGateway::new(server.uri()));
    (server, gateway)
}

fn session() -> SessionContext {
    SessionContext::with_cookie("session=e2e")
}

#[tokio::test]
async fn answered_question_lands_in_history() {
    let (server, gateway) = backend().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"user-message": "what is the answer"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "42"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = ChatViewModel::new(gateway, session());
    chat.set_draft("what is the answer");
    assert!(chat.submit_draft().await);

    assert_eq!(chat.history(), &[Message::new("what is the answer", "42")]);
    assert_eq!(chat.draft(), "");
}

#[tokio::test]
async fn missing_document_never_becomes_text() {
    let (server, gateway) = backend().await;
    Mock::given(method("GET"))
        .and(path("/read_document/7"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let mut picker = DocumentPickerViewModel::new(gateway, session());
    picker.select_document("7");
    picker.load_selected_text().await;

    assert_eq!(picker.loaded_text(), None);
    let notes = picker.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].key, "notify.document_text_failed");
    assert_eq!(notes[0].detail, "not found");
}

#[tokio::test]
async fn history_reload_follows_latest_payload() {
    let (server, gateway) = backend().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chat_history": [{"question": "a", "response": "1", "source": []}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chat_history": [{"question": "b", "response": "2", "source": []}]
        })))
        .mount(&server)
        .await;

    let mut chat = ChatViewModel::new(gateway, session());
    chat.load_history().await;
    chat.load_history().await;

    assert_eq!(chat.history().len(), 1);
    assert_eq!(chat.history()[0].question, "b");
}

#[tokio::test]
async fn empty_upload_sends_nothing() {
    let (server, gateway) = backend().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut upload = UploadViewModel::new(gateway, session());
    assert_eq!(upload.submit_upload().await, None);
}

#[tokio::test]
async fn uploaded_files_are_not_listed_until_refresh() {
    let (server, gateway) = backend().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_documents"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "1", "filename": "a.pdf"}])),
        )
        .mount(&server)
        .await;

    let mut upload = UploadViewModel::new(gateway.clone(), session());
    let mut picker = DocumentPickerViewModel::new(gateway, session());
    upload.add_file(UploadCandidate::from_bytes(
        "a.pdf",
        "application/pdf",
        b"%PDF".to_vec(),
    ));

    assert_eq!(upload.submit_upload().await, Some(Navigation::Chat));
    assert!(upload.candidates().is_empty());
    assert!(picker.documents().is_empty());

    picker.refresh_documents().await;
    assert_eq!(picker.documents().len(), 1);
}
