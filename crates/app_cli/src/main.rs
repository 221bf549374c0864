use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use std::{fs, io::Write};

use anyhow::{Context, Result};
use config::{ClientConfig, ConfigStore};
use core_types::{SessionContext, SessionGateway, UploadCandidate};
use gateway_http::HttpSessionGateway;
use i18n::I18n;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use view_models::{
    ChatSidebarViewModel, ChatViewModel, DocumentPickerViewModel, Key, Navigation, Notification,
    OpStatus, UploadViewModel,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Login { username: String, password: String },
    Register { username: String, email: String, password: String },
    Upload(Vec<PathBuf>),
    Files,
    Remove(usize),
    Send,
    Docs,
    Select(String),
    Load,
    History,
    NewChat,
    Logout,
    Help,
    Quit,
    Say(String),
    Invalid(&'static str),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (name, args.as_slice()) {
        ("login", [username, password]) => Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        },
        ("login", _) => Command::Invalid("/login <username> <password>"),
        ("register", [username, email, password]) => Command::Register {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        },
        ("register", _) => Command::Invalid("/register <username> <email> <password>"),
        ("upload", []) => Command::Invalid("/upload <path>..."),
        ("upload", paths) => Command::Upload(paths.iter().map(PathBuf::from).collect()),
        ("files", _) => Command::Files,
        ("remove", [index]) => match index.parse::<usize>() {
            Ok(index) if index > 0 => Command::Remove(index),
            _ => Command::Invalid("/remove <n>"),
        },
        ("remove", _) => Command::Invalid("/remove <n>"),
        ("send", _) => Command::Send,
        ("docs", _) => Command::Docs,
        ("select", [id]) => Command::Select(id.to_string()),
        ("select", _) => Command::Invalid("/select <document id>"),
        ("load", _) => Command::Load,
        ("history", _) => Command::History,
        ("new", _) => Command::NewChat,
        ("logout", _) => Command::Logout,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Help,
    }
}

struct DocChatApp {
    page: Navigation,
    i18n: I18n,
    gateway: Arc<dyn SessionGateway>,
    chat: ChatViewModel,
    picker: DocumentPickerViewModel,
    upload: UploadViewModel,
    sidebar: ChatSidebarViewModel,
}

impl DocChatApp {
    fn new(config: &ClientConfig, gateway: Arc<dyn SessionGateway>) -> Self {
        let session = SessionContext::anonymous();
        Self {
            page: Navigation::Login,
            i18n: I18n::new(config.language),
            chat: ChatViewModel::new(gateway.clone(), session.clone())
                .with_sent_indicator(config.chat.sent_indicator()),
            picker: DocumentPickerViewModel::new(gateway.clone(), session.clone()),
            upload: UploadViewModel::new(gateway.clone(), session.clone()),
            sidebar: ChatSidebarViewModel::new(gateway.clone(), session),
            gateway,
        }
    }

    fn set_session(&mut self, session: SessionContext) {
        self.chat.set_session(session.clone());
        self.picker.set_session(session.clone());
        self.upload.set_session(session.clone());
        self.sidebar.set_session(session);
    }

    async fn navigate(&mut self, to: Navigation) {
        info!(?to, "navigate");
        self.page = to;
        if to == Navigation::Chat {
            self.chat.load_history().await;
            self.picker.refresh_documents().await;
            self.sidebar.refresh().await;
            self.render_sidebar();
            self.render_history();
            println!("{}", self.i18n.t("chat.placeholder"));
        }
    }

    /// Returns `false` when the user asked to quit.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Login { username, password } => {
                match self.gateway.login(&username, &password).await {
                    Ok(session) => {
                        self.set_session(session);
                        println!("{}", self.i18n.t("auth.logged_in"));
                        self.navigate(Navigation::Upload).await;
                    }
                    Err(err) => {
                        warn!(kind = err.kind(), error = %err, "login failed");
                        self.show(&[Notification::new("notify.auth_failed", err.to_string())]);
                    }
                }
            }
            Command::Register {
                username,
                email,
                password,
            } => match self.gateway.register(&username, &email, &password).await {
                Ok(()) => println!("{}", self.i18n.t("auth.registered")),
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "registration failed");
                    self.show(&[Notification::new("notify.auth_failed", err.to_string())]);
                }
            },
            Command::Upload(paths) => {
                for path in paths {
                    match UploadCandidate::from_path(&path).await {
                        Ok(candidate) => {
                            self.upload.add_file(candidate);
                        }
                        Err(err) => {
                            warn!(path = %path.display(), "cannot stage file: {err:#}");
                            self.show(&[Notification::new(
                                "notify.file_unreadable",
                                format!("{err:#}"),
                            )]);
                        }
                    }
                }
                self.render_files();
            }
            Command::Files => self.render_files(),
            Command::Remove(index) => {
                let id = self.upload.candidates().get(index - 1).map(|c| c.id);
                if let Some(id) = id {
                    self.upload.remove_file(id);
                }
                self.render_files();
            }
            Command::Send => {
                if let Some(to) = self.upload.submit_upload().await {
                    println!("{}", self.i18n.t("upload.done"));
                    self.navigate(to).await;
                }
                let notes = self.upload.take_notifications();
                self.show(&notes);
                if self.upload.status() == OpStatus::Failed {
                    self.render_files();
                }
            }
            Command::Docs => {
                self.picker.refresh_documents().await;
                let notes = self.picker.take_notifications();
                self.show(&notes);
                if self.picker.list_status() != OpStatus::Failed {
                    self.render_documents();
                }
            }
            Command::Select(id) => {
                self.picker.select_document(id);
                self.render_documents();
            }
            Command::Load => {
                self.picker.load_selected_text().await;
                let notes = self.picker.take_notifications();
                self.show(&notes);
                if self.picker.text_status() != OpStatus::Failed
                    && let Some(text) = self.picker.loaded_text()
                {
                    println!("{}:\n{text}", self.i18n.t("docs.content"));
                }
            }
            Command::History => {
                self.chat.load_history().await;
                self.render_history();
            }
            Command::NewChat => {
                if let Some(to) = self.chat.start_new_chat().await {
                    self.picker.clear();
                    self.navigate(to).await;
                }
            }
            Command::Logout => {
                if let Some(to) = self.chat.logout().await {
                    self.set_session(SessionContext::anonymous());
                    self.picker.clear();
                    self.navigate(to).await;
                }
            }
            Command::Help => println!("{}", self.i18n.t("app.help")),
            Command::Quit => return false,
            Command::Invalid(usage) => println!("usage: {usage}"),
            Command::Say(text) => {
                self.chat.set_draft(text);
                if !self.chat.can_send() {
                    println!("{}", self.i18n.t("chat.placeholder"));
                } else if self.chat.on_key(Key::Enter).await {
                    self.chat.take_focus_request();
                    self.render_last_message();
                }
            }
        }

        let notes = self.chat.take_notifications();
        self.show(&notes);
        true
    }

    fn show(&self, notes: &[Notification]) {
        for note in notes {
            eprintln!("! {}", self.i18n.describe(note.key, &note.detail));
        }
    }

    fn render_history(&mut self) {
        let notes = self.chat.take_notifications();
        self.show(&notes);
        if self.chat.history().is_empty() && self.chat.history_status() != OpStatus::Failed {
            println!("{}", self.i18n.t("chat.empty"));
        }
        for message in self.chat.history() {
            println!("> {}\n< {}", message.question, message.response);
        }
    }

    fn render_last_message(&self) {
        if let Some(message) = self.chat.history().last() {
            println!("< {}", message.response);
            if let Some(sources) = message.source_file_names.as_deref()
                && !sources.is_empty()
            {
                println!("  [{}]", sources.join(", "));
            }
        }
        if self.chat.sent_indicator_visible(Instant::now()) {
            println!("  ({})", self.i18n.t("chat.sent"));
        }
    }

    fn render_documents(&self) {
        if self.picker.documents().is_empty() {
            println!("{}", self.i18n.t("docs.empty"));
        }
        for doc in self.picker.documents() {
            let marker = if self.picker.selected_id() == Some(doc.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!("{marker} {}  {}", doc.id, doc.filename);
        }
    }

    fn render_sidebar(&mut self) {
        let notes = self.sidebar.take_notifications();
        self.show(&notes);
        println!("{}", self.i18n.t("sidebar.title"));
        if self.sidebar.status() == OpStatus::Failed {
            return;
        }
        for entry in self.sidebar.entries() {
            let when = entry
                .parsed_timestamp()
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| entry.timestamp.clone());
            println!("  {}  ({when})", entry.question);
        }
    }

    fn render_files(&self) {
        println!("{}", self.i18n.t("upload.ready"));
        for (index, file) in self.upload.candidates().iter().enumerate() {
            println!(
                "  {}. [{}] {} {}B",
                index + 1,
                file.kind(),
                file.name,
                file.size_bytes
            );
        }
    }
}

async fn run(config: ClientConfig) -> Result<()> {
    let gateway = HttpSessionGateway::with_options(
        config.backend.base_url.clone(),
        config.backend.request_timeout(),
        &config.backend.user_agent,
    )?;
    info!(base_url = gateway.base_url(), "backend gateway ready");

    let mut app = DocChatApp::new(&config, Arc::new(gateway));
    println!("{}", app.i18n.t("app.title"));
    println!("{}", app.i18n.t("app.help"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", page_label(app.page));
        std::io::stdout().flush().context("failed to flush stdout")?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if !app.handle(parse_command(&line)).await {
            break;
        }
    }
    Ok(())
}

fn page_label(page: Navigation) -> &'static str {
    match page {
        Navigation::Login => "login",
        Navigation::Chat => "chat",
        Navigation::Upload => "upload",
    }
}

fn main() {
    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.push("docchat");
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"));

    let config_store = ConfigStore::from_default_location()
        .unwrap_or_else(|_| ConfigStore::from_dir(data_dir.join("config")));
    let config = match config_store.load_or_init() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config from {}: {err:#}", config_store.path().display());
            eprintln!("failed to load config: {err:#}");
            return;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to create tokio runtime: {err}");
            return;
        }
    };

    if let Err(err) = runtime.block_on(run(config)) {
        error!("docchat exited with error: {err:#}");
        eprintln!("{err:#}");
    }
}

const DEFAULT_LOG_FILTER: &str = "info,app_cli=debug,view_models=debug,gateway_http=debug";

fn init_local_logger(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "docchat.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
