//! Lisa - a companion chat core
//!
//! Terminal front end over the conversation runtime: reads lines from stdin,
//! streams replies to stdout and logs JSON to stderr.

mod accumulator;
mod artifact;
mod attachment;
mod config;
mod highlight;
mod llm;
mod runtime;
mod session;
mod state_machine;
mod system_prompt;

use attachment::{AttachmentError, FileUpload};
use config::LisaConfig;
use highlight::{highlight, Markup};
use llm::{CompletionProvider, LoggingProvider, ReplayProvider, DEMO_TRANSCRIPT};
use runtime::{spawn_conversation, ConversationHandle, UiEvent};
use session::{action, MessageRole, Session};
use state_machine::ConvContext;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Commands: /attach <path>, /study <path>, /close, /log, /export, /reset, /quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lisa=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = LisaConfig::from_env()?;

    let replay = match &config.replay_file {
        Some(path) => ReplayProvider::from_file(path, config.chunk_delay).await?,
        None => ReplayProvider::from_transcript(DEMO_TRANSCRIPT, config.chunk_delay),
    };
    let replay = match &config.model {
        Some(model) => replay.with_model_id(model.as_str()),
        None => replay,
    };
    let provider = Arc::new(LoggingProvider::new(Arc::new(replay)));

    let context = ConvContext::new(uuid::Uuid::new_v4().to_string(), provider.model_id());
    tracing::info!(conv_id = %context.conversation_id, model = %context.model_id, "Lisa starting");

    let handle = spawn_conversation(context, provider, Session::new(config.greeting.clone()));

    for message in handle.snapshot().await.history {
        println!("lisa> {}", message.content);
    }
    println!("{HELP}");

    let renderer = tokio::spawn(render(handle.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            command => run_command(&handle, &config, command).await?,
        }
    }

    // Input is over but a reply may still be streaming. Once the runtime
    // stops, the renderer has printed everything and returns.
    handle.wait_idle().await?;
    drop(handle);
    renderer.await?;

    tracing::info!("Lisa stopped");
    Ok(())
}

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Chat(&'a str),
    Attach(Option<&'a str>),
    Study(Option<&'a str>),
    Close,
    Log,
    Export,
    Reset,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Command::Chat(line);
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (command, None),
        };

        match name {
            "attach" => Command::Attach(arg),
            "study" => Command::Study(arg),
            "close" => Command::Close,
            "log" => Command::Log,
            "export" => Command::Export,
            "reset" => Command::Reset,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(name),
        }
    }
}

async fn run_command(
    handle: &ConversationHandle,
    config: &LisaConfig,
    command: Command<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Chat(text) => handle.submit(text)?,
        Command::Attach(path) => match read_upload(path, config.max_attachment_bytes).await {
            Ok(upload) => match handle.import_upload(upload)? {
                Some(attachment) => println!("(attached {})", attachment.name),
                None => println!("(no file selected)"),
            },
            Err(e) => report_read_error(path, &e),
        },
        Command::Study(path) => match read_upload(path, config.max_attachment_bytes).await {
            Ok(upload) => match handle.load_study(upload)? {
                Some(attachment) => {
                    println!("(studying {})", attachment.name);
                    handle.begin_study(attachment)?;
                }
                None => println!("(no file selected)"),
            },
            Err(e) => report_read_error(path, &e),
        },
        Command::Close => handle.close_artifact()?,
        Command::Log => {
            for entry in handle.snapshot().await.action_log {
                println!(
                    "[{}] {}: {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.action,
                    entry.details
                );
            }
        }
        Command::Export => {
            let session = handle.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::Reset => handle.reset()?,
        Command::Unknown(name) => println!("Unknown command /{name}. {HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// No path means nothing was selected
async fn read_upload(
    path: Option<&str>,
    max_bytes: u64,
) -> Result<Option<FileUpload>, AttachmentError> {
    match path {
        Some(path) => attachment::read_upload(Path::new(path), max_bytes)
            .await
            .map(Some),
        None => Ok(None),
    }
}

fn report_read_error(path: Option<&str>, error: &AttachmentError) {
    let path = path.unwrap_or_default();
    tracing::warn!(path = %path, error = %error, "Failed to read attachment");
    println!("(could not attach {path}: {error})");
}

/// Print UI events as they arrive, until the runtime stops
async fn render(events: mpsc::UnboundedReceiver<UiEvent>) {
    let mut events = UnboundedReceiverStream::new(events);
    let mut printed = String::new();
    while let Some(event) = events.next().await {
        render_event(event, &mut printed);
    }
}

/// `printed` is what is already on screen of the streaming reply
fn render_event(event: UiEvent, printed: &mut String) {
    match event {
        UiEvent::MessageAppended { message } => {
            if message.role == MessageRole::Assistant {
                print!("lisa> {}", message.content);
                printed.clone_from(&message.content);
            }
        }
        UiEvent::MessageUpdated { content, .. } => {
            match content.strip_prefix(printed.as_str()) {
                Some(rest) => print!("{rest}"),
                // Rewritten rather than extended
                None => print!("\nlisa> {content}"),
            }
            *printed = content;
        }
        UiEvent::StudyProgress { chars } => print!("\r(analyzing... {chars} chars)"),
        UiEvent::ArtifactShown { artifact } => {
            println!();
            println!("=== {} [{}] ===", artifact.title, artifact.kind);
            println!("{}", highlight(&artifact.content, Markup::Ansi));
            println!("=== end of {} ===", artifact.title);
        }
        UiEvent::ArtifactClosed => println!("(artifact closed)"),
        UiEvent::Logged { entry } => {
            if entry.action == action::ERROR {
                println!("\n(!) {}", entry.details);
            }
        }
        UiEvent::SessionReset => println!("(conversation cleared)"),
        UiEvent::Done => {
            println!();
            printed.clear();
        }
        UiEvent::StateChanged { state } => {
            tracing::debug!(state = state.name(), "State");
        }
    }
    let _ = std::io::stdout().flush();
}
