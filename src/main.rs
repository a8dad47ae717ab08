use clap::Parser;
use skein::cli::Cli;
use skein::config::Config;
use skein::conversation::{Conversation, ConversationEvent, TurnOutcome};
use skein::promotion::{Navigate, Promotion, maybe_promote};
use skein::provider::{HttpCompletionClient, HttpTitleClient, registry};
use skein::session::SessionStore;
use skein::storage::FileStorage;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    if cli.list_models {
        for model in registry::models() {
            println!("{}  ({} / {})", model.label, model.id, model.provider);
        }
        return ExitCode::SUCCESS;
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints where the conversation landed once it becomes a session.
struct CliNavigator;

impl Navigate for CliNavigator {
    fn go_to_session(&self, id: &str) {
        println!("(saved as session {id})");
    }
}

async fn run(cli: Cli, config: Config) -> skein::Result<()> {
    let storage = Arc::new(FileStorage::new(&config.data_dir)?);
    let mut store = SessionStore::open(storage)?;

    if cli.sessions {
        for session in store.sessions() {
            println!(
                "{}  {}  [{}]  {} messages",
                session.id,
                session.title,
                session.model,
                session.messages.len()
            );
        }
        return Ok(());
    }

    let api_key = config.api_key.clone().unwrap_or_default();
    let api = Arc::new(HttpCompletionClient::new(&config.base_url, &api_key));
    let titles = HttpTitleClient::new(&config.base_url, &api_key);
    let model = cli.model.unwrap_or_else(|| config.default_model.clone());

    let mut conversation = Conversation::new(api, model).with_throttle(config.throttle());
    let navigator = CliNavigator;
    let mut current_session: Option<String> = None;

    let (tx, mut rx) = mpsc::channel(256);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ConversationEvent::Delta(text) => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                ConversationEvent::Completed(_) => println!(),
                ConversationEvent::Stopped => println!("\n[stopped]"),
                ConversationEvent::Failed(e) => eprintln!("\n[error] {e}"),
            }
        }
    });

    println!("Chatting with {} (/reload, /sessions, /quit)", conversation.model_label());
    prompt();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }

        let outcome = match line {
            "/quit" => break,
            "/sessions" => {
                for session in store.sessions() {
                    println!("{}  {}", session.id, session.title);
                }
                prompt();
                continue;
            }
            "/reload" => conversation.reload(&tx).await,
            text => conversation.append(text, &tx).await,
        };

        if matches!(outcome, TurnOutcome::Completed(_)) {
            if let Some(id) = &current_session {
                store.update_session(id, conversation.messages().to_vec(), None)?;
            } else {
                match maybe_promote(&mut conversation, &mut store, &titles, &navigator).await {
                    Ok(Promotion::Created(id)) => current_session = Some(id),
                    Ok(Promotion::Skipped) => {}
                    Err(e) => eprintln!("Could not save session: {e}"),
                }
            }
        }
        prompt();
    }

    drop(tx);
    let _ = printer.await;
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
