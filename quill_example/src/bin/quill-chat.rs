use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quill_example::{Config, ConsoleHost};
use quill_llm::{ChatMessage, ChatSession, OpenAIClient};

const QUIT_COMMAND: &str = "/quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!(model = %config.llm.model, stream = config.llm.stream, "Starting quill chat");

    let client = OpenAIClient::from_config(config.client_config())?;
    let session = Arc::new(ChatSession::new(client));

    // Ctrl-C stops the reply in progress, or leaves when idle
    let stopper = session.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !stopper.stop() {
                eprintln!();
                std::process::exit(0);
            }
        }
    });

    let params = config.llm.request_params();
    let mode = config.llm.reply_mode();
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut host = ConsoleHost::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type a message, {} to leave. Ctrl-C stops a reply.", QUIT_COMMAND);
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == QUIT_COMMAND {
            break;
        }

        let message = ChatMessage::user(line);
        // Failures were already reported through the host
        if let Err(e) = session.send(&history, &message, &params, mode, &mut host).await {
            tracing::debug!(error = %e, "request finished with an error");
        }

        history.push(message);
        history.extend(host.take_appended());
    }

    tracing::info!(messages = history.len(), "Chat ended");
    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so they never interleave with streamed replies
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
