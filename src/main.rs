use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tts_chat::config::FeedBackend;
use tts_chat::feed::Backoff;
use tts_chat::input::{self, InputCommand};
use tts_chat::{
    clipboard, create_router, Action, AppState, ChatSession, Config, LogServer, MemoryLog,
    NatsLog, RemoteLog, SessionConfig, SessionHandle, SpeechEngineFactory,
};

#[derive(Parser)]
#[command(name = "tts-chat", version, about = "Group chat that reads new messages aloud")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/tts-chat")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the chat in this terminal
    Join {
        /// Join immediately with this username
        #[arg(long)]
        username: Option<String>,
    },
    /// Host the message log on NATS
    LogServer {
        /// Records kept in memory
        #[arg(long, default_value_t = 1000)]
        retain: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Commands::Join { username } => join(cfg, username).await,
        Commands::LogServer { retain } => serve_log(cfg, retain).await,
    }
}

async fn serve_log(cfg: Config, retain: usize) -> Result<()> {
    let backoff = Backoff::from_config(&cfg.feed);
    let url = cfg.feed.nats_url.as_str();
    let client = backoff
        .retry("NATS connect", move || async move {
            async_nats::connect(url)
                .await
                .context("Failed to connect to NATS")
        })
        .await?;

    let server = LogServer::new(
        client,
        &cfg.feed.subject_prefix,
        MemoryLog::new(retain),
        cfg.feed.history_limit,
    );
    server.run().await
}

async fn join(cfg: Config, username: Option<String>) -> Result<()> {
    let log: Arc<dyn RemoteLog> = match cfg.feed.backend {
        FeedBackend::Nats => Arc::new(
            NatsLog::connect_with_backoff(
                &cfg.feed.nats_url,
                &cfg.feed.subject_prefix,
                &Backoff::from_config(&cfg.feed),
            )
            .await?,
        ),
        FeedBackend::Memory => Arc::new(MemoryLog::default()),
    };
    let engine = SpeechEngineFactory::create(&cfg.speech)?;
    let clipboard = clipboard::from_config(&cfg.clipboard);

    let session = ChatSession::new(SessionConfig::from_config(&cfg), log, engine, clipboard)
        .start()
        .await?;

    if cfg.service.http.enabled {
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP API on {}", addr))?;
        info!("HTTP API listening on {}", addr);

        let router = create_router(AppState::new(session.clone()));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!("HTTP API stopped: {}", e);
            }
        });
    }

    if let Some(name) = username {
        if let Err(e) = session.dispatch(Action::SetUsername(name)).await {
            eprintln!("! {}", e);
        }
    }

    let printer = tokio::spawn(print_frames(session.clone()));
    read_input(&session).await?;

    printer.abort();
    session.shutdown().await
}

/// Redraw the terminal after every published frame
async fn print_frames(session: SessionHandle) {
    let mut frames = session.subscribe_frames();
    loop {
        {
            let frame = frames.borrow_and_update();
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "\x1b[2J\x1b[H{}", *frame);
            let _ = stdout.flush();
        }
        if frames.changed().await.is_err() {
            break;
        }
    }
}

async fn read_input(session: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match input::parse_line(&line, session.view().joined) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("! {}", e);
                continue;
            }
        };

        let result = match command {
            InputCommand::Join(name) => session.dispatch(Action::SetUsername(name)).await,
            InputCommand::Send(text) => session.send_text(text).await,
            InputCommand::Apply(action) => session.dispatch(action).await,
            InputCommand::Upload(path) => session.upload_media(path).await,
            InputCommand::Help => {
                eprintln!("{}", input::HELP);
                Ok(())
            }
            InputCommand::Quit => break,
        };

        if let Err(e) = result {
            eprintln!("! {}", e);
        }
    }

    Ok(())
}
