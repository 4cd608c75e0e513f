use std::sync::Arc;

use anyhow::Result;
use chatpoll_core::{ChatApiClient, ChatUiState, ChatWidget, Config, WidgetEvent};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

mod app;
mod commands;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chatpoll")]
#[command(version, about = "Terminal chat client that polls a chat backend's message log")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "CHATPOLL_URL", global = true)]
    base_url: Option<String>,

    /// History poll interval in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the server's message log
    History {
        /// Only show the last N messages
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Send one prompt and print the reply
    Send {
        /// Your prompt
        prompt: String,
        /// Send as this user id instead of a fresh one
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Start a server-side traffic generation job
    Traffic {
        /// Number of requests (at most 50)
        #[arg(short = 'n', long)]
        requests: Option<u32>,
        /// Seconds between requests
        #[arg(short, long)]
        delay: Option<u32>,
    },
    /// Check backend health
    Health,
    /// Show the effective configuration
    Config {
        /// Persist it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {e}, using defaults");
        Config::new()
    });
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    config.validate()?;

    let Some(command) = cli.command else {
        logging::init_file();
        return run_tui(config).await;
    };

    logging::init_stderr();
    let client = ChatApiClient::with_timeout(&config.base_url, config.request_timeout())?;

    match command {
        Commands::History { limit } => commands::history(&client, limit).await?,
        Commands::Send { prompt, user_id } => commands::send(&client, &prompt, user_id).await?,
        Commands::Traffic { requests, delay } => {
            commands::traffic(&client, &config, requests, delay).await?
        }
        Commands::Health => commands::health(&client).await?,
        Commands::Config { save } => commands::show_config(&config, save)?,
    }

    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    let client = Arc::new(ChatApiClient::with_timeout(
        &config.base_url,
        config.request_timeout(),
    )?);
    let state = ChatUiState::new();
    info!(base_url = %config.base_url, user_id = %state.user_id(), "starting chatpoll");

    let (widget, mut widget_events) = ChatWidget::new(client, config, state);
    let mut app = App::new(widget);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run_loop(&mut terminal, &mut app, &mut widget_events).await;

    app.widget.shutdown();
    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut Tui,
    app: &mut App,
    widget_events: &mut mpsc::UnboundedReceiver<WidgetEvent>,
) -> Result<()> {
    let mut events = EventHandler::new();
    app.widget.start();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(event) = widget_events.recv() => app.widget.handle(event),
            else => break,
        }
    }

    Ok(())
}
