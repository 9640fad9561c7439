use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{EngineSession, SessionOptions};
use shared::{protocol::ServerMessage, timing::ActionTiming};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod store;

use store::FileProjectStore;

#[derive(Parser, Debug)]
#[command(about = "Drive a scene engine from the terminal")]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct TimingArgs {
    /// Apply at an absolute beat.
    #[arg(long, conflicts_with_all = ["next_beat", "immediate"])]
    at_beat: Option<f64>,
    #[arg(long, conflicts_with = "immediate")]
    next_beat: bool,
    #[arg(long)]
    immediate: bool,
}

impl TimingArgs {
    /// `None` leaves the choice to the command's default.
    fn timing(&self) -> Option<ActionTiming> {
        if let Some(beat) = self.at_beat {
            Some(ActionTiming::at_beat(beat))
        } else if self.next_beat {
            Some(ActionTiming::at_next_beat())
        } else if self.immediate {
            Some(ActionTiming::immediate())
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Start(TimingArgs),
    Stop(TimingArgs),
    Tempo {
        bpm: f64,
        #[command(flatten)]
        timing: TimingArgs,
    },
    Chat { message: String },
    /// Print inbound engine messages until interrupted.
    Watch,
    /// Capture the engine snapshot into the project directory.
    Save {
        name: String,
        #[arg(long, default_value_t = 5)]
        wait_secs: u64,
    },
    /// Send a stored snapshot back to the engine.
    Restore { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(username) = args.username {
        settings.username = username;
    }

    let store = FileProjectStore::new(settings.default_project_dir.clone());

    let session = EngineSession::connect(
        &settings.server_url,
        SessionOptions {
            drag_threshold: settings.drag_threshold,
        },
    )
    .await
    .with_context(|| format!("failed to connect to {}", settings.server_url))?;
    let dispatcher = session.dispatcher();
    dispatcher
        .set_name(settings.username.clone())
        .await
        .context("engine refused display name")?;
    info!(server = %settings.server_url, username = %settings.username, "cli: connected");

    match args.command {
        Command::Start(timing) => dispatcher.transport_start(timing.timing()).await?,
        Command::Stop(timing) => dispatcher.transport_stop(timing.timing()).await?,
        Command::Tempo { bpm, timing } => dispatcher.set_tempo(bpm, timing.timing()).await?,
        Command::Chat { message } => dispatcher.send_chat(message).await?,
        Command::Watch => watch(&session).await?,
        Command::Save { name, wait_secs } => {
            session
                .save_project(&store, &name, Duration::from_secs(wait_secs))
                .await?;
            println!("Saved snapshot to {}", store.project_path(&name)?.display());
        }
        Command::Restore { name } => {
            session.load_project(&store, &name).await?;
            println!("Restored {name}");
        }
    }

    Ok(())
}

async fn watch(session: &EngineSession) -> Result<()> {
    let subscription = session.subscribe(Arc::new(|message: &ServerMessage| {
        match serde_json::to_string(message) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("unprintable message: {err}"),
        }
    }));
    session.dispatcher().get_clock().await?;
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    subscription.unsubscribe();
    Ok(())
}
