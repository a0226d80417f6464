/// Poolside - terminal player for Poolside FM playlists
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crate::commands::{Command, HELP, VOLUME_STEP};
use crate::config::PoolsideConfig;
use poolside_audio::SymphoniaDecoder;
use poolside_audio_desktop::CpalSink;
use poolside_client::PoolsideClient;
use poolside_playback::{Catalog, PlaybackError, PlaybackSession, Playlist};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "poolside")]
#[command(about = "Play Poolside FM playlists from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./poolside.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List playlists in catalog order
    Playlists,
    /// Play random tracks from a playlist
    Play {
        /// Playlist slug (case-insensitive); random playlist when omitted
        #[arg(short, long)]
        playlist: Option<String>,
        /// Initial volume, 0-120 (100 = unity)
        #[arg(short, long)]
        volume: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poolside=info,poolside_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = PoolsideConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Playlists => list_playlists(&config).await?,
        Commands::Play { playlist, volume } => play(&config, playlist, volume).await?,
    }

    Ok(())
}

async fn list_playlists(config: &PoolsideConfig) -> Result<()> {
    let client = PoolsideClient::new(config.client_config())?;
    let body = client.catalog().await.context("Failed to fetch catalog")?;
    let catalog = Catalog::from_json(&body)?;

    for playlist in catalog.playlists() {
        println!(
            "{:<24} {:<32} {:>4} tracks{}",
            playlist.slug,
            playlist.name,
            playlist.total_tracks,
            if playlist.is_custom { "  (custom)" } else { "" }
        );
    }
    Ok(())
}

async fn play(config: &PoolsideConfig, slug: Option<String>, volume: Option<i32>) -> Result<()> {
    let client = Arc::new(PoolsideClient::new(config.client_config())?);
    let decoder = Arc::new(SymphoniaDecoder::default());
    let sink = Arc::new(
        CpalSink::with_config(config.audio.sample_rate, config.buffer_frames())
            .context("Failed to open audio output")?,
    );
    let session = PlaybackSession::new(client, decoder, sink, config.session_config());

    if let Some(level) = volume {
        session.set_volume(level);
    }

    session.load().await.context("Failed to load catalog")?;
    let playlist = match slug {
        Some(slug) => session
            .lookup_by_slug(&slug)
            .with_context(|| format!("No playlist with slug '{}'", slug))?,
        None => session
            .random_playlist()
            .context("Catalog has too few playlists to pick one at random")?,
    };
    info!(slug = %playlist.slug, tracks = playlist.tracks.len(), "Selected playlist");
    println!("{} ({} tracks)", playlist.name, playlist.tracks.len());
    println!("{}", HELP);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
    play_next(&session, &playlist, &done_tx).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(config.progress_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => handle(&session, &playlist, &done_tx, command).await,
                    None if line.trim().is_empty() => {}
                    None => println!("{}", HELP),
                }
            }
            Some(()) = done_rx.recv() => {
                if let Err(e) = play_next(&session, &playlist, &done_tx).await {
                    warn!(error = %e, "Could not advance to next track");
                }
            }
            _ = ticker.tick() => print_status(&session),
        }
    }

    Ok(())
}

async fn handle(
    session: &PlaybackSession,
    playlist: &Playlist,
    done_tx: &mpsc::UnboundedSender<()>,
    command: Command,
) {
    match command {
        Command::PauseResume => {
            let state = session.pause_resume();
            println!("{:?}", state);
        }
        Command::Next => {
            if let Err(e) = play_next(session, playlist, done_tx).await {
                warn!(error = %e, "Could not play next track");
            }
        }
        Command::VolumeUp => print_volume(session.set_volume(session.volume() + VOLUME_STEP)),
        Command::VolumeDown => print_volume(session.set_volume(session.volume() - VOLUME_STEP)),
        Command::SetVolume(level) => print_volume(session.set_volume(level)),
        Command::Quit => {}
    }
}

/// Play a random track from `playlist`; its natural end signals `done_tx`
async fn play_next(
    session: &PlaybackSession,
    playlist: &Playlist,
    done_tx: &mpsc::UnboundedSender<()>,
) -> Result<()> {
    let track = session.random_track_from(playlist);
    let done = done_tx.clone();

    match session
        .play(track.clone(), move || {
            let _ = done.send(());
        })
        .await
    {
        Ok(()) => {
            if let Some(track) = track {
                println!("Now playing: {} - {}", track.artist, track.title);
            }
            Ok(())
        }
        Err(PlaybackError::Superseded) => Ok(()),
        Err(PlaybackError::InvalidArgument(_)) => {
            anyhow::bail!("Playlist '{}' has too few tracks to pick one", playlist.slug)
        }
        Err(e) => Err(e).context("Playback failed"),
    }
}

fn print_status(session: &PlaybackSession) {
    if let (Some(track), Some(progress)) = (session.current_track(), session.current_progress_text())
    {
        println!("{} - {}  [{}]", track.artist, track.title, progress);
    }
}

fn print_volume(level: i32) {
    println!("Volume: {}", level);
}
