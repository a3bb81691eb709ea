use std::path::PathBuf;

use clap::Parser;
use iori_sink::{Sink, SinkNotification, StorageBackend};

mod config;
mod replay;

use config::Config;

#[derive(Parser, Clone, Debug)]
#[clap(version, about)]
struct PackagerArgs {
    /// Path to the TOML config file
    #[clap(short, long, default_value = "packager.toml", env = "PACKAGER_CONFIG")]
    config: PathBuf,

    /// Wait for the duration of every fragment before sending the next one
    #[clap(long)]
    realtime: bool,

    /// Remove every produced file except the manifests once all tracks ended
    #[clap(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .try_from_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = PackagerArgs::parse();
    let config = Config::load(&args.config)?;
    if config.tracks.is_empty() {
        anyhow::bail!("no track configured in {}", args.config.display());
    }

    let sink = Sink::from_config(config.sink)?;
    if let Some(location) = sink.storage().backend().location_hint() {
        tracing::info!("Writing presentation to {location}");
    }
    let (handle, mut notifications, task) = sink.spawn();

    let watcher = tokio::spawn(async move {
        let mut cleanup = None;
        while let Some(notification) = notifications.recv().await {
            match notification {
                SinkNotification::TrackPlayable(track_id) => {
                    tracing::info!("Track {track_id} is ready to be served.");
                }
                SinkNotification::Cleanup(c) => cleanup = Some(c),
            }
        }
        cleanup
    });

    let mut replays = Vec::new();
    for source in config.tracks {
        let id = source.id.clone();
        let replay = tokio::spawn(replay::replay_track(handle.clone(), source, args.realtime));
        replays.push((id, replay));
    }
    for (id, replay) in replays {
        match replay.await? {
            Ok(count) => tracing::info!("Track {id} finished after {count} fragments."),
            Err(e) => tracing::error!("Failed to replay track {id}: {e}"),
        }
    }

    handle.teardown().await?;
    drop(handle);

    let sink = task.await?;
    let Some(cleanup) = watcher.await? else {
        anyhow::bail!("presentation closed without a cleanup");
    };
    tracing::info!(
        "Presentation {} closed with {} files.",
        sink.config().manifest_name,
        cleanup.files().len()
    );

    if args.cleanup {
        cleanup.execute().await?;
    }

    Ok(())
}
