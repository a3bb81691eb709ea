use iori_sink::{Fragment, SinkHandle};

use crate::config::TrackSource;

/// Feed every fragment of the track into the sink, one per demand.
pub async fn replay_track(
    handle: SinkHandle,
    source: TrackSource,
    realtime: bool,
) -> anyhow::Result<usize> {
    let duration = source.fragment_duration()?;
    let files = source.fragment_files().await?;
    let header = tokio::fs::read(&source.init).await?;

    handle
        .track_init(source.id.as_str(), source.track_init(header))
        .await?;
    let mut demand = handle.stream_start(source.id.as_str()).await?;
    tracing::info!("Replaying {} fragments of track {}.", files.len(), source.id);

    for path in files.iter() {
        let payload = tokio::fs::read(path).await?;
        demand = handle.fragment(demand, Fragment::new(payload, duration)).await?;
        tracing::debug!("Sent {}", path.display());

        if realtime {
            tokio::time::sleep(duration).await;
        }
    }
    drop(demand);

    handle.stream_end(source.id.as_str()).await?;
    Ok(files.len())
}
