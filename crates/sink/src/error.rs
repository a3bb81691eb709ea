use thiserror::Error;

use crate::TrackId;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error("Storage rejected {0}")]
    Rejected(String),

    #[cfg(feature = "opendal")]
    #[error(transparent)]
    OpendalError(#[from] opendal::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to store init segment: {0}")]
    InitWriteFailed(#[source] StorageError),

    #[error("Failed to apply chunk changeset: {0}")]
    ChangesetApplyFailed(#[source] StorageError),

    #[error("Failed to write manifests: {0}")]
    ManifestWriteFailed(#[source] StorageError),

    #[error("Failed to clean up segments: {0}")]
    CleanupFailed(#[source] StorageError),

    #[error("Track {0} is already initialized")]
    TrackAlreadyInitialized(TrackId),

    #[error("Track {0} is not initialized")]
    UnknownTrack(TrackId),

    #[error("Stream of track {0} has already started")]
    StreamAlreadyStarted(TrackId),

    #[error("Files of track {0} would overwrite {1}")]
    TrackNameConflict(TrackId, String),

    #[error("Track {0} has already finished")]
    TrackFinished(TrackId),

    #[error("Fragment for track {0} arrived without demand")]
    UnexpectedFragment(TrackId),

    #[error("Track {0} already has a pending demand")]
    DemandOutstanding(TrackId),

    #[error("Sink is closed")]
    Closed,

    #[error(transparent)]
    StorageError(#[from] StorageError),
}

impl SinkError {
    /// Whether the error came from the storage backend rather than from a
    /// misuse of the sink.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::InitWriteFailed(_)
                | Self::ChangesetApplyFailed(_)
                | Self::ManifestWriteFailed(_)
                | Self::CleanupFailed(_)
                | Self::StorageError(_)
        )
    }
}

pub type SinkResult<T> = Result<T, SinkError>;
