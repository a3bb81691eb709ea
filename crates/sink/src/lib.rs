pub mod changeset;
pub mod config;
pub mod error;
pub mod playlist;
pub mod registry;
mod segment;
pub mod sink;
pub mod storage;

pub use changeset::ChunkChangeset;
pub use config::{RetentionWindow, SinkConfig, StorageConfig};
pub use error::{SinkError, SinkResult, StorageError, StorageResult};
pub use playlist::{HlsPlaylist, Playlist, PlaylistFiles, TrackConfig};
pub use registry::{Demand, TrackRegistry, TrackState};
pub use segment::*;
pub use sink::{
    Fragment, FragmentCommit, PresentationState, Sink, SinkHandle, SinkNotification, TrackInit,
};
pub use storage::{Cleanup, SinkStorage, Storage, StorageBackend};

// ┌──────────┐  init / fragment  ┌────────────┐  add_track / add_fragment  ┌──────────┐
// │          ├───────────────────►            ├────────────────────────────►          │
// │ Upstream │                   │    Sink    │        ChunkChangeset      │ Playlist │
// │          ◄───────────────────┤            ◄────────────────────────────┤          │
// └──────────┘      Demand       └─────┬──────┘                            └──────────┘
//                                      │ init / changeset / manifests
//                                ┌─────▼──────┐
//                                │  Storage   │
//                                └────────────┘
