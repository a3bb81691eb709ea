use std::collections::{HashMap, HashSet};

use crate::{
    error::{SinkError, SinkResult},
    TrackId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Stream started, waiting for init metadata.
    Registered,
    /// Init metadata received, stream not started yet.
    Initialized,
    Streaming,
    Finished,
}

/// Permission for upstream to send exactly one fragment of a track.
///
/// Only the sink creates permits, and a track has at most one outstanding at
/// a time, so a track never has more than one fragment in flight.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "upstream may only send a fragment while holding a demand"]
pub struct Demand {
    track_id: TrackId,
}

impl Demand {
    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }
}

/// Lifecycle bookkeeping of every track in a presentation.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: HashMap<TrackId, TrackState>,
    /// Tracks which have not announced their first playable segment.
    awaiting: HashSet<TrackId>,
    /// Tracks holding an outstanding [`Demand`].
    demanded: HashSet<TrackId>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the track as waiting for its first playable notification.
    pub fn register(&mut self, track_id: TrackId) {
        self.awaiting.insert(track_id);
    }

    /// Returns `true` exactly once per registration.
    pub fn consume_if_awaiting(&mut self, track_id: &TrackId) -> bool {
        self.awaiting.remove(track_id)
    }

    pub fn is_awaiting(&self, track_id: &TrackId) -> bool {
        self.awaiting.contains(track_id)
    }

    pub fn state(&self, track_id: &TrackId) -> Option<TrackState> {
        self.tracks.get(track_id).copied()
    }

    pub fn has_demand(&self, track_id: &TrackId) -> bool {
        self.demanded.contains(track_id)
    }

    pub fn is_all_finished(&self) -> bool {
        !self.tracks.is_empty()
            && self
                .tracks
                .values()
                .all(|state| *state == TrackState::Finished)
    }

    pub(crate) fn initialize(&mut self, track_id: &TrackId) -> SinkResult<()> {
        let next = match self.state(track_id) {
            None => TrackState::Initialized,
            Some(TrackState::Registered) => TrackState::Streaming,
            Some(_) => return Err(SinkError::TrackAlreadyInitialized(track_id.clone())),
        };
        self.tracks.insert(track_id.clone(), next);
        Ok(())
    }

    pub(crate) fn start(&mut self, track_id: &TrackId) -> SinkResult<()> {
        let next = match self.state(track_id) {
            None => TrackState::Registered,
            Some(TrackState::Initialized) => TrackState::Streaming,
            Some(TrackState::Registered | TrackState::Streaming) => {
                return Err(SinkError::StreamAlreadyStarted(track_id.clone()))
            }
            Some(TrackState::Finished) => return Err(SinkError::TrackFinished(track_id.clone())),
        };
        self.tracks.insert(track_id.clone(), next);
        self.register(track_id.clone());
        Ok(())
    }

    pub(crate) fn finish(&mut self, track_id: &TrackId) -> SinkResult<()> {
        match self.state(track_id) {
            Some(TrackState::Initialized | TrackState::Streaming) => {}
            Some(TrackState::Finished) => return Err(SinkError::TrackFinished(track_id.clone())),
            Some(TrackState::Registered) | None => {
                return Err(SinkError::UnknownTrack(track_id.clone()))
            }
        }

        self.tracks.insert(track_id.clone(), TrackState::Finished);
        self.awaiting.remove(track_id);
        self.demanded.remove(track_id);
        Ok(())
    }

    /// Check that the track can accept fragments.
    pub(crate) fn ensure_streaming(&self, track_id: &TrackId) -> SinkResult<()> {
        match self.state(track_id) {
            Some(TrackState::Streaming) => Ok(()),
            Some(TrackState::Finished) => Err(SinkError::TrackFinished(track_id.clone())),
            _ => Err(SinkError::UnknownTrack(track_id.clone())),
        }
    }

    pub(crate) fn issue_demand(&mut self, track_id: &TrackId) -> SinkResult<Demand> {
        if !self.demanded.insert(track_id.clone()) {
            return Err(SinkError::DemandOutstanding(track_id.clone()));
        }

        Ok(Demand {
            track_id: track_id.clone(),
        })
    }

    pub(crate) fn redeem(&mut self, demand: Demand) -> SinkResult<TrackId> {
        if !self.demanded.remove(&demand.track_id) {
            return Err(SinkError::UnexpectedFragment(demand.track_id));
        }
        Ok(demand.track_id)
    }
}
