use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use super::{Fragment, Sink, SinkNotification, TrackInit};
use crate::{
    error::{SinkError, SinkResult},
    playlist::Playlist,
    registry::Demand,
    storage::StorageBackend,
    TrackId,
};

type Reply<T> = oneshot::Sender<SinkResult<T>>;

enum Request {
    TrackInit {
        track_id: TrackId,
        init: TrackInit,
        reply: Reply<()>,
    },
    StreamStart {
        track_id: TrackId,
        reply: Reply<Demand>,
    },
    Fragment {
        demand: Demand,
        fragment: Fragment,
        reply: Reply<Demand>,
    },
    Demand {
        track_id: TrackId,
        reply: Reply<Demand>,
    },
    StreamEnd {
        track_id: TrackId,
        reply: Reply<()>,
    },
    Teardown {
        reply: Reply<()>,
    },
}

/// Cloneable entry point to a sink running in its own task.
///
/// Requests from all handles go through one mailbox, so the sink applies
/// them one at a time in arrival order.
#[derive(Clone)]
pub struct SinkHandle {
    sender: mpsc::UnboundedSender<Request>,
}

impl SinkHandle {
    async fn request<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> SinkResult<T> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(request(reply))
            .map_err(|_| SinkError::Closed)?;
        receiver.await.map_err(|_| SinkError::Closed)?
    }

    pub async fn track_init(&self, track_id: impl Into<TrackId>, init: TrackInit) -> SinkResult<()> {
        let track_id = track_id.into();
        self.request(|reply| Request::TrackInit {
            track_id,
            init,
            reply,
        })
        .await
    }

    pub async fn stream_start(&self, track_id: impl Into<TrackId>) -> SinkResult<Demand> {
        let track_id = track_id.into();
        self.request(|reply| Request::StreamStart { track_id, reply })
            .await
    }

    /// Send a fragment and wait until it is committed. Returns the demand for
    /// the next fragment of the same track.
    pub async fn fragment(&self, demand: Demand, fragment: Fragment) -> SinkResult<Demand> {
        self.request(|reply| Request::Fragment {
            demand,
            fragment,
            reply,
        })
        .await
    }

    pub async fn demand(&self, track_id: impl Into<TrackId>) -> SinkResult<Demand> {
        let track_id = track_id.into();
        self.request(|reply| Request::Demand { track_id, reply })
            .await
    }

    pub async fn stream_end(&self, track_id: impl Into<TrackId>) -> SinkResult<()> {
        let track_id = track_id.into();
        self.request(|reply| Request::StreamEnd { track_id, reply })
            .await
    }

    /// Tear the presentation down. The cleanup arrives as a notification.
    pub async fn teardown(&self) -> SinkResult<()> {
        self.request(|reply| Request::Teardown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<P, B> Sink<P, B>
where
    P: Playlist,
    B: StorageBackend,
{
    /// Move the sink into its own task.
    ///
    /// The task stops once every [`SinkHandle`] is dropped and returns the
    /// sink. Notifications are delivered in the order they are emitted.
    pub fn spawn(
        self,
    ) -> (
        SinkHandle,
        mpsc::UnboundedReceiver<SinkNotification<B>>,
        JoinHandle<Self>,
    ) {
        let (sender, requests) = mpsc::unbounded_channel();
        let (notifier, notifications) = mpsc::unbounded_channel();

        let task = tokio::spawn(self.run(requests, notifier));
        (SinkHandle { sender }, notifications, task)
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        notifier: mpsc::UnboundedSender<SinkNotification<B>>,
    ) -> Self {
        while let Some(request) = requests.recv().await {
            match request {
                Request::TrackInit {
                    track_id,
                    init,
                    reply,
                } => {
                    _ = reply.send(self.on_track_init(track_id, init).await);
                }
                Request::StreamStart { track_id, reply } => {
                    _ = reply.send(self.on_stream_start(track_id));
                }
                Request::Fragment {
                    demand,
                    fragment,
                    reply,
                } => {
                    let result = self.on_fragment(demand, fragment).await.map(|commit| {
                        for notification in commit.notifications {
                            _ = notifier.send(notification);
                        }
                        commit.demand
                    });
                    _ = reply.send(result);
                }
                Request::Demand { track_id, reply } => {
                    _ = reply.send(self.demand(&track_id));
                }
                Request::StreamEnd { track_id, reply } => {
                    _ = reply.send(self.on_stream_end(&track_id).await);
                }
                Request::Teardown { reply } => {
                    let result = self.on_teardown().await.map(|cleanup| {
                        _ = notifier.send(SinkNotification::Cleanup(cleanup));
                    });
                    _ = reply.send(result);
                }
            }
        }

        self
    }
}
