//! Room synchronization channel.
//!
//! One `RoomChannel` per (room, player) pairing owns the push subscription
//! and the cached snapshot. Each inbound frame wholly replaces the cache;
//! the server always sends complete state, so there is no merge or patch
//! step, and after a transport gap the next frame is trusted as-is.

use std::sync::{Arc, Weak};

use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use landgrab_protocol::{PlayerId, RoomSnapshot};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// No snapshot has arrived yet; a loading state, not a failure.
    #[error("no snapshot has arrived yet")]
    NotYetAvailable,
    #[error("transport: {0}")]
    Transport(String),
    /// A frame that did not decode to a snapshot. The cache keeps the last
    /// good state; the bad frame is reported, never partially applied.
    #[error("malformed snapshot frame: {0}")]
    Decode(String),
}

type Frame = Result<RoomSnapshot, ChannelError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    senders: Vec<(u64, mpsc::UnboundedSender<Frame>)>,
}

#[derive(Default)]
struct Shared {
    snapshot: Mutex<Option<RoomSnapshot>>,
    listeners: Mutex<Listeners>,
}

impl Shared {
    fn publish(&self, frame: Frame) {
        if let Ok(snapshot) = &frame {
            *self.snapshot.lock() = Some(snapshot.clone());
        }
        self.listeners
            .lock()
            .senders
            .retain(|(_, tx)| tx.unbounded_send(frame.clone()).is_ok());
    }

    fn remove(&self, id: u64) {
        self.listeners.lock().senders.retain(|(key, _)| *key != id);
    }
}

/// Owned subscription to one room's push stream. Two `open` calls for the
/// same room and player yield fully independent sessions.
pub struct RoomChannel {
    room_id: String,
    player_id: PlayerId,
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl RoomChannel {
    /// Connects the room's websocket event stream and starts the reader
    /// task. Must run inside a tokio runtime.
    pub async fn open(
        base_url: &Url,
        room_id: &str,
        player_id: &str,
    ) -> Result<RoomChannel, ChannelError> {
        let url = events_url(base_url, room_id, player_id)?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let frames = socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(
                    serde_json::from_str::<RoomSnapshot>(&text)
                        .map_err(|e| ChannelError::Decode(e.to_string())),
                ),
                Ok(_) => None,
                Err(e) => Some(Err(ChannelError::Transport(e.to_string()))),
            }
        });
        Ok(Self::from_snapshot_stream(room_id, player_id, frames))
    }

    /// Builds a channel over an already-decoded frame stream. [`Self::open`]
    /// is a thin wrapper over this; tests and alternative transports feed it
    /// directly.
    pub fn from_snapshot_stream<S>(room_id: &str, player_id: &str, frames: S) -> RoomChannel
    where
        S: Stream<Item = Frame> + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let reader = tokio::spawn(pump(shared.clone(), frames));
        RoomChannel {
            room_id: room_id.to_string(),
            player_id: player_id.to_string(),
            shared,
            reader: Mutex::new(Some(reader)),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Latest pushed state, or `NotYetAvailable` before the first frame.
    pub fn current_snapshot(&self) -> Result<RoomSnapshot, ChannelError> {
        self.shared
            .snapshot
            .lock()
            .clone()
            .ok_or(ChannelError::NotYetAvailable)
    }

    /// Registers a listener queue. Every frame is delivered to every queue
    /// in server-send order, never coalesced, for as long as the
    /// subscription is open.
    pub fn subscribe(&self) -> RoomUpdates {
        let (tx, rx) = mpsc::unbounded();
        let mut listeners = self.shared.listeners.lock();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.senders.push((id, tx));
        RoomUpdates {
            id: SubscriptionId(id),
            rx,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.remove(id.0);
    }

    /// Releases the subscription and stops the reader. Safe to call more
    /// than once; also runs on drop, so early exits cannot leak the stream.
    pub fn close(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.shared.listeners.lock().senders.clear();
    }
}

impl Drop for RoomChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn pump<S>(shared: Arc<Shared>, frames: S)
where
    S: Stream<Item = Frame> + Send + 'static,
{
    futures::pin_mut!(frames);
    while let Some(frame) = frames.next().await {
        if let Err(err) = &frame {
            log::warn!("room stream: {err}");
        }
        shared.publish(frame);
    }
}

/// Receiving half of one subscription. Dropping it unregisters the listener.
pub struct RoomUpdates {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Frame>,
    shared: Weak<Shared>,
}

impl RoomUpdates {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next frame in server-send order; `None` once the channel is closed
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.next().await
    }
}

impl Drop for RoomUpdates {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id.0);
        }
    }
}

fn events_url(base: &Url, room_id: &str, player_id: &str) -> Result<Url, ChannelError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChannelError::Transport(format!(
                "unsupported scheme {other:?}"
            )))
        }
    };
    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|_| ChannelError::Transport("cannot derive websocket url".into()))?;
    url.path_segments_mut()
        .map_err(|_| ChannelError::Transport("base url cannot host endpoints".into()))?
        .pop_if_empty()
        .extend(["rooms", room_id, "events"]);
    url.query_pairs_mut().append_pair("player", player_id);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_is_derived_from_http_base() {
        let base: Url = "http://127.0.0.1:9001".parse().unwrap();
        let url = events_url(&base, "r 1", "ada").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9001/rooms/r%201/events?player=ada");

        let base: Url = "https://play.example/api/".parse().unwrap();
        let url = events_url(&base, "r-1", "ada").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://play.example/api/rooms/r-1/events?player=ada"
        );
    }
}
