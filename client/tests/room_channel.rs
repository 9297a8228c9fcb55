//! Channel behavior over an injected snapshot stream: ordering, caching,
//! error propagation and lifecycle.

use std::collections::BTreeMap;

use futures::channel::mpsc;
use landgrab_client::{ChannelError, RoomChannel};
use landgrab_protocol::{GameStatus, RoomSnapshot};

fn snap(status: GameStatus) -> RoomSnapshot {
    RoomSnapshot {
        room_id: "r-1".into(),
        board: BTreeMap::new(),
        players: Vec::new(),
        companies: BTreeMap::new(),
        distributing: Vec::new(),
        acquired_companies: Vec::new(),
        status,
    }
}

#[tokio::test]
async fn every_subscriber_sees_every_frame_in_order() {
    let (tx, rx) = mpsc::unbounded();
    let channel = RoomChannel::from_snapshot_stream("r-1", "ada", rx);
    let mut first = channel.subscribe();
    let mut second = channel.subscribe();

    tx.unbounded_send(Ok(snap(GameStatus::Placing))).unwrap();
    tx.unbounded_send(Ok(snap(GameStatus::Buying))).unwrap();

    for updates in [&mut first, &mut second] {
        let statuses = [
            updates.recv().await.unwrap().unwrap().status,
            updates.recv().await.unwrap().unwrap().status,
        ];
        assert_eq!(statuses, [GameStatus::Placing, GameStatus::Buying]);
    }
    assert_eq!(
        channel.current_snapshot().unwrap().status,
        GameStatus::Buying
    );
}

#[tokio::test]
async fn snapshot_is_unavailable_before_the_first_frame() {
    let channel =
        RoomChannel::from_snapshot_stream("r-1", "ada", futures::stream::pending());
    assert_eq!(
        channel.current_snapshot(),
        Err(ChannelError::NotYetAvailable)
    );
}

#[tokio::test]
async fn bad_frames_propagate_without_touching_the_cache() {
    let (tx, rx) = mpsc::unbounded();
    let channel = RoomChannel::from_snapshot_stream("r-1", "ada", rx);
    let mut updates = channel.subscribe();

    tx.unbounded_send(Ok(snap(GameStatus::Placing))).unwrap();
    tx.unbounded_send(Err(ChannelError::Decode("not json".into())))
        .unwrap();

    assert_eq!(
        updates.recv().await.unwrap().unwrap().status,
        GameStatus::Placing
    );
    assert_eq!(
        updates.recv().await.unwrap(),
        Err(ChannelError::Decode("not json".into()))
    );
    assert_eq!(
        channel.current_snapshot().unwrap().status,
        GameStatus::Placing
    );
}

#[tokio::test]
async fn close_is_idempotent_and_ends_subscriptions() {
    let (tx, rx) = mpsc::unbounded();
    let channel = RoomChannel::from_snapshot_stream("r-1", "ada", rx);
    let mut updates = channel.subscribe();

    tx.unbounded_send(Ok(snap(GameStatus::Placing))).unwrap();
    assert!(updates.recv().await.unwrap().is_ok());

    channel.close();
    channel.close();
    assert!(updates.recv().await.is_none());
}

#[tokio::test]
async fn unsubscribing_stops_delivery() {
    let (tx, rx) = mpsc::unbounded();
    let channel = RoomChannel::from_snapshot_stream("r-1", "ada", rx);
    let mut kept = channel.subscribe();
    let mut dropped = channel.subscribe();

    channel.unsubscribe(dropped.id());
    tx.unbounded_send(Ok(snap(GameStatus::Placing))).unwrap();

    assert!(kept.recv().await.unwrap().is_ok());
    assert!(dropped.recv().await.is_none());
}

#[tokio::test]
async fn sessions_are_independent() {
    let (tx_a, rx_a) = mpsc::unbounded();
    let (_tx_b, rx_b) = mpsc::unbounded();
    let a = RoomChannel::from_snapshot_stream("r-1", "ada", rx_a);
    let b = RoomChannel::from_snapshot_stream("r-1", "ada", rx_b);

    let mut updates = a.subscribe();
    tx_a.unbounded_send(Ok(snap(GameStatus::Placing))).unwrap();
    assert!(updates.recv().await.unwrap().is_ok());
    assert_eq!(b.current_snapshot(), Err(ChannelError::NotYetAvailable));
}
