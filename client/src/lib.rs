//! Client library for an Acquire-style tile/stock board game.
//!
//! The remote room service owns all game truth. This crate keeps a local
//! snapshot in sync over the room's push stream, submits player intents to
//! the command endpoints, drives the multi-step tile-placement flow, and
//! offers pure projections of the snapshot for whatever frontend sits on top.

pub mod actions;
pub mod board;
pub mod channel;
pub mod flow;
pub mod views;

pub use landgrab_protocol as protocol;

pub use actions::{ActionClient, ActionError};
pub use board::{decode, BoardError, DecodedBoard};
pub use channel::{ChannelError, RoomChannel, RoomUpdates, SubscriptionId};
pub use flow::{DisambiguationKind, FlowError, PlacementFlow, PlacementOutcome, PlacementState};
