//! The multi-step tile-placement flow.
//!
//! Placing a tile either resolves immediately or comes back asking which
//! company to found or which company survives a merger; the flow tracks that
//! round-trip as an explicit state machine. It acts only on the reply to the
//! request it issued itself; snapshots pushed in the meantime never mutate
//! flow state.

use landgrab_protocol::{CompanyId, DropTile, PlaceStatus, PlaceTile, PlayerId, RoomSnapshot, Tile};
use thiserror::Error;

use crate::actions::{ActionClient, ActionError};
use crate::views;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisambiguationKind {
    /// The placement founds a company; one must be chosen from the unused
    /// pool.
    Create,
    /// The placement merges companies; the survivor must be chosen from the
    /// candidates.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementState {
    Idle,
    TileChosen {
        tile: Tile,
    },
    Submitting {
        tile: Tile,
        company: Option<CompanyId>,
    },
    AwaitingChoice {
        tile: Tile,
        kind: DisambiguationKind,
        candidates: Vec<CompanyId>,
        chosen: Option<CompanyId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The server accepted the placement outright.
    Resolved,
    /// The server wants a company choice before the action can resolve.
    NeedsCompany {
        kind: DisambiguationKind,
        candidates: Vec<CompanyId>,
    },
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("no tile is chosen")]
    NoTileChosen,
    #[error("it is not {0}'s turn to place")]
    NotYourTurn(PlayerId),
    #[error("tile {0} is not in hand")]
    TileNotInHand(Tile),
    #[error("a placement is already being submitted")]
    SubmissionInFlight,
    #[error("a company choice is already pending")]
    ChoicePending,
    #[error("no company choice is pending")]
    NoChoicePending,
    #[error("a company must be selected before resubmitting")]
    CompanyRequired,
    #[error("company {0} is not a candidate")]
    NotACandidate(CompanyId),
    #[error(transparent)]
    Action(#[from] ActionError),
}

pub struct PlacementFlow {
    actions: ActionClient,
    room_id: String,
    player: PlayerId,
    state: PlacementState,
}

impl PlacementFlow {
    pub fn new(actions: ActionClient, room_id: &str, player: &str) -> PlacementFlow {
        PlacementFlow {
            actions,
            room_id: room_id.to_string(),
            player: player.to_string(),
            state: PlacementState::Idle,
        }
    }

    pub fn state(&self) -> &PlacementState {
        &self.state
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    /// Selects a tile from the local player's hand. Permitted only on their
    /// placement turn; re-selecting while a tile is chosen replaces it.
    pub fn choose_tile(&mut self, snapshot: &RoomSnapshot, tile: Tile) -> Result<(), FlowError> {
        match self.state {
            PlacementState::Idle | PlacementState::TileChosen { .. } => {}
            PlacementState::Submitting { .. } => return Err(FlowError::SubmissionInFlight),
            PlacementState::AwaitingChoice { .. } => return Err(FlowError::ChoicePending),
        }
        if !views::is_local_turn(snapshot, &self.player) {
            return Err(FlowError::NotYourTurn(self.player.clone()));
        }
        let in_hand = snapshot
            .players
            .iter()
            .find(|p| p.id == self.player)
            .map_or(false, |p| p.cards.contains(&tile));
        if !in_hand {
            return Err(FlowError::TileNotInHand(tile));
        }
        self.state = PlacementState::TileChosen { tile };
        Ok(())
    }

    /// Submits the chosen tile, or resubmits it with the selected company
    /// when a disambiguation round is pending. On failure the selection is
    /// cleared and the error surfaced; nothing is retried.
    pub async fn place(&mut self, snapshot: &RoomSnapshot) -> Result<PlacementOutcome, FlowError> {
        let (tile, company) = match &self.state {
            PlacementState::TileChosen { tile } => (*tile, None),
            PlacementState::AwaitingChoice {
                tile,
                chosen: Some(company),
                ..
            } => (*tile, Some(*company)),
            PlacementState::AwaitingChoice { chosen: None, .. } => {
                return Err(FlowError::CompanyRequired)
            }
            PlacementState::Submitting { .. } => return Err(FlowError::SubmissionInFlight),
            PlacementState::Idle => return Err(FlowError::NoTileChosen),
        };
        self.submit(snapshot, tile, company).await
    }

    /// Selects the company answering a pending disambiguation. Call
    /// [`Self::place`] afterwards to resubmit.
    pub fn choose_company(&mut self, company: CompanyId) -> Result<(), FlowError> {
        match &mut self.state {
            PlacementState::AwaitingChoice {
                candidates, chosen, ..
            } => {
                if !candidates.contains(&company) {
                    return Err(FlowError::NotACandidate(company));
                }
                *chosen = Some(company);
                Ok(())
            }
            _ => Err(FlowError::NoChoicePending),
        }
    }

    /// Discards the held tile. The local selection is cleared no matter how
    /// the drop request fares, but a failed call is still reported.
    pub async fn drop_tile(&mut self) -> Result<(), FlowError> {
        let tile = match &self.state {
            PlacementState::TileChosen { tile }
            | PlacementState::AwaitingChoice { tile, .. } => *tile,
            PlacementState::Submitting { .. } => return Err(FlowError::SubmissionInFlight),
            PlacementState::Idle => return Err(FlowError::NoTileChosen),
        };
        self.state = PlacementState::Idle;
        let intent = DropTile {
            player: self.player.clone(),
            card: tile,
        };
        self.actions
            .drop_tile(&self.room_id, &intent)
            .await
            .map_err(FlowError::Action)
    }

    /// Clears any local selection without talking to the server.
    pub fn cancel(&mut self) {
        if !matches!(self.state, PlacementState::Submitting { .. }) {
            self.state = PlacementState::Idle;
        }
    }

    /// Submits the reserved skip token when the local player's placement
    /// turn comes up with an empty hand, keeping the turn order moving.
    /// Returns whether a skip was submitted.
    pub async fn auto_skip(&mut self, snapshot: &RoomSnapshot) -> Result<bool, FlowError> {
        if !matches!(self.state, PlacementState::Idle) {
            return Ok(false);
        }
        if !views::is_local_turn(snapshot, &self.player) {
            return Ok(false);
        }
        let hand_empty = snapshot
            .players
            .iter()
            .find(|p| p.id == self.player)
            .map_or(false, |p| p.cards.is_empty());
        if !hand_empty {
            return Ok(false);
        }
        self.submit(snapshot, Tile::SKIP, None).await?;
        Ok(true)
    }

    async fn submit(
        &mut self,
        snapshot: &RoomSnapshot,
        tile: Tile,
        company: Option<CompanyId>,
    ) -> Result<PlacementOutcome, FlowError> {
        self.state = PlacementState::Submitting { tile, company };
        let intent = PlaceTile {
            player: self.player.clone(),
            card: tile,
            company,
        };
        let reply = match self.actions.place_tile(&self.room_id, &intent).await {
            Ok(reply) => reply,
            Err(err) => {
                self.state = PlacementState::Idle;
                return Err(FlowError::Action(err));
            }
        };
        let outcome = match reply.status {
            PlaceStatus::Resolved => {
                self.state = PlacementState::Idle;
                PlacementOutcome::Resolved
            }
            PlaceStatus::NeedCompanyForCreate => {
                let mut candidates = reply.candidates;
                if candidates.is_empty() {
                    candidates = views::unused_companies(snapshot);
                }
                self.await_choice(tile, DisambiguationKind::Create, candidates)
            }
            PlaceStatus::NeedCompanyForMerge => {
                self.await_choice(tile, DisambiguationKind::Merge, reply.candidates)
            }
        };
        Ok(outcome)
    }

    fn await_choice(
        &mut self,
        tile: Tile,
        kind: DisambiguationKind,
        candidates: Vec<CompanyId>,
    ) -> PlacementOutcome {
        self.state = PlacementState::AwaitingChoice {
            tile,
            kind,
            candidates: candidates.clone(),
            chosen: None,
        };
        PlacementOutcome::NeedsCompany { kind, candidates }
    }
}
