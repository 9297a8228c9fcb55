//! Stateless senders for the room command endpoints, one per player intent.
//!
//! Only structural shape is validated here; whether a move is legal is the
//! server's business, and a rejection comes back as
//! [`ActionError::Rejected`]. Every method returns an independent future and
//! dropping that future cancels the request in flight, so a torn-down
//! caller never observes a late result.

use landgrab_protocol::{
    BuyStock, DropTile, EndGame, JoinRoom, PlaceReply, PlaceTile, PlayerId, RoomCreated, SellStock,
};
use serde::Serialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ActionError {
    /// The intent was structurally unusable and never left the client.
    #[error("invalid intent: {0}")]
    Invalid(String),
    /// The server answered with a non-success status.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ActionClient {
    http: reqwest::Client,
    base: Url,
}

impl ActionClient {
    pub fn new(base: Url) -> ActionClient {
        ActionClient {
            http: reqwest::Client::new(),
            base,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Creates a room from an opaque game-config document. The nonce query
    /// parameter distinguishes duplicate submissions of the same config.
    pub async fn create_room(&self, config: String) -> Result<RoomCreated, ActionError> {
        let mut url = self.endpoint(&["rooms"])?;
        url.query_pairs_mut()
            .append_pair("nonce", &Uuid::new_v4().to_string());
        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(config)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    pub async fn join(&self, room_id: &str, player: &str) -> Result<(), ActionError> {
        let body = JoinRoom {
            player: validated_player(player)?,
        };
        self.post_unit(&["rooms", room_id, "join"], &body).await
    }

    pub async fn start_game(&self, room_id: &str) -> Result<(), ActionError> {
        self.post_unit(&["rooms", room_id, "start_game"], &serde_json::json!({}))
            .await
    }

    /// Submits a placement. The reply's status says whether the action
    /// resolved directly or needs a follow-up company choice.
    pub async fn place_tile(
        &self,
        room_id: &str,
        intent: &PlaceTile,
    ) -> Result<PlaceReply, ActionError> {
        validated_player(&intent.player)?;
        let response = self.post(&["rooms", room_id, "place_card"], intent).await?;
        Ok(response.json().await?)
    }

    pub async fn drop_tile(&self, room_id: &str, intent: &DropTile) -> Result<(), ActionError> {
        validated_player(&intent.player)?;
        self.post_unit(&["rooms", room_id, "drop_card"], intent)
            .await
    }

    pub async fn buy_stock(&self, room_id: &str, intent: &BuyStock) -> Result<(), ActionError> {
        validated_player(&intent.player)?;
        self.post_unit(&["rooms", room_id, "buy_stock"], intent)
            .await
    }

    pub async fn sell_stock(&self, room_id: &str, intent: &SellStock) -> Result<(), ActionError> {
        validated_player(&intent.player)?;
        self.post_unit(&["rooms", room_id, "sell_stock"], intent)
            .await
    }

    pub async fn end_game(&self, room_id: &str, player: &str) -> Result<(), ActionError> {
        let body = EndGame {
            player: validated_player(player)?,
        };
        self.post_unit(&["rooms", room_id, "end_game"], &body).await
    }

    async fn post<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<reqwest::Response, ActionError> {
        let response = self
            .http
            .post(self.endpoint(segments)?)
            .json(body)
            .send()
            .await?;
        checked(response).await
    }

    async fn post_unit<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<(), ActionError> {
        self.post(segments, body).await.map(|_| ())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ActionError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ActionError::Invalid("base url cannot host endpoints".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn validated_player(player: &str) -> Result<PlayerId, ActionError> {
    if player.trim().is_empty() {
        return Err(ActionError::Invalid("player id must not be empty".into()));
    }
    Ok(player.to_string())
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ActionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ActionError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_extend_the_base_path() {
        let client = ActionClient::new("http://127.0.0.1:9001/api/".parse().unwrap());
        let url = client.endpoint(&["rooms", "r-1", "place_card"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9001/api/rooms/r-1/place_card");
    }

    #[tokio::test]
    async fn empty_player_never_leaves_the_client() {
        let client = ActionClient::new("http://127.0.0.1:1".parse().unwrap());
        let err = client.join("r-1", "  ").await.unwrap_err();
        assert!(matches!(err, ActionError::Invalid(_)));
    }
}
