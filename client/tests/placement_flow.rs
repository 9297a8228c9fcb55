//! Drives the placement flow against an in-process stub of the room
//! service's command endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use url::Url;

use landgrab_client::{
    ActionClient, DisambiguationKind, FlowError, PlacementFlow, PlacementOutcome, PlacementState,
};
use landgrab_protocol::{GameStatus, Player, RoomSnapshot, Tile};

struct Stub {
    /// Scripted (status, body) replies for place_card, consumed in order;
    /// an empty script answers plain success.
    replies: Mutex<Vec<(u16, Value)>>,
    requests: Mutex<Vec<(String, Value)>>,
}

async fn handle(
    endpoint: &'static str,
    state: Arc<Stub>,
    body: Value,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().push((endpoint.to_string(), body));
    let (status, reply) = if endpoint == "place_card" {
        let mut replies = state.replies.lock();
        if replies.is_empty() {
            (200, json!({ "status": "ok" }))
        } else {
            replies.remove(0)
        }
    } else {
        (200, json!({}))
    };
    (StatusCode::from_u16(status).unwrap(), Json(reply))
}

async fn spawn_stub(replies: Vec<(u16, Value)>) -> (Arc<Stub>, Url) {
    let stub = Arc::new(Stub {
        replies: Mutex::new(replies),
        requests: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route(
            "/rooms/:room/place_card",
            post(|State(s): State<Arc<Stub>>, Json(b): Json<Value>| handle("place_card", s, b)),
        )
        .route(
            "/rooms/:room/drop_card",
            post(|State(s): State<Arc<Stub>>, Json(b): Json<Value>| handle("drop_card", s, b)),
        )
        .with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base: Url = format!("http://{}", listener.local_addr().unwrap())
        .parse()
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (stub, base)
}

fn placing_snapshot(hand: &[&str]) -> RoomSnapshot {
    RoomSnapshot {
        room_id: "r-1".into(),
        board: BTreeMap::new(),
        players: vec![Player {
            id: "ada".into(),
            balance: 6000,
            cards: hand.iter().map(|t| t.parse().unwrap()).collect(),
            stocks: BTreeMap::new(),
        }],
        companies: BTreeMap::new(),
        distributing: Vec::new(),
        acquired_companies: Vec::new(),
        status: GameStatus::Placing,
    }
}

#[tokio::test]
async fn founding_disambiguation_round_trip() {
    let (stub, base) = spawn_stub(vec![
        (
            200,
            json!({ "status": "need_company_for_create", "candidates": [5, 9] }),
        ),
        (200, json!({ "status": "ok" })),
    ])
    .await;
    let mut flow = PlacementFlow::new(ActionClient::new(base), "r-1", "ada");
    let snap = placing_snapshot(&["3C"]);

    flow.choose_tile(&snap, "3C".parse().unwrap()).unwrap();
    let outcome = flow.place(&snap).await.unwrap();
    assert_eq!(
        outcome,
        PlacementOutcome::NeedsCompany {
            kind: DisambiguationKind::Create,
            candidates: vec![5, 9],
        }
    );

    // Resubmission is refused until a candidate is picked.
    assert!(matches!(
        flow.place(&snap).await,
        Err(FlowError::CompanyRequired)
    ));
    assert!(matches!(
        flow.choose_company(7),
        Err(FlowError::NotACandidate(7))
    ));

    flow.choose_company(5).unwrap();
    assert_eq!(flow.place(&snap).await.unwrap(), PlacementOutcome::Resolved);
    assert_eq!(*flow.state(), PlacementState::Idle);

    let requests = stub.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].1,
        json!({ "player": "ada", "card": "3C" })
    );
    assert_eq!(
        requests[1].1,
        json!({ "player": "ada", "card": "3C", "company": 5 })
    );
}

#[tokio::test]
async fn rejected_placement_clears_the_selection() {
    let (_stub, base) = spawn_stub(vec![(409, json!("tile is dead"))]).await;
    let mut flow = PlacementFlow::new(ActionClient::new(base), "r-1", "ada");
    let snap = placing_snapshot(&["3C"]);

    flow.choose_tile(&snap, "3C".parse().unwrap()).unwrap();
    let err = flow.place(&snap).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Action(landgrab_client::ActionError::Rejected { status: 409, .. })
    ));
    assert_eq!(*flow.state(), PlacementState::Idle);
}

#[tokio::test]
async fn empty_hand_auto_submits_the_skip_token() {
    let (stub, base) = spawn_stub(Vec::new()).await;
    let mut flow = PlacementFlow::new(ActionClient::new(base), "r-1", "ada");

    // A hand with tiles left never auto-skips.
    assert!(!flow.auto_skip(&placing_snapshot(&["3C"])).await.unwrap());
    assert!(stub.requests.lock().is_empty());

    assert!(flow.auto_skip(&placing_snapshot(&[])).await.unwrap());
    assert_eq!(*flow.state(), PlacementState::Idle);
    let requests = stub.requests.lock();
    assert_eq!(
        requests[0].1,
        json!({ "player": "ada", "card": "0A" })
    );
}

#[tokio::test]
async fn dropping_discards_the_selection_even_on_failure() {
    let (stub, base) = spawn_stub(Vec::new()).await;
    let mut flow = PlacementFlow::new(ActionClient::new(base), "r-1", "ada");
    let snap = placing_snapshot(&["3C", "4D"]);

    flow.choose_tile(&snap, "3C".parse().unwrap()).unwrap();
    flow.drop_tile().await.unwrap();
    assert_eq!(*flow.state(), PlacementState::Idle);
    assert_eq!(stub.requests.lock()[0].0, "drop_card");

    // A drop against a dead server still clears the local selection.
    let mut flow = PlacementFlow::new(
        ActionClient::new("http://127.0.0.1:1".parse().unwrap()),
        "r-1",
        "ada",
    );
    flow.choose_tile(&snap, "4D".parse().unwrap()).unwrap();
    assert!(flow.drop_tile().await.is_err());
    assert_eq!(*flow.state(), PlacementState::Idle);
}

#[tokio::test]
async fn merge_candidates_come_from_the_reply() {
    let (_stub, base) = spawn_stub(vec![(
        200,
        json!({ "status": "need_company_for_merge", "candidates": [2, 4] }),
    )])
    .await;
    let mut flow = PlacementFlow::new(ActionClient::new(base), "r-1", "ada");
    let snap = placing_snapshot(&["3C"]);

    flow.choose_tile(&snap, "3C".parse().unwrap()).unwrap();
    let outcome = flow.place(&snap).await.unwrap();
    assert_eq!(
        outcome,
        PlacementOutcome::NeedsCompany {
            kind: DisambiguationKind::Merge,
            candidates: vec![2, 4],
        }
    );
}
