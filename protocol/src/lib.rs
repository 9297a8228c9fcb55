use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Players are addressed by their display name; the server enforces uniqueness
/// within a room.
pub type PlayerId = String;

/// Companies are numbered by the server when the room is configured.
pub type CompanyId = u32;

/// Board occupant marker for a cell no tile has been placed on.
pub const EMPTY_CELL: CompanyId = 0;
/// Board occupant marker for a placed tile that belongs to no company yet.
pub const UNINCORPORATED: CompanyId = 1;
/// Markers at or above this value name an actual company.
pub const FIRST_COMPANY_ID: CompanyId = 2;

/// ---- Tiles ----

const ROW_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// One cell of the board grid, addressed as column number plus row letter
/// (`"3C"`). Columns are 1-based; rows run A, B, C, … downwards. Serialized
/// as the compact label everywhere, including as a JSON map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile {
    col: u32,
    row: u8,
}

impl Tile {
    /// Reserved no-op placement token, submitted when a player has no tiles
    /// left to place on their turn.
    pub const SKIP: Tile = Tile { col: 0, row: 0 };

    /// Builds the tile at 0-based grid coordinates. Panics on rows past `Z`,
    /// which no parsed label can produce.
    pub fn from_grid(row: usize, col: usize) -> Tile {
        assert!(row < ROW_LETTERS.len(), "row {row} has no letter");
        Tile {
            col: col as u32 + 1,
            row: row as u8,
        }
    }

    /// 1-based column number as it appears in the label.
    pub fn column(&self) -> u32 {
        self.col
    }

    pub fn row_letter(&self) -> char {
        ROW_LETTERS[self.row as usize] as char
    }

    /// 0-based grid coordinates, or `None` for off-grid labels such as the
    /// skip token (column 0).
    pub fn grid_pos(&self) -> Option<(usize, usize)> {
        if self.col == 0 {
            return None;
        }
        Some((self.row as usize, self.col as usize - 1))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row_letter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileParseError {
    label: String,
}

impl fmt::Display for TileParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a tile label: {:?}", self.label)
    }
}

impl std::error::Error for TileParseError {}

impl FromStr for Tile {
    type Err = TileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TileParseError {
            label: s.to_string(),
        };
        let mut chars = s.chars();
        let row_char = chars.next_back().ok_or_else(err)?.to_ascii_uppercase();
        let digits = chars.as_str();
        let row = ROW_LETTERS
            .iter()
            .position(|&c| c as char == row_char)
            .ok_or_else(err)?;
        let col: u32 = digits.parse().map_err(|_| err())?;
        Ok(Tile {
            col,
            row: row as u8,
        })
    }
}

impl Serialize for Tile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TileVisitor;

        impl Visitor<'_> for TileVisitor {
            type Value = Tile;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a tile label such as \"3C\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Tile, E> {
                v.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(TileVisitor)
    }
}

/// ---- Room state ----

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Initializing,
    Placing,
    Buying,
    Distributing,
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::Initializing => "initializing",
            GameStatus::Placing => "placing",
            GameStatus::Buying => "buying",
            GameStatus::Distributing => "distributing",
            GameStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub balance: u64,
    /// Hand of tiles still to be placed, in server order.
    pub cards: Vec<Tile>,
    /// Shares held per company; an absent entry means none.
    #[serde(default)]
    pub stocks: BTreeMap<CompanyId, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub name: String,
    /// Price/bonus column this company quotes in. Fixed for the room's
    /// lifetime, never recomputed client-side.
    pub cliff: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The complete authoritative state of one room at one instant. Every push
/// frame carries a whole snapshot; there is no patching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: String,
    /// Sparse occupancy map. `EMPTY_CELL` and `UNINCORPORATED` are the two
    /// non-company markers; the grid extent is inferred from the label set.
    pub board: BTreeMap<Tile, CompanyId>,
    /// Turn order; index 0 acts during the placing and buying phases.
    pub players: Vec<Player>,
    pub companies: BTreeMap<CompanyId, Company>,
    /// Players still owed a stock-disposal decision, head first. Non-empty
    /// only while `status` is `Distributing`.
    #[serde(default)]
    pub distributing: Vec<PlayerId>,
    /// Companies being absorbed in the active merger.
    #[serde(default)]
    pub acquired_companies: Vec<CompanyId>,
    pub status: GameStatus,
}

/// ---- Commands ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoom {
    pub player: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceTile {
    pub player: PlayerId,
    pub card: Tile,
    /// Chosen founding/surviving company; absent until disambiguation asks
    /// for one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropTile {
    pub player: PlayerId,
    pub card: Tile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyOrder {
    pub company: CompanyId,
    pub amount: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyStock {
    pub player: PlayerId,
    pub buy: Vec<BuyOrder>,
}

/// Disposal terms for shares of an acquired company. `for_other_stocks` is a
/// settlement mode the server supports but this client never fills in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellTerms {
    #[serde(default)]
    pub for_money: BTreeMap<CompanyId, u32>,
    #[serde(default)]
    pub for_other_stocks: BTreeMap<CompanyId, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellStock {
    pub player: PlayerId,
    pub sell: SellTerms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndGame {
    pub player: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreated {
    pub room_id: String,
}

/// ---- Place-tile resolution ----

/// Discriminator on the place-tile reply. Any status the client does not
/// recognize means the placement resolved directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaceStatus {
    NeedCompanyForCreate,
    NeedCompanyForMerge,
    #[serde(other)]
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceReply {
    pub status: PlaceStatus,
    /// Eligible companies when disambiguation is required.
    #[serde(default)]
    pub candidates: Vec<CompanyId>,
}
