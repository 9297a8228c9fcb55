//! Pure projections of a room snapshot for UI consumption. Nothing here
//! computes game truth; the price/bonus table is a fixed rendering constant,
//! not a rule engine.

use std::collections::{BTreeMap, BTreeSet};

use landgrab_protocol::{CompanyId, GameStatus, Player, PlayerId, RoomSnapshot, EMPTY_CELL};

/// Minimum remaining-stock indicator for a company to be offered for
/// purchase.
pub const MIN_BUYABLE_STOCK: u32 = 2;

/// Rotates the turn-ordered player list so the local player comes first.
/// Stable, and the identity when the local player is not in the list.
pub fn rotate_to_local(players: &[Player], me: &str) -> Vec<Player> {
    match players.iter().position(|p| p.id == me) {
        Some(at) => players[at..]
            .iter()
            .chain(&players[..at])
            .cloned()
            .collect(),
        None => players.to_vec(),
    }
}

/// Companies with enough remaining stock to be worth offering.
pub fn buyable_companies(indicators: &BTreeMap<CompanyId, u32>) -> BTreeSet<CompanyId> {
    indicators
        .iter()
        .filter(|(_, &remaining)| remaining >= MIN_BUYABLE_STOCK)
        .map(|(&company, _)| company)
        .collect()
}

/// Companies whose shares must be disposed of in the active merger.
pub fn sellable_companies(snapshot: &RoomSnapshot) -> Vec<CompanyId> {
    snapshot
        .companies
        .keys()
        .copied()
        .filter(|company| snapshot.acquired_companies.contains(company))
        .collect()
}

/// Companies with at least one board cell, i.e. already founded.
pub fn founded_companies(snapshot: &RoomSnapshot) -> BTreeSet<CompanyId> {
    snapshot
        .board
        .values()
        .copied()
        .filter(|occupant| snapshot.companies.contains_key(occupant))
        .collect()
}

/// Companies with no presence on the board; the candidate pool when a
/// placement founds a new company.
pub fn unused_companies(snapshot: &RoomSnapshot) -> Vec<CompanyId> {
    let used: BTreeSet<CompanyId> = snapshot.board.values().copied().collect();
    snapshot
        .companies
        .keys()
        .copied()
        .filter(|company| !used.contains(company))
        .collect()
}

/// One row of the price/bonus table: stock price plus the top-three
/// shareholder bonuses for a cliff tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliffQuote {
    pub price: u64,
    pub bonuses: (u64, u64, u64),
}

/// Fixed tier→price/bonus formula. Price is 100 per tier; bonuses are
/// 1000/750/500 per tier, with the middle column docked 50 on the adjusted
/// tiers.
pub fn cliff_quote(tier: u32) -> CliffQuote {
    let t = tier as u64;
    let majority = if tier % 2 == 0 {
        (t * 750).saturating_sub(50)
    } else {
        t * 750
    };
    CliffQuote {
        price: t * 100,
        bonuses: (t * 1000, majority, t * 500),
    }
}

/// Tier a company of the given cluster size quotes in, before its
/// per-company offset. `None` below the minimum cluster size.
pub fn cliff_for_size(size: u32) -> Option<u32> {
    let tier = match size {
        0 | 1 => return None,
        2..=5 => size,
        6..=10 => 6,
        11..=20 => 7,
        21..=30 => 8,
        31..=40 => 9,
        _ => 10,
    };
    Some(tier)
}

/// Cluster-size range rendered against a table row, inverse of
/// [`cliff_for_size`].
pub fn size_label_for_tier(tier: u32) -> Option<&'static str> {
    let label = match tier {
        2 => "2",
        3 => "3",
        4 => "4",
        5 => "5",
        6 => "6-10",
        7 => "11-20",
        8 => "21-30",
        9 => "31-40",
        10 => "41+",
        _ => return None,
    };
    Some(label)
}

/// The player the room is waiting on: nobody once finished, the head of the
/// disposal queue while distributing, otherwise the head of the turn order.
pub fn current_actor(snapshot: &RoomSnapshot) -> Option<&PlayerId> {
    match snapshot.status {
        GameStatus::Finished => None,
        GameStatus::Distributing => snapshot.distributing.first(),
        _ => snapshot.players.first().map(|p| &p.id),
    }
}

/// Whether the local player may choose a tile right now.
pub fn is_local_turn(snapshot: &RoomSnapshot, me: &str) -> bool {
    snapshot.status == GameStatus::Placing
        && snapshot.players.first().map_or(false, |p| p.id == me)
}

/// Whether the local player owes a buy decision right now.
pub fn is_local_buy_turn(snapshot: &RoomSnapshot, me: &str) -> bool {
    snapshot.status == GameStatus::Buying
        && snapshot.players.first().map_or(false, |p| p.id == me)
}

/// Whether the local player should submit an empty buy order to keep the
/// turn moving: it is their buying turn and nothing is buyable.
pub fn should_auto_pass_buy(
    snapshot: &RoomSnapshot,
    me: &str,
    indicators: &BTreeMap<CompanyId, u32>,
) -> bool {
    is_local_buy_turn(snapshot, me) && buyable_companies(indicators).is_empty()
}

/// Background/foreground pair for rendering a company marker, keyed by its
/// color tag. Unknown tags fall back on the empty/occupied pair.
pub fn company_palette(company: CompanyId, color: Option<&str>) -> (&'static str, &'static str) {
    match color.unwrap_or("") {
        "red" => ("red", "white"),
        "yellow" => ("yellow", "black"),
        "blue" => ("blue", "white"),
        "green" => ("green", "white"),
        "purple" => ("purple", "white"),
        "cyan" => ("cyan", "white"),
        "orange" => ("orange", "white"),
        _ if company == EMPTY_CELL => ("light", "black"),
        _ => ("dark", "white"),
    }
}
