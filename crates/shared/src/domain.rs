use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PlayerId);
id_newtype!(GameId);
id_newtype!(TradeId);

/// Number of spaces on the board; all position arithmetic is modulo this.
pub const BOARD_SPACES: u8 = 40;
/// Index of the jail space ("just visiting" side).
pub const JAIL_POSITION: u8 = 10;
/// Salary collected when a forward move passes the origin space.
pub const GO_SALARY: i64 = 200;

/// Board position reached from `start` after a signed step offset, wrapped
/// onto the 0..40 ring.
pub fn wrap_position(start: u8, offset: i16) -> u8 {
    (i16::from(start) + offset).rem_euclid(i16::from(BOARD_SPACES)) as u8
}

/// One authoritative dice result. Two rolls compare equal iff all numeric
/// fields match; clients that need to distinguish "same value, new roll"
/// track record identity separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRoll {
    pub die1: u8,
    pub die2: u8,
    pub total: u8,
    pub is_doubles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub token: String,
    pub color: String,
    /// Signed; negative means debt.
    pub money: i64,
    pub position: u8,
    pub in_jail: bool,
    pub jail_turns: u8,
    /// Board indices of owned properties.
    pub properties: Vec<u8>,
    pub get_out_of_jail_cards: u8,
    pub bankrupt: bool,
    pub disconnected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpaceKind {
    Go,
    Property,
    Railroad,
    Utility,
    Chance,
    CommunityChest,
    Tax,
    Jail,
    FreeParking,
    GoToJail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSpace {
    pub name: String,
    pub kind: SpaceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<PlayerId>,
    #[serde(default)]
    pub houses: u8,
    #[serde(default)]
    pub mortgaged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardDeck {
    Chance,
    CommunityChest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CardAction {
    Move { position: u8 },
    MoveBack { spaces: u8 },
    NearestRailroad,
    NearestUtility,
    GoToJail,
    Collect { amount: i64 },
    Pay { amount: i64 },
    CollectFromPlayers { amount: i64 },
    Repairs { per_house: i64, per_hotel: i64 },
    GetOutOfJailFree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub text: String,
    #[serde(flatten)]
    pub action: CardAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingActionKind {
    BuyDecision,
    PayRent,
    PayTax,
    AuctionBid,
}

/// Decision the authority is waiting on before the turn can continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub player_id: PlayerId,
    pub kind: PendingActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub position: u8,
    pub highest_bid: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_bidder: Option<PlayerId>,
    #[serde(default)]
    pub passed: Vec<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TradeStatus {
    Proposed,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSide {
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub properties: Vec<u8>,
    #[serde(default)]
    pub jail_cards: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: TradeId,
    pub from: PlayerId,
    pub to: PlayerId,
    pub offer: TradeSide,
    pub request: TradeSide,
    pub status: TradeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Full authoritative game state as pushed by the rules authority. The client
/// only replaces or merges it, never derives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub spaces: Vec<BoardSpace>,
    pub current_player_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dice: Option<DiceRoll>,
    #[serde(default)]
    pub dice_rolled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction: Option<Auction>,
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub log: Vec<GameLogEntry>,
    #[serde(default)]
    pub free_parking_pool: i64,
    #[serde(default)]
    pub started: bool,
}

impl Snapshot {
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}
