use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        Auction, Card, CardDeck, DiceRoll, GameId, PlayerId, Snapshot, TradeId, TradeSide,
    },
    error::ApiError,
};

/// Rule outcome for the space the current player landed on. Pushed by the
/// authority together with the snapshot that already reflects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LandingOutcome {
    RentPaid {
        owner: PlayerId,
        amount: i64,
    },
    PropertyAvailable {
        position: u8,
        price: i64,
    },
    CardDrawn {
        deck: CardDeck,
        card: Card,
    },
    TaxPaid {
        amount: i64,
    },
    GoToJail,
    FreeParkingCollected {
        amount: i64,
    },
    /// Nothing to do (own property, just visiting, origin space).
    Idle,
}

/// Events pushed by the remote authority, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    GameCreated {
        game_id: GameId,
        game: Snapshot,
    },
    GameJoined {
        game_id: GameId,
        player_id: PlayerId,
        game: Snapshot,
    },
    GameRejoined {
        game_id: GameId,
        player_id: PlayerId,
        game: Snapshot,
    },
    PlayerJoined {
        player_id: PlayerId,
        game: Snapshot,
    },
    PlayerLeft {
        player_id: PlayerId,
        game: Snapshot,
    },
    PlayerDisconnected {
        player_id: PlayerId,
        game: Snapshot,
    },
    PlayerReconnected {
        player_id: PlayerId,
        game: Snapshot,
    },
    GameStarted {
        game: Snapshot,
    },
    DiceRolled {
        result: DiceRoll,
        #[serde(default)]
        player_still_in_jail: bool,
        game: Snapshot,
    },
    LandingResult {
        result: LandingOutcome,
        game: Snapshot,
    },
    PropertyBought {
        position: u8,
        game: Snapshot,
    },
    PropertyDeclined {
        position: u8,
        game: Snapshot,
    },
    HouseBuilt {
        position: u8,
        game: Snapshot,
    },
    HouseSold {
        position: u8,
        game: Snapshot,
    },
    PropertyMortgaged {
        position: u8,
        game: Snapshot,
    },
    PropertyUnmortgaged {
        position: u8,
        game: Snapshot,
    },
    AuctionStarted {
        auction: Auction,
        game: Snapshot,
    },
    AuctionUpdate {
        auction: Auction,
        game: Snapshot,
    },
    AuctionEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
        position: u8,
        amount: i64,
    },
    TradeProposed {
        trade_id: TradeId,
        game: Snapshot,
    },
    TradeCompleted {
        trade_id: TradeId,
        game: Snapshot,
    },
    TradeDeclined {
        trade_id: TradeId,
        game: Snapshot,
    },
    JailFinePaid {
        player_id: PlayerId,
        game: Snapshot,
    },
    JailCardUsed {
        player_id: PlayerId,
        game: Snapshot,
    },
    TurnEnded {
        game: Snapshot,
    },
    PlayerBankrupt {
        player_id: PlayerId,
        game: Snapshot,
    },
    GameOver {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
        game: Snapshot,
    },
    Error(ApiError),
}

impl ServerEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GameCreated { .. } => "gameCreated",
            ServerEvent::GameJoined { .. } => "gameJoined",
            ServerEvent::GameRejoined { .. } => "gameRejoined",
            ServerEvent::PlayerJoined { .. } => "playerJoined",
            ServerEvent::PlayerLeft { .. } => "playerLeft",
            ServerEvent::PlayerDisconnected { .. } => "playerDisconnected",
            ServerEvent::PlayerReconnected { .. } => "playerReconnected",
            ServerEvent::GameStarted { .. } => "gameStarted",
            ServerEvent::DiceRolled { .. } => "diceRolled",
            ServerEvent::LandingResult { .. } => "landingResult",
            ServerEvent::PropertyBought { .. } => "propertyBought",
            ServerEvent::PropertyDeclined { .. } => "propertyDeclined",
            ServerEvent::HouseBuilt { .. } => "houseBuilt",
            ServerEvent::HouseSold { .. } => "houseSold",
            ServerEvent::PropertyMortgaged { .. } => "propertyMortgaged",
            ServerEvent::PropertyUnmortgaged { .. } => "propertyUnmortgaged",
            ServerEvent::AuctionStarted { .. } => "auctionStarted",
            ServerEvent::AuctionUpdate { .. } => "auctionUpdate",
            ServerEvent::AuctionEnded { .. } => "auctionEnded",
            ServerEvent::TradeProposed { .. } => "tradeProposed",
            ServerEvent::TradeCompleted { .. } => "tradeCompleted",
            ServerEvent::TradeDeclined { .. } => "tradeDeclined",
            ServerEvent::JailFinePaid { .. } => "jailFinePaid",
            ServerEvent::JailCardUsed { .. } => "jailCardUsed",
            ServerEvent::TurnEnded { .. } => "turnEnded",
            ServerEvent::PlayerBankrupt { .. } => "playerBankrupt",
            ServerEvent::GameOver { .. } => "gameOver",
            ServerEvent::Error(_) => "error",
        }
    }
}

/// Commands sent to the authority. Fire and forget; the authority answers
/// with events, never with direct replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    CreateGame {
        player_name: String,
    },
    JoinGame {
        game_id: GameId,
        player_name: String,
    },
    RollDice,
    BuyProperty,
    DeclineProperty,
    AuctionBid {
        amount: i64,
    },
    AuctionPass,
    BuildHouse {
        property_index: u8,
    },
    SellHouse {
        property_index: u8,
    },
    MortgageProperty {
        property_index: u8,
    },
    UnmortgageProperty {
        property_index: u8,
    },
    ProposeTrade {
        target_player_id: PlayerId,
        offer: TradeSide,
        request: TradeSide,
    },
    AcceptTrade {
        trade_id: TradeId,
    },
    DeclineTrade {
        trade_id: TradeId,
    },
    PayJailFine,
    UseJailCard,
    EndTurn,
    DeclareBankruptcy,
}

impl ClientCommand {
    /// Commands valid before a game is joined.
    pub fn allowed_before_join(&self) -> bool {
        matches!(
            self,
            ClientCommand::CreateGame { .. } | ClientCommand::JoinGame { .. }
        )
    }
}
