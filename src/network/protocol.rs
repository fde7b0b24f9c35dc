//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Messages are JSON, tagged by `type`. Lane selection may also be sent
//! as a compact bincode frame.

use serde::{Serialize, Deserialize};

use crate::core::fixed::to_float;
use crate::core::money::{Amount, Multiplier};
use crate::game::difficulty::Difficulty;
use crate::game::events::GameEvent;
use crate::game::state::{Outcome, RunError, RunPhase, RunState};
use crate::game::traffic::{Obstacle, VehicleKind};
use crate::ledger::error::LedgerError;
use crate::ledger::session_ledger::Settlement;
use crate::ledger::types::{HistoryEntry, Session, SessionId, UserId};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Place a wager and start a run.
    StartGame(StartGameRequest),

    /// Move to the next lane.
    UpdateGame(UpdateGameRequest),

    /// Bank the current multiplier.
    CashOut(SessionRequest),

    /// Report a crash seen by the client.
    Crash(SessionRequest),

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// Wager request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub user_id: UserId,
    pub bet_amount: Amount,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Lane progress from the client.
///
/// The multiplier is the client's own view and is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameRequest {
    pub session_id: SessionId,
    pub lane_index: usize,
    #[serde(default)]
    pub multiplier: Option<Multiplier>,
}

/// Request naming only a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: SessionId,
}

/// Binary lane selection frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSelectFrame {
    pub session_id: [u8; 16],
    pub lane_index: u32,
}

impl LaneSelectFrame {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Equivalent JSON request.
    pub fn to_request(&self) -> UpdateGameRequest {
        UpdateGameRequest {
            session_id: SessionId(uuid::Uuid::from_bytes(self.session_id)),
            lane_index: self.lane_index as usize,
            multiplier: None,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Wager accepted, run started.
    GameStarted(GameStartedInfo),

    /// Lane selection accepted.
    GameUpdated(GameUpdatedInfo),

    /// Session settled with a payout (cash-out or win).
    CashedOut(SettlementInfo),

    /// Session settled as lost.
    Crashed(SettlementInfo),

    /// Run snapshot (every tick while a run is live).
    State(RunSnapshot),

    /// Game event notification.
    Event(GameEvent),

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedInfo {
    pub session: Session,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdatedInfo {
    pub session: Session,
    pub obstacles: Vec<ObstacleView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementInfo {
    pub session: Session,
    pub balance: Amount,
    pub history: Vec<HistoryEntry>,
}

impl From<Settlement> for SettlementInfo {
    fn from(s: Settlement) -> Self {
        Self {
            session: s.session,
            balance: s.balance,
            history: s.history,
        }
    }
}

/// Vehicle as drawn by the client, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleView {
    pub id: u32,
    pub lane_index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub kind: VehicleKind,
    pub is_hazard_formation: bool,
}

impl From<&Obstacle> for ObstacleView {
    fn from(o: &Obstacle) -> Self {
        Self {
            id: o.id,
            lane_index: o.lane_index,
            x: to_float(o.position.x),
            y: to_float(o.position.y),
            width: to_float(o.width),
            height: to_float(o.height),
            speed: to_float(o.speed),
            kind: o.kind,
            is_hazard_formation: o.is_hazard_formation,
        }
    }
}

/// Checkpoint as shown to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointView {
    pub lane_index: usize,
    pub multiplier: Multiplier,
    pub collected: bool,
}

/// Public view of a run. Crash lanes are never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub session_id: SessionId,
    pub tick: u64,
    pub outcome: Outcome,
    pub current_lane_index: usize,
    pub target_lane_index: Option<usize>,
    pub is_transitioning: bool,
    pub current_multiplier: Multiplier,
    pub payout: Amount,
    pub player_x: f32,
    pub player_y: f32,
    pub checkpoints: Vec<CheckpointView>,
    pub obstacles: Vec<ObstacleView>,
}

impl RunSnapshot {
    pub fn capture(session_id: SessionId, state: &RunState) -> Self {
        let (x, y) = state.position.to_floats();
        Self {
            session_id,
            tick: state.tick,
            outcome: match state.phase {
                RunPhase::Settled { outcome, .. } => outcome,
                _ => Outcome::InProgress,
            },
            current_lane_index: state.player.current_lane_index,
            target_lane_index: state.player.target_lane_index,
            is_transitioning: state.player.is_transitioning,
            current_multiplier: state.player.current_multiplier,
            payout: state.payout,
            player_x: x,
            player_y: y,
            checkpoints: state
                .checkpoints
                .values()
                .map(|c| CheckpointView {
                    lane_index: c.lane_index,
                    multiplier: c.multiplier,
                    collected: c.collected,
                })
                .collect(),
            obstacles: state.traffic.obstacles().map(ObstacleView::from).collect(),
        }
    }
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Wager exceeds the balance.
    InsufficientBalance,
    /// Unknown session.
    SessionNotFound,
    /// Session already settled.
    SessionAlreadyEnded,
    /// Not the next lane, or a move is underway.
    InvalidLaneTransition,
    /// Wager non-positive or out of limits.
    InvalidBet,
    /// User already has a live session.
    ActiveSessionExists,
    /// Settled too recently.
    CooldownActive,
    /// Malformed message.
    InvalidInput,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&LedgerError> for ErrorCode {
    fn from(err: &LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            LedgerError::InvalidBet(_) => ErrorCode::InvalidBet,
            LedgerError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            LedgerError::SessionAlreadyEnded(_) => ErrorCode::SessionAlreadyEnded,
            LedgerError::ActiveSessionExists(_) => ErrorCode::ActiveSessionExists,
            LedgerError::CooldownActive { .. } => ErrorCode::CooldownActive,
        }
    }
}

impl From<&RunError> for ErrorCode {
    fn from(err: &RunError) -> Self {
        match err {
            RunError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            RunError::InvalidBet(_) => ErrorCode::InvalidBet,
            RunError::InvalidLaneTransition { .. } => ErrorCode::InvalidLaneTransition,
            RunError::NotInProgress => ErrorCode::SessionAlreadyEnded,
            RunError::RunInProgress => ErrorCode::ActiveSessionExists,
            RunError::CooldownActive { .. } => ErrorCode::CooldownActive,
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(err: LedgerError) -> Self {
        Self::new(ErrorCode::from(&err), err.to_string())
    }
}

impl From<RunError> for ServerError {
    fn from(err: RunError) -> Self {
        Self::new(ErrorCode::from(&err), err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Error message from anything convertible to [`ServerError`].
    pub fn error(err: impl Into<ServerError>) -> Self {
        ServerMessage::Error(err.into())
    }
}
