//! Network Layer
//!
//! WebSocket server and HTTP query routes.
//! This layer is **non-deterministic** - all game logic runs through `game/`,
//! all money moves through `ledger/`.

pub mod http;
pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, ServerError, ErrorCode, RunSnapshot, ObstacleView,
    LaneSelectFrame,
};
pub use session::{GameSession, SessionState, SessionManager, SessionError, TickUpdate};
pub use server::{GameServer, ServerConfig, GameServerError};
