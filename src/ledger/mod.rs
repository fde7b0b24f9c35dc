//! Wager Ledger
//!
//! Balances, sessions and per-user history. Every settlement goes
//! through [`SessionLedger`], which serializes work per user.

pub mod error;
pub mod session_ledger;
pub mod store;
pub mod types;

pub use error::LedgerError;
pub use session_ledger::{BetLimits, GameStart, LedgerConfig, SessionLedger, Settlement};
pub use store::KeyedStore;
pub use types::{Account, HistoryEntry, Session, SessionId, SessionStatus, UserId};
