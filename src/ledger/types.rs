//! Session and history records.
//!
//! Field names are camelCase on the wire, matching the web client.

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::money::{Amount, Multiplier};
use crate::game::difficulty::Difficulty;

/// Player account identifier, chosen by the client.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Crashed,
    CashedOut,
}

/// One wager-to-settlement lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub bet_amount: Amount,
    pub difficulty: Difficulty,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub current_lane_index: usize,
    pub current_multiplier: Multiplier,
    pub final_multiplier: Option<Multiplier>,
    /// Payout minus wager, set on settlement
    pub final_balance_delta: Option<Amount>,
}

impl Session {
    pub fn new(user_id: UserId, bet_amount: Amount, difficulty: Difficulty) -> Self {
        Self {
            id: SessionId::new_v4(),
            user_id,
            bet_amount,
            difficulty,
            status: SessionStatus::Active,
            start_time: Utc::now(),
            end_time: None,
            current_lane_index: 0,
            current_multiplier: Multiplier::ONE,
            final_multiplier: None,
            final_balance_delta: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Settled session as shown in the player's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub session_id: SessionId,
    pub bet_amount: Amount,
    /// Zero for a crash
    pub multiplier: Multiplier,
    pub win_amount: Amount,
    pub profit: Amount,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Entry for a settled session.
    pub fn from_session(session: &Session, win_amount: Amount, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id,
            bet_amount: session.bet_amount,
            multiplier: session.final_multiplier.unwrap_or(Multiplier::ZERO),
            win_amount,
            profit: win_amount - session.bet_amount,
            timestamp,
        }
    }
}

/// Balance and history of one user.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub balance: Amount,
    /// Newest first
    pub history: Vec<HistoryEntry>,
    pub active_session: Option<SessionId>,
    /// No new session may start before this instant
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(balance: Amount) -> Self {
        Self {
            balance,
            history: Vec::new(),
            active_session: None,
            cooldown_until: None,
        }
    }
}
