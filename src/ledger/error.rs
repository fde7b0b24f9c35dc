//! Ledger error types.

use thiserror::Error;

use crate::core::money::Amount;
use crate::ledger::types::SessionId;

/// Errors returned by ledger operations. None of them leave partial writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Wager exceeds the balance.
    #[error("Insufficient balance: have {balance}, need {bet}")]
    InsufficientBalance { balance: Amount, bet: Amount },

    /// Wager is non-positive or outside the configured limits.
    #[error("Invalid bet amount: {0}")]
    InvalidBet(Amount),

    /// No live or settled session with this id.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Session was already settled.
    #[error("Session already ended: {0}")]
    SessionAlreadyEnded(SessionId),

    /// User already has a live session.
    #[error("Active session exists: {0}")]
    ActiveSessionExists(SessionId),

    /// User settled too recently.
    #[error("Cooldown active: {remaining_ms} ms remaining")]
    CooldownActive { remaining_ms: u64 },
}
