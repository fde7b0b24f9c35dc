//! Session Ledger
//!
//! Single source of truth for balances, live sessions and history.
//!
//! ## Locking
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  accounts: KeyedStore<UserId, Account>     (per-user mutex)  │
//! │  sessions: KeyedStore<SessionId, Session>  (per-session)     │
//! │  settled:  RwLock<BTreeSet<SessionId>>     (ids only)        │
//! │                                                              │
//! │  Lock order is always account → session.                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settled sessions leave the live table. Only their ids are kept in
//! `settled` so a repeated settlement reports `SessionAlreadyEnded`; the
//! final figures live on in the owner's history.

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::core::money::{Amount, Multiplier};
use crate::game::difficulty::Difficulty;
use crate::ledger::error::LedgerError;
use crate::ledger::store::{Entry, KeyedStore};
use crate::ledger::types::{Account, HistoryEntry, Session, SessionId, SessionStatus, UserId};

/// Inclusive wager bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BetLimits {
    pub min: Amount,
    pub max: Amount,
}

impl BetLimits {
    pub fn contains(&self, bet: Amount) -> bool {
        bet >= self.min && bet <= self.max
    }
}

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Balance of a user seen for the first time
    pub default_balance: Amount,
    /// Wait after a settlement before the same user may start again
    pub settle_cooldown: Duration,
    /// Optional wager bounds; only positivity is enforced when unset
    pub bet_limits: Option<BetLimits>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_balance: Amount::from_units(1000),
            settle_cooldown: Duration::from_secs(6),
            bet_limits: None,
        }
    }
}

impl LedgerConfig {
    /// Load from environment variables.
    ///
    /// - `LANE_DASH_DEFAULT_BALANCE` (units, default 1000)
    /// - `LANE_DASH_SETTLE_COOLDOWN_MS` (default 6000)
    /// - `MIN_BET_AMOUNT` and `MAX_BET_AMOUNT` (limits apply only when both are set)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(balance) = env_amount("LANE_DASH_DEFAULT_BALANCE") {
            config.default_balance = balance;
        }
        if let Some(ms) = env::var("LANE_DASH_SETTLE_COOLDOWN_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.settle_cooldown = Duration::from_millis(ms);
        }
        if let (Some(min), Some(max)) = (env_amount("MIN_BET_AMOUNT"), env_amount("MAX_BET_AMOUNT")) {
            config.bet_limits = Some(BetLimits { min, max });
        }

        config
    }

    /// Config without the post-settlement wait.
    pub fn without_cooldown() -> Self {
        Self {
            settle_cooldown: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_amount(key: &str) -> Option<Amount> {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(Amount::from_decimal)
}

/// Result of starting a game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStart {
    pub session: Session,
    /// Balance after the wager was taken
    pub balance: Amount,
}

/// Result of settling a session.
#[derive(Clone, Debug, PartialEq)]
pub struct Settlement {
    pub session: Session,
    pub win_amount: Amount,
    pub balance: Amount,
    /// Newest first, including this settlement
    pub history: Vec<HistoryEntry>,
}

/// The session ledger.
pub struct SessionLedger {
    config: LedgerConfig,
    accounts: KeyedStore<UserId, Account>,
    sessions: KeyedStore<SessionId, Session>,
    settled: RwLock<BTreeSet<SessionId>>,
}

impl SessionLedger {
    /// Create an empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            accounts: KeyedStore::new(),
            sessions: KeyedStore::new(),
            settled: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Take the wager and open an active session.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn start_game(
        &self,
        user_id: &UserId,
        bet: Amount,
        difficulty: Difficulty,
    ) -> Result<GameStart, LedgerError> {
        if !bet.is_positive() || self.config.bet_limits.is_some_and(|l| !l.contains(bet)) {
            return Err(LedgerError::InvalidBet(bet));
        }

        let default_balance = self.config.default_balance;
        let account = self
            .accounts
            .get_or_insert_with(user_id, || Account::new(default_balance))
            .await;
        let mut account = account.lock().await;

        if let Some(active) = account.active_session {
            if self.sessions.contains(&active).await {
                return Err(LedgerError::ActiveSessionExists(active));
            }
            account.active_session = None;
        }

        let now = Utc::now();
        if let Some(until) = account.cooldown_until {
            if until > now {
                let remaining_ms = (until - now).num_milliseconds().max(0) as u64;
                return Err(LedgerError::CooldownActive { remaining_ms });
            }
        }

        if account.balance < bet {
            return Err(LedgerError::InsufficientBalance {
                balance: account.balance,
                bet,
            });
        }

        account.balance -= bet;
        let session = Session::new(user_id.clone(), bet, difficulty);
        account.active_session = Some(session.id);
        self.sessions.insert(session.id, session.clone()).await;

        info!(session = %session.id.short(), %bet, %difficulty, balance = %account.balance, "game started");

        Ok(GameStart {
            session,
            balance: account.balance,
        })
    }

    /// Record progress of an active session.
    pub async fn update_state(
        &self,
        session_id: &SessionId,
        lane_index: usize,
        multiplier: Multiplier,
    ) -> Result<Session, LedgerError> {
        let entry = self.live_session(session_id).await?;
        let mut session = entry.lock().await;
        if !session.is_active() {
            return Err(LedgerError::SessionAlreadyEnded(*session_id));
        }

        session.current_lane_index = lane_index;
        session.current_multiplier = multiplier;
        debug!(session = %session_id.short(), lane_index, %multiplier, "session updated");
        Ok(session.clone())
    }

    /// Pay out `bet × current multiplier` and close the session.
    #[instrument(skip(self), fields(session = %session_id.short()))]
    pub async fn cash_out(&self, session_id: &SessionId) -> Result<Settlement, LedgerError> {
        self.settle(session_id, SessionStatus::CashedOut).await
    }

    /// Close the session as lost. Nothing is credited.
    #[instrument(skip(self), fields(session = %session_id.short()))]
    pub async fn crash(&self, session_id: &SessionId) -> Result<Settlement, LedgerError> {
        self.settle(session_id, SessionStatus::Crashed).await
    }

    /// Cancel an active session and return the wager.
    ///
    /// Writes no history and starts no cooldown; the id is forgotten.
    #[instrument(skip(self), fields(session = %session_id.short()))]
    pub async fn void(&self, session_id: &SessionId) -> Result<Amount, LedgerError> {
        let user_id = {
            let entry = self.live_session(session_id).await?;
            let session = entry.lock().await;
            session.user_id.clone()
        };

        let account = self
            .accounts
            .get(&user_id)
            .await
            .ok_or(LedgerError::SessionNotFound(*session_id))?;
        let mut account = account.lock().await;

        let entry = self.live_session(session_id).await?;
        let session = entry.lock().await;
        if !session.is_active() {
            return Err(LedgerError::SessionAlreadyEnded(*session_id));
        }

        account.balance += session.bet_amount;
        if account.active_session == Some(*session_id) {
            account.active_session = None;
        }
        drop(session);
        self.sessions.remove(session_id).await;

        info!(balance = %account.balance, "session voided");
        Ok(account.balance)
    }

    async fn settle(&self, session_id: &SessionId, status: SessionStatus) -> Result<Settlement, LedgerError> {
        let user_id = {
            let entry = self.live_session(session_id).await?;
            let session = entry.lock().await;
            session.user_id.clone()
        };

        let account = self
            .accounts
            .get(&user_id)
            .await
            .ok_or(LedgerError::SessionNotFound(*session_id))?;
        let mut account = account.lock().await;

        // Re-check under the account lock: a concurrent settlement may have won.
        let entry = self.live_session(session_id).await?;
        let mut session = entry.lock().await;
        if !session.is_active() {
            return Err(LedgerError::SessionAlreadyEnded(*session_id));
        }

        let now = Utc::now();
        let (final_multiplier, win_amount) = match status {
            SessionStatus::CashedOut => {
                let m = session.current_multiplier;
                (m, session.bet_amount.scale(m))
            }
            _ => (Multiplier::ZERO, Amount::ZERO),
        };

        session.status = status;
        session.end_time = Some(now);
        session.final_multiplier = Some(final_multiplier);
        session.final_balance_delta = Some(win_amount - session.bet_amount);
        if status == SessionStatus::Crashed {
            session.current_multiplier = Multiplier::ZERO;
        }

        account.balance += win_amount;
        account.history.insert(0, HistoryEntry::from_session(&session, win_amount, now));
        if account.active_session == Some(*session_id) {
            account.active_session = None;
        }
        account.cooldown_until = chrono::Duration::from_std(self.config.settle_cooldown)
            .ok()
            .map(|d| now + d);

        let record = session.clone();
        drop(session);
        self.settled.write().await.insert(*session_id);
        self.sessions.remove(session_id).await;

        info!(
            status = ?status,
            multiplier = %final_multiplier,
            win = %win_amount,
            balance = %account.balance,
            "session settled"
        );

        Ok(Settlement {
            session: record,
            win_amount,
            balance: account.balance,
            history: account.history.clone(),
        })
    }

    /// Live session handle, or the matching error for a missing or settled id.
    async fn live_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Entry<Session>, LedgerError> {
        if let Some(entry) = self.sessions.get(session_id).await {
            return Ok(entry);
        }
        if self.is_settled(session_id).await {
            return Err(LedgerError::SessionAlreadyEnded(*session_id));
        }
        Err(LedgerError::SessionNotFound(*session_id))
    }

    /// Current balance; the default balance for unknown users.
    pub async fn get_balance(&self, user_id: &UserId) -> Amount {
        match self.accounts.get(user_id).await {
            Some(account) => account.lock().await.balance,
            None => self.config.default_balance,
        }
    }

    /// Settled sessions, newest first; empty for unknown users.
    pub async fn get_history(&self, user_id: &UserId) -> Vec<HistoryEntry> {
        match self.accounts.get(user_id).await {
            Some(account) => account.lock().await.history.clone(),
            None => Vec::new(),
        }
    }

    /// Live session record.
    pub async fn get_session(&self, session_id: &SessionId) -> Option<Session> {
        match self.sessions.get(session_id).await {
            Some(entry) => Some(entry.lock().await.clone()),
            None => None,
        }
    }

    /// Whether the session was settled by this ledger.
    pub async fn is_settled(&self, session_id: &SessionId) -> bool {
        self.settled.read().await.contains(session_id)
    }

    /// Number of live sessions.
    pub async fn active_session_count(&self) -> usize {
        self.sessions.len().await
    }
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
