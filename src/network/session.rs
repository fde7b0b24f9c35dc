//! Live Game Sessions
//!
//! Couples each ledger session to the authoritative run that decides it.
//! The run is simulated here; every arrival, crash and win is written to
//! the ledger inside the same session lock, so the two never disagree.
//!
//! Lock order: live session → ledger account → ledger session record.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::core::money::{Amount, Multiplier};
use crate::core::rng::derive_run_seed;
use crate::game::difficulty::Difficulty;
use crate::game::events::{CrashCause, GameEventData};
use crate::game::state::{RunError, RunState};
use crate::game::tick::{tick, RunConfig, TickResult};
use crate::ledger::error::LedgerError;
use crate::ledger::session_ledger::SessionLedger;
use crate::ledger::types::{SessionId, UserId};
use crate::network::protocol::{
    ErrorCode, GameStartedInfo, GameUpdatedInfo, ObstacleView, RunSnapshot, ServerError,
    ServerMessage, SettlementInfo,
};

/// Lifecycle of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Run is live and ticking.
    Playing,
    /// Client went away; the run is frozen until it comes back.
    Detached,
    /// Run settled and the ledger updated.
    Ended,
}

/// One player's live run.
pub struct GameSession {
    /// Ledger session id.
    pub id: SessionId,
    pub user_id: UserId,
    run: RunState,
    config: Arc<RunConfig>,
    state: SessionState,
    sender: Option<mpsc::Sender<ServerMessage>>,
    /// A tick loop currently drives this run.
    ticking: bool,
    created_at: Instant,
}

impl GameSession {
    /// Create a session in the betting phase.
    pub fn new(
        id: SessionId,
        user_id: UserId,
        rng_seed: u64,
        difficulty: Difficulty,
        config: Arc<RunConfig>,
    ) -> Self {
        Self {
            id,
            user_id,
            run: RunState::new(rng_seed, difficulty, &config),
            config,
            state: SessionState::Playing,
            sender: None,
            ticking: false,
            created_at: Instant::now(),
        }
    }

    /// Place the wager. `balance` is the balance before the debit.
    pub fn start(&mut self, bet: Amount, balance: Amount) -> Result<(), SessionError> {
        self.run.start_game(bet, balance, &self.config)?;
        Ok(())
    }

    /// Begin moving to `lane_index`.
    ///
    /// `claimed` is the client's multiplier for that lane. It is compared
    /// against the table and otherwise ignored.
    pub fn select_lane(&mut self, lane_index: usize, claimed: Option<Multiplier>) -> Result<(), SessionError> {
        self.run.select_next_lane(lane_index)?;

        if let Some(claimed) = claimed {
            if lane_index < self.run.multipliers.values().len() {
                let expected = self.run.multipliers.multiplier(lane_index);
                if claimed != expected {
                    debug!(
                        session = %self.id.short(),
                        lane_index,
                        %claimed,
                        %expected,
                        "client multiplier ignored"
                    );
                }
            }
        }
        Ok(())
    }

    /// Run a single game tick.
    pub fn run_tick(&mut self) -> Option<TickResult> {
        if self.state != SessionState::Playing {
            return None;
        }
        Some(tick(&mut self.run, &self.config))
    }

    /// Public snapshot of the run.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot::capture(self.id, &self.run)
    }

    /// Vehicles currently on the road.
    pub fn obstacles(&self) -> Vec<ObstacleView> {
        self.run.traffic.obstacles().map(ObstacleView::from).collect()
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn get_state(&self) -> SessionState {
        self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.run.tick
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Attach the client's outbound channel and resume a detached run.
    pub fn attach(&mut self, sender: mpsc::Sender<ServerMessage>) {
        self.sender = Some(sender);
        if self.state == SessionState::Detached {
            self.state = SessionState::Playing;
        }
    }

    /// Claim the run for a new tick loop.
    ///
    /// Returns false if the run is not playing or a loop already owns it.
    pub fn claim_ticker(&mut self) -> bool {
        if self.state != SessionState::Playing || self.ticking {
            return false;
        }
        self.ticking = true;
        true
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Drop the outbound channel and freeze the run.
    pub fn detach(&mut self) {
        self.sender = None;
        if self.state == SessionState::Playing {
            self.state = SessionState::Detached;
        }
    }

    /// Send a message to the client, if one is attached.
    pub async fn send(&self, message: ServerMessage) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(message).await;
        }
    }
}

/// Messages produced by one tick of a live session.
#[derive(Debug, Default)]
pub struct TickUpdate {
    pub messages: Vec<ServerMessage>,
    /// Run and ledger are both settled
    pub finished: bool,
    /// Run is detached; the loop releases it until a client re-attaches
    pub parked: bool,
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Rejected run action.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Rejected ledger operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Run(e) => e.into(),
            SessionError::Ledger(e) => e.into(),
        }
    }
}

impl From<&SessionError> for ErrorCode {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Run(e) => e.into(),
            SessionError::Ledger(e) => e.into(),
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Manages all live sessions.
pub struct SessionManager {
    /// Live sessions.
    sessions: RwLock<BTreeMap<SessionId, Arc<RwLock<GameSession>>>>,
    /// User to live session mapping.
    user_sessions: RwLock<BTreeMap<UserId, SessionId>>,
    ledger: Arc<SessionLedger>,
    run_config: Arc<RunConfig>,
    server_seed: [u8; 32],
}

impl SessionManager {
    /// Create a session manager with a fresh per-process seed.
    pub fn new(ledger: Arc<SessionLedger>, run_config: RunConfig) -> Self {
        let mut server_seed = [0u8; 32];
        server_seed[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        server_seed[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::with_seed(ledger, run_config, server_seed)
    }

    /// Create a session manager with a fixed server seed.
    pub fn with_seed(ledger: Arc<SessionLedger>, run_config: RunConfig, server_seed: [u8; 32]) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            user_sessions: RwLock::new(BTreeMap::new()),
            ledger,
            run_config: Arc::new(run_config),
            server_seed,
        }
    }

    pub fn ledger(&self) -> &Arc<SessionLedger> {
        &self.ledger
    }

    /// Take the wager and open a live run.
    pub async fn start_game(
        &self,
        user_id: UserId,
        bet: Amount,
        difficulty: Difficulty,
        sender: Option<mpsc::Sender<ServerMessage>>,
    ) -> Result<(Arc<RwLock<GameSession>>, GameStartedInfo), SessionError> {
        let start = self.ledger.start_game(&user_id, bet, difficulty).await?;
        let id = start.session.id;

        let seed = derive_run_seed(&self.server_seed, id.as_bytes(), user_id.as_str());
        let mut session = GameSession::new(id, user_id.clone(), seed, difficulty, self.run_config.clone());
        if let Some(sender) = sender {
            session.attach(sender);
        }

        if let Err(e) = session.start(bet, start.balance + bet) {
            // The ledger already took the wager; hand it back.
            warn!(session = %id.short(), error = %e, "run rejected wager, refunding");
            if let Err(void_err) = self.ledger.void(&id).await {
                error!(session = %id.short(), error = %void_err, "refund failed");
            }
            return Err(e);
        }

        let session = Arc::new(RwLock::new(session));
        self.sessions.write().await.insert(id, session.clone());
        self.user_sessions.write().await.insert(user_id, id);

        Ok((session, GameStartedInfo {
            session: start.session,
            balance: start.balance,
        }))
    }

    /// Start moving to the next lane.
    pub async fn update_game(
        &self,
        id: &SessionId,
        lane_index: usize,
        claimed: Option<Multiplier>,
    ) -> Result<GameUpdatedInfo, SessionError> {
        let session = self.live_session(id).await?;
        let mut s = session.write().await;
        if s.get_state() == SessionState::Ended {
            return Err(LedgerError::SessionAlreadyEnded(*id).into());
        }
        s.select_lane(lane_index, claimed)?;

        let record = self
            .ledger
            .get_session(id)
            .await
            .ok_or(LedgerError::SessionNotFound(*id))?;

        Ok(GameUpdatedInfo {
            session: record,
            obstacles: s.obstacles(),
        })
    }

    /// Bank the current multiplier.
    pub async fn cash_out(&self, id: &SessionId) -> Result<SettlementInfo, SessionError> {
        let Some(session) = self.get_session(id).await else {
            // Not live here: the ledger settles it or reports why not.
            let settlement = self.ledger.cash_out(id).await?;
            return Ok(SettlementInfo::from(settlement));
        };

        let mut s = session.write().await;
        if s.run.is_in_progress() {
            s.run.cash_out()?;
            let lane = s.run.player.current_lane_index;
            let multiplier = s.run.player.current_multiplier;
            self.ledger.update_state(id, lane, multiplier).await?;
        }

        let settlement = self.ledger.cash_out(id).await?;
        s.state = SessionState::Ended;
        Ok(SettlementInfo::from(settlement))
    }

    /// Settle as lost on the client's report.
    pub async fn crash(&self, id: &SessionId) -> Result<SettlementInfo, SessionError> {
        let Some(session) = self.get_session(id).await else {
            let settlement = self.ledger.crash(id).await?;
            return Ok(SettlementInfo::from(settlement));
        };

        let mut s = session.write().await;
        if s.run.is_in_progress() {
            s.run.forfeit()?;
        }

        let settlement = self.ledger.crash(id).await?;
        s.state = SessionState::Ended;
        Ok(SettlementInfo::from(settlement))
    }

    /// Run one tick and write its outcome to the ledger.
    pub async fn advance(&self, session: &Arc<RwLock<GameSession>>) -> Result<TickUpdate, SessionError> {
        let mut s = session.write().await;
        let id = s.id;

        let result = match s.run_tick() {
            Some(result) => result,
            None => {
                let parked = s.get_state() == SessionState::Detached;
                if parked {
                    s.ticking = false;
                }
                return Ok(TickUpdate {
                    messages: Vec::new(),
                    finished: s.get_state() == SessionState::Ended,
                    parked,
                });
            }
        };

        let mut update = TickUpdate::default();
        let mut settlement = None;

        for event in &result.events {
            match &event.data {
                GameEventData::CheckpointCollected { lane_index, multiplier, .. } => {
                    self.ledger.update_state(&id, *lane_index, *multiplier).await?;
                }
                GameEventData::Won { multiplier, .. } => {
                    let lane = s.run.topology.final_index();
                    self.ledger.update_state(&id, lane, *multiplier).await?;
                    let settled = self.ledger.cash_out(&id).await?;
                    settlement = Some(ServerMessage::CashedOut(SettlementInfo::from(settled)));
                }
                GameEventData::Crashed { cause, .. } if *cause != CrashCause::Reported => {
                    let settled = self.ledger.crash(&id).await?;
                    settlement = Some(ServerMessage::Crashed(SettlementInfo::from(settled)));
                }
                _ => {}
            }

            if event.is_public() {
                update.messages.push(ServerMessage::Event(event.clone()));
            }
        }

        if let Some(message) = settlement {
            update.messages.push(message);
        }
        update.messages.push(ServerMessage::State(s.snapshot()));

        if s.run.is_settled() {
            s.state = SessionState::Ended;
            update.finished = true;
            info!(
                session = %id.short(),
                outcome = ?s.run.outcome(),
                tick = s.current_tick(),
                "run finished"
            );
        }

        Ok(update)
    }

    /// Live session, or the ledger's view of why there is none.
    async fn live_session(&self, id: &SessionId) -> Result<Arc<RwLock<GameSession>>, SessionError> {
        if let Some(session) = self.get_session(id).await {
            return Ok(session);
        }
        if self.ledger.is_settled(id).await {
            return Err(LedgerError::SessionAlreadyEnded(*id).into());
        }
        Err(LedgerError::SessionNotFound(*id).into())
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &SessionId) -> Option<Arc<RwLock<GameSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Get the live session of a user.
    pub async fn get_user_session(&self, user_id: &UserId) -> Option<Arc<RwLock<GameSession>>> {
        let user_sessions = self.user_sessions.read().await;
        if let Some(id) = user_sessions.get(user_id) {
            self.get_session(id).await
        } else {
            None
        }
    }

    /// Freeze the runs of a disconnected client.
    pub async fn detach_user(&self, user_id: &UserId) {
        if let Some(session) = self.get_user_session(user_id).await {
            let mut s = session.write().await;
            s.detach();
            debug!(session = %s.id.short(), user = %user_id, "session detached");
        }
    }

    /// Remove a session.
    pub async fn remove_session(&self, id: &SessionId) {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = removed {
            let user_id = session.read().await.user_id.clone();
            let mut user_sessions = self.user_sessions.write().await;
            if user_sessions.get(&user_id) == Some(id) {
                user_sessions.remove(&user_id);
            }
        }
    }

    /// Get live session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove ended sessions.
    pub async fn cleanup(&self) {
        let mut to_remove = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if session.read().await.get_state() == SessionState::Ended {
                    to_remove.push(*id);
                }
            }
        }

        for id in to_remove {
            self.remove_session(&id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Outcome;
    use crate::game::traffic::{ObstacleSpec, VehicleKind};
    use crate::ledger::session_ledger::LedgerConfig;
    use crate::ledger::types::SessionStatus;

    fn manager() -> SessionManager {
        let ledger = Arc::new(SessionLedger::new(LedgerConfig::without_cooldown()));
        SessionManager::with_seed(ledger, RunConfig::quiet(), [7; 32])
    }

    fn alice() -> UserId {
        UserId::from("alice")
    }

    /// Replace the drawn crash lanes of a live run.
    async fn set_traps(session: &Arc<RwLock<GameSession>>, lanes: &[usize]) {
        let mut s = session.write().await;
        s.run.traps.retain(|lane, _| lanes.contains(lane));
        for &lane in lanes {
            s.run.traps.entry(lane).or_insert_with(|| {
                crate::game::trap::CrashTrap::new(lane, crate::game::trap::TrapPattern::Wall)
            });
        }
    }

    /// Tick until the player stops moving or the run ends.
    async fn drive(manager: &SessionManager, session: &Arc<RwLock<GameSession>>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        for _ in 0..200 {
            let update = manager.advance(session).await.unwrap();
            messages.extend(update.messages);
            let s = session.read().await;
            if update.finished || !s.run.player.is_transitioning {
                break;
            }
        }
        messages
    }

    #[tokio::test]
    async fn test_start_game_debits_and_registers() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(2), Difficulty::Easy, None)
            .await
            .unwrap();

        assert_eq!(info.balance, Amount::from_units(998));
        assert_eq!(manager.session_count().await, 1);
        assert!(manager.get_user_session(&alice()).await.is_some());
        assert!(session.read().await.run.is_in_progress());
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_no_session() {
        let ledger = Arc::new(SessionLedger::new(LedgerConfig {
            default_balance: Amount::from_units(5),
            ..LedgerConfig::without_cooldown()
        }));
        let manager = SessionManager::with_seed(ledger, RunConfig::quiet(), [1; 32]);

        let err = manager
            .start_game(alice(), Amount::from_units(10), Difficulty::Easy, None)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, SessionError::Ledger(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ServerError::from(err).code, ErrorCode::InsufficientBalance);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_arrival_updates_ledger() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Easy, None)
            .await
            .unwrap();
        let id = info.session.id;
        set_traps(&session, &[]).await;

        manager.update_game(&id, 1, Some(Multiplier::from_hundredths(999))).await.unwrap();
        drive(&manager, &session).await;

        let record = manager.ledger().get_session(&id).await.unwrap();
        assert_eq!(record.current_lane_index, 1);
        assert_eq!(record.current_multiplier, Multiplier::from_hundredths(120));
    }

    #[tokio::test]
    async fn test_cash_out_mid_run() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Easy, None)
            .await
            .unwrap();
        let id = info.session.id;
        set_traps(&session, &[]).await;

        for lane in 1..=3 {
            manager.update_game(&id, lane, None).await.unwrap();
            drive(&manager, &session).await;
        }
        let settlement = manager.cash_out(&id).await.unwrap();

        assert_eq!(settlement.session.status, SessionStatus::CashedOut);
        assert_eq!(settlement.session.final_multiplier, Some(Multiplier::from_hundredths(150)));
        assert_eq!(settlement.history[0].win_amount, Amount::from_cents(150));
        assert_eq!(settlement.balance, Amount::from_cents(100_050));

        // Second attempt reports the settled session
        let err = manager.cash_out(&id).await.err().unwrap();
        assert_eq!(err, SessionError::Ledger(LedgerError::SessionAlreadyEnded(id)));
    }

    #[tokio::test]
    async fn test_crash_lane_settles_ledger() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(2), Difficulty::Medium, None)
            .await
            .unwrap();
        let id = info.session.id;
        set_traps(&session, &[6]).await;

        let mut messages = Vec::new();
        for lane in 1..=6 {
            manager.update_game(&id, lane, None).await.unwrap();
            messages.extend(drive(&manager, &session).await);
        }

        assert_eq!(session.read().await.run.outcome(), Outcome::Crashed);
        assert_eq!(session.read().await.get_state(), SessionState::Ended);
        assert!(messages.iter().any(|m| matches!(m, ServerMessage::Crashed(_))));

        let history = manager.ledger().get_history(&alice()).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].multiplier, Multiplier::ZERO);
        assert_eq!(manager.ledger().get_balance(&alice()).await, Amount::from_units(998));

        // Lane selection after the crash is refused
        assert!(manager.update_game(&id, 7, None).await.is_err());
    }

    #[tokio::test]
    async fn test_full_run_wins() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(2), Difficulty::Easy, None)
            .await
            .unwrap();
        let id = info.session.id;
        set_traps(&session, &[]).await;

        let final_lane = session.read().await.run.topology.final_index();
        let mut messages = Vec::new();
        for lane in 1..=final_lane {
            manager.update_game(&id, lane, None).await.unwrap();
            messages.extend(drive(&manager, &session).await);
        }

        let cashed = messages.iter().find_map(|m| match m {
            ServerMessage::CashedOut(info) => Some(info.clone()),
            _ => None,
        });
        let cashed = cashed.unwrap();
        assert_eq!(cashed.session.final_multiplier, Some(Multiplier::from_hundredths(400)));
        assert_eq!(cashed.history[0].win_amount, Amount::from_units(8));
        assert_eq!(cashed.balance, Amount::from_units(1006));

        manager.cleanup().await;
        assert_eq!(manager.session_count().await, 0);
        assert!(manager.get_user_session(&alice()).await.is_none());
    }

    #[tokio::test]
    async fn test_collision_settles_as_crash() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Hard, None)
            .await
            .unwrap();
        set_traps(&session, &[]).await;

        {
            let mut s = session.write().await;
            let topology = s.run.topology.clone();
            let spec = ObstacleSpec {
                lane_index: 0,
                y: s.run.position.y,
                speed: 0,
                kind: VehicleKind::Truck,
                formation_id: None,
            };
            s.run.traffic.inject(&topology, vec![spec]);
        }

        let update = manager.advance(&session).await.unwrap();
        assert!(update.finished);
        assert!(update.messages.iter().any(|m| matches!(m, ServerMessage::Crashed(_))));

        assert!(manager.ledger().is_settled(&info.session.id).await);
        let history = manager.ledger().get_history(&alice()).await;
        assert_eq!(history[0].multiplier, Multiplier::ZERO);
    }

    #[tokio::test]
    async fn test_reported_crash() {
        let manager = manager();
        let (session, info) = manager
            .start_game(alice(), Amount::from_units(3), Difficulty::Easy, None)
            .await
            .unwrap();
        let id = info.session.id;

        let settlement = manager.crash(&id).await.unwrap();
        assert_eq!(settlement.session.status, SessionStatus::Crashed);
        assert_eq!(settlement.balance, Amount::from_units(997));

        // The next tick only flushes events; the ledger is not touched again
        let update = manager.advance(&session).await.unwrap();
        assert!(update.finished);
        assert_eq!(manager.ledger().get_history(&alice()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_detached_run_is_frozen() {
        let manager = manager();
        let (tx, _rx) = mpsc::channel(16);
        let (session, _) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Easy, Some(tx))
            .await
            .unwrap();

        manager.detach_user(&alice()).await;
        let before = session.read().await.current_tick();
        manager.advance(&session).await.unwrap();
        assert_eq!(session.read().await.current_tick(), before);
        assert_eq!(session.read().await.get_state(), SessionState::Detached);

        let (tx, _rx) = mpsc::channel(16);
        session.write().await.attach(tx);
        manager.advance(&session).await.unwrap();
        assert_eq!(session.read().await.current_tick(), before + 1);
    }

    #[tokio::test]
    async fn test_detached_run_releases_ticker() {
        let manager = manager();
        let (tx, _rx) = mpsc::channel(16);
        let (session, _) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Easy, Some(tx))
            .await
            .unwrap();
        assert!(session.write().await.claim_ticker());
        assert!(!session.write().await.claim_ticker());

        manager.detach_user(&alice()).await;
        let update = manager.advance(&session).await.unwrap();
        assert!(update.parked);
        assert!(!update.finished);
        assert!(!session.read().await.is_ticking());

        // Cannot claim while detached
        assert!(!session.write().await.claim_ticker());

        let (tx, _rx) = mpsc::channel(16);
        session.write().await.attach(tx);
        assert!(session.write().await.claim_ticker());
    }

    #[tokio::test]
    async fn test_reattach_before_park_keeps_ticker() {
        let manager = manager();
        let (session, _) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Easy, None)
            .await
            .unwrap();
        assert!(session.write().await.claim_ticker());

        manager.detach_user(&alice()).await;
        let (tx, _rx) = mpsc::channel(16);
        session.write().await.attach(tx);

        // The running loop never saw the detach, so it still owns the run
        assert!(!session.write().await.claim_ticker());
        let update = manager.advance(&session).await.unwrap();
        assert!(!update.parked);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let manager = manager();
        let id = SessionId::new_v4();
        assert_eq!(
            manager.update_game(&id, 1, None).await.err(),
            Some(SessionError::Ledger(LedgerError::SessionNotFound(id)))
        );
        assert_eq!(
            manager.cash_out(&id).await.err(),
            Some(SessionError::Ledger(LedgerError::SessionNotFound(id)))
        );
    }

    #[tokio::test]
    async fn test_invalid_lane_transition() {
        let manager = manager();
        let (_, info) = manager
            .start_game(alice(), Amount::from_units(1), Difficulty::Easy, None)
            .await
            .unwrap();

        let err = manager.update_game(&info.session.id, 3, None).await.err().unwrap();
        assert_eq!(err, SessionError::Run(RunError::InvalidLaneTransition { from: 0, to: 3 }));
        assert_eq!(ErrorCode::from(&err), ErrorCode::InvalidLaneTransition);
    }
}
