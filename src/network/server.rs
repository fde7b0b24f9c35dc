//! WebSocket Game Server
//!
//! Async WebSocket server for player connections. Routes wagers, lane
//! selections and settlements to the session manager and drives one
//! tick loop per live run.

use std::collections::BTreeMap;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::ledger::types::{SessionId, UserId};
use crate::network::protocol::{
    ClientMessage, ErrorCode, LaneSelectFrame, ServerError, ServerMessage, StartGameRequest,
    UpdateGameRequest,
};
use crate::network::session::{GameSession, SessionManager};
use crate::TICK_RATE;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket bind address.
    pub bind_addr: SocketAddr,
    /// HTTP query route bind address.
    pub http_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle connections are dropped after this long.
    pub idle_timeout: Duration,
    /// Tick rate for game simulation (Hz).
    pub tick_rate: u32,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            tick_rate: TICK_RATE,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from environment variables.
    ///
    /// - `LANE_DASH_WS_ADDR` (default 0.0.0.0:8080)
    /// - `LANE_DASH_HTTP_ADDR` (default 0.0.0.0:3001)
    /// - `LANE_DASH_TICK_RATE` (default 60)
    /// - `LANE_DASH_MAX_CONNECTIONS` (default 1000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parse("LANE_DASH_WS_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(addr) = env_parse("LANE_DASH_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(rate) = env_parse::<u32>("LANE_DASH_TICK_RATE").filter(|&r| r > 0) {
            config.tick_rate = rate;
        }
        if let Some(max) = env_parse("LANE_DASH_MAX_CONNECTIONS") {
            config.max_connections = max;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// User named by the last wager.
    user_id: Option<UserId>,
    /// Session this client last acted on.
    session_id: Option<SessionId>,
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Session manager.
    sessions: Arc<SessionManager>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, sessions: Arc<SessionManager>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            sessions,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);

        let cleanup_clients = self.clients.clone();
        let cleanup_sessions = self.sessions.clone();
        let idle_timeout = self.config.idle_timeout;

        // Spawn cleanup task
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, cleanup_sessions, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let sessions = self.sessions.clone();
        let config = self.config.clone();
        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(256);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    user_id: None,
                    session_id: None,
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                });
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let ctx = ConnectionContext {
                addr,
                clients: &clients,
                sessions: &sessions,
                config: &config,
                sender: &msg_tx,
                shutdown_tx: &shutdown_tx,
            };

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::Error(ServerError::new(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        ))).await;
                                        continue;
                                    }
                                };

                                ctx.touch().await;
                                Self::handle_client_message(&ctx, client_msg).await;
                            }
                            Some(Ok(Message::Binary(data))) => {
                                match LaneSelectFrame::from_bytes(&data) {
                                    Ok(frame) => {
                                        ctx.touch().await;
                                        Self::handle_client_message(&ctx, ClientMessage::UpdateGame(frame.to_request())).await;
                                    }
                                    Err(e) => {
                                        debug!("Invalid binary frame from {}: {}", addr, e);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();

            let removed = clients.write().await.remove(&addr);
            if let Some(client) = removed {
                if let Some(user_id) = client.user_id {
                    sessions.detach_user(&user_id).await;
                }
                debug!(
                    "Client {} connected for {:?}, last session {:?}",
                    addr,
                    client.connected_at.elapsed(),
                    client.session_id.map(|id| id.short())
                );
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message.
    async fn handle_client_message(ctx: &ConnectionContext<'_>, msg: ClientMessage) {
        match msg {
            ClientMessage::StartGame(req) => {
                Self::handle_start_game(ctx, req).await;
            }
            ClientMessage::UpdateGame(req) => {
                Self::handle_update_game(ctx, req).await;
            }
            ClientMessage::CashOut(req) => {
                ctx.bind_session(&req.session_id).await;
                let reply = match ctx.sessions.cash_out(&req.session_id).await {
                    Ok(info) => ServerMessage::CashedOut(info),
                    Err(e) => ServerMessage::error(e),
                };
                let _ = ctx.sender.send(reply).await;
            }
            ClientMessage::Crash(req) => {
                ctx.bind_session(&req.session_id).await;
                let reply = match ctx.sessions.crash(&req.session_id).await {
                    Ok(info) => ServerMessage::Crashed(info),
                    Err(e) => ServerMessage::error(e),
                };
                let _ = ctx.sender.send(reply).await;
            }
            ClientMessage::Ping { timestamp } => {
                let _ = ctx.sender.send(ServerMessage::Pong {
                    timestamp,
                    server_time: chrono::Utc::now().timestamp_millis() as u64,
                }).await;
            }
        }
    }

    /// Handle a wager.
    async fn handle_start_game(ctx: &ConnectionContext<'_>, req: StartGameRequest) {
        let result = ctx
            .sessions
            .start_game(req.user_id.clone(), req.bet_amount, req.difficulty, Some(ctx.sender.clone()))
            .await;

        let (session, info) = match result {
            Ok(started) => started,
            Err(e) => {
                debug!(user = %req.user_id, error = %e, "start_game rejected");
                let _ = ctx.sender.send(ServerMessage::error(e)).await;
                return;
            }
        };

        {
            let mut clients = ctx.clients.write().await;
            if let Some(client) = clients.get_mut(&ctx.addr) {
                client.user_id = Some(req.user_id);
                client.session_id = Some(info.session.id);
            }
        }

        let _ = ctx.sender.send(ServerMessage::GameStarted(info)).await;

        ctx.spawn_game_loop(session).await;
    }

    /// Handle a lane selection.
    async fn handle_update_game(ctx: &ConnectionContext<'_>, req: UpdateGameRequest) {
        ctx.bind_session(&req.session_id).await;
        let reply = match ctx
            .sessions
            .update_game(&req.session_id, req.lane_index, req.multiplier)
            .await
        {
            Ok(info) => ServerMessage::GameUpdated(info),
            Err(e) => ServerMessage::error(e),
        };
        let _ = ctx.sender.send(reply).await;
    }

    /// Run the game loop for a session.
    /// Ticks at the configured rate, pushes events and snapshots, and
    /// stops once the run and its ledger session are settled. A detached
    /// run is left in place and the loop exits; re-attaching spawns a new one.
    async fn run_session_game_loop(
        session: Arc<RwLock<GameSession>>,
        sessions: Arc<SessionManager>,
        tick_rate: u32,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let session_id = session.read().await.id;
        info!(session = %session_id.short(), "Run started");

        let tick_duration = Duration::from_micros(1_000_000 / tick_rate.max(1) as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = shutdown_rx.recv() => {
                    debug!(session = %session_id.short(), "Run loop stopped by shutdown");
                    return;
                }
            }

            let update = match sessions.advance(&session).await {
                Ok(update) => update,
                Err(e) => {
                    error!(session = %session_id.short(), error = %e, "Ledger sync failed");
                    let s = session.read().await;
                    s.send(ServerMessage::error(e)).await;
                    break;
                }
            };

            #[cfg(feature = "debug-tracing")]
            debug!(
                session = %session_id.short(),
                tick = session.read().await.current_tick(),
                messages = update.messages.len(),
                "tick"
            );

            {
                let s = session.read().await;
                for message in update.messages {
                    s.send(message).await;
                }
            }

            if update.parked {
                info!(session = %session_id.short(), "Run parked");
                return;
            }
            if update.finished {
                break;
            }
        }

        sessions.remove_session(&session_id).await;
        info!(session = %session_id.short(), "Run ended");
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(clients: Clients, sessions: Arc<SessionManager>, idle_timeout: Duration) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            // Cleanup idle connections
            let now = Instant::now();
            let to_remove: Vec<_> = {
                let clients = clients.read().await;
                clients.iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, _)| *addr)
                    .collect()
            };

            for addr in to_remove {
                let mut clients = clients.write().await;
                if let Some(client) = clients.remove(&addr) {
                    if let Some(user_id) = client.user_id {
                        sessions.detach_user(&user_id).await;
                    }
                    info!("Removed idle client {}", addr);
                }
            }

            // Cleanup ended sessions
            sessions.cleanup().await;
        }
    }

    /// Receiver fired by [`GameServer::shutdown`].
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get live session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.session_count().await
    }
}

/// Per-connection handles passed to message handlers.
struct ConnectionContext<'a> {
    addr: SocketAddr,
    clients: &'a Clients,
    sessions: &'a Arc<SessionManager>,
    config: &'a ServerConfig,
    sender: &'a mpsc::Sender<ServerMessage>,
    shutdown_tx: &'a broadcast::Sender<()>,
}

impl ConnectionContext<'_> {
    /// Update activity.
    async fn touch(&self) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get_mut(&self.addr) {
            client.last_activity = Instant::now();
        }
    }

    /// Route a live session's pushes to this connection, resuming it if
    /// its previous connection dropped.
    async fn bind_session(&self, session_id: &SessionId) {
        let Some(session) = self.sessions.get_session(session_id).await else {
            return;
        };

        let user_id = {
            let mut s = session.write().await;
            s.attach(self.sender.clone());
            s.user_id.clone()
        };

        {
            let mut clients = self.clients.write().await;
            if let Some(client) = clients.get_mut(&self.addr) {
                client.user_id = Some(user_id);
                client.session_id = Some(*session_id);
            }
        }

        self.spawn_game_loop(session).await;
    }

    /// Start a tick loop for the run unless one already drives it.
    async fn spawn_game_loop(&self, session: Arc<RwLock<GameSession>>) {
        if !session.write().await.claim_ticker() {
            return;
        }

        let sessions = self.sessions.clone();
        let tick_rate = self.config.tick_rate;
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            GameServer::run_session_game_loop(session, sessions, tick_rate, shutdown_rx).await;
        });
    }
}
