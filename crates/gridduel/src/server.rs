//! `GridduelServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → presence → battle
//! registry.

use std::sync::Arc;

use gridduel_battle::{BattleConfig, SessionRegistry};
use gridduel_presence::{Authenticator, PresenceConfig, PresenceTable};
use gridduel_protocol::{Codec, JsonCodec};
use gridduel_rules::RulesService;
use gridduel_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::{GridduelConfig, GridduelError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A: Authenticator, R: RulesService, C: Codec> {
    pub(crate) presence: Mutex<PresenceTable>,
    pub(crate) registry: SessionRegistry<R>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a gridduel server.
///
/// # Example
///
/// ```rust,ignore
/// let server = GridduelServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(JwtAuthenticator::new(secret), Arc::new(rules))
///     .await?;
/// server.run().await
/// ```
pub struct GridduelServerBuilder {
    server_config: ServerConfig,
    battle_config: BattleConfig,
}

impl GridduelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            server_config: ServerConfig::default(),
            battle_config: BattleConfig::default(),
        }
    }

    /// Starts from a loaded [`GridduelConfig`].
    pub fn from_config(config: &GridduelConfig) -> Self {
        Self {
            server_config: config.server.clone(),
            battle_config: config.battle.clone(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.server_config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the gateway settings, bind address included.
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = config;
        self
    }

    /// Sets the settings every battle session is created with.
    pub fn battle_config(mut self, config: BattleConfig) -> Self {
        self.battle_config = config;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build<A, R>(
        self,
        auth: A,
        rules: Arc<R>,
    ) -> Result<GridduelServer<A, R, JsonCodec>, GridduelError>
    where
        A: Authenticator,
        R: RulesService,
    {
        let transport = WebSocketTransport::bind(&self.server_config.bind_addr).await?;

        let presence = PresenceTable::new(PresenceConfig {
            idle_timeout: self.server_config.idle_timeout,
        });

        let state = Arc::new(ServerState {
            presence: Mutex::new(presence),
            registry: SessionRegistry::new(rules, self.battle_config),
            auth,
            codec: JsonCodec,
            config: self.server_config,
        });

        Ok(GridduelServer { transport, state })
    }
}

impl Default for GridduelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound gridduel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GridduelServer<A: Authenticator, R: RulesService, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, R, C>>,
}

impl<A, R, C> GridduelServer<A, R, C>
where
    A: Authenticator,
    R: RulesService,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The battle registry, for inspection and administrative deletes.
    pub fn registry(&self) -> SessionRegistry<R> {
        self.state.registry.clone()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each connection gets its own handler task. An idle sweep runs
    /// alongside and evicts connections that stopped sending frames.
    pub async fn run(mut self) -> Result<(), GridduelError> {
        tracing::info!(
            bind = %self.state.config.bind_addr,
            "gridduel server running"
        );

        tokio::spawn(sweep_idle(Arc::clone(&self.state)));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically evicts silent connections. Their handlers see the
/// eviction notice and close.
async fn sweep_idle<A, R, C>(state: Arc<ServerState<A, R, C>>)
where
    A: Authenticator,
    R: RulesService,
    C: Codec,
{
    let mut interval = tokio::time::interval(state.config.idle_sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let evicted = state.presence.lock().await.evict_idle();
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "idle sweep evicted connections");
        }
    }
}
