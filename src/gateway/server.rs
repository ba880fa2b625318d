//! Gateway server implementation

use crate::agent::DigestAgent;
use crate::config::EaterConfig;
use crate::error::{Error, Result};
use crate::gateway::handler::build_app;
use axum::Router;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Gateway server state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Running
    Running,
    /// Shutting down
    ShuttingDown,
}

/// Website Eater HTTP gateway
pub struct Gateway {
    config: EaterConfig,
    state: Arc<RwLock<GatewayState>>,
    agent: Arc<DigestAgent>,
}

impl Gateway {
    /// Create a gateway around an agent
    pub fn new(config: EaterConfig, agent: Arc<DigestAgent>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(GatewayState::Stopped)),
            agent,
        }
    }

    /// Get current state
    pub async fn state(&self) -> GatewayState {
        *self.state.read().await
    }

    pub fn config(&self) -> &EaterConfig {
        &self.config
    }

    pub fn agent(&self) -> &Arc<DigestAgent> {
        &self.agent
    }

    /// User id applied when a request names none
    pub fn default_user_id(&self) -> &str {
        &self.config.gateway.default_user_id
    }

    /// Address the gateway binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.config.gateway.host, self.config.gateway.port)
    }

    /// Build the HTTP application
    pub fn router(self: &Arc<Self>) -> Router {
        build_app(self.clone())
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve<F>(self: Arc<Self>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_address())
            .await
            .map_err(|e| Error::Gateway(format!("Failed to bind {}: {}", self.bind_address(), e)))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_on<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Resolved before the state changes so a failure leaves the gateway Stopped
        let addr: SocketAddr = listener
            .local_addr()
            .map_err(|e| Error::Gateway(format!("Listener has no local address: {}", e)))?;

        {
            let mut state = self.state.write().await;
            if *state != GatewayState::Stopped {
                return Err(Error::Gateway("Gateway already running".to_string()));
            }
            *state = GatewayState::Starting;
        }

        let app = self.router();
        *self.state.write().await = GatewayState::Running;
        tracing::info!(
            address = %addr,
            ai_enabled = self.agent.ai_enabled(),
            "Website Eater gateway listening"
        );

        let state = self.state.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                *state.write().await = GatewayState::ShuttingDown;
                tracing::info!("Shutting down gateway");
            })
            .await;

        *self.state.write().await = GatewayState::Stopped;
        result.map_err(|e| Error::Gateway(format!("Server error: {}", e)))
    }

    /// Get gateway status information
    pub async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            state: self.state().await,
            model: self.agent.model().map(str::to_string),
            ai_enabled: self.agent.ai_enabled(),
            memory_count: self.agent.store().count().await,
        }
    }
}

/// Gateway status information
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub state: GatewayState,
    pub model: Option<String>,
    pub ai_enabled: bool,
    pub memory_count: usize,
}

/// Builder for Gateway
pub struct GatewayBuilder {
    config: EaterConfig,
    agent: Option<Arc<DigestAgent>>,
}

impl GatewayBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: EaterConfig::default(),
            agent: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: EaterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the gateway host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.gateway.host = host.into();
        self
    }

    /// Set the gateway port
    pub fn port(mut self, port: u16) -> Self {
        self.config.gateway.port = port;
        self
    }

    /// Use a prebuilt agent instead of building one from the configuration
    pub fn agent(mut self, agent: Arc<DigestAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Build the gateway
    pub async fn build(self) -> Result<Gateway> {
        let agent = match self.agent {
            Some(agent) => agent,
            None => Arc::new(
                DigestAgent::builder()
                    .config(self.config.clone())
                    .build()
                    .await?,
            ),
        };
        Ok(Gateway::new(self.config, agent))
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
