//! Session management.
//!
//! A session manager owns one RPC channel and the session id obtained from
//! `authenticate`. When the active deployment tag is unknown it discovers
//! it by probing the tags in fixed order and publishing the first one the
//! engine accepts. Re-authentication is serialized: concurrent callers that
//! hit an auth failure converge on a single authenticate call and then all
//! proceed with the fresh session id.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tonic::transport::{Certificate, ClientTlsConfig, Endpoint};
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, TlsMode};
use crate::error::{classify_status, Error, ErrorClass, Result};
use crate::proto::engine_client::QueryEngineClient;
use crate::proto::AuthenticateRequest;
use crate::rpc::{EngineRpc, GrpcEngine, RequestContext};
use crate::strategy::{Strategy, StrategyCoordinator};

/// Build the transport channel described by the configuration.
///
/// The connection itself is established lazily on first use.
pub(crate) fn build_channel(config: &ClientConfig) -> Result<tonic::transport::Channel> {
    let scheme = match config.tls {
        TlsMode::Disabled => "http",
        _ => "https",
    };
    let uri = format!("{}://{}:{}", scheme, config.host, config.port);
    let mut endpoint = Endpoint::from_shared(uri)
        .map_err(|e| Error::Configuration(format!("invalid endpoint: {e}")))?
        .keep_alive_timeout(Duration::from_millis(
            config.channel.keepalive_idle_timeout_ms,
        ))
        .keep_alive_while_idle(config.channel.keepalive_without_calls);

    if let Some(interval) = config.channel.effective_keepalive_interval() {
        endpoint = endpoint.http2_keep_alive_interval(interval);
    }

    let tls = match &config.tls {
        TlsMode::Disabled => None,
        TlsMode::SystemRoots => Some(ClientTlsConfig::new().with_native_roots()),
        TlsMode::CustomPem(pem) => {
            Some(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)))
        }
    };
    if let Some(tls) = tls {
        endpoint = endpoint
            .tls_config(tls.domain_name(config.host.clone()))
            .map_err(|e| Error::Transport(format!("invalid TLS configuration: {e}")))?;
    }

    Ok(endpoint.connect_lazy())
}

/// Owns the channel and the authenticated session.
pub struct SessionManager {
    config: Arc<ClientConfig>,
    engine: RwLock<Arc<dyn EngineRpc>>,
    session_id: Mutex<Option<String>>,
    /// Serializes authenticate calls so concurrent failures converge.
    auth_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Create a manager over a freshly built channel.
    pub fn connect(config: Arc<ClientConfig>) -> Result<Self> {
        config.validate()?;
        let channel = build_channel(&config)?;
        let client = QueryEngineClient::with_message_limits(
            channel,
            config.channel.max_inbound_message_bytes,
            config.channel.max_outbound_message_bytes,
        );
        Ok(Self::with_engine(config, Arc::new(GrpcEngine::new(client))))
    }

    /// Create a manager over an existing service implementation.
    pub fn with_engine(config: Arc<ClientConfig>, engine: Arc<dyn EngineRpc>) -> Self {
        Self {
            config,
            engine: RwLock::new(engine),
            session_id: Mutex::new(None),
            auth_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current service handle.
    pub fn engine(&self) -> Arc<dyn EngineRpc> {
        self.engine
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the channel, dropping the old one and the session with it.
    pub fn reopen(&self) -> Result<()> {
        let channel = build_channel(&self.config)?;
        let client = QueryEngineClient::with_message_limits(
            channel,
            self.config.channel.max_inbound_message_bytes,
            self.config.channel.max_outbound_message_bytes,
        );
        *self.engine.write().unwrap_or_else(|e| e.into_inner()) =
            Arc::new(GrpcEngine::new(client));
        self.clear_session();
        Ok(())
    }

    /// Session id currently cached, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn clear_session(&self) {
        self.session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    /// Return the cached session id, authenticating first if there is none.
    pub async fn ensure_session(&self, coordinator: &StrategyCoordinator) -> Result<String> {
        if let Some(session) = self.session_id() {
            return Ok(session);
        }
        let _gate = self.auth_gate.lock().await;
        // Another caller may have authenticated while we waited.
        if let Some(session) = self.session_id() {
            return Ok(session);
        }
        self.authenticate(coordinator).await
    }

    /// Drop the session observed as stale and obtain a fresh one.
    ///
    /// Callers pass the session id they saw fail; if the session already
    /// changed underneath them, the replacement is returned without another
    /// authenticate round trip.
    pub async fn reauthenticate(
        &self,
        coordinator: &StrategyCoordinator,
        stale: Option<&str>,
    ) -> Result<String> {
        let _gate = self.auth_gate.lock().await;
        if let Some(current) = self.session_id() {
            if stale != Some(current.as_str()) {
                return Ok(current);
            }
        }
        self.clear_session();
        self.authenticate(coordinator).await
    }

    /// Authenticate against the engine, discovering the deployment tag when
    /// it is unknown.
    async fn authenticate(&self, coordinator: &StrategyCoordinator) -> Result<String> {
        // A tag the coordinator already trusts is used as-is; only
        // discovery publishes a new active tag.
        if let Some(tag) = coordinator.tag_for_new_query() {
            match self.authenticate_with_tag(coordinator, Some(tag)).await {
                Ok(session) if session.is_empty() => return Err(Error::InvalidCredentials),
                Ok(session) => {
                    self.store_session(&session);
                    return Ok(session);
                }
                Err(status) if classify_status(&status) == ErrorClass::WrongStrategy => {
                    info!(%tag, "cached strategy rejected, rediscovering");
                    coordinator.invalidate();
                }
                Err(status) => return Err(self.map_auth_error(status)),
            }
        }
        self.discover(coordinator).await
    }

    /// Probe the deployment tags in fixed order; the first accepted tag is
    /// published to the coordinator. Only the wrong-tag rejection falls
    /// through to the next probe.
    async fn discover(&self, coordinator: &StrategyCoordinator) -> Result<String> {
        let mut last_mismatch = None;
        for tag in Strategy::DISCOVERY_ORDER {
            debug!(%tag, "probing deployment strategy");
            match self.authenticate_with_tag(coordinator, Some(tag)).await {
                Ok(session) if session.is_empty() => return Err(Error::InvalidCredentials),
                Ok(session) => {
                    coordinator.set_active(tag);
                    self.store_session(&session);
                    return Ok(session);
                }
                Err(status) if classify_status(&status) == ErrorClass::WrongStrategy => {
                    last_mismatch = Some(status);
                }
                Err(status) => return Err(self.map_auth_error(status)),
            }
        }
        // Both tags were rejected for the distinguished reason; surface
        // the underlying error rather than looping.
        let status = last_mismatch.expect("discovery probed at least one tag");
        warn!("both deployment strategies rejected during discovery");
        Err(Error::StrategyMismatch(status.message().to_string()))
    }

    async fn authenticate_with_tag(
        &self,
        coordinator: &StrategyCoordinator,
        tag: Option<Strategy>,
    ) -> std::result::Result<String, tonic::Status> {
        let ctx = RequestContext::new(None, self.config.cluster_uuid.as_deref(), tag);
        let request = AuthenticateRequest {
            user: self.config.username.clone(),
            password: self.config.password.clone(),
        };
        let response = self.engine().authenticate(&ctx, request).await?;
        if let Some(hint) = response.new_strategy.as_deref() {
            coordinator.observe_response_hint(hint);
        }
        Ok(response.session_id)
    }

    fn store_session(&self, session: &str) {
        *self
            .session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(session.to_string());
    }

    fn map_auth_error(&self, status: tonic::Status) -> Error {
        match classify_status(&status) {
            ErrorClass::AuthDenied => Error::AuthDenied(status.message().to_string()),
            _ => Error::Rpc(status),
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &format_args!("{}:{}", self.config.host, self.config.port))
            .field("session", &self.session_id().is_some())
            .finish()
    }
}
