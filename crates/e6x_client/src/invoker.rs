//! Outbound call invoker.
//!
//! Every RPC the client sends goes through [`Invoker::call`], which
//! assembles the metadata headers, runs the call, feeds any next-strategy
//! hint back to the coordinator, and retries the two recoverable error
//! classes within a fixed attempt budget: an auth failure triggers a
//! re-authenticate and a wrong-tag rejection additionally invalidates the
//! coordinator so the tag is rediscovered. Everything else is surfaced to
//! the caller unchanged.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{classify_status, Error, ErrorClass, Result};
use crate::rpc::{EngineRpc, RequestContext, RpcResult, StrategyHint};
use crate::session::SessionManager;
use crate::strategy::{Strategy, StrategyCoordinator};

/// What the call is addressed at: follow-ups of a known query go to the
/// engine node that planned it and reuse the query's registered tag.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CallTarget<'a> {
    pub query_id: Option<&'a str>,
    pub engine_ip: Option<&'a str>,
    pub timeout: Option<std::time::Duration>,
}

impl<'a> CallTarget<'a> {
    pub fn session_level() -> Self {
        Self::default()
    }

    pub fn query(query_id: &'a str, engine_ip: Option<&'a str>) -> Self {
        Self {
            query_id: Some(query_id),
            engine_ip,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The operation passed to [`Invoker::call`]: given the service handle, the
/// request context and the current session id, issue one RPC.
pub(crate) type CallOp<R> =
    Box<dyn FnMut(Arc<dyn EngineRpc>, RequestContext, String) -> BoxFuture<'static, RpcResult<R>> + Send>;

pub(crate) struct Invoker {
    session: Arc<SessionManager>,
    coordinator: Arc<StrategyCoordinator>,
    retry: RetryPolicy,
}

impl Invoker {
    pub fn new(
        session: Arc<SessionManager>,
        coordinator: Arc<StrategyCoordinator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            session,
            coordinator,
            retry,
        }
    }

    /// Issue a call, returning the response together with the tag it was
    /// sent under.
    pub async fn call_tagged<R>(
        &self,
        target: CallTarget<'_>,
        mut op: CallOp<R>,
    ) -> Result<(R, Option<Strategy>)>
    where
        R: StrategyHint,
    {
        let mut attempt = 1u32;
        loop {
            let session_id = self.session.ensure_session(&self.coordinator).await?;
            let tag = self.resolve_tag(target).await?;
            // Re-read: discovery during resolve_tag may have rotated the
            // session underneath us.
            let session_id = self.session.session_id().unwrap_or(session_id);
            let mut ctx = RequestContext::new(
                target.engine_ip,
                self.session.config().cluster_uuid.as_deref(),
                tag,
            );
            if let Some(timeout) = target.timeout {
                ctx = ctx.with_timeout(timeout);
            }
            match op(self.session.engine(), ctx, session_id.clone()).await {
                Ok(response) => {
                    if let Some(hint) = response.strategy_hint() {
                        self.coordinator.observe_response_hint(hint);
                    }
                    return Ok((response, tag));
                }
                Err(status) => {
                    let class = classify_status(&status);
                    if attempt >= self.retry.max_attempts {
                        return Err(self.exhausted(class, status));
                    }
                    match class {
                        ErrorClass::AuthDenied => {
                            warn!(attempt, "access denied, re-authenticating");
                            self.session
                                .reauthenticate(&self.coordinator, Some(&session_id))
                                .await?;
                        }
                        ErrorClass::WrongStrategy => {
                            warn!(attempt, ?tag, "strategy rejected, rediscovering");
                            self.coordinator.invalidate();
                            self.session
                                .reauthenticate(&self.coordinator, Some(&session_id))
                                .await?;
                            // Only this query's tag is known-dead; move its
                            // registration to the rediscovered tag so the
                            // retry and later follow-ups carry it. Other
                            // in-flight queries keep theirs.
                            if let Some(query_id) = target.query_id {
                                if let Some(tag) = self.coordinator.current_tag() {
                                    self.coordinator.register_query(query_id, tag);
                                }
                            }
                        }
                        ErrorClass::Other => return Err(Error::Rpc(status)),
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }

    /// Issue a call, discarding the tag bookkeeping.
    pub async fn call<R>(&self, target: CallTarget<'_>, op: CallOp<R>) -> Result<R>
    where
        R: StrategyHint,
    {
        self.call_tagged(target, op).await.map(|(response, _)| response)
    }

    /// Pick the tag for this call, triggering discovery when none is known.
    async fn resolve_tag(&self, target: CallTarget<'_>) -> Result<Option<Strategy>> {
        let tag = match target.query_id {
            Some(query_id) => self.coordinator.tag_for_existing_query(query_id),
            None => self.coordinator.tag_for_new_query(),
        };
        if tag.is_some() {
            return Ok(tag);
        }
        debug!("no deployment tag known, running discovery");
        self.session
            .reauthenticate(&self.coordinator, self.session.session_id().as_deref())
            .await?;
        Ok(match target.query_id {
            Some(query_id) => self.coordinator.tag_for_existing_query(query_id),
            None => self.coordinator.tag_for_new_query(),
        })
    }

    fn exhausted(&self, class: ErrorClass, status: tonic::Status) -> Error {
        match class {
            ErrorClass::AuthDenied => Error::AuthDenied(status.message().to_string()),
            ErrorClass::WrongStrategy => Error::StrategyMismatch(status.message().to_string()),
            ErrorClass::Other => Error::Rpc(status),
        }
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("max_attempts", &self.retry.max_attempts)
            .field("backoff", &self.retry.backoff)
            .finish()
    }
}
