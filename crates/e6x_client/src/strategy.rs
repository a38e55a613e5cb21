//! Blue/green deployment strategy coordination.
//!
//! The engine runs two parallel deployments and rejects any request that is
//! not tagged with the currently active one. The coordinator is the single
//! source of truth for which tag each outbound request carries and for when
//! a strategy change takes effect: a hint observed in a response becomes the
//! pending tag immediately, but only a completed query (clear or cancel)
//! promotes it to active. Queries keep the tag they were prepared under for
//! their whole lifetime, so an in-flight query is never disrupted by a
//! transition.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config;

/// Deployment tag selecting one of the two parallel deployments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Blue,
    Green,
}

impl Strategy {
    /// Fixed probe order used when the active tag is unknown.
    pub const DISCOVERY_ORDER: [Strategy; 2] = [Strategy::Blue, Strategy::Green];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Blue => "blue",
            Strategy::Green => "green",
        }
    }

    /// Case-insensitive parse; anything but blue/green is rejected.
    pub fn parse(raw: &str) -> Option<Strategy> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blue" => Some(Strategy::Blue),
            "green" => Some(Strategy::Green),
            _ => None,
        }
    }

    pub fn other(self) -> Strategy {
        match self {
            Strategy::Blue => Strategy::Green,
            Strategy::Green => Strategy::Blue,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct CoordinatorState {
    active: Option<Strategy>,
    pending: Option<Strategy>,
    query_tags: HashMap<String, Strategy>,
    refreshed_at: Option<Instant>,
}

/// Read-only view of the coordinator used for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct StrategySnapshot {
    pub active: Option<Strategy>,
    pub pending: Option<Strategy>,
    pub queries_in_flight: usize,
}

/// Process-wide coordinator for deployment tags.
///
/// All mutation goes through one mutex. A default shared instance is
/// available via [`StrategyCoordinator::global`], and independent instances
/// can be constructed for isolation.
pub struct StrategyCoordinator {
    state: Mutex<CoordinatorState>,
    /// How long a discovered tag stays trusted. `None` disables expiry.
    cache_ttl: Option<Duration>,
}

static GLOBAL: OnceLock<std::sync::Arc<StrategyCoordinator>> = OnceLock::new();

impl StrategyCoordinator {
    pub fn new(cache_ttl: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            cache_ttl,
        }
    }

    /// Shared process-wide instance, with the cache TTL taken from the
    /// environment on first use.
    pub fn global() -> std::sync::Arc<StrategyCoordinator> {
        GLOBAL
            .get_or_init(|| {
                std::sync::Arc::new(StrategyCoordinator::new(config::strategy_cache_ttl_from_env()))
            })
            .clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CoordinatorState> {
        // A poisoned coordinator would wedge every future request.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn active_is_fresh(&self, state: &CoordinatorState) -> bool {
        match (state.active, self.cache_ttl, state.refreshed_at) {
            (None, ..) => false,
            (Some(_), None, _) => true,
            (Some(_), Some(ttl), Some(at)) => at.elapsed() < ttl,
            (Some(_), Some(_), None) => false,
        }
    }

    /// Tag for a query about to be prepared: the pending tag wins so new
    /// work lands on the upcoming deployment. `None` means discovery is
    /// needed before the request can be sent.
    pub fn tag_for_new_query(&self) -> Option<Strategy> {
        let state = self.lock();
        if let Some(pending) = state.pending {
            return Some(pending);
        }
        if self.active_is_fresh(&state) {
            state.active
        } else {
            None
        }
    }

    /// Tag for follow-up calls of a known query. Falls back to the active
    /// tag only when the query was never registered.
    pub fn tag_for_existing_query(&self, query_id: &str) -> Option<Strategy> {
        let state = self.lock();
        state
            .query_tags
            .get(query_id)
            .copied()
            .or(state.active)
    }

    /// Record the tag a query was prepared under.
    pub fn register_query(&self, query_id: &str, tag: Strategy) {
        if query_id.is_empty() {
            return;
        }
        let mut state = self.lock();
        debug!(query_id, %tag, "registered query strategy");
        state.query_tags.insert(query_id.to_string(), tag);
    }

    /// Drop a finished query from the tag map.
    pub fn forget_query(&self, query_id: &str) {
        let mut state = self.lock();
        state.query_tags.remove(query_id);
    }

    /// Feed a next-strategy hint observed in a response. Values other than
    /// blue/green are logged and ignored, and a hint equal to the active
    /// tag changes nothing.
    pub fn observe_response_hint(&self, raw: &str) {
        let Some(tag) = Strategy::parse(raw) else {
            warn!(value = raw, "ignoring invalid strategy hint");
            return;
        };
        let mut state = self.lock();
        if state.active != Some(tag) && state.pending != Some(tag) {
            info!(pending = %tag, active = ?state.active, "strategy change announced");
            state.pending = Some(tag);
        }
    }

    /// Promote the pending tag at a safe point (after clear or cancel).
    pub fn apply_pending_at_safe_point(&self) {
        let mut state = self.lock();
        if let Some(pending) = state.pending.take() {
            info!(from = ?state.active, to = %pending, "applying pending strategy");
            state.active = Some(pending);
            state.refreshed_at = Some(Instant::now());
        }
    }

    /// Publish a tag learned through discovery.
    pub fn set_active(&self, tag: Strategy) {
        let mut state = self.lock();
        info!(%tag, "active strategy set");
        state.active = Some(tag);
        state.refreshed_at = Some(Instant::now());
        if state.pending == Some(tag) {
            state.pending = None;
        }
    }

    /// Forget the active and pending tags; the next request triggers
    /// rediscovery. Called on a wrong-tag error. Registrations of
    /// in-flight queries are untouched: a query keeps the tag it began
    /// with until it terminates, and only the caller that hit the error
    /// moves its own query to the rediscovered tag.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        info!("strategy cache invalidated");
        state.active = None;
        state.pending = None;
        state.refreshed_at = None;
    }

    /// Active tag if it is still trusted.
    pub fn current_tag(&self) -> Option<Strategy> {
        let state = self.lock();
        if self.active_is_fresh(&state) {
            state.active
        } else {
            None
        }
    }

    pub fn pending_tag(&self) -> Option<Strategy> {
        self.lock().pending
    }

    pub fn snapshot(&self) -> StrategySnapshot {
        let state = self.lock();
        StrategySnapshot {
            active: state.active,
            pending: state.pending,
            queries_in_flight: state.query_tags.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> StrategyCoordinator {
        StrategyCoordinator::new(None)
    }

    #[test]
    fn parse_is_case_insensitive_and_strict() {
        assert_eq!(Strategy::parse("BLUE"), Some(Strategy::Blue));
        assert_eq!(Strategy::parse(" green "), Some(Strategy::Green));
        assert_eq!(Strategy::parse("purple"), None);
        assert_eq!(Strategy::parse(""), None);
    }

    #[test]
    fn new_queries_prefer_the_pending_tag() {
        let c = coordinator();
        c.set_active(Strategy::Green);
        assert_eq!(c.tag_for_new_query(), Some(Strategy::Green));
        c.observe_response_hint("blue");
        assert_eq!(c.tag_for_new_query(), Some(Strategy::Blue));
        // The active tag is untouched until a safe point.
        assert_eq!(c.current_tag(), Some(Strategy::Green));
    }

    #[test]
    fn registered_queries_keep_their_tag_through_a_transition() {
        let c = coordinator();
        c.set_active(Strategy::Green);
        c.register_query("q1", Strategy::Green);
        c.observe_response_hint("blue");
        c.apply_pending_at_safe_point();
        assert_eq!(c.current_tag(), Some(Strategy::Blue));
        assert_eq!(c.tag_for_existing_query("q1"), Some(Strategy::Green));
    }

    #[test]
    fn safe_point_promotes_pending_and_clears_it() {
        let c = coordinator();
        c.set_active(Strategy::Green);
        c.observe_response_hint("blue");
        c.apply_pending_at_safe_point();
        assert_eq!(c.current_tag(), Some(Strategy::Blue));
        assert_eq!(c.pending_tag(), None);
        // A second safe point with nothing pending is a no-op.
        c.apply_pending_at_safe_point();
        assert_eq!(c.current_tag(), Some(Strategy::Blue));
    }

    #[test]
    fn hint_equal_to_active_is_ignored() {
        let c = coordinator();
        c.set_active(Strategy::Green);
        c.observe_response_hint("green");
        assert_eq!(c.pending_tag(), None);
    }

    #[test]
    fn invalid_hint_is_ignored() {
        let c = coordinator();
        c.set_active(Strategy::Blue);
        c.observe_response_hint("mauve");
        assert_eq!(c.pending_tag(), None);
        assert_eq!(c.current_tag(), Some(Strategy::Blue));
    }

    #[test]
    fn invalidate_clears_tags_but_keeps_registrations() {
        let c = coordinator();
        c.set_active(Strategy::Blue);
        c.observe_response_hint("green");
        c.register_query("q1", Strategy::Blue);
        c.invalidate();
        assert_eq!(c.current_tag(), None);
        assert_eq!(c.pending_tag(), None);
        assert_eq!(c.tag_for_new_query(), None);
        // In-flight queries keep their tag through an unrelated
        // invalidation, even after rediscovery publishes a new one.
        assert_eq!(c.tag_for_existing_query("q1"), Some(Strategy::Blue));
        c.set_active(Strategy::Green);
        assert_eq!(c.tag_for_existing_query("q1"), Some(Strategy::Blue));
        assert_eq!(c.snapshot().queries_in_flight, 1);
    }

    #[test]
    fn unknown_query_falls_back_to_active() {
        let c = coordinator();
        c.set_active(Strategy::Green);
        assert_eq!(c.tag_for_existing_query("nope"), Some(Strategy::Green));
    }

    #[test]
    fn forgotten_queries_leave_the_map() {
        let c = coordinator();
        c.set_active(Strategy::Blue);
        c.register_query("q1", Strategy::Blue);
        assert_eq!(c.snapshot().queries_in_flight, 1);
        c.forget_query("q1");
        assert_eq!(c.snapshot().queries_in_flight, 0);
    }

    #[test]
    fn ttl_expiry_forces_rediscovery() {
        let c = StrategyCoordinator::new(Some(Duration::from_millis(0)));
        c.set_active(Strategy::Blue);
        // A zero TTL expires immediately.
        assert_eq!(c.tag_for_new_query(), None);
        assert_eq!(c.current_tag(), None);
        // Follow-up calls for registered queries are unaffected by expiry.
        c.register_query("q1", Strategy::Blue);
        assert_eq!(c.tag_for_existing_query("q1"), Some(Strategy::Blue));
    }
}
