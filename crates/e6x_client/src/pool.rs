//! Bounded connection pool with per-caller affinity.
//!
//! The pool keeps long-lived engine connections and hands them out with a
//! preference for giving a caller the channel it used last time, which
//! keeps TLS sessions and engine-side caches warm. Affinity is a hint:
//! when the preferred channel is busy or unhealthy the pool falls back to
//! the most recently used idle resident, grows up to `max`, spills into
//! ephemeral overflow channels under pressure, and finally parks the
//! caller in a FIFO waiter queue until a channel frees up or the acquire
//! timeout elapses.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::{ClientConfig, PoolConfig};
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::strategy::StrategyCoordinator;

/// Opaque identity of a pool caller.
///
/// Thread-per-request hosts derive it from the thread id; cooperative
/// runtimes can supply any stable token via [`CallerKey::from_raw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallerKey(u64);

impl CallerKey {
    /// Key for the current OS thread.
    pub fn of_thread() -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Creates the connections the pool manages.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    async fn create(&self) -> Result<Arc<Connection>>;
}

/// Default factory dialing the configured engine endpoint.
pub struct GrpcConnectionFactory {
    config: Arc<ClientConfig>,
    coordinator: Arc<StrategyCoordinator>,
}

impl GrpcConnectionFactory {
    pub fn new(config: Arc<ClientConfig>, coordinator: Arc<StrategyCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }
}

#[async_trait]
impl ConnectionFactory for GrpcConnectionFactory {
    async fn create(&self) -> Result<Arc<Connection>> {
        Connection::connect_with_coordinator(self.config.as_ref().clone(), self.coordinator.clone())
    }
}

struct Entry {
    id: u64,
    conn: Arc<Connection>,
    created_at: Instant,
    last_used_at: Instant,
    in_use: bool,
    ephemeral: bool,
}

#[derive(Default)]
struct PoolState {
    entries: Vec<Entry>,
    affinity: HashMap<CallerKey, u64>,
    waiters: VecDeque<Arc<Notify>>,
    /// Resident creations reserved but not yet inserted.
    resident_pending: usize,
    /// Overflow slots in use or reserved.
    overflow_slots: usize,
    closed: bool,
}

impl PoolState {
    fn resident_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.ephemeral).count() + self.resident_pending
    }

    fn remove_entry(&mut self, id: u64) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.affinity.retain(|_, v| *v != id);
        Some(self.entries.swap_remove(index))
    }
}

/// Point-in-time pool statistics.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PoolStats {
    pub active: usize,
    pub idle: usize,
    pub total_created: u64,
    pub failed_creations: u64,
    pub waiters_now: usize,
    pub total_acquires: u64,
}

/// Bounded pool of engine connections.
pub struct Pool {
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    state: Mutex<PoolState>,
    next_id: AtomicU64,
    total_created: AtomicU64,
    failed_creations: AtomicU64,
    total_acquires: AtomicU64,
}

enum Plan {
    Reuse { id: u64, conn: Arc<Connection> },
    CreateResident,
    CreateOverflow,
    Wait(Arc<Notify>),
}

impl Pool {
    /// Build a pool and warm up `min` connections.
    pub async fn connect(
        config: PoolConfig,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Arc<Pool>> {
        config.validate()?;
        let pool = Arc::new(Pool {
            config,
            factory,
            state: Mutex::new(PoolState::default()),
            next_id: AtomicU64::new(1),
            total_created: AtomicU64::new(0),
            failed_creations: AtomicU64::new(0),
            total_acquires: AtomicU64::new(0),
        });
        for _ in 0..pool.config.min {
            match pool.create_connection().await {
                Ok(conn) => {
                    let mut state = pool.lock();
                    state.entries.push(pool.new_entry(conn, false, false));
                }
                Err(err) => {
                    // Warm-up is best effort; acquire retries creation later.
                    warn!(%err, "failed to warm up pool connection");
                }
            }
        }
        Ok(pool)
    }

    /// Pool for the given engine configuration, sharing the process-wide
    /// strategy coordinator.
    pub async fn connect_with_config(
        pool_config: PoolConfig,
        client_config: ClientConfig,
    ) -> Result<Arc<Pool>> {
        client_config.validate()?;
        let factory = Arc::new(GrpcConnectionFactory::new(
            Arc::new(client_config),
            StrategyCoordinator::global(),
        ));
        Self::connect(pool_config, factory).await
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn new_entry(&self, conn: Arc<Connection>, in_use: bool, ephemeral: bool) -> Entry {
        Entry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            conn,
            created_at: Instant::now(),
            last_used_at: Instant::now(),
            in_use,
            ephemeral,
        }
    }

    async fn create_connection(&self) -> Result<Arc<Connection>> {
        match self.factory.create().await {
            Ok(conn) => {
                self.total_created.fetch_add(1, Ordering::Relaxed);
                Ok(conn)
            }
            Err(err) => {
                self.failed_creations.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Entry is usable without an RPC round trip.
    fn entry_is_healthy(&self, entry: &Entry) -> bool {
        !entry.conn.is_closed() && entry.created_at.elapsed() < self.config.recycle_age
    }

    /// Acquire a connection for the current OS thread, keyed by thread id.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConn> {
        self.acquire_for(CallerKey::of_thread()).await
    }

    /// Acquire a connection for an explicit caller key.
    pub async fn acquire_for(self: &Arc<Self>, caller: CallerKey) -> Result<PooledConn> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        loop {
            let plan = self.plan_acquire(caller)?;
            match plan {
                Plan::Reuse { id, conn } => {
                    if self.config.pre_ping {
                        if let Err(err) = conn.ping().await {
                            debug!(%err, "pre-ping failed, discarding pooled connection");
                            let removed = self.lock().remove_entry(id);
                            if let Some(entry) = removed {
                                entry.conn.close();
                            }
                            self.wake_one();
                            continue;
                        }
                    }
                    self.total_acquires.fetch_add(1, Ordering::Relaxed);
                    return Ok(PooledConn {
                        pool: self.clone(),
                        id,
                        conn,
                        ephemeral: false,
                    });
                }
                Plan::CreateResident => match self.create_connection().await {
                    Ok(conn) => {
                        let mut state = self.lock();
                        state.resident_pending -= 1;
                        let entry = self.new_entry(conn.clone(), true, false);
                        let id = entry.id;
                        state.affinity.insert(caller, id);
                        state.entries.push(entry);
                        drop(state);
                        self.total_acquires.fetch_add(1, Ordering::Relaxed);
                        return Ok(PooledConn {
                            pool: self.clone(),
                            id,
                            conn,
                            ephemeral: false,
                        });
                    }
                    Err(err) => {
                        self.lock().resident_pending -= 1;
                        self.wake_one();
                        return Err(err);
                    }
                },
                Plan::CreateOverflow => match self.create_connection().await {
                    Ok(conn) => {
                        let mut state = self.lock();
                        let entry = self.new_entry(conn.clone(), true, true);
                        let id = entry.id;
                        state.entries.push(entry);
                        drop(state);
                        self.total_acquires.fetch_add(1, Ordering::Relaxed);
                        return Ok(PooledConn {
                            pool: self.clone(),
                            id,
                            conn,
                            ephemeral: true,
                        });
                    }
                    Err(err) => {
                        self.lock().overflow_slots -= 1;
                        self.wake_one();
                        return Err(err);
                    }
                },
                Plan::Wait(notify) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.remove_waiter(&notify);
                        return Err(Error::PoolExhausted(self.config.acquire_timeout));
                    }
                    tokio::select! {
                        _ = notify.notified() => {}
                        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                            self.remove_waiter(&notify);
                            return Err(Error::PoolExhausted(self.config.acquire_timeout));
                        }
                    }
                    self.remove_waiter(&notify);
                }
            }
        }
    }

    /// Decide how to satisfy an acquire without blocking.
    fn plan_acquire(&self, caller: CallerKey) -> Result<Plan> {
        let mut state = self.lock();
        let st = &mut *state;
        if st.closed {
            return Err(Error::PoolClosed);
        }

        // Step 1: the caller's affine channel, when idle and healthy.
        let affine = st.affinity.get(&caller).copied();
        if let Some(id) = affine {
            match st.entries.iter_mut().find(|e| e.id == id) {
                Some(entry) if !entry.in_use && !entry.ephemeral => {
                    if !entry.conn.is_closed()
                        && entry.created_at.elapsed() < self.config.recycle_age
                    {
                        entry.in_use = true;
                        entry.last_used_at = Instant::now();
                        return Ok(Plan::Reuse {
                            id,
                            conn: entry.conn.clone(),
                        });
                    }
                    // Unhealthy affine channel: general selection handles it.
                }
                Some(_) => debug!("affine channel busy, falling back"),
                None => {
                    st.affinity.remove(&caller);
                }
            }
        }

        // Step 2: most recently used idle resident.
        let candidate = st
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.in_use && !e.ephemeral)
            .max_by_key(|(_, e)| e.last_used_at)
            .map(|(index, e)| (index, e.id, self.entry_is_healthy(e)));
        if let Some((index, id, healthy)) = candidate {
            if !healthy {
                if let Some(dead) = st.remove_entry(id) {
                    dead.conn.close();
                }
                // Re-plan with the dead entry gone.
                drop(state);
                return self.plan_acquire(caller);
            }
            let entry = &mut st.entries[index];
            entry.in_use = true;
            entry.last_used_at = Instant::now();
            let conn = entry.conn.clone();
            st.affinity.insert(caller, id);
            return Ok(Plan::Reuse { id, conn });
        }

        // Step 3: grow the resident set.
        if st.resident_count() < self.config.max {
            st.resident_pending += 1;
            return Ok(Plan::CreateResident);
        }

        // Step 4: ephemeral overflow.
        if st.overflow_slots < self.config.overflow {
            st.overflow_slots += 1;
            return Ok(Plan::CreateOverflow);
        }

        // Step 5: park in the waiter queue.
        let notify = Arc::new(Notify::new());
        st.waiters.push_back(notify.clone());
        Ok(Plan::Wait(notify))
    }

    fn remove_waiter(&self, notify: &Arc<Notify>) {
        let mut state = self.lock();
        if let Some(index) = state.waiters.iter().position(|w| Arc::ptr_eq(w, notify)) {
            state.waiters.remove(index);
        }
    }

    /// Wake the waiter at the head of the queue.
    fn wake_one(&self) {
        let state = self.lock();
        if let Some(waiter) = state.waiters.front() {
            waiter.notify_one();
        }
    }

    /// Return a connection. Ephemeral channels are destroyed; unhealthy or
    /// over-age residents are closed and dropped (the next acquire creates
    /// a replacement); healthy residents go back to the idle set.
    fn release(&self, id: u64, ephemeral: bool) {
        let mut state = self.lock();
        if ephemeral {
            state.overflow_slots = state.overflow_slots.saturating_sub(1);
            if let Some(entry) = state.remove_entry(id) {
                entry.conn.close();
            }
            drop(state);
            self.wake_one();
            return;
        }
        let closed = state.closed;
        let mut unhealthy = false;
        if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
            entry.in_use = false;
            entry.last_used_at = Instant::now();
            unhealthy = closed
                || entry.conn.is_closed()
                || entry.created_at.elapsed() >= self.config.recycle_age;
        }
        if unhealthy {
            if let Some(dead) = state.remove_entry(id) {
                dead.conn.close();
            }
        }
        drop(state);
        self.wake_one();
    }

    /// Close the pool: drain idle channels and fail all waiters.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        let mut keep = Vec::new();
        for entry in state.entries.drain(..) {
            if entry.in_use {
                // Still handed out; released connections are closed on return.
                keep.push(entry);
            } else {
                entry.conn.close();
            }
        }
        state.entries = keep;
        state.affinity.clear();
        for waiter in state.waiters.drain(..) {
            waiter.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn statistics(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            active: state.entries.iter().filter(|e| e.in_use).count(),
            idle: state.entries.iter().filter(|e| !e.in_use).count(),
            total_created: self.total_created.load(Ordering::Relaxed),
            failed_creations: self.failed_creations.load(Ordering::Relaxed),
            waiters_now: state.waiters.len(),
            total_acquires: self.total_acquires.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.statistics();
        f.debug_struct("Pool")
            .field("min", &self.config.min)
            .field("max", &self.config.max)
            .field("overflow", &self.config.overflow)
            .field("active", &stats.active)
            .field("idle", &stats.idle)
            .finish()
    }
}

/// A pooled connection, returned to the pool on drop.
pub struct PooledConn {
    pool: Arc<Pool>,
    id: u64,
    conn: Arc<Connection>,
    ephemeral: bool,
}

impl std::fmt::Debug for PooledConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConn")
            .field("id", &self.id)
            .field("ephemeral", &self.ephemeral)
            .field("conn", &self.conn)
            .finish()
    }
}

impl PooledConn {
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Whether this channel was created over the resident limit.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

impl Deref for PooledConn {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        self.pool.release(self.id, self.ephemeral);
    }
}
