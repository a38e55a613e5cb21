//! Client library for the e6x distributed SQL engine.
//!
//! The engine runs two parallel deployments selected by a blue/green tag,
//! and every request must carry the tag of the active one. This crate
//! layers the pieces that make that workable from application code:
//!
//! - [`strategy::StrategyCoordinator`] tracks the active and pending tag,
//!   discovers the right tag by probing, and defers transitions until no
//!   query depends on the old one.
//! - The invoker wraps every outbound RPC with metadata headers, retries
//!   auth failures and wrong-tag rejections within a bounded budget, and
//!   feeds strategy hints from responses back to the coordinator.
//! - [`session::SessionManager`] owns the HTTP/2 channel (plain or TLS)
//!   and the authenticated session, with serialized re-authentication.
//! - [`pool::Pool`] shares a bounded set of connections between callers
//!   with per-caller affinity, health checks, recycling and overflow.
//! - [`connection::Connection`] / [`connection::Cursor`] expose the usual
//!   database-client surface; result batches are decoded by the
//!   `e6x_vector` crate.

pub mod config;
pub mod connection;
pub mod error;
mod invoker;
pub mod pool;
pub mod proto;
pub mod rpc;
pub mod session;
pub mod strategy;

pub use config::{ChannelOptions, ClientConfig, PoolConfig, RetryPolicy, TlsMode};
pub use connection::{CatalogLoadResult, Connection, Cursor, ExplainAnalysis, QueryStatus};
pub use error::{Error, Result};
pub use pool::{CallerKey, ConnectionFactory, Pool, PoolStats, PooledConn};
pub use session::SessionManager;
pub use strategy::{Strategy, StrategyCoordinator, StrategySnapshot};

pub use e6x_vector::{FieldInfo, Value};
