//! Connection and cursor façade.
//!
//! A [`Connection`] wires one session manager, one invoker and a strategy
//! coordinator together and exposes typed methods for the engine's
//! operations. A [`Cursor`] drives one statement at a time: prepare and
//! execute, result metadata, batched fetches, and the clear/cancel calls
//! that end a query and let a pending strategy transition take effect.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use e6x_vector::{decode_chunk, read_result_metadata, Chunk, FieldInfo, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::invoker::{CallTarget, Invoker};
use crate::proto::*;
use crate::rpc::EngineRpc;
use crate::session::SessionManager;
use crate::strategy::{Strategy, StrategyCoordinator, StrategySnapshot};

/// Result of a status poll for a query.
#[derive(Clone, Copy, Debug)]
pub struct QueryStatus {
    pub ready: bool,
    pub row_count: i64,
}

/// Result of an explain-analyze call.
#[derive(Clone, Debug)]
pub struct ExplainAnalysis {
    pub planner: String,
    pub is_cached: bool,
    pub parsing_time: i64,
    pub queueing_time: i64,
}

/// Outcome of loading catalogs, including per-schema failures.
#[derive(Clone, Debug)]
pub struct CatalogLoadResult {
    pub status: String,
    pub failures: Vec<FailedSchemaElement>,
}

/// One authenticated channel to the engine.
pub struct Connection {
    config: Arc<ClientConfig>,
    session: Arc<SessionManager>,
    coordinator: Arc<StrategyCoordinator>,
    invoker: Invoker,
    closed: AtomicBool,
}

impl Connection {
    /// Connect using the process-wide strategy coordinator.
    pub fn connect(config: ClientConfig) -> Result<Arc<Connection>> {
        Self::connect_with_coordinator(config, StrategyCoordinator::global())
    }

    /// Connect with an explicit coordinator (isolated deployments, tests).
    pub fn connect_with_coordinator(
        config: ClientConfig,
        coordinator: Arc<StrategyCoordinator>,
    ) -> Result<Arc<Connection>> {
        let config = Arc::new(config);
        let session = Arc::new(SessionManager::connect(config.clone())?);
        Ok(Self::assemble(config, session, coordinator))
    }

    /// Build a connection over an existing service implementation.
    pub fn with_engine(
        config: ClientConfig,
        engine: Arc<dyn EngineRpc>,
        coordinator: Arc<StrategyCoordinator>,
    ) -> Arc<Connection> {
        let config = Arc::new(config);
        let session = Arc::new(SessionManager::with_engine(config.clone(), engine));
        Self::assemble(config, session, coordinator)
    }

    fn assemble(
        config: Arc<ClientConfig>,
        session: Arc<SessionManager>,
        coordinator: Arc<StrategyCoordinator>,
    ) -> Arc<Connection> {
        let invoker = Invoker::new(session.clone(), coordinator.clone(), config.retry);
        Arc::new(Connection {
            config,
            session,
            coordinator,
            invoker,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session id if the connection has authenticated.
    pub fn session_id(&self) -> Option<String> {
        self.session.session_id()
    }

    /// Authenticate if needed and return the session id. Doubles as the
    /// pool's liveness probe.
    pub async fn ping(&self) -> Result<String> {
        self.ensure_open()?;
        self.session.ensure_session(&self.coordinator).await
    }

    pub fn strategy_snapshot(&self) -> StrategySnapshot {
        self.coordinator.snapshot()
    }

    /// Tear down the channel and replace it with a fresh one.
    pub fn reopen(&self) -> Result<()> {
        self.ensure_open()?;
        self.session.reopen()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    /// New cursor over this connection.
    pub fn cursor(self: &Arc<Self>) -> Cursor {
        Cursor::new(self.clone())
    }

    /// Schema names, through the catalog-aware call when one is configured.
    pub async fn get_schema_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        let response = match self.config.catalog.clone() {
            Some(catalog) => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let catalog = catalog.clone();
                            Box::pin(async move {
                                engine
                                    .get_schema_names_v2(
                                        &ctx,
                                        GetSchemaNamesV2Request {
                                            session_id,
                                            catalog,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
            None => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            Box::pin(async move {
                                engine
                                    .get_schema_names(&ctx, GetSchemaNamesRequest { session_id })
                                    .await
                            })
                        }),
                    )
                    .await?
            }
        };
        Ok(response.schemas)
    }

    /// Tables of the given schema (or the configured database).
    pub async fn get_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        self.ensure_open()?;
        let schema = schema
            .map(str::to_owned)
            .or_else(|| self.config.database.clone())
            .unwrap_or_default();
        let response = match self.config.catalog.clone() {
            Some(catalog) => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let catalog = catalog.clone();
                            Box::pin(async move {
                                engine
                                    .get_tables_v2(
                                        &ctx,
                                        GetTablesV2Request {
                                            session_id,
                                            schema,
                                            catalog,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
            None => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            Box::pin(async move {
                                engine
                                    .get_tables(&ctx, GetTablesRequest { session_id, schema })
                                    .await
                            })
                        }),
                    )
                    .await?
            }
        };
        Ok(response.tables)
    }

    /// Column names and types of a table.
    pub async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<GFieldInfo>> {
        self.ensure_open()?;
        let schema = schema
            .map(str::to_owned)
            .or_else(|| self.config.database.clone())
            .unwrap_or_default();
        let table = table.to_string();
        let response = match self.config.catalog.clone() {
            Some(catalog) => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let table = table.clone();
                            let catalog = catalog.clone();
                            Box::pin(async move {
                                engine
                                    .get_columns_v2(
                                        &ctx,
                                        GetColumnsV2Request {
                                            session_id,
                                            schema,
                                            table,
                                            catalog,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
            None => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let table = table.clone();
                            Box::pin(async move {
                                engine
                                    .get_columns(
                                        &ctx,
                                        GetColumnsRequest {
                                            session_id,
                                            schema,
                                            table,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
        };
        Ok(response.field_info)
    }

    /// Validate a statement without executing it.
    pub async fn dry_run(&self, sql: &str) -> Result<String> {
        self.ensure_open()?;
        let schema = self.config.database.clone().unwrap_or_default();
        let query_string = sql.to_string();
        let response = match self.config.catalog.clone() {
            Some(catalog) => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let query_string = query_string.clone();
                            let catalog = catalog.clone();
                            Box::pin(async move {
                                engine
                                    .dry_run_v2(
                                        &ctx,
                                        DryRunRequestV2 {
                                            engine_ip: String::new(),
                                            session_id,
                                            schema,
                                            query_string,
                                            catalog,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
            None => {
                self.invoker
                    .call(
                        CallTarget::session_level(),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let query_string = query_string.clone();
                            Box::pin(async move {
                                engine
                                    .dry_run(
                                        &ctx,
                                        DryRunRequest {
                                            engine_ip: String::new(),
                                            session_id,
                                            schema,
                                            query_string,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
        };
        Ok(response.dryrun_value)
    }

    /// Set engine properties for this session.
    pub async fn set_props(&self, props: &str) -> Result<()> {
        self.ensure_open()?;
        let props = props.to_string();
        self.invoker
            .call(
                CallTarget::session_level(),
                Box::new(move |engine, ctx, session_id| {
                    let props = props.clone();
                    Box::pin(async move {
                        engine.set_props(&ctx, SetPropsRequest { session_id, props }).await
                    })
                }),
            )
            .await?;
        Ok(())
    }

    /// Push user/token updates to the engine.
    pub async fn update_users(&self, users: Vec<UserAccessInfo>) -> Result<()> {
        self.ensure_open()?;
        self.invoker
            .call(
                CallTarget::session_level(),
                Box::new(move |engine, ctx, _session_id| {
                    let users = users.clone();
                    Box::pin(async move {
                        engine.update_users(&ctx, UpdateUsersRequest { users }).await
                    })
                }),
            )
            .await?;
        Ok(())
    }

    /// Submit catalog definitions (JSON) for loading.
    pub async fn add_catalogs(&self, json: &str) -> Result<String> {
        self.ensure_open()?;
        let json = json.to_string();
        let response = self
            .invoker
            .call(
                CallTarget::session_level(),
                Box::new(move |engine, ctx, session_id| {
                    let json = json.clone();
                    Box::pin(async move {
                        engine.add_catalogs(&ctx, AddCatalogsRequest { session_id, json }).await
                    })
                }),
            )
            .await?;
        Ok(response.status)
    }

    /// Outcome of the last catalog load, with any per-schema failures.
    pub async fn get_add_catalogs_result(&self) -> Result<CatalogLoadResult> {
        self.ensure_open()?;
        let response = self
            .invoker
            .call(
                CallTarget::session_level(),
                Box::new(move |engine, ctx, session_id| {
                    Box::pin(async move {
                        engine
                            .get_add_catalogs_response(&ctx, GetAddCatalogsRequest { session_id })
                            .await
                    })
                }),
            )
            .await?;
        Ok(CatalogLoadResult {
            status: response.status,
            failures: response.failures,
        })
    }

    /// Catalogs visible to this session.
    pub async fn get_catalogs(&self) -> Result<Vec<CatalogResponse>> {
        self.ensure_open()?;
        let response = self
            .invoker
            .call(
                CallTarget::session_level(),
                Box::new(move |engine, ctx, session_id| {
                    Box::pin(async move {
                        engine.get_cataloges(&ctx, GetCatalogesRequest { session_id }).await
                    })
                }),
            )
            .await?;
        Ok(response.catalog_responses)
    }

    pub async fn refresh_catalogs(&self) -> Result<()> {
        self.ensure_open()?;
        self.invoker
            .call(
                CallTarget::session_level(),
                Box::new(move |engine, ctx, session_id| {
                    Box::pin(async move {
                        engine
                            .refresh_catalogs(&ctx, RefreshCatalogsRequest { session_id })
                            .await
                    })
                }),
            )
            .await?;
        Ok(())
    }

    /// Release server-side resources of a query. A safe point: a pending
    /// strategy transition is applied afterwards.
    pub async fn clear(&self, query_id: &str, engine_ip: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let query = query_id.to_string();
        let ip = engine_ip.unwrap_or_default().to_string();
        self.invoker
            .call(
                CallTarget::query(query_id, engine_ip),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = query.clone();
                    let engine_ip = ip.clone();
                    Box::pin(async move {
                        engine
                            .clear(
                                &ctx,
                                ClearRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        self.finish_query(query_id);
        Ok(())
    }

    /// Best-effort cancel of a running query. Also a safe point.
    pub async fn cancel_query(&self, query_id: &str, engine_ip: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let query = query_id.to_string();
        let ip = engine_ip.unwrap_or_default().to_string();
        self.invoker
            .call(
                CallTarget::query(query_id, engine_ip),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = query.clone();
                    let engine_ip = ip.clone();
                    Box::pin(async move {
                        engine
                            .cancel_query(
                                &ctx,
                                CancelQueryRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        self.finish_query(query_id);
        Ok(())
    }

    /// Clear a finished query or cancel a running one, whichever applies.
    pub async fn clear_or_cancel(&self, query_id: &str, engine_ip: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let query = query_id.to_string();
        let ip = engine_ip.unwrap_or_default().to_string();
        self.invoker
            .call(
                CallTarget::query(query_id, engine_ip),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = query.clone();
                    let engine_ip = ip.clone();
                    Box::pin(async move {
                        engine
                            .clear_or_cancel_query(
                                &ctx,
                                ClearOrCancelQueryRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        self.finish_query(query_id);
        Ok(())
    }

    /// Drop the query's tag registration and let a pending strategy
    /// transition take effect.
    fn finish_query(&self, query_id: &str) {
        self.coordinator.forget_query(query_id);
        self.coordinator.apply_pending_at_safe_point();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &format_args!("{}:{}", self.config.host, self.config.port))
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Default number of rows a `fetch_many` call returns.
const DEFAULT_ARRAY_SIZE: usize = 1000;

/// Drives one statement at a time over a connection.
pub struct Cursor {
    conn: Arc<Connection>,
    array_size: usize,
    query_id: Option<String>,
    engine_ip: Option<String>,
    fields: Vec<FieldInfo>,
    row_count: i64,
    metadata_loaded: bool,
    buffered: VecDeque<Vec<Value>>,
    drained: bool,
}

impl Cursor {
    fn new(conn: Arc<Connection>) -> Self {
        Self {
            conn,
            array_size: DEFAULT_ARRAY_SIZE,
            query_id: None,
            engine_ip: None,
            fields: Vec::new(),
            row_count: 0,
            metadata_loaded: false,
            buffered: VecDeque::new(),
            drained: false,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Rows handed out per `fetch_many` call; zero resets to the default.
    pub fn set_array_size(&mut self, size: usize) {
        self.array_size = if size == 0 { DEFAULT_ARRAY_SIZE } else { size };
    }

    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    /// Engine node that planned the running query.
    pub fn engine_ip(&self) -> Option<&str> {
        self.engine_ip.as_deref()
    }

    /// Column descriptions of the current result set.
    pub fn description(&self) -> &[FieldInfo] {
        &self.fields
    }

    fn active_query(&self) -> Result<(String, String)> {
        match (&self.query_id, &self.engine_ip) {
            (Some(query_id), Some(engine_ip)) => Ok((query_id.clone(), engine_ip.clone())),
            _ => Err(Error::NoActiveQuery),
        }
    }

    /// Prepare and execute a statement, returning the query id.
    ///
    /// The tag the statement was prepared under is registered so every
    /// follow-up call carries it until the query is cleared or cancelled.
    pub async fn execute(&mut self, sql: &str) -> Result<String> {
        self.conn.ensure_open()?;
        self.reset();
        let sql = sql.trim();
        let sql = sql.strip_suffix(';').unwrap_or(sql).to_string();
        let schema = self.conn.config.database.clone().unwrap_or_default();
        let prepare_timeout = self.conn.config.channel.prepare_timeout;

        let (response, tag) = match self.conn.config.catalog.clone() {
            Some(catalog) => {
                let query_string = sql;
                self.conn
                    .invoker
                    .call_tagged(
                        CallTarget::session_level().with_timeout(prepare_timeout),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let catalog = catalog.clone();
                            let query_string = query_string.clone();
                            Box::pin(async move {
                                engine
                                    .prepare_statement_v2(
                                        &ctx,
                                        PrepareStatementV2Request {
                                            session_id,
                                            schema,
                                            catalog,
                                            query_string,
                                            quoting: String::new(),
                                            planner_ip: None,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
            None => {
                let query_string = sql;
                self.conn
                    .invoker
                    .call_tagged(
                        CallTarget::session_level().with_timeout(prepare_timeout),
                        Box::new(move |engine, ctx, session_id| {
                            let schema = schema.clone();
                            let query_string = query_string.clone();
                            Box::pin(async move {
                                engine
                                    .prepare_statement(
                                        &ctx,
                                        PrepareStatementRequest {
                                            session_id,
                                            schema,
                                            query_string,
                                            quoting: String::new(),
                                            planner_ip: None,
                                        },
                                    )
                                    .await
                            })
                        }),
                    )
                    .await?
            }
        };

        let query_id = response.query_id;
        let engine_ip = response.engine_ip;
        if let Some(tag) = tag {
            self.conn.coordinator.register_query(&query_id, tag);
        }
        self.query_id = Some(query_id.clone());
        self.engine_ip = Some(engine_ip.clone());

        let use_v2 = self.conn.config.catalog.is_some();
        let execute_query = query_id.clone();
        let execute_ip = engine_ip.clone();
        self.conn
            .invoker
            .call(
                CallTarget::query(&query_id, Some(&engine_ip)),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = execute_query.clone();
                    let engine_ip = execute_ip.clone();
                    Box::pin(async move {
                        if use_v2 {
                            engine
                                .execute_statement_v2(
                                    &ctx,
                                    ExecuteStatementV2Request {
                                        engine_ip,
                                        session_id,
                                        query_id,
                                        should_not_cache: false,
                                        params: Vec::new(),
                                    },
                                )
                                .await
                        } else {
                            engine
                                .execute_statement(
                                    &ctx,
                                    ExecuteStatementRequest {
                                        engine_ip,
                                        session_id,
                                        query_id,
                                        should_not_cache: false,
                                    },
                                )
                                .await
                        }
                    })
                }),
            )
            .await?;

        debug!(query_id = %query_id, "statement executing");
        Ok(query_id)
    }

    fn reset(&mut self) {
        if let Some(old) = self.query_id.take() {
            self.conn.coordinator.forget_query(&old);
        }
        self.engine_ip = None;
        self.fields.clear();
        self.row_count = 0;
        self.metadata_loaded = false;
        self.buffered.clear();
        self.drained = false;
    }

    /// Fetch and decode the result metadata stream.
    pub async fn update_metadata(&mut self) -> Result<()> {
        let (query_id, engine_ip) = self.active_query()?;
        let target_query = query_id.clone();
        let target_ip = engine_ip.clone();
        let response = self
            .conn
            .invoker
            .call(
                CallTarget::query(&query_id, Some(&engine_ip)),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = target_query.clone();
                    let engine_ip = target_ip.clone();
                    Box::pin(async move {
                        engine
                            .get_result_metadata(
                                &ctx,
                                GetResultMetadataRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        let (row_count, fields) = read_result_metadata(&response.result_meta_data)?;
        self.row_count = row_count;
        self.fields = fields;
        self.metadata_loaded = true;
        Ok(())
    }

    /// Hinted row count from the result metadata.
    pub async fn row_count(&mut self) -> Result<i64> {
        if !self.metadata_loaded {
            self.update_metadata().await?;
        }
        Ok(self.row_count)
    }

    /// Fetch the next batch of rows; `None` when the result set is done.
    pub async fn fetch_batch(&mut self) -> Result<Option<Vec<Vec<Value>>>> {
        if self.drained {
            return Ok(None);
        }
        let (query_id, engine_ip) = self.active_query()?;
        let target_query = query_id.clone();
        let target_ip = engine_ip.clone();
        let response = self
            .conn
            .invoker
            .call(
                CallTarget::query(&query_id, Some(&engine_ip)),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = target_query.clone();
                    let engine_ip = target_ip.clone();
                    Box::pin(async move {
                        engine
                            .get_next_result_batch(
                                &ctx,
                                GetNextResultBatchRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        if !self.metadata_loaded {
            self.update_metadata().await?;
        }
        if response.result_batch.is_empty() {
            self.drained = true;
            return Ok(None);
        }
        let chunk = Chunk::from_bytes(&response.result_batch)?;
        let rows = decode_chunk(&chunk);
        if rows.is_empty() {
            self.drained = true;
            return Ok(None);
        }
        Ok(Some(rows))
    }

    /// Fetch every remaining row.
    pub async fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>> {
        let mut rows: Vec<Vec<Value>> = self.buffered.drain(..).collect();
        while let Some(batch) = self.fetch_batch().await? {
            rows.extend(batch);
        }
        Ok(rows)
    }

    /// Fetch up to `size` rows (the cursor's array size when `None`).
    pub async fn fetch_many(&mut self, size: Option<usize>) -> Result<Vec<Vec<Value>>> {
        let size = size.unwrap_or(self.array_size);
        while self.buffered.len() < size && !self.drained {
            match self.fetch_batch().await? {
                Some(batch) => self.buffered.extend(batch),
                None => break,
            }
        }
        let take = size.min(self.buffered.len());
        Ok(self.buffered.drain(..take).collect())
    }

    /// Fetch a single row.
    pub async fn fetch_one(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.fetch_many(Some(1)).await?.into_iter().next())
    }

    /// Poll execution status of the running query.
    pub async fn status(&mut self) -> Result<QueryStatus> {
        let (query_id, engine_ip) = self.active_query()?;
        let target_query = query_id.clone();
        let target_ip = engine_ip.clone();
        let response = self
            .conn
            .invoker
            .call(
                CallTarget::query(&query_id, Some(&engine_ip)),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = target_query.clone();
                    let engine_ip = target_ip.clone();
                    Box::pin(async move {
                        engine
                            .status(
                                &ctx,
                                StatusRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        Ok(QueryStatus {
            ready: response.status,
            row_count: response.row_count,
        })
    }

    /// Planner output for the prepared statement.
    pub async fn explain(&mut self) -> Result<String> {
        let (query_id, engine_ip) = self.active_query()?;
        let target_query = query_id.clone();
        let target_ip = engine_ip.clone();
        let response = self
            .conn
            .invoker
            .call(
                CallTarget::query(&query_id, Some(&engine_ip)),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = target_query.clone();
                    let engine_ip = target_ip.clone();
                    Box::pin(async move {
                        engine
                            .explain(
                                &ctx,
                                ExplainRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        Ok(response.explain)
    }

    /// Planner output plus execution timings.
    pub async fn explain_analyze(&mut self) -> Result<ExplainAnalysis> {
        let (query_id, engine_ip) = self.active_query()?;
        let target_query = query_id.clone();
        let target_ip = engine_ip.clone();
        let response = self
            .conn
            .invoker
            .call(
                CallTarget::query(&query_id, Some(&engine_ip)),
                Box::new(move |engine, ctx, session_id| {
                    let query_id = target_query.clone();
                    let engine_ip = target_ip.clone();
                    Box::pin(async move {
                        engine
                            .explain_analyze(
                                &ctx,
                                ExplainAnalyzeRequest {
                                    engine_ip,
                                    session_id,
                                    query_id,
                                },
                            )
                            .await
                    })
                }),
            )
            .await?;
        Ok(ExplainAnalysis {
            planner: response.explain_analyze,
            is_cached: response.is_cached,
            parsing_time: response.parsing_time,
            queueing_time: response.queueing_time,
        })
    }

    /// Clear the current query (or an explicit one) on the engine.
    pub async fn clear(&mut self) -> Result<()> {
        let (query_id, engine_ip) = self.active_query()?;
        self.conn.clear(&query_id, Some(&engine_ip)).await?;
        self.query_id = None;
        Ok(())
    }

    /// Cancel the current query.
    pub async fn cancel(&mut self) -> Result<()> {
        let (query_id, engine_ip) = self.active_query()?;
        self.conn.cancel_query(&query_id, Some(&engine_ip)).await?;
        self.query_id = None;
        Ok(())
    }

    /// Register a follow-up strategy for a query this cursor did not
    /// prepare (for example when resuming by query id).
    pub fn adopt_query(&mut self, query_id: &str, engine_ip: &str, tag: Option<Strategy>) {
        self.reset();
        if let Some(tag) = tag {
            self.conn.coordinator.register_query(query_id, tag);
        }
        self.query_id = Some(query_id.to_string());
        self.engine_ip = Some(engine_ip.to_string());
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        // The engine-side query is left to the server's reaper if the
        // caller never cleared it, but the tag registration must not leak.
        if let Some(query_id) = self.query_id.take() {
            self.conn.coordinator.forget_query(&query_id);
        }
    }
}
