//! Shared helpers for integration tests: an in-process mock engine that
//! implements the RPC trait, enforces a server-side deployment strategy,
//! and records every call it sees together with the strategy header it
//! carried.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tonic::{Code, Status};

use e6x_client::config::ClientConfig;
use e6x_client::proto::*;
use e6x_client::rpc::{EngineRpc, RequestContext, RpcResult};

/// One recorded RPC.
#[derive(Clone, Debug)]
pub struct CallRecord {
    pub method: &'static str,
    pub strategy: Option<String>,
    pub session_id: String,
}

#[derive(Default)]
struct MockState {
    /// Strategy the server currently accepts; `None` accepts anything.
    active: Option<String>,
    /// Upcoming strategy: accepted as valid and attached as a hint.
    announced: Option<String>,
    /// Fail this many authenticate calls with an access-denied status.
    deny_auths: usize,
    /// Fail the next non-authenticate call with an access-denied status.
    deny_next_call: bool,
    session_counter: u32,
    calls: Vec<CallRecord>,
    result_metadata: Vec<u8>,
    batches: VecDeque<Vec<u8>>,
}

/// In-process engine double.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Strategy the server enforces on every call.
    pub fn set_active_strategy(&self, strategy: &str) {
        self.lock().active = Some(strategy.to_string());
    }

    /// Announce an upcoming strategy: attached as a hint to responses and
    /// accepted alongside the active one.
    pub fn announce_strategy(&self, strategy: &str) {
        self.lock().announced = Some(strategy.to_string());
    }

    /// Flip the accepted strategy, rejecting the old one from now on.
    pub fn switch_active_strategy(&self, strategy: &str) {
        let mut state = self.lock();
        state.active = Some(strategy.to_string());
        state.announced = None;
    }

    pub fn deny_next_auths(&self, count: usize) {
        self.lock().deny_auths = count;
    }

    pub fn deny_next_call(&self) {
        self.lock().deny_next_call = true;
    }

    pub fn set_result_metadata(&self, bytes: Vec<u8>) {
        self.lock().result_metadata = bytes;
    }

    pub fn push_batch(&self, bytes: Vec<u8>) {
        self.lock().batches.push_back(bytes);
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    /// Recorded calls for one method name.
    pub fn calls_for(&self, method: &str) -> Vec<CallRecord> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    /// Record the call and enforce the strategy header.
    fn admit(&self, method: &'static str, ctx: &RequestContext, session_id: &str) -> Result<(), Status> {
        let mut state = self.lock();
        let strategy = ctx.strategy().map(str::to_owned);
        state.calls.push(CallRecord {
            method,
            strategy: strategy.clone(),
            session_id: session_id.to_string(),
        });
        if state.deny_next_call && method != "authenticate" {
            state.deny_next_call = false;
            return Err(Status::new(Code::Unauthenticated, "Access denied"));
        }
        if let Some(active) = &state.active {
            let accepted = strategy.as_deref() == Some(active.as_str())
                || (state.announced.is_some() && strategy.as_deref() == state.announced.as_deref());
            if !accepted {
                return Err(Status::new(
                    Code::Internal,
                    format!(
                        "Wrong strategy. Status: 456. Expected: {active}, Got: {}",
                        strategy.as_deref().unwrap_or("<none>")
                    ),
                ));
            }
        }
        Ok(())
    }

    fn hint(&self) -> Option<String> {
        self.lock().announced.clone()
    }
}

#[async_trait]
impl EngineRpc for MockEngine {
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        _req: AuthenticateRequest,
    ) -> RpcResult<AuthenticateResponse> {
        self.admit("authenticate", ctx, "")?;
        let mut state = self.lock();
        if state.deny_auths > 0 {
            state.deny_auths -= 1;
            return Err(Status::new(Code::Unauthenticated, "Access denied"));
        }
        state.session_counter += 1;
        Ok(AuthenticateResponse {
            session_id: format!("s{}", state.session_counter),
            new_strategy: state.announced.clone(),
        })
    }

    async fn prepare_statement(
        &self,
        ctx: &RequestContext,
        _req: PrepareStatementRequest,
    ) -> RpcResult<PrepareStatementResponse> {
        self.admit("prepareStatement", ctx, "")?;
        let state = self.lock();
        Ok(PrepareStatementResponse {
            engine_ip: "10.0.0.7".to_string(),
            query_id: format!("q{}", state.calls.len()),
            session_id: String::new(),
            new_strategy: state.announced.clone(),
        })
    }

    async fn prepare_statement_v2(
        &self,
        ctx: &RequestContext,
        _req: PrepareStatementV2Request,
    ) -> RpcResult<PrepareStatementResponse> {
        self.admit("prepareStatementV2", ctx, "")?;
        let state = self.lock();
        Ok(PrepareStatementResponse {
            engine_ip: "10.0.0.7".to_string(),
            query_id: format!("q{}", state.calls.len()),
            session_id: String::new(),
            new_strategy: state.announced.clone(),
        })
    }

    async fn execute_statement(
        &self,
        ctx: &RequestContext,
        req: ExecuteStatementRequest,
    ) -> RpcResult<ExecuteStatementResponse> {
        self.admit("executeStatement", ctx, &req.session_id)?;
        Ok(ExecuteStatementResponse {
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn execute_statement_v2(
        &self,
        ctx: &RequestContext,
        req: ExecuteStatementV2Request,
    ) -> RpcResult<ExecuteStatementResponse> {
        self.admit("executeStatementV2", ctx, &req.session_id)?;
        Ok(ExecuteStatementResponse {
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn get_result_metadata(
        &self,
        ctx: &RequestContext,
        req: GetResultMetadataRequest,
    ) -> RpcResult<GetResultMetadataResponse> {
        self.admit("getResultMetadata", ctx, &req.session_id)?;
        let state = self.lock();
        Ok(GetResultMetadataResponse {
            result_meta_data: state.result_metadata.clone(),
            session_id: req.session_id,
            new_strategy: state.announced.clone(),
        })
    }

    async fn get_next_result_batch(
        &self,
        ctx: &RequestContext,
        req: GetNextResultBatchRequest,
    ) -> RpcResult<GetNextResultBatchResponse> {
        self.admit("getNextResultBatch", ctx, &req.session_id)?;
        let batch = self.lock().batches.pop_front().unwrap_or_default();
        Ok(GetNextResultBatchResponse {
            result_batch: batch,
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn status(&self, ctx: &RequestContext, req: StatusRequest) -> RpcResult<StatusResponse> {
        self.admit("status", ctx, &req.session_id)?;
        Ok(StatusResponse {
            status: true,
            row_count: 1,
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn clear(&self, ctx: &RequestContext, req: ClearRequest) -> RpcResult<ClearResponse> {
        self.admit("clear", ctx, &req.session_id)?;
        Ok(ClearResponse {
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn cancel_query(
        &self,
        ctx: &RequestContext,
        req: CancelQueryRequest,
    ) -> RpcResult<CancelQueryResponse> {
        self.admit("cancelQuery", ctx, &req.session_id)?;
        Ok(CancelQueryResponse {
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn clear_or_cancel_query(
        &self,
        ctx: &RequestContext,
        req: ClearOrCancelQueryRequest,
    ) -> RpcResult<ClearOrCancelQueryResponse> {
        self.admit("clearOrCancelQuery", ctx, &req.session_id)?;
        Ok(ClearOrCancelQueryResponse {
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn explain(&self, ctx: &RequestContext, req: ExplainRequest) -> RpcResult<ExplainResponse> {
        self.admit("explain", ctx, &req.session_id)?;
        Ok(ExplainResponse {
            explain: "plan".to_string(),
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn explain_analyze(
        &self,
        ctx: &RequestContext,
        req: ExplainAnalyzeRequest,
    ) -> RpcResult<ExplainAnalyzeResponse> {
        self.admit("explainAnalyze", ctx, &req.session_id)?;
        Ok(ExplainAnalyzeResponse {
            explain_analyze: "plan".to_string(),
            is_cached: false,
            parsing_time: 3,
            queueing_time: 4,
            session_id: req.session_id,
            new_strategy: self.hint(),
        })
    }

    async fn dry_run(&self, ctx: &RequestContext, req: DryRunRequest) -> RpcResult<DryRunResponse> {
        self.admit("dryRun", ctx, &req.session_id)?;
        Ok(DryRunResponse {
            dryrun_value: "ok".to_string(),
            new_strategy: self.hint(),
        })
    }

    async fn dry_run_v2(
        &self,
        ctx: &RequestContext,
        req: DryRunRequestV2,
    ) -> RpcResult<DryRunResponse> {
        self.admit("dryRunV2", ctx, &req.session_id)?;
        Ok(DryRunResponse {
            dryrun_value: "ok".to_string(),
            new_strategy: self.hint(),
        })
    }

    async fn get_schema_names(
        &self,
        ctx: &RequestContext,
        req: GetSchemaNamesRequest,
    ) -> RpcResult<GetSchemaNamesResponse> {
        self.admit("getSchemaNames", ctx, &req.session_id)?;
        Ok(GetSchemaNamesResponse {
            schemas: vec!["main".to_string()],
            session_id: req.session_id,
        })
    }

    async fn get_schema_names_v2(
        &self,
        ctx: &RequestContext,
        req: GetSchemaNamesV2Request,
    ) -> RpcResult<GetSchemaNamesResponse> {
        self.admit("getSchemaNamesV2", ctx, &req.session_id)?;
        Ok(GetSchemaNamesResponse {
            schemas: vec!["main".to_string()],
            session_id: req.session_id,
        })
    }

    async fn get_tables(
        &self,
        ctx: &RequestContext,
        req: GetTablesRequest,
    ) -> RpcResult<GetTablesResponse> {
        self.admit("getTables", ctx, &req.session_id)?;
        Ok(GetTablesResponse {
            tables: vec!["orders".to_string(), "lineitem".to_string()],
            session_id: req.session_id,
        })
    }

    async fn get_tables_v2(
        &self,
        ctx: &RequestContext,
        req: GetTablesV2Request,
    ) -> RpcResult<GetTablesResponse> {
        self.admit("getTablesV2", ctx, &req.session_id)?;
        Ok(GetTablesResponse {
            tables: vec!["orders".to_string(), "lineitem".to_string()],
            session_id: req.session_id,
        })
    }

    async fn get_columns(
        &self,
        ctx: &RequestContext,
        req: GetColumnsRequest,
    ) -> RpcResult<GetColumnsResponse> {
        self.admit("getColumns", ctx, &req.session_id)?;
        Ok(GetColumnsResponse {
            field_info: vec![GFieldInfo {
                field_name: "id".to_string(),
                field_type: "LONG".to_string(),
            }],
            session_id: req.session_id,
        })
    }

    async fn get_columns_v2(
        &self,
        ctx: &RequestContext,
        req: GetColumnsV2Request,
    ) -> RpcResult<GetColumnsResponse> {
        self.admit("getColumnsV2", ctx, &req.session_id)?;
        Ok(GetColumnsResponse {
            field_info: vec![GFieldInfo {
                field_name: "id".to_string(),
                field_type: "LONG".to_string(),
            }],
            session_id: req.session_id,
        })
    }

    async fn add_catalogs(
        &self,
        ctx: &RequestContext,
        req: AddCatalogsRequest,
    ) -> RpcResult<AddCatalogsResponse> {
        self.admit("addCatalogs", ctx, &req.session_id)?;
        Ok(AddCatalogsResponse {
            session_id: req.session_id,
            status: "submitted".to_string(),
        })
    }

    async fn get_add_catalogs_response(
        &self,
        ctx: &RequestContext,
        req: GetAddCatalogsRequest,
    ) -> RpcResult<GetAddCatalogsResponse> {
        self.admit("getAddCatalogsResponse", ctx, &req.session_id)?;
        Ok(GetAddCatalogsResponse {
            status: "done".to_string(),
            failures: vec![FailedSchemaElement {
                name: "legacy".to_string(),
                r#type: "schema".to_string(),
                reason: "unsupported".to_string(),
            }],
            session_id: req.session_id,
        })
    }

    async fn get_cataloges(
        &self,
        ctx: &RequestContext,
        req: GetCatalogesRequest,
    ) -> RpcResult<GetCatalogesResponse> {
        self.admit("getCataloges", ctx, &req.session_id)?;
        Ok(GetCatalogesResponse {
            catalog_responses: vec![CatalogResponse {
                name: "glue".to_string(),
                is_default: true,
            }],
        })
    }

    async fn refresh_catalogs(
        &self,
        ctx: &RequestContext,
        req: RefreshCatalogsRequest,
    ) -> RpcResult<RefreshCatalogsResponse> {
        self.admit("refreshCatalogs", ctx, &req.session_id)?;
        Ok(RefreshCatalogsResponse {
            session_id: req.session_id,
        })
    }

    async fn set_props(
        &self,
        ctx: &RequestContext,
        _req: SetPropsRequest,
    ) -> RpcResult<SetPropsResponse> {
        self.admit("setProps", ctx, "")?;
        Ok(SetPropsResponse {})
    }

    async fn update_users(
        &self,
        ctx: &RequestContext,
        _req: UpdateUsersRequest,
    ) -> RpcResult<UpdateUsersResponse> {
        self.admit("updateUsers", ctx, "")?;
        Ok(UpdateUsersResponse {})
    }
}

/// Install a tracing subscriber once so failing tests can be rerun with
/// `RUST_LOG` for the full story.
pub fn init_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Config pointing at a fictional endpoint; transport is never dialed in
/// these tests.
pub fn test_config() -> ClientConfig {
    ClientConfig::new("engine.test.local", 80, "dev@example.com", "token")
        .database("main")
}

/// Result-metadata stream for the given columns.
pub fn metadata_stream(row_count: i64, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&row_count.to_be_bytes());
    buf.extend_from_slice(&(fields.len() as i32).to_be_bytes());
    for (name, field_type) in fields {
        for part in [*name, *field_type, "UTC", ""] {
            buf.extend_from_slice(&(part.len() as u16).to_be_bytes());
            buf.extend_from_slice(part.as_bytes());
        }
    }
    buf
}
