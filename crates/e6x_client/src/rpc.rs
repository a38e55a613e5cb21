//! RPC service seam.
//!
//! The rest of the client is transport-agnostic: every engine operation
//! goes through the [`EngineRpc`] trait, implemented for real use by
//! [`GrpcEngine`] over a tonic channel and by in-process mocks in tests.
//! The per-call [`RequestContext`] carries the metadata headers (planner
//! address, cluster selector, deployment strategy) and an optional
//! deadline.

use std::time::Duration;

use async_trait::async_trait;
use tonic::metadata::MetadataValue;
use tracing::warn;

use crate::proto::*;
use crate::strategy::Strategy;

/// Metadata keys understood by the engine.
pub mod headers {
    pub const PLANNER_IP: &str = "plannerip";
    pub const CLUSTER_UUID: &str = "cluster-uuid";
    pub const STRATEGY: &str = "strategy";
}

/// Result type of every engine RPC.
pub type RpcResult<T> = std::result::Result<T, tonic::Status>;

/// Access to the optional next-strategy hint on a response.
pub trait StrategyHint {
    fn strategy_hint(&self) -> Option<&str>;
}

/// Per-call metadata and deadline.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    headers: Vec<(&'static str, String)>,
    timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new(
        engine_ip: Option<&str>,
        cluster_uuid: Option<&str>,
        strategy: Option<Strategy>,
    ) -> Self {
        let mut headers = Vec::new();
        if let Some(ip) = engine_ip.filter(|ip| !ip.is_empty()) {
            headers.push((headers::PLANNER_IP, ip.to_string()));
        }
        if let Some(cluster) = cluster_uuid.filter(|c| !c.is_empty()) {
            headers.push((headers::CLUSTER_UUID, cluster.to_string()));
        }
        if let Some(tag) = strategy {
            headers.push((headers::STRATEGY, tag.as_str().to_string()));
        }
        Self {
            headers,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    /// Strategy header value, if one is attached.
    pub fn strategy(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| *key == headers::STRATEGY)
            .map(|(_, value)| value.as_str())
    }

    /// Wrap a message in a tonic request carrying this context.
    pub fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }
        for (key, value) in &self.headers {
            match MetadataValue::try_from(value.as_str()) {
                Ok(value) => {
                    request.metadata_mut().insert(*key, value);
                }
                Err(_) => warn!(key, "dropping metadata value that is not valid ASCII"),
            }
        }
        request
    }
}

/// The engine's query service, one method per operation.
///
/// Implementations attach the context's metadata to the outgoing call and
/// return the raw response; retry and strategy handling live above this
/// seam, in the invoker.
#[async_trait]
pub trait EngineRpc: Send + Sync + 'static {
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        req: AuthenticateRequest,
    ) -> RpcResult<AuthenticateResponse>;

    async fn prepare_statement(
        &self,
        ctx: &RequestContext,
        req: PrepareStatementRequest,
    ) -> RpcResult<PrepareStatementResponse>;

    async fn prepare_statement_v2(
        &self,
        ctx: &RequestContext,
        req: PrepareStatementV2Request,
    ) -> RpcResult<PrepareStatementResponse>;

    async fn execute_statement(
        &self,
        ctx: &RequestContext,
        req: ExecuteStatementRequest,
    ) -> RpcResult<ExecuteStatementResponse>;

    async fn execute_statement_v2(
        &self,
        ctx: &RequestContext,
        req: ExecuteStatementV2Request,
    ) -> RpcResult<ExecuteStatementResponse>;

    async fn get_result_metadata(
        &self,
        ctx: &RequestContext,
        req: GetResultMetadataRequest,
    ) -> RpcResult<GetResultMetadataResponse>;

    async fn get_next_result_batch(
        &self,
        ctx: &RequestContext,
        req: GetNextResultBatchRequest,
    ) -> RpcResult<GetNextResultBatchResponse>;

    async fn status(&self, ctx: &RequestContext, req: StatusRequest) -> RpcResult<StatusResponse>;

    async fn clear(&self, ctx: &RequestContext, req: ClearRequest) -> RpcResult<ClearResponse>;

    async fn cancel_query(
        &self,
        ctx: &RequestContext,
        req: CancelQueryRequest,
    ) -> RpcResult<CancelQueryResponse>;

    async fn clear_or_cancel_query(
        &self,
        ctx: &RequestContext,
        req: ClearOrCancelQueryRequest,
    ) -> RpcResult<ClearOrCancelQueryResponse>;

    async fn explain(&self, ctx: &RequestContext, req: ExplainRequest)
        -> RpcResult<ExplainResponse>;

    async fn explain_analyze(
        &self,
        ctx: &RequestContext,
        req: ExplainAnalyzeRequest,
    ) -> RpcResult<ExplainAnalyzeResponse>;

    async fn dry_run(&self, ctx: &RequestContext, req: DryRunRequest) -> RpcResult<DryRunResponse>;

    async fn dry_run_v2(
        &self,
        ctx: &RequestContext,
        req: DryRunRequestV2,
    ) -> RpcResult<DryRunResponse>;

    async fn get_schema_names(
        &self,
        ctx: &RequestContext,
        req: GetSchemaNamesRequest,
    ) -> RpcResult<GetSchemaNamesResponse>;

    async fn get_schema_names_v2(
        &self,
        ctx: &RequestContext,
        req: GetSchemaNamesV2Request,
    ) -> RpcResult<GetSchemaNamesResponse>;

    async fn get_tables(
        &self,
        ctx: &RequestContext,
        req: GetTablesRequest,
    ) -> RpcResult<GetTablesResponse>;

    async fn get_tables_v2(
        &self,
        ctx: &RequestContext,
        req: GetTablesV2Request,
    ) -> RpcResult<GetTablesResponse>;

    async fn get_columns(
        &self,
        ctx: &RequestContext,
        req: GetColumnsRequest,
    ) -> RpcResult<GetColumnsResponse>;

    async fn get_columns_v2(
        &self,
        ctx: &RequestContext,
        req: GetColumnsV2Request,
    ) -> RpcResult<GetColumnsResponse>;

    async fn add_catalogs(
        &self,
        ctx: &RequestContext,
        req: AddCatalogsRequest,
    ) -> RpcResult<AddCatalogsResponse>;

    async fn get_add_catalogs_response(
        &self,
        ctx: &RequestContext,
        req: GetAddCatalogsRequest,
    ) -> RpcResult<GetAddCatalogsResponse>;

    async fn get_cataloges(
        &self,
        ctx: &RequestContext,
        req: GetCatalogesRequest,
    ) -> RpcResult<GetCatalogesResponse>;

    async fn refresh_catalogs(
        &self,
        ctx: &RequestContext,
        req: RefreshCatalogsRequest,
    ) -> RpcResult<RefreshCatalogsResponse>;

    async fn set_props(
        &self,
        ctx: &RequestContext,
        req: SetPropsRequest,
    ) -> RpcResult<SetPropsResponse>;

    async fn update_users(
        &self,
        ctx: &RequestContext,
        req: UpdateUsersRequest,
    ) -> RpcResult<UpdateUsersResponse>;
}

/// [`EngineRpc`] over a real tonic channel.
pub struct GrpcEngine {
    client: engine_client::QueryEngineClient,
}

impl GrpcEngine {
    pub fn new(client: engine_client::QueryEngineClient) -> Self {
        Self { client }
    }
}

/// Forward every trait method to the generated-style unary client.
macro_rules! grpc_engine_impl {
    ($($name:ident($req:ty) -> $resp:ty;)*) => {
        #[async_trait]
        impl EngineRpc for GrpcEngine {
            $(
                async fn $name(&self, ctx: &RequestContext, req: $req) -> RpcResult<$resp> {
                    self.client
                        .$name(ctx.request(req))
                        .await
                        .map(|r| r.into_inner())
                }
            )*
        }
    };
}

grpc_engine_impl! {
    authenticate(AuthenticateRequest) -> AuthenticateResponse;
    prepare_statement(PrepareStatementRequest) -> PrepareStatementResponse;
    prepare_statement_v2(PrepareStatementV2Request) -> PrepareStatementResponse;
    execute_statement(ExecuteStatementRequest) -> ExecuteStatementResponse;
    execute_statement_v2(ExecuteStatementV2Request) -> ExecuteStatementResponse;
    get_result_metadata(GetResultMetadataRequest) -> GetResultMetadataResponse;
    get_next_result_batch(GetNextResultBatchRequest) -> GetNextResultBatchResponse;
    status(StatusRequest) -> StatusResponse;
    clear(ClearRequest) -> ClearResponse;
    cancel_query(CancelQueryRequest) -> CancelQueryResponse;
    clear_or_cancel_query(ClearOrCancelQueryRequest) -> ClearOrCancelQueryResponse;
    explain(ExplainRequest) -> ExplainResponse;
    explain_analyze(ExplainAnalyzeRequest) -> ExplainAnalyzeResponse;
    dry_run(DryRunRequest) -> DryRunResponse;
    dry_run_v2(DryRunRequestV2) -> DryRunResponse;
    get_schema_names(GetSchemaNamesRequest) -> GetSchemaNamesResponse;
    get_schema_names_v2(GetSchemaNamesV2Request) -> GetSchemaNamesResponse;
    get_tables(GetTablesRequest) -> GetTablesResponse;
    get_tables_v2(GetTablesV2Request) -> GetTablesResponse;
    get_columns(GetColumnsRequest) -> GetColumnsResponse;
    get_columns_v2(GetColumnsV2Request) -> GetColumnsResponse;
    add_catalogs(AddCatalogsRequest) -> AddCatalogsResponse;
    get_add_catalogs_response(GetAddCatalogsRequest) -> GetAddCatalogsResponse;
    get_cataloges(GetCatalogesRequest) -> GetCatalogesResponse;
    refresh_catalogs(RefreshCatalogsRequest) -> RefreshCatalogsResponse;
    set_props(SetPropsRequest) -> SetPropsResponse;
    update_users(UpdateUsersRequest) -> UpdateUsersResponse;
}
