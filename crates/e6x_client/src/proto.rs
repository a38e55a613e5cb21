//! Wire messages for the engine's gRPC service.
//!
//! Hand-maintained prost structs kept in lockstep with the
//! `e6x_engine.proto` schema, plus a thin unary client over a tonic
//! channel. The optional `new_strategy` field announces an upcoming
//! deployment switch and may appear on any response that participates in
//! query execution.

use crate::rpc::StrategyHint;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticateRequest {
    #[prost(string, tag = "1")]
    pub user: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticateResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrepareStatementRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub schema: String,
    #[prost(string, tag = "3")]
    pub query_string: String,
    #[prost(string, tag = "4")]
    pub quoting: String,
    #[prost(string, optional, tag = "5")]
    pub planner_ip: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrepareStatementV2Request {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub schema: String,
    #[prost(string, tag = "3")]
    pub catalog: String,
    #[prost(string, tag = "4")]
    pub query_string: String,
    #[prost(string, tag = "5")]
    pub quoting: String,
    #[prost(string, optional, tag = "6")]
    pub planner_ip: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrepareStatementResponse {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub query_id: String,
    #[prost(string, tag = "3")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteStatementRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
    #[prost(bool, tag = "4")]
    pub should_not_cache: bool,
}

/// Positional statement parameter, serialized as text plus a type name.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParameterValue {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(string, tag = "2")]
    pub r#type: String,
    #[prost(string, tag = "3")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteStatementV2Request {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
    #[prost(bool, tag = "4")]
    pub should_not_cache: bool,
    #[prost(message, repeated, tag = "5")]
    pub params: Vec<ParameterValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteStatementResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResultMetadataRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResultMetadataResponse {
    /// Big-endian result-metadata stream.
    #[prost(bytes = "vec", tag = "1")]
    pub result_meta_data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetNextResultBatchRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetNextResultBatchResponse {
    /// Serialized columnar chunk; empty once the result set is drained.
    #[prost(bytes = "vec", tag = "1")]
    pub result_batch: Vec<u8>,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusResponse {
    #[prost(bool, tag = "1")]
    pub status: bool,
    #[prost(int64, tag = "2")]
    pub row_count: i64,
    #[prost(string, tag = "3")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelQueryRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelQueryResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearOrCancelQueryRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearOrCancelQueryResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExplainRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExplainResponse {
    #[prost(string, tag = "1")]
    pub explain: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExplainAnalyzeRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub query_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExplainAnalyzeResponse {
    #[prost(string, tag = "1")]
    pub explain_analyze: String,
    #[prost(bool, tag = "2")]
    pub is_cached: bool,
    #[prost(int64, tag = "3")]
    pub parsing_time: i64,
    #[prost(int64, tag = "4")]
    pub queueing_time: i64,
    #[prost(string, tag = "5")]
    pub session_id: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DryRunRequest {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub schema: String,
    #[prost(string, tag = "4")]
    pub query_string: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DryRunRequestV2 {
    #[prost(string, tag = "1")]
    pub engine_ip: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub schema: String,
    #[prost(string, tag = "4")]
    pub query_string: String,
    #[prost(string, tag = "5")]
    pub catalog: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DryRunResponse {
    #[prost(string, tag = "1")]
    pub dryrun_value: String,
    #[prost(string, optional, tag = "100")]
    pub new_strategy: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaNamesRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaNamesV2Request {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub catalog: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaNamesResponse {
    #[prost(string, repeated, tag = "1")]
    pub schemas: Vec<String>,
    #[prost(string, tag = "2")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTablesRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub schema: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTablesV2Request {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub schema: String,
    #[prost(string, tag = "3")]
    pub catalog: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTablesResponse {
    #[prost(string, repeated, tag = "1")]
    pub tables: Vec<String>,
    #[prost(string, tag = "2")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetColumnsRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub schema: String,
    #[prost(string, tag = "3")]
    pub table: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetColumnsV2Request {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub schema: String,
    #[prost(string, tag = "3")]
    pub table: String,
    #[prost(string, tag = "4")]
    pub catalog: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GFieldInfo {
    #[prost(string, tag = "1")]
    pub field_name: String,
    #[prost(string, tag = "2")]
    pub field_type: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetColumnsResponse {
    #[prost(message, repeated, tag = "1")]
    pub field_info: Vec<GFieldInfo>,
    #[prost(string, tag = "2")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddCatalogsRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
    /// Catalog definitions, JSON-encoded by the caller.
    #[prost(string, tag = "2")]
    pub json: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddCatalogsResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub status: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetAddCatalogsRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
}

/// One schema element the engine failed to load.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FailedSchemaElement {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub r#type: String,
    #[prost(string, tag = "3")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetAddCatalogsResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(message, repeated, tag = "2")]
    pub failures: Vec<FailedSchemaElement>,
    #[prost(string, tag = "3")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCatalogesRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CatalogResponse {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bool, tag = "2")]
    pub is_default: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCatalogesResponse {
    #[prost(message, repeated, tag = "1")]
    pub catalog_responses: Vec<CatalogResponse>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RefreshCatalogsRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RefreshCatalogsResponse {
    #[prost(string, tag = "1")]
    pub session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetPropsRequest {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub props: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetPropsResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserAccessInfo {
    #[prost(string, tag = "1")]
    pub uuid: String,
    #[prost(string, tag = "2")]
    pub user_name: String,
    #[prost(string, repeated, tag = "3")]
    pub tokens: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateUsersRequest {
    #[prost(message, repeated, tag = "1")]
    pub users: Vec<UserAccessInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateUsersResponse {}

/// Responses that can carry a next-strategy hint.
macro_rules! carries_hint {
    ($($ty:ty),* $(,)?) => {
        $(impl StrategyHint for $ty {
            fn strategy_hint(&self) -> Option<&str> {
                self.new_strategy.as_deref()
            }
        })*
    };
}

/// Responses with no hint field.
macro_rules! no_hint {
    ($($ty:ty),* $(,)?) => {
        $(impl StrategyHint for $ty {
            fn strategy_hint(&self) -> Option<&str> {
                None
            }
        })*
    };
}

carries_hint!(
    AuthenticateResponse,
    PrepareStatementResponse,
    ExecuteStatementResponse,
    GetResultMetadataResponse,
    GetNextResultBatchResponse,
    StatusResponse,
    ClearResponse,
    CancelQueryResponse,
    ClearOrCancelQueryResponse,
    ExplainResponse,
    ExplainAnalyzeResponse,
    DryRunResponse,
);

no_hint!(
    GetSchemaNamesResponse,
    GetTablesResponse,
    GetColumnsResponse,
    AddCatalogsResponse,
    GetAddCatalogsResponse,
    GetCatalogesResponse,
    RefreshCatalogsResponse,
    SetPropsResponse,
    UpdateUsersResponse,
);

/// Unary client over a tonic channel.
pub mod engine_client {
    use tonic::codec::ProstCodec;
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::transport::Channel;

    use super::*;

    macro_rules! unary_method {
        ($name:ident, $rpc:literal, $req:ty, $resp:ty) => {
            pub async fn $name(
                &self,
                request: tonic::Request<$req>,
            ) -> Result<tonic::Response<$resp>, tonic::Status> {
                self.unary(concat!("/", "QueryEngineService", "/", $rpc), request)
                    .await
            }
        };
    }

    /// Client for the engine's query service.
    #[derive(Clone, Debug)]
    pub struct QueryEngineClient {
        inner: tonic::client::Grpc<Channel>,
    }

    impl QueryEngineClient {
        pub fn new(channel: Channel) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel),
            }
        }

        /// Client with explicit per-message size caps.
        pub fn with_message_limits(channel: Channel, max_inbound: usize, max_outbound: usize) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel)
                    .max_decoding_message_size(max_inbound)
                    .max_encoding_message_size(max_outbound),
            }
        }

        async fn unary<Req, Resp>(
            &self,
            path: &'static str,
            request: tonic::Request<Req>,
        ) -> Result<tonic::Response<Resp>, tonic::Status>
        where
            Req: prost::Message + 'static,
            Resp: prost::Message + Default + 'static,
        {
            let mut grpc = self.inner.clone();
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("channel not ready: {e}")))?;
            let codec: ProstCodec<Req, Resp> = ProstCodec::default();
            grpc.unary(request, PathAndQuery::from_static(path), codec)
                .await
        }

        unary_method!(authenticate, "authenticate", AuthenticateRequest, AuthenticateResponse);
        unary_method!(prepare_statement, "prepareStatement", PrepareStatementRequest, PrepareStatementResponse);
        unary_method!(prepare_statement_v2, "prepareStatementV2", PrepareStatementV2Request, PrepareStatementResponse);
        unary_method!(execute_statement, "executeStatement", ExecuteStatementRequest, ExecuteStatementResponse);
        unary_method!(execute_statement_v2, "executeStatementV2", ExecuteStatementV2Request, ExecuteStatementResponse);
        unary_method!(get_result_metadata, "getResultMetadata", GetResultMetadataRequest, GetResultMetadataResponse);
        unary_method!(get_next_result_batch, "getNextResultBatch", GetNextResultBatchRequest, GetNextResultBatchResponse);
        unary_method!(status, "status", StatusRequest, StatusResponse);
        unary_method!(clear, "clear", ClearRequest, ClearResponse);
        unary_method!(cancel_query, "cancelQuery", CancelQueryRequest, CancelQueryResponse);
        unary_method!(clear_or_cancel_query, "clearOrCancelQuery", ClearOrCancelQueryRequest, ClearOrCancelQueryResponse);
        unary_method!(explain, "explain", ExplainRequest, ExplainResponse);
        unary_method!(explain_analyze, "explainAnalyze", ExplainAnalyzeRequest, ExplainAnalyzeResponse);
        unary_method!(dry_run, "dryRun", DryRunRequest, DryRunResponse);
        unary_method!(dry_run_v2, "dryRunV2", DryRunRequestV2, DryRunResponse);
        unary_method!(get_schema_names, "getSchemaNames", GetSchemaNamesRequest, GetSchemaNamesResponse);
        unary_method!(get_schema_names_v2, "getSchemaNamesV2", GetSchemaNamesV2Request, GetSchemaNamesResponse);
        unary_method!(get_tables, "getTables", GetTablesRequest, GetTablesResponse);
        unary_method!(get_tables_v2, "getTablesV2", GetTablesV2Request, GetTablesResponse);
        unary_method!(get_columns, "getColumns", GetColumnsRequest, GetColumnsResponse);
        unary_method!(get_columns_v2, "getColumnsV2", GetColumnsV2Request, GetColumnsResponse);
        unary_method!(add_catalogs, "addCatalogs", AddCatalogsRequest, AddCatalogsResponse);
        unary_method!(get_add_catalogs_response, "getAddCatalogsResponse", GetAddCatalogsRequest, GetAddCatalogsResponse);
        unary_method!(get_cataloges, "getCataloges", GetCatalogesRequest, GetCatalogesResponse);
        unary_method!(refresh_catalogs, "refreshCatalogs", RefreshCatalogsRequest, RefreshCatalogsResponse);
        unary_method!(set_props, "setProps", SetPropsRequest, SetPropsResponse);
        unary_method!(update_users, "updateUsers", UpdateUsersRequest, UpdateUsersResponse);
    }
}
