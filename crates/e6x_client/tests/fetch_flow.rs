//! End-to-end statement flow against the mock engine: execute, result
//! metadata, chunked fetches decoded into row values, and the catalog and
//! introspection calls of the connection façade.

mod common;

use std::sync::Arc;

use common::{metadata_stream, test_config, MockEngine};
use e6x_client::{Connection, Error, StrategyCoordinator, Value};
use e6x_vector::{Chunk, Vector, VectorData, VectorType};

fn connection(engine: &Arc<MockEngine>) -> Arc<Connection> {
    Connection::with_engine(
        test_config(),
        engine.clone(),
        Arc::new(StrategyCoordinator::new(None)),
    )
}

fn sample_chunk() -> Vec<u8> {
    Chunk {
        size: 3,
        vectors: vec![
            Vector {
                size: 3,
                vector_type: VectorType::Long,
                constant: false,
                nulls: vec![false, true, false],
                zone: String::new(),
                format: String::new(),
                data: VectorData::Int64(vec![7, 8, 9]),
            },
            Vector {
                size: 3,
                vector_type: VectorType::String,
                constant: true,
                nulls: vec![false],
                zone: String::new(),
                format: String::new(),
                data: VectorData::ConstVarchar("x".to_string()),
            },
        ],
    }
    .to_bytes()
}

#[tokio::test]
async fn execute_fetch_decodes_rows_until_drained() {
    let engine = MockEngine::new();
    engine.set_result_metadata(metadata_stream(3, &[("id", "LONG"), ("tag", "STRING")]));
    engine.push_batch(sample_chunk());
    let conn = connection(&engine);

    let mut cursor = conn.cursor();
    cursor.execute("SELECT id, tag FROM t;").await.unwrap();
    assert_eq!(cursor.row_count().await.unwrap(), 3);
    let names: Vec<&str> = cursor.description().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "tag"]);

    let rows = cursor.fetch_all().await.unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::Int(7), Value::Str("x".to_string())],
            vec![Value::Null, Value::Str("x".to_string())],
            vec![Value::Int(9), Value::Str("x".to_string())],
        ]
    );

    // The result set is drained; further fetches stay local.
    assert_eq!(cursor.fetch_batch().await.unwrap(), None);
}

#[tokio::test]
async fn fetch_many_buffers_across_batches() {
    let engine = MockEngine::new();
    engine.set_result_metadata(metadata_stream(6, &[("id", "LONG"), ("tag", "STRING")]));
    engine.push_batch(sample_chunk());
    engine.push_batch(sample_chunk());
    let conn = connection(&engine);

    let mut cursor = conn.cursor();
    cursor.execute("SELECT id, tag FROM t").await.unwrap();

    let first = cursor.fetch_many(Some(2)).await.unwrap();
    assert_eq!(first.len(), 2);
    let second = cursor.fetch_many(Some(10)).await.unwrap();
    assert_eq!(second.len(), 4);
    assert_eq!(cursor.fetch_one().await.unwrap(), None);
}

#[tokio::test]
async fn status_explain_and_analyze_round_trip() {
    let engine = MockEngine::new();
    engine.set_result_metadata(metadata_stream(1, &[("id", "LONG")]));
    let conn = connection(&engine);

    let mut cursor = conn.cursor();
    cursor.execute("SELECT 1").await.unwrap();

    let status = cursor.status().await.unwrap();
    assert!(status.ready);
    assert_eq!(status.row_count, 1);

    assert_eq!(cursor.explain().await.unwrap(), "plan");
    let analysis = cursor.explain_analyze().await.unwrap();
    assert_eq!(analysis.planner, "plan");
    assert_eq!(analysis.parsing_time, 3);
    assert_eq!(analysis.queueing_time, 4);
}

#[tokio::test]
async fn cursor_without_a_statement_reports_no_active_query() {
    let engine = MockEngine::new();
    let conn = connection(&engine);
    let mut cursor = conn.cursor();
    assert!(matches!(
        cursor.fetch_batch().await,
        Err(Error::NoActiveQuery)
    ));
    assert!(matches!(cursor.status().await, Err(Error::NoActiveQuery)));
}

#[tokio::test]
async fn catalog_aware_connection_uses_v2_calls() {
    let engine = MockEngine::new();
    let conn = Connection::with_engine(
        test_config().catalog("glue"),
        engine.clone(),
        Arc::new(StrategyCoordinator::new(None)),
    );

    conn.get_schema_names().await.unwrap();
    conn.get_tables(None).await.unwrap();
    conn.get_columns(None, "orders").await.unwrap();

    assert_eq!(engine.calls_for("getSchemaNamesV2").len(), 1);
    assert_eq!(engine.calls_for("getTablesV2").len(), 1);
    assert_eq!(engine.calls_for("getColumnsV2").len(), 1);
    assert!(engine.calls_for("getSchemaNames").is_empty());

    let mut cursor = conn.cursor();
    cursor.execute("SELECT 1").await.unwrap();
    assert_eq!(engine.calls_for("prepareStatementV2").len(), 1);
    assert_eq!(engine.calls_for("executeStatementV2").len(), 1);
}

#[tokio::test]
async fn plain_connection_uses_v1_calls() {
    let engine = MockEngine::new();
    let conn = connection(&engine);

    conn.get_schema_names().await.unwrap();
    conn.get_tables(Some("main")).await.unwrap();
    conn.get_columns(Some("main"), "orders").await.unwrap();

    assert_eq!(engine.calls_for("getSchemaNames").len(), 1);
    assert_eq!(engine.calls_for("getTables").len(), 1);
    assert_eq!(engine.calls_for("getColumns").len(), 1);
    assert!(engine.calls_for("getSchemaNamesV2").is_empty());
}

#[tokio::test]
async fn catalog_load_failures_come_back_as_data() {
    let engine = MockEngine::new();
    let conn = connection(&engine);

    assert_eq!(conn.add_catalogs("{}").await.unwrap(), "submitted");
    let result = conn.get_add_catalogs_result().await.unwrap();
    assert_eq!(result.status, "done");
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].name, "legacy");

    let catalogs = conn.get_catalogs().await.unwrap();
    assert_eq!(catalogs.len(), 1);
    assert!(catalogs[0].is_default);
}

#[tokio::test]
async fn closed_connection_refuses_work() {
    let engine = MockEngine::new();
    let conn = connection(&engine);
    conn.close();
    assert!(matches!(
        conn.get_schema_names().await,
        Err(Error::ConnectionClosed)
    ));
    let err = conn.cursor().execute("SELECT 1").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed), "got {err:?}");
}

#[tokio::test]
async fn dry_run_and_props_round_trip() {
    let engine = MockEngine::new();
    let conn = connection(&engine);
    assert_eq!(conn.dry_run("SELECT 1").await.unwrap(), "ok");
    conn.set_props("{\"cache\":false}").await.unwrap();
    assert_eq!(engine.calls_for("dryRun").len(), 1);
    assert_eq!(engine.calls_for("setProps").len(), 1);
}

#[tokio::test]
async fn clear_forgets_the_query_registration() {
    let engine = MockEngine::new();
    engine.set_result_metadata(metadata_stream(0, &[("id", "LONG")]));
    let coordinator = Arc::new(StrategyCoordinator::new(None));
    let conn = Connection::with_engine(test_config(), engine.clone(), coordinator.clone());

    let mut cursor = conn.cursor();
    cursor.execute("SELECT 1").await.unwrap();
    assert_eq!(coordinator.snapshot().queries_in_flight, 1);
    cursor.clear().await.unwrap();
    assert_eq!(coordinator.snapshot().queries_in_flight, 0);
    assert_eq!(engine.calls_for("clear").len(), 1);
}
