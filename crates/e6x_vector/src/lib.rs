//! Decoding for the e6x engine's columnar result formats.
//!
//! The engine delivers query results in two shapes: a fixed-width big-endian
//! metadata stream that describes the result set and can carry per-row
//! values (`metadata`), and a self-describing columnar chunk of typed
//! vectors (`chunk`). This crate turns both into row-oriented [`Value`]
//! tuples with the engine's null, constant-vector, temporal and decimal
//! semantics. It performs no I/O and holds no state.

pub mod chunk;
pub mod decimal;
pub mod metadata;
pub mod reader;
pub mod temporal;
pub mod value;

pub use chunk::{decode_chunk, Chunk, Vector, VectorData, VectorType};
pub use metadata::{read_result_metadata, read_rows, FieldInfo};
pub use reader::{ByteReader, DecodeError};
pub use value::Value;

/// Cell rendered when a typed value in the metadata stream cannot be parsed.
pub const PARSE_FAILURE_SENTINEL: &str = "Failed to parse.";
