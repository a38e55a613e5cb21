//! Result-metadata stream decoding.
//!
//! The engine describes a result set with a fixed-width big-endian stream:
//! a row count, a field count, and per field four length-prefixed strings
//! (name, type, zone, format). Batch responses append one record per row,
//! each cell written as a presence byte followed by the typed value. A cell
//! that cannot be parsed renders as the textual sentinel instead of failing
//! the batch.

use crate::decimal::decimal_from_text;
use crate::reader::{ByteReader, DecodeError};
use crate::temporal::{format_date, format_datetime, format_int96};
use crate::value::Value;
use crate::PARSE_FAILURE_SENTINEL;

/// Description of one result column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    name: String,
    field_type: String,
    zone: String,
    format: String,
}

impl FieldInfo {
    pub fn new(
        name: impl Into<String>,
        field_type: impl Into<String>,
        zone: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            zone: zone.into(),
            format: format.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    /// Zone applies to temporal columns only.
    pub fn zone(&self) -> Option<&str> {
        match self.field_type.as_str() {
            "DATE" | "DATETIME" => Some(&self.zone),
            _ => None,
        }
    }

    /// Display format applies to temporal columns only.
    pub fn format(&self) -> Option<&str> {
        match self.field_type.as_str() {
            "DATE" | "DATETIME" => Some(&self.format),
            _ => None,
        }
    }
}

/// Decode the metadata header: row count and column descriptions.
pub fn read_result_metadata(bytes: &[u8]) -> Result<(i64, Vec<FieldInfo>), DecodeError> {
    let mut r = ByteReader::new(bytes);
    let row_count = r.read_i64()?;
    let field_count = r.read_i32()?;
    let mut fields = Vec::with_capacity(field_count.max(0) as usize);
    for _ in 0..field_count {
        let name = r.read_utf()?;
        let field_type = r.read_utf()?;
        let zone = r.read_utf()?;
        let format = r.read_utf()?;
        fields.push(FieldInfo::new(name, field_type, zone, format));
    }
    Ok((row_count, fields))
}

/// Metadata-stream values are rendered in UTC.
const STREAM_ZONE: &str = "UTC";

fn read_cell(field: &FieldInfo, r: &mut ByteReader<'_>) -> Result<Value, DecodeError> {
    let value = match field.field_type() {
        "LONG" | "BIGINT" => Value::Int(r.read_i64()?),
        "INT" | "INTEGER" => Value::Int(i64::from(r.read_i32()?)),
        "SHORT" | "SMALLINT" => Value::Int(i64::from(r.read_i16()?)),
        "BYTE" | "TINYINT" => Value::Int(i64::from(r.read_i8()?)),
        "DOUBLE" => Value::Float(r.read_f64()?),
        "FLOAT" => Value::Float(f64::from(r.read_f32()?)),
        "BOOLEAN" => Value::Boolean(r.read_bool()?),
        "CHAR" => {
            let code = r.read_u16()?;
            match char::from_u32(u32::from(code)) {
                Some(c) => Value::Str(c.to_string()),
                None => return Err(DecodeError::InvalidUtf8),
            }
        }
        "STRING" | "ARRAY" | "MAP" | "STRUCT" | "VARCHAR" => Value::Str(r.read_utf()?),
        "BINARY" => Value::Bytes(r.read_short_bytes()?.to_vec()),
        "DATE" => {
            let micros = r.read_i64()?;
            match format_date(micros, STREAM_ZONE) {
                Some(s) => Value::Str(s),
                None => Value::Str(PARSE_FAILURE_SENTINEL.to_string()),
            }
        }
        "DATETIME" => {
            let micros = r.read_i64()?;
            match format_datetime(micros, STREAM_ZONE) {
                Some(s) => Value::Str(s),
                None => Value::Str(PARSE_FAILURE_SENTINEL.to_string()),
            }
        }
        "INT96" => {
            let julian_day = r.read_i32()?;
            let nanos = r.read_i64()?;
            match format_int96(julian_day, nanos) {
                Some(s) => Value::Str(s),
                None => Value::Str(PARSE_FAILURE_SENTINEL.to_string()),
            }
        }
        "DECIMAL" | "DECIMAL128" => Value::Decimal(decimal_from_text(r.read_short_bytes()?)),
        other => return Err(DecodeError::UnknownFieldType(other.to_string())),
    };
    Ok(value)
}

/// Decode one row record: a presence byte then the typed value per field.
///
/// Parse failures yield the sentinel cell and the row keeps going, so a bad
/// cell never aborts the batch.
pub fn read_row_values(fields: &[FieldInfo], r: &mut ByteReader<'_>) -> Vec<Value> {
    let mut row = Vec::with_capacity(fields.len());
    for field in fields {
        let present = match r.read_i8() {
            Ok(present) => present,
            Err(_) => {
                row.push(Value::Str(PARSE_FAILURE_SENTINEL.to_string()));
                continue;
            }
        };
        if present == 0 {
            row.push(Value::Null);
            continue;
        }
        match read_cell(field, r) {
            Ok(value) => row.push(value),
            Err(err) => {
                tracing::debug!(field = field.name(), %err, "cell parse failed");
                row.push(Value::Str(PARSE_FAILURE_SENTINEL.to_string()));
            }
        }
    }
    row
}

/// Decode every row record remaining in `bytes`.
pub fn read_rows(fields: &[FieldInfo], bytes: &[u8]) -> Vec<Vec<Value>> {
    let mut r = ByteReader::new(bytes);
    let mut rows = Vec::new();
    while !r.is_empty() {
        rows.push(read_row_values(fields, &mut r));
    }
    rows
}
