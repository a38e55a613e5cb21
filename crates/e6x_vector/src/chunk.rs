//! Columnar chunk model and decoding.
//!
//! A chunk is a batch of rows stored column-wise: a row count plus one
//! typed vector per column. Every vector carries a null set, a zone and
//! display format for temporal columns, and either one value per row or a
//! single scalar that projects across all rows (a constant vector).
//!
//! Decoding is two-pass: each vector is materialized into a column of
//! [`Value`]s in one sweep, then rows are assembled from the columns. A
//! cell the decoder cannot convert becomes null; nothing in here aborts a
//! chunk once decoding has started.
//!
//! The byte-level container understood by [`Chunk::from_bytes`] is a
//! compact big-endian layout: `size:i32, nvec:i32`, then per vector
//! `size:i32, type:u8, flags:u8 (bit 0 = constant), null set (count:i32 +
//! packed bits), zone:utf16, format:utf16, payload`. Payload shape is
//! chosen by the type tag and the constant flag; variable-length elements
//! are `u32`-length-prefixed.

use tracing::warn;

use crate::decimal::decimal_from_binary;
use crate::reader::{ByteReader, DecodeError};
use crate::temporal::{format_date, format_datetime};
use crate::value::Value;

/// Column type tags as the engine numbers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VectorType {
    Boolean = 0,
    Byte = 1,
    Short = 2,
    Integer = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    String = 7,
    TimestampTz = 8,
    Binary = 9,
    Array = 10,
    Map = 11,
    Struct = 12,
    Date = 13,
    Datetime = 14,
    Null = 15,
    Decimal128 = 16,
}

impl VectorType {
    pub fn from_tag(tag: i32) -> Option<Self> {
        use VectorType::*;
        Some(match tag {
            0 => Boolean,
            1 => Byte,
            2 => Short,
            3 => Integer,
            4 => Long,
            5 => Float,
            6 => Double,
            7 => String,
            8 => TimestampTz,
            9 => Binary,
            10 => Array,
            11 => Map,
            12 => Struct,
            13 => Date,
            14 => Datetime,
            15 => Null,
            16 => Decimal128,
            _ => return None,
        })
    }

    pub fn tag(self) -> i32 {
        self as i32
    }
}

/// Typed vector payload: one array variant per row-wise type plus the
/// scalar variants used by constant vectors.
#[derive(Clone, Debug, PartialEq)]
pub enum VectorData {
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Bool(Vec<bool>),
    Varchar(Vec<String>),
    Bytes(Vec<Vec<u8>>),
    /// Epoch microseconds for DATE columns.
    Date(Vec<i64>),
    /// Epoch microseconds for DATETIME columns.
    Time(Vec<i64>),
    /// Epoch microseconds plus a per-row zone for TIMESTAMP_TZ columns.
    TimeTz { micros: Vec<i64>, zones: Vec<String> },
    /// 16-byte Decimal128 encodings.
    Decimal(Vec<Vec<u8>>),
    ConstInt64(i64),
    ConstFloat64(f64),
    ConstBool(bool),
    ConstVarchar(String),
    ConstBytes(Vec<u8>),
    ConstDate(i64),
    ConstTime(i64),
    ConstTimeTz { micros: i64, zone: String },
    ConstDecimal(Vec<u8>),
    /// NULL-typed vectors carry no payload.
    Empty,
}

/// One column of a chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct Vector {
    pub size: i32,
    pub vector_type: VectorType,
    /// True when `data` holds a single scalar projected across all rows.
    pub constant: bool,
    /// Null set. Length 1 (or 0) for constant vectors.
    pub nulls: Vec<bool>,
    pub zone: String,
    pub format: String,
    pub data: VectorData,
}

impl Vector {
    /// Null test honoring the constant-vector encoding.
    pub fn is_null(&self, row: usize) -> bool {
        if self.constant {
            self.nulls.first().copied().unwrap_or(false)
        } else {
            self.nulls.get(row).copied().unwrap_or(false)
        }
    }
}

/// A columnar batch of rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub size: i32,
    pub vectors: Vec<Vector>,
}

/// Project a chunk into row tuples.
///
/// Row `i` holds one value per vector, in vector order. An empty chunk
/// yields no rows without touching any payload.
pub fn decode_chunk(chunk: &Chunk) -> Vec<Vec<Value>> {
    if chunk.size <= 0 {
        return Vec::new();
    }
    let rows = chunk.size as usize;
    let columns: Vec<Vec<Value>> = chunk
        .vectors
        .iter()
        .map(|v| decode_column(v, rows))
        .collect();
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut tuple = Vec::with_capacity(columns.len());
        for column in &columns {
            tuple.push(column[row].clone());
        }
        out.push(tuple);
    }
    out
}

/// Fill a column by projecting either the constant scalar or the per-row
/// array across `rows` entries, honoring the null set.
fn project<T, F>(vector: &Vector, rows: usize, fetch: F) -> Vec<Value>
where
    F: Fn(usize) -> Option<T>,
    T: Into<Value>,
{
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        if vector.is_null(row) {
            out.push(Value::Null);
        } else {
            out.push(fetch(row).map(Into::into).unwrap_or(Value::Null));
        }
    }
    out
}

fn all_nulls(rows: usize) -> Vec<Value> {
    vec![Value::Null; rows]
}

fn mismatch(vector: &Vector, rows: usize) -> Vec<Value> {
    warn!(
        vector_type = ?vector.vector_type,
        "vector payload does not match its declared type, column decodes as null"
    );
    all_nulls(rows)
}

/// Materialize one vector into row values.
pub fn decode_column(vector: &Vector, rows: usize) -> Vec<Value> {
    use VectorData as D;
    use VectorType as T;

    match (vector.vector_type, &vector.data) {
        (T::Long, D::Int64(data)) => project(vector, rows, |i| data.get(i).map(|v| Value::Int(*v))),
        (T::Long | T::Integer, D::ConstInt64(v)) => {
            let value = Value::Int(*v);
            project(vector, rows, |_| Some(value.clone()))
        }
        (T::Integer, D::Int32(data)) => {
            project(vector, rows, |i| data.get(i).map(|v| Value::Int(i64::from(*v))))
        }
        (T::Double, D::Float64(data)) => {
            project(vector, rows, |i| data.get(i).map(|v| Value::Float(*v)))
        }
        (T::Float, D::Float32(data)) => {
            project(vector, rows, |i| data.get(i).map(|v| Value::Float(f64::from(*v))))
        }
        (T::Double | T::Float, D::ConstFloat64(v)) => {
            let value = Value::Float(*v);
            project(vector, rows, |_| Some(value.clone()))
        }
        (T::Boolean, D::Bool(data)) => {
            project(vector, rows, |i| data.get(i).map(|v| Value::Boolean(*v)))
        }
        (T::Boolean, D::ConstBool(v)) => {
            let value = Value::Boolean(*v);
            project(vector, rows, |_| Some(value.clone()))
        }
        (T::String | T::Array | T::Map | T::Struct, D::Varchar(data)) => {
            project(vector, rows, |i| data.get(i).map(|v| Value::Str(v.clone())))
        }
        (T::String | T::Array | T::Map | T::Struct, D::ConstVarchar(v)) => {
            let value = Value::Str(v.clone());
            project(vector, rows, |_| Some(value.clone()))
        }
        (T::Binary, D::Bytes(data)) => {
            project(vector, rows, |i| data.get(i).map(|v| Value::Bytes(v.clone())))
        }
        (T::Binary, D::ConstBytes(v)) => {
            let value = Value::Bytes(v.clone());
            project(vector, rows, |_| Some(value.clone()))
        }
        (T::Date, D::Date(data)) => project(vector, rows, |i| {
            data.get(i)
                .and_then(|micros| format_date(*micros, &vector.zone))
                .map(Value::Str)
        }),
        (T::Date, D::ConstDate(micros)) => {
            let value = format_date(*micros, &vector.zone).map(Value::Str);
            project(vector, rows, |_| value.clone())
        }
        (T::Datetime, D::Time(data)) => project(vector, rows, |i| {
            data.get(i)
                .and_then(|micros| format_datetime(*micros, &vector.zone))
                .map(Value::Str)
        }),
        (T::Datetime, D::ConstTime(micros)) => {
            let value = format_datetime(*micros, &vector.zone).map(Value::Str);
            project(vector, rows, |_| value.clone())
        }
        (T::TimestampTz, D::TimeTz { micros, zones }) => project(vector, rows, |i| {
            let micros = micros.get(i)?;
            let zone = zones.get(i).map(String::as_str).unwrap_or(&vector.zone);
            format_datetime(*micros, zone).map(Value::Str)
        }),
        (T::TimestampTz, D::ConstTimeTz { micros, zone }) => {
            let value = format_datetime(*micros, zone).map(Value::Str);
            project(vector, rows, |_| value.clone())
        }
        (T::Decimal128, D::Decimal(data)) => project(vector, rows, |i| {
            data.get(i)
                .and_then(|raw| decimal_from_binary(raw))
                .map(Value::Decimal)
        }),
        (T::Decimal128, D::ConstDecimal(raw)) => {
            let value = decimal_from_binary(raw).map(Value::Decimal);
            project(vector, rows, |_| value.clone())
        }
        (T::Null, _) => all_nulls(rows),
        // SHORT and BYTE columns only travel through the metadata stream.
        (T::Short | T::Byte, _) => mismatch(vector, rows),
        _ => mismatch(vector, rows),
    }
}

impl Chunk {
    /// Parse a chunk from its wire container.
    pub fn from_bytes(bytes: &[u8]) -> Result<Chunk, DecodeError> {
        let mut r = ByteReader::new(bytes);
        let size = r.read_i32()?;
        let nvec = read_count(&mut r)?;
        let mut vectors = Vec::with_capacity(nvec.min(1024));
        for _ in 0..nvec {
            vectors.push(read_vector(&mut r)?);
        }
        Ok(Chunk { size, vectors })
    }

    /// Serialize a chunk into its wire container.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_i32(&mut buf, self.size);
        write_i32(&mut buf, self.vectors.len() as i32);
        for vector in &self.vectors {
            write_vector(&mut buf, vector);
        }
        buf
    }
}

fn read_count(r: &mut ByteReader<'_>) -> Result<usize, DecodeError> {
    let count = r.read_i32()?;
    usize::try_from(count).map_err(|_| DecodeError::InvalidCount(count))
}

fn read_packed_bools(r: &mut ByteReader<'_>) -> Result<Vec<bool>, DecodeError> {
    let count = read_count(r)?;
    let raw = r.take(count.div_ceil(8))?;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        out.push(raw[i >> 3] & (1 << (i & 7)) != 0);
    }
    Ok(out)
}

fn read_i64_array(r: &mut ByteReader<'_>) -> Result<Vec<i64>, DecodeError> {
    let count = read_count(r)?;
    let mut out = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        out.push(r.read_i64()?);
    }
    Ok(out)
}

fn read_string_array(r: &mut ByteReader<'_>) -> Result<Vec<String>, DecodeError> {
    let count = read_count(r)?;
    let mut out = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        out.push(r.read_long_utf()?);
    }
    Ok(out)
}

fn read_bytes_array(r: &mut ByteReader<'_>) -> Result<Vec<Vec<u8>>, DecodeError> {
    let count = read_count(r)?;
    let mut out = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        out.push(r.read_long_bytes()?.to_vec());
    }
    Ok(out)
}

const FLAG_CONSTANT: u8 = 0b0000_0001;

fn read_vector(r: &mut ByteReader<'_>) -> Result<Vector, DecodeError> {
    let size = r.read_i32()?;
    let tag = i32::from(r.read_u8()?);
    let vector_type = VectorType::from_tag(tag).ok_or(DecodeError::UnknownTag {
        what: "vector type",
        value: tag,
    })?;
    let flags = r.read_u8()?;
    let constant = flags & FLAG_CONSTANT != 0;
    let nulls = read_packed_bools(r)?;
    let zone = r.read_utf()?;
    let format = r.read_utf()?;

    use VectorData as D;
    use VectorType as T;
    let data = match (vector_type, constant) {
        (T::Long, false) => D::Int64(read_i64_array(r)?),
        (T::Long | T::Integer, true) => D::ConstInt64(r.read_i64()?),
        (T::Integer, false) => {
            let count = read_count(r)?;
            let mut out = Vec::with_capacity(count.min(1 << 20));
            for _ in 0..count {
                out.push(r.read_i32()?);
            }
            D::Int32(out)
        }
        (T::Double, false) => {
            let count = read_count(r)?;
            let mut out = Vec::with_capacity(count.min(1 << 20));
            for _ in 0..count {
                out.push(r.read_f64()?);
            }
            D::Float64(out)
        }
        (T::Float, false) => {
            let count = read_count(r)?;
            let mut out = Vec::with_capacity(count.min(1 << 20));
            for _ in 0..count {
                out.push(r.read_f32()?);
            }
            D::Float32(out)
        }
        (T::Double | T::Float, true) => D::ConstFloat64(r.read_f64()?),
        (T::Boolean, false) => {
            let count = read_count(r)?;
            let mut out = Vec::with_capacity(count.min(1 << 20));
            for _ in 0..count {
                out.push(r.read_bool()?);
            }
            D::Bool(out)
        }
        (T::Boolean, true) => D::ConstBool(r.read_bool()?),
        (T::String | T::Array | T::Map | T::Struct, false) => D::Varchar(read_string_array(r)?),
        (T::String | T::Array | T::Map | T::Struct, true) => D::ConstVarchar(r.read_long_utf()?),
        (T::Binary, false) => D::Bytes(read_bytes_array(r)?),
        (T::Binary, true) => D::ConstBytes(r.read_long_bytes()?.to_vec()),
        (T::Date, false) => D::Date(read_i64_array(r)?),
        (T::Date, true) => D::ConstDate(r.read_i64()?),
        (T::Datetime, false) => D::Time(read_i64_array(r)?),
        (T::Datetime, true) => D::ConstTime(r.read_i64()?),
        (T::TimestampTz, false) => D::TimeTz {
            micros: read_i64_array(r)?,
            zones: read_string_array(r)?,
        },
        (T::TimestampTz, true) => D::ConstTimeTz {
            micros: r.read_i64()?,
            zone: r.read_long_utf()?,
        },
        (T::Decimal128, false) => D::Decimal(read_bytes_array(r)?),
        (T::Decimal128, true) => D::ConstDecimal(r.read_long_bytes()?.to_vec()),
        (T::Null, _) => D::Empty,
        (T::Short | T::Byte, _) => {
            return Err(DecodeError::UnknownTag {
                what: "vector type",
                value: tag,
            })
        }
    };

    Ok(Vector {
        size,
        vector_type,
        constant,
        nulls,
        zone,
        format,
        data,
    })
}

fn write_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn write_short_utf(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn write_long_bytes(buf: &mut Vec<u8>, raw: &[u8]) {
    buf.extend_from_slice(&(raw.len() as u32).to_be_bytes());
    buf.extend_from_slice(raw);
}

fn write_packed_bools(buf: &mut Vec<u8>, bits: &[bool]) {
    write_i32(buf, bits.len() as i32);
    let mut packed = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            packed[i >> 3] |= 1 << (i & 7);
        }
    }
    buf.extend_from_slice(&packed);
}

fn write_i64_array(buf: &mut Vec<u8>, data: &[i64]) {
    write_i32(buf, data.len() as i32);
    for v in data {
        buf.extend_from_slice(&v.to_be_bytes());
    }
}

fn write_string_array(buf: &mut Vec<u8>, data: &[String]) {
    write_i32(buf, data.len() as i32);
    for s in data {
        write_long_bytes(buf, s.as_bytes());
    }
}

fn write_vector(buf: &mut Vec<u8>, vector: &Vector) {
    write_i32(buf, vector.size);
    buf.push(vector.vector_type.tag() as u8);
    buf.push(if vector.constant { FLAG_CONSTANT } else { 0 });
    write_packed_bools(buf, &vector.nulls);
    write_short_utf(buf, &vector.zone);
    write_short_utf(buf, &vector.format);

    use VectorData as D;
    match &vector.data {
        D::Int64(data) | D::Date(data) | D::Time(data) => write_i64_array(buf, data),
        D::Int32(data) => {
            write_i32(buf, data.len() as i32);
            for v in data {
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
        D::Float64(data) => {
            write_i32(buf, data.len() as i32);
            for v in data {
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
        D::Float32(data) => {
            write_i32(buf, data.len() as i32);
            for v in data {
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
        D::Bool(data) => {
            write_i32(buf, data.len() as i32);
            for v in data {
                buf.push(u8::from(*v));
            }
        }
        D::Varchar(data) => write_string_array(buf, data),
        D::Bytes(data) | D::Decimal(data) => {
            write_i32(buf, data.len() as i32);
            for raw in data {
                write_long_bytes(buf, raw);
            }
        }
        D::TimeTz { micros, zones } => {
            write_i64_array(buf, micros);
            write_string_array(buf, zones);
        }
        D::ConstInt64(v) | D::ConstDate(v) | D::ConstTime(v) => {
            buf.extend_from_slice(&v.to_be_bytes())
        }
        D::ConstFloat64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        D::ConstBool(v) => buf.push(u8::from(*v)),
        D::ConstVarchar(v) => write_long_bytes(buf, v.as_bytes()),
        D::ConstBytes(v) | D::ConstDecimal(v) => write_long_bytes(buf, v),
        D::ConstTimeTz { micros, zone } => {
            buf.extend_from_slice(&micros.to_be_bytes());
            write_long_bytes(buf, zone.as_bytes());
        }
        D::Empty => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    fn plain_vector(vector_type: VectorType, size: i32, nulls: Vec<bool>, data: VectorData) -> Vector {
        Vector {
            size,
            vector_type,
            constant: false,
            nulls,
            zone: String::new(),
            format: String::new(),
            data,
        }
    }

    fn const_vector(vector_type: VectorType, size: i32, nulls: Vec<bool>, data: VectorData) -> Vector {
        Vector {
            constant: true,
            ..plain_vector(vector_type, size, nulls, data)
        }
    }

    #[test]
    fn mixed_nulls_and_constant_vector_project_together() {
        let chunk = Chunk {
            size: 3,
            vectors: vec![
                plain_vector(
                    VectorType::Long,
                    3,
                    vec![false, true, false],
                    VectorData::Int64(vec![7, 8, 9]),
                ),
                const_vector(
                    VectorType::String,
                    3,
                    vec![false],
                    VectorData::ConstVarchar("x".to_string()),
                ),
            ],
        };
        let rows = decode_chunk(&chunk);
        assert_eq!(
            rows,
            vec![
                vec![Value::Int(7), Value::Str("x".to_string())],
                vec![Value::Null, Value::Str("x".to_string())],
                vec![Value::Int(9), Value::Str("x".to_string())],
            ]
        );
    }

    #[test]
    fn empty_chunk_yields_no_rows() {
        let chunk = Chunk {
            size: 0,
            vectors: vec![plain_vector(
                VectorType::Long,
                0,
                vec![],
                VectorData::Int64(vec![]),
            )],
        };
        assert!(decode_chunk(&chunk).is_empty());
    }

    #[test]
    fn row_and_column_counts_match_the_chunk() {
        let chunk = Chunk {
            size: 4,
            vectors: vec![
                plain_vector(
                    VectorType::Integer,
                    4,
                    vec![false; 4],
                    VectorData::Int32(vec![1, 2, 3, 4]),
                ),
                plain_vector(
                    VectorType::Double,
                    4,
                    vec![false; 4],
                    VectorData::Float64(vec![0.5, 1.5, 2.5, 3.5]),
                ),
            ],
        };
        let rows = decode_chunk(&chunk);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn all_null_vector_ignores_payload_entirely() {
        // Payload is too short for the row count; the null set covers every
        // row so it must never be consulted.
        let chunk = Chunk {
            size: 3,
            vectors: vec![plain_vector(
                VectorType::Long,
                3,
                vec![true, true, true],
                VectorData::Int64(vec![]),
            )],
        };
        let rows = decode_chunk(&chunk);
        assert!(rows.iter().all(|row| row[0] == Value::Null));
    }

    #[test]
    fn constant_null_vector_projects_null_everywhere() {
        let chunk = Chunk {
            size: 2,
            vectors: vec![const_vector(
                VectorType::Long,
                2,
                vec![true],
                VectorData::ConstInt64(42),
            )],
        };
        assert_eq!(
            decode_chunk(&chunk),
            vec![vec![Value::Null], vec![Value::Null]]
        );
    }

    #[test]
    fn constant_datetime_formats_once_and_projects() {
        let micros = 1_614_834_367_123_000i64;
        let mut vector = const_vector(
            VectorType::Datetime,
            2,
            vec![false],
            VectorData::ConstTime(micros),
        );
        vector.zone = "UTC".to_string();
        let chunk = Chunk {
            size: 2,
            vectors: vec![vector],
        };
        let rows = decode_chunk(&chunk);
        assert_eq!(rows[0][0], Value::Str("2021-03-04T05:06:07.123+00:00".to_string()));
        assert_eq!(rows[0][0], rows[1][0]);
    }

    #[test]
    fn timestamp_tz_uses_per_row_zones() {
        let micros = 1_614_900_600_000_000i64; // 2021-03-04T23:30:00Z
        let vector = plain_vector(
            VectorType::TimestampTz,
            2,
            vec![false, false],
            VectorData::TimeTz {
                micros: vec![micros, micros],
                zones: vec!["UTC".to_string(), "+05:30".to_string()],
            },
        );
        let rows = decode_chunk(&Chunk {
            size: 2,
            vectors: vec![vector],
        });
        assert_eq!(rows[0][0], Value::Str("2021-03-04T23:30:00.000+00:00".to_string()));
        assert_eq!(rows[1][0], Value::Str("2021-03-05T05:00:00.000+05:30".to_string()));
    }

    #[test]
    fn decimal_column_decodes_binary_payloads() {
        let mut raw = [0u8; 16];
        // biased exponent 6176, continuation 25 => 25.
        let bits: u128 = (6176u128 << 113) | 25;
        raw.copy_from_slice(&bits.to_be_bytes());
        let vector = plain_vector(
            VectorType::Decimal128,
            2,
            vec![false, false],
            VectorData::Decimal(vec![raw.to_vec(), vec![0u8; 16]]),
        );
        let rows = decode_chunk(&Chunk {
            size: 2,
            vectors: vec![vector],
        });
        assert_eq!(rows[0][0], Value::Decimal(BigDecimal::from_str("25").unwrap()));
        assert_eq!(rows[1][0], Value::Decimal(BigDecimal::from_str("0").unwrap()));
    }

    #[test]
    fn mismatched_payload_decodes_column_as_null() {
        let vector = plain_vector(
            VectorType::Long,
            2,
            vec![false, false],
            VectorData::Float64(vec![1.0, 2.0]),
        );
        let rows = decode_chunk(&Chunk {
            size: 2,
            vectors: vec![vector],
        });
        assert!(rows.iter().all(|row| row[0] == Value::Null));
    }

    #[test]
    fn container_round_trips_every_payload_shape() {
        let chunk = Chunk {
            size: 2,
            vectors: vec![
                plain_vector(
                    VectorType::Long,
                    2,
                    vec![false, true],
                    VectorData::Int64(vec![1, 2]),
                ),
                const_vector(
                    VectorType::String,
                    2,
                    vec![false],
                    VectorData::ConstVarchar("hello".to_string()),
                ),
                plain_vector(
                    VectorType::Binary,
                    2,
                    vec![false, false],
                    VectorData::Bytes(vec![vec![0xde, 0xad], vec![]]),
                ),
                plain_vector(
                    VectorType::TimestampTz,
                    2,
                    vec![false, false],
                    VectorData::TimeTz {
                        micros: vec![0, 1],
                        zones: vec!["UTC".to_string(), "+05:30".to_string()],
                    },
                ),
                plain_vector(
                    VectorType::Boolean,
                    2,
                    vec![false, false],
                    VectorData::Bool(vec![true, false]),
                ),
            ],
        };
        let decoded = Chunk::from_bytes(&chunk.to_bytes()).unwrap();
        assert_eq!(decoded, chunk);
    }

    #[test]
    fn container_rejects_unknown_vector_tags() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.push(200); // no such tag
        buf.push(0);
        let err = Chunk::from_bytes(&buf).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownTag {
                what: "vector type",
                value: 200
            }
        );
    }
}
