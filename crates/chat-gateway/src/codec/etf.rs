//! Erlang External Term Format.
//!
//! Terms map onto JSON values: binaries and strings become strings, lists and
//! tuples become arrays, maps become objects, and the atoms `nil`, `true` and
//! `false` become null and booleans. Other atoms become strings.

use std::io::Read;

use flate2::read::ZlibDecoder;
use serde_json::{Map, Number, Value};

use crate::error::CodecError;

pub const FORMAT_VERSION: u8 = 131;

const NEW_FLOAT_EXT: u8 = 70;
const COMPRESSED: u8 = 80;
const SMALL_INTEGER_EXT: u8 = 97;
const INTEGER_EXT: u8 = 98;
const FLOAT_EXT: u8 = 99;
const ATOM_EXT: u8 = 100;
const SMALL_TUPLE_EXT: u8 = 104;
const LARGE_TUPLE_EXT: u8 = 105;
const NIL_EXT: u8 = 106;
const STRING_EXT: u8 = 107;
const LIST_EXT: u8 = 108;
const BINARY_EXT: u8 = 109;
const SMALL_BIG_EXT: u8 = 110;
const LARGE_BIG_EXT: u8 = 111;
const SMALL_ATOM_EXT: u8 = 115;
const MAP_EXT: u8 = 116;
const ATOM_UTF8_EXT: u8 = 118;
const SMALL_ATOM_UTF8_EXT: u8 = 119;

const MAX_DEPTH: usize = 256;
/// Largest inflated size a compressed term may declare
const MAX_INFLATED: usize = 16 * 1024 * 1024;

// =========================================================================
// Encoding
// =========================================================================

/// Encode a value as a versioned ETF term
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    out.push(FORMAT_VERSION);
    encode_term(value, &mut out);
    out
}

fn encode_term(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => encode_atom("nil", out),
        Value::Bool(true) => encode_atom("true", out),
        Value::Bool(false) => encode_atom("false", out),
        Value::Number(n) => encode_number(n, out),
        Value::String(s) => encode_binary(s.as_bytes(), out),
        Value::Array(items) => {
            if items.is_empty() {
                out.push(NIL_EXT);
                return;
            }
            out.push(LIST_EXT);
            out.extend_from_slice(&(items.len() as u32).to_be_bytes());
            for item in items {
                encode_term(item, out);
            }
            out.push(NIL_EXT);
        }
        Value::Object(map) => {
            out.push(MAP_EXT);
            out.extend_from_slice(&(map.len() as u32).to_be_bytes());
            for (key, item) in map {
                encode_binary(key.as_bytes(), out);
                encode_term(item, out);
            }
        }
    }
}

fn encode_atom(name: &str, out: &mut Vec<u8>) {
    out.push(SMALL_ATOM_EXT);
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
}

fn encode_binary(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(BINARY_EXT);
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn encode_number(n: &Number, out: &mut Vec<u8>) {
    if let Some(v) = n.as_u64() {
        if let Ok(small) = u8::try_from(v) {
            out.push(SMALL_INTEGER_EXT);
            out.push(small);
        } else if let Ok(int) = i32::try_from(v) {
            out.push(INTEGER_EXT);
            out.extend_from_slice(&int.to_be_bytes());
        } else {
            encode_big(v, false, out);
        }
    } else if let Some(v) = n.as_i64() {
        if let Ok(int) = i32::try_from(v) {
            out.push(INTEGER_EXT);
            out.extend_from_slice(&int.to_be_bytes());
        } else {
            encode_big(v.unsigned_abs(), v < 0, out);
        }
    } else {
        out.push(NEW_FLOAT_EXT);
        out.extend_from_slice(&n.as_f64().unwrap_or_default().to_be_bytes());
    }
}

fn encode_big(magnitude: u64, negative: bool, out: &mut Vec<u8>) {
    let bytes = magnitude.to_le_bytes();
    let len = bytes.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1);
    out.push(SMALL_BIG_EXT);
    out.push(len as u8);
    out.push(u8::from(negative));
    out.extend_from_slice(&bytes[..len]);
}

// =========================================================================
// Decoding
// =========================================================================

/// Decode a versioned ETF term
pub fn decode(data: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader { data, pos: 0 };
    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(CodecError::Etf(format!("unsupported version {version}")));
    }
    let value = reader.term(0)?;
    if reader.pos != data.len() {
        return Err(CodecError::Etf("trailing bytes after term".to_string()));
    }
    Ok(value)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn term(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::Etf("term nested too deeply".to_string()));
        }

        let tag = self.u8()?;
        match tag {
            SMALL_INTEGER_EXT => Ok(Value::from(self.u8()?)),
            INTEGER_EXT => Ok(Value::from(self.u32()? as i32)),
            NEW_FLOAT_EXT => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                float(f64::from_be_bytes(raw))
            }
            FLOAT_EXT => {
                let raw = self.take(31)?;
                let text = String::from_utf8_lossy(raw);
                let parsed = text
                    .trim_end_matches('\0')
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| CodecError::Etf(e.to_string()))?;
                float(parsed)
            }
            ATOM_EXT | ATOM_UTF8_EXT => {
                let len = self.u16()? as usize;
                Ok(atom(self.take(len)?))
            }
            SMALL_ATOM_EXT | SMALL_ATOM_UTF8_EXT => {
                let len = self.u8()? as usize;
                Ok(atom(self.take(len)?))
            }
            SMALL_TUPLE_EXT => {
                let arity = self.u8()? as usize;
                self.sequence(arity, depth).map(Value::Array)
            }
            LARGE_TUPLE_EXT => {
                let arity = self.u32()? as usize;
                self.sequence(arity, depth).map(Value::Array)
            }
            NIL_EXT => Ok(Value::Array(Vec::new())),
            STRING_EXT => {
                let len = self.u16()? as usize;
                let bytes = self.take(len)?;
                Ok(match std::str::from_utf8(bytes) {
                    Ok(s) => Value::String(s.to_string()),
                    Err(_) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
                })
            }
            LIST_EXT => {
                let len = self.u32()? as usize;
                let mut items = self.sequence(len, depth)?;
                match self.term(depth + 1)? {
                    Value::Array(tail) if tail.is_empty() => {}
                    improper => items.push(improper),
                }
                Ok(Value::Array(items))
            }
            BINARY_EXT => {
                let len = self.u32()? as usize;
                Ok(Value::String(String::from_utf8_lossy(self.take(len)?).into_owned()))
            }
            SMALL_BIG_EXT => {
                let len = self.u8()? as usize;
                self.big(len)
            }
            LARGE_BIG_EXT => {
                let len = self.u32()? as usize;
                self.big(len)
            }
            MAP_EXT => {
                let arity = self.u32()? as usize;
                let mut map = Map::new();
                for _ in 0..arity {
                    let key = match self.term(depth + 1)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    let value = self.term(depth + 1)?;
                    map.insert(key, value);
                }
                Ok(Value::Object(map))
            }
            COMPRESSED => {
                let size = self.u32()? as usize;
                if size > MAX_INFLATED {
                    return Err(CodecError::Etf(format!(
                        "compressed term declares {size} bytes"
                    )));
                }
                let compressed = &self.data[self.pos..];
                let mut inflated = Vec::with_capacity(size);
                ZlibDecoder::new(compressed)
                    .take(size as u64 + 1)
                    .read_to_end(&mut inflated)
                    .map_err(|e| CodecError::Inflate(e.to_string()))?;
                self.pos = self.data.len();
                if inflated.len() != size {
                    return Err(CodecError::Etf("compressed term size mismatch".to_string()));
                }
                let mut inner = Reader {
                    data: &inflated,
                    pos: 0,
                };
                inner.term(depth + 1)
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    fn sequence(&mut self, len: usize, depth: usize) -> Result<Vec<Value>, CodecError> {
        // Each element takes at least one byte
        if len > self.data.len().saturating_sub(self.pos) {
            return Err(CodecError::UnexpectedEof);
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.term(depth + 1)?);
        }
        Ok(items)
    }

    fn big(&mut self, len: usize) -> Result<Value, CodecError> {
        let negative = self.u8()? != 0;
        let digits = self.take(len)?;
        if len > 16 {
            return Err(CodecError::Etf(format!("integer of {len} bytes too large")));
        }
        let magnitude = digits
            .iter()
            .rev()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));

        let value = if negative {
            match i64::try_from(magnitude) {
                Ok(m) => Value::from(-m),
                Err(_) => Value::String(format!("-{magnitude}")),
            }
        } else {
            match u64::try_from(magnitude) {
                Ok(m) => Value::from(m),
                Err(_) => Value::String(magnitude.to_string()),
            }
        };
        Ok(value)
    }
}

fn atom(bytes: &[u8]) -> Value {
    match bytes {
        b"nil" | b"null" => Value::Null,
        b"true" => Value::Bool(true),
        b"false" => Value::Bool(false),
        other => Value::String(String::from_utf8_lossy(other).into_owned()),
    }
}

fn float(value: f64) -> Result<Value, CodecError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| CodecError::Etf("non-finite float".to_string()))
}
