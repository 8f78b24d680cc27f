//! Canonical JSON bytes for trace digests.
//!
//! Two traces that describe the same search must hash identically no matter
//! how their `serde_json::Value` maps were built. The writer therefore:
//!
//! 1. sorts object keys by byte order,
//! 2. emits no whitespace,
//! 3. escapes strings per RFC 8259 §7 (non-ASCII passes through as UTF-8),
//! 4. accepts integers only. Float formatting is platform-sensitive, so
//!    evaluation values are carried in traces as their `Debug` rendering.

use std::io::Write;

use serde_json::{Map, Number, Value};

/// Failure to canonicalize a JSON value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonError {
    /// A JSON number was not an integer (float, NaN, Infinity).
    #[error("non-integer number in canonical JSON: {raw}")]
    NonIntegerNumber { raw: String },
}

/// Produce canonical JSON bytes from a `serde_json::Value`.
///
/// # Errors
///
/// Returns [`CanonError::NonIntegerNumber`] if any number in `value` is not
/// representable as `i64` or `u64`.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, CanonError> {
    let mut writer = CanonicalWriter::default();
    writer.value(value)?;
    Ok(writer.finish())
}

#[derive(Default)]
struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn value(&mut self, value: &Value) -> Result<(), CanonError> {
        match value {
            Value::Null => self.buf.extend_from_slice(b"null"),
            Value::Bool(true) => self.buf.extend_from_slice(b"true"),
            Value::Bool(false) => self.buf.extend_from_slice(b"false"),
            Value::Number(n) => self.number(n)?,
            Value::String(s) => self.string(s),
            Value::Array(items) => {
                self.buf.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(b',');
                    }
                    self.value(item)?;
                }
                self.buf.push(b']');
            }
            Value::Object(map) => self.object(map)?,
        }
        Ok(())
    }

    fn object(&mut self, map: &Map<String, Value>) -> Result<(), CanonError> {
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        self.buf.push(b'{');
        for (i, (key, item)) in entries.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(b',');
            }
            self.string(key);
            self.buf.push(b':');
            self.value(item)?;
        }
        self.buf.push(b'}');
        Ok(())
    }

    fn number(&mut self, n: &Number) -> Result<(), CanonError> {
        // Writing into a Vec cannot fail.
        if let Some(i) = n.as_i64() {
            let _ = write!(self.buf, "{i}");
        } else if let Some(u) = n.as_u64() {
            let _ = write!(self.buf, "{u}");
        } else {
            return Err(CanonError::NonIntegerNumber { raw: n.to_string() });
        }
        Ok(())
    }

    fn string(&mut self, s: &str) {
        self.buf.push(b'"');
        for ch in s.chars() {
            match ch {
                '"' => self.buf.extend_from_slice(b"\\\""),
                '\\' => self.buf.extend_from_slice(b"\\\\"),
                '\n' => self.buf.extend_from_slice(b"\\n"),
                '\r' => self.buf.extend_from_slice(b"\\r"),
                '\t' => self.buf.extend_from_slice(b"\\t"),
                c if c < '\u{0020}' => {
                    let _ = write!(self.buf, "\\u{:04x}", u32::from(c));
                }
                c => {
                    let mut utf8 = [0u8; 4];
                    self.buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                }
            }
        }
        self.buf.push(b'"');
    }
}
