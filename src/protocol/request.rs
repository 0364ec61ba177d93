use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, ser::Formatter};

use super::ProtocolError;

/// End-of-message marker appended to every encoded request.
pub const TERMINATOR: &[u8] = b"\n\n";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Select,
    Insert,
    Delete,
}

/// A single query sent to the server.
///
/// On the wire this is one flat JSON object: `type`, `table`, and any
/// request-specific fields side by side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    #[serde(rename = "type")]
    kind: QueryKind,
    table: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl QueryRequest {
    pub fn new(kind: QueryKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            fields: Map::new(),
        }
    }

    /// Selects every row of `table`.
    pub fn select(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Select, table)
    }

    /// Selects rows of `table` where `column` equals `value`.
    pub fn select_where(table: impl Into<String>, column: &str, value: Value) -> Self {
        Self::select(table).with_field("payload", Value::Array(vec![column.into(), value]))
    }

    pub fn insert(table: impl Into<String>, row: Vec<Value>) -> Self {
        Self::new(QueryKind::Insert, table).with_field("payload", Value::Array(row))
    }

    pub fn delete(table: impl Into<String>, column: &str, value: Value) -> Self {
        Self::new(QueryKind::Delete, table)
            .with_field("payload", Value::Array(vec![column.into(), value]))
    }

    /// Adds a request-specific field. `type` and `table` are reserved.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "type" && key != "table" {
            self.fields.insert(key, value);
        }
        self
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Serializes the request as compact, ASCII-only JSON followed by
    /// [`TERMINATOR`].
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
        self.serialize(&mut serializer).map_err(ProtocolError::Encode)?;

        out.extend_from_slice(TERMINATOR);
        Ok(out)
    }

    /// Parses a framed request as produced by [`QueryRequest::encode`].
    pub fn from_wire(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let body = bytes.strip_suffix(TERMINATOR).unwrap_or(bytes);
        serde_json::from_slice(body).map_err(ProtocolError::Parse)
    }
}

/// Compact JSON formatter that escapes everything outside 7-bit ASCII.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;

        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }

            writer.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }

        writer.write_all(&bytes[start..])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_appends_terminator() {
        let bytes = QueryRequest::select("students").encode().unwrap();

        assert!(bytes.ends_with(b"\n\n"));
        assert!(!bytes[..bytes.len() - 2].contains(&b'\n'));
    }

    #[test]
    fn encode_is_flat_object() {
        let request = QueryRequest::delete("professors", "professor_id", json!(3));
        let bytes = request.encode().unwrap();
        let body: Value = serde_json::from_slice(&bytes[..bytes.len() - 2]).unwrap();

        assert_eq!(
            body,
            json!({"type": "delete", "table": "professors", "payload": ["professor_id", 3]})
        );
    }

    #[test]
    fn encode_is_ascii_only() {
        let request = QueryRequest::insert(
            "students",
            vec![json!(7), json!("Аня 😀"), json!("2020-09-01"), json!(2), json!(1200)],
        );
        let bytes = request.encode().unwrap();

        assert!(bytes.is_ascii());
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r"\u0410\u043d\u044f"));
        assert!(text.contains(r"\ud83d\ude00"));
    }

    #[test]
    fn wire_round_trip() {
        let requests = vec![
            QueryRequest::select("students"),
            QueryRequest::select_where("professors", "degree", json!("PhD")),
            QueryRequest::insert("students", vec![json!(1), json!("Зоя"), json!(null)]),
            QueryRequest::delete("students", "student_id", json!(1)),
            QueryRequest::select("students").with_field("limit", json!({"n": 2.5})),
        ];

        for request in requests {
            let decoded = QueryRequest::from_wire(&request.encode().unwrap()).unwrap();
            assert_eq!(decoded, request);
        }
    }

    #[test]
    fn reserved_fields_are_ignored() {
        let request = QueryRequest::select("students").with_field("table", json!("professors"));

        assert_eq!(request.table(), "students");
        assert!(request.field("table").is_none());
    }

    #[test]
    #[should_panic(expected = "Parse")]
    fn from_wire_requires_type() {
        QueryRequest::from_wire(br#"{"table":"students"}"#).unwrap();
    }
}
