use serde_json::{Map, Value};
use thiserror::Error;

/// Ordered cell values of one result row. Width is whatever the server sent.
pub type Row = Vec<Value>;

/// Reasons a response or request cannot be (de)serialized.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed response: {0}")]
    Parse(serde_json::Error),

    #[error("malformed response: top-level value is not an object")]
    NotAnObject,

    #[error("malformed response: missing 'success' field")]
    MissingSuccess,

    #[error("malformed response: 'success' is not a boolean")]
    InvalidSuccess,

    #[error("malformed response: 'payload' is not an array of rows")]
    InvalidPayload,

    #[error("failed to encode request: {0}")]
    Encode(serde_json::Error),
}

/// Decoded server reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub payload: Option<Vec<Row>>,
    pub message: Option<String>,
}

impl ResponseEnvelope {
    /// Decodes the raw bytes received before the server closed the
    /// connection.
    ///
    /// `success` is mandatory and must be a boolean. `payload` must be an
    /// array of arrays when present; `null` counts as absent. The server's
    /// `error_msg` is accepted in place of `message`.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(raw).map_err(ProtocolError::Parse)?;
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let success = match object.remove("success") {
            Some(Value::Bool(success)) => success,
            Some(_) => return Err(ProtocolError::InvalidSuccess),
            None => return Err(ProtocolError::MissingSuccess),
        };

        let payload = match object.remove("payload") {
            None | Some(Value::Null) => None,
            Some(Value::Array(rows)) => Some(
                rows.into_iter()
                    .map(|row| match row {
                        Value::Array(cells) => Ok(cells),
                        _ => Err(ProtocolError::InvalidPayload),
                    })
                    .collect::<Result<Vec<Row>, _>>()?,
            ),
            Some(_) => return Err(ProtocolError::InvalidPayload),
        };

        Ok(Self {
            success,
            payload,
            message: take_message(&mut object),
        })
    }
}

fn take_message(object: &mut Map<String, Value>) -> Option<String> {
    ["message", "error_msg"]
        .into_iter()
        .find_map(|key| match object.remove(key) {
            Some(Value::String(text)) => Some(text),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
}
