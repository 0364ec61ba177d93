//! Client side of the tabular query protocol.
//!
//! This module defines how the client talks to a tabular data server: the wire
//! format of requests and responses, the blocking TCP transport, and the
//! executor that runs each exchange off the presentation thread.
//!
//! # Wire Format
//!
//! Every exchange uses a fresh TCP connection carrying exactly one request and
//! one response:
//!
//! - The request is a flat JSON object (`type`, `table`, request-specific
//!   fields), ASCII only, followed by `"\n\n"`. The server reads until it sees
//!   that marker.
//! - The response is a JSON object with a mandatory boolean `success`, an
//!   optional `payload` (array of rows, each an array of scalars) and an
//!   optional `message`. It has no length prefix and no terminator: the
//!   response is everything received until the server closes the connection.
//!
//! Because the server's close is the only frame boundary, a connection can
//! never carry a second request. The client does not time out; a server that
//! neither answers nor closes holds the request until it is cancelled.
//!
//! # Key Components
//!
//! - [`QueryRequest`]: Request builder and encoder.
//! - [`ResponseEnvelope`]: Decoded response.
//! - [`ProtocolTransport`]: Writes a request and reads a response over any `Read + Write`.
//! - [`Executor`]: Runs one request per thread and posts a [`Completion`] back.
//!
//! # See Also
//!
//! - [`view`](crate::view): Presentation-side consumer of completions.
mod executor;
mod request;
mod response;
mod transport;

pub use executor::{Completion, Executor, PendingRequest, RequestId, RequestState};
pub use request::{QueryKind, QueryRequest, TERMINATOR};
pub use response::{ProtocolError, ResponseEnvelope, Row};
pub use transport::{CHUNK_SIZE, Cancellation, ProtocolTransport, TransportError, connect};
