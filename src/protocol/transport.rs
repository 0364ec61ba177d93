use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{debug, trace};
use thiserror::Error;

use crate::config::ConnectionTarget;

/// Size of each read from the socket while accumulating a response.
pub const CHUNK_SIZE: usize = 256;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("request cancelled")]
    Cancelled,
}

/// Cancellation signal shared between a request's owner and the thread
/// performing its I/O.
///
/// Cancelling sets a flag the read loop checks between chunks and shuts
/// down the attached socket, so a read blocked inside the kernel returns.
#[derive(Debug, Default)]
pub struct Cancellation {
    cancelled: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);

        let guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stream) = guard.as_ref() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("force-close on cancel failed: {e}");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Registers the connection so [`Cancellation::cancel`] can force-close it.
    /// Fails if the request was cancelled while connecting.
    pub fn attach(&self, stream: &TcpStream) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        *guard = Some(stream.try_clone()?);
        Ok(())
    }

    pub fn detach(&self) {
        self.stream.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Opens a fresh connection to `target`. Connections are never reused.
pub fn connect(target: &ConnectionTarget) -> Result<TcpStream, TransportError> {
    TcpStream::connect((target.host(), target.port())).map_err(|source| {
        TransportError::Connect {
            target: target.to_string(),
            source,
        }
    })
}

pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self { stream }
    }

    pub fn write_request(&mut self, request: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(request)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Reads until the peer closes the stream.
    ///
    /// Responses carry no length or terminator, so end-of-stream is the only
    /// frame boundary. The cancellation flag is checked before every chunk and
    /// again on end-of-stream, since a force-closed socket also reads as EOF.
    pub fn read_response(&mut self, cancel: &Cancellation) -> Result<Vec<u8>, TransportError> {
        let mut response = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            match self.stream.read(&mut chunk) {
                Ok(0) if cancel.is_cancelled() => return Err(TransportError::Cancelled),
                Ok(0) => return Ok(response),
                Ok(n) => {
                    trace!("received {n} bytes");
                    response.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) if cancel.is_cancelled() => return Err(TransportError::Cancelled),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
