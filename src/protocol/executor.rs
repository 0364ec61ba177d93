use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
        mpsc,
    },
    thread,
};

use log::{debug, info, warn};

use crate::{config::ConnectionTarget, registry::Handle};

use super::transport::{self, Cancellation, ProtocolTransport, TransportError};

pub type RequestId = u64;

/// Lifecycle of one request.
///
/// `Idle -> Sending -> AwaitingResponse -> {Completed | Failed | Cancelled}`;
/// the owning view returns to `Idle` once the terminal state is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Sending,
    AwaitingResponse,
    Completed,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl From<RequestState> for u8 {
    fn from(value: RequestState) -> Self {
        match value {
            RequestState::Idle => 0,
            RequestState::Sending => 1,
            RequestState::AwaitingResponse => 2,
            RequestState::Completed => 3,
            RequestState::Failed => 4,
            RequestState::Cancelled => 5,
        }
    }
}

impl From<u8> for RequestState {
    fn from(value: u8) -> Self {
        match value {
            1 => RequestState::Sending,
            2 => RequestState::AwaitingResponse,
            3 => RequestState::Completed,
            4 => RequestState::Failed,
            5 => RequestState::Cancelled,
            _ => RequestState::Idle,
        }
    }
}

/// Terminal result of a request that was not cancelled, addressed to the
/// requester that submitted it.
#[derive(Debug)]
pub struct Completion {
    pub requester: Handle,
    pub request: RequestId,
    pub outcome: Result<Vec<u8>, TransportError>,
}

#[derive(Debug)]
struct Shared {
    cancel: Cancellation,
    phase: AtomicU8,
}

impl Shared {
    fn set_phase(&self, state: RequestState) {
        self.phase.store(state.into(), Ordering::SeqCst);
    }

    fn phase(&self) -> RequestState {
        self.phase.load(Ordering::SeqCst).into()
    }
}

/// Cancellable handle to a request running on its own thread.
///
/// Dropping the handle detaches the request; it keeps running and still
/// delivers its completion.
pub struct PendingRequest {
    id: RequestId,
    shared: Arc<Shared>,
    thread: thread::JoinHandle<()>,
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .finish()
    }
}

impl PendingRequest {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn phase(&self) -> RequestState {
        self.shared.phase()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Requests cancellation and force-closes the connection. The request
    /// thread exits without delivering anything.
    pub fn cancel(&self) {
        debug!("cancelling request {}", self.id);
        self.shared.cancel.cancel();
    }

    /// Blocks until the request thread exits and returns its terminal state.
    pub fn join(self) -> RequestState {
        if self.thread.join().is_err() {
            warn!("request {} thread panicked", self.id);
            return RequestState::Failed;
        }
        self.shared.phase()
    }
}

/// Runs each request on a dedicated thread and posts completions to the
/// presentation context through `events`.
#[derive(Debug)]
pub struct Executor<E> {
    events: mpsc::Sender<E>,
    next_id: RequestId,
}

impl<E> Executor<E>
where
    E: From<Completion> + Send + 'static,
{
    pub fn new(events: mpsc::Sender<E>) -> Self {
        Self { events, next_id: 1 }
    }

    /// Sends `request` to `target` on a new connection and reads the response
    /// until the server closes it.
    pub fn submit(
        &mut self,
        requester: Handle,
        target: &ConnectionTarget,
        request: Vec<u8>,
    ) -> Result<PendingRequest, TransportError> {
        let id = self.next_id;
        self.next_id += 1;

        let shared = Arc::new(Shared {
            cancel: Cancellation::new(),
            phase: AtomicU8::new(RequestState::Sending.into()),
        });

        let events = self.events.clone();
        let target = target.clone();
        let worker = Arc::clone(&shared);

        let thread = thread::Builder::new()
            .name(format!("request-{id}"))
            .spawn(move || {
                let outcome = exchange(&target, &request, &worker);
                worker.cancel.detach();

                let outcome = match outcome {
                    _ if worker.cancel.is_cancelled() => {
                        worker.set_phase(RequestState::Cancelled);
                        debug!("request {id} cancelled, nothing to deliver");
                        return;
                    }
                    Ok(bytes) => {
                        info!("request {id} received {} bytes from {target}", bytes.len());
                        worker.set_phase(RequestState::Completed);
                        Ok(bytes)
                    }
                    Err(e) => {
                        warn!("request {id} to {target} failed: {e}");
                        worker.set_phase(RequestState::Failed);
                        Err(e)
                    }
                };

                let completion = Completion {
                    requester,
                    request: id,
                    outcome,
                };
                if events.send(completion.into()).is_err() {
                    debug!("request {id} finished after the presentation context closed");
                }
            })?;

        debug!("submitted request {id} for requester {requester}");
        Ok(PendingRequest { id, shared, thread })
    }
}

fn exchange(
    target: &ConnectionTarget,
    request: &[u8],
    shared: &Shared,
) -> Result<Vec<u8>, TransportError> {
    if shared.cancel.is_cancelled() {
        return Err(TransportError::Cancelled);
    }

    let stream = transport::connect(target)?;
    shared.cancel.attach(&stream)?;

    let mut transport = ProtocolTransport::new(stream);
    transport.write_request(request)?;

    shared.set_phase(RequestState::AwaitingResponse);
    transport.read_response(&shared.cancel)
}
