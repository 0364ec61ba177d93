//! Presentation-side controller for one table view.
//!
//! A [`TableView`] owns the current table selection, the connection target,
//! the render target and at most one in-flight request. It lives in a
//! [`Registry`] on the presentation thread; background requests only carry its
//! [`Handle`], and [`deliver`] resolves that handle when a completion arrives.
//! A view that was torn down in the meantime simply isn't found.
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::ConnectionTarget,
    protocol::{
        Completion, Executor, PendingRequest, ProtocolError, QueryRequest, RequestId,
        RequestState, ResponseEnvelope, TransportError,
    },
    registry::{Handle, Registry},
    render::{NO_VALID_RESPONSE, Presenter, Table, render},
};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug)]
pub struct TableView<P> {
    handle: Handle,
    target: ConnectionTarget,
    table: Table,
    presenter: P,
    in_flight: Option<PendingRequest>,
}

impl<P: Presenter> TableView<P> {
    pub fn new(handle: Handle, target: ConnectionTarget, table: Table, presenter: P) -> Self {
        Self {
            handle,
            target,
            table,
            presenter,
            in_flight: None,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Phase of the in-flight request, or `Idle`.
    pub fn state(&self) -> RequestState {
        self.in_flight
            .as_ref()
            .map_or(RequestState::Idle, PendingRequest::phase)
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(PendingRequest::id)
    }

    /// Sends `request`, replacing any request already in flight for this view.
    pub fn submit<E>(
        &mut self,
        request: QueryRequest,
        executor: &mut Executor<E>,
    ) -> Result<RequestId, ViewError>
    where
        E: From<Completion> + Send + 'static,
    {
        let bytes = request.encode()?;

        if let Some(previous) = self.in_flight.take() {
            info!("replacing in-flight request {}", previous.id());
            previous.cancel();
        }

        let pending = executor.submit(self.handle, &self.target, bytes)?;
        let id = pending.id();
        debug!("{:?} {} -> request {id}", request.kind(), request.table());
        self.in_flight = Some(pending);
        Ok(id)
    }

    /// Selects every row of the current table.
    pub fn refresh<E>(&mut self, executor: &mut Executor<E>) -> Result<RequestId, ViewError>
    where
        E: From<Completion> + Send + 'static,
    {
        self.submit(QueryRequest::select(self.table.name()), executor)
    }

    /// Switches to the other table and refreshes.
    pub fn toggle_table<E>(&mut self, executor: &mut Executor<E>) -> Result<RequestId, ViewError>
    where
        E: From<Completion> + Send + 'static,
    {
        self.table = self.table.toggle();
        info!("switched to table {}", self.table);
        self.refresh(executor)
    }

    /// Cancels the in-flight request without rendering anything. Returns
    /// whether there was one.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(pending) => {
                info!("request {} cancelled", pending.id());
                pending.cancel();
                true
            }
            None => false,
        }
    }

    /// Handles the completion of this view's in-flight request and returns its
    /// terminal state. Completions of replaced or cancelled requests are
    /// dropped and return `None`.
    pub fn complete(&mut self, completion: Completion) -> Option<RequestState> {
        if self.in_flight() != Some(completion.request) {
            debug!("dropping stale completion of request {}", completion.request);
            return None;
        }
        self.in_flight = None;

        let bytes = match completion.outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                self.presenter.render_error(&e.to_string());
                return Some(RequestState::Failed);
            }
        };

        match ResponseEnvelope::decode(&bytes) {
            Ok(envelope) => {
                render(&envelope, self.table.headers(), &mut self.presenter);
                Some(RequestState::Completed)
            }
            Err(e) => {
                warn!("request {}: {e}", completion.request);
                self.presenter
                    .render_error(&format!("{NO_VALID_RESPONSE} ({e})"));
                Some(RequestState::Failed)
            }
        }
    }
}

/// Routes a completion to its requester, if that requester is still live.
pub fn deliver<P: Presenter>(
    views: &mut Registry<TableView<P>>,
    completion: Completion,
) -> Option<RequestState> {
    match views.get_mut(completion.requester) {
        Some(view) => view.complete(completion),
        None => {
            debug!(
                "requester {} is gone, dropping completion of request {}",
                completion.requester, completion.request
            );
            None
        }
    }
}
