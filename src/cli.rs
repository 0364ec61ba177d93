//! CLI utilities for the terminal client.
//!
//! The terminal client is a single-threaded event loop. Three producers feed
//! one channel of [`Event`]s: the stdin reader thread, the Ctrl-C handler and
//! the request threads of the [`Executor`]. The loop owns the only
//! [`TableView`] and hands every event to [`Session::handle`].
use std::{
    io::{self, BufRead, Write},
    sync::mpsc,
    thread,
};

use log::{debug, info};

use crate::{
    Command, CommandError,
    config::ConnectionTarget,
    protocol::{Completion, Executor},
    registry::{Handle, Registry},
    render::{Presenter, Table},
    view::{TableView, ViewError, deliver},
};

/// Everything the presentation loop reacts to.
#[derive(Debug)]
pub enum Event {
    Input(Command),
    InputError(CommandError),
    Interrupt,
    Completion(Completion),
}

impl From<Completion> for Event {
    fn from(value: Completion) -> Self {
        Event::Completion(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Prompt user for a command. End of input reads as [`Command::Exit`].
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<Command, CommandError>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "> ")?;
    writer.flush()?;

    if reader.read_line(&mut s)? == 0 {
        return Ok(Command::Exit);
    }

    s.as_str().try_into()
}

/// Reads commands from stdin on a background thread until end of input.
pub fn spawn_input(events: mpsc::Sender<Event>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            loop {
                let event = match prompt(io::stdin().lock(), io::stdout()) {
                    Ok(Command::Exit) => {
                        let _ = events.send(Event::Input(Command::Exit));
                        break;
                    }
                    Ok(command) => Event::Input(command),
                    Err(CommandError::Io(e)) => {
                        debug!("stdin closed: {e}");
                        let _ = events.send(Event::Input(Command::Exit));
                        break;
                    }
                    Err(e) => Event::InputError(e),
                };

                if events.send(event).is_err() {
                    break;
                }
            }
        })
}

/// State of the terminal client's presentation loop.
pub struct Session<P> {
    views: Registry<TableView<P>>,
    view: Handle,
    executor: Executor<Event>,
    closing: bool,
}

impl<P: Presenter> Session<P> {
    pub fn new(
        target: ConnectionTarget,
        table: Table,
        presenter: P,
        events: mpsc::Sender<Event>,
    ) -> Self {
        let mut views = Registry::new();
        let view = views.insert_with(|handle| TableView::new(handle, target, table, presenter));

        Self {
            views,
            view,
            executor: Executor::new(events),
            closing: false,
        }
    }

    pub fn view(&self) -> Option<&TableView<P>> {
        self.views.get(self.view)
    }

    /// Loads the initial table.
    pub fn start(&mut self) -> Flow {
        self.handle(Event::Input(Command::Refresh))
    }

    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Completion(completion) => {
                if let Some(state) = deliver(&mut self.views, completion) {
                    debug!("request finished: {state:?}");
                }
            }
            Event::Input(command) => self.command(command),
            Event::InputError(e) => {
                if let Some(view) = self.views.get_mut(self.view) {
                    view.presenter_mut().render_error(&e.to_string());
                }
            }
            Event::Interrupt => {
                let cancelled = self
                    .views
                    .get_mut(self.view)
                    .is_some_and(|view| view.cancel());
                if !cancelled {
                    info!("interrupted while idle, exiting");
                    return Flow::Exit;
                }
            }
        }

        match self.views.get(self.view) {
            Some(view) if self.closing && view.in_flight().is_none() => Flow::Exit,
            Some(_) => Flow::Continue,
            None => Flow::Exit,
        }
    }

    fn command(&mut self, command: Command) {
        let Some(view) = self.views.get_mut(self.view) else {
            return;
        };

        let submitted: Result<_, ViewError> = match command {
            Command::Exit => {
                self.closing = true;
                return;
            }
            Command::Cancel => {
                view.cancel();
                return;
            }
            Command::Refresh => view.refresh(&mut self.executor),
            Command::Toggle => view.toggle_table(&mut self.executor),
            Command::Statement(statement) => {
                let request = statement.into_request(view.table());
                view.submit(request, &mut self.executor)
            }
        };

        if let Err(e) = submitted {
            view.presenter_mut().render_error(&e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        time::Duration,
    };

    use crate::{
        protocol::{QueryKind, QueryRequest, TERMINATOR},
        render::{Display, Screen},
    };

    use super::*;

    #[test]
    fn prompt_prints_correctly() {
        let input = b".exit\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).unwrap();

        let output = String::from_utf8(output).expect("not valid UTF-8");
        assert_eq!("> ", output);
    }

    #[test]
    fn prompt_end_of_input_is_exit() {
        let command = prompt(&b""[..], Vec::new()).unwrap();
        assert_eq!(command, Command::Exit);
    }

    #[test]
    #[should_panic(expected = "unrecognized command '.something_wrong'")]
    fn prompt_unrecognized_command() {
        let input = b".something_wrong\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).map_err(|e| e.to_string()).unwrap();
    }

    /// Serves `replies.len()` connections in order and returns the requests.
    fn serve(
        replies: Vec<&'static [u8]>,
    ) -> (ConnectionTarget, thread::JoinHandle<Vec<QueryRequest>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = ConnectionTarget::new("127.0.0.1", i64::from(port)).unwrap();

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 64];
                while !request.ends_with(TERMINATOR) {
                    let n = stream.read(&mut buf).unwrap();
                    request.extend_from_slice(&buf[..n]);
                }
                requests.push(QueryRequest::from_wire(&request).unwrap());
                stream.write_all(reply).unwrap();
            }
            requests
        });

        (target, handle)
    }

    fn next_completion(rx: &mpsc::Receiver<Event>) -> Event {
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, Event::Completion(_)));
        event
    }

    #[test]
    fn session_runs_commands_in_order() {
        let (target, server) = serve(vec![
            &br#"{"success":true,"payload":[[1,"Ann",2020,"A1",1200]]}"#[..],
            &br#"{"success":true,"message":"deleted"}"#[..],
            &br#"{"success":true,"payload":[]}"#[..],
        ]);
        let (tx, rx) = mpsc::channel();
        let mut session = Session::new(target, Table::Students, Screen::default(), tx);

        assert_eq!(session.start(), Flow::Continue);
        session.handle(next_completion(&rx));
        let view = session.view().unwrap();
        assert!(matches!(
            view.presenter().display(),
            Display::Table { rows, .. } if rows.len() == 1
        ));

        let delete: Command = "delete student_id 1".try_into().unwrap();
        session.handle(Event::Input(delete));
        session.handle(next_completion(&rx));
        assert_eq!(
            session.view().unwrap().presenter().display(),
            &Display::Message("deleted".into())
        );

        session.handle(Event::Input(Command::Toggle));
        session.handle(Event::Input(Command::Exit));
        assert_eq!(session.handle(next_completion(&rx)), Flow::Exit);

        let requests = server.join().unwrap();
        assert_eq!(
            requests.iter().map(|r| (r.kind(), r.table())).collect::<Vec<_>>(),
            vec![
                (QueryKind::Select, "students"),
                (QueryKind::Delete, "students"),
                (QueryKind::Select, "professors"),
            ]
        );
    }

    #[test]
    fn interrupt_when_idle_exits() {
        let target = ConnectionTarget::new("127.0.0.1", 9).unwrap();
        let (tx, _rx) = mpsc::channel();
        let mut session = Session::new(target, Table::Students, Screen::default(), tx);

        assert_eq!(session.handle(Event::Interrupt), Flow::Exit);
    }

    #[test]
    fn input_errors_are_rendered() {
        let target = ConnectionTarget::new("127.0.0.1", 9).unwrap();
        let (tx, _rx) = mpsc::channel();
        let mut session = Session::new(target, Table::Students, Screen::default(), tx);

        let err = <&str as TryInto<Command>>::try_into("update 1").unwrap_err();
        assert_eq!(session.handle(Event::InputError(err)), Flow::Continue);
        assert!(matches!(
            session.view().unwrap().presenter().display(),
            Display::Error(text) if text.contains("update 1")
        ));
    }
}
