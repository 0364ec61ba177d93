//! Response-driven rendering of query results.
//!
//! The renderer decides, from a decoded [`ResponseEnvelope`] alone, whether the
//! user sees a table, an informational message, or a failure status, and drives
//! a [`Presenter`] accordingly. Column headers do not come from the server: they
//! come from the static schema of the table the controller currently shows,
//! which is passed in explicitly.
//!
//! Every [`Presenter`] call is a full replacement of what was displayed before,
//! so rendering the same response twice leaves the same screen.
//!
//! # Example
//! ```rust
//! use tabview::{ResponseEnvelope, Table};
//! use tabview::render::{Display, Screen, render};
//!
//! let envelope = ResponseEnvelope::decode(br#"{"success":true,"payload":[[1,"Ann"]]}"#).unwrap();
//! let mut screen = Screen::default();
//! render(&envelope, Table::Students.headers(), &mut screen);
//!
//! match screen.display() {
//!     Display::Table { headers, rows } => {
//!         assert_eq!(headers.len(), 5);
//!         assert_eq!(rows, &vec![vec!["1".to_string(), "Ann".to_string()]]);
//!     }
//!     other => panic!("unexpected display {other:?}"),
//! }
//! ```
use std::{fmt, io::Write, str::FromStr};

use log::{debug, warn};
use serde_json::Value;

use crate::protocol::ResponseEnvelope;

pub const NO_VALID_RESPONSE: &str = "No valid response from server";
pub const SERVER_FAILURE: &str = "server reported failure";
pub const DEFAULT_ACK: &str = "Success";

const STUDENT_HEADERS: &[&str] = &["id", "Name", "Enrollment", "Group", "Stipend"];
const PROFESSOR_HEADERS: &[&str] = &["id", "Name", "Department", "Degree", "Salary"];
const UNKNOWN_HEADERS: &[&str] = &["ERROR"];

/// Tables the client knows how to display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Table {
    #[default]
    Students,
    Professors,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Students => "students",
            Table::Professors => "professors",
        }
    }

    pub fn headers(self) -> &'static [&'static str] {
        schema(self.name())
    }

    pub fn toggle(self) -> Self {
        match self {
            Table::Students => Table::Professors,
            Table::Professors => Table::Students,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "students" => Ok(Table::Students),
            "professors" => Ok(Table::Professors),
            other => Err(format!("unknown table '{other}'")),
        }
    }
}

/// Column headers for a table name. Unknown tables get a single `ERROR`
/// column.
pub fn schema(table: &str) -> &'static [&'static str] {
    match table {
        "students" => STUDENT_HEADERS,
        "professors" => PROFESSOR_HEADERS,
        _ => UNKNOWN_HEADERS,
    }
}

/// Render target supplied by the presentation layer.
pub trait Presenter {
    /// Replaces the display with a header row followed by data rows.
    fn render(&mut self, headers: &[String], rows: &[Vec<String>]);
    /// Replaces the display with an informational status.
    fn render_message(&mut self, text: &str);
    /// Replaces the display with a failure status.
    fn render_error(&mut self, text: &str);
}

/// Default scalar-to-text conversion for a cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turns a decoded envelope into display instructions for `presenter`.
///
/// Rows are rendered as sent; a row wider or narrower than `schema` is not
/// padded or truncated.
pub fn render<P: Presenter + ?Sized>(
    envelope: &ResponseEnvelope,
    schema: &[&str],
    presenter: &mut P,
) {
    if !envelope.success {
        let text = match &envelope.message {
            Some(message) => format!("{NO_VALID_RESPONSE}: {SERVER_FAILURE} ({message})"),
            None => format!("{NO_VALID_RESPONSE}: {SERVER_FAILURE}"),
        };
        presenter.render_error(&text);
        return;
    }

    let Some(payload) = &envelope.payload else {
        presenter.render_message(envelope.message.as_deref().unwrap_or(DEFAULT_ACK));
        return;
    };

    let headers = schema.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let rows = payload
        .iter()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    if rows.iter().any(|row| row.len() != headers.len()) {
        debug!("rendering rows whose width differs from {} headers", headers.len());
    }
    presenter.render(&headers, &rows);
}

/// What a [`Screen`] currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Blank,
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Message(String),
    Error(String),
}

/// In-memory presenter that keeps only the latest display.
#[derive(Debug, Clone, Default)]
pub struct Screen {
    display: Display,
    renders: usize,
}

impl Screen {
    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Number of presenter calls received so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    fn replace(&mut self, display: Display) {
        self.display = display;
        self.renders += 1;
    }
}

impl Presenter for Screen {
    fn render(&mut self, headers: &[String], rows: &[Vec<String>]) {
        self.replace(Display::Table {
            headers: headers.to_vec(),
            rows: rows.to_vec(),
        });
    }

    fn render_message(&mut self, text: &str) {
        self.replace(Display::Message(text.to_string()));
    }

    fn render_error(&mut self, text: &str) {
        self.replace(Display::Error(text.to_string()));
    }
}

/// Presenter that prints to a terminal as left-aligned columns.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("failed to write to terminal: {e}");
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render(&mut self, headers: &[String], rows: &[Vec<String>]) {
        let columns = rows.iter().map(Vec::len).chain([headers.len()]).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for line in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut text = String::new();
        for line in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
            let cells = line
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>();
            text.push_str(cells.join("  ").trim_end());
            text.push('\n');
        }
        text.push_str(&format!("({} rows)\n", rows.len()));
        self.emit(&text);
    }

    fn render_message(&mut self, text: &str) {
        self.emit(&format!("{text}\n"));
    }

    fn render_error(&mut self, text: &str) {
        self.emit(&format!("error: {text}\n"));
    }
}
