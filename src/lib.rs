pub mod cli;
pub mod command;
pub mod config;
pub mod protocol;
pub mod registry;
pub mod render;
pub mod statement;
pub mod view;

pub use cli::{Event, Flow, Session, prompt};
pub use command::{Command, CommandError};
pub use config::{ConfigError, ConnectionTarget};
pub use protocol::{QueryRequest, ResponseEnvelope};
pub use render::{Presenter, Table};
pub use statement::Statement;
