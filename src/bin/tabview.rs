use std::{error::Error, io, sync::mpsc};

use clap::Parser;
use log::debug;
use tabview::{
    ConnectionTarget, Event, Flow, Session, Table, cli::spawn_input, render::TerminalPresenter,
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server host name or address
    host: String,
    /// Server port; clamped into 1..=65535
    #[arg(allow_hyphen_values = true)]
    port: String,
    /// Table shown on start
    #[arg(long, short, default_value = "students")]
    table: Table,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let target = ConnectionTarget::parse(&cli.host, &cli.port)?;

    let (events, rx) = mpsc::channel();
    let interrupt = events.clone();
    ctrlc::set_handler(move || {
        if interrupt.send(Event::Interrupt).is_err() {
            debug!("interrupt after shutdown");
        }
    })?;
    spawn_input(events.clone())?;

    let presenter = TerminalPresenter::new(io::stdout());
    let mut session = Session::new(target, cli.table, presenter, events);

    if session.start() == Flow::Exit {
        return Ok(());
    }
    while let Ok(event) = rx.recv() {
        if session.handle(event) == Flow::Exit {
            break;
        }
    }

    Ok(())
}
