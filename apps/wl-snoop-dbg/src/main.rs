use {
    error_reporter::Report,
    thiserror::Error,
    wl_snoop::{
        debugger::DebuggerError, interactive::InteractiveError, passes::PassInitError,
    },
};

mod cli;
mod snoop;

#[derive(Debug, Error)]
enum SnoopError {
    #[error("could not create the debugger")]
    Create(#[source] DebuggerError),
    #[error("unknown pass '{0}'")]
    UnknownPass(String),
    #[error("could not initialize pass '{0}'")]
    PassInit(String, #[source] PassInitError),
    #[error("could not start interactive mode")]
    Interactive(#[source] InteractiveError),
    #[error("could not enable server mode")]
    ServerMode(#[source] DebuggerError),
    #[error("could not spawn the client")]
    Spawn(#[source] DebuggerError),
    #[error("no program to debug")]
    NoProgram,
    #[error("the debugger failed")]
    Run(#[source] DebuggerError),
}

fn main() -> Result<(), Report<SnoopError>> {
    env_logger::init();
    cli::main().map_err(Report::new)
}
