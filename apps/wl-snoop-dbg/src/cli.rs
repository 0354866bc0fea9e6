use {
    crate::{SnoopError, snoop},
    clap::{Parser, ValueHint},
};

/// An interactive debugger for wayland connections.
///
/// The debugger sits between a client and the compositor, prints every
/// intercepted message and drops into a gdb-like prompt on breakpoints.
#[derive(Parser, Debug)]
struct WlSnoopDbg {
    /// Take over the advertised wayland socket and debug every client that
    /// connects to it.
    #[clap(short = 'S', long)]
    server_mode: bool,
    /// Do not stop on the first intercepted message.
    #[clap(short, long)]
    skip_first_stop: bool,
    /// Dispatch messages strictly one at a time. Implied by interactive
    /// mode.
    #[clap(short, long)]
    one_by_one: bool,
    /// Attach a pass in front of the interactive pass. Can be repeated.
    #[clap(short, long, value_name = "NAME")]
    pass: Vec<String>,
    #[clap(
        trailing_var_arg = true,
        value_hint = ValueHint::CommandWithArguments,
        required_unless_present = "server_mode",
    )]
    /// The program to debug.
    program: Option<Vec<String>>,
}

pub fn main() -> Result<(), SnoopError> {
    let args = WlSnoopDbg::parse();
    snoop::main(
        args.server_mode,
        args.skip_first_stop,
        args.one_by_one,
        &args.pass,
        args.program.unwrap_or_default(),
    )
}
