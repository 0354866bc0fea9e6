//! The pass pipeline.
//!
//! Every intercepted message runs through an ordered list of passes before it
//! is forwarded. Passes added at runtime are inserted at the head of the
//! list, so the most recently added pass runs first; the interactive pass is
//! attached at the tail once and stays last.

use {
    crate::{connection::Connection, debugger::Debugger, message::Message},
    std::{cell::RefCell, rc::Rc},
    thiserror::Error,
};

#[cfg(test)]
mod tests;

/// What the pipeline should do after a pass hook returns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PassAction {
    /// Dispatch the next pass.
    Continue,
    /// Do not run further passes on this message.
    ///
    /// Stopping the pipeline does not drop the message; the broker forwards
    /// it regardless once the pipeline returns.
    Stop,
}

/// An error emitted by a pass that failed to initialize.
///
/// The pass is discarded when this happens; the rest of the pipeline keeps
/// running.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PassInitError(pub String);

/// Context handed to every pass hook.
pub struct PassCtx<'a> {
    pub debugger: &'a Rc<Debugger>,
    pub connection: &'a Rc<Connection>,
}

/// A message transformer.
///
/// All hooks have default implementations, so a pass only implements the
/// directions it cares about.
pub trait Pass: 'static {
    fn init(&mut self, debugger: &Rc<Debugger>) -> Result<(), PassInitError> {
        let _ = debugger;
        Ok(())
    }

    fn destroy(&mut self, debugger: &Rc<Debugger>) {
        let _ = debugger;
    }

    /// Invoked for every client -> server message.
    fn client_pass(&mut self, ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        let _ = (ctx, msg);
        PassAction::Continue
    }

    /// Invoked for every server -> client message.
    fn server_pass(&mut self, ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        let _ = (ctx, msg);
        PassAction::Continue
    }

    /// Prints help about this pass to stdout.
    fn help(&self, oneline: bool) {
        let _ = oneline;
    }
}

#[derive(Clone)]
pub(crate) struct LoadedPass {
    pub(crate) name: Rc<str>,
    pub(crate) pass: Rc<RefCell<dyn Pass>>,
}

/// The passes that can be attached with `pass add`, as (name, summary) pairs.
///
/// Plugin discovery is abstracted away; the loadable passes are the ones
/// compiled into this table.
pub fn available() -> &'static [(&'static str, &'static str)] {
    &[("dump", "print a hexdump of every message")]
}

/// Instantiates a built-in pass by name.
pub fn create(name: &str) -> Option<Rc<RefCell<dyn Pass>>> {
    match name {
        "dump" => Some(Rc::new(RefCell::new(DumpPass))),
        _ => None,
    }
}

struct DumpPass;

impl Pass for DumpPass {
    fn client_pass(&mut self, _ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        dump(msg);
        PassAction::Continue
    }

    fn server_pass(&mut self, _ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        dump(msg);
        PassAction::Continue
    }

    fn help(&self, oneline: bool) {
        if oneline {
            print!("print a hexdump of every message");
        } else {
            print!("Prints the raw words of every intercepted message in hex, eight words per line.");
        }
    }
}

fn dump(msg: &Message) {
    println!("{}, {} bytes:", msg.direction().sender(), msg.size());
    for row in msg.words().chunks(8) {
        print!("   ");
        for word in row {
            print!(" {word:08x}");
        }
        println!();
    }
}
