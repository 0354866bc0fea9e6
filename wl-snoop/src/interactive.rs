//! The interactive pass: breakpoints, print filters and the REPL.
//!
//! This pass sits at the tail of the pipeline and is terminal; it never
//! forwards control to another pass. On every message it updates the
//! connection counters, evaluates breakpoints and filters, prints the message
//! unless a filter hides it, and enters the REPL when a stop condition is
//! met. A dedicated SIGINT handler re-enters the REPL on the most recent
//! message.

use {
    crate::{
        connection::Connection,
        debugger::{Debugger, DebuggerError, Dispatch},
        message::{Direction, Message},
        passes::{Pass, PassAction, PassCtx, PassInitError},
        print, protocols, signals,
    },
    commands::{CmdResult, Current, ReplCtx},
    error_reporter::Report,
    regex::Regex,
    std::{
        cell::RefCell,
        io::{self, BufRead, Write},
        rc::Rc,
    },
    thiserror::Error,
    uapi::c,
};

mod commands;
mod editor;
mod info;
#[cfg(test)]
mod tests;

/// The name the interactive pass is registered under.
pub const PASS_NAME: &str = "interactive";

#[derive(Debug, Error)]
pub enum InteractiveError {
    #[error("could not attach the interactive pass")]
    Attach(#[source] PassInitError),
    #[error("could not set up the SIGINT handler")]
    Signal(#[source] io::Error),
    #[error(transparent)]
    Debugger(#[from] DebuggerError),
}

/// Attaches the interactive pass to `debugger` and takes over SIGINT.
///
/// With `skip_first_query` set, the debugger does not stop on the first
/// intercepted message.
pub fn init(debugger: &Rc<Debugger>, skip_first_query: bool) -> Result<(), InteractiveError> {
    log::debug!("starting interactive mode");
    // interactive mode needs messages dispatched one at a time
    debugger.flags.one_by_one.set(true);
    let interactive = Rc::new(RefCell::new(Interactive {
        stop: false,
        skip_first_query,
        breakpoints: Vec::new(),
        next_breakpoint_id: 1,
        filters: Vec::new(),
        last_command: None,
        current: None,
    }));
    debugger
        .attach_pass_tail(PASS_NAME, interactive.clone())
        .map_err(InteractiveError::Attach)?;
    debugger.release_sigint()?;
    let sigint_fd = Rc::new(signals::create_fd(&[c::SIGINT]).map_err(InteractiveError::Signal)?);
    let drain_fd = sigint_fd.clone();
    debugger.monitor_fd(&sigint_fd, move |dbg, _events| {
        loop {
            match signals::read_signal(&drain_fd) {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    log::error!("could not read the SIGINT fd: {}", Report::new(e));
                    return Dispatch::Remove;
                }
            }
        }
        log::debug!("got interrupt (SIGINT)");
        println!();
        interactive.borrow_mut().repl_on_current(dbg);
        Dispatch::Keep
    })?;
    Ok(())
}

pub(crate) struct Interactive {
    stop: bool,
    skip_first_query: bool,
    breakpoints: Vec<Breakpoint>,
    next_breakpoint_id: u32,
    filters: Vec<PrintFilter>,
    last_command: Option<String>,
    /// The most recently processed message, kept for SIGINT re-entry.
    current: Option<(Rc<Connection>, Box<Message>)>,
}

pub(crate) struct Breakpoint {
    id: u32,
    kind: BreakpointKind,
    description: String,
}

enum BreakpointKind {
    OnSide(Direction),
    OnId(u32),
    OnMessage {
        opcode: u16,
        spec: &'static protocols::MessageSpec,
    },
}

#[derive(Debug, Error)]
pub(crate) enum BreakpointError {
    #[error("Wrong syntax")]
    BadSyntax,
    #[error("Wrong id")]
    BadId,
    #[error("Unknown interface")]
    UnknownInterface,
    #[error("Couldn't find method/event name")]
    UnknownMessage,
    #[error("{0} names both a request and an event, refusing the ambiguity")]
    Ambiguous(String),
}

impl Breakpoint {
    fn matches(&self, ro: &crate::resolver::ResolvedObjects, msg: &Message) -> bool {
        match &self.kind {
            BreakpointKind::OnSide(direction) => msg.direction() == *direction,
            BreakpointKind::OnId(id) => msg.object_id() == *id,
            BreakpointKind::OnMessage { opcode, spec } => {
                if msg.opcode() != *opcode {
                    return false;
                }
                let Some(interface) = ro.get(msg.object_id()) else {
                    return false;
                };
                match interface.message(msg.direction(), *opcode) {
                    Some(m) => std::ptr::eq(m, *spec),
                    None => false,
                }
            }
        }
    }
}

struct PrintFilter {
    pattern: String,
    regex: Regex,
    show_only: bool,
}

impl Interactive {
    /// Parses a breakpoint specification and installs the breakpoint,
    /// returning its id.
    fn create_breakpoint(&mut self, args: &str) -> Result<u32, BreakpointError> {
        let args = args.trim();
        let (kind, description) = if args == "server" {
            (
                BreakpointKind::OnSide(Direction::FromServer),
                "message from server".to_string(),
            )
        } else if args == "client" {
            (
                BreakpointKind::OnSide(Direction::FromClient),
                "message from client".to_string(),
            )
        } else if let Some(rest) = args.strip_prefix("id ") {
            let id: u32 = rest.trim().parse().map_err(|_| BreakpointError::BadId)?;
            (BreakpointKind::OnId(id), format!("object id {id}"))
        } else if let Some((interface, name)) = args.split_once('@') {
            let interface =
                protocols::lookup(interface.trim()).ok_or(BreakpointError::UnknownInterface)?;
            let name = name.trim();
            let request = interface.requests.iter().position(|m| m.name == name);
            let event = interface.events.iter().position(|m| m.name == name);
            let (opcode, spec) = match (request, event) {
                (Some(_), Some(_)) => {
                    return Err(BreakpointError::Ambiguous(format!(
                        "{}@{}",
                        interface.name, name
                    )));
                }
                (Some(op), None) => (op, &interface.requests[op]),
                (None, Some(op)) => (op, &interface.events[op]),
                (None, None) => return Err(BreakpointError::UnknownMessage),
            };
            (
                BreakpointKind::OnMessage {
                    opcode: opcode as u16,
                    spec,
                },
                format!("{}@{}", interface.name, name),
            )
        } else {
            return Err(BreakpointError::BadSyntax);
        };
        let id = self.next_breakpoint_id;
        self.next_breakpoint_id += 1;
        self.breakpoints.push(Breakpoint {
            id,
            kind,
            description,
        });
        log::debug!("created breakpoint {id}");
        Ok(id)
    }

    fn delete_breakpoint(&mut self, id: u32) -> bool {
        let len = self.breakpoints.len();
        self.breakpoints.retain(|b| b.id != id);
        self.breakpoints.len() != len
    }

    fn add_filter(&mut self, pattern: &str, show_only: bool) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.filters.insert(
            0,
            PrintFilter {
                pattern: pattern.to_string(),
                regex,
                show_only,
            },
        );
        Ok(())
    }

    /// Whether the filters hide the message called `name`.
    fn filter_match(&self, name: &str) -> bool {
        let mut has_show_only = false;
        for filter in &self.filters {
            if filter.regex.is_match(name) {
                if filter.show_only {
                    return false;
                }
                log::debug!("filter {:?} hides {name}", filter.pattern);
                return true;
            }
            has_show_only |= filter.show_only;
        }
        // nothing matched; with show_only filters present that means hide
        has_show_only
    }

    fn process(&mut self, ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        let no = ctx.connection.bump(msg.direction());
        if !self.skip_first_query && ctx.connection.total() == 1 {
            println!("Stopped on the first message");
            self.stop = true;
        }
        let name = print::message_name(&ctx.connection.resolved(), msg);
        let mut skip = self.filter_match(&name);
        let breakpoint_hit = {
            let ro = ctx.connection.resolved();
            self.breakpoints.iter().any(|b| b.matches(&ro, msg))
        };
        if breakpoint_hit {
            self.stop = true;
            skip = false;
        }
        if !skip {
            print::print_message(&ctx.connection.resolved(), msg);
            if self.stop {
                log::debug!(
                    "stopped at message no. {no} from {}",
                    msg.direction().sender(),
                );
                self.stop = false;
                self.query_user(&mut ReplCtx {
                    debugger: ctx.debugger,
                    current: Some(Current {
                        connection: ctx.connection,
                        message: &mut *msg,
                    }),
                });
            }
        }
        self.remember(ctx.connection, msg);
        PassAction::Stop
    }

    fn remember(&mut self, connection: &Rc<Connection>, msg: &Message) {
        match &mut self.current {
            Some((conn, copy)) => {
                *conn = connection.clone();
                copy.copy_from(msg);
            }
            None => {
                let mut copy = Box::new(Message::empty(msg.direction()));
                copy.copy_from(msg);
                self.current = Some((connection.clone(), copy));
            }
        }
    }

    /// Enters the REPL on the most recent message. Used by the SIGINT
    /// handler.
    fn repl_on_current(&mut self, debugger: &Rc<Debugger>) {
        let mut current = self.current.take();
        let cur = current.as_mut().map(|(connection, message)| Current {
            connection: &*connection,
            message: &mut **message,
        });
        self.query_user(&mut ReplCtx {
            debugger,
            current: cur,
        });
        self.current = current;
    }

    /// The REPL. Blocks the event loop until the operator resumes dispatch.
    fn query_user(&mut self, ctx: &mut ReplCtx<'_>) {
        loop {
            if ctx.debugger.flags.exit.get() || ctx.debugger.flags.error.get() {
                break;
            }
            let _ = io::stdout().flush();
            print!("(wl-snoop) ");
            let _ = io::stdout().flush();
            let mut buf = String::new();
            match io::stdin().lock().read_line(&mut buf) {
                Ok(0) => {
                    if commands::cmd_quit(self, ctx, "") == CmdResult::EndQuery {
                        break;
                    }
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("could not read a command: {}", Report::new(e));
                    break;
                }
            }
            let cmd = buf.trim_end_matches('\n').trim_start();
            let cmd = if cmd.is_empty() {
                match &self.last_command {
                    Some(last) => last.clone(),
                    None => continue,
                }
            } else {
                let cmd = cmd.to_string();
                self.last_command = Some(cmd.clone());
                cmd
            };
            match commands::run_command(self, ctx, &cmd) {
                CmdResult::EndQuery => break,
                CmdResult::ContinueQuery => {}
                CmdResult::DontMatch => println!("Unknown command: {cmd}"),
            }
        }
    }
}

impl Pass for Interactive {
    fn client_pass(&mut self, ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        self.process(ctx, msg)
    }

    fn server_pass(&mut self, ctx: &PassCtx<'_>, msg: &mut Message) -> PassAction {
        self.process(ctx, msg)
    }

    fn help(&self, oneline: bool) {
        if oneline {
            print!("breakpoints, filters and the REPL");
        } else {
            print!("The interactive debugger pass. Always loaded, always last.");
        }
    }
}
