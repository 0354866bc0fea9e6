//! An interactive debugger for wayland connections.
//!
//! wl-snoop sits between a wayland compositor and one or more clients and
//! intercepts every message exchanged over their unix socket pair. Each
//! message is parsed against the bundled protocol tables, funneled through a
//! pipeline of passes, and finally forwarded on the opposite socket. The
//! interactive pass at the tail of the pipeline evaluates breakpoints and
//! print filters and drops the operator into a gdb-like REPL whenever a stop
//! condition is met.
//!
//! # Architecture
//!
//! - [`trans`](mod@crate::trans) reads and writes whole wire frames,
//!   including file descriptors passed via `SCM_RIGHTS`.
//! - [`protocols`] is the static catalog of interfaces, messages and
//!   signatures.
//! - [`resolver`] tracks which interface is bound to each object id on a
//!   connection by scanning `new_id` arguments in intercepted messages.
//! - [`connection`] pairs a client socket with a server socket and shuttles
//!   messages between them.
//! - [`debugger`] owns the epoll loop, the signalfd, the pass pipeline and
//!   the connection list.
//! - [`interactive`] implements breakpoints, filters, the REPL and the
//!   external-editor flow.
//!
//! The engine is strictly single threaded. While the REPL is active, no
//! sockets are serviced; this is intentional, the debugger is stopped.
//!
//! # Example
//!
//! ```no_run
//! use wl_snoop::debugger::Debugger;
//! use wl_snoop::interactive;
//!
//! let debugger = Debugger::new().unwrap();
//! interactive::init(&debugger, false).unwrap();
//! debugger.spawn_client("weston-terminal", &[]).unwrap();
//! debugger.run().unwrap();
//! ```
//!
//! # Logging
//!
//! The library logs through the `log` facade. Operator-facing output of the
//! REPL is written to stdout directly and is not part of the log stream.

pub mod connection;
pub mod debugger;
pub mod interactive;
pub mod message;
pub mod passes;
pub mod poll;
pub mod print;
pub mod protocols;
pub mod resolver;
pub mod server_mode;
mod signals;
pub mod trans;
mod utils;
