//! The debugger singleton and its event loop.

use {
    crate::{
        connection::{ClientInfo, Connection},
        message::{Direction, Message},
        passes::{LoadedPass, Pass, PassAction, PassCtx, PassInitError},
        poll::{self, PollError, PollEvent, Poller},
        server_mode::{self, ServerModeError, SocketTakeover},
        signals,
        utils::env::{DEFAULT_DISPLAY, WAYLAND_DISPLAY, WAYLAND_SOCKET, XDG_RUNTIME_DIR},
    },
    error_reporter::Report,
    std::{
        cell::{Cell, RefCell},
        collections::HashMap,
        env::var,
        io,
        os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
        process::Command,
        rc::Rc,
        time::Duration,
    },
    thiserror::Error,
    uapi::c,
};


/// An error emitted by the [`Debugger`].
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DebuggerError(#[from] DebuggerErrorKind);

#[derive(Debug, Error)]
enum DebuggerErrorKind {
    #[error(transparent)]
    PollError(PollError),
    #[error("could not set up signal handling")]
    SignalSetup(#[source] io::Error),
    #[error("could not create a socket pair")]
    Socketpair(#[source] io::Error),
    #[error("could not spawn the client program")]
    SpawnClient(#[source] io::Error),
    #[error("could not read {} environment variable", WAYLAND_DISPLAY)]
    WaylandDisplay,
    #[error("the display name is empty")]
    WaylandDisplayEmpty,
    #[error("{} is not set", XDG_RUNTIME_DIR)]
    XrdNotSet,
    #[error("could not connect to the compositor")]
    Connect(#[source] ServerModeError),
    #[error("could not take over the wayland socket")]
    TakeOver(#[source] ServerModeError),
    #[error("the event loop failed, terminating")]
    EventLoop,
}

/// Returned by a monitor callback to control its registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Dispatch {
    Keep,
    Remove,
}

/// A handle to a monitored file descriptor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MonitorId(u64);

type MonitorCallback = Box<dyn FnMut(&Rc<Debugger>, u32) -> Dispatch>;

struct Monitor {
    fd: Rc<OwnedFd>,
    cb: Rc<RefCell<MonitorCallback>>,
}

/// The operator-visible state flags.
#[derive(Default)]
pub struct Flags {
    pub one_by_one: Cell<bool>,
    pub running: Cell<bool>,
    pub error: Cell<bool>,
    pub exit: Cell<bool>,
    pub server_mode: Cell<bool>,
}

/// The debugger.
///
/// This owns the event loop, the signal fd, the pass pipeline, the list of
/// brokered connections and the operator flags. It is used behind an `Rc`;
/// call [`Debugger::shutdown`] (or [`Debugger::run`], which does so on exit)
/// to break the reference cycles it forms with its connections and monitors.
pub struct Debugger {
    poller: Poller,
    next_monitor_id: Cell<u64>,
    monitors: RefCell<HashMap<u64, Monitor>>,
    signal_fd: Rc<OwnedFd>,
    passes: RefCell<Vec<LoadedPass>>,
    connections: RefCell<Vec<Rc<Connection>>>,
    server: RefCell<Option<Rc<SocketTakeover>>>,
    pub flags: Flags,
}

impl Debugger {
    pub fn new() -> Result<Rc<Self>, DebuggerError> {
        let poller = Poller::new().map_err(DebuggerErrorKind::PollError)?;
        let signal_fd = signals::create_fd(&[c::SIGINT, c::SIGCHLD])
            .map_err(DebuggerErrorKind::SignalSetup)?;
        let debugger = Rc::new(Debugger {
            poller,
            next_monitor_id: Cell::new(1),
            monitors: Default::default(),
            signal_fd: Rc::new(signal_fd),
            passes: Default::default(),
            connections: Default::default(),
            server: Default::default(),
            flags: Default::default(),
        });
        let signal_fd = debugger.signal_fd.clone();
        debugger.monitor_fd(&signal_fd, |dbg, _events| {
            dbg.drain_signals();
            Dispatch::Keep
        })?;
        Ok(debugger)
    }
}

/// File descriptor monitoring.
impl Debugger {
    /// Registers `fd` with the event loop.
    ///
    /// The callback is invoked whenever the descriptor becomes readable. It
    /// may register and remove monitors itself; returning
    /// [`Dispatch::Remove`] unregisters it.
    pub fn monitor_fd(
        &self,
        fd: &Rc<OwnedFd>,
        cb: impl FnMut(&Rc<Debugger>, u32) -> Dispatch + 'static,
    ) -> Result<MonitorId, DebuggerError> {
        let id = self.next_monitor_id.get();
        self.next_monitor_id.set(id + 1);
        self.poller
            .register(id, fd.as_fd(), poll::READABLE)
            .map_err(DebuggerErrorKind::PollError)?;
        let cb: MonitorCallback = Box::new(cb);
        self.monitors.borrow_mut().insert(
            id,
            Monitor {
                fd: fd.clone(),
                cb: Rc::new(RefCell::new(cb)),
            },
        );
        Ok(MonitorId(id))
    }

    /// Unregisters a monitor. Unknown ids are ignored.
    pub fn unmonitor(&self, id: MonitorId) {
        if let Some(monitor) = self.monitors.borrow_mut().remove(&id.0) {
            self.poller.unregister(monitor.fd.as_fd());
        }
    }

    pub(crate) fn set_interest(
        &self,
        id: MonitorId,
        fd: BorrowedFd<'_>,
        events: u32,
    ) -> Result<(), DebuggerError> {
        self.poller
            .update_interests(id.0, fd, events)
            .map_err(|e| DebuggerErrorKind::PollError(e).into())
    }

    pub fn num_monitors(&self) -> usize {
        self.monitors.borrow().len()
    }
}

/// Dispatching.
impl Debugger {
    /// Waits for events and dispatches their callbacks.
    ///
    /// With a timeout of `None` this blocks until at least one descriptor is
    /// ready. The return value indicates whether any callback ran.
    pub fn dispatch(self: &Rc<Self>, timeout: Option<Duration>) -> Result<bool, DebuggerError> {
        let timeout = timeout
            .and_then(|t| t.as_millis().try_into().ok())
            .unwrap_or(-1);
        let mut events = [PollEvent::default(); poll::MAX_EVENTS];
        let n = self
            .poller
            .read_events(timeout, &mut events)
            .map_err(DebuggerErrorKind::PollError)?;
        for event in &events[..n] {
            let cb = self.monitors.borrow().get(&event.u64).map(|m| m.cb.clone());
            let Some(cb) = cb else {
                continue;
            };
            let res = (&mut *cb.borrow_mut())(self, event.events);
            if res == Dispatch::Remove {
                self.unmonitor(MonitorId(event.u64));
            }
            if self.flags.exit.get() || self.flags.error.get() {
                break;
            }
        }
        Ok(n > 0)
    }

    /// Runs the event loop until the exit or error flag is set, then shuts
    /// the debugger down.
    pub fn run(self: &Rc<Self>) -> Result<(), DebuggerError> {
        let res = loop {
            if self.flags.exit.get() {
                break Ok(());
            }
            if self.flags.error.get() {
                break Err(DebuggerErrorKind::EventLoop.into());
            }
            match self.dispatch(None) {
                Ok(_) => {}
                Err(e) => {
                    self.flags.error.set(true);
                    break Err(e);
                }
            }
        };
        self.shutdown();
        res
    }

    /// Destroys passes in reverse order, tears down all connections and
    /// releases the taken-over socket.
    pub fn shutdown(self: &Rc<Self>) {
        while let Some(pass) = {
            let mut passes = self.passes.borrow_mut();
            passes.pop()
        } {
            pass.pass.borrow_mut().destroy(self);
        }
        let connections = self.connections.borrow().clone();
        for conn in &connections {
            conn.teardown(self);
        }
        let monitors = std::mem::take(&mut *self.monitors.borrow_mut());
        for monitor in monitors.values() {
            self.poller.unregister(monitor.fd.as_fd());
        }
        self.server.borrow_mut().take();
    }

    fn drain_signals(self: &Rc<Self>) {
        loop {
            let signo = match signals::read_signal(&self.signal_fd) {
                Ok(Some(signo)) => signo,
                Ok(None) => return,
                Err(e) => {
                    log::error!("could not read from the signal fd: {}", Report::new(e));
                    self.flags.error.set(true);
                    return;
                }
            };
            match signo as c::c_int {
                c::SIGCHLD => self.reap_children(),
                c::SIGINT => {
                    println!("Interrupted");
                    self.flags.exit.set(true);
                }
                _ => {}
            }
        }
    }

    fn reap_children(&self) {
        loop {
            // SAFETY: waitpid with WNOHANG does not block and touches no
            // memory beyond the null status pointer
            let pid = unsafe { c::waitpid(-1, std::ptr::null_mut(), c::WNOHANG) };
            if pid <= 0 {
                return;
            }
            log::debug!("child {pid} exited");
            let known = self
                .connections
                .borrow()
                .iter()
                .any(|conn| conn.info().pid == Some(pid));
            if known {
                println!("Client {pid} exited");
                self.flags.running.set(false);
            }
        }
    }
}

/// Pass pipeline management.
impl Debugger {
    /// Attaches a pass at the head of the pipeline, so it runs first.
    ///
    /// If `init` fails, the pass is discarded and the error returned.
    pub fn attach_pass_head(
        self: &Rc<Self>,
        name: &str,
        pass: Rc<RefCell<dyn Pass>>,
    ) -> Result<(), PassInitError> {
        pass.borrow_mut().init(self)?;
        self.passes.borrow_mut().insert(
            0,
            LoadedPass {
                name: Rc::from(name),
                pass,
            },
        );
        Ok(())
    }

    /// Attaches a pass at the tail of the pipeline. Used for the interactive
    /// pass, which must stay last.
    pub fn attach_pass_tail(
        self: &Rc<Self>,
        name: &str,
        pass: Rc<RefCell<dyn Pass>>,
    ) -> Result<(), PassInitError> {
        pass.borrow_mut().init(self)?;
        self.passes.borrow_mut().push(LoadedPass {
            name: Rc::from(name),
            pass,
        });
        Ok(())
    }

    /// Detaches the pass called `name`, running its destroy hook.
    pub fn remove_pass(self: &Rc<Self>, name: &str) -> bool {
        let pos = self
            .passes
            .borrow()
            .iter()
            .position(|p| &*p.name == name);
        let Some(pos) = pos else {
            return false;
        };
        let pass = self.passes.borrow_mut().remove(pos);
        pass.pass.borrow_mut().destroy(self);
        true
    }

    /// The names of the attached passes, in execution order.
    pub fn pass_names(&self) -> Vec<Rc<str>> {
        self.passes.borrow().iter().map(|p| p.name.clone()).collect()
    }

    /// Funnels one message through the pipeline.
    ///
    /// Passes run in order until one of them returns [`PassAction::Stop`].
    /// The pipeline never drops messages; forwarding is the broker's
    /// business.
    pub(crate) fn dispatch_message(self: &Rc<Self>, connection: &Rc<Connection>, msg: &mut Message) {
        let snapshot = self.passes.borrow().clone();
        let ctx = PassCtx {
            debugger: self,
            connection,
        };
        for lp in &snapshot {
            let action = {
                let mut pass = lp.pass.borrow_mut();
                match msg.direction() {
                    Direction::FromClient => pass.client_pass(&ctx, msg),
                    Direction::FromServer => pass.server_pass(&ctx, msg),
                }
            };
            if action == PassAction::Stop {
                break;
            }
        }
    }
}

/// Connection management.
impl Debugger {
    pub(crate) fn add_connection(&self, conn: &Rc<Connection>) {
        self.connections.borrow_mut().push(conn.clone());
        self.flags.running.set(true);
    }

    pub(crate) fn remove_connection(&self, conn: &Rc<Connection>) {
        self.connections
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, conn));
        if self.connections.borrow().is_empty() {
            self.flags.running.set(false);
            if !self.flags.server_mode.get() {
                self.flags.exit.set(true);
            }
        }
    }

    /// The currently live connections.
    pub fn connections(&self) -> Vec<Rc<Connection>> {
        self.connections.borrow().clone()
    }

    /// Sends SIGTERM to every spawned client program.
    pub fn terminate_clients(&self) {
        for conn in self.connections.borrow().iter() {
            conn.terminate_client();
        }
    }

    /// Spawns `program` with `WAYLAND_SOCKET` pointing at the debugger and
    /// brokers it to the real compositor.
    pub fn spawn_client(
        self: &Rc<Self>,
        program: &str,
        args: &[String],
    ) -> Result<Rc<Connection>, DebuggerError> {
        let server_fd = self.connect_compositor()?;
        let (ours, theirs) = uapi::socketpair(c::AF_UNIX, c::SOCK_STREAM | c::SOCK_CLOEXEC, 0)
            .map_err(|e| DebuggerErrorKind::Socketpair(e.into()))?;
        let ours: OwnedFd = ours.into();
        let theirs: OwnedFd = theirs.into();
        let flags = uapi::fcntl_getfd(theirs.as_raw_fd())
            .map_err(|e| DebuggerErrorKind::Socketpair(e.into()))?;
        uapi::fcntl_setfd(theirs.as_raw_fd(), flags & !c::FD_CLOEXEC)
            .map_err(|e| DebuggerErrorKind::Socketpair(e.into()))?;
        let child = Command::new(program)
            .args(args)
            .env(WAYLAND_SOCKET, theirs.as_raw_fd().to_string())
            .spawn()
            .map_err(DebuggerErrorKind::SpawnClient)?;
        drop(theirs);
        let pid = child.id() as c::pid_t;
        log::debug!("spawned client {program} with pid {pid}");
        let info = ClientInfo {
            pid: Some(pid),
            program: Some(program.to_string()),
            argv: args.to_vec(),
        };
        Connection::create(self, Rc::new(ours), Rc::new(server_fd), info)
    }

    fn connect_compositor(&self) -> Result<OwnedFd, DebuggerError> {
        let name = var(WAYLAND_DISPLAY)
            .ok()
            .ok_or(DebuggerErrorKind::WaylandDisplay)?;
        if name.is_empty() {
            return Err(DebuggerErrorKind::WaylandDisplayEmpty.into());
        }
        let path = if name.starts_with('/') {
            name
        } else {
            let xrd = var(XDG_RUNTIME_DIR)
                .ok()
                .ok_or(DebuggerErrorKind::XrdNotSet)?;
            format!("{xrd}/{name}")
        };
        server_mode::dial(&path)
            .map_err(|e| DebuggerErrorKind::Connect(e).into())
    }
}

/// Server mode.
impl Debugger {
    /// Takes over the advertised wayland socket and starts accepting
    /// clients.
    pub fn enable_server_mode(self: &Rc<Self>) -> Result<(), DebuggerError> {
        let xrd = var(XDG_RUNTIME_DIR)
            .ok()
            .ok_or(DebuggerErrorKind::XrdNotSet)?;
        let display = var(WAYLAND_DISPLAY).unwrap_or_else(|_| DEFAULT_DISPLAY.to_string());
        let takeover = Rc::new(
            SocketTakeover::new(&xrd, &display).map_err(DebuggerErrorKind::TakeOver)?,
        );
        log::info!("listening on {}", takeover.socket_path());
        let socket = takeover.socket().clone();
        let accept_from = takeover.clone();
        self.monitor_fd(&socket, move |dbg, _events| {
            dbg.accept_clients(&accept_from);
            Dispatch::Keep
        })?;
        *self.server.borrow_mut() = Some(takeover);
        self.flags.server_mode.set(true);
        Ok(())
    }

    /// The active socket takeover, if server mode is enabled.
    pub fn server(&self) -> Option<Rc<SocketTakeover>> {
        self.server.borrow().clone()
    }

    fn accept_clients(self: &Rc<Self>, takeover: &Rc<SocketTakeover>) {
        loop {
            let client_fd = match takeover.accept() {
                Ok(Some(fd)) => fd,
                Ok(None) => return,
                Err(e) => {
                    log::error!("could not accept a client: {}", Report::new(e));
                    return;
                }
            };
            let server_fd = match takeover.connect_upstream() {
                Ok(fd) => fd,
                Err(e) => {
                    log::error!("could not dial the compositor: {}", Report::new(e));
                    continue;
                }
            };
            let res = Connection::create(
                self,
                Rc::new(client_fd),
                Rc::new(server_fd),
                ClientInfo::default(),
            );
            match res {
                Ok(_) => log::info!("accepted a new client"),
                Err(e) => log::error!("could not broker a client: {}", Report::new(e)),
            }
        }
    }
}

/// Signal routing.
impl Debugger {
    /// Removes SIGINT from the default signal handling so that another
    /// monitor, typically the interactive pass, can own it.
    pub fn release_sigint(&self) -> Result<(), DebuggerError> {
        signals::restrict_fd(&self.signal_fd, &[c::SIGCHLD])
            .map_err(|e| DebuggerErrorKind::SignalSetup(e).into())
    }
}
