//! The connection broker.
//!
//! A connection pairs the socket towards a client with the socket towards the
//! server. Each complete message read from one socket is tagged with its
//! direction, examined by the resolver, funneled through the pass pipeline
//! and finally queued on the opposite socket.

use {
    crate::{
        debugger::{Debugger, DebuggerError, Dispatch, MonitorId},
        message::{Direction, Message},
        poll,
        resolver::ResolvedObjects,
        trans::{self, FlushResult, InputBuffer, OutputQueue, TransError},
    },
    error_reporter::Report,
    std::{
        cell::{Cell, Ref, RefCell},
        collections::VecDeque,
        os::fd::{AsFd, AsRawFd, OwnedFd},
        ptr,
        rc::Rc,
    },
    uapi::c,
};

#[cfg(test)]
mod tests;

/// Metadata about the client program served by a connection.
#[derive(Default, Clone)]
pub struct ClientInfo {
    pub pid: Option<c::pid_t>,
    pub program: Option<String>,
    pub argv: Vec<String>,
}

struct Side {
    socket: Rc<OwnedFd>,
    monitor: Cell<Option<MonitorId>>,
    interest: Cell<u32>,
    /// The last flush could not drain the outgoing queue.
    blocked: Cell<bool>,
    incoming: RefCell<Incoming>,
    outgoing: RefCell<OutputQueue>,
}

#[derive(Default)]
struct Incoming {
    buffer: Box<InputBuffer>,
    fds: VecDeque<Rc<OwnedFd>>,
}

impl Side {
    fn new(socket: Rc<OwnedFd>) -> Self {
        Self {
            socket,
            monitor: Cell::new(None),
            interest: Cell::new(poll::READABLE),
            blocked: Cell::new(false),
            incoming: Default::default(),
            outgoing: Default::default(),
        }
    }
}

/// One brokered client-server session.
pub struct Connection {
    debugger: Rc<Debugger>,
    client: Side,
    server: Side,
    resolved: RefCell<ResolvedObjects>,
    scratch: RefCell<Box<Message>>,
    client_messages: Cell<u64>,
    server_messages: Cell<u64>,
    info: ClientInfo,
    destroyed: Cell<bool>,
}

impl Connection {
    /// Creates a connection and registers both sockets with the event loop.
    pub(crate) fn create(
        debugger: &Rc<Debugger>,
        client_socket: Rc<OwnedFd>,
        server_socket: Rc<OwnedFd>,
        info: ClientInfo,
    ) -> Result<Rc<Self>, DebuggerError> {
        let conn = Rc::new(Connection {
            debugger: debugger.clone(),
            client: Side::new(client_socket),
            server: Side::new(server_socket),
            resolved: RefCell::new(ResolvedObjects::new()),
            scratch: RefCell::new(Box::new(Message::empty(Direction::FromClient))),
            client_messages: Cell::new(0),
            server_messages: Cell::new(0),
            info,
            destroyed: Cell::new(false),
        });
        for from in [Direction::FromClient, Direction::FromServer] {
            let side = conn.side_of(from);
            let conn2 = conn.clone();
            let id = debugger.monitor_fd(&side.socket, move |dbg, events| {
                conn2.handle_events(dbg, from, events)
            })?;
            side.monitor.set(Some(id));
        }
        debugger.add_connection(&conn);
        Ok(conn)
    }

    /// The side that messages with direction `from` are read from.
    fn side_of(&self, from: Direction) -> &Side {
        match from {
            Direction::FromClient => &self.client,
            Direction::FromServer => &self.server,
        }
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    pub fn resolved(&self) -> Ref<'_, ResolvedObjects> {
        self.resolved.borrow()
    }

    /// Increments the message counter of `direction`, returning the new
    /// count.
    pub fn bump(&self, direction: Direction) -> u64 {
        let counter = match direction {
            Direction::FromClient => &self.client_messages,
            Direction::FromServer => &self.server_messages,
        };
        let n = counter.get() + 1;
        counter.set(n);
        n
    }

    pub fn count(&self, direction: Direction) -> u64 {
        match direction {
            Direction::FromClient => self.client_messages.get(),
            Direction::FromServer => self.server_messages.get(),
        }
    }

    pub fn total(&self) -> u64 {
        self.client_messages.get() + self.server_messages.get()
    }

    fn handle_events(self: &Rc<Self>, dbg: &Rc<Debugger>, from: Direction, events: u32) -> Dispatch {
        if self.destroyed.get() {
            return Dispatch::Remove;
        }
        if events & poll::ERROR != 0 {
            log::info!("{} hung up", from.sender());
            self.teardown(dbg);
            return Dispatch::Keep;
        }
        if events & poll::WRITABLE != 0 {
            self.handle_writable(dbg, from);
        }
        if !self.destroyed.get() && events & poll::READABLE != 0 {
            self.handle_readable(dbg, from);
        }
        Dispatch::Keep
    }

    /// Drains complete messages arriving with direction `from`.
    fn handle_readable(self: &Rc<Self>, dbg: &Rc<Debugger>, from: Direction) {
        let side = self.side_of(from);
        let mut may_read = true;
        loop {
            if self.destroyed.get() {
                return;
            }
            let mut have_message = false;
            let res = {
                let incoming = &mut *side.incoming.borrow_mut();
                let res = trans::read_frame(
                    side.socket.as_raw_fd(),
                    &mut may_read,
                    &mut incoming.buffer,
                    &mut incoming.fds,
                );
                match res {
                    Ok(Some(frame)) => {
                        let mut scratch = self.scratch.borrow_mut();
                        let msg = &mut **scratch;
                        msg.reset(from, frame);
                        let num_fds = self
                            .resolved
                            .borrow()
                            .num_fds(msg)
                            .unwrap_or(incoming.fds.len())
                            .min(incoming.fds.len());
                        msg.fds.extend(incoming.fds.drain(..num_fds));
                        have_message = true;
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                }
            };
            match res {
                Ok(()) => {}
                Err(TransError::Closed) => {
                    log::info!("{} closed the connection", from.sender());
                    self.teardown(dbg);
                    return;
                }
                Err(e) => {
                    log::error!(
                        "protocol error on the {} side: {}",
                        from.sender(),
                        Report::new(e),
                    );
                    self.teardown(dbg);
                    return;
                }
            }
            if !have_message {
                return;
            }
            self.process_message(dbg, from);
            if !self.destroyed.get() {
                // backpressure: stop reading while the opposite socket is
                // clogged
                if self.side_of(from.opposite()).blocked.get() {
                    return;
                }
            }
        }
    }

    /// Runs one message from the scratch buffer through the resolver and the
    /// pipeline and forwards it.
    fn process_message(self: &Rc<Self>, dbg: &Rc<Debugger>, from: Direction) {
        {
            let mut scratch = self.scratch.borrow_mut();
            let msg = &mut **scratch;
            let res = self.resolved.borrow_mut().examine(msg);
            if let Err(e) = res {
                log::error!(
                    "protocol error in a {} message: {}",
                    from.sender(),
                    Report::new(e),
                );
                self.teardown(dbg);
                return;
            }
            dbg.dispatch_message(self, msg);
            let writer = self.side_of(from.opposite());
            writer.outgoing.borrow_mut().push_frame(msg.bytes(), &msg.fds);
            // drop our reference so the descriptors close once flushed
            msg.fds.clear();
        }
        self.flush(dbg, from.opposite());
    }

    /// Flushes one side's socket and recomputes both sides' epoll
    /// interests.
    fn flush(self: &Rc<Self>, dbg: &Rc<Debugger>, writer_side: Direction) {
        let writer = self.side_of(writer_side);
        let res = writer
            .outgoing
            .borrow_mut()
            .flush(writer.socket.as_raw_fd());
        match res {
            Ok(FlushResult::Done) => writer.blocked.set(false),
            Ok(FlushResult::Blocked) => writer.blocked.set(true),
            Err(TransError::Closed) => {
                log::info!("{} hung up", writer_side.sender());
                self.teardown(dbg);
                return;
            }
            Err(e) => {
                log::error!(
                    "could not write to the {} socket: {}",
                    writer_side.sender(),
                    Report::new(e),
                );
                self.teardown(dbg);
                return;
            }
        }
        self.update_interests(dbg);
    }

    /// Derives the epoll interests of both sides from their blocked state.
    ///
    /// A blocked side waits for writability; the side feeding a blocked
    /// socket has its readability suspended so that nothing queues without
    /// bound.
    fn update_interests(&self, dbg: &Rc<Debugger>) {
        for from in [Direction::FromClient, Direction::FromServer] {
            let side = self.side_of(from);
            let opposite_blocked = self.side_of(from.opposite()).blocked.get();
            let mut events = 0;
            if !opposite_blocked {
                events |= poll::READABLE;
            }
            if side.blocked.get() {
                events |= poll::WRITABLE;
            }
            self.set_interest(dbg, side, events);
        }
    }

    fn handle_writable(self: &Rc<Self>, dbg: &Rc<Debugger>, side_dir: Direction) {
        self.flush(dbg, side_dir);
        if self.destroyed.get() || self.side_of(side_dir).blocked.get() {
            return;
        }
        // the inbound direction that feeds this socket was suspended; drain
        // what accumulated while it was off
        self.handle_readable(dbg, side_dir.opposite());
    }

    fn set_interest(&self, dbg: &Rc<Debugger>, side: &Side, events: u32) {
        if side.interest.get() == events {
            return;
        }
        let Some(id) = side.monitor.get() else {
            return;
        };
        match dbg.set_interest(id, side.socket.as_fd(), events) {
            Ok(()) => side.interest.set(events),
            Err(e) => log::warn!("could not update socket interests: {}", Report::new(e)),
        }
    }

    /// Crafts and queues a message on the socket `direction` traffic is
    /// written to, updating the resolver as if the message had been
    /// intercepted.
    pub fn inject(self: &Rc<Self>, dbg: &Rc<Debugger>, direction: Direction, words: &[u32]) {
        if words.len() * 4 > trans::MAX_FRAME_SIZE {
            log::warn!("injected message does not fit a frame, dropping it");
            return;
        }
        let mut msg = Box::new(Message::empty(direction));
        msg.reset(direction, words);
        if let Err(e) = self.resolved.borrow_mut().examine(&msg) {
            log::warn!(
                "injected message does not resolve cleanly: {}",
                Report::new(e),
            );
        }
        let writer = self.side_of(direction.opposite());
        writer.outgoing.borrow_mut().push_frame(msg.bytes(), &[]);
        self.flush(dbg, direction.opposite());
    }

    /// Sends SIGTERM to the spawned client program and reaps it.
    pub fn terminate_client(&self) {
        let Some(pid) = self.info.pid else {
            return;
        };
        log::debug!("terminating client {pid}");
        // SAFETY: plain syscalls on a pid we spawned
        unsafe {
            c::kill(pid, c::SIGTERM);
            c::waitpid(pid, ptr::null_mut(), 0);
        }
    }

    /// Tears down the whole connection: both sockets are unregistered and
    /// closed and the connection is removed from the debugger.
    pub(crate) fn teardown(self: &Rc<Self>, dbg: &Rc<Debugger>) {
        if self.destroyed.replace(true) {
            return;
        }
        for side in [&self.client, &self.server] {
            if let Some(id) = side.monitor.take() {
                dbg.unmonitor(id);
            }
        }
        dbg.remove_connection(self);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}
