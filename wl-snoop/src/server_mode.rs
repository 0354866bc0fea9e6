//! Server mode: owning the advertised wayland socket.
//!
//! The running compositor's socket is renamed aside together with its lock
//! file, and the original name is bound by the debugger. Clients that connect
//! to the advertised name are then paired with a fresh connection to the
//! renamed socket. The renames are undone on drop, including error paths.

use {
    run_on_drop::on_drop,
    std::{
        fs, io,
        os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
        rc::Rc,
    },
    thiserror::Error,
    uapi::{Errno, c, sockaddr_none_mut},
};

#[cfg(test)]
mod tests;

const MOVED_SUFFIX: &str = ".orig";

#[derive(Debug, Error)]
pub enum ServerModeError {
    #[error("the socket path is too long to form a unix socket address")]
    PathTooLong,
    #[error("could not move {0} aside")]
    MoveAside(String, #[source] io::Error),
    #[error("could not open the lock file")]
    OpenLockFile(#[source] io::Error),
    #[error("could not lock the lock file")]
    LockLockFile(#[source] io::Error),
    #[error("could not create a socket")]
    CreateSocket(#[source] io::Error),
    #[error("could not bind the socket to an address")]
    BindFailed(#[source] io::Error),
    #[error("could not start listening for incoming connections")]
    ListenFailed(#[source] io::Error),
    #[error("could not accept new connection")]
    Accept(#[source] io::Error),
    #[error("could not connect to {0}")]
    Connect(String, #[source] io::Error),
}

/// The takeover of one wayland socket name.
pub struct SocketTakeover {
    socket: Rc<OwnedFd>,
    display: String,
    socket_path: String,
    moved_socket_path: String,
    lock_path: String,
    moved_lock_path: String,
    lock_moved: bool,
    _lock_fd: OwnedFd,
}

impl SocketTakeover {
    /// Moves the socket `display` in `dir` aside and binds the original
    /// name.
    pub fn new(dir: &str, display: &str) -> Result<Self, ServerModeError> {
        let socket_path = format!("{dir}/{display}");
        let lock_path = format!("{socket_path}.lock");
        let moved_socket_path = format!("{socket_path}{MOVED_SUFFIX}");
        let moved_lock_path = format!("{lock_path}{MOVED_SUFFIX}");
        fs::rename(&socket_path, &moved_socket_path)
            .map_err(|e| ServerModeError::MoveAside(socket_path.clone(), e))?;
        let restore_socket = on_drop(|| {
            let _ = fs::rename(&moved_socket_path, &socket_path);
        });
        let lock_moved = match fs::rename(&lock_path, &moved_lock_path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(ServerModeError::MoveAside(lock_path, e)),
        };
        let restore_lock = on_drop(|| {
            if lock_moved {
                let _ = fs::rename(&moved_lock_path, &lock_path);
            }
        });
        let lock_fd = uapi::open(&*lock_path, c::O_CREAT | c::O_CLOEXEC | c::O_RDWR, 0o644)
            .map_err(|e| ServerModeError::OpenLockFile(e.into()))?;
        uapi::flock(lock_fd.raw(), c::LOCK_EX | c::LOCK_NB)
            .map_err(|e| ServerModeError::LockLockFile(e.into()))?;
        let socket = uapi::socket(
            c::AF_UNIX,
            c::SOCK_STREAM | c::SOCK_CLOEXEC | c::SOCK_NONBLOCK,
            0,
        )
        .map_err(|e| ServerModeError::CreateSocket(e.into()))?;
        let socket: OwnedFd = socket.into();
        let addr = socket_addr(&socket_path)?;
        uapi::bind(socket.as_raw_fd(), &addr)
            .map_err(|e| ServerModeError::BindFailed(e.into()))?;
        uapi::listen(socket.as_raw_fd(), 1024)
            .map_err(|e| ServerModeError::ListenFailed(e.into()))?;
        restore_socket.forget();
        restore_lock.forget();
        Ok(SocketTakeover {
            socket: Rc::new(socket),
            display: display.to_string(),
            socket_path,
            moved_socket_path,
            lock_path,
            moved_lock_path,
            lock_moved,
            _lock_fd: lock_fd.into(),
        })
    }

    /// The display name that was taken over, for example `wayland-0`.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// The listening socket, registered with the event loop by the debugger.
    pub fn socket(&self) -> &Rc<OwnedFd> {
        &self.socket
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// The path the real compositor socket was moved to.
    pub fn moved_socket_path(&self) -> &str {
        &self.moved_socket_path
    }

    pub fn lock_path(&self) -> &str {
        &self.lock_path
    }

    /// Accepts a pending client, or `None` if none is waiting.
    pub fn accept(&self) -> Result<Option<OwnedFd>, ServerModeError> {
        loop {
            let res = uapi::accept4(
                self.socket.as_raw_fd(),
                sockaddr_none_mut(),
                c::SOCK_CLOEXEC,
            );
            match res {
                Ok((s, _)) => return Ok(Some(s.into())),
                Err(Errno(c::EAGAIN)) => return Ok(None),
                Err(Errno(c::EINTR)) => {}
                Err(e) => return Err(ServerModeError::Accept(e.into())),
            }
        }
    }

    /// Dials the real compositor behind the moved socket.
    pub fn connect_upstream(&self) -> Result<OwnedFd, ServerModeError> {
        dial(&self.moved_socket_path)
    }
}

impl AsFd for SocketTakeover {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl Drop for SocketTakeover {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.socket_path);
        let _ = fs::remove_file(&self.lock_path);
        if let Err(e) = fs::rename(&self.moved_socket_path, &self.socket_path) {
            log::warn!("could not restore {}: {}", self.socket_path, e);
        }
        if self.lock_moved
            && let Err(e) = fs::rename(&self.moved_lock_path, &self.lock_path)
        {
            log::warn!("could not restore {}: {}", self.lock_path, e);
        }
    }
}

/// Connects to the unix socket at `path`.
pub(crate) fn dial(path: &str) -> Result<OwnedFd, ServerModeError> {
    let addr = socket_addr(path)?;
    let socket = uapi::socket(c::AF_UNIX, c::SOCK_STREAM | c::SOCK_CLOEXEC, 0)
        .map_err(|e| ServerModeError::CreateSocket(e.into()))?;
    uapi::connect(socket.raw(), &addr)
        .map_err(|e| ServerModeError::Connect(path.to_string(), e.into()))?;
    Ok(socket.into())
}

fn socket_addr(path: &str) -> Result<c::sockaddr_un, ServerModeError> {
    let mut addr: c::sockaddr_un = uapi::pod_zeroed();
    addr.sun_family = c::AF_UNIX as _;
    if path.len() + 1 > addr.sun_path.len() {
        return Err(ServerModeError::PathTooLong);
    }
    let sun_path = uapi::as_bytes_mut(&mut addr.sun_path[..]);
    sun_path[..path.len()].copy_from_slice(path.as_bytes());
    sun_path[path.len()] = 0;
    Ok(addr)
}
