//! signalfd plumbing.
//!
//! The signals of interest are blocked for the process and delivered through
//! file descriptors instead, so that they are observed synchronously inside
//! the event loop.

use {
    std::{
        io, mem,
        os::fd::{AsRawFd, FromRawFd, OwnedFd},
    },
    uapi::c,
};

fn sigset(signals: &[c::c_int]) -> c::sigset_t {
    // SAFETY: an all-zero sigset_t is a valid value and sigemptyset
    // initializes it regardless
    let mut set = unsafe { mem::zeroed::<c::sigset_t>() };
    // SAFETY: set is a plain sigset_t owned by us
    unsafe {
        c::sigemptyset(&mut set);
        for sig in signals {
            c::sigaddset(&mut set, *sig);
        }
    }
    set
}

/// Blocks `signals` for the process and returns a signalfd delivering them.
pub(crate) fn create_fd(signals: &[c::c_int]) -> Result<OwnedFd, io::Error> {
    let set = sigset(signals);
    // SAFETY: sigprocmask/signalfd read the set, nothing is retained
    unsafe {
        if c::sigprocmask(c::SIG_BLOCK, &set, std::ptr::null_mut()) == -1 {
            return Err(io::Error::last_os_error());
        }
        let fd = c::signalfd(-1, &set, c::SFD_CLOEXEC | c::SFD_NONBLOCK);
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(OwnedFd::from_raw_fd(fd))
    }
}

/// Narrows an existing signalfd to `signals`.
///
/// The signals themselves stay blocked; they are simply no longer delivered
/// through this descriptor.
pub(crate) fn restrict_fd(fd: &OwnedFd, signals: &[c::c_int]) -> Result<(), io::Error> {
    let set = sigset(signals);
    // SAFETY: re-arming an fd we own with a set we own
    unsafe {
        if c::signalfd(fd.as_raw_fd(), &set, c::SFD_CLOEXEC | c::SFD_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Reads one pending signal number, or `None` if the fd has drained.
pub(crate) fn read_signal(fd: &OwnedFd) -> Result<Option<u32>, io::Error> {
    let mut buf = [0u8; size_of::<c::signalfd_siginfo>()];
    // SAFETY: reading into a buffer of the size the kernel expects
    let n = unsafe { c::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
    if n == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(c::EAGAIN) {
            return Ok(None);
        }
        return Err(err);
    }
    if (n as usize) < buf.len() {
        return Ok(None);
    }
    // ssi_signo is the first field of signalfd_siginfo
    Ok(Some(u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])))
}
