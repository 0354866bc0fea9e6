use {
    crate::server_mode::{SocketTakeover, dial},
    std::{
        fs,
        os::fd::{AsRawFd, OwnedFd},
        path::Path,
    },
    uapi::c,
};

fn listen_at(path: &str) -> OwnedFd {
    let socket = uapi::socket(c::AF_UNIX, c::SOCK_STREAM | c::SOCK_CLOEXEC, 0).unwrap();
    let socket: OwnedFd = socket.into();
    let mut addr: c::sockaddr_un = uapi::pod_zeroed();
    addr.sun_family = c::AF_UNIX as _;
    let sun_path = uapi::as_bytes_mut(&mut addr.sun_path[..]);
    sun_path[..path.len()].copy_from_slice(path.as_bytes());
    sun_path[path.len()] = 0;
    uapi::bind(socket.as_raw_fd(), &addr).unwrap();
    uapi::listen(socket.as_raw_fd(), 16).unwrap();
    socket
}

#[test]
fn takeover_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_str().unwrap();
    let socket_path = format!("{dir_path}/wayland-7");
    let lock_path = format!("{socket_path}.lock");
    let compositor = listen_at(&socket_path);
    fs::write(&lock_path, "").unwrap();

    let takeover = SocketTakeover::new(dir_path, "wayland-7").unwrap();
    assert_eq!(takeover.display(), "wayland-7");
    assert!(Path::new(&format!("{socket_path}.orig")).exists());
    assert!(Path::new(&format!("{lock_path}.orig")).exists());
    assert!(Path::new(&socket_path).exists());

    // clients connecting to the advertised name reach the takeover
    let _client = dial(&socket_path).unwrap();
    let accepted = takeover.accept().unwrap();
    assert!(accepted.is_some());
    assert!(takeover.accept().unwrap().is_none());

    // upstream dials reach the real compositor
    let _upstream = takeover.connect_upstream().unwrap();
    let (_peer, _) = uapi::accept4(
        compositor.as_raw_fd(),
        uapi::sockaddr_none_mut(),
        c::SOCK_CLOEXEC,
    )
    .unwrap();

    drop(takeover);
    assert!(!Path::new(&format!("{socket_path}.orig")).exists());
    assert!(!Path::new(&format!("{lock_path}.orig")).exists());
    assert!(Path::new(&socket_path).exists());
    assert!(Path::new(&lock_path).exists());
}

#[test]
fn missing_socket_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_str().unwrap();
    assert!(SocketTakeover::new(dir_path, "wayland-9").is_err());
}
