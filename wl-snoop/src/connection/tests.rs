use {
    crate::{
        connection::{ClientInfo, Connection},
        debugger::Debugger,
        message::Direction,
        protocols::wayland,
    },
    std::{
        io::{Read, Write},
        net::Shutdown,
        os::{fd::OwnedFd, unix::net::UnixStream},
        rc::Rc,
        time::Duration,
    },
    uapi::c,
};

fn pair() -> (OwnedFd, OwnedFd) {
    let (a, b) = uapi::socketpair(c::AF_UNIX, c::SOCK_STREAM | c::SOCK_CLOEXEC, 0).unwrap();
    (a.into(), b.into())
}

fn frame(object_id: u32, opcode: u16, payload: &[u32]) -> Vec<u8> {
    let size = ((payload.len() + 2) * 4) as u32;
    let mut words = vec![object_id, (size << 16) | opcode as u32];
    words.extend_from_slice(payload);
    uapi::as_bytes(&words[..]).to_vec()
}

struct Harness {
    debugger: Rc<Debugger>,
    conn: Rc<Connection>,
    client: UnixStream,
    server: UnixStream,
}

fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let debugger = Debugger::new().unwrap();
    let (client_ours, client_theirs) = pair();
    let (server_ours, server_theirs) = pair();
    let conn = Connection::create(
        &debugger,
        Rc::new(client_ours),
        Rc::new(server_ours),
        ClientInfo::default(),
    )
    .unwrap();
    Harness {
        debugger,
        conn,
        client: UnixStream::from(client_theirs),
        server: UnixStream::from(server_theirs),
    }
}

fn dispatch(debugger: &Rc<Debugger>) {
    while debugger.dispatch(Some(Duration::ZERO)).unwrap() {}
}

#[test]
fn transparent_passthrough() {
    let mut h = harness();
    let bytes = frame(1, 1, &[2]);
    h.client.write_all(&bytes).unwrap();
    dispatch(&h.debugger);
    let mut got = vec![0; bytes.len()];
    h.server.read_exact(&mut got).unwrap();
    assert_eq!(got, bytes);
    // the resolver saw the get_registry on the way through
    assert_eq!(h.conn.resolved().get(2), Some(&wayland::WL_REGISTRY));
}

#[test]
fn ordering_is_preserved() {
    let mut h = harness();
    let frames = [
        frame(1, 0, &[2]),
        frame(1, 0, &[3]),
        frame(1, 0, &[4]),
    ];
    for f in &frames {
        h.client.write_all(f).unwrap();
    }
    dispatch(&h.debugger);
    for f in &frames {
        let mut got = vec![0; f.len()];
        h.server.read_exact(&mut got).unwrap();
        assert_eq!(&got, f);
    }
}

#[test]
fn events_flow_back_and_delete_id_unbinds() {
    let mut h = harness();
    h.client.write_all(&frame(1, 1, &[2])).unwrap();
    dispatch(&h.debugger);
    assert!(h.conn.resolved().get(2).is_some());
    let event = frame(1, 1, &[2]); // wl_display.delete_id(2)
    h.server.write_all(&event).unwrap();
    dispatch(&h.debugger);
    let mut got = vec![0; event.len()];
    h.client.read_exact(&mut got).unwrap();
    assert_eq!(got, event);
    assert!(h.conn.resolved().get(2).is_none());
}

#[test]
fn counters_track_directions() {
    let h = harness();
    assert_eq!(h.conn.total(), 0);
    h.conn.bump(Direction::FromClient);
    h.conn.bump(Direction::FromClient);
    h.conn.bump(Direction::FromServer);
    assert_eq!(h.conn.count(Direction::FromClient), 2);
    assert_eq!(h.conn.count(Direction::FromServer), 1);
    assert_eq!(h.conn.total(), 3);
}

#[test]
fn peer_close_tears_the_connection_down() {
    let h = harness();
    h.client.shutdown(Shutdown::Both).unwrap();
    drop(h.client);
    dispatch(&h.debugger);
    assert!(h.conn.is_destroyed());
    assert!(h.debugger.connections().is_empty());
    // the last connection is gone and we are not in server mode
    assert!(h.debugger.flags.exit.get());
}

#[test]
fn malformed_header_is_a_protocol_error() {
    let mut h = harness();
    // a header claiming a size of 4 bytes
    let bad = [1u32, 4 << 16];
    h.client.write_all(uapi::as_bytes(&bad[..])).unwrap();
    dispatch(&h.debugger);
    assert!(h.conn.is_destroyed());
}

#[test]
fn injection_reaches_the_server_and_the_resolver() {
    let mut h = harness();
    // craft wl_display.get_registry(new id 2) towards the server
    let words = [1u32, (12 << 16) | 1, 2];
    h.conn
        .inject(&h.debugger, Direction::FromClient, &words);
    let mut got = vec![0; 12];
    h.server.read_exact(&mut got).unwrap();
    assert_eq!(got, uapi::as_bytes(&words[..]));
    assert_eq!(h.conn.resolved().get(2), Some(&wayland::WL_REGISTRY));
}
