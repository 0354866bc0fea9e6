use {
    crate::trans::{FlushResult, InputBuffer, MAX_FRAME_SIZE, OutputQueue, TransError, read_frame},
    std::{
        collections::VecDeque,
        io::Read,
        os::{
            fd::{AsRawFd, OwnedFd},
            unix::net::UnixStream,
        },
        rc::Rc,
    },
    uapi::c,
};

fn pair() -> (OwnedFd, OwnedFd) {
    let (a, b) = uapi::socketpair(c::AF_UNIX, c::SOCK_STREAM | c::SOCK_CLOEXEC, 0).unwrap();
    (a.into(), b.into())
}

fn frame(object_id: u32, opcode: u16, payload: &[u32]) -> Vec<u32> {
    let size = ((payload.len() + 2) * 4) as u32;
    let mut words = vec![object_id, (size << 16) | opcode as u32];
    words.extend_from_slice(payload);
    words
}

fn read_one(
    fd: &OwnedFd,
    buffer: &mut InputBuffer,
    fds: &mut VecDeque<Rc<OwnedFd>>,
) -> Result<Option<Vec<u32>>, TransError> {
    let mut may_read = true;
    Ok(read_frame(fd.as_raw_fd(), &mut may_read, buffer, fds)?.map(|f| f.to_vec()))
}

#[test]
fn roundtrip() {
    let (a, b) = pair();
    let mut queue = OutputQueue::default();
    let msg = frame(1, 1, &[2]);
    queue.push_frame(uapi::as_bytes(&msg[..]), &[]);
    assert_eq!(queue.flush(a.as_raw_fd()).unwrap(), FlushResult::Done);
    assert!(queue.is_empty());
    let mut buffer = InputBuffer::default();
    let mut fds = VecDeque::new();
    let read = read_one(&b, &mut buffer, &mut fds).unwrap().unwrap();
    assert_eq!(read, msg);
    assert!(fds.is_empty());
}

#[test]
fn several_frames_one_read() {
    let (a, b) = pair();
    let mut queue = OutputQueue::default();
    let msgs = [frame(1, 0, &[2]), frame(3, 6, &[]), frame(1, 1, &[4])];
    for msg in &msgs {
        queue.push_frame(uapi::as_bytes(&msg[..]), &[]);
    }
    queue.flush(a.as_raw_fd()).unwrap();
    let mut buffer = InputBuffer::default();
    let mut fds = VecDeque::new();
    let mut may_read = true;
    for msg in &msgs {
        let read = read_frame(b.as_raw_fd(), &mut may_read, &mut buffer, &mut fds)
            .unwrap()
            .unwrap();
        assert_eq!(read, &msg[..]);
    }
    assert!(
        read_frame(b.as_raw_fd(), &mut may_read, &mut buffer, &mut fds)
            .unwrap()
            .is_none()
    );
}

#[test]
fn split_delivery() {
    let (a, b) = pair();
    let msg = frame(1, 1, &[2]);
    let bytes = uapi::as_bytes(&msg[..]);
    let mut queue = OutputQueue::default();
    let mut buffer = InputBuffer::default();
    let mut fds = VecDeque::new();
    queue.push_frame(&bytes[..4], &[]);
    queue.flush(a.as_raw_fd()).unwrap();
    assert!(read_one(&b, &mut buffer, &mut fds).unwrap().is_none());
    queue.push_frame(&bytes[4..8], &[]);
    queue.flush(a.as_raw_fd()).unwrap();
    // complete header, but the body is still missing
    assert!(read_one(&b, &mut buffer, &mut fds).unwrap().is_none());
    queue.push_frame(&bytes[8..], &[]);
    queue.flush(a.as_raw_fd()).unwrap();
    let read = read_one(&b, &mut buffer, &mut fds).unwrap().unwrap();
    assert_eq!(read, msg);
}

#[test]
fn fd_passing() {
    let (a, b) = pair();
    let memfd: Rc<OwnedFd> = Rc::new(uapi::memfd_create("", 0).unwrap().into());
    let msg = frame(4, 0, &[5, 1024]);
    let mut queue = OutputQueue::default();
    queue.push_frame(uapi::as_bytes(&msg[..]), &[memfd.clone()]);
    queue.flush(a.as_raw_fd()).unwrap();
    let mut buffer = InputBuffer::default();
    let mut fds = VecDeque::new();
    let read = read_one(&b, &mut buffer, &mut fds).unwrap().unwrap();
    assert_eq!(read, msg);
    assert_eq!(fds.len(), 1);
    let received = fds.pop_front().unwrap();
    assert_eq!(
        uapi::fstat(memfd.as_raw_fd()).unwrap().st_ino,
        uapi::fstat(received.as_raw_fd()).unwrap().st_ino,
    );
}

#[test]
fn eof_is_closed() {
    let (a, b) = pair();
    drop(a);
    let mut buffer = InputBuffer::default();
    let mut fds = VecDeque::new();
    assert!(matches!(
        read_one(&b, &mut buffer, &mut fds),
        Err(TransError::Closed)
    ));
}

#[test]
fn frame_too_small() {
    expect_size_error(4, |e| matches!(e, TransError::FrameTooSmall(4)));
}

#[test]
fn frame_too_large() {
    expect_size_error(8000, |e| matches!(e, TransError::FrameTooLarge(8000)));
}

#[test]
fn frame_not_aligned() {
    expect_size_error(10, |e| matches!(e, TransError::FrameNotAligned(10)));
}

fn expect_size_error(size: u32, check: impl Fn(&TransError) -> bool) {
    let (a, b) = pair();
    let header = [1u32, size << 16];
    let mut queue = OutputQueue::default();
    queue.push_frame(uapi::as_bytes(&header[..]), &[]);
    queue.flush(a.as_raw_fd()).unwrap();
    let mut buffer = InputBuffer::default();
    let mut fds = VecDeque::new();
    let err = read_one(&b, &mut buffer, &mut fds).unwrap_err();
    assert!(check(&err), "unexpected error: {err:?}");
}

#[test]
fn blocked_flush_resumes() {
    let (a, b) = pair();
    let payload = vec![0x55aa55aau32; MAX_FRAME_SIZE / 4 - 2];
    let msg = frame(1, 0, &payload);
    let bytes = uapi::as_bytes(&msg[..]);
    const NUM_FRAMES: usize = 512;
    let mut queue = OutputQueue::default();
    for _ in 0..NUM_FRAMES {
        queue.push_frame(bytes, &[]);
    }
    let mut blocked = false;
    let mut received = 0usize;
    let mut reader = UnixStream::from(b);
    reader.set_nonblocking(true).unwrap();
    let mut scratch = vec![0u8; 1 << 16];
    loop {
        match queue.flush(a.as_raw_fd()).unwrap() {
            FlushResult::Done => break,
            FlushResult::Blocked => blocked = true,
        }
        loop {
            match reader.read(&mut scratch) {
                Ok(n) => received += n,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => panic!("{e}"),
            }
        }
    }
    assert!(blocked);
    drop(a);
    reader.set_nonblocking(false).unwrap();
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).unwrap();
    received += rest.len();
    assert_eq!(received, NUM_FRAMES * bytes.len());
}
