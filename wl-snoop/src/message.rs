//! Intercepted wire messages.

use {
    crate::trans::{MAX_FRAME_SIZE, MAX_FRAME_WORDS, WORD_SIZE},
    std::{os::fd::OwnedFd, rc::Rc},
    thiserror::Error,
};

/// The direction a message travels in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    /// A request, sent by the client towards the server.
    FromClient,
    /// An event, sent by the server towards the client.
    FromServer,
}

impl Direction {
    /// Returns the direction the reply would travel in.
    pub fn opposite(self) -> Self {
        match self {
            Direction::FromClient => Direction::FromServer,
            Direction::FromServer => Direction::FromClient,
        }
    }

    /// Returns the name of the sender, `client` or `server`.
    pub fn sender(self) -> &'static str {
        match self {
            Direction::FromClient => "client",
            Direction::FromServer => "server",
        }
    }
}

/// An error emitted when rewriting a message buffer.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("a message cannot be larger than {MAX_FRAME_SIZE} bytes, got {0}")]
    TooLarge(usize),
}

/// One intercepted message.
///
/// The buffer holds the raw frame exactly as it was read from the socket,
/// header words included. Passes may mutate the buffer in place or replace it
/// wholesale via [`Message::set_bytes`].
pub struct Message {
    direction: Direction,
    words: [u32; MAX_FRAME_WORDS],
    size: usize,
    /// File descriptors that arrived alongside this message.
    pub fds: Vec<Rc<OwnedFd>>,
}

impl Message {
    pub(crate) fn empty(direction: Direction) -> Self {
        Self {
            direction,
            words: [0; MAX_FRAME_WORDS],
            size: 0,
            fds: Vec::new(),
        }
    }

    /// Copies direction, buffer and size from `other`. File descriptors are
    /// not carried over.
    pub(crate) fn copy_from(&mut self, other: &Message) {
        self.direction = other.direction;
        self.words = other.words;
        self.size = other.size;
        self.fds.clear();
    }

    /// Replaces the content of this message with a freshly read frame.
    pub(crate) fn reset(&mut self, direction: Direction, frame: &[u32]) {
        self.direction = direction;
        self.words[..frame.len()].copy_from_slice(frame);
        self.size = frame.len() * WORD_SIZE;
        self.fds.clear();
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The size of the message in bytes. At least 8 for well-formed frames.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The id of the object this message is addressed to.
    pub fn object_id(&self) -> u32 {
        self.words[0]
    }

    /// The opcode within the receiving interface.
    pub fn opcode(&self) -> u16 {
        self.words[1] as u16
    }

    /// The message as words, header included.
    ///
    /// When an editor rewrote the buffer to a size that is not word aligned,
    /// the trailing partial word is not included.
    pub fn words(&self) -> &[u32] {
        &self.words[..self.size / WORD_SIZE]
    }

    /// The message as bytes, header included.
    pub fn bytes(&self) -> &[u8] {
        &uapi::as_bytes(&self.words[..])[..self.size]
    }

    /// Replaces the raw bytes of this message.
    ///
    /// The size of the message becomes `bytes.len()`. No header validation is
    /// performed; the operator is allowed to craft malformed traffic.
    pub fn set_bytes(&mut self, bytes: &[u8]) -> Result<(), MessageError> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(MessageError::TooLarge(bytes.len()));
        }
        uapi::as_bytes_mut(&mut self.words[..])[..bytes.len()].copy_from_slice(bytes);
        self.size = bytes.len();
        Ok(())
    }
}
