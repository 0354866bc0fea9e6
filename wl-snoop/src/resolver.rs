//! The per-connection table of resolved objects.
//!
//! The table maps live object ids to their interfaces. It feeds itself: after
//! every intercepted message the broker calls [`ResolvedObjects::examine`],
//! which walks the message signature and binds the ids carried by `new_id`
//! arguments. Ids are released again when the server sends
//! `wl_display.delete_id`.

use {
    crate::{
        message::{Direction, Message},
        protocols::{self, ArgKind, Interface, MessageSpec, wayland},
    },
    std::{
        collections::{HashMap, hash_map::Entry},
        ptr,
    },
    thiserror::Error,
};


/// The id of the wl_display singleton.
pub const DISPLAY_ID: u32 = 1;

const WL_DISPLAY_DELETE_ID: u16 = 1;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("object {0} is already bound to {1}")]
    AlreadyBound(u32, &'static str),
    #[error("message body ends in the middle of an argument")]
    Truncated,
    #[error("message body contains a string that is not valid utf-8")]
    BadString,
}

/// The object table of one connection.
pub struct ResolvedObjects {
    objects: HashMap<u32, &'static Interface>,
}

impl ResolvedObjects {
    /// Creates a table with the display singleton pre-bound.
    pub fn new() -> Self {
        let mut objects = HashMap::new();
        objects.insert(DISPLAY_ID, &wayland::WL_DISPLAY);
        Self { objects }
    }

    /// Returns the interface bound to `id`, if any.
    pub fn get(&self, id: u32) -> Option<&'static Interface> {
        self.objects.get(&id).copied()
    }

    /// Looks up an interface of the catalog by name.
    ///
    /// This is a registry lookup, not a table lookup; it exists so that
    /// operators can name interfaces when creating breakpoints.
    pub fn interface_by_name(&self, name: &str) -> Option<&'static Interface> {
        protocols::lookup(name)
    }

    /// Binds `id` to `interface`. Binding a live id is a protocol error.
    pub fn bind(&mut self, id: u32, interface: &'static Interface) -> Result<(), ResolveError> {
        match self.objects.entry(id) {
            Entry::Occupied(e) => Err(ResolveError::AlreadyBound(id, e.get().name)),
            Entry::Vacant(v) => {
                v.insert(interface);
                Ok(())
            }
        }
    }

    /// Removes `id` from the table. Unbinding an absent id is a no-op.
    pub fn unbind(&mut self, id: u32) {
        if self.objects.remove(&id).is_none() {
            log::debug!("delete_id for object {id} which is not in the table");
        }
    }

    /// Visits every (id, interface) pair. The order is unspecified.
    pub fn iterate(&self, mut f: impl FnMut(u32, &'static Interface)) {
        for (id, interface) in &self.objects {
            f(*id, interface);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolves the message spec governing `msg`, if both the object and the
    /// opcode are known.
    pub fn spec_for(&self, msg: &Message) -> Option<&'static MessageSpec> {
        self.get(msg.object_id())?
            .message(msg.direction(), msg.opcode())
    }

    /// The number of file descriptors `msg` carries according to its
    /// signature, or `None` if the message cannot be resolved.
    pub fn num_fds(&self, msg: &Message) -> Option<usize> {
        let spec = self.spec_for(msg)?;
        Some(
            spec.signature
                .iter()
                .filter(|a| matches!(a, ArgKind::Fd))
                .count(),
        )
    }

    /// Updates the table from one intercepted message.
    ///
    /// Every `new_id` argument binds its id; `wl_display.delete_id` unbinds
    /// the carried id. Messages whose object or opcode cannot be resolved are
    /// ignored; a malformed body is an error.
    pub fn examine(&mut self, msg: &Message) -> Result<(), ResolveError> {
        let Some(interface) = self.get(msg.object_id()) else {
            log::debug!(
                "cannot resolve object {} of a {} message",
                msg.object_id(),
                msg.direction().sender(),
            );
            return Ok(());
        };
        let Some(spec) = interface.message(msg.direction(), msg.opcode()) else {
            log::debug!(
                "{} has no {} message with opcode {}",
                interface.name,
                msg.direction().sender(),
                msg.opcode(),
            );
            return Ok(());
        };
        if msg.direction() == Direction::FromServer
            && ptr::eq(interface, &wayland::WL_DISPLAY)
            && msg.opcode() == WL_DISPLAY_DELETE_ID
        {
            let id = Body::new(msg.words()).word()?;
            self.unbind(id);
            return Ok(());
        }
        let mut body = Body::new(msg.words());
        for arg in spec.signature {
            match arg {
                ArgKind::Int
                | ArgKind::Uint
                | ArgKind::Fixed
                | ArgKind::Object
                | ArgKind::OptObject => {
                    body.word()?;
                }
                ArgKind::String | ArgKind::OptString => {
                    body.string()?;
                }
                ArgKind::Array => {
                    body.array()?;
                }
                ArgKind::Fd => {}
                ArgKind::NewId(interface) => {
                    let id = body.word()?;
                    self.bind(id, *interface)?;
                }
                ArgKind::AnyNewId => {
                    let name = body.string()?;
                    let _version = body.word()?;
                    let id = body.word()?;
                    match name.and_then(protocols::lookup) {
                        Some(interface) => self.bind(id, interface)?,
                        None => log::debug!(
                            "bind of object {id} to unknown interface {name:?}"
                        ),
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for ResolvedObjects {
    fn default() -> Self {
        Self::new()
    }
}

/// A cursor over the body of a message, after the two header words.
pub(crate) struct Body<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> Body<'a> {
    pub(crate) fn new(words: &'a [u32]) -> Self {
        Self { words, pos: 2 }
    }

    pub(crate) fn word(&mut self) -> Result<u32, ResolveError> {
        let w = *self.words.get(self.pos).ok_or(ResolveError::Truncated)?;
        self.pos += 1;
        Ok(w)
    }

    /// Reads a string argument. `None` is a null string.
    pub(crate) fn string(&mut self) -> Result<Option<&'a str>, ResolveError> {
        let len = self.word()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let num_words = len.div_ceil(4);
        let payload = self
            .words
            .get(self.pos..self.pos + num_words)
            .ok_or(ResolveError::Truncated)?;
        self.pos += num_words;
        // len includes the terminating NUL
        let bytes = &uapi::as_bytes(payload)[..len - 1];
        str::from_utf8(bytes)
            .map(Some)
            .map_err(|_| ResolveError::BadString)
    }

    /// Reads an array argument, returning its length in bytes.
    pub(crate) fn array(&mut self) -> Result<usize, ResolveError> {
        let len = self.word()? as usize;
        let num_words = len.div_ceil(4);
        if self.pos + num_words > self.words.len() {
            return Err(ResolveError::Truncated);
        }
        self.pos += num_words;
        Ok(len)
    }
}
