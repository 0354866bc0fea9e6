//! The static protocol catalog.
//!
//! Interfaces are described by runtime-walkable tables: a message signature
//! is a slice of [`ArgKind`] that the resolver and the printer interpret
//! against the raw frame body. The catalog bundles the complete core wayland
//! protocol.

use {crate::message::Direction, std::fmt};

#[cfg(test)]
mod tests;
pub mod wayland;

/// A wayland interface.
pub struct Interface {
    pub name: &'static str,
    pub version: u32,
    /// Messages sent by the client, ordered by opcode.
    pub requests: &'static [MessageSpec],
    /// Messages sent by the server, ordered by opcode.
    pub events: &'static [MessageSpec],
}

/// One request or event of an interface.
pub struct MessageSpec {
    pub name: &'static str,
    pub signature: &'static [ArgKind],
}

/// The kind of a single message argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Uint,
    Fixed,
    String,
    OptString,
    Object,
    OptObject,
    /// A newly allocated object id of a statically known interface.
    NewId(&'static Interface),
    /// A newly allocated object id preceded by an (interface name, version)
    /// pair on the wire. Only used by wl_registry.bind.
    AnyNewId,
    Array,
    Fd,
}

impl Interface {
    /// The messages flowing in `direction`, ordered by opcode.
    pub fn messages(&'static self, direction: Direction) -> &'static [MessageSpec] {
        match direction {
            Direction::FromClient => self.requests,
            Direction::FromServer => self.events,
        }
    }

    /// The message with the given opcode in `direction`.
    pub fn message(&'static self, direction: Direction, opcode: u16) -> Option<&'static MessageSpec> {
        self.messages(direction).get(opcode as usize)
    }

    pub fn request(&'static self, opcode: u16) -> Option<&'static MessageSpec> {
        self.requests.get(opcode as usize)
    }

    pub fn event(&'static self, opcode: u16) -> Option<&'static MessageSpec> {
        self.events.get(opcode as usize)
    }
}

impl PartialEq for Interface {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Interface {}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Interface").field(&self.name).finish()
    }
}

impl fmt::Debug for MessageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageSpec").field(&self.name).finish()
    }
}

/// Looks up an interface by name.
pub fn lookup(name: &str) -> Option<&'static Interface> {
    INTERFACES.get(name).copied()
}

/// All interfaces known to the catalog, in no particular order.
pub fn interfaces() -> impl Iterator<Item = &'static Interface> {
    INTERFACES.values().copied()
}

static INTERFACES: phf::Map<&'static str, &'static Interface> = phf::phf_map! {
    "wl_display" => &wayland::WL_DISPLAY,
    "wl_registry" => &wayland::WL_REGISTRY,
    "wl_callback" => &wayland::WL_CALLBACK,
    "wl_compositor" => &wayland::WL_COMPOSITOR,
    "wl_shm_pool" => &wayland::WL_SHM_POOL,
    "wl_shm" => &wayland::WL_SHM,
    "wl_buffer" => &wayland::WL_BUFFER,
    "wl_data_offer" => &wayland::WL_DATA_OFFER,
    "wl_data_source" => &wayland::WL_DATA_SOURCE,
    "wl_data_device" => &wayland::WL_DATA_DEVICE,
    "wl_data_device_manager" => &wayland::WL_DATA_DEVICE_MANAGER,
    "wl_shell" => &wayland::WL_SHELL,
    "wl_shell_surface" => &wayland::WL_SHELL_SURFACE,
    "wl_surface" => &wayland::WL_SURFACE,
    "wl_seat" => &wayland::WL_SEAT,
    "wl_pointer" => &wayland::WL_POINTER,
    "wl_keyboard" => &wayland::WL_KEYBOARD,
    "wl_touch" => &wayland::WL_TOUCH,
    "wl_output" => &wayland::WL_OUTPUT,
    "wl_region" => &wayland::WL_REGION,
    "wl_subcompositor" => &wayland::WL_SUBCOMPOSITOR,
    "wl_subsurface" => &wayland::WL_SUBSURFACE,
};
