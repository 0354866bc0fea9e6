pub(crate) const XDG_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";
pub(crate) const WAYLAND_DISPLAY: &str = "WAYLAND_DISPLAY";
pub(crate) const WAYLAND_SOCKET: &str = "WAYLAND_SOCKET";
pub(crate) const EDITOR: &str = "EDITOR";

pub(crate) const DEFAULT_DISPLAY: &str = "wayland-0";
