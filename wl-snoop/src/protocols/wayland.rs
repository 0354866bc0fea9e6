//! Interface tables for the core wayland protocol.

use super::{
    ArgKind::{self, *},
    Interface, MessageSpec,
};

const fn msg(name: &'static str, signature: &'static [ArgKind]) -> MessageSpec {
    MessageSpec { name, signature }
}

pub static WL_DISPLAY: Interface = Interface {
    name: "wl_display",
    version: 1,
    requests: &[
        msg("sync", &[NewId(&WL_CALLBACK)]),
        msg("get_registry", &[NewId(&WL_REGISTRY)]),
    ],
    events: &[
        msg("error", &[Object, Uint, String]),
        msg("delete_id", &[Uint]),
    ],
};

pub static WL_REGISTRY: Interface = Interface {
    name: "wl_registry",
    version: 1,
    requests: &[msg("bind", &[Uint, AnyNewId])],
    events: &[
        msg("global", &[Uint, String, Uint]),
        msg("global_remove", &[Uint]),
    ],
};

pub static WL_CALLBACK: Interface = Interface {
    name: "wl_callback",
    version: 1,
    requests: &[],
    events: &[msg("done", &[Uint])],
};

pub static WL_COMPOSITOR: Interface = Interface {
    name: "wl_compositor",
    version: 6,
    requests: &[
        msg("create_surface", &[NewId(&WL_SURFACE)]),
        msg("create_region", &[NewId(&WL_REGION)]),
    ],
    events: &[],
};

pub static WL_SHM_POOL: Interface = Interface {
    name: "wl_shm_pool",
    version: 2,
    requests: &[
        msg(
            "create_buffer",
            &[NewId(&WL_BUFFER), Int, Int, Int, Int, Uint],
        ),
        msg("destroy", &[]),
        msg("resize", &[Int]),
    ],
    events: &[],
};

pub static WL_SHM: Interface = Interface {
    name: "wl_shm",
    version: 2,
    requests: &[
        msg("create_pool", &[NewId(&WL_SHM_POOL), Fd, Int]),
        msg("release", &[]),
    ],
    events: &[msg("format", &[Uint])],
};

pub static WL_BUFFER: Interface = Interface {
    name: "wl_buffer",
    version: 1,
    requests: &[msg("destroy", &[])],
    events: &[msg("release", &[])],
};

pub static WL_DATA_OFFER: Interface = Interface {
    name: "wl_data_offer",
    version: 3,
    requests: &[
        msg("accept", &[Uint, OptString]),
        msg("receive", &[String, Fd]),
        msg("destroy", &[]),
        msg("finish", &[]),
        msg("set_actions", &[Uint, Uint]),
    ],
    events: &[
        msg("offer", &[String]),
        msg("source_actions", &[Uint]),
        msg("action", &[Uint]),
    ],
};

pub static WL_DATA_SOURCE: Interface = Interface {
    name: "wl_data_source",
    version: 3,
    requests: &[
        msg("offer", &[String]),
        msg("destroy", &[]),
        msg("set_actions", &[Uint]),
    ],
    events: &[
        msg("target", &[OptString]),
        msg("send", &[String, Fd]),
        msg("cancelled", &[]),
        msg("dnd_drop_performed", &[]),
        msg("dnd_finished", &[]),
        msg("action", &[Uint]),
    ],
};

pub static WL_DATA_DEVICE: Interface = Interface {
    name: "wl_data_device",
    version: 3,
    requests: &[
        msg("start_drag", &[OptObject, Object, OptObject, Uint]),
        msg("set_selection", &[OptObject, Uint]),
        msg("release", &[]),
    ],
    events: &[
        msg("data_offer", &[NewId(&WL_DATA_OFFER)]),
        msg("enter", &[Uint, Object, Fixed, Fixed, OptObject]),
        msg("leave", &[]),
        msg("motion", &[Uint, Fixed, Fixed]),
        msg("drop", &[]),
        msg("selection", &[OptObject]),
    ],
};

pub static WL_DATA_DEVICE_MANAGER: Interface = Interface {
    name: "wl_data_device_manager",
    version: 3,
    requests: &[
        msg("create_data_source", &[NewId(&WL_DATA_SOURCE)]),
        msg("get_data_device", &[NewId(&WL_DATA_DEVICE), Object]),
    ],
    events: &[],
};

pub static WL_SHELL: Interface = Interface {
    name: "wl_shell",
    version: 1,
    requests: &[msg(
        "get_shell_surface",
        &[NewId(&WL_SHELL_SURFACE), Object],
    )],
    events: &[],
};

pub static WL_SHELL_SURFACE: Interface = Interface {
    name: "wl_shell_surface",
    version: 1,
    requests: &[
        msg("pong", &[Uint]),
        msg("move", &[Object, Uint]),
        msg("resize", &[Object, Uint, Uint]),
        msg("set_toplevel", &[]),
        msg("set_transient", &[Object, Int, Int, Uint]),
        msg("set_fullscreen", &[Uint, Uint, OptObject]),
        msg("set_popup", &[Object, Uint, Object, Int, Int, Uint]),
        msg("set_maximized", &[OptObject]),
        msg("set_title", &[String]),
        msg("set_class", &[String]),
    ],
    events: &[
        msg("ping", &[Uint]),
        msg("configure", &[Uint, Int, Int]),
        msg("popup_done", &[]),
    ],
};

pub static WL_SURFACE: Interface = Interface {
    name: "wl_surface",
    version: 6,
    requests: &[
        msg("destroy", &[]),
        msg("attach", &[OptObject, Int, Int]),
        msg("damage", &[Int, Int, Int, Int]),
        msg("frame", &[NewId(&WL_CALLBACK)]),
        msg("set_opaque_region", &[OptObject]),
        msg("set_input_region", &[OptObject]),
        msg("commit", &[]),
        msg("set_buffer_transform", &[Int]),
        msg("set_buffer_scale", &[Int]),
        msg("damage_buffer", &[Int, Int, Int, Int]),
        msg("offset", &[Int, Int]),
    ],
    events: &[
        msg("enter", &[Object]),
        msg("leave", &[Object]),
        msg("preferred_buffer_scale", &[Int]),
        msg("preferred_buffer_transform", &[Uint]),
    ],
};

pub static WL_SEAT: Interface = Interface {
    name: "wl_seat",
    version: 9,
    requests: &[
        msg("get_pointer", &[NewId(&WL_POINTER)]),
        msg("get_keyboard", &[NewId(&WL_KEYBOARD)]),
        msg("get_touch", &[NewId(&WL_TOUCH)]),
        msg("release", &[]),
    ],
    events: &[msg("capabilities", &[Uint]), msg("name", &[String])],
};

pub static WL_POINTER: Interface = Interface {
    name: "wl_pointer",
    version: 9,
    requests: &[
        msg("set_cursor", &[Uint, OptObject, Int, Int]),
        msg("release", &[]),
    ],
    events: &[
        msg("enter", &[Uint, Object, Fixed, Fixed]),
        msg("leave", &[Uint, Object]),
        msg("motion", &[Uint, Fixed, Fixed]),
        msg("button", &[Uint, Uint, Uint, Uint]),
        msg("axis", &[Uint, Uint, Fixed]),
        msg("frame", &[]),
        msg("axis_source", &[Uint]),
        msg("axis_stop", &[Uint, Uint]),
        msg("axis_discrete", &[Uint, Int]),
        msg("axis_value120", &[Uint, Int]),
        msg("axis_relative_direction", &[Uint, Uint]),
    ],
};

pub static WL_KEYBOARD: Interface = Interface {
    name: "wl_keyboard",
    version: 9,
    requests: &[msg("release", &[])],
    events: &[
        msg("keymap", &[Uint, Fd, Uint]),
        msg("enter", &[Uint, Object, Array]),
        msg("leave", &[Uint, Object]),
        msg("key", &[Uint, Uint, Uint, Uint]),
        msg("modifiers", &[Uint, Uint, Uint, Uint, Uint]),
        msg("repeat_info", &[Int, Int]),
    ],
};

pub static WL_TOUCH: Interface = Interface {
    name: "wl_touch",
    version: 9,
    requests: &[msg("release", &[])],
    events: &[
        msg("down", &[Uint, Uint, Object, Int, Fixed, Fixed]),
        msg("up", &[Uint, Uint, Int]),
        msg("motion", &[Uint, Int, Fixed, Fixed]),
        msg("frame", &[]),
        msg("cancel", &[]),
        msg("shape", &[Int, Fixed, Fixed]),
        msg("orientation", &[Int, Fixed]),
    ],
};

pub static WL_OUTPUT: Interface = Interface {
    name: "wl_output",
    version: 4,
    requests: &[msg("release", &[])],
    events: &[
        msg(
            "geometry",
            &[Int, Int, Int, Int, Int, String, String, Int],
        ),
        msg("mode", &[Uint, Int, Int, Int]),
        msg("done", &[]),
        msg("scale", &[Int]),
        msg("name", &[String]),
        msg("description", &[String]),
    ],
};

pub static WL_REGION: Interface = Interface {
    name: "wl_region",
    version: 1,
    requests: &[
        msg("destroy", &[]),
        msg("add", &[Int, Int, Int, Int]),
        msg("subtract", &[Int, Int, Int, Int]),
    ],
    events: &[],
};

pub static WL_SUBCOMPOSITOR: Interface = Interface {
    name: "wl_subcompositor",
    version: 1,
    requests: &[
        msg("destroy", &[]),
        msg("get_subsurface", &[NewId(&WL_SUBSURFACE), Object, Object]),
    ],
    events: &[],
};

pub static WL_SUBSURFACE: Interface = Interface {
    name: "wl_subsurface",
    version: 1,
    requests: &[
        msg("destroy", &[]),
        msg("set_position", &[Int, Int]),
        msg("place_above", &[Object]),
        msg("place_below", &[Object]),
        msg("set_sync", &[]),
        msg("set_desync", &[]),
    ],
    events: &[],
};
