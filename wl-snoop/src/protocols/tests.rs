use {
    crate::{
        message::Direction,
        protocols::{self, ArgKind, wayland},
    },
    std::ptr,
};

#[test]
fn lookup_by_name() {
    assert!(ptr::eq(
        protocols::lookup("wl_display").unwrap(),
        &wayland::WL_DISPLAY,
    ));
    assert!(ptr::eq(
        protocols::lookup("wl_subsurface").unwrap(),
        &wayland::WL_SUBSURFACE,
    ));
    assert!(protocols::lookup("wl_does_not_exist").is_none());
}

#[test]
fn opcodes_are_positional() {
    assert_eq!(wayland::WL_DISPLAY.request(0).unwrap().name, "sync");
    assert_eq!(wayland::WL_DISPLAY.request(1).unwrap().name, "get_registry");
    assert!(wayland::WL_DISPLAY.request(2).is_none());
    assert_eq!(wayland::WL_DISPLAY.event(1).unwrap().name, "delete_id");
    assert_eq!(wayland::WL_SURFACE.request(6).unwrap().name, "commit");
    assert_eq!(wayland::WL_POINTER.event(3).unwrap().name, "button");
}

#[test]
fn direction_tables() {
    assert_eq!(
        wayland::WL_DISPLAY.messages(Direction::FromClient).len(),
        2,
    );
    assert_eq!(
        wayland::WL_DISPLAY.messages(Direction::FromServer).len(),
        2,
    );
    assert!(
        wayland::WL_COMPOSITOR
            .messages(Direction::FromServer)
            .is_empty()
    );
}

#[test]
fn catalog_is_complete() {
    assert_eq!(protocols::interfaces().count(), 22);
    for interface in protocols::interfaces() {
        assert!(interface.name.starts_with("wl_"));
        assert!(interface.version >= 1);
    }
}

#[test]
fn bind_signature() {
    let bind = wayland::WL_REGISTRY.request(0).unwrap();
    assert_eq!(bind.name, "bind");
    assert_eq!(bind.signature, &[ArgKind::Uint, ArgKind::AnyNewId][..]);
}

#[test]
fn typed_new_id_points_at_interface() {
    let sync = wayland::WL_DISPLAY.request(0).unwrap();
    match sync.signature {
        [ArgKind::NewId(interface)] => assert!(ptr::eq(*interface, &wayland::WL_CALLBACK)),
        _ => panic!("unexpected signature"),
    }
}
