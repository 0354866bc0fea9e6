use crate::{
    message::{Direction, Message},
    print::{message_name, render},
    protocols::wayland,
    resolver::ResolvedObjects,
};

fn msg(direction: Direction, object_id: u32, opcode: u16, payload: &[u32]) -> Box<Message> {
    let size = ((payload.len() + 2) * 4) as u32;
    let mut words = vec![object_id, (size << 16) | opcode as u32];
    words.extend_from_slice(payload);
    let mut m = Box::new(Message::empty(direction));
    m.reset(direction, &words);
    m
}

fn str_words(s: &str) -> Vec<u32> {
    let len = s.len() + 1;
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    let mut words = vec![len as u32];
    for chunk in bytes.chunks(4) {
        words.push(u32::from_ne_bytes(chunk.try_into().unwrap()));
    }
    words
}

#[test]
fn names_for_filters() {
    let ro = ResolvedObjects::new();
    let sync = msg(Direction::FromClient, 1, 0, &[2]);
    assert_eq!(message_name(&ro, &sync), "wl_display.sync");
    let unknown_object = msg(Direction::FromClient, 9, 3, &[]);
    assert_eq!(message_name(&ro, &unknown_object), "unknown@9.3");
    let unknown_opcode = msg(Direction::FromClient, 1, 9, &[]);
    assert_eq!(message_name(&ro, &unknown_opcode), "wl_display.9");
}

#[test]
fn render_new_id() {
    let ro = ResolvedObjects::new();
    let m = msg(Direction::FromClient, 1, 1, &[2]);
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "client -> wl_display@1.get_registry(new id wl_registry@2)",
    );
}

#[test]
fn render_fixed_and_uint() {
    let mut ro = ResolvedObjects::new();
    ro.bind(3, &wayland::WL_POINTER).unwrap();
    let m = msg(Direction::FromServer, 3, 2, &[1000, 1408, 512]);
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "server -> wl_pointer@3.motion(1000, 5.5, 2)",
    );
}

#[test]
fn render_string() {
    let mut ro = ResolvedObjects::new();
    ro.bind(3, &wayland::WL_OUTPUT).unwrap();
    let m = msg(Direction::FromServer, 3, 4, &str_words("DP-1"));
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "server -> wl_output@3.name(\"DP-1\")",
    );
}

#[test]
fn render_object_and_nil() {
    let mut ro = ResolvedObjects::new();
    ro.bind(3, &wayland::WL_SURFACE).unwrap();
    // attach(nil, 0, 0)
    let m = msg(Direction::FromClient, 3, 1, &[0, 0, 0]);
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "client -> wl_surface@3.attach(nil, 0, 0)",
    );
    let m = msg(Direction::FromClient, 3, 1, &[7, 1, -2i32 as u32]);
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "client -> wl_surface@3.attach(obj@7, 1, -2)",
    );
}

#[test]
fn render_unresolvable_falls_back_to_raw() {
    let ro = ResolvedObjects::new();
    let m = msg(Direction::FromClient, 9, 3, &[]);
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "client -> unknown@9.3 [8 bytes]",
    );
}

#[test]
fn render_truncated_body() {
    let ro = ResolvedObjects::new();
    // get_registry without its new_id word
    let m = msg(Direction::FromClient, 1, 1, &[]);
    assert_eq!(
        format!("{}", render(&ro, &m)),
        "client -> wl_display@1.get_registry(<truncated>)",
    );
}
