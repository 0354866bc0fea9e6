use {
    super::{
        Interactive, editor,
        commands::{self, CmdResult, ReplCtx},
    },
    crate::{
        debugger::Debugger,
        message::{Direction, Message},
        protocols::wayland,
        resolver::ResolvedObjects,
    },
    std::{fs, os::unix::fs::PermissionsExt},
};

fn interactive() -> Interactive {
    Interactive {
        stop: false,
        skip_first_query: false,
        breakpoints: Vec::new(),
        next_breakpoint_id: 1,
        filters: Vec::new(),
        last_command: None,
        current: None,
    }
}

fn msg(direction: Direction, object_id: u32, opcode: u16, payload: &[u32]) -> Box<Message> {
    let size = ((payload.len() + 2) * 4) as u32;
    let mut words = vec![object_id, (size << 16) | opcode as u32];
    words.extend_from_slice(payload);
    let mut m = Box::new(Message::empty(direction));
    m.reset(direction, &words);
    m
}

#[test]
fn break_on_side() {
    let mut wi = interactive();
    wi.create_breakpoint("client").unwrap();
    let ro = ResolvedObjects::new();
    let b = &wi.breakpoints[0];
    assert!(b.matches(&ro, &msg(Direction::FromClient, 1, 0, &[2])));
    assert!(!b.matches(&ro, &msg(Direction::FromServer, 1, 0, &[2])));
}

#[test]
fn break_on_id() {
    let mut wi = interactive();
    wi.create_breakpoint("id 7").unwrap();
    let ro = ResolvedObjects::new();
    let b = &wi.breakpoints[0];
    assert!(b.matches(&ro, &msg(Direction::FromClient, 7, 0, &[])));
    assert!(!b.matches(&ro, &msg(Direction::FromClient, 8, 0, &[])));
}

#[test]
fn break_on_name_hits_every_object_of_the_interface() {
    let mut wi = interactive();
    wi.create_breakpoint("wl_surface@commit").unwrap();
    let mut ro = ResolvedObjects::new();
    ro.bind(3, &wayland::WL_SURFACE).unwrap();
    ro.bind(9, &wayland::WL_SURFACE).unwrap();
    ro.bind(5, &wayland::WL_SHELL_SURFACE).unwrap();
    let b = &wi.breakpoints[0];
    // commit is opcode 6
    assert!(b.matches(&ro, &msg(Direction::FromClient, 3, 6, &[])));
    assert!(b.matches(&ro, &msg(Direction::FromClient, 9, 6, &[])));
    // same opcode on another interface (wl_shell_surface.set_popup)
    assert!(!b.matches(&ro, &msg(Direction::FromClient, 5, 6, &[])));
    // same opcode in the event direction resolves to nothing
    assert!(!b.matches(&ro, &msg(Direction::FromServer, 3, 6, &[])));
    // unknown object
    assert!(!b.matches(&ro, &msg(Direction::FromClient, 77, 6, &[])));
}

#[test]
fn breakpoint_parse_errors() {
    use super::BreakpointError;
    let mut wi = interactive();
    assert!(matches!(
        wi.create_breakpoint("wl_nope@foo"),
        Err(BreakpointError::UnknownInterface)
    ));
    assert!(matches!(
        wi.create_breakpoint("wl_surface@nope"),
        Err(BreakpointError::UnknownMessage)
    ));
    assert!(matches!(
        wi.create_breakpoint("garbage"),
        Err(BreakpointError::BadSyntax)
    ));
    assert!(matches!(
        wi.create_breakpoint("id x"),
        Err(BreakpointError::BadId)
    ));
    assert!(wi.breakpoints.is_empty());
}

#[test]
fn breakpoint_ids_grow_and_delete_works() {
    let mut wi = interactive();
    let a = wi.create_breakpoint("client").unwrap();
    let b = wi.create_breakpoint("server").unwrap();
    assert!(a < b);
    assert!(wi.delete_breakpoint(a));
    assert!(!wi.delete_breakpoint(a));
    assert_eq!(wi.breakpoints.len(), 1);
    assert_eq!(wi.breakpoints[0].id, b);
}

#[test]
fn hide_filters() {
    let mut wi = interactive();
    wi.add_filter("^wl_display\\.sync$", false).unwrap();
    assert!(wi.filter_match("wl_display.sync"));
    assert!(!wi.filter_match("wl_display.get_registry"));
}

#[test]
fn show_only_filters() {
    let mut wi = interactive();
    wi.add_filter("wl_surface\\..*", true).unwrap();
    assert!(wi.filter_match("wl_compositor.create_surface"));
    assert!(!wi.filter_match("wl_surface.attach"));
}

#[test]
fn bad_regex_is_rejected() {
    let mut wi = interactive();
    assert!(wi.add_filter("(", false).is_err());
    assert!(wi.filters.is_empty());
}

#[test]
fn command_matching() {
    let debugger = Debugger::new().unwrap();
    let mut wi = interactive();
    let mut ctx = ReplCtx {
        debugger: &debugger,
        current: None,
    };
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "bogus"),
        CmdResult::DontMatch
    );
    // word boundary required
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "breakx"),
        CmdResult::DontMatch
    );
    // short alias with arguments
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "b id 7"),
        CmdResult::ContinueQuery
    );
    assert_eq!(wi.breakpoints.len(), 1);
    // "so" must not be swallowed by the "s" alias of send
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "so wl_surface\\..*"),
        CmdResult::ContinueQuery
    );
    assert_eq!(wi.filters.len(), 1);
    assert!(wi.filters[0].show_only);
}

#[test]
fn stepping_commands_respect_the_running_flag() {
    let debugger = Debugger::new().unwrap();
    let mut wi = interactive();
    let mut ctx = ReplCtx {
        debugger: &debugger,
        current: None,
    };
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "next"),
        CmdResult::ContinueQuery
    );
    assert!(!wi.stop);
    debugger.flags.running.set(true);
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "n"),
        CmdResult::EndQuery
    );
    assert!(wi.stop);
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "continue"),
        CmdResult::EndQuery
    );
}

#[test]
fn quit_without_clients_exits() {
    let debugger = Debugger::new().unwrap();
    let mut wi = interactive();
    let mut ctx = ReplCtx {
        debugger: &debugger,
        current: None,
    };
    assert_eq!(
        commands::run_command(&mut wi, &mut ctx, "q"),
        CmdResult::EndQuery
    );
    assert!(debugger.flags.exit.get());
}

#[test]
fn noop_editor_keeps_the_message() {
    let mut m = msg(Direction::FromClient, 1, 1, &[2]);
    let before = m.bytes().to_vec();
    editor::edit_message(&mut m, Some("true")).unwrap();
    assert_eq!(m.bytes(), &before[..]);
}

#[test]
fn truncating_editor_shrinks_the_message() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("trunc.sh");
    fs::write(&script, "#!/bin/sh\ntruncate -s 8 \"$1\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    let mut m = msg(Direction::FromClient, 1, 1, &[2]);
    let before = m.bytes().to_vec();
    editor::edit_message(&mut m, Some(script.to_str().unwrap())).unwrap();
    assert_eq!(m.size(), 8);
    assert_eq!(m.bytes(), &before[..8]);
}

#[test]
fn failing_editor_leaves_the_message_alone() {
    let mut m = msg(Direction::FromClient, 1, 1, &[2]);
    let before = m.bytes().to_vec();
    assert!(editor::edit_message(&mut m, Some("false")).is_err());
    assert!(editor::edit_message(&mut m, Some("/does/not/exist")).is_err());
    assert_eq!(m.bytes(), &before[..]);
}
