//! The `info` command.

use {
    super::{
        Interactive,
        commands::{CmdResult, ReplCtx},
    },
    crate::debugger::Debugger,
    std::rc::Rc,
};

pub(super) fn cmd_info(wi: &mut Interactive, ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    match args.trim() {
        "m" | "message" => info_message(ctx),
        "o" | "objects" => info_objects(ctx),
        "b" | "breakpoints" => info_breakpoints(wi),
        "p" | "proc" | "process" => {
            info_debugger(ctx.debugger);
            info_connections(ctx.debugger);
        }
        "c" | "conn" | "connection" => info_connections(ctx.debugger),
        _ => println!("Unknown arguments"),
    }
    CmdResult::ContinueQuery
}

pub(super) fn help_info(oneline: bool) {
    if oneline {
        print!("Show info about entities");
        return;
    }
    print!(
        "info WHAT (i WHAT)\n\
         \n\
         message (m)\n\
         objects (o)\n\
         breakpoints (b)\n\
         process (proc, p)\n\
         connection (conn, c)",
    );
}

fn info_message(ctx: &ReplCtx<'_>) {
    let Some(cur) = &ctx.current else {
        println!("No message");
        return;
    };
    let direction = cur.message.direction();
    println!(
        "Sender: {} (no. {}), size: {}",
        direction.sender(),
        cur.connection.count(direction),
        cur.message.size(),
    );
}

fn info_objects(ctx: &ReplCtx<'_>) {
    let Some(cur) = &ctx.current else {
        println!("No connection");
        return;
    };
    let mut objects = Vec::new();
    cur.connection
        .resolved()
        .iterate(|id, interface| objects.push((id, interface.name)));
    objects.sort_unstable();
    for (id, name) in objects {
        println!("\t{id} -> {name}");
    }
}

fn info_breakpoints(wi: &Interactive) {
    if wi.breakpoints.is_empty() {
        println!("No breakpoints");
        return;
    }
    for b in &wi.breakpoints {
        println!("{}: break on {}", b.id, b.description);
    }
}

fn info_debugger(debugger: &Rc<Debugger>) {
    println!("\n-- wl-snoop --");
    println!("Monitored fds num: {}", debugger.num_monitors());
    let flags = &debugger.flags;
    println!(
        "Flags:\tone_by_one : {}\n\
         \trunning    : {}\n\
         \terror      : {}\n\
         \texit       : {}\n\
         \tserver_mode: {}",
        flags.one_by_one.get() as u32,
        flags.running.get() as u32,
        flags.error.get() as u32,
        flags.exit.get() as u32,
        flags.server_mode.get() as u32,
    );
    if let Some(server) = debugger.server() {
        println!(
            "Server mode:\n\
             \tdisplay: '{}'\n\
             \tsocket path: '{}'\n\
             \tcompositor socket path: '{}'\n\
             \tlock path: '{}'",
            server.display(),
            server.socket_path(),
            server.moved_socket_path(),
            server.lock_path(),
        );
        println!("Connections number: {}", debugger.connections().len());
    }
}

fn info_connections(debugger: &Rc<Debugger>) {
    println!("\n-- Connections --");
    for (n, conn) in debugger.connections().iter().enumerate() {
        let info = conn.info();
        println!("{}.", n + 1);
        match info.pid {
            Some(pid) => println!("\tclient: pid={pid}"),
            None => println!("\tclient: accepted in server mode"),
        }
        if let Some(program) = &info.program {
            println!("\t      : program='{program}'");
        }
        for (i, arg) in info.argv.iter().enumerate() {
            println!("\t      :   argv[{i}]='{arg}'");
        }
        println!(
            "\t      : messages client={} server={}",
            conn.count(crate::message::Direction::FromClient),
            conn.count(crate::message::Direction::FromServer),
        );
    }
}
