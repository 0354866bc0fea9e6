//! The REPL command dispatcher and command implementations.

use {
    super::{Interactive, editor, info},
    crate::{connection::Connection, debugger::Debugger, message::Direction, passes},
    error_reporter::Report,
    std::{
        io::{self, BufRead, Write},
        rc::Rc,
    },
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum CmdResult {
    /// Keep prompting.
    ContinueQuery,
    /// Leave the REPL and resume dispatch.
    EndQuery,
    /// The input matched no command.
    DontMatch,
}

/// Everything a command can reach.
pub(super) struct ReplCtx<'a> {
    pub debugger: &'a Rc<Debugger>,
    pub current: Option<Current<'a>>,
}

/// The message the debugger is stopped on, with its connection.
pub(super) struct Current<'a> {
    pub connection: &'a Rc<Connection>,
    pub message: &'a mut crate::message::Message,
}

type CmdFn = fn(&mut Interactive, &mut ReplCtx<'_>, &str) -> CmdResult;

struct Command {
    name: &'static str,
    shortcut: Option<&'static str>,
    run: CmdFn,
    help: Option<fn(bool)>,
}

// keep sorted by name
static COMMANDS: &[Command] = &[
    Command {
        name: "break",
        shortcut: Some("b"),
        run: cmd_break,
        help: Some(help_break),
    },
    Command {
        name: "continue",
        shortcut: Some("c"),
        run: cmd_continue,
        help: Some(help_continue),
    },
    Command {
        name: "edit",
        shortcut: Some("e"),
        run: cmd_edit,
        help: Some(help_edit),
    },
    Command {
        name: "help",
        shortcut: None,
        run: cmd_help,
        help: Some(help_help),
    },
    Command {
        name: "hide",
        shortcut: Some("h"),
        run: cmd_hide,
        help: Some(help_hide),
    },
    Command {
        name: "info",
        shortcut: Some("i"),
        run: info::cmd_info,
        help: Some(info::help_info),
    },
    Command {
        name: "next",
        shortcut: Some("n"),
        run: cmd_next,
        help: Some(help_next),
    },
    Command {
        name: "pass",
        shortcut: None,
        run: cmd_pass,
        help: Some(help_pass),
    },
    Command {
        name: "quit",
        shortcut: Some("q"),
        run: cmd_quit,
        help: Some(help_quit),
    },
    Command {
        name: "send",
        shortcut: Some("s"),
        run: cmd_send,
        help: Some(help_send),
    },
    Command {
        name: "showonly",
        shortcut: Some("so"),
        run: cmd_showonly,
        help: Some(help_showonly),
    },
];

/// Resolves the first word of `line` to a command and runs it with the rest
/// of the line.
pub(super) fn run_command(
    wi: &mut Interactive,
    ctx: &mut ReplCtx<'_>,
    line: &str,
) -> CmdResult {
    for cmd in COMMANDS {
        if is_cmd(line, cmd) {
            return (cmd.run)(wi, ctx, next_word(line));
        }
    }
    CmdResult::DontMatch
}

fn is_cmd(line: &str, cmd: &Command) -> bool {
    if let Some(shortcut) = cmd.shortcut
        && matches_word(line, shortcut)
    {
        return true;
    }
    matches_word(line, cmd.name)
}

/// Matches `word` at the start of `line`, demanding a word boundary after
/// the match.
fn matches_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Skips the first word and the whitespace after it.
fn next_word(line: &str) -> &str {
    line.trim_start()
        .trim_start_matches(|c: char| !c.is_whitespace())
        .trim_start()
}

fn cmd_break(wi: &mut Interactive, _ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    if let Some(rest) = args
        .strip_prefix("delete ")
        .or_else(|| args.strip_prefix("d "))
    {
        match rest.trim().parse::<u32>() {
            Ok(id) => {
                if !wi.delete_breakpoint(id) {
                    println!("Haven't found breakpoint with id {id}");
                }
            }
            Err(_) => println!("Need a valid id"),
        }
        return CmdResult::ContinueQuery;
    }
    match wi.create_breakpoint(args) {
        Ok(id) => println!("created breakpoint {id}"),
        Err(e) => println!("{e}"),
    }
    CmdResult::ContinueQuery
}

fn cmd_continue(_wi: &mut Interactive, ctx: &mut ReplCtx<'_>, _args: &str) -> CmdResult {
    if !ctx.debugger.flags.running.get() {
        println!("Client is not running");
        return CmdResult::ContinueQuery;
    }
    CmdResult::EndQuery
}

fn cmd_next(wi: &mut Interactive, ctx: &mut ReplCtx<'_>, _args: &str) -> CmdResult {
    if !ctx.debugger.flags.running.get() {
        println!("Client is not running");
        return CmdResult::ContinueQuery;
    }
    wi.stop = true;
    CmdResult::EndQuery
}

pub(super) fn cmd_quit(_wi: &mut Interactive, ctx: &mut ReplCtx<'_>, _args: &str) -> CmdResult {
    let debugger = ctx.debugger;
    if debugger.flags.running.get()
        && !debugger.flags.error.get()
        && !debugger.connections().is_empty()
    {
        println!("Program seems running. Do you really want to quit? (y)");
        let mut buf = String::new();
        let confirmed = match io::stdin().lock().read_line(&mut buf) {
            Ok(0) => true,
            Ok(_) => buf.trim_start().starts_with('y'),
            Err(_) => true,
        };
        if !confirmed {
            return CmdResult::ContinueQuery;
        }
        debugger.terminate_clients();
    }
    log::debug!("exiting");
    debugger.flags.exit.set(true);
    CmdResult::EndQuery
}

fn cmd_pass(_wi: &mut Interactive, ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    let args = args.trim();
    if args == "list" {
        println!("Available passes:");
        for (name, summary) in passes::available() {
            println!("\t - {name}\t{summary}");
        }
    } else if args == "loaded" {
        println!("Loaded passes:");
        for name in ctx.debugger.pass_names() {
            println!("\t - {name}");
        }
    } else if let Some(name) = args.strip_prefix("add ") {
        let name = name.trim();
        match passes::create(name) {
            Some(pass) => match ctx.debugger.attach_pass_head(name, pass) {
                Ok(()) => println!("Added pass '{name}'"),
                Err(e) => println!("Failed initializing pass '{name}': {e}"),
            },
            None => println!("Failed adding pass '{name}'"),
        }
    } else if let Some(name) = args.strip_prefix("remove ") {
        let name = name.trim();
        if name == super::PASS_NAME {
            println!("Cannot remove the interactive pass");
        } else if ctx.debugger.remove_pass(name) {
            println!("Removed pass '{name}'");
        } else {
            println!("Didn't find pass '{name}'");
        }
    } else {
        help_pass(false);
    }
    CmdResult::ContinueQuery
}

fn cmd_send(_wi: &mut Interactive, ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    let Some(cur) = &ctx.current else {
        println!("No connection to send on");
        return CmdResult::ContinueQuery;
    };
    let direction = match args.trim() {
        "server" | "s" => Direction::FromClient,
        "client" | "c" => Direction::FromServer,
        _ => {
            println!(" :: send [server|s|client|c]");
            return CmdResult::ContinueQuery;
        }
    };
    let Some(id) = prompt_u32("Id: ") else {
        return CmdResult::ContinueQuery;
    };
    let Some(opcode) = prompt_u32("Opcode: ") else {
        return CmdResult::ContinueQuery;
    };
    println!("Payload words in hex, empty line to finish:");
    let mut words = vec![id, 0];
    let stdin = io::stdin();
    loop {
        let mut buf = String::new();
        match stdin.lock().read_line(&mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => return CmdResult::ContinueQuery,
        }
        let line = buf.trim();
        if line.is_empty() {
            break;
        }
        for token in line.split_whitespace() {
            let token = token.trim_start_matches("0x");
            match u32::from_str_radix(token, 16) {
                Ok(word) => words.push(word),
                Err(_) => {
                    println!("Not a hexadecimal word: {token}");
                    return CmdResult::ContinueQuery;
                }
            }
        }
    }
    if words.len() * 4 > crate::trans::MAX_FRAME_SIZE {
        println!("The message does not fit a frame");
        return CmdResult::ContinueQuery;
    }
    let size = (words.len() * 4) as u32;
    words[1] = (size << 16) | (opcode & 0xffff);
    log::debug!("sending id {id}, opcode {opcode}, size {size}");
    cur.connection.inject(ctx.debugger, direction, &words);
    CmdResult::ContinueQuery
}

fn prompt_u32(prompt: &str) -> Option<u32> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().lock().read_line(&mut buf) {
        Ok(0) | Err(_) => return None,
        Ok(_) => {}
    }
    match buf.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Need a number");
            None
        }
    }
}

fn cmd_edit(_wi: &mut Interactive, ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    let Some(cur) = ctx.current.as_mut() else {
        println!("No message to edit");
        return CmdResult::ContinueQuery;
    };
    let editor = args.trim();
    let editor = (!editor.is_empty()).then_some(editor);
    if let Err(e) = editor::edit_message(cur.message, editor) {
        println!("{}", Report::new(e));
    }
    CmdResult::ContinueQuery
}

fn cmd_hide(wi: &mut Interactive, _ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    create_filter(wi, args, false)
}

fn cmd_showonly(wi: &mut Interactive, _ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    create_filter(wi, args, true)
}

fn create_filter(wi: &mut Interactive, args: &str, show_only: bool) -> CmdResult {
    let Some(pattern) = args.split_whitespace().next() else {
        println!("Need a regular expression");
        return CmdResult::ContinueQuery;
    };
    match wi.add_filter(pattern, show_only) {
        Ok(()) => println!(
            "Filtering messages: {}{}",
            if show_only { "" } else { "hide " },
            pattern,
        ),
        Err(e) => println!("Invalid regular expression: {e}"),
    }
    CmdResult::ContinueQuery
}

fn cmd_help(_wi: &mut Interactive, _ctx: &mut ReplCtx<'_>, args: &str) -> CmdResult {
    let all = args.trim() == "all";
    println!();
    for cmd in COMMANDS {
        if all {
            print!(" == {}", cmd.name);
        } else {
            print!("\t{}", cmd.name);
        }
        if let Some(shortcut) = cmd.shortcut {
            print!(" ({shortcut})");
        }
        if all {
            println!(" ==\n");
        }
        if let Some(help) = cmd.help {
            if all {
                help(false);
            } else {
                print!("\t -- ");
                help(true);
            }
        }
        println!();
        if all {
            println!();
        }
    }
    CmdResult::ContinueQuery
}

fn help_break(oneline: bool) {
    if oneline {
        print!("Create or delete breakpoints");
        return;
    }
    print!(
        "break server        - stop on any message from the server\n\
         break client        - stop on any message from the client\n\
         break id N          - stop on any message for object id N\n\
         break IFACE@MESSAGE - stop on a request or event by name\n\
         break delete N      - delete breakpoint N (also: break d N)",
    );
}

fn help_continue(oneline: bool) {
    if oneline {
        print!("Continue running the program");
    } else {
        print!("Leave the prompt and forward messages until the next stop.");
    }
}

fn help_edit(oneline: bool) {
    if oneline {
        print!("Edit the current message in an external editor");
    } else {
        print!(
            "edit [EDITOR]\n\
             \n\
             Dump the current message into a temporary file, run the editor\n\
             on it and read the result back. Without an argument the EDITOR\n\
             environment variable is used.",
        );
    }
}

fn help_help(oneline: bool) {
    if oneline {
        print!("Show this help message");
    } else {
        print!("Print the command listing. 'help all' prints the comprehensive help.");
    }
}

fn help_hide(oneline: bool) {
    if oneline {
        print!("Hide messages matching a regular expression");
    } else {
        print!(
            "hide REGEX\n\
             \n\
             Messages whose name (interface.message) matches the expression\n\
             are forwarded but not printed.",
        );
    }
}

fn help_next(oneline: bool) {
    if oneline {
        print!("Continue to the next message");
    } else {
        print!("Forward the current message and stop on the next one.");
    }
}

fn help_pass(oneline: bool) {
    if oneline {
        print!("Add, remove, list passes");
        return;
    }
    println!("Possible arguments:");
    println!("\tlist\t\t- list available passes");
    println!("\tloaded\t\t- list loaded passes");
    println!("\tadd NAME\t- add pass NAME");
    print!("\tremove NAME\t- remove pass NAME");
}

fn help_quit(oneline: bool) {
    if oneline {
        print!("Quit the debugger");
    } else {
        print!("Terminate the debugger, asking for confirmation while clients are live.");
    }
}

fn help_send(oneline: bool) {
    if oneline {
        print!("Craft and send a message");
    } else {
        print!(
            "send server|client\n\
             \n\
             Prompts for an object id, an opcode and hexadecimal payload\n\
             words, then injects the assembled message towards the chosen\n\
             peer.",
        );
    }
}

fn help_showonly(oneline: bool) {
    if oneline {
        print!("Show only messages matching a regular expression");
    } else {
        print!(
            "showonly REGEX\n\
             \n\
             Once at least one showonly filter exists, only messages\n\
             matching one of them are printed.",
        );
    }
}
