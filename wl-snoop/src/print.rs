//! Rendering of intercepted messages.

use {
    crate::{
        message::Message,
        protocols::ArgKind,
        resolver::{Body, ResolveError, ResolvedObjects},
    },
    debug_fn::debug_fn,
    std::fmt::{self, Display},
};

#[cfg(test)]
mod tests;

/// The name print filters are matched against, e.g. `wl_display.sync`.
///
/// Unresolvable ids and opcodes fall back to their numeric forms so that
/// filters can still target them.
pub fn message_name(ro: &ResolvedObjects, msg: &Message) -> String {
    match ro.get(msg.object_id()) {
        Some(interface) => match interface.message(msg.direction(), msg.opcode()) {
            Some(spec) => format!("{}.{}", interface.name, spec.name),
            None => format!("{}.{}", interface.name, msg.opcode()),
        },
        None => format!("unknown@{}.{}", msg.object_id(), msg.opcode()),
    }
}

/// Prints a one-line description of `msg` to stdout.
pub fn print_message(ro: &ResolvedObjects, msg: &Message) {
    println!("{}", render(ro, msg));
}

/// Renders `msg` as `sender -> interface@id.message(args)`.
pub fn render<'a>(ro: &'a ResolvedObjects, msg: &'a Message) -> impl Display + use<'a> {
    debug_fn(move |f| {
        write!(f, "{} -> ", msg.direction().sender())?;
        let interface = ro.get(msg.object_id());
        let spec = interface.and_then(|i| i.message(msg.direction(), msg.opcode()));
        let (Some(interface), Some(spec)) = (interface, spec) else {
            let name = match interface {
                Some(i) => i.name,
                None => "unknown",
            };
            return write!(
                f,
                "{}@{}.{} [{} bytes]",
                name,
                msg.object_id(),
                msg.opcode(),
                msg.size(),
            );
        };
        write!(
            f,
            "{}@{}.{}(",
            interface.name,
            msg.object_id(),
            spec.name,
        )?;
        let mut body = Body::new(msg.words());
        for (idx, arg) in spec.signature.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            match write_arg(f, ro, arg, &mut body) {
                Ok(()) => {}
                Err(ArgWriteError::Fmt(e)) => return Err(e),
                Err(ArgWriteError::Malformed) => {
                    f.write_str("<truncated>")?;
                    break;
                }
            }
        }
        f.write_str(")")
    })
}

enum ArgWriteError {
    Fmt(fmt::Error),
    Malformed,
}

impl From<fmt::Error> for ArgWriteError {
    fn from(e: fmt::Error) -> Self {
        ArgWriteError::Fmt(e)
    }
}

impl From<ResolveError> for ArgWriteError {
    fn from(_: ResolveError) -> Self {
        ArgWriteError::Malformed
    }
}

fn write_arg(
    f: &mut fmt::Formatter<'_>,
    ro: &ResolvedObjects,
    arg: &ArgKind,
    body: &mut Body<'_>,
) -> Result<(), ArgWriteError> {
    match arg {
        ArgKind::Int => write!(f, "{}", body.word()? as i32)?,
        ArgKind::Uint => write!(f, "{}", body.word()?)?,
        ArgKind::Fixed => {
            let v = body.word()? as i32;
            write!(f, "{}", v as f64 / 256.0)?;
        }
        ArgKind::String | ArgKind::OptString => match body.string()? {
            Some(s) => write!(f, "{s:?}")?,
            None => f.write_str("nil")?,
        },
        ArgKind::Object | ArgKind::OptObject => {
            let id = body.word()?;
            if id == 0 {
                f.write_str("nil")?;
            } else {
                match ro.get(id) {
                    Some(i) => write!(f, "{}@{}", i.name, id)?,
                    None => write!(f, "obj@{id}")?,
                }
            }
        }
        ArgKind::NewId(interface) => {
            let id = body.word()?;
            write!(f, "new id {}@{}", interface.name, id)?;
        }
        ArgKind::AnyNewId => {
            let name = body.string()?.unwrap_or("?");
            let version = body.word()?;
            let id = body.word()?;
            write!(f, "new id {name}@{id} v{version}")?;
        }
        ArgKind::Array => {
            let len = body.array()?;
            write!(f, "array[{len}]")?;
        }
        ArgKind::Fd => f.write_str("fd")?,
    }
    Ok(())
}
