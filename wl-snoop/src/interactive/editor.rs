//! The external-editor flow for the `edit` command.

use {
    crate::{
        message::{Message, MessageError},
        trans::MAX_FRAME_SIZE,
        utils::env::EDITOR,
    },
    std::{
        env::var,
        fs::File,
        io::{self, Read, Write},
        process::{Command, ExitStatus},
    },
    tempfile::NamedTempFile,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub(super) enum EditError {
    #[error("no editor to use; use 'edit EDITOR_NAME' or set the EDITOR environment variable")]
    NoEditor,
    #[error("could not create a temporary file")]
    Create(#[source] io::Error),
    #[error("could not write the message to the temporary file")]
    Write(#[source] io::Error),
    #[error("could not run the editor")]
    Spawn(#[source] io::Error),
    #[error("the editor exited with {0}")]
    EditorFailed(ExitStatus),
    #[error("could not read the edited message back")]
    Read(#[source] io::Error),
    #[error("the edited message does not fit a frame")]
    TooLarge(#[source] MessageError),
}

/// Lets the operator edit `msg` with an external editor.
///
/// The message bytes are dumped into a freshly created private temporary
/// file, the editor is run on it, and on a clean exit the file content
/// replaces the message, capped at the maximum frame size. The temporary
/// file is removed in every case. On error the message is unchanged.
pub(super) fn edit_message(msg: &mut Message, editor: Option<&str>) -> Result<(), EditError> {
    let editor = match editor {
        Some(editor) => editor.to_string(),
        None => var(EDITOR).map_err(|_| EditError::NoEditor)?,
    };
    let mut file = NamedTempFile::new().map_err(EditError::Create)?;
    file.write_all(msg.bytes()).map_err(EditError::Write)?;
    file.flush().map_err(EditError::Write)?;
    log::debug!("editing a message via {editor} in {}", file.path().display());
    let status = Command::new(&editor)
        .arg(file.path())
        .status()
        .map_err(EditError::Spawn)?;
    if !status.success() {
        return Err(EditError::EditorFailed(status));
    }
    let mut data = Vec::new();
    File::open(file.path())
        .map_err(EditError::Read)?
        .take(MAX_FRAME_SIZE as u64)
        .read_to_end(&mut data)
        .map_err(EditError::Read)?;
    msg.set_bytes(&data).map_err(EditError::TooLarge)?;
    Ok(())
}
