use anyhow::Result;
use bangle_workspace::ws_path::{validate_file_ws_path, validate_note_ws_path};

/// Check a file wsPath, failing with the validation error
///
/// With `note` set the path must also carry a note extension.
pub fn validate_ws_path(ws_path: &str, note: bool) -> Result<()> {
    if note {
        validate_note_ws_path(ws_path)?;
    } else {
        validate_file_ws_path(ws_path)?;
    }
    println!("{ws_path} is valid");
    Ok(())
}
