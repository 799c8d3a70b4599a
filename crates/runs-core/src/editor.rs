//! Interactive editor integration for run descriptions.
//!
//! The buffer handed to the editor starts with a commented header naming the
//! run being described. The header is stripped from the saved buffer; every
//! other line, including lines the user starts with `#`, is kept verbatim.

use std::env;
use std::fs;
use std::io::Write;
use std::process::Command;
use tracing::debug;

/// Last line of every header, telling the user what happens to it.
pub const EDITOR_HINT: &str =
    "# Write the description below this header. The header will be ignored.";

/// Error type for editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Failed to find a suitable text editor")]
    NoEditorFound,
    #[error("Editor failed to start or exited with error")]
    EditorFailed,
    #[error("Failed to create temporary file: {0}")]
    TempFileError(#[from] std::io::Error),
    #[error("Aborted: empty description.")]
    EmptyDescription,
}

/// Result type for editor operations.
pub type EditorResult<T> = std::result::Result<T, EditorError>;

/// Captures free text from the user.
pub trait Editor {
    /// Let the user edit `initial` below `header`; returns the text without the header.
    fn edit(&self, header: &str, initial: &str) -> EditorResult<String>;
}

/// The user's `$EDITOR` (or the first common editor found on `PATH`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalEditor;

impl Editor for ExternalEditor {
    fn edit(&self, header: &str, initial: &str) -> EditorResult<String> {
        edit_content_interactive(header, initial)
    }
}

/// Header shown above a run's description.
pub fn description_header(path: &str, command: &str) -> String {
    format!("# Run: {path}\n# Command: {command}\n{EDITOR_HINT}\n")
}

/// Discover the user's preferred text editor command line.
///
/// 1. Check the VISUAL and EDITOR environment variables
/// 2. Fall back to common editors in order: nano, pico, micro, vim, helix, vi
pub fn discover_editor() -> Option<Vec<String>> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(editor) = env::var(var) {
            if let Some(words) = shlex::split(&editor).filter(|w| !w.is_empty()) {
                return Some(words);
            }
        }
    }

    ["nano", "pico", "micro", "vim", "hx", "vi"]
        .into_iter()
        .find(|editor| which::which(editor).is_ok())
        .map(|editor| vec![editor.to_string()])
}

/// Edit content interactively using the user's editor.
///
/// # Errors
/// Returns `EditorError::EmptyDescription` if the processed content is empty.
/// Returns `EditorError::EditorFailed` if the editor exits with a non-zero status.
/// Returns `EditorError::NoEditorFound` if no suitable editor is available.
pub fn edit_content_interactive(header: &str, initial: &str) -> EditorResult<String> {
    let editor = discover_editor().ok_or(EditorError::NoEditorFound)?;

    let mut temp_file = tempfile::Builder::new().suffix(".txt").tempfile()?;
    write!(temp_file, "{header}{initial}")?;
    temp_file.flush()?;
    let temp_path = temp_file.into_temp_path();

    debug!(editor = ?editor, file = %temp_path.display(), "Opening editor");
    let status = Command::new(&editor[0])
        .args(&editor[1..])
        .arg(temp_path.as_os_str())
        .status()
        .map_err(|_| EditorError::EditorFailed)?;

    if !status.success() {
        return Err(EditorError::EditorFailed);
    }

    let processed = process_template(fs::read_to_string(&temp_path)?, header);
    if processed.trim().is_empty() {
        return Err(EditorError::EmptyDescription);
    }
    Ok(processed)
}

/// Remove the header, normalize line endings and drop trailing newlines.
pub fn process_template(content: String, header: &str) -> String {
    let content = content.replace("\r\n", "\n");
    let content = content.replacen(header, "", 1);
    content.trim_end_matches('\n').to_string()
}
