use std::path::Path;

use ignore::gitignore::GitignoreBuilder;
use tokio::sync::mpsc;

use crate::{
    events::{send_event, Event, LogLevel},
    Result, StyluaxError,
};

/// Name of the workspace-local ignore file, gitignore syntax.
pub const IGNORE_FILE_NAME: &str = ".styluaignore";

/// Whether a path is excluded from formatting by the workspace ignore file.
///
/// Fail-open wrapper: missing inputs mean nothing is ignored, and a
/// read/parse failure is logged and surfaced as a warning while formatting
/// proceeds.
pub fn check_ignored(
    sender: &Option<mpsc::Sender<Event>>,
    path: Option<&Path>,
    workspace_root: Option<&Path>,
) -> bool {
    let (Some(path), Some(workspace_root)) = (path, workspace_root) else {
        return false;
    };
    match is_ignored(path, workspace_root) {
        Ok(ignored) => ignored,
        Err(e) => {
            let _ = send_event(sender, Event::Log(LogLevel::Error, e.to_string()));
            let _ = send_event(sender, Event::Warning(e.to_string()));
            false
        }
    }
}

/// Evaluate the workspace's `.styluaignore` rules against a path. The file
/// is re-read on every call, so its on-disk state is authoritative per
/// request. A missing file means nothing is ignored.
pub fn is_ignored(path: &Path, workspace_root: &Path) -> Result<bool> {
    let ignore_path = workspace_root.join(IGNORE_FILE_NAME);
    if !ignore_path.is_file() {
        return Ok(false);
    }
    let ignore_file = |error: String| StyluaxError::IgnoreFile {
        path: ignore_path.display().to_string(),
        error,
    };

    let contents = fs_err::read_to_string(&ignore_path).map_err(|e| ignore_file(e.to_string()))?;
    let mut builder = GitignoreBuilder::new(workspace_root);
    for line in contents.lines() {
        builder
            .add_line(None, line)
            .map_err(|e| ignore_file(e.to_string()))?;
    }
    let rules = builder.build().map_err(|e| ignore_file(e.to_string()))?;

    let relative = match path.strip_prefix(workspace_root) {
        Ok(relative) => relative,
        // Not under the root; only exact-path rules can apply.
        Err(_) => return Ok(rules.matched(path, false).is_ignore()),
    };
    Ok(rules.matched_path_or_any_parents(relative, false).is_ignore())
}
