use std::path::Path;
use std::process::Stdio;

use path_clean::PathClean;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use crate::{Result, StyluaxError};

/// Build the argument list for a stylua invocation.
///
/// A range bound of zero is indistinguishable from "no bound" and falls back
/// to the binary's whole-document default for that end; only positive
/// offsets emit range flags. The trailing `-` tells the binary to read
/// source from stdin.
pub(crate) fn build_args(
    range_start: Option<usize>,
    range_end: Option<usize>,
    config_path: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(start) = range_start.filter(|s| *s > 0) {
        args.push("--range-start".to_string());
        args.push(start.to_string());
    }
    if let Some(end) = range_end.filter(|e| *e > 0) {
        args.push("--range-end".to_string());
        args.push(end.to_string());
    }
    match config_path {
        Some(path) => {
            args.push("--config-path".to_string());
            args.push(path.to_path_buf().clean().display().to_string());
        }
        None => args.push("--search-parent-directories".to_string()),
    }
    args.push("-".to_string());
    args
}

/// Run a command, stream `input` to its stdin, and collect stdout until the
/// stream closes. Any stderr output or a failure to start the process fails
/// the call; the exit status is deliberately not consulted.
async fn communicate(
    binary: &Path,
    args: &[String],
    cwd: Option<&Path>,
    input: Option<&str>,
) -> Result<String> {
    let invocation = |error: String| StyluaxError::Invocation {
        cmd: binary.display().to_string(),
        error,
    };

    debug!(
        "spawning {} with args {:?} (cwd: {:?})",
        binary.display(),
        args,
        cwd
    );
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    let mut child = cmd.spawn().map_err(|e| invocation(e.to_string()))?;

    if let Some(input) = input {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StyluaxError::Internal("child stdin was not captured".to_string()))?;
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| invocation(e.to_string()))?;
        // Dropping stdin closes it, signaling end of input.
        drop(stdin);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| invocation(e.to_string()))?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        return Err(invocation(stderr.trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .trim_end()
        .to_string())
}

/// Format `code` with the stylua binary at `stylua_path`, returning the
/// formatted text right-trimmed of trailing whitespace.
pub async fn format_code(
    stylua_path: &Path,
    code: &str,
    cwd: Option<&Path>,
    range_start: Option<usize>,
    range_end: Option<usize>,
    config_path: Option<&Path>,
) -> Result<String> {
    let args = build_args(range_start, range_end, config_path);
    communicate(stylua_path, &args, cwd, Some(code)).await
}

/// Ask the binary for its version string.
pub async fn binary_version(stylua_path: &Path) -> Result<String> {
    communicate(stylua_path, &["--version".to_string()], None, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_args_defaults() {
        assert_eq!(
            build_args(None, None, None),
            vec!["--search-parent-directories", "-"]
        );
    }

    #[test]
    fn test_build_args_range() {
        assert_eq!(
            build_args(Some(5), Some(10), None),
            vec![
                "--range-start",
                "5",
                "--range-end",
                "10",
                "--search-parent-directories",
                "-"
            ]
        );
    }

    // A start offset of exactly zero is dropped rather than emitted as
    // `--range-start 0`, so a selection beginning at the first byte falls
    // back to the whole-document default for that bound. Current behavior,
    // asserted on purpose.
    #[test]
    fn test_build_args_zero_start_omitted() {
        assert_eq!(
            build_args(Some(0), Some(9), None),
            vec!["--range-end", "9", "--search-parent-directories", "-"]
        );
        assert_eq!(
            build_args(Some(0), Some(0), None),
            vec!["--search-parent-directories", "-"]
        );
    }

    #[test]
    fn test_build_args_config_path() {
        assert_eq!(
            build_args(None, None, Some(Path::new("cfg/./stylua.toml"))),
            vec!["--config-path", "cfg/stylua.toml", "-"]
        );
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::testutils::write_script;
        use pretty_assertions::assert_eq;
        use tempfile::TempDir;

        #[tokio::test]
        async fn test_format_streams_stdin() {
            let dir = TempDir::new().unwrap();
            let stylua = write_script(dir.path(), "stylua", "cat");
            let out = format_code(&stylua, "local x = 1\n", None, None, None, None)
                .await
                .unwrap();
            assert_eq!(out, "local x = 1");
        }

        #[tokio::test]
        async fn test_stderr_output_fails_the_call() {
            let dir = TempDir::new().unwrap();
            let stylua = write_script(dir.path(), "stylua", "cat >/dev/null\necho 'boom' >&2");
            let err = format_code(&stylua, "local x = 1", None, None, None, None)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("boom"));
        }

        #[tokio::test]
        async fn test_spawn_failure() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("stylua");
            assert!(format_code(&missing, "x", None, None, None, None)
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_range_flags_reach_the_binary() {
            let dir = TempDir::new().unwrap();
            let args_file = dir.path().join("args");
            let stylua = write_script(
                dir.path(),
                "stylua",
                &format!("printf '%s\\n' \"$@\" > {}\ncat", args_file.display()),
            );
            format_code(&stylua, "code", None, Some(3), Some(7), None)
                .await
                .unwrap();
            let recorded = fs_err::read_to_string(&args_file).unwrap();
            let recorded: Vec<&str> = recorded.lines().collect();
            assert_eq!(
                recorded,
                vec![
                    "--range-start",
                    "3",
                    "--range-end",
                    "7",
                    "--search-parent-directories",
                    "-"
                ]
            );
        }

        #[tokio::test]
        async fn test_binary_version() {
            let dir = TempDir::new().unwrap();
            let stylua = write_script(dir.path(), "stylua", "echo 'stylua 0.20.0'");
            assert_eq!(binary_version(&stylua).await.unwrap(), "stylua 0.20.0");
        }
    }
}
