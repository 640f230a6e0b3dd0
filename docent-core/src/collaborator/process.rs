//! Running a backend executable for one request

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Markers in backend stderr meaning the backend itself is unusable
///
/// Status codes only count in HTTP phrasing; a bare `401` may be a line number.
const FATAL_MARKERS: &[&str] = &[
    "authentication failed",
    "authentication error",
    "unauthorized",
    "not logged in",
    "please log in",
    "invalid api key",
    "missing api key",
    "api key not found",
    "invalid model",
    "401 unauthorized",
    "403 forbidden",
    "status 401",
    "status 403",
    "status code 401",
    "status code 403",
    "http 401",
    "http 403",
    "error 401",
    "error 403",
];

/// Spawn `cmd`, feed `input` on stdin and return trimmed stdout
///
/// An empty stdout yields `Ok(None)`.
pub(crate) async fn run_request(
    mut cmd: Command,
    input: Option<String>,
    timeout: Duration,
    executable: &str,
) -> Result<Option<String>> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::CollaboratorFatal(format!(
                "Executable not found at '{}'. Is it installed?",
                executable
            ))
        } else {
            Error::Io(e)
        }
    })?;

    // Write the prompt while the output is drained so neither pipe can fill up
    let stdin = child.stdin.take();
    let write = async move {
        match (input, stdin) {
            (Some(input), Some(mut stdin)) => match stdin.write_all(input.as_bytes()).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            },
            _ => Ok(()),
        }
    };

    let (written, output) = tokio::time::timeout(timeout, async move {
        tokio::join!(write, child.wait_with_output())
    })
    .await
    .map_err(|_| Error::Generation(format!("Request timed out after {:?}", timeout)))?;
    let output = output?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_failure(executable, &stderr, output.status.code()));
    }
    if let Err(e) = written {
        return Err(Error::Generation(format!(
            "Failed to send the prompt to '{}': {}",
            executable, e
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!(executable, bytes = stdout.len(), "Backend request completed");
    Ok(if stdout.is_empty() { None } else { Some(stdout) })
}

/// Decide whether a failed request is per-file or run-fatal
pub(crate) fn classify_failure(executable: &str, stderr: &str, code: Option<i32>) -> Error {
    let message = format!(
        "'{}' exited with {}: {}",
        executable,
        code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()),
        stderr.trim()
    );
    let lower = stderr.to_lowercase();
    if FATAL_MARKERS.iter().any(|m| lower.contains(m)) {
        Error::CollaboratorFatal(message)
    } else {
        Error::Generation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_failure_is_fatal() {
        let err = classify_failure("claude", "Error: Invalid API key provided", Some(1));
        assert!(err.is_run_fatal());
    }

    #[test]
    fn test_classify_other_failure_is_per_file() {
        let err = classify_failure("claude", "context window exceeded", Some(1));
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_classify_http_status() {
        let err = classify_failure("cursor-agent", "request failed: HTTP 401 Unauthorized", Some(1));
        assert!(matches!(err, Error::CollaboratorFatal(_)));
        let err = classify_failure("claude", "API error: status code 403", Some(1));
        assert!(matches!(err, Error::CollaboratorFatal(_)));
    }

    #[test]
    fn test_classify_bare_numbers_are_per_file() {
        let err = classify_failure("claude", "parse error at line 401, column 403", Some(2));
        assert!(matches!(err, Error::Generation(_)));
        let err = classify_failure("claude", "the api key field in the config is deprecated; request too large", Some(1));
        assert!(matches!(err, Error::Generation(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unsent_prompt_is_an_error() {
        // `true` exits without reading, so a large prompt cannot be written
        let prompt = "x".repeat(4 * 1024 * 1024);
        let err = run_request(Command::new("true"), Some(prompt), Duration::from_secs(10), "true")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("Failed to send the prompt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prompt_reaches_stdin() {
        let output = run_request(Command::new("cat"), Some("hello backend\n".into()), Duration::from_secs(10), "cat")
            .await
            .unwrap();
        assert_eq!(output.as_deref(), Some("hello backend"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_fatal() {
        let cmd = Command::new("/nonexistent/docent-backend-12345");
        let err = run_request(cmd, Some("hi".into()), Duration::from_secs(5), "/nonexistent/docent-backend-12345")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CollaboratorFatal(_)));
    }
}
