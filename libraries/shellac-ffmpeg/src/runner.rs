//! Bounded subprocess execution for the ffmpeg tools.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use shellac_core::{MasterError, Result};

/// Poll interval while waiting on a child process.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Grace period for the drain threads once the child has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest stderr excerpt carried into error messages or logs.
const STDERR_TAIL_BYTES: usize = 600;

/// Run one tool invocation to completion, killing it at `timeout`.
///
/// Stdout and stderr are drained on their own threads so a chatty child
/// cannot block on a full pipe. A non-zero exit becomes an engine error
/// carrying the tail of stderr.
pub(crate) fn run_tool(
    binary: &Path,
    operation: &str,
    args: &[String],
    timeout: Duration,
) -> Result<Output> {
    tracing::debug!(
        tool = %binary.display(),
        operation,
        args = %args.join(" "),
        "spawning"
    );

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            MasterError::engine(format!(
                "failed to launch {} for {operation}: {e}",
                binary.display()
            ))
        })?;
    let started = Instant::now();

    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    loop {
        let status = child
            .try_wait()
            .map_err(|e| MasterError::engine(format!("failed to wait on {operation}: {e}")))?;
        if let Some(status) = status {
            let stdout = stdout_rx.recv_timeout(DRAIN_TIMEOUT).unwrap_or_default();
            let stderr = stderr_rx.recv_timeout(DRAIN_TIMEOUT).unwrap_or_default();
            if !status.success() {
                let code = status.code().unwrap_or(-1);
                return Err(MasterError::engine(format!(
                    "{operation} exited with status {code}: {}",
                    tail(&stderr)
                )));
            }
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            let stderr = stderr_rx.recv_timeout(DRAIN_TIMEOUT).unwrap_or_default();
            tracing::warn!(operation, stderr = %tail(&stderr), "killed after timeout");
            return Err(MasterError::engine_timeout(operation, timeout.as_secs()));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// Last stretch of stderr as printable text.
pub(crate) fn tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    let text = String::from_utf8_lossy(&stderr[start..]);
    let trimmed = text.trim();
    if start == 0 {
        trimmed.to_string()
    } else {
        format!("... {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_a_successful_command() {
        let output = run_tool(
            Path::new("echo"),
            "echo",
            &["tone".to_string()],
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(String::from_utf8_lossy(&output.stdout).contains("tone"));
    }

    #[test]
    fn nonzero_exit_becomes_an_engine_error() {
        let err = run_tool(Path::new("false"), "probe", &[], Duration::from_secs(5)).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("probe"), "unexpected error: {text}");
        assert!(text.contains("status 1"), "unexpected error: {text}");
    }

    #[test]
    fn missing_binary_is_reported_with_the_operation() {
        let err = run_tool(
            Path::new("/no/such/tool"),
            "analyze",
            &[],
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(err.to_string().contains("analyze"));
    }

    #[test]
    fn slow_command_is_killed_at_the_timeout() {
        let err = run_tool(
            Path::new("sleep"),
            "encode",
            &["30".to_string()],
            Duration::from_millis(150),
        )
        .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("encode"));
    }

    #[test]
    fn tail_keeps_the_end_of_long_output() {
        let long: String = "x".repeat(2000) + "final line";
        let tailed = tail(long.as_bytes());
        assert!(tailed.starts_with("... "));
        assert!(tailed.ends_with("final line"));
        assert!(tailed.len() < 700);
        assert_eq!(tail(b"short"), "short");
    }
}
