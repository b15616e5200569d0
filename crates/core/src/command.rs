use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct CommandOutput {
    pub status: Option<i32>, // None when killed by the timeout or a signal
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn failure_reason(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            self.stderr.trim().to_string()
        }
    }
}

pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {}", program))?;

    // Both pipes are drained off-thread; a child blocked on a full pipe
    // buffer would otherwise never exit while we poll for it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child
            .try_wait()
            .with_context(|| format!("wait for {}", program))?
        {
            Some(status) => break status.code(),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                // A grandchild may still hold the pipes open; abandon the
                // readers rather than wait on output nobody will use.
                return Ok(CommandOutput {
                    status: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: true,
                });
            }
            None => thread::sleep(REAP_POLL_INTERVAL),
        }
    };

    Ok(CommandOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
        timed_out: false,
    })
}

// Fire and forget: no captured output, no exit status. Dropping the Child
// handle leaves the process running on its own.
pub fn spawn_detached(program: &str, args: &[&str]) -> Result<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("spawn {}", program))?;
    Ok(())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = reader.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_reports_success() {
        let output = run_with_timeout("sh", &["-c", "echo hello"], Duration::from_secs(5)).unwrap();
        assert!(output.success());
        assert_eq!(output.status, Some(0));
        assert_eq!(output.stdout.trim(), "hello");
        assert!(!output.timed_out);
    }

    #[test]
    fn captures_stderr_and_a_non_zero_status() {
        let output =
            run_with_timeout("sh", &["-c", "echo oops >&2; exit 3"], Duration::from_secs(5))
                .unwrap();
        assert!(!output.success());
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.failure_reason(), "oops");
    }

    #[test]
    fn kills_a_command_that_outlives_the_timeout() {
        let started = Instant::now();
        let output = run_with_timeout("sleep", &["5"], Duration::from_millis(100)).unwrap();
        assert!(output.timed_out);
        assert!(!output.success());
        assert_eq!(output.status, None);
        assert_eq!(output.failure_reason(), "timed out");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn a_missing_binary_is_a_spawn_error() {
        let result = run_with_timeout("blkdetect-no-such-tool", &[], Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn detached_spawn_returns_without_waiting() {
        let started = Instant::now();
        spawn_detached("sleep", &["2"]).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn detached_spawn_of_a_missing_binary_is_an_error() {
        assert!(spawn_detached("blkdetect-no-such-tool", &[]).is_err());
    }
}
