//! Persistent, sentinel-framed shell execution. See spec.md §4.3.
//!
//! One `/bin/sh` subprocess is spawned per session and kept alive across
//! calls. Each command is framed with a unique sentinel so its boundary (and
//! exit code) can be recovered from an interleaved, long-lived stdout stream.
//! A command that exceeds its timeout kills the whole process group and
//! latches the shell as broken: the next call must pass `restart`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dts_core::{ToolError, ToolResult, truncate_bytes};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Result of one command executed against a [`PersistentShell`].
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// Quote a path for safe interpolation inside a POSIX shell single-quoted
/// string.
fn shell_quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}

fn spawn_child() -> std::io::Result<Child> {
    let mut cmd = Command::new("/bin/sh");
    cmd.stdin(std::process::Stdio::piped());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    // SAFETY: setsid() is async-signal-safe and runs before exec. Isolating
    // the shell in its own process group lets a timed-out command's children
    // be killed together via killpg.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    cmd.spawn()
}

fn killpg(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: negating the pid targets the process group; the shell was
        // spawned with setsid so its pid is also its pgid.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
}

/// A long-lived interactive shell session.
pub struct PersistentShell {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_buf: Arc<Mutex<Vec<u8>>>,
    stderr_task: tokio::task::JoinHandle<()>,
    broken: bool,
}

impl PersistentShell {
    pub fn spawn() -> ToolResult<Self> {
        let mut child =
            spawn_child().map_err(|e| ToolError::Internal(format!("spawning shell: {e}")))?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        let mut stderr = child.stderr.take().expect("piped stderr");

        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf_task = Arc::clone(&stderr_buf);
        let stderr_task = tokio::spawn(async move {
            let mut chunk = [0u8; 4096];
            loop {
                match stderr.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => stderr_buf_task.lock().await.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        warn!("shell stderr read error: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child,
            stdin,
            stdout,
            stderr_buf,
            stderr_task,
            broken: false,
        })
    }

    /// Tear down the current subprocess (if any) and spawn a fresh one.
    pub async fn restart(&mut self) -> ToolResult<()> {
        killpg(&self.child);
        let _ = self.child.kill().await;
        self.stderr_task.abort();
        let fresh = Self::spawn()?;
        *self = fresh;
        Ok(())
    }

    /// Run `command` with the shell's working directory set to `cwd`,
    /// enforcing `timeout` and truncating each stream to `output_max_bytes`.
    ///
    /// Returns [`ToolError::ShellBroken`] if a prior command timed out and
    /// the shell hasn't been restarted yet, or [`ToolError::CommandTimeout`]
    /// if this call is the one that times out (the shell is left broken).
    pub async fn run(
        &mut self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
        output_max_bytes: usize,
    ) -> ToolResult<ShellOutput> {
        if self.broken {
            return Err(ToolError::ShellBroken);
        }

        let sentinel = format!("__dts_sentinel_{}__", Uuid::new_v4().simple());
        let framed = format!(
            "cd {cwd} && {{ {command}\n}}; __dts_rc=$?; printf '%s %d\\n' '{sentinel}' \"$__dts_rc\"\n",
            cwd = shell_quote(cwd),
        );

        if self.stdin.write_all(framed.as_bytes()).await.is_err() {
            self.broken = true;
            return Err(ToolError::ShellBroken);
        }

        match tokio::time::timeout(timeout, self.read_until_sentinel(&sentinel)).await {
            Ok(Ok((stdout_lines, exit_code))) => {
                let stderr_bytes = std::mem::take(&mut *self.stderr_buf.lock().await);
                let stderr_raw = String::from_utf8_lossy(&stderr_bytes).into_owned();
                let (mut stdout, stdout_truncated) =
                    truncate_bytes(&stdout_lines.join("\n"), output_max_bytes);
                let (mut stderr, stderr_truncated) = truncate_bytes(&stderr_raw, output_max_bytes);
                if stdout_truncated {
                    stdout.push_str(dts_core::TRUNCATION_MARKER);
                }
                if stderr_truncated {
                    stderr.push_str(dts_core::TRUNCATION_MARKER);
                }
                Ok(ShellOutput {
                    stdout,
                    stderr,
                    exit_code,
                    stdout_truncated,
                    stderr_truncated,
                })
            }
            Ok(Err(e)) => {
                self.broken = true;
                Err(e)
            }
            Err(_) => {
                killpg(&self.child);
                self.broken = true;
                Err(ToolError::CommandTimeout(timeout))
            }
        }
    }

    async fn read_until_sentinel(&mut self, sentinel: &str) -> ToolResult<(Vec<String>, i32)> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let n = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| ToolError::Internal(format!("reading shell stdout: {e}")))?;
            if n == 0 {
                return Err(ToolError::ShellBroken);
            }
            let trimmed = line.trim_end_matches('\n');
            if let Some(rest) = trimmed.strip_prefix(sentinel) {
                let exit_code = rest.trim().parse::<i32>().unwrap_or(1);
                return Ok((lines, exit_code));
            }
            lines.push(trimmed.to_string());
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl Drop for PersistentShell {
    fn drop(&mut self) {
        killpg(&self.child);
        self.stderr_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_simple_command_and_captures_exit_code() {
        let mut shell = PersistentShell::spawn().unwrap();
        let cwd = std::env::temp_dir();
        let out = shell
            .run("echo hello", &cwd, Duration::from_secs(5), 1 << 20)
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn exit_code_is_propagated() {
        let mut shell = PersistentShell::spawn().unwrap();
        let cwd = std::env::temp_dir();
        let out = shell
            .run("exit 7", &cwd, Duration::from_secs(5), 1 << 20)
            .await
            .unwrap();
        assert_eq!(out.exit_code, 7);
    }

    #[tokio::test]
    async fn cwd_is_honored_across_calls() {
        let mut shell = PersistentShell::spawn().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("marker.txt"), b"x").unwrap();

        let out = shell
            .run("ls", temp.path(), Duration::from_secs(5), 1 << 20)
            .await
            .unwrap();
        assert!(out.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn persists_environment_across_calls() {
        let mut shell = PersistentShell::spawn().unwrap();
        let cwd = std::env::temp_dir();
        shell
            .run("export FOO=bar", &cwd, Duration::from_secs(5), 1 << 20)
            .await
            .unwrap();
        let out = shell
            .run("echo $FOO", &cwd, Duration::from_secs(5), 1 << 20)
            .await
            .unwrap();
        assert_eq!(out.stdout, "bar");
    }

    #[tokio::test]
    async fn timeout_breaks_the_shell_until_restart() {
        let mut shell = PersistentShell::spawn().unwrap();
        let cwd = std::env::temp_dir();
        let timed_out = shell
            .run("sleep 5", &cwd, Duration::from_millis(50), 1 << 20)
            .await;
        assert!(matches!(timed_out, Err(ToolError::CommandTimeout(_))));
        assert!(shell.is_broken());

        let blocked = shell
            .run("echo again", &cwd, Duration::from_secs(5), 1 << 20)
            .await;
        assert!(matches!(blocked, Err(ToolError::ShellBroken)));

        shell.restart().await.unwrap();
        let out = shell
            .run("echo recovered", &cwd, Duration::from_secs(5), 1 << 20)
            .await
            .unwrap();
        assert_eq!(out.stdout, "recovered");
    }

    #[tokio::test]
    async fn output_is_truncated_past_budget() {
        let mut shell = PersistentShell::spawn().unwrap();
        let cwd = std::env::temp_dir();
        let out = shell
            .run("yes x | head -c 5000", &cwd, Duration::from_secs(5), 100)
            .await
            .unwrap();
        assert!(out.stdout_truncated);
        assert!(out.stdout.len() <= 100 + dts_core::TRUNCATION_MARKER.len());
    }
}
