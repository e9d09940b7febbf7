use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::capture::run_captured;
use super::tickets::TicketStore;

/// Runs shell commands in the sandbox root and parks their output under a ticket.
///
/// The caller gets the ticket back only once the command has exited, so
/// an immediate `output()` call always sees the complete buffer. There is
/// no deadline and no way to cancel a running command.
pub struct ProcessRunner {
    root: PathBuf,
    tickets: TicketStore,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(root: PathBuf, tickets: TicketStore, max_output_bytes: usize) -> Self {
        Self {
            root,
            tickets,
            max_output_bytes,
        }
    }

    /// Runs `command` through the platform shell. Returns the ticket, or
    /// `None` if the shell could not be spawned.
    pub async fn execute(&self, command: &str) -> Option<String> {
        info!("Executing in {}: {command}", self.root.display());

        let captured = match run_captured(shell_command(command, &self.root), self.max_output_bytes).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to spawn shell for {command:?}: {e}");
                return None;
            }
        };

        if captured.truncated {
            warn!(
                "Output of {command:?} truncated at {} bytes",
                self.max_output_bytes
            );
        }
        if !captured.status.success() {
            warn!(
                "Command {command:?} exited with {}",
                captured
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string())
            );
        }

        let ticket = self.tickets.insert(captured.output);
        info!(
            "Output of {command:?} stored under {ticket} (expires in {}s)",
            self.tickets.ttl().as_secs()
        );
        Some(ticket)
    }

    /// Output for a ticket, or `None` when unknown or expired
    pub fn output(&self, ticket: &str) -> Option<String> {
        match self.tickets.get(ticket) {
            Some(record) => {
                debug!(
                    "Ticket {} read, stored at {}",
                    record.ticket_id,
                    record.created_at.to_rfc3339()
                );
                Some(record.output)
            }
            None => {
                debug!("Ticket {ticket} unknown or expired");
                None
            }
        }
    }
}

/// `sh -c` on Unix, `cmd /C` on Windows, with `cwd` as working directory
fn shell_command(command: &str, cwd: &std::path::Path) -> Command {
    let (shell, flag) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };
    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command).current_dir(cwd);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runner(root: &std::path::Path) -> ProcessRunner {
        ProcessRunner::new(
            std::fs::canonicalize(root).unwrap(),
            TicketStore::new(Duration::from_secs(30)),
            1024 * 1024,
        )
    }

    #[tokio::test]
    async fn test_echo_hello() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let ticket = runner.execute("echo hello").await.unwrap();
        let output = runner.output(&ticket).unwrap();
        assert!(output.contains("hello"));
    }

    #[tokio::test]
    async fn test_runs_in_sandbox_root() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let ticket = runner.execute("pwd").await.unwrap();
        let output = runner.output(&ticket).unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(output.trim(), expected.to_str().unwrap());
    }

    #[tokio::test]
    async fn test_merges_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let ticket = runner.execute("echo visible >&2").await.unwrap();
        assert!(runner.output(&ticket).unwrap().contains("visible"));
    }

    #[tokio::test]
    async fn test_failing_command_still_gets_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let ticket = runner.execute("ls /definitely/missing/path").await.unwrap();
        assert!(!runner.output(&ticket).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_cwd_returns_none() {
        let runner = ProcessRunner::new(
            PathBuf::from("/definitely/missing/root"),
            TicketStore::new(Duration::from_secs(30)),
            1024,
        );
        assert!(runner.execute("echo hi").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        assert!(runner.output("term-1-00000000").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_gone_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let ticket = runner.execute("echo hello").await.unwrap();
        assert!(runner.output(&ticket).unwrap().contains("hello"));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(runner.output(&ticket).is_none());
    }
}
