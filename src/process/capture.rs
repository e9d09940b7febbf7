//! Runs a child process to completion with stdout and stderr merged into
//! one buffer, in the order the chunks arrive.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::warn;

const CHUNK_SIZE: usize = 8192;

/// Result of a captured run
#[derive(Debug)]
pub struct CapturedOutput {
    pub output: String,
    pub status: ExitStatus,
    pub truncated: bool,
}

/// Byte buffer that stops growing at `limit`
struct OutputBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
}

/// Spawns `command` with stdin closed, waits for it to exit and returns
/// everything it wrote. Output past `max_bytes` is dropped and a marker is
/// appended.
pub async fn run_captured(mut command: Command, max_bytes: usize) -> std::io::Result<CapturedOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn()?;
    let buffer = Arc::new(Mutex::new(OutputBuffer::new(max_bytes)));

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (_, _, status) = tokio::join!(
        pump(stdout, Arc::clone(&buffer)),
        pump(stderr, Arc::clone(&buffer)),
        child.wait(),
    );
    let status = status?;

    let guard = buffer.lock().unwrap_or_else(|e| e.into_inner());
    let truncated = guard.truncated;
    let mut output = String::from_utf8_lossy(&guard.bytes).into_owned();
    drop(guard);
    if truncated {
        output.push_str(&format!("\n[output truncated at {max_bytes} bytes]"));
    }

    Ok(CapturedOutput {
        output,
        status,
        truncated,
    })
}

async fn pump<R: AsyncRead + Unpin>(reader: Option<R>, buffer: Arc<Mutex<OutputBuffer>>) {
    let Some(mut reader) = reader else {
        return;
    };
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Err(e) => {
                warn!("Output pipe read failed, keeping what was read: {e}");
                break;
            }
            Ok(n) => buffer
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(&chunk[..n]),
        }
    }
}
