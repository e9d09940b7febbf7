//! Line-delimited JSON transport between the host UI and the gateway.
//!
//! ```text
//! → {"id": 7, "channel": "fs-read", "args": ["a/b.txt"]}
//! ← {"id": 7, "result": {"content": "hi"}}
//! ```
//!
//! Each request runs in its own task, so a slow AI query never holds up a
//! directory listing. Responses funnel through one writer task and come
//! back in completion order; the host matches them by `id`.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::gateway::dispatch::dispatch;
use crate::gateway::Gateway;

/// Responses waiting for the writer before request tasks block
const RESPONSE_QUEUE: usize = 256;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub channel: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Response {
    pub id: Value,
    pub result: Value,
}

impl Response {
    fn error(id: Value, message: String) -> Self {
        Self {
            id,
            result: json!({ "error": message }),
        }
    }
}

/// Parses one input line. Unparseable input still yields a response,
/// addressed to `id` when it could be recovered and to `null` otherwise.
fn parse_request(line: &str) -> Result<Request, Response> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Response::error(Value::Null, format!("Invalid request: {e}")))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    Request::deserialize(&value).map_err(|e| Response::error(id, format!("Invalid request: {e}")))
}

/// Serves requests from `reader` until EOF, then waits for the requests
/// still in flight and returns once every response has been written.
pub async fn serve<R, W>(gateway: Arc<Gateway>, mut reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Response>(RESPONSE_QUEUE);
    let writer_task = tokio::spawn(write_responses(writer, rx));

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let parsed = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                parse_request(line)
            }
            Err(e) => Err(Response::error(Value::Null, format!("Invalid request: {e}"))),
        };

        let request = match parsed {
            Ok(request) => request,
            Err(response) => {
                warn!("Rejected request line: {}", response.result["error"]);
                if tx.send(response).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let gateway = Arc::clone(&gateway);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = dispatch(&gateway, &request.channel, &request.args).await;
            let response = Response {
                id: request.id,
                result,
            };
            if tx.send(response).await.is_err() {
                warn!("Response for {} dropped: writer is gone", request.channel);
            }
        });
    }

    info!("Input closed, draining in-flight requests");
    drop(tx);
    writer_task
        .await
        .map_err(|e| anyhow!("response writer panicked: {e}"))??;
    Ok(())
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<Response>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_vec(&response) {
            Ok(line) => line,
            Err(e) => {
                error!("Cannot serialize response {}: {e}", response.id);
                continue;
            }
        };
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        debug!("← response {}", response.id);
    }
    Ok(())
}
