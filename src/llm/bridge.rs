//! AI query bridge: one short-lived child process per query.
//!
//! The query and credentials travel to the child through environment
//! variables; whatever the child prints is the answer. There is no
//! connection reuse and no streaming, so every query pays process startup.

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::process::capture::run_captured;

/// Text shown to the user whenever the child fails
pub const FALLBACK_TEXT: &str = "Sorry, I encountered an error processing your request.";

/// Subcommand that puts this binary in child-query mode
pub const CHILD_SUBCOMMAND: &str = "ai-query";

const MAX_CHILD_OUTPUT: usize = 1024 * 1024;

/// Reply sent back to the renderer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AiReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiReply {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            error: Some(error.into()),
        }
    }
}

pub struct AiQueryBridge {
    program: String,
    args: Vec<String>,
    config: AiConfig,
}

impl AiQueryBridge {
    /// Uses `config.command` when set, otherwise re-invokes the current
    /// executable with the `ai-query` subcommand.
    pub fn new(config: AiConfig) -> Self {
        let (program, args) = match config.command.as_deref() {
            Some([program, args @ ..]) => (program.clone(), args.to_vec()),
            _ => {
                let exe = std::env::current_exe()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "browser-gateway".to_string());
                (exe, vec![CHILD_SUBCOMMAND.to_string()])
            }
        };
        Self {
            program,
            args,
            config,
        }
    }

    pub async fn query(&self, query: &str) -> AiReply {
        if self.config.api_key.is_empty() {
            warn!("AI query rejected: no API key configured");
            return AiReply::failure("GEMINI_API_KEY is not configured");
        }

        info!("AI query ({} chars) via {}", query.len(), self.program);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("GEMINI_QUERY", query)
            .env("GEMINI_API_KEY", &self.config.api_key)
            .env("GEMINI_MODEL", &self.config.model)
            .env("GEMINI_BASE_URL", &self.config.base_url);

        let captured = match run_captured(command, MAX_CHILD_OUTPUT).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to spawn AI child {}: {e}", self.program);
                return AiReply::failure(format!("Failed to start AI process: {e}"));
            }
        };

        let output = captured.output.trim();
        if !captured.status.success() {
            warn!("AI child exited with {}: {output}", captured.status);
            let detail = if output.is_empty() {
                format!("AI process exited with {}", captured.status)
            } else {
                output.to_string()
            };
            return AiReply::failure(detail);
        }
        if output.is_empty() {
            warn!("AI child produced no output");
            return AiReply::failure("No response from AI service");
        }

        AiReply {
            text: output.to_string(),
            error: None,
        }
    }
}
