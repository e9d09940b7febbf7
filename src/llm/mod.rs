pub mod bridge;
pub mod gemini;

use std::io::Write;

pub use bridge::AiQueryBridge;
pub use gemini::GeminiClient;

const DEFAULT_QUERY: &str = "Hello! How can I help you?";

/// What the `ai-query` child receives from the parent
#[derive(Debug, Default)]
pub struct QueryParams {
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl QueryParams {
    /// Reads `GEMINI_QUERY`, `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_BASE_URL`
    pub fn from_env() -> Self {
        Self {
            query: std::env::var("GEMINI_QUERY").ok(),
            api_key: std::env::var("GEMINI_API_KEY").ok(),
            model: std::env::var("GEMINI_MODEL").ok(),
            base_url: std::env::var("GEMINI_BASE_URL").ok(),
        }
    }
}

/// Entry point for `browser-gateway ai-query`: the child side of the bridge.
/// Prints the answer on stdout and returns the process exit code.
pub async fn run_query_child() -> i32 {
    answer_query(
        QueryParams::from_env(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await
}

/// Answers one query. Exit code 0 with the text on `out`, or 1 with an
/// `Error generating content:` line on `err`.
pub async fn answer_query(params: QueryParams, out: &mut impl Write, err: &mut impl Write) -> i32 {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    let Some(api_key) = params.api_key.filter(|k| !k.is_empty()) else {
        let _ = writeln!(err, "Error generating content: GEMINI_API_KEY is not set");
        return 1;
    };
    let model = params
        .model
        .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
    let base_url = params
        .base_url
        .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string());

    let client = GeminiClient::new(api_key, model, base_url);
    match client.generate(&query).await {
        Ok(text) => {
            let _ = writeln!(out, "{text}");
            0
        }
        Err(e) => {
            let _ = writeln!(err, "Error generating content: {e}");
            1
        }
    }
}
