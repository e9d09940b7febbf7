//! Channel routing: one handler per named channel.
//!
//! Handlers never fail across the boundary. Every error, including an
//! unknown channel or malformed arguments, comes back as
//! `{"error": message}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::native::{self, SaveDialogOptions};
use super::Gateway;
use crate::error::{GatewayError, GatewayResult};
use crate::process::terminal::open_terminal;
use crate::store::{NewDownload, Profile};

/// Page reference sent by `history-add` and `bookmarks-toggle`
#[derive(Debug, Deserialize)]
struct PageArgs {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    favicon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FetchOptions {
    #[serde(default)]
    text: bool,
}

/// Routes one request and always produces a JSON payload
pub async fn dispatch(gateway: &Gateway, channel: &str, args: &[Value]) -> Value {
    debug!("→ {channel} ({} args)", args.len());
    match handle(gateway, channel, args).await {
        Ok(value) => value,
        Err(e) => {
            if !matches!(e, GatewayError::AccessDenied) {
                warn!("{channel} failed [{}]: {e}", e.kind());
            }
            json!({ "error": e.to_string() })
        }
    }
}

async fn handle(gw: &Gateway, channel: &str, args: &[Value]) -> GatewayResult<Value> {
    let value = match channel {
        "get-project-root" => Value::String(gw.root().display().to_string()),

        // ── Filesystem ─────────────────────────────────────
        "fs-list" => to_json(gw.fs.list(opt_str(args, 0).unwrap_or("")).await?)?,
        "fs-read" => json!({ "content": gw.fs.read(str_arg(args, 0, "relPath")?).await? }),
        "fs-write" => {
            let rel = str_arg(args, 0, "relPath")?;
            let content = str_arg(args, 1, "content")?;
            gw.fs.write(rel, content).await?;
            ok()
        }
        "fs-mkdir" => {
            gw.fs.mkdir(str_arg(args, 0, "relPath")?).await?;
            ok()
        }
        "fs-delete" => {
            gw.fs.delete(str_arg(args, 0, "relPath")?).await?;
            ok()
        }

        "fetch-url" => {
            let url = str_arg(args, 0, "url")?;
            let options: FetchOptions = opt_object(args, 1)?.unwrap_or_default();
            json!({ "content": gw.fetcher.fetch(url, options.text).await? })
        }

        // ── Processes ──────────────────────────────────────
        "open-terminal" => {
            let report = open_terminal(gw.root());
            let mut value = to_json(&report)?;
            value["ok"] = Value::Bool(report.succeeded());
            value
        }
        "execute-in-terminal" => match gw.runner.execute(str_arg(args, 0, "command")?).await {
            Some(ticket) => Value::String(ticket),
            None => Value::Null,
        },
        "get-terminal-output" => match gw.runner.output(str_arg(args, 0, "ticketId")?) {
            Some(output) => Value::String(output),
            None => Value::Null,
        },
        "query-gemini" => to_json(gw.ai.query(str_arg(args, 0, "query")?).await)?,

        // ── Native helpers ─────────────────────────────────
        "show-save-dialog" => {
            let options: SaveDialogOptions = opt_object(args, 0)?.unwrap_or_default();
            to_json(native::show_save_dialog(&options).await)?
        }
        "open-folder" => {
            let dir = gw.fs.sandbox().resolve(str_arg(args, 0, "path")?)?;
            let meta = tokio::fs::metadata(&dir)
                .await
                .map_err(|_| GatewayError::NotFound(dir.display().to_string()))?;
            if !meta.is_dir() {
                return Err(GatewayError::InvalidRequest(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
            let report = native::open_folder(&dir);
            if !report.succeeded() {
                return Err(GatewayError::ProcessFailure(
                    "no file manager could be launched".to_string(),
                ));
            }
            ok()
        }
        "get-env" => {
            let key = str_arg(args, 0, "key")?;
            if gw.config.is_env_exposed(key) {
                std::env::var(key).map(Value::String).unwrap_or(Value::Null)
            } else {
                debug!("get-env: {key} is not exposed");
                Value::Null
            }
        }

        // ── Downloads ──────────────────────────────────────
        "add-download-entry" => {
            let new: NewDownload = object_arg(args, 0, "entry")?;
            to_json(gw.downloads.add(new).map_err(storage)?)?
        }
        "downloads-list" => to_json(gw.downloads.list(opt_usize(args, 0)))?,
        "downloads-search" => to_json(gw.downloads.search(str_arg(args, 0, "query")?))?,
        "downloads-by-date" => {
            let (start, end) = date_range(args)?;
            to_json(gw.downloads.by_date(start, end))?
        }
        "downloads-grouped" => grouped(gw.downloads.grouped_by_date())?,
        "downloads-clear" => {
            gw.downloads.clear().map_err(storage)?;
            ok()
        }

        // ── History ────────────────────────────────────────
        "history-add" => {
            let page: PageArgs = object_arg(args, 0, "entry")?;
            to_json(gw.history.add(&page.url, &page.title, page.favicon).map_err(storage)?)?
        }
        "history-list" => to_json(gw.history.list(opt_usize(args, 0)))?,
        "history-search" => to_json(gw.history.search(str_arg(args, 0, "query")?))?,
        "history-by-site" => to_json(gw.history.by_site(str_arg(args, 0, "site")?))?,
        "history-by-date" => {
            let (start, end) = date_range(args)?;
            to_json(gw.history.by_date(start, end))?
        }
        "history-grouped" => grouped(gw.history.grouped_by_date())?,
        "history-remove" => {
            let removed = gw.history.remove(str_arg(args, 0, "id")?).map_err(storage)?;
            json!({ "removed": removed })
        }
        "history-clear" => {
            gw.history.clear().map_err(storage)?;
            ok()
        }

        // ── Bookmarks ──────────────────────────────────────
        "bookmarks-list" => to_json(gw.bookmarks.list())?,
        "bookmarks-toggle" => {
            let page: PageArgs = object_arg(args, 0, "bookmark")?;
            let bookmarked = gw
                .bookmarks
                .toggle(&page.url, &page.title, page.favicon)
                .map_err(storage)?;
            json!({ "bookmarked": bookmarked })
        }
        "bookmarks-remove" => {
            let removed = gw.bookmarks.remove(str_arg(args, 0, "url")?).map_err(storage)?;
            json!({ "removed": removed })
        }
        "bookmarks-is-bookmarked" => Value::Bool(gw.bookmarks.is_bookmarked(str_arg(args, 0, "url")?)),

        // ── Profiles ───────────────────────────────────────
        "profiles-list" => to_json(gw.profiles.list())?,
        "profiles-save" => {
            let profile: Profile = object_arg(args, 0, "profile")?;
            to_json(gw.profiles.save(profile).map_err(storage)?)?
        }
        "profiles-delete" => {
            let removed = gw.profiles.delete(str_arg(args, 0, "id")?).map_err(storage)?;
            json!({ "removed": removed })
        }

        other => {
            return Err(GatewayError::InvalidRequest(format!("unknown channel '{other}'")));
        }
    };
    Ok(value)
}

fn ok() -> Value {
    json!({ "ok": true })
}

fn to_json<T: Serialize>(value: T) -> GatewayResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `[{date, entries}]`, newest day first
fn grouped<T: Serialize>(groups: Vec<(String, Vec<T>)>) -> GatewayResult<Value> {
    let groups: Vec<Value> = groups
        .into_iter()
        .map(|(date, entries)| -> GatewayResult<Value> {
            Ok(json!({ "date": date, "entries": to_json(entries)? }))
        })
        .collect::<GatewayResult<_>>()?;
    Ok(Value::Array(groups))
}

fn storage(e: anyhow::Error) -> GatewayError {
    GatewayError::Io(std::io::Error::other(format!("storage error: {e:#}")))
}

fn opt_str(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}

fn str_arg<'a>(args: &'a [Value], index: usize, name: &str) -> GatewayResult<&'a str> {
    opt_str(args, index)
        .ok_or_else(|| GatewayError::InvalidRequest(format!("missing string argument '{name}'")))
}

fn opt_usize(args: &[Value], index: usize) -> Option<usize> {
    args.get(index).and_then(Value::as_u64).map(|n| n as usize)
}

fn i64_arg(args: &[Value], index: usize, name: &str) -> GatewayResult<i64> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| GatewayError::InvalidRequest(format!("missing integer argument '{name}'")))
}

fn date_range(args: &[Value]) -> GatewayResult<(i64, i64)> {
    Ok((i64_arg(args, 0, "start")?, i64_arg(args, 1, "end")?))
}

fn object_arg<T: DeserializeOwned>(args: &[Value], index: usize, name: &str) -> GatewayResult<T> {
    opt_object(args, index)?
        .ok_or_else(|| GatewayError::InvalidRequest(format!("missing argument '{name}'")))
}

/// Absent or `null` reads as `None`
fn opt_object<T: DeserializeOwned>(args: &[Value], index: usize) -> GatewayResult<Option<T>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(T::deserialize(v)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn gateway(dir: &tempfile::TempDir) -> Gateway {
        let root = dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        let mut config = Config::default();
        config.gateway.root = root;
        config.gateway.exposed_env = vec!["BROWSER_GATEWAY_DISPATCH_VISIBLE".to_string()];
        config.storage.data_dir = dir.path().join("data");
        config.ai.api_key = "test-key".to_string();
        config.ai.command = Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf 'echo: %s' \"$GEMINI_QUERY\"".to_string(),
        ]);
        Gateway::new(config).unwrap()
    }

    async fn call(gw: &Gateway, channel: &str, args: Value) -> Value {
        let args = match args {
            Value::Array(a) => a,
            other => vec![other],
        };
        dispatch(gw, channel, &args).await
    }

    #[tokio::test]
    async fn test_write_then_read_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let res = call(&gw, "fs-write", json!(["a/b/c.txt", "hi"])).await;
        assert_eq!(res, json!({"ok": true}));
        let res = call(&gw, "fs-read", json!(["a/b/c.txt"])).await;
        assert_eq!(res, json!({"content": "hi"}));
        assert!(gw.root().join("a").is_dir());
        assert!(gw.root().join("a/b").is_dir());
    }

    #[tokio::test]
    async fn test_escape_is_access_denied() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let res = call(&gw, "fs-write", json!(["../../etc/passwd", "x"])).await;
        assert_eq!(res, json!({"error": "Access denied"}));
        assert!(!dir.path().join("etc").exists());

        for channel in ["fs-read", "fs-list", "fs-mkdir", "fs-delete"] {
            let res = call(&gw, channel, json!(["../outside"])).await;
            assert_eq!(res, json!({"error": "Access denied"}), "{channel}");
        }
    }

    #[tokio::test]
    async fn test_list_shape() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        call(&gw, "fs-mkdir", json!(["sub"])).await;
        call(&gw, "fs-write", json!(["file.txt", ""])).await;

        let res = call(&gw, "fs-list", json!([])).await;
        assert_eq!(
            res,
            json!([
                {"name": "file.txt", "isDirectory": false},
                {"name": "sub", "isDirectory": true}
            ])
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        call(&gw, "fs-write", json!(["d/x.txt", "x"])).await;
        assert_eq!(call(&gw, "fs-delete", json!(["d"])).await, json!({"ok": true}));
        assert!(!gw.root().join("d").exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let res = call(&gw, "fs-read", json!(["missing.txt"])).await;
        assert!(res["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_channel_and_missing_args() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let res = call(&gw, "window-minimize", json!([])).await;
        assert!(res["error"].as_str().unwrap().contains("unknown channel"));

        let res = call(&gw, "fs-read", json!([])).await;
        assert!(res["error"].as_str().unwrap().contains("relPath"));

        let res = call(&gw, "fs-read", json!([42])).await;
        assert!(res["error"].as_str().unwrap().contains("relPath"));
    }

    #[tokio::test]
    async fn test_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let res = call(&gw, "get-project-root", json!([])).await;
        assert_eq!(res, json!(gw.root().display().to_string()));
    }

    #[cfg(unix)]
    #[tokio::test(start_paused = true)]
    async fn test_execute_then_poll_then_expire() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let ticket = call(&gw, "execute-in-terminal", json!(["echo hello"])).await;
        let ticket = ticket.as_str().unwrap().to_string();
        assert!(ticket.starts_with("term-"));

        let output = call(&gw, "get-terminal-output", json!([ticket.clone()])).await;
        assert!(output.as_str().unwrap().contains("hello"));
        let again = call(&gw, "get-terminal-output", json!([ticket.clone()])).await;
        assert_eq!(output, again);

        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        let expired = call(&gw, "get-terminal-output", json!([ticket])).await;
        assert_eq!(expired, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let res = call(&gw, "get-terminal-output", json!(["term-0-deadbeef"])).await;
        assert_eq!(res, Value::Null);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_query_gemini_goes_through_child() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let res = call(&gw, "query-gemini", json!(["hello"])).await;
        assert_eq!(res, json!({"text": "echo: hello"}));
    }

    #[tokio::test]
    async fn test_get_env_is_allowlisted() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        std::env::set_var("BROWSER_GATEWAY_DISPATCH_VISIBLE", "yes");
        std::env::set_var("BROWSER_GATEWAY_DISPATCH_HIDDEN", "no");

        let res = call(&gw, "get-env", json!(["BROWSER_GATEWAY_DISPATCH_VISIBLE"])).await;
        assert_eq!(res, json!("yes"));
        let res = call(&gw, "get-env", json!(["BROWSER_GATEWAY_DISPATCH_HIDDEN"])).await;
        assert_eq!(res, Value::Null);
    }

    #[tokio::test]
    async fn test_open_folder_checks_sandbox_and_existence() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let res = call(&gw, "open-folder", json!(["../"])).await;
        assert_eq!(res, json!({"error": "Access denied"}));

        let res = call(&gw, "open-folder", json!(["nope"])).await;
        assert!(res["error"].as_str().unwrap().starts_with("Not found"));

        call(&gw, "fs-write", json!(["f.txt", "x"])).await;
        let res = call(&gw, "open-folder", json!(["f.txt"])).await;
        assert!(res["error"].as_str().unwrap().contains("not a directory"));
    }

    #[tokio::test]
    async fn test_fetch_url_rejects_bad_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let res = call(&gw, "fetch-url", json!(["file:///etc/passwd"])).await;
        assert!(res["error"].as_str().unwrap().contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn test_fetch_url_text_option() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let (base, _req) =
            crate::test_support::serve_once(200, "text/html", "<p>Readable</p>").await;
        let res = call(&gw, "fetch-url", json!([base, {"text": true}])).await;
        assert_eq!(res, json!({"content": "Readable"}));
    }

    #[tokio::test]
    async fn test_downloads_flow() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let entry = call(
            &gw,
            "add-download-entry",
            json!({
                "filename": "report.pdf",
                "url": "https://example.com/report.pdf",
                "fileSize": 1536,
                "filePath": "/tmp/report.pdf",
                "status": "completed"
            }),
        )
        .await;
        assert_eq!(entry["status"], "completed");
        assert!(entry["id"].is_string());

        let list = call(&gw, "downloads-list", json!([])).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        let hits = call(&gw, "downloads-search", json!(["REPORT"])).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);

        let ts = entry["timestamp"].as_i64().unwrap();
        let range = call(&gw, "downloads-by-date", json!([ts, ts])).await;
        assert_eq!(range.as_array().unwrap().len(), 1);

        let groups = call(&gw, "downloads-grouped", json!([])).await;
        assert_eq!(groups[0]["entries"].as_array().unwrap().len(), 1);
        assert!(groups[0]["date"].is_string());

        assert_eq!(call(&gw, "downloads-clear", json!([])).await, json!({"ok": true}));
        assert_eq!(call(&gw, "downloads-list", json!([])).await, json!([]));
    }

    #[tokio::test]
    async fn test_bad_download_status_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let res = call(
            &gw,
            "add-download-entry",
            json!({"filename": "a", "url": "u", "status": "paused"}),
        )
        .await;
        assert!(res["error"].as_str().unwrap().starts_with("Invalid request"));
    }

    #[tokio::test]
    async fn test_history_flow() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        call(&gw, "history-add", json!({"url": "https://docs.rs/", "title": "Docs"})).await;
        call(&gw, "history-add", json!({"url": "https://crates.io/", "title": "Crates"})).await;
        call(&gw, "history-add", json!({"url": "https://docs.rs/", "title": "Docs.rs"})).await;

        let list = call(&gw, "history-list", json!([])).await;
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_eq!(list[0]["title"], "Docs.rs");

        assert_eq!(call(&gw, "history-list", json!([1])).await.as_array().unwrap().len(), 1);
        assert_eq!(call(&gw, "history-search", json!(["crates"])).await.as_array().unwrap().len(), 1);
        assert_eq!(call(&gw, "history-by-site", json!(["docs.rs"])).await.as_array().unwrap().len(), 1);

        let id = list[0]["id"].as_str().unwrap().to_string();
        assert_eq!(call(&gw, "history-remove", json!([id])).await, json!({"removed": true}));
        assert_eq!(call(&gw, "history-clear", json!([])).await, json!({"ok": true}));
        assert_eq!(call(&gw, "history-list", json!([])).await, json!([]));
    }

    #[tokio::test]
    async fn test_bookmarks_flow() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let page = json!({"url": "https://a.com/", "title": "A"});

        assert_eq!(call(&gw, "bookmarks-toggle", page.clone()).await, json!({"bookmarked": true}));
        assert_eq!(call(&gw, "bookmarks-is-bookmarked", json!(["https://a.com/"])).await, json!(true));
        assert_eq!(call(&gw, "bookmarks-toggle", page.clone()).await, json!({"bookmarked": false}));

        call(&gw, "bookmarks-toggle", page).await;
        assert_eq!(call(&gw, "bookmarks-list", json!([])).await.as_array().unwrap().len(), 1);
        assert_eq!(
            call(&gw, "bookmarks-remove", json!(["https://a.com/"])).await,
            json!({"removed": true})
        );
    }

    #[tokio::test]
    async fn test_profiles_flow() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);

        let saved = call(&gw, "profiles-save", json!({"name": "Ada", "email": "ada@example.com"})).await;
        let id = saved["id"].as_str().unwrap().to_string();
        assert!(saved["createdAt"].as_i64().unwrap() > 0);

        call(&gw, "profiles-save", json!({"id": id, "name": "Ada L.", "email": "ada@example.com"})).await;
        let list = call(&gw, "profiles-list", json!([])).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["name"], "Ada L.");

        assert_eq!(call(&gw, "profiles-delete", json!([id])).await, json!({"removed": true}));
    }
}
