//! Native helpers without a windowing toolkit: the save dialog and
//! "open folder" go through whatever helper program the platform ships.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::process::capture::run_captured;
use crate::process::terminal::launch_first;
use crate::process::{LaunchReport, Launcher, Platform};

const DEFAULT_DIALOG_TITLE: &str = "Save As";

/// Dialog output is a single path
const MAX_DIALOG_OUTPUT: usize = 64 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDialogOptions {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub default_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveDialogResult {
    pub canceled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl SaveDialogResult {
    fn canceled() -> Self {
        Self {
            canceled: true,
            file_path: None,
        }
    }
}

/// Dialog helpers in priority order
pub fn save_dialog_candidates(platform: Platform, options: &SaveDialogOptions) -> Vec<Launcher> {
    let title = options.title.as_deref().unwrap_or(DEFAULT_DIALOG_TITLE);
    let default_path = options.default_path.as_deref().unwrap_or("");

    match platform {
        Platform::Linux => vec![
            Launcher::new(
                "zenity",
                &[
                    "--file-selection",
                    "--save",
                    "--confirm-overwrite",
                    &format!("--title={title}"),
                    &format!("--filename={default_path}"),
                ],
            ),
            Launcher::new("kdialog", &["--getsavefilename", default_path, "--title", title]),
        ],
        Platform::MacOs => {
            let script = format!(
                "POSIX path of (choose file name with prompt \"{}\" default name \"{}\")",
                applescript_escape(title),
                applescript_escape(file_name(default_path)),
            );
            vec![Launcher::new("osascript", &["-e", &script])]
        }
        Platform::Windows => {
            let script = format!(
                "Add-Type -AssemblyName System.Windows.Forms; \
                 $d = New-Object System.Windows.Forms.SaveFileDialog; \
                 $d.Title = '{}'; $d.FileName = '{}'; \
                 if ($d.ShowDialog() -eq 'OK') {{ $d.FileName }} else {{ exit 1 }}",
                title.replace('\'', "''"),
                default_path.replace('\'', "''"),
            );
            vec![Launcher::new("powershell.exe", &["-NoProfile", "-Command", &script])]
        }
    }
}

/// Runs the first available dialog helper. A helper that exits non-zero
/// or prints nothing means the user canceled; no helper at all also
/// reads as canceled.
pub async fn show_save_dialog_with(candidates: &[Launcher]) -> SaveDialogResult {
    for launcher in candidates {
        let mut command = Command::new(&launcher.program);
        command.args(&launcher.args);

        let captured = match run_captured(command, MAX_DIALOG_OUTPUT).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} not installed, trying next", launcher.program);
                continue;
            }
            Err(e) => {
                warn!("Failed to run {}: {e}", launcher.program);
                continue;
            }
        };

        let path = captured.output.trim();
        if !captured.status.success() || path.is_empty() {
            debug!("Save dialog canceled ({})", launcher.program);
            return SaveDialogResult::canceled();
        }
        info!("Save dialog chose {path}");
        return SaveDialogResult {
            canceled: false,
            file_path: Some(path.to_string()),
        };
    }

    warn!("No save dialog helper available");
    SaveDialogResult::canceled()
}

pub async fn show_save_dialog(options: &SaveDialogOptions) -> SaveDialogResult {
    show_save_dialog_with(&save_dialog_candidates(Platform::current(), options)).await
}

/// File manager launcher for each platform
pub fn open_folder_candidates(platform: Platform, dir: &Path) -> Vec<Launcher> {
    let dir = dir.display().to_string();
    match platform {
        Platform::Linux => vec![Launcher::new("xdg-open", &[&dir])],
        Platform::MacOs => vec![Launcher::new("open", &[&dir])],
        Platform::Windows => vec![Launcher::new("explorer.exe", &[&dir])],
    }
}

/// Opens `dir` in the platform file manager, without waiting for it
pub fn open_folder(dir: &Path) -> LaunchReport {
    launch_first(&open_folder_candidates(Platform::current(), dir), dir)
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
