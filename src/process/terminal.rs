//! Visible terminal launch: an ordered list of candidate programs per
//! platform, tried in turn until one spawns.
//!
//! A candidate whose program does not exist is skipped silently; any other
//! spawn error is recorded in the [`LaunchReport`]. The spawned terminal is
//! not waited on.

use std::path::Path;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// One program + argument list to try
#[derive(Debug, Clone, PartialEq)]
pub struct Launcher {
    pub program: String,
    pub args: Vec<String>,
}

impl Launcher {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Command line as a single display string
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LaunchFailure {
    pub program: String,
    pub error: String,
}

/// Outcome of trying a candidate list
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct LaunchReport {
    /// Command line of the candidate that started, if any
    pub launched: Option<String>,
    /// Candidates whose program was not installed
    pub skipped: Vec<String>,
    pub failures: Vec<LaunchFailure>,
}

impl LaunchReport {
    pub fn succeeded(&self) -> bool {
        self.launched.is_some()
    }
}

/// Terminal candidates in priority order
pub fn terminal_candidates(platform: Platform, cwd: &Path) -> Vec<Launcher> {
    let dir = cwd.display().to_string();
    match platform {
        Platform::Windows => vec![
            Launcher::new("wt.exe", &["-d", &dir]),
            Launcher::new("cmd.exe", &["/C", "start", "", "powershell.exe", "-NoExit"]),
            Launcher::new("cmd.exe", &["/C", "start", "", "cmd.exe"]),
        ],
        Platform::MacOs => vec![Launcher::new("open", &["-a", "Terminal", &dir])],
        Platform::Linux => vec![
            Launcher::new("x-terminal-emulator", &[]),
            Launcher::new("gnome-terminal", &[&format!("--working-directory={dir}")]),
            Launcher::new("konsole", &["--workdir", &dir]),
            Launcher::new("xfce4-terminal", &[&format!("--working-directory={dir}")]),
            Launcher::new("alacritty", &["--working-directory", &dir]),
            Launcher::new("kitty", &["--directory", &dir]),
            Launcher::new("xterm", &[]),
        ],
    }
}

/// Spawns the first candidate that starts, with `cwd` as working directory.
pub fn launch_first(candidates: &[Launcher], cwd: &Path) -> LaunchReport {
    let mut report = LaunchReport::default();

    for launcher in candidates {
        let mut command = Command::new(&launcher.program);
        command.args(&launcher.args).current_dir(cwd);

        match command.spawn() {
            Ok(_child) => {
                info!("Launched {}", launcher.display());
                report.launched = Some(launcher.display());
                return report;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} not installed, trying next", launcher.program);
                report.skipped.push(launcher.program.clone());
            }
            Err(e) => {
                warn!("Failed to launch {}: {e}", launcher.program);
                report.failures.push(LaunchFailure {
                    program: launcher.program.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    warn!("No terminal could be launched ({} candidates)", candidates.len());
    report
}

/// Opens a visible terminal in `cwd`
pub fn open_terminal(cwd: &Path) -> LaunchReport {
    launch_first(&terminal_candidates(Platform::current(), cwd), cwd)
}
