//! Default locations for taglog output
//!
//! Diagnostics live under the XDG state directory and CSV files written by
//! the command-line tool under the XDG data directory. When no home can be
//! resolved through `directories`, `$HOME/.local/...` is used instead.

use std::path::PathBuf;

use directories::ProjectDirs;

const APP_NAME: &str = "taglog";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// `$HOME/.local/<kind>/taglog`, or under `/tmp` without a home
fn under_home(kind: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".local").join(kind).join(APP_NAME)
}

/// `$XDG_STATE_HOME/taglog`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|dirs| dirs.state_dir().map(PathBuf::from))
        .unwrap_or_else(|| under_home("state"))
}

/// `$XDG_DATA_HOME/taglog`
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| under_home("share"))
}

/// Directory for diagnostic log files
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Directory for CSV files when no path is given
pub fn csv_dir() -> PathBuf {
    data_dir().join("csv")
}
