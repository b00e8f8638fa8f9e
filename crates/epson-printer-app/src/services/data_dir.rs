// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use epson_printer_core::error::Result;

const APP_DIR: &str = "epson-printer";

/// Return the application data directory, creating it if needed.
///
/// `override_dir` (from `--data-dir`) wins over the conventional location.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_base(
            std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        )
        .join(APP_DIR),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// XDG data dir, then `~/.local/share`, then `/tmp` as a last resort.
fn default_base(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(xdg) = xdg.filter(|p| !p.as_os_str().is_empty()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".local").join("share");
    }
    PathBuf::from("/tmp")
}
