// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persisted config entries (`entries.json` in the data directory).

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use epson_printer_core::config::PrinterConfig;
use epson_printer_core::error::{EpsonPrinterError, Result};
use epson_printer_core::types::ConfigEntry;

const ENTRIES_FILE: &str = "entries.json";

/// The list of validated printers, kept in creation order.
///
/// Entries are immutable once created; they can only be added or removed.
#[derive(Debug)]
pub struct EntryStore {
    path: PathBuf,
    entries: Vec<ConfigEntry>,
}

impl EntryStore {
    /// Load the store from `data_dir`. A missing file is an empty store.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(ENTRIES_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), count = entries.len(), "config entries loaded");
        Ok(Self { path, entries })
    }

    pub fn list(&self) -> &[ConfigEntry] {
        &self.entries
    }

    /// Create and persist a new entry.
    pub fn add(&mut self, title: String, data: PrinterConfig) -> Result<ConfigEntry> {
        let entry = ConfigEntry::new(title, data);
        self.entries.push(entry.clone());
        self.persist()?;
        info!(entry_id = %entry.entry_id, title = %entry.title, "config entry created");
        Ok(entry)
    }

    /// Remove and return the entry with `entry_id`.
    pub fn remove(&mut self, entry_id: Uuid) -> Result<ConfigEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.entry_id == entry_id)
            .ok_or_else(|| EpsonPrinterError::EntryNotFound(entry_id.to_string()))?;
        let entry = self.entries.remove(index);
        self.persist()?;
        info!(entry_id = %entry.entry_id, "config entry removed");
        Ok(entry)
    }

    /// Write to a sibling temp file, then rename over the old file.
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
