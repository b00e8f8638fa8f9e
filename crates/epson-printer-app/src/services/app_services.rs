// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: owns the data directory, the process-wide settings,
// the worker pool and the IPP collaborator factory, and hands them to the
// setup flow, discovery and the polling runner.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use epson_printer_client::discovery::PrinterDiscovery;
use epson_printer_client::ipp_api::IppApiFactory;
use epson_printer_client::worker::WorkerPool;
use epson_printer_core::AppConfig;
use epson_printer_core::error::Result;
use epson_printer_core::types::{ConfigEntry, DiscoveredPrinter};
use epson_printer_integration::config_flow::{ConfigFlow, FlowResult, UserInput};

use super::data_dir;
use super::entries::EntryStore;

pub struct AppServices {
    data_dir: PathBuf,
    config: AppConfig,
    workers: WorkerPool,
    factory: Arc<IppApiFactory>,
    entries: EntryStore,
}

impl AppServices {
    /// Initialise all services. Call once at startup.
    ///
    /// Resolves the data directory, loads the settings (writing the defaults
    /// on first start) and the persisted config entries.
    pub fn init(data_dir_override: Option<&Path>) -> Result<Self> {
        let dir = data_dir::data_dir(data_dir_override)?;
        info!(path = %dir.display(), "initialising app services");

        let config = match load_config(&dir) {
            Some(config) => config,
            None => {
                let config = AppConfig::default();
                if let Err(e) = persist_config(&dir, &config) {
                    warn!(error = %e, "could not write default settings");
                }
                config
            }
        };

        let entries = EntryStore::open(&dir)?;
        let workers = WorkerPool::new(config.worker_threads);
        let factory = Arc::new(IppApiFactory::new(config.request_timeout()));

        info!(
            workers = workers.size(),
            entries = entries.list().len(),
            "app services initialised"
        );

        Ok(Self {
            data_dir: dir,
            config,
            workers,
            factory,
            entries,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    pub fn factory(&self) -> Arc<IppApiFactory> {
        Arc::clone(&self.factory)
    }

    // -- Setup ---------------------------------------------------------------

    /// Run the setup flow for `input` and persist the entry it creates.
    ///
    /// Returns the flow result alongside the new entry, if any.
    pub async fn setup(&mut self, input: UserInput) -> Result<(FlowResult, Option<ConfigEntry>)> {
        let flow = ConfigFlow::new(self.factory(), self.workers.clone());
        let result = flow.step_user(Some(input)).await;
        let entry = match &result {
            FlowResult::CreateEntry { title, data } => {
                Some(self.entries.add(title.clone(), data.clone())?)
            }
            FlowResult::ShowForm { .. } => None,
        };
        Ok((result, entry))
    }

    // -- Entries -------------------------------------------------------------

    pub fn entries(&self) -> &[ConfigEntry] {
        self.entries.list()
    }

    pub fn remove_entry(&mut self, entry_id: Uuid) -> Result<ConfigEntry> {
        self.entries.remove(entry_id)
    }

    // -- Discovery -----------------------------------------------------------

    /// Browse mDNS for Epson printers for `timeout` (the configured discovery
    /// timeout when `None`).
    pub async fn discover(&self, timeout: Option<Duration>) -> Result<Vec<DiscoveredPrinter>> {
        let timeout = timeout.unwrap_or_else(|| self.config.discovery_timeout());
        info!(timeout_secs = timeout.as_secs(), "browsing for Epson printers");

        self.workers
            .run(move || -> Result<Vec<DiscoveredPrinter>> {
                let mut discovery = PrinterDiscovery::new()?;
                let found = discovery.discover(timeout);
                if let Err(e) = discovery.shutdown() {
                    warn!(error = %e, "mDNS daemon did not shut down cleanly");
                }
                found
            })
            .await?
    }
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
