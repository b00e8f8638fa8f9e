// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-printer and process-wide configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EpsonPrinterError, Result};

/// Default polling interval in seconds (one hour).
pub const DEFAULT_UPDATE_INTERVAL: u64 = 3600;

/// Configuration of a single monitored printer, stored in its config entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterConfig {
    /// Printer host name, IP address or full IPP URI.
    pub host: String,
    /// Seconds between two polling cycles.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL
}

impl PrinterConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }

    pub fn with_update_interval(mut self, seconds: u64) -> Self {
        self.update_interval = seconds;
        self
    }

    /// Polling interval as a `Duration`.
    ///
    /// A zero interval would spin the polling loop, so it is rejected.
    pub fn update_interval(&self) -> Result<Duration> {
        if self.update_interval == 0 {
            return Err(EpsonPrinterError::InvalidConfig(
                "update_interval must be at least one second".into(),
            ));
        }
        Ok(Duration::from_secs(self.update_interval))
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum number of blocking printer calls running at once.
    pub worker_threads: usize,
    /// Per-request timeout handed to the IPP client, in seconds.
    pub request_timeout_secs: u64,
    /// How long `discover` browses mDNS before reporting, in seconds.
    pub discovery_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            request_timeout_secs: 30,
            discovery_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }
}
