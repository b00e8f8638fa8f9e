// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Entry setup: one coordinator plus its five sensors per config entry.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, info_span, instrument};

use epson_printer_client::api::PrinterApiFactory;
use epson_printer_client::worker::WorkerPool;
use epson_printer_core::error::Result;
use epson_printer_core::types::{ConfigEntry, MetricKey};

use crate::coordinator::PrinterCoordinator;
use crate::sensor::EpsonPrinterSensor;

/// A set-up config entry.
pub struct PrinterEntry<F: PrinterApiFactory> {
    pub entry: ConfigEntry,
    pub coordinator: Arc<PrinterCoordinator<F>>,
    pub sensors: Vec<EpsonPrinterSensor>,
}

impl<F: PrinterApiFactory> PrinterEntry<F> {
    /// Poll until `shutdown` turns true.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        self.coordinator.run(shutdown).await;
    }
}

/// Set up `entry`: build its coordinator, run the first cycle, then create
/// one sensor per metric key.
///
/// Fails with `SetupNotReady` if the first cycle fails, in which case no
/// sensors are created.
#[instrument(skip_all, fields(entry_id = %entry.entry_id, host = %entry.data.host))]
pub async fn setup_entry<F: PrinterApiFactory>(
    entry: &ConfigEntry,
    factory: Arc<F>,
    workers: WorkerPool,
) -> Result<PrinterEntry<F>> {
    let span = info_span!("epson_printer", host = %entry.data.host);
    let coordinator = Arc::new(PrinterCoordinator::new(&entry.data, factory, workers, span)?);
    coordinator.first_refresh().await?;

    let sensors = MetricKey::ALL
        .into_iter()
        .map(|key| EpsonPrinterSensor::new(coordinator.subscribe(), key, &entry.data.host))
        .collect();

    info!(title = %entry.title, "entry set up");
    Ok(PrinterEntry {
        entry: entry.clone(),
        coordinator,
        sensors,
    })
}
