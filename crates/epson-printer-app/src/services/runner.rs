// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polling runner: sets up every persisted entry and logs sensor states after
// each cycle until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use epson_printer_client::api::PrinterApiFactory;
use epson_printer_client::worker::WorkerPool;
use epson_printer_core::error::EpsonPrinterError;
use epson_printer_core::types::ConfigEntry;
use epson_printer_integration::platform::setup_entry;
use epson_printer_integration::sensor::EpsonPrinterSensor;

/// Delay before retrying an entry whose first cycle failed.
pub const SETUP_RETRY: Duration = Duration::from_secs(60);

/// Serve every entry until `shutdown` turns true, then wait for all of them.
pub async fn run_entries<F: PrinterApiFactory>(
    entries: Vec<ConfigEntry>,
    factory: Arc<F>,
    workers: WorkerPool,
    shutdown: watch::Receiver<bool>,
) {
    let mut tasks = JoinSet::new();
    for entry in entries {
        tasks.spawn(serve_entry(
            entry,
            Arc::clone(&factory),
            workers.clone(),
            shutdown.clone(),
        ));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "entry task ended abnormally");
        }
    }
}

/// Set up one entry, retrying while it is not ready, then poll it.
///
/// Any other setup failure, such as an invalid stored interval, ends the
/// entry's task.
async fn serve_entry<F: PrinterApiFactory>(
    entry: ConfigEntry,
    factory: Arc<F>,
    workers: WorkerPool,
    mut shutdown: watch::Receiver<bool>,
) {
    let printer = loop {
        if *shutdown.borrow() {
            return;
        }
        match setup_entry(&entry, Arc::clone(&factory), workers.clone()).await {
            Ok(printer) => break printer,
            Err(EpsonPrinterError::SetupNotReady(e)) => {
                warn!(
                    entry_id = %entry.entry_id,
                    error = %e,
                    retry_secs = SETUP_RETRY.as_secs(),
                    "entry not ready"
                );
                tokio::select! {
                    _ = tokio::time::sleep(SETUP_RETRY) => {}
                    _ = shutdown.changed() => {}
                }
            }
            Err(e) => {
                error!(entry_id = %entry.entry_id, error = %e, "entry cannot be set up");
                return;
            }
        }
    };

    log_states(&printer.sensors);
    let mut updates = printer.coordinator.subscribe();

    tokio::select! {
        _ = printer.run(shutdown) => {}
        _ = async {
            while updates.changed().await.is_ok() {
                log_states(&printer.sensors);
            }
        } => {}
    }
    info!(entry_id = %entry.entry_id, "entry stopped");
}

fn log_states(sensors: &[EpsonPrinterSensor]) {
    for sensor in sensors {
        let state = sensor.state();
        info!(
            unique_id = %state.unique_id,
            state = %state.state,
            unit = state.unit,
            "{}",
            state.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use epson_printer_client::api::{ApiError, PrinterApi};
    use epson_printer_core::config::PrinterConfig;
    use epson_printer_core::types::{MetricKey, RawReading};

    /// Answers every metric with 50, or refuses every connection.
    struct FakeFactory {
        reachable: bool,
        connects: AtomicUsize,
    }

    struct FakeApi;

    impl PrinterApiFactory for FakeFactory {
        type Api = FakeApi;

        fn connect(&self, host: &str) -> Result<FakeApi, ApiError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.reachable {
                Ok(FakeApi)
            } else {
                Err(ApiError::Request(format!("{host} unreachable")))
            }
        }
    }

    impl PrinterApi for FakeApi {
        fn refresh(&mut self) -> Result<(), ApiError> {
            Ok(())
        }

        fn metric(&self, _key: MetricKey) -> Result<RawReading, ApiError> {
            Ok(RawReading::from(50))
        }
    }

    fn entry(host: &str) -> ConfigEntry {
        ConfigEntry::new(host.into(), PrinterConfig::new(host).with_update_interval(30))
    }

    async fn run_for(factory: Arc<FakeFactory>, period: Duration) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = tokio::spawn(run_entries(
            vec![entry("10.0.0.1")],
            factory,
            WorkerPool::new(1),
            stop_rx,
        ));
        tokio::time::sleep(period).await;
        stop_tx.send(true).unwrap();
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reachable_entry_polls_until_shutdown() {
        let factory = Arc::new(FakeFactory {
            reachable: true,
            connects: AtomicUsize::new(0),
        });
        run_for(Arc::clone(&factory), Duration::from_secs(95)).await;
        // First refresh during setup, then at 30, 60 and 90 seconds.
        assert!(factory.connects.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unready_entry_is_retried_and_stops_on_shutdown() {
        let factory = Arc::new(FakeFactory {
            reachable: false,
            connects: AtomicUsize::new(0),
        });
        run_for(Arc::clone(&factory), SETUP_RETRY + Duration::from_secs(1)).await;
        assert!(factory.connects.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_entry_is_not_retried() {
        let factory = Arc::new(FakeFactory {
            reachable: true,
            connects: AtomicUsize::new(0),
        });
        let invalid = ConfigEntry::new(
            "10.0.0.2".into(),
            PrinterConfig::new("10.0.0.2").with_update_interval(0),
        );
        let (_stop_tx, stop_rx) = watch::channel(false);

        // Returns without a shutdown signal.
        run_entries(vec![invalid], Arc::clone(&factory), WorkerPool::new(1), stop_rx).await;
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
    }
}
