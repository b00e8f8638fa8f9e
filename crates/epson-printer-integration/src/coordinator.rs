// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polling coordinator for one printer.
//
// Each cycle builds a fresh collaborator handle for the host, refreshes it on
// the worker pool and reads the five metrics. The published state lives in a
// `watch` channel so readers always see one complete state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, Span, debug, info, warn};

use epson_printer_client::api::{ApiError, PrinterApi, PrinterApiFactory};
use epson_printer_client::worker::WorkerPool;
use epson_printer_core::config::PrinterConfig;
use epson_printer_core::error::{EpsonPrinterError, Result};
use epson_printer_core::types::{MetricKey, Snapshot};

/// What the coordinator publishes after every cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinatorState {
    /// Snapshot from the last successful cycle, kept across failures.
    pub data: Option<Snapshot>,
    /// Whether the most recent cycle succeeded.
    pub last_update_success: bool,
    /// Cause of the most recent failure, cleared on success.
    pub last_error: Option<String>,
    /// When the last successful cycle finished.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Fetches the ink metrics of one printer on a fixed interval.
pub struct PrinterCoordinator<F: PrinterApiFactory> {
    host: String,
    update_interval: Duration,
    factory: Arc<F>,
    workers: WorkerPool,
    state: watch::Sender<CoordinatorState>,
    span: Span,
}

impl<F: PrinterApiFactory> PrinterCoordinator<F> {
    /// Create an idle coordinator. `span` carries this printer's log context.
    pub fn new(
        config: &PrinterConfig,
        factory: Arc<F>,
        workers: WorkerPool,
        span: Span,
    ) -> Result<Self> {
        let (state, _) = watch::channel(CoordinatorState::default());
        Ok(Self {
            host: config.host.clone(),
            update_interval: config.update_interval()?,
            factory,
            workers,
            state,
            span,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Current published state.
    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<Snapshot> {
        self.state.borrow().data
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success
    }

    /// Receiver notified after every cycle, successful or not.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Run one fetch cycle and publish its outcome.
    ///
    /// On failure the previous snapshot is kept, the success flag is cleared
    /// and `UpdateFailed` is returned.
    pub async fn refresh(&self) -> Result<Snapshot> {
        let factory = Arc::clone(&self.factory);
        let host = self.host.clone();
        let span = self.span.clone();

        async {
            debug!("starting fetch cycle");
            let outcome = self
                .workers
                .run(move || span.in_scope(|| fetch_snapshot(factory.as_ref(), &host)))
                .await;

            let cause = match outcome {
                Ok(Ok(snapshot)) => {
                    self.state.send_modify(|state| {
                        state.data = Some(snapshot);
                        state.last_update_success = true;
                        state.last_error = None;
                        state.last_updated = Some(Utc::now());
                    });
                    info!("printer data refreshed");
                    return Ok(snapshot);
                }
                Ok(Err(err)) => err.to_string(),
                Err(err) => err.to_string(),
            };

            warn!(error = %cause, "fetch cycle failed");
            self.state.send_modify(|state| {
                state.last_update_success = false;
                state.last_error = Some(cause.clone());
            });
            Err(EpsonPrinterError::UpdateFailed(cause))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Initial cycle run while the entry is being set up.
    ///
    /// A failure here means the entry cannot be set up yet.
    pub async fn first_refresh(&self) -> Result<()> {
        match self.refresh().await {
            Ok(_) => Ok(()),
            Err(EpsonPrinterError::UpdateFailed(cause)) => {
                Err(EpsonPrinterError::SetupNotReady(cause))
            }
            Err(other) => Err(other),
        }
    }

    /// Refresh every `update_interval` until `shutdown` turns true or its
    /// sender is dropped.
    ///
    /// The first tick comes one interval from now. Ticks missed while a cycle
    /// is running are delayed rather than replayed, so cycles never overlap.
    /// A cycle still in flight at shutdown is abandoned.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.update_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(parent: &self.span, interval_secs = period.as_secs(), "polling started");
        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = async {
                    ticker.tick().await;
                    // Failures are already published and logged.
                    let _ = self.refresh().await;
                } => {}
            }
        }
        info!(parent: &self.span, "polling stopped");
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// One blocking fetch: connect, refresh, then read each metric.
///
/// Only a connect or refresh failure fails the cycle; a metric that errors or
/// does not coerce to a number is stored as `None`.
pub fn fetch_snapshot<F: PrinterApiFactory>(
    factory: &F,
    host: &str,
) -> std::result::Result<Snapshot, ApiError> {
    let mut api = factory.connect(host)?;
    api.refresh()?;

    Ok(MetricKey::ALL
        .into_iter()
        .map(|key| (key, read_metric(&api, key)))
        .collect())
}

fn read_metric<A: PrinterApi>(api: &A, key: MetricKey) -> Option<f64> {
    match api.metric(key) {
        Ok(reading) => {
            let value = reading.coerce();
            if value.is_none() {
                warn!(metric = %key, reading = ?reading, "could not convert value to a number");
            }
            value
        }
        Err(e) => {
            warn!(metric = %key, error = %e, "could not get value");
            None
        }
    }
}
