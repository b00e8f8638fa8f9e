// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded pool for blocking printer calls.
//
// Every collaborator call blocks on network I/O, so it runs on Tokio's
// blocking threads. A semaphore caps how many run at once so a slow network
// cannot pile up threads.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use epson_printer_core::error::{EpsonPrinterError, Result};

/// Runs blocking jobs off the async runtime, at most `size` at a time.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` jobs concurrently (minimum one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs that could start right now without waiting.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on a blocking thread and await its result.
    ///
    /// Waits for a free slot first. A panicking job is reported as
    /// [`EpsonPrinterError::Worker`].
    pub async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| EpsonPrinterError::Worker(format!("pool closed: {e}")))?;

        debug!(idle = self.permits.available_permits(), "dispatching blocking job");
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        handle.await.map_err(|e| {
            error!(error = %e, "blocking job did not complete");
            EpsonPrinterError::Worker(e.to_string())
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}
