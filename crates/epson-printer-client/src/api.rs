// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer-status collaborator interface.
//
// The collaborator is synchronous: it is bound to one host, fetches the
// printer's status in `refresh`, then answers per-metric queries from what it
// fetched. Callers run it on the worker pool, never on the async runtime.

use thiserror::Error;

use epson_printer_core::types::{MetricKey, RawReading};

/// Failures reported by a printer-status collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid printer address '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("printer rejected the request as unauthorized: {0}")]
    Unauthorized(String),

    #[error("printer answered with status {0}")]
    Status(String),

    #[error("no printer status fetched yet")]
    NotRefreshed,

    #[error("printer does not report a '{0}' consumable")]
    MissingMetric(MetricKey),
}

/// A handle bound to one printer.
pub trait PrinterApi: Send {
    /// Fetch the printer's current status. Blocks on network I/O.
    fn refresh(&mut self) -> Result<(), ApiError>;

    /// Read one metric from the status fetched by the last `refresh`.
    fn metric(&self, key: MetricKey) -> Result<RawReading, ApiError>;
}

/// Creates [`PrinterApi`] handles bound to a host.
///
/// A fresh handle is created for every setup validation and every polling cycle.
pub trait PrinterApiFactory: Send + Sync + 'static {
    type Api: PrinterApi + 'static;

    fn connect(&self, host: &str) -> Result<Self::Api, ApiError>;
}
