// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Epson printer ink monitor: core types, configuration and error definitions
// shared across all crates.

pub mod config;
pub mod error;
pub mod form_errors;
pub mod types;

pub use config::{AppConfig, PrinterConfig};
pub use error::EpsonPrinterError;
pub use types::*;
