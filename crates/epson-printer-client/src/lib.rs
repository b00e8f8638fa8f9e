// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer-status collaborator and the plumbing around it: the collaborator
// traits, their IPP implementation, mDNS discovery of Epson printers, and the
// bounded worker pool that keeps blocking calls off the async runtime.

pub mod api;
pub mod discovery;
pub mod ipp_api;
pub mod worker;

pub use api::{ApiError, PrinterApi, PrinterApiFactory};
pub use discovery::PrinterDiscovery;
pub use ipp_api::{IppApiFactory, IppPrinterApi};
pub use worker::WorkerPool;
