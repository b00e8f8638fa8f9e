// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the ink monitor.

use thiserror::Error;

/// Top-level error type for all ink monitor operations.
#[derive(Debug, Error)]
pub enum EpsonPrinterError {
    // -- Setup --
    #[error("cannot connect to printer: {0}")]
    CannotConnect(String),

    #[error("printer rejected the credentials: {0}")]
    InvalidAuth(String),

    #[error("entry setup failed, printer not ready: {0}")]
    SetupNotReady(String),

    // -- Polling --
    #[error("error communicating with printer: {0}")]
    UpdateFailed(String),

    #[error("printer discovery failed: {0}")]
    Discovery(String),

    // -- Runtime --
    #[error("worker pool error: {0}")]
    Worker(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no config entry with id {0}")]
    EntryNotFound(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EpsonPrinterError>;
