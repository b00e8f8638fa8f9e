// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Setup form errors.
//
// Every failure seen while validating a setup form is mapped to an error key
// with a plain English message. Validation failures are shown under the form's
// `base` field; a rejected update interval is shown under that field.

use serde::Serialize;

use crate::error::EpsonPrinterError;

/// Error key reported back to the setup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormError {
    CannotConnect,
    InvalidAuth,
    InvalidInterval,
    Unknown,
}

impl FormError {
    /// Translation key of the error.
    pub fn key(&self) -> &'static str {
        match self {
            Self::CannotConnect => "cannot_connect",
            Self::InvalidAuth => "invalid_auth",
            Self::InvalidInterval => "invalid_interval",
            Self::Unknown => "unknown",
        }
    }

    /// Plain English message for the error.
    pub fn message(&self) -> &'static str {
        match self {
            Self::CannotConnect => "Failed to connect to the printer.",
            Self::InvalidAuth => "The printer rejected the request as unauthorized.",
            Self::InvalidInterval => "The update interval must be at least one second.",
            Self::Unknown => "Unexpected error.",
        }
    }
}

/// Classify a validation failure into its form error.
///
/// Only connection and authorization failures have dedicated keys; anything
/// else is reported as `unknown`.
pub fn classify(err: &EpsonPrinterError) -> FormError {
    match err {
        EpsonPrinterError::CannotConnect(_) => FormError::CannotConnect,
        EpsonPrinterError::InvalidAuth(_) => FormError::InvalidAuth,
        _ => FormError::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_map_to_cannot_connect() {
        let err = EpsonPrinterError::CannotConnect("connection refused".into());
        assert_eq!(classify(&err), FormError::CannotConnect);
        assert_eq!(classify(&err).key(), "cannot_connect");
    }

    #[test]
    fn auth_failures_map_to_invalid_auth() {
        let err = EpsonPrinterError::InvalidAuth("401".into());
        assert_eq!(classify(&err).key(), "invalid_auth");
    }

    #[test]
    fn invalid_interval_has_its_own_key() {
        assert_eq!(FormError::InvalidInterval.key(), "invalid_interval");
        let err = EpsonPrinterError::InvalidConfig("update_interval must be positive".into());
        assert_eq!(classify(&err), FormError::Unknown);
    }

    #[test]
    fn everything_else_is_unknown() {
        let err = EpsonPrinterError::Worker("task panicked".into());
        assert_eq!(classify(&err), FormError::Unknown);
        assert_eq!(classify(&err).message(), "Unexpected error.");
    }
}
