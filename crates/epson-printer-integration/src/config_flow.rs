// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Setup flow: validates a host by polling it once before an entry is created.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span, error, info, info_span, warn};

use epson_printer_client::api::{ApiError, PrinterApi, PrinterApiFactory};
use epson_printer_client::worker::WorkerPool;
use epson_printer_core::config::{DEFAULT_UPDATE_INTERVAL, PrinterConfig};
use epson_printer_core::error::{EpsonPrinterError, Result};
use epson_printer_core::form_errors::{FormError, classify};
use epson_printer_core::types::entry_title;

/// Form step id, the only step of this flow.
pub const STEP_USER: &str = "user";

/// Key under which form-wide errors are reported.
pub const BASE_ERROR: &str = "base";

const UPDATE_INTERVAL_FIELD: &str = "update_interval";

/// Values submitted through the setup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    pub host: String,
    #[serde(default)]
    pub update_interval: Option<u64>,
}

impl UserInput {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            update_interval: None,
        }
    }

    pub fn with_update_interval(mut self, secs: u64) -> Self {
        self.update_interval = Some(secs);
        self
    }

    fn into_config(self) -> PrinterConfig {
        PrinterConfig::new(self.host)
            .with_update_interval(self.update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL))
    }
}

/// One field of the setup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub required: bool,
    pub default: Option<u64>,
}

/// Fields shown on the user step: `host` (required, free text) and
/// `update_interval` (optional, seconds).
pub fn user_schema() -> Vec<FormField> {
    vec![
        FormField {
            name: "host",
            required: true,
            default: None,
        },
        FormField {
            name: UPDATE_INTERVAL_FIELD,
            required: false,
            default: Some(DEFAULT_UPDATE_INTERVAL),
        },
    ]
}

/// Outcome of a flow step.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// (Re)show the form, with any errors keyed by field.
    ShowForm {
        step_id: &'static str,
        fields: Vec<FormField>,
        errors: BTreeMap<&'static str, FormError>,
    },
    /// Validation passed; persist an entry with this title and data.
    CreateEntry { title: String, data: PrinterConfig },
}

impl FlowResult {
    fn form(errors: BTreeMap<&'static str, FormError>) -> Self {
        Self::ShowForm {
            step_id: STEP_USER,
            fields: user_schema(),
            errors,
        }
    }
}

/// Drives the setup form against a collaborator factory.
pub struct ConfigFlow<F: PrinterApiFactory> {
    factory: Arc<F>,
    workers: WorkerPool,
    span: Span,
}

impl<F: PrinterApiFactory> ConfigFlow<F> {
    pub fn new(factory: Arc<F>, workers: WorkerPool) -> Self {
        Self::with_span(factory, workers, info_span!("config_flow"))
    }

    pub fn with_span(factory: Arc<F>, workers: WorkerPool, span: Span) -> Self {
        Self {
            factory,
            workers,
            span,
        }
    }

    /// Handle the user step.
    ///
    /// Without input the empty form is returned. An interval the coordinator
    /// would reject is reported under `update_interval` without connecting.
    /// Otherwise the host is polled once; on failure the form comes back with one
    /// `base` error and no entry is created.
    pub async fn step_user(&self, input: Option<UserInput>) -> FlowResult {
        let Some(input) = input else {
            return FlowResult::form(BTreeMap::new());
        };

        let data = input.into_config();
        if let Err(err) = data.update_interval() {
            warn!(parent: &self.span, error = %err, "update interval rejected");
            return FlowResult::form(BTreeMap::from([(
                UPDATE_INTERVAL_FIELD,
                FormError::InvalidInterval,
            )]));
        }

        match self.validate_input(&data.host).await {
            Ok(title) => {
                info!(parent: &self.span, host = %data.host, "printer validated");
                FlowResult::CreateEntry { title, data }
            }
            Err(err) => {
                let form_error = classify(&err);
                if form_error == FormError::Unknown {
                    error!(parent: &self.span, error = %err, "Unexpected exception");
                }
                FlowResult::form(BTreeMap::from([(BASE_ERROR, form_error)]))
            }
        }
    }

    /// Poll `host` once: build a collaborator handle and refresh it.
    ///
    /// Returns the entry title on success. Authorization rejections become
    /// `InvalidAuth`, every other collaborator failure `CannotConnect`.
    pub async fn validate_input(&self, host: &str) -> Result<String> {
        let factory = Arc::clone(&self.factory);
        let target = host.to_owned();
        let span = self.span.clone();

        async {
            let outcome = self
                .workers
                .run(move || span.in_scope(|| connect_and_refresh(factory.as_ref(), &target)))
                .await?;

            match outcome {
                Ok(()) => Ok(entry_title(host)),
                Err(ApiError::Unauthorized(cause)) => {
                    error!(host, error = %cause, "Printer rejected the request");
                    Err(EpsonPrinterError::InvalidAuth(cause))
                }
                Err(err) => {
                    error!(host, error = %err, "Cannot connect to printer");
                    Err(EpsonPrinterError::CannotConnect(err.to_string()))
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

fn connect_and_refresh<F: PrinterApiFactory>(factory: &F, host: &str) -> std::result::Result<(), ApiError> {
    factory.connect(host)?.refresh()
}
