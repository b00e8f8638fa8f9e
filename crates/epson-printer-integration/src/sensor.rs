// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sensor entities, one per consumable, projecting the coordinator's state.

use serde::Serialize;
use tokio::sync::watch;

use epson_printer_core::types::{DeviceInfo, MetricKey, unique_id};

use crate::coordinator::CoordinatorState;

/// Read-only view of one metric of one printer.
///
/// Holds nothing mutable of its own: value and availability are read from the
/// coordinator's latest published state on every call.
#[derive(Debug, Clone)]
pub struct EpsonPrinterSensor {
    key: MetricKey,
    host: String,
    name: String,
    unique_id: String,
    coordinator: watch::Receiver<CoordinatorState>,
}

impl EpsonPrinterSensor {
    pub fn new(
        coordinator: watch::Receiver<CoordinatorState>,
        key: MetricKey,
        host: impl Into<String>,
    ) -> Self {
        let host = host.into();
        Self {
            key,
            name: format!("Epson Printer {}", key.label()),
            unique_id: unique_id(&host, key),
            host,
            coordinator,
        }
    }

    pub fn key(&self) -> MetricKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn icon(&self) -> &'static str {
        self.key.icon()
    }

    pub fn native_unit_of_measurement(&self) -> &'static str {
        self.key.unit()
    }

    pub fn device_class(&self) -> Option<&'static str> {
        self.key.device_class()
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_host(&self.host)
    }

    /// Latest value of this metric, `None` when unknown.
    pub fn native_value(&self) -> Option<f64> {
        self.coordinator
            .borrow()
            .data
            .as_ref()
            .and_then(|snapshot| snapshot.get(self.key))
    }

    /// True only if the last cycle succeeded and a snapshot exists.
    pub fn available(&self) -> bool {
        let state = self.coordinator.borrow();
        state.last_update_success && state.data.is_some()
    }

    /// Value and availability read under one borrow.
    pub fn state(&self) -> SensorState {
        let state = self.coordinator.borrow();
        let available = state.last_update_success && state.data.is_some();
        let value = state.data.as_ref().and_then(|s| s.get(self.key));

        let rendered = match (available, value) {
            (false, _) => "unavailable".to_owned(),
            (true, None) => "unknown".to_owned(),
            (true, Some(v)) => v.to_string(),
        };

        SensorState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            state: rendered,
            unit: self.key.unit(),
            icon: self.key.icon(),
            available,
        }
    }

    /// Wait for the coordinator's next cycle. Returns `false` once the
    /// coordinator is gone.
    pub async fn changed(&mut self) -> bool {
        self.coordinator.changed().await.is_ok()
    }
}

/// Rendered state of a sensor, as logged by the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    /// `"unavailable"`, `"unknown"` or the numeric value.
    pub state: String,
    pub unit: &'static str,
    pub icon: &'static str,
    pub available: bool,
}
