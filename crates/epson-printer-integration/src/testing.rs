// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted printer-status collaborator for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use epson_printer_client::api::{ApiError, PrinterApi, PrinterApiFactory};
use epson_printer_core::types::{MetricKey, RawReading};

/// What one connect/refresh/metric sequence does.
#[derive(Debug, Clone)]
pub enum Cycle {
    ConnectFails,
    RefreshFails,
    Unauthorized,
    Readings(HashMap<MetricKey, Result<RawReading, String>>),
}

impl Cycle {
    /// Every metric answers `value`.
    pub fn all(value: i32) -> Self {
        Self::Readings(
            MetricKey::ALL
                .into_iter()
                .map(|key| (key, Ok(RawReading::from(value))))
                .collect(),
        )
    }

    /// Every metric answers `value`, except the overrides.
    pub fn with(value: i32, overrides: &[(MetricKey, Result<RawReading, String>)]) -> Self {
        let Self::Readings(mut readings) = Self::all(value) else {
            unreachable!()
        };
        readings.extend(overrides.iter().cloned());
        Self::Readings(readings)
    }
}

/// Hands out one scripted cycle per `connect`; fails once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedFactory {
    cycles: Mutex<VecDeque<Cycle>>,
    connects: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(cycles: impl IntoIterator<Item = Cycle>) -> Self {
        Self {
            cycles: Mutex::new(cycles.into_iter().collect()),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl PrinterApiFactory for ScriptedFactory {
    type Api = ScriptedApi;

    fn connect(&self, host: &str) -> Result<ScriptedApi, ApiError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let cycle = self
            .cycles
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Cycle::RefreshFails);
        if let Cycle::ConnectFails = cycle {
            return Err(ApiError::InvalidHost {
                host: host.to_owned(),
                reason: "scripted".into(),
            });
        }
        Ok(ScriptedApi {
            cycle,
            refreshed: false,
        })
    }
}

pub struct ScriptedApi {
    cycle: Cycle,
    refreshed: bool,
}

impl PrinterApi for ScriptedApi {
    fn refresh(&mut self) -> Result<(), ApiError> {
        match self.cycle {
            Cycle::RefreshFails | Cycle::ConnectFails => {
                Err(ApiError::Request("connection refused".into()))
            }
            Cycle::Unauthorized => Err(ApiError::Unauthorized("HTTP 401".into())),
            Cycle::Readings(_) => {
                self.refreshed = true;
                Ok(())
            }
        }
    }

    fn metric(&self, key: MetricKey) -> Result<RawReading, ApiError> {
        if !self.refreshed {
            return Err(ApiError::NotRefreshed);
        }
        match &self.cycle {
            Cycle::Readings(readings) => match readings.get(&key) {
                Some(Ok(reading)) => Ok(reading.clone()),
                Some(Err(message)) => Err(ApiError::Request(message.clone())),
                None => Err(ApiError::MissingMetric(key)),
            },
            _ => Err(ApiError::NotRefreshed),
        }
    }
}

/// A factory whose handles panic, standing in for an unexpected failure.
#[derive(Debug, Default)]
pub struct PanickingFactory;

impl PrinterApiFactory for PanickingFactory {
    type Api = ScriptedApi;

    fn connect(&self, _host: &str) -> Result<ScriptedApi, ApiError> {
        panic!("collaborator crashed");
    }
}
