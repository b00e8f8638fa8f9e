// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Integration layer: the setup flow that polls a printer once, the polling
// coordinator that refreshes the five ink metrics, and the sensor entities
// projecting the coordinator's latest snapshot.

pub mod config_flow;
pub mod coordinator;
pub mod platform;
pub mod sensor;

#[cfg(test)]
pub(crate) mod testing;

pub use config_flow::{ConfigFlow, FlowResult, UserInput};
pub use coordinator::{CoordinatorState, PrinterCoordinator};
pub use platform::{PrinterEntry, setup_entry};
pub use sensor::{EpsonPrinterSensor, SensorState};
