// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the ink monitor.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::config::PrinterConfig;
use crate::error::EpsonPrinterError;

/// Integration domain, used as the unique-id prefix and device identifier namespace.
pub const DOMAIN: &str = "epson_printer";

/// One of the five consumables reported by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKey {
    Black,
    Magenta,
    Cyan,
    Yellow,
    /// Maintenance box (waste ink / cleaning cartridge).
    Clean,
}

impl MetricKey {
    /// Every key, in sensor creation order.
    pub const ALL: [MetricKey; 5] = [
        MetricKey::Black,
        MetricKey::Magenta,
        MetricKey::Cyan,
        MetricKey::Yellow,
        MetricKey::Clean,
    ];

    /// Key string passed to the printer-status collaborator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::Yellow => "yellow",
            Self::Clean => "clean",
        }
    }

    /// Human label shown in the sensor name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Black => "Black Ink",
            Self::Magenta => "Magenta Ink",
            Self::Cyan => "Cyan Ink",
            Self::Yellow => "Yellow Ink",
            Self::Clean => "Cleaning Cartridge",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clean => "mdi:printer-3d-nozzle-heat",
            _ => "mdi:printer-3d-nozzle",
        }
    }

    pub fn unit(&self) -> &'static str {
        "%"
    }

    /// Sensors of this integration never carry a device class.
    pub fn device_class(&self) -> Option<&'static str> {
        None
    }

    /// Suffix of the sensor unique id.
    pub fn entity_slug(&self) -> &'static str {
        match self {
            Self::Black => "black_ink",
            Self::Magenta => "magenta_ink",
            Self::Cyan => "cyan_ink",
            Self::Yellow => "yellow_ink",
            Self::Clean => "cleaning_cartridge",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Black => 0,
            Self::Magenta => 1,
            Self::Cyan => 2,
            Self::Yellow => 3,
            Self::Clean => 4,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = EpsonPrinterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| EpsonPrinterError::InvalidConfig(format!("unknown metric key '{s}'")))
    }
}

/// Stable unique id of the sensor for `key` on `host`.
pub fn unique_id(host: &str, key: MetricKey) -> String {
    format!("{DOMAIN}_{host}_{}", key.entity_slug())
}

/// A value as handed back by the printer-status collaborator, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReading {
    Number(f64),
    Text(String),
}

impl RawReading {
    /// Best-effort conversion to a number.
    ///
    /// Numbers pass through; text is parsed as a float after trimming. Text
    /// that does not parse, or parses to NaN/infinity, yields `None`.
    pub fn coerce(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl From<i32> for RawReading {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for RawReading {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawReading {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// The five metric values produced by one successful polling cycle.
///
/// Holds one slot per [`MetricKey`], so a snapshot can never be missing a key;
/// a slot is `None` when that single metric could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    values: [Option<f64>; 5],
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: MetricKey) -> Option<f64> {
        self.values[key.index()]
    }

    pub fn set(&mut self, key: MetricKey, value: Option<f64>) {
        self.values[key.index()] = value;
    }

    /// All five entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, Option<f64>)> + '_ {
        MetricKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }
}

impl FromIterator<(MetricKey, Option<f64>)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (MetricKey, Option<f64>)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (key, value) in iter {
            snapshot.set(key, value);
        }
        snapshot
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MetricKey::ALL.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key.as_str(), &value)?;
        }
        map.end()
    }
}

/// Device grouping shared by the five sensors of one printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, host)` pairs identifying the device.
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn for_host(host: &str) -> Self {
        Self {
            identifiers: vec![(DOMAIN.to_owned(), host.to_owned())],
            name: entry_title(host),
            manufacturer: "Epson".into(),
            model: "Network Printer".into(),
            sw_version: "1.0".into(),
        }
    }
}

/// Title of the config entry and device created for `host`.
pub fn entry_title(host: &str) -> String {
    format!("Epson Printer ({host})")
}

/// A persisted, validated printer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: Uuid,
    pub title: String,
    pub data: PrinterConfig,
    pub created_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(title: String, data: PrinterConfig) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            title,
            data,
            created_at: Utc::now(),
        }
    }
}

/// An Epson printer found on the local network via mDNS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPrinter {
    /// mDNS instance name.
    pub name: String,
    /// Value to enter as `host` during setup.
    pub host: String,
    pub ip: IpAddr,
    pub port: u16,
    pub make_and_model: Option<String>,
    pub supports_tls: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_keys_round_trip_through_their_strings() {
        for key in MetricKey::ALL {
            assert_eq!(key.as_str().parse::<MetricKey>().unwrap(), key);
        }
        assert!("photo_black".parse::<MetricKey>().is_err());
    }

    #[test]
    fn unique_id_is_stable_for_host_and_key() {
        let first = unique_id("192.168.1.20", MetricKey::Clean);
        let second = unique_id("192.168.1.20", MetricKey::Clean);
        assert_eq!(first, second);
        assert_eq!(first, "epson_printer_192.168.1.20_cleaning_cartridge");
        assert_eq!(
            unique_id("printer.local", MetricKey::Magenta),
            "epson_printer_printer.local_magenta_ink"
        );
    }

    #[test]
    fn coercion_follows_number_then_float_parse() {
        assert_eq!(RawReading::from(42).coerce(), Some(42.0));
        assert_eq!(RawReading::from("37.5").coerce(), Some(37.5));
        assert_eq!(RawReading::from(" 80 ").coerce(), Some(80.0));
        assert_eq!(RawReading::from("low").coerce(), None);
        assert_eq!(RawReading::from("N/A").coerce(), None);
        assert_eq!(RawReading::from("nan").coerce(), None);
    }

    #[test]
    fn snapshot_always_has_five_entries() {
        let snapshot: Snapshot = [(MetricKey::Cyan, Some(12.0))].into_iter().collect();
        let entries: Vec<_> = snapshot.iter().collect();
        assert_eq!(entries.len(), 5);
        assert_eq!(snapshot.get(MetricKey::Cyan), Some(12.0));
        assert_eq!(snapshot.get(MetricKey::Black), None);
    }

    #[test]
    fn snapshot_serializes_every_key() {
        let mut snapshot = Snapshot::new();
        snapshot.set(MetricKey::Black, Some(55.0));
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["black"], 55.0);
        assert!(json["clean"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn device_info_is_keyed_by_host() {
        let info = DeviceInfo::for_host("10.0.0.7");
        assert_eq!(info.identifiers, vec![("epson_printer".into(), "10.0.0.7".into())]);
        assert_eq!(info.name, "Epson Printer (10.0.0.7)");
        assert_eq!(info.manufacturer, "Epson");
    }
}
