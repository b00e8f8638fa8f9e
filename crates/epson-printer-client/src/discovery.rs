// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS discovery of Epson IPP printers on the local network.
//
// We browse for `_ipp._tcp.local.` and `_ipps._tcp.local.` using the
// `mdns-sd` crate and keep the services whose TXT records name Epson as the
// manufacturer. The resulting hosts are suggestions for the setup form.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, info, warn};

use epson_printer_core::error::{EpsonPrinterError, Result};
use epson_printer_core::types::DiscoveredPrinter;

/// mDNS service type for plain IPP.
const IPP_SERVICE: &str = "_ipp._tcp.local.";

/// mDNS service type for TLS-secured IPP.
const IPPS_SERVICE: &str = "_ipps._tcp.local.";

type PrinterMap = Arc<Mutex<HashMap<String, DiscoveredPrinter>>>;

/// Epson printer discovery engine using mDNS-SD.
///
/// Resolved printers are accumulated in a map keyed by their full service
/// name so duplicate events collapse into one entry.
pub struct PrinterDiscovery {
    daemon: ServiceDaemon,
    printers: PrinterMap,
    browsing: bool,
}

impl PrinterDiscovery {
    /// Create a new discovery engine. Spawns the mDNS daemon thread but does
    /// not start browsing.
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| {
            EpsonPrinterError::Discovery(format!("failed to start mDNS daemon: {e}"))
        })?;
        Ok(Self {
            daemon,
            printers: Arc::new(Mutex::new(HashMap::new())),
            browsing: false,
        })
    }

    /// Start browsing for IPP and IPPS printers. Returns immediately.
    pub fn start(&mut self) -> Result<()> {
        if self.browsing {
            debug!("printer discovery already running");
            return Ok(());
        }

        for (service_type, tls) in [(IPP_SERVICE, false), (IPPS_SERVICE, true)] {
            let receiver = self.daemon.browse(service_type).map_err(|e| {
                EpsonPrinterError::Discovery(format!("browse {service_type}: {e}"))
            })?;
            spawn_listener(service_type, tls, receiver, Arc::clone(&self.printers))?;
        }

        self.browsing = true;
        info!("mDNS printer discovery started");
        Ok(())
    }

    /// Stop browsing for printers.
    pub fn stop(&mut self) -> Result<()> {
        if !self.browsing {
            return Ok(());
        }

        for service_type in [IPP_SERVICE, IPPS_SERVICE] {
            self.daemon.stop_browse(service_type).map_err(|e| {
                EpsonPrinterError::Discovery(format!("stop browse {service_type}: {e}"))
            })?;
        }

        self.browsing = false;
        info!("mDNS printer discovery stopped");
        Ok(())
    }

    /// Shut down the mDNS daemon entirely.
    pub fn shutdown(self) -> Result<()> {
        let _status_rx = self
            .daemon
            .shutdown()
            .map_err(|e| EpsonPrinterError::Discovery(format!("daemon shutdown: {e}")))?;
        info!("mDNS daemon shut down");
        Ok(())
    }

    /// Epson printers resolved so far, sorted by host.
    pub fn printers(&self) -> Vec<DiscoveredPrinter> {
        let mut printers: Vec<_> = self
            .printers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        printers.sort_by(|a, b| a.host.cmp(&b.host));
        printers
    }

    /// Browse for `timeout`, stop, and return what was found.
    ///
    /// Blocks the calling thread; run it on the worker pool from async code.
    pub fn discover(&mut self, timeout: Duration) -> Result<Vec<DiscoveredPrinter>> {
        self.start()?;
        std::thread::sleep(timeout);
        self.stop()?;
        Ok(self.printers())
    }
}

/// Drain the receiver produced by `ServiceDaemon::browse` into the map.
fn spawn_listener(
    service_type: &'static str,
    tls: bool,
    receiver: mdns_sd::Receiver<ServiceEvent>,
    printers: PrinterMap,
) -> Result<()> {
    std::thread::Builder::new()
        .name(format!("mdns-{service_type}"))
        .spawn(move || {
            while let Ok(event) = receiver.recv() {
                match event {
                    ServiceEvent::ServiceResolved(info) => {
                        let fullname = info.get_fullname().to_owned();
                        match service_info_to_printer(&info, tls) {
                            Some(printer) => {
                                info!(name = %printer.name, host = %printer.host, "Epson printer resolved");
                                printers
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .insert(fullname, printer);
                            }
                            None => debug!(fullname = %fullname, "skipping non-Epson or address-less service"),
                        }
                    }
                    ServiceEvent::ServiceRemoved(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "printer removed");
                        printers
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&fullname);
                    }
                    ServiceEvent::SearchStopped(stype) => {
                        debug!(service_type = %stype, "mDNS search stopped");
                        break;
                    }
                    _ => {}
                }
            }
        })
        .map(|_| ())
        .map_err(|e| {
            warn!(error = %e, "failed to spawn mDNS listener thread");
            EpsonPrinterError::Discovery(format!("listener thread: {e}"))
        })
}

/// Convert a resolved service into a printer if it is an Epson.
///
/// TXT keys consulted: `usb_MFG` and `ty` / `product` for the manufacturer,
/// `rp` for the resource path of the IPP endpoint.
fn service_info_to_printer(info: &ServiceInfo, tls: bool) -> Option<DiscoveredPrinter> {
    let make_and_model = info
        .get_property_val_str("ty")
        .or_else(|| info.get_property_val_str("product"))
        .map(|v| v.trim_matches(|c| c == '(' || c == ')').to_owned());

    let manufacturer = info.get_property_val_str("usb_MFG");
    if !is_epson(manufacturer, make_and_model.as_deref()) {
        return None;
    }

    // Prefer IPv4 for wider printer compatibility.
    let ip: IpAddr = info
        .get_addresses()
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| info.get_addresses().iter().next())
        .copied()?;
    let port = info.get_port();

    let host = match (info.get_property_val_str("rp"), tls, port) {
        (Some("ipp/print") | None, false, 631) => ip.to_string(),
        (rp, _, _) => {
            let scheme = if tls { "ipps" } else { "ipp" };
            let authority = match ip {
                IpAddr::V4(v4) => v4.to_string(),
                IpAddr::V6(v6) => format!("[{v6}]"),
            };
            format!("{scheme}://{authority}:{port}/{}", rp.unwrap_or("ipp/print"))
        }
    };

    Some(DiscoveredPrinter {
        name: info.get_fullname().to_owned(),
        host,
        ip,
        port,
        make_and_model,
        supports_tls: tls,
    })
}

fn is_epson(manufacturer: Option<&str>, make_and_model: Option<&str>) -> bool {
    [manufacturer, make_and_model]
        .into_iter()
        .flatten()
        .any(|v| v.to_ascii_lowercase().contains("epson"))
}
