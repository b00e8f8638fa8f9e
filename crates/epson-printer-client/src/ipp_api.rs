// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP-backed printer-status collaborator.
//
// Uses the `ipp` crate's blocking client to send Get-Printer-Attributes
// (RFC 8011 §4.2.5) restricted to the marker attributes (RFC 3805 supply
// levels as exposed by IPP):
//   - marker-names   e.g. "Black ink", "Maintenance Box"
//   - marker-colors  e.g. "#000000", "none"
//   - marker-types   e.g. "ink-cartridge", "waste-ink"
//   - marker-levels  0..=100, or negative when the level is unknown

use std::net::Ipv6Addr;
use std::time::Duration;

use ipp::prelude::*;
use tracing::{debug, error, instrument, warn};

use epson_printer_core::types::{MetricKey, RawReading};

use crate::api::{ApiError, PrinterApi, PrinterApiFactory};

/// Marker attributes requested on every refresh.
const MARKER_ATTRIBUTES: [&str; 4] = [
    "marker-names",
    "marker-colors",
    "marker-types",
    "marker-levels",
];

/// Resource path used when the configured host is a bare address.
const DEFAULT_RESOURCE_PATH: &str = "ipp/print";

/// One consumable as reported by the printer.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub name: String,
    pub color: Option<String>,
    pub kind: Option<String>,
    pub level: Option<i32>,
}

impl Marker {
    pub fn is_waste(&self) -> bool {
        let kind = self.kind.as_deref().unwrap_or_default().to_ascii_lowercase();
        let name = self.name.to_ascii_lowercase();
        kind.starts_with("waste")
            || name.contains("maintenance")
            || name.contains("waste")
            || name.contains("clean")
    }

    /// Level as a collaborator reading. Negative IPP levels mean "unknown"
    /// and come back as text so they never pass as a percentage.
    pub fn reading(&self) -> RawReading {
        match self.level {
            Some(level) if level >= 0 => RawReading::from(level),
            Some(_) | None => RawReading::Text("unknown".into()),
        }
    }
}

/// Builds [`IppPrinterApi`] handles sharing one request timeout.
#[derive(Debug, Clone)]
pub struct IppApiFactory {
    request_timeout: Duration,
}

impl IppApiFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl PrinterApiFactory for IppApiFactory {
    type Api = IppPrinterApi;

    fn connect(&self, host: &str) -> Result<IppPrinterApi, ApiError> {
        IppPrinterApi::new(host, self.request_timeout)
    }
}

/// Printer-status handle reading consumable levels over IPP.
///
/// Each instance is bound to a single printer URI and keeps the markers
/// fetched by the last `refresh`.
pub struct IppPrinterApi {
    /// The target printer URI (ipp:// or ipps://).
    uri: Uri,
    request_timeout: Duration,
    markers: Option<Vec<Marker>>,
}

impl IppPrinterApi {
    /// Create a handle for `host`, which may be a bare address or a full URI.
    pub fn new(host: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            uri: printer_uri(host)?,
            request_timeout,
            markers: None,
        })
    }

    /// Return the printer URI this handle is targeting.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Markers fetched by the last successful refresh.
    pub fn markers(&self) -> Option<&[Marker]> {
        self.markers.as_deref()
    }
}

impl PrinterApi for IppPrinterApi {
    #[instrument(skip(self), fields(uri = %self.uri))]
    fn refresh(&mut self) -> Result<(), ApiError> {
        let operation = IppOperationBuilder::get_printer_attributes(self.uri.clone())
            .attributes(MARKER_ATTRIBUTES)
            .build();
        let client = IppClient::builder(self.uri.clone())
            .request_timeout(self.request_timeout)
            .build();

        debug!("sending Get-Printer-Attributes");
        let response = client.send(operation).map_err(classify_ipp_error)?;

        let code = response.header().status_code();
        if !code.is_success() {
            error!(status = ?code, "Get-Printer-Attributes failed");
            return Err(status_error(code));
        }

        let markers = parse_markers(response.attributes());
        if markers.is_empty() {
            warn!("printer reported no marker attributes");
        }
        debug!(count = markers.len(), "received marker levels");
        self.markers = Some(markers);
        Ok(())
    }

    fn metric(&self, key: MetricKey) -> Result<RawReading, ApiError> {
        let markers = self.markers.as_deref().ok_or(ApiError::NotRefreshed)?;
        find_marker(markers, key)
            .map(Marker::reading)
            .ok_or(ApiError::MissingMetric(key))
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Turn a configured host into the printer URI.
///
/// Strings containing a scheme are used verbatim; bare addresses get
/// `ipp://`, port 631 unless one is given, and the IPP Everywhere path.
pub fn printer_uri(host: &str) -> Result<Uri, ApiError> {
    let host = host.trim();
    let invalid = |reason: String| ApiError::InvalidHost {
        host: host.to_owned(),
        reason,
    };

    if host.is_empty() {
        return Err(invalid("empty host".into()));
    }

    let text = if host.contains("://") {
        host.to_owned()
    } else if host.parse::<Ipv6Addr>().is_ok() {
        format!("ipp://[{host}]:631/{DEFAULT_RESOURCE_PATH}")
    } else if host.contains(':') {
        format!("ipp://{host}/{DEFAULT_RESOURCE_PATH}")
    } else {
        format!("ipp://{host}:631/{DEFAULT_RESOURCE_PATH}")
    };

    text.parse::<Uri>().map_err(|e| invalid(e.to_string()))
}

/// Map a transport-level IPP error, picking out HTTP auth rejections.
fn classify_ipp_error(err: IppError) -> ApiError {
    match err {
        IppError::RequestError(code @ (401 | 403))
        | IppError::ClientError(ureq::Error::StatusCode(code @ (401 | 403))) => {
            ApiError::Unauthorized(format!("HTTP {code}"))
        }
        IppError::StatusError(code) => status_error(code),
        other => ApiError::Request(other.to_string()),
    }
}

/// Map a non-success IPP status; the auth family becomes `Unauthorized`.
fn status_error(code: StatusCode) -> ApiError {
    match code {
        StatusCode::ClientErrorForbidden
        | StatusCode::ClientErrorNotAuthenticated
        | StatusCode::ClientErrorNotAuthorized => ApiError::Unauthorized(format!("{code:?}")),
        _ => ApiError::Status(format!("{code:?}")),
    }
}

/// Zip the parallel marker-* attributes into one record per consumable.
pub fn parse_markers(attrs: &IppAttributes) -> Vec<Marker> {
    let Some(group) = attrs
        .groups_of(DelimiterTag::PrinterAttributes)
        .find(|g| g.attributes().contains_key("marker-names"))
    else {
        return Vec::new();
    };
    let attributes = group.attributes();

    let names = values_of(attributes.get("marker-names"));
    let colors = values_of(attributes.get("marker-colors"));
    let kinds = values_of(attributes.get("marker-types"));
    let levels = values_of(attributes.get("marker-levels"));

    names
        .iter()
        .enumerate()
        .map(|(i, name)| Marker {
            name: name.to_string(),
            color: colors.get(i).map(|v| v.to_string()),
            kind: kinds.get(i).map(|v| v.to_string()),
            level: levels.get(i).and_then(|v| match v {
                IppValue::Integer(n) => Some(*n),
                _ => None,
            }),
        })
        .collect()
}

/// Single-valued attributes are treated as one-element arrays.
fn values_of(attr: Option<&IppAttribute>) -> Vec<&IppValue> {
    match attr.map(IppAttribute::value) {
        Some(IppValue::Array(values)) => values.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    }
}

/// Name words marking a variant ink rather than the plain colour.
const VARIANT_WORDS: [&str; 4] = ["light", "photo", "matte", "vivid"];

/// Find the marker holding `key`'s consumable.
///
/// Inks are matched on a whole word of their name, then by colour, skipping
/// variants such as "Photo Black" or "Light Cyan"; a variant is only used
/// when the printer has no plain ink of that colour. The cleaning metric is
/// the maintenance box (waste ink).
pub fn find_marker(markers: &[Marker], key: MetricKey) -> Option<&Marker> {
    if key == MetricKey::Clean {
        return markers.iter().find(|m| m.is_waste());
    }

    let word = key.as_str();
    let inks = || markers.iter().filter(|m| !m.is_waste());
    let named = |m: &Marker| name_words(&m.name).any(|w| w == word);
    let variant = |m: &Marker| name_words(&m.name).any(|w| VARIANT_WORDS.contains(&w.as_str()));
    let coloured = |m: &Marker| {
        ink_color(key).is_some_and(|hex| {
            m.color
                .as_deref()
                .is_some_and(|c| c.to_ascii_uppercase().contains(hex))
        })
    };

    inks()
        .find(|&m| named(m) && !variant(m))
        .or_else(|| inks().find(|&m| coloured(m) && !variant(m)))
        .or_else(|| inks().find(|&m| named(m)))
}

fn name_words(name: &str) -> impl Iterator<Item = String> + '_ {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
}

fn ink_color(key: MetricKey) -> Option<&'static str> {
    match key {
        MetricKey::Black => Some("#000000"),
        MetricKey::Magenta => Some("#FF00FF"),
        MetricKey::Cyan => Some("#00FFFF"),
        MetricKey::Yellow => Some("#FFFF00"),
        MetricKey::Clean => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> IppValue {
        IppValue::Array(
            values
                .iter()
                .map(|v| IppValue::NameWithoutLanguage((*v).to_owned()))
                .collect(),
        )
    }

    fn epson_attributes() -> IppAttributes {
        let mut attrs = IppAttributes::new();
        let tag = DelimiterTag::PrinterAttributes;
        attrs.add(
            tag,
            IppAttribute::new(
                "marker-names",
                text(&["Black ink", "Cyan ink", "Magenta ink", "Yellow ink", "Maintenance Box"]),
            ),
        );
        attrs.add(
            tag,
            IppAttribute::new(
                "marker-colors",
                text(&["#000000", "#00FFFF", "#FF00FF", "#FFFF00", "none"]),
            ),
        );
        attrs.add(
            tag,
            IppAttribute::new(
                "marker-types",
                IppValue::Array(
                    ["ink-cartridge", "ink-cartridge", "ink-cartridge", "ink-cartridge", "waste-ink"]
                        .iter()
                        .map(|k| IppValue::Keyword((*k).to_owned()))
                        .collect(),
                ),
            ),
        );
        attrs.add(
            tag,
            IppAttribute::new(
                "marker-levels",
                IppValue::Array(
                    [62, 48, -3, 90, 77].iter().map(|l| IppValue::Integer(*l)).collect(),
                ),
            ),
        );
        attrs
    }

    #[test]
    fn bare_host_gets_default_ipp_uri() {
        let uri = printer_uri("192.168.1.20").unwrap();
        assert_eq!(uri.to_string(), "ipp://192.168.1.20:631/ipp/print");
    }

    #[test]
    fn host_with_port_and_full_uri_are_respected() {
        assert_eq!(
            printer_uri("printer.local:8631").unwrap().to_string(),
            "ipp://printer.local:8631/ipp/print"
        );
        assert_eq!(
            printer_uri("ipps://printer.local/ipp/print").unwrap().to_string(),
            "ipps://printer.local/ipp/print"
        );
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let uri = printer_uri("fe80::1").unwrap();
        assert_eq!(uri.to_string(), "ipp://[fe80::1]:631/ipp/print");
    }

    #[test]
    fn empty_or_garbage_host_is_rejected() {
        assert!(matches!(printer_uri("  "), Err(ApiError::InvalidHost { .. })));
        assert!(printer_uri("not a valid host %%%").is_err());
    }

    #[test]
    fn markers_are_zipped_from_parallel_attributes() {
        let markers = parse_markers(&epson_attributes());
        assert_eq!(markers.len(), 5);
        assert_eq!(markers[0].name, "Black ink");
        assert_eq!(markers[0].level, Some(62));
        assert_eq!(markers[4].kind.as_deref(), Some("waste-ink"));
    }

    #[test]
    fn every_metric_key_finds_its_marker() {
        let markers = parse_markers(&epson_attributes());
        assert_eq!(find_marker(&markers, MetricKey::Black).unwrap().level, Some(62));
        assert_eq!(find_marker(&markers, MetricKey::Cyan).unwrap().level, Some(48));
        assert_eq!(find_marker(&markers, MetricKey::Yellow).unwrap().level, Some(90));
        assert_eq!(find_marker(&markers, MetricKey::Clean).unwrap().level, Some(77));
    }

    #[test]
    fn unknown_level_is_not_numeric() {
        let markers = parse_markers(&epson_attributes());
        let magenta = find_marker(&markers, MetricKey::Magenta).unwrap();
        assert_eq!(magenta.reading().coerce(), None);
    }

    #[test]
    fn colour_is_used_when_names_are_generic() {
        let markers = vec![Marker {
            name: "Ink 1".into(),
            color: Some("#ffff00".into()),
            kind: Some("ink-cartridge".into()),
            level: Some(15),
        }];
        assert_eq!(find_marker(&markers, MetricKey::Yellow).unwrap().level, Some(15));
        assert!(find_marker(&markers, MetricKey::Clean).is_none());
    }

    #[test]
    fn plain_inks_win_over_variants() {
        let ink = |name: &str, color: &str, level: i32| Marker {
            name: name.into(),
            color: Some(color.into()),
            kind: Some("ink-cartridge".into()),
            level: Some(level),
        };
        let markers = vec![
            ink("Photo Black", "#000000", 10),
            ink("Light Cyan", "#00FFFF", 11),
            ink("Black", "#000000", 20),
            ink("Cyan", "#00FFFF", 21),
            ink("Light Magenta", "#FF00FF", 12),
            ink("Ink 3", "#FF00FF", 22),
        ];

        assert_eq!(find_marker(&markers, MetricKey::Black).unwrap().level, Some(20));
        assert_eq!(find_marker(&markers, MetricKey::Cyan).unwrap().level, Some(21));
        // No plain "Magenta" name: the unmodified ink with the right colour.
        assert_eq!(find_marker(&markers, MetricKey::Magenta).unwrap().level, Some(22));
    }

    #[test]
    fn variant_ink_is_used_when_it_is_the_only_match() {
        let markers = vec![Marker {
            name: "Matte Black".into(),
            color: Some("#000000".into()),
            kind: Some("ink-cartridge".into()),
            level: Some(33),
        }];
        assert_eq!(find_marker(&markers, MetricKey::Black).unwrap().level, Some(33));
    }

    #[test]
    fn name_must_match_a_whole_word() {
        let markers = vec![Marker {
            name: "Blackish".into(),
            color: None,
            kind: Some("ink-cartridge".into()),
            level: Some(5),
        }];
        assert!(find_marker(&markers, MetricKey::Black).is_none());
    }

    #[test]
    fn http_auth_rejections_are_unauthorized() {
        assert!(matches!(
            classify_ipp_error(IppError::RequestError(401)),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_ipp_error(IppError::ClientError(ureq::Error::StatusCode(403))),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_ipp_error(IppError::RequestError(404)),
            ApiError::Request(_)
        ));
    }

    #[test]
    fn ipp_auth_status_is_unauthorized_on_both_paths() {
        let code = StatusCode::ClientErrorNotAuthorized;
        assert!(matches!(
            classify_ipp_error(IppError::StatusError(code)),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(status_error(code), ApiError::Unauthorized(_)));
        assert!(matches!(
            status_error(StatusCode::ServerErrorBusy),
            ApiError::Status(_)
        ));
    }

    #[test]
    fn digits_in_error_text_are_not_auth_failures() {
        let err = IppError::ClientError(ureq::Error::BadUri("http://printer:4010/401".into()));
        assert!(matches!(classify_ipp_error(err), ApiError::Request(_)));
    }

    #[test]
    fn metric_before_refresh_fails() {
        let api = IppPrinterApi::new("192.168.1.20", Duration::from_secs(1)).unwrap();
        assert_eq!(api.uri().to_string(), "ipp://192.168.1.20:631/ipp/print");
        assert!(api.markers().is_none());
        assert!(matches!(api.metric(MetricKey::Black), Err(ApiError::NotRefreshed)));
    }

    #[test]
    fn missing_printer_group_yields_no_markers() {
        assert!(parse_markers(&IppAttributes::new()).is_empty());
    }
}
