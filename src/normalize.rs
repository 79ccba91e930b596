//! Normalization of typed Heurist field values
//!
//! Dates become ISO 8601 strings, WKT geometries become coordinate pairs or
//! raw coordinate strings, file sizes become byte counts.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::source::{DateParts, DateValue};

static WKT_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*point\s*\(\s*([-+\d.eE]+)\s+([-+\d.eE]+)\s*\)\s*$").expect("valid regex")
});
static WKT_TAGGED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z]+)\s*\((.+)\)\s*$").expect("valid regex"));

/// Open bound marker of an ISO 8601-2 interval
const OPEN_BOUND: &str = "..";

/// Render a date value as an ISO 8601 string
///
/// Falls back to `raw` when the value carries no usable component.
pub fn render_date(date: &DateValue, raw: &str) -> String {
    let rendered = match date {
        DateValue::Simple(parts) => render_parts(parts),
        DateValue::Range { earliest, latest } => {
            let start = earliest.as_ref().and_then(render_parts);
            let end = latest.as_ref().and_then(render_parts);
            match (start, end) {
                (Some(start), Some(end)) => Some(format!("{}/{}", start, end)),
                (Some(start), None) => Some(format!("{}/{}", start, OPEN_BOUND)),
                (None, Some(end)) => Some(format!("{}/{}", OPEN_BOUND, end)),
                (None, None) => None,
            }
        }
    };
    rendered.unwrap_or_else(|| raw.to_string())
}

fn render_parts(parts: &DateParts) -> Option<String> {
    let year = non_empty(&parts.year)?;
    let mut date = pad_digits(year, 4);
    if let Some(month) = non_empty(&parts.month) {
        date.push('-');
        date.push_str(&pad_digits(month, 2));
        if let Some(day) = non_empty(&parts.day) {
            date.push('-');
            date.push_str(&pad_digits(day, 2));
        }
    }
    Some(date)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn pad_digits(value: &str, width: usize) -> String {
    if value.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>width$}", value, width = width)
    } else {
        value.to_string()
    }
}

/// A parsed WKT geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point { longitude: f64, latitude: f64 },
    /// Any non-point geometry; `property` is the GeoShape property holding
    /// the raw coordinate string
    Shape {
        property: &'static str,
        coordinates: String,
    },
}

/// Parse a WKT string; `None` when it cannot be represented
pub fn parse_wkt(wkt: &str) -> Option<Geometry> {
    let captures = WKT_TAGGED.captures(wkt)?;
    let tag = captures[1].to_ascii_lowercase();
    if tag == "point" {
        let point = WKT_POINT.captures(wkt)?;
        let longitude = point[1].parse::<f64>().ok()?;
        let latitude = point[2].parse::<f64>().ok()?;
        return Some(Geometry::Point {
            longitude,
            latitude,
        });
    }

    let property = match tag.as_str() {
        "polygon" | "multipolygon" => "polygon",
        _ => "line",
    };
    Some(Geometry::Shape {
        property,
        coordinates: captures[2].trim().to_string(),
    })
}

/// Convert a size in the given unit to bytes (1024-based)
///
/// Unknown units are taken as bytes.
pub fn normalize_file_size(size: u64, unit: &str) -> u64 {
    let factor: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        _ => 1,
    };
    size.saturating_mul(factor)
}

/// Normalize an upload timestamp to RFC 3339 with a numeric offset
///
/// Timestamps without an offset are taken as UTC. Returns `None` when the
/// input is not a recognizable date.
pub fn normalize_upload_date(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.to_rfc3339_opts(SecondsFormat::Secs, false));
    }
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, false))
}
