//! Decoding of base responses.
//!
//! Station fix: `YYYYMMDDHHMMSS,lat,lon,alt,speed,heading,hdop,satellites`
//!
//! Beacon frame: the station fields followed by
//! `pressure,temperature,voltage,count,serial,mtq`.
//!
//! Either may be replaced by `ERROR...`; a beacon poll with nothing to
//! download answers with the bare queue depth.

use std::str::FromStr;

use super::error::FrameError;
use super::types::{BeaconFrame, BeaconResponse, StationFix};
use crate::geodesy::Coordinate;

pub const STATION_FIELDS: usize = 8;
pub const BEACON_FIELDS: usize = 14;

const DATETIME_LEN: usize = 14;
const ERROR_PREFIX: &str = "ERROR";
const TERMINATOR: &str = "\r\n";

/// Raw responses shorter than these (terminator included) cannot be frames.
const STATION_MIN_LEN: usize = 6;
const BEACON_MIN_LEN: usize = 8;

/// Removes the two byte line terminator.
pub fn strip_terminator(raw: &str) -> &str {
    raw.strip_suffix(TERMINATOR)
        .unwrap_or_else(|| raw.trim_end_matches(['\r', '\n']))
}

fn check_device_error(body: &str) -> Result<(), FrameError> {
    if body.starts_with(ERROR_PREFIX) {
        Err(FrameError::DeviceError(body.to_string()))
    } else {
        Ok(())
    }
}

/// Slices `HH:MM:SS` out of a 14 character `YYYYMMDDHHMMSS`. The calendar
/// fields are not validated.
pub fn time_of_day(datetime: &str) -> Result<String, FrameError> {
    if datetime.len() != DATETIME_LEN || !datetime.is_ascii() {
        return Err(FrameError::Timestamp(datetime.to_string()));
    }
    Ok(format!(
        "{}:{}:{}",
        &datetime[8..10],
        &datetime[10..12],
        &datetime[12..14]
    ))
}

fn split_fields(body: &str, expected: usize) -> Result<Vec<&str>, FrameError> {
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < expected {
        return Err(FrameError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &'static str) -> Result<T, FrameError> {
    let raw = fields[index].trim();
    raw.parse().map_err(|_| FrameError::InvalidField {
        field: name,
        value: raw.to_string(),
    })
}

fn finite_field(fields: &[&str], index: usize, name: &'static str) -> Result<f64, FrameError> {
    let value: f64 = field(fields, index, name)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FrameError::InvalidField {
            field: name,
            value: fields[index].trim().to_string(),
        })
    }
}

/// Altitude arrives in whole metres from most firmware; decimals are rounded.
fn altitude_field(fields: &[&str], index: usize) -> Result<i32, FrameError> {
    let value = finite_field(fields, index, "altitude")?;
    Ok(value.round() as i32)
}

/// Fields shared by station fixes and beacon frames.
struct Fix {
    datetime: String,
    timestamp: String,
    position: Coordinate,
    altitude_m: i32,
    speed_m_s: f64,
    heading_deg: u16,
    hdop: f64,
    satellites: u16,
}

fn parse_fix(fields: &[&str]) -> Result<Fix, FrameError> {
    // Exactly 14 characters as sent; padding is a malformed timestamp.
    let datetime = fields[0];
    let timestamp = time_of_day(datetime)?;
    Ok(Fix {
        datetime: datetime.to_string(),
        timestamp,
        position: Coordinate::new(
            finite_field(fields, 1, "latitude")?,
            finite_field(fields, 2, "longitude")?,
        ),
        altitude_m: altitude_field(fields, 3)?,
        speed_m_s: finite_field(fields, 4, "speed")?,
        heading_deg: field(fields, 5, "heading")?,
        hdop: finite_field(fields, 6, "hdop")?,
        satellites: field(fields, 7, "satellites")?,
    })
}

/// Parses the base's answer to a station fix request.
pub fn parse_station_response(raw: &str) -> Result<StationFix, FrameError> {
    if raw.is_empty() {
        return Err(FrameError::Empty);
    }
    let body = strip_terminator(raw);
    check_device_error(body)?;
    if raw.len() < STATION_MIN_LEN {
        return Err(FrameError::TooShort(raw.len()));
    }

    let fields = split_fields(body, STATION_FIELDS)?;
    let fix = parse_fix(&fields)?;
    Ok(StationFix {
        datetime: fix.datetime,
        timestamp: fix.timestamp,
        position: fix.position,
        altitude_m: fix.altitude_m,
        speed_m_s: fix.speed_m_s,
        heading_deg: fix.heading_deg,
        hdop: fix.hdop,
        satellites: fix.satellites,
    })
}

/// Parses the base's answer to a beacon data request.
///
/// Short answers are read as a bare queue depth.
pub fn parse_beacon_response(raw: &str) -> Result<BeaconResponse, FrameError> {
    if raw.is_empty() {
        return Err(FrameError::Empty);
    }
    let body = strip_terminator(raw);
    check_device_error(body)?;
    if raw.len() < BEACON_MIN_LEN {
        return parse_queue_depth(raw).map(BeaconResponse::QueueDepth);
    }

    let fields = split_fields(body, BEACON_FIELDS)?;
    let fix = parse_fix(&fields)?;

    let device_serial = fields[12].trim();
    if device_serial.is_empty() || !device_serial.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FrameError::InvalidField {
            field: "serial",
            value: device_serial.to_string(),
        });
    }

    Ok(BeaconResponse::Frame(BeaconFrame {
        datetime: fix.datetime,
        timestamp: fix.timestamp,
        position: fix.position,
        altitude_m: fix.altitude_m,
        speed_m_s: fix.speed_m_s,
        heading_deg: fix.heading_deg,
        hdop: fix.hdop,
        satellites: fix.satellites,
        pressure_pa: field(&fields, 8, "pressure")?,
        temperature_c: finite_field(&fields, 9, "temperature")?,
        voltage_v: finite_field(&fields, 10, "voltage")?,
        sample_count: field(&fields, 11, "count")?,
        device_serial: device_serial.to_string(),
        mt_queue_depth: field(&fields, 13, "mtq")?,
    }))
}

/// Parses a bare queue depth, as answered to beacon polls with nothing queued
/// and to flush requests.
pub fn parse_queue_depth(raw: &str) -> Result<u32, FrameError> {
    if raw.is_empty() {
        return Err(FrameError::Empty);
    }
    let body = strip_terminator(raw);
    check_device_error(body)?;
    let text = body.trim();
    text.parse()
        .map_err(|_| FrameError::QueueDepth(text.to_string()))
}
