use serde::Serialize;
use utoipa::ToSchema;

use crate::geodesy::Coordinate;

/// Latest GNSS fix reported by the base itself.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StationFix {
    /// Raw `YYYYMMDDHHMMSS` as sent by the base.
    pub datetime: String,
    /// `HH:MM:SS` sliced from `datetime`.
    pub timestamp: String,
    pub position: Coordinate,
    pub altitude_m: i32,
    pub speed_m_s: f64,
    pub heading_deg: u16,
    pub hdop: f64,
    pub satellites: u16,
}

/// One telemetry message downloaded from the beacon.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BeaconFrame {
    pub datetime: String,
    pub timestamp: String,
    pub position: Coordinate,
    pub altitude_m: i32,
    pub speed_m_s: f64,
    pub heading_deg: u16,
    pub hdop: f64,
    pub satellites: u16,
    pub pressure_pa: u32,
    pub temperature_c: f64,
    pub voltage_v: f64,
    pub sample_count: u32,
    pub device_serial: String,
    /// Messages still queued for download after this one.
    pub mt_queue_depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BeaconResponse {
    Frame(BeaconFrame),
    /// Nothing to download; only the queue depth was reported.
    QueueDepth(u32),
}
