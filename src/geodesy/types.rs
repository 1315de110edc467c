use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// WGS-84 equatorial radius. Distances use a spherical earth of this radius.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl Coordinate {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn offset(&self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.latitude_deg + d_lat, self.longitude_deg + d_lon)
    }
}

/// Six decimal places, comma separated: the form used in map requests.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude_deg, self.longitude_deg)
    }
}

/// Great-circle separation between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Course {
    pub distance_m: f64,
    pub bearing_deg: f64,
    /// Central angle in degrees; drives zoom selection.
    pub separation_deg: f64,
}

impl Course {
    /// Whole metres, truncated.
    pub fn distance_m_whole(&self) -> i64 {
        self.distance_m as i64
    }

    /// Whole degrees, truncated.
    pub fn bearing_deg_whole(&self) -> i64 {
        self.bearing_deg as i64
    }
}
