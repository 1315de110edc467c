//! Pixel <-> coordinate transforms on the rendered static map.

use serde::Serialize;
use utoipa::ToSchema;

use super::error::MapError;
use super::zoom::{degrees_per_pixel, MAX_ZOOM};
use crate::geodesy::Coordinate;

fn scales(zoom: u8, center_latitude_deg: f64) -> Result<(f64, f64), MapError> {
    let scale_x = degrees_per_pixel(zoom).ok_or(MapError::InvalidZoom(zoom))?;
    let scale_y = scale_x * center_latitude_deg.to_radians().cos();
    Ok((scale_x, scale_y))
}

/// Converts a pixel offset from the image centre into `(d_lat, d_lon)`.
///
/// Image y grows downward while latitude grows northward, hence the sign flip.
pub fn pixel_offset_to_coordinate_delta(
    dx_pixels: f64,
    dy_pixels: f64,
    zoom: u8,
    center_latitude_deg: f64,
) -> Result<(f64, f64), MapError> {
    let (scale_x, scale_y) = scales(zoom, center_latitude_deg)?;
    Ok((-dy_pixels * scale_y, dx_pixels * scale_x))
}

/// Inverse of [`pixel_offset_to_coordinate_delta`]: `(dx, dy)` in pixels.
pub fn coordinate_delta_to_pixel_offset(
    d_lat: f64,
    d_lon: f64,
    zoom: u8,
    center_latitude_deg: f64,
) -> Result<(f64, f64), MapError> {
    let (scale_x, scale_y) = scales(zoom, center_latitude_deg)?;
    Ok((d_lon / scale_x, -d_lat / scale_y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Integer centre pixel.
    pub fn center(&self) -> (i64, i64) {
        (self.width as i64 / 2, self.height as i64 / 2)
    }
}

/// Position on the rendered image, in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

/// What the map currently shows and whether it may be clicked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
    pub size: ImageSize,
    /// False until a real map image has rendered, and again after a fallback.
    pub clicks_enabled: bool,
}

impl MapView {
    pub fn new(size: ImageSize) -> Self {
        Self {
            center: Coordinate::default(),
            zoom: 0,
            size,
            clicks_enabled: false,
        }
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.zoom < MAX_ZOOM {
            self.zoom += 1;
            true
        } else {
            false
        }
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom > 0 {
            self.zoom -= 1;
            true
        } else {
            false
        }
    }

    /// Coordinate under image pixel `(x, y)`.
    pub fn coordinate_at(&self, x: i64, y: i64) -> Result<Coordinate, MapError> {
        if !self.clicks_enabled {
            return Err(MapError::ClicksDisabled);
        }
        let (cx, cy) = self.size.center();
        let (d_lat, d_lon) = pixel_offset_to_coordinate_delta(
            (x - cx) as f64,
            (y - cy) as f64,
            self.zoom,
            self.center.latitude_deg,
        )?;
        Ok(self.center.offset(d_lat, d_lon))
    }

    /// Image pixel at which `coordinate` is drawn (may lie outside the image).
    pub fn pixel_of(&self, coordinate: &Coordinate) -> Result<ImagePoint, MapError> {
        let (cx, cy) = self.size.center();
        let (dx, dy) = coordinate_delta_to_pixel_offset(
            coordinate.latitude_deg - self.center.latitude_deg,
            coordinate.longitude_deg - self.center.longitude_deg,
            self.zoom,
            self.center.latitude_deg,
        )?;
        Ok(ImagePoint {
            x: cx as f64 + dx,
            y: cy as f64 + dy,
        })
    }

    /// Moves the centre to the clicked pixel.
    pub fn recenter(&mut self, x: i64, y: i64) -> Result<Coordinate, MapError> {
        let target = self.coordinate_at(x, y)?;
        self.center = target;
        Ok(target)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Moving by (dx, dy) then (-dx, -dy) cancels out.
        #[test]
        fn opposite_offsets_cancel(
            dx in -320.0f64..320.0,
            dy in -240.0f64..240.0,
            zoom in 1u8..=21,
            lat in -85.0f64..85.0,
        ) {
            let (a_lat, a_lon) = pixel_offset_to_coordinate_delta(dx, dy, zoom, lat).unwrap();
            let (b_lat, b_lon) = pixel_offset_to_coordinate_delta(-dx, -dy, zoom, lat).unwrap();
            prop_assert!((a_lat + b_lat).abs() < 1e-9);
            prop_assert!((a_lon + b_lon).abs() < 1e-9);
        }

        /// The inverse transform recovers the pixel offset.
        #[test]
        fn inverse_recovers_offset(
            dx in -320.0f64..320.0,
            dy in -240.0f64..240.0,
            zoom in 1u8..=21,
            lat in -85.0f64..85.0,
        ) {
            let (d_lat, d_lon) = pixel_offset_to_coordinate_delta(dx, dy, zoom, lat).unwrap();
            let (rx, ry) = coordinate_delta_to_pixel_offset(d_lat, d_lon, zoom, lat).unwrap();
            prop_assert!((rx - dx).abs() < 1e-6);
            prop_assert!((ry - dy).abs() < 1e-6);
        }
    }
}
