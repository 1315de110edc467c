//! Discrete static-map zoom levels and latitude-corrected zoom selection.
//!
//! Level 24 spans 2^32 pixels around the equator, so each pixel covers
//! 2π/2^32 rad. Every step down doubles the angle: level 21 is
//! 6.70552254e-7 °/px and level 1 is 0.703125 °/px. Mercator foreshortening
//! shrinks the usable angle per pixel by cos(latitude).

use serde::Serialize;
use utoipa::ToSchema;

pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ZoomEntry {
    pub level: u8,
    pub degrees_per_pixel: f64,
}

const fn entry(level: u8, degrees_per_pixel: f64) -> ZoomEntry {
    ZoomEntry {
        level,
        degrees_per_pixel,
    }
}

/// Coarsest first.
pub const ZOOM_TABLE: [ZoomEntry; 21] = [
    entry(1, 7.031_250_00e-1),
    entry(2, 3.515_625_00e-1),
    entry(3, 1.757_812_50e-1),
    entry(4, 8.789_062_50e-2),
    entry(5, 4.394_531_25e-2),
    entry(6, 2.197_265_62e-2),
    entry(7, 1.098_632_81e-2),
    entry(8, 5.493_164_06e-3),
    entry(9, 2.746_582_03e-3),
    entry(10, 1.373_291_02e-3),
    entry(11, 6.866_455_08e-4),
    entry(12, 3.433_227_54e-4),
    entry(13, 1.716_613_77e-4),
    entry(14, 8.583_068_85e-5),
    entry(15, 4.291_534_42e-5),
    entry(16, 2.145_767_21e-5),
    entry(17, 1.072_883_61e-5),
    entry(18, 5.364_418_03e-6),
    entry(19, 2.682_209_01e-6),
    entry(20, 1.341_104_51e-6),
    entry(21, 6.705_522_54e-7),
];

/// Equatorial pixel scale for `level`, or `None` outside 1..=21.
pub fn degrees_per_pixel(level: u8) -> Option<f64> {
    ZOOM_TABLE
        .iter()
        .find(|e| e.level == level)
        .map(|e| e.degrees_per_pixel)
}

/// Picks the most magnified level at which two points `separation_deg` apart
/// both stay within `pixel_radius` pixels of each other.
///
/// Returns 0 when the separation does not fit even at level 1, or when the
/// inputs are not finite.
pub fn select_zoom(separation_deg: f64, center_latitude_deg: f64, pixel_radius: u32) -> u8 {
    let multiplier = center_latitude_deg.to_radians().cos() * pixel_radius as f64;
    let limit = |e: &ZoomEntry| e.degrees_per_pixel * multiplier;

    if !separation_deg.is_finite() || !multiplier.is_finite() {
        return MIN_ZOOM;
    }
    if separation_deg > limit(&ZOOM_TABLE[0]) {
        return MIN_ZOOM;
    }

    ZOOM_TABLE
        .iter()
        .rev()
        .find(|e| separation_deg <= limit(e))
        .map(|e| e.level)
        .unwrap_or(MIN_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_halves_each_level() {
        for pair in ZOOM_TABLE.windows(2) {
            let ratio = pair[0].degrees_per_pixel / pair[1].degrees_per_pixel;
            assert!(
                (ratio - 2.0).abs() < 1e-6,
                "levels {} and {} ratio {}",
                pair[0].level,
                pair[1].level,
                ratio
            );
        }
        assert_eq!(ZOOM_TABLE[0].level, 1);
        assert_eq!(ZOOM_TABLE[20].level, 21);
    }

    #[test]
    fn test_degrees_per_pixel_lookup() {
        assert_eq!(degrees_per_pixel(1), Some(0.703125));
        assert_eq!(degrees_per_pixel(21), Some(6.70552254e-7));
        assert_eq!(degrees_per_pixel(0), None);
        assert_eq!(degrees_per_pixel(22), None);
    }

    #[test]
    fn test_zero_separation_is_finest() {
        for lat in [-80.0, -45.0, 0.0, 33.3, 89.0] {
            assert_eq!(select_zoom(0.0, lat, 200), MAX_ZOOM, "latitude {}", lat);
        }
    }

    #[test]
    fn test_too_wide_returns_zero() {
        // Level 1 at the equator covers 0.703125 * 200 = 140.625 degrees.
        assert_eq!(select_zoom(141.0, 0.0, 200), 0);
        assert_eq!(select_zoom(140.0, 0.0, 200), 1);
    }

    #[test]
    fn test_latitude_correction_zooms_out() {
        // 0.5 degrees at the equator fits level 9 (0.00275 * 200 = 0.549).
        let equator = select_zoom(0.5, 0.0, 200);
        let north = select_zoom(0.5, 60.0, 200);
        assert_eq!(equator, 9);
        assert_eq!(north, 8, "cos(60) halves the usable angle");
    }

    #[test]
    fn test_non_finite_separation_returns_zero() {
        assert_eq!(select_zoom(f64::NAN, 0.0, 200), 0);
        assert_eq!(select_zoom(f64::INFINITY, 0.0, 200), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Widening the separation never zooms further in.
        #[test]
        fn select_zoom_is_monotonic(
            a in 0.0f64..200.0,
            b in 0.0f64..200.0,
            lat in -85.0f64..85.0,
            radius in 1u32..1000,
        ) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(select_zoom(far, lat, radius) <= select_zoom(near, lat, radius));
        }

        /// The selected level really does fit the separation.
        #[test]
        fn selected_level_fits(sep in 0.0f64..140.0, lat in -85.0f64..85.0) {
            let level = select_zoom(sep, lat, 200);
            if let Some(scale) = degrees_per_pixel(level) {
                prop_assert!(sep <= scale * (lat.to_radians().cos() * 200.0));
            }
        }
    }
}
