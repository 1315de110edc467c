//! Great-circle geometry between the base and the beacon.

mod types;

pub use types::{Coordinate, Course, EARTH_RADIUS_M};

use std::f64::consts::PI;

/// Distance and initial bearing from `a` to `b` on a spherical earth.
///
/// Non-finite input yields NaN fields; callers validate coordinates first.
pub fn distance_and_bearing(a: &Coordinate, b: &Coordinate) -> Course {
    let lat1 = a.lat_rad();
    let lat2 = b.lat_rad();
    let d_lon = b.lon_rad() - a.lon_rad();

    let (slat1, clat1) = lat1.sin_cos();
    let (slat2, clat2) = lat2.sin_cos();
    let (sdlon, cdlon) = d_lon.sin_cos();

    let y = clat1 * slat2 - slat1 * clat2 * cdlon;
    let numerator = (y * y + (clat2 * sdlon).powi(2)).sqrt();
    let denominator = slat1 * slat2 + clat1 * clat2 * cdlon;
    let central_angle = numerator.atan2(denominator);

    let mut bearing = (sdlon * clat2).atan2(y);
    if bearing < 0.0 {
        bearing += 2.0 * PI;
    }

    Course {
        distance_m: central_angle * EARTH_RADIUS_M,
        bearing_deg: bearing.to_degrees(),
        separation_deg: central_angle.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_of_longitude_on_equator() {
        let course = distance_and_bearing(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0));
        assert!(
            (course.distance_m - 111_319.49).abs() < 1.0,
            "expected ~111319 m, got {}",
            course.distance_m
        );
        assert!((course.bearing_deg - 90.0).abs() < 1e-9);
        assert!((course.separation_deg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_same_point_is_zero_distance_with_finite_bearing() {
        let p = Coordinate::new(51.5, -0.1);
        let course = distance_and_bearing(&p, &p);
        assert_eq!(course.distance_m, 0.0);
        assert!(course.bearing_deg.is_finite());
    }

    #[test]
    fn test_due_north_and_due_south() {
        let south = Coordinate::new(10.0, 20.0);
        let north = Coordinate::new(11.0, 20.0);
        let up = distance_and_bearing(&south, &north);
        let down = distance_and_bearing(&north, &south);
        assert!(up.bearing_deg.abs() < 1e-9, "north bearing was {}", up.bearing_deg);
        assert!((down.bearing_deg - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_is_normalised_into_full_circle() {
        let course = distance_and_bearing(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, -1.0));
        assert!((course.bearing_deg - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_whole_readouts_truncate() {
        let course = Course {
            distance_m: 1234.9,
            bearing_deg: 359.99,
            separation_deg: 0.01,
        };
        assert_eq!(course.distance_m_whole(), 1234);
        assert_eq!(course.bearing_deg_whole(), 359);
    }

    #[test]
    fn test_non_finite_input_produces_nan() {
        let course = distance_and_bearing(&Coordinate::new(f64::NAN, 0.0), &Coordinate::new(1.0, 1.0));
        assert!(course.distance_m.is_nan());
    }

    #[test]
    fn test_coordinate_display() {
        assert_eq!(Coordinate::new(51.5, -0.1).to_string(), "51.500000,-0.100000");
        assert_eq!(
            Coordinate::new(-33.8568, 151.2153).offset(0.0001, -0.0001).to_string(),
            "-33.856700,151.215200"
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Distance does not depend on direction of travel.
        #[test]
        fn distance_is_symmetric(
            lat1 in -89.0f64..89.0, lon1 in -179.0f64..179.0,
            lat2 in -89.0f64..89.0, lon2 in -179.0f64..179.0,
        ) {
            let a = Coordinate::new(lat1, lon1);
            let b = Coordinate::new(lat2, lon2);
            let ab = distance_and_bearing(&a, &b);
            let ba = distance_and_bearing(&b, &a);
            prop_assert!((ab.distance_m - ba.distance_m).abs() < 1e-6 * ab.distance_m.max(1.0));
        }

        /// Bearings stay within [0, 360).
        #[test]
        fn bearing_in_range(
            lat1 in -89.0f64..89.0, lon1 in -179.0f64..179.0,
            lat2 in -89.0f64..89.0, lon2 in -179.0f64..179.0,
        ) {
            let course = distance_and_bearing(&Coordinate::new(lat1, lon1), &Coordinate::new(lat2, lon2));
            prop_assert!(course.bearing_deg >= 0.0 && course.bearing_deg < 360.0,
                "bearing out of range: {}", course.bearing_deg);
        }

        /// On the equator the reverse bearing is the forward bearing turned by 180 degrees.
        #[test]
        fn equatorial_reverse_bearing_differs_by_half_turn(lon1 in -90.0f64..90.0, step in 0.1f64..60.0) {
            let a = Coordinate::new(0.0, lon1);
            let b = Coordinate::new(0.0, lon1 + step);
            let forward = distance_and_bearing(&a, &b).bearing_deg;
            let reverse = distance_and_bearing(&b, &a).bearing_deg;
            prop_assert!(((reverse - forward).abs() - 180.0).abs() < 1e-6);
        }
    }
}
