//! Host-native reference formula.

use std::f64::consts::PI;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Great-circle distance in kilometres between two points given in degrees,
/// using the spherical law of cosines.
pub fn haversine_distance(a_lat: f64, a_long: f64, b_lat: f64, b_long: f64) -> f64 {
    let a_lat = degrees_to_radians(a_lat);
    let a_long = degrees_to_radians(a_long);
    let b_lat = degrees_to_radians(b_lat);
    let b_long = degrees_to_radians(b_long);

    let angular_distance =
        (a_lat.sin() * b_lat.sin() + a_lat.cos() * b_lat.cos() * (a_long - b_long).cos()).acos();
    EARTH_RADIUS_KM * angular_distance
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod geo_test;
