//! Great-circle distance between stop coordinates.
//!
//! Stops carry their position as a [`geo::Point`] with `x = longitude` and
//! `y = latitude`, both in degrees.

use geo::Point;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Great-circle distance in metres between two points given in degrees.
#[must_use]
pub fn distance(from: Point<f64>, to: Point<f64>) -> f64 {
    let (from_lng, from_lat) = (from.x().to_radians(), from.y().to_radians());
    let (to_lng, to_lat) = (to.x().to_radians(), to.y().to_radians());

    let cosine = from_lat.sin() * to_lat.sin()
        + from_lat.cos() * to_lat.cos() * (from_lng - to_lng).abs().cos();

    // Rounding can push the cosine of nearly identical points above 1.
    cosine.clamp(-1.0, 1.0).acos() * EARTH_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(37.208290, 55.611087);
        let b = Point::new(37.209755, 55.595884);

        assert!(approx::abs_diff_eq!(
            distance(a, b),
            distance(b, a),
            epsilon = 1e-9
        ));
    }

    #[test]
    fn distance_between_neighbouring_stops() {
        let a = Point::new(37.208290, 55.611087);
        let b = Point::new(37.209755, 55.595884);

        assert!(approx::abs_diff_eq!(distance(a, b), 1693.0, epsilon = 2.0));
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = Point::new(37.208290, 55.611087);

        assert!(approx::abs_diff_eq!(distance(a, a), 0.0, epsilon = 1e-9));
    }
}
