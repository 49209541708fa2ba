//! Geographic query inputs.

use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

/// A circle on the earth's surface; radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRadius {
    pub lon: f64,
    pub lat: f64,
    pub radius: f64,
}

impl PointRadius {
    pub fn center(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// True when `p` lies within the circle.
    pub fn contains(&self, p: &Point<f64>) -> bool {
        self.center().haversine_distance(p) <= self.radius
    }
}

/// An axis-aligned longitude/latitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Great-circle length of the box diagonal, in meters.
    pub fn diagonal(&self) -> f64 {
        Point::new(self.min_lon, self.min_lat)
            .haversine_distance(&Point::new(self.max_lon, self.max_lat))
    }

    /// Approximate area in square meters: half the squared diagonal.
    ///
    /// Exact for a square; good enough to reject oversized requests.
    pub fn approx_area(&self) -> f64 {
        let d = self.diagonal();
        0.5 * d * d
    }

    /// True when `p` lies inside or on the edge of the box.
    pub fn contains(&self, p: &Point<f64>) -> bool {
        (self.min_lon..=self.max_lon).contains(&p.x())
            && (self.min_lat..=self.max_lat).contains(&p.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_radius_contains() {
        let c = PointRadius {
            lon: -122.271604,
            lat: 37.803664,
            radius: 500.0,
        };
        assert!(c.contains(&Point::new(-122.2700, 37.8040)));
        assert!(!c.contains(&Point::new(-122.4194, 37.7749)));
    }

    #[test]
    fn bbox_contains_edges() {
        let b = BoundingBox::new(-123.0, 37.0, -122.0, 38.0);
        assert!(b.contains(&Point::new(-122.5, 37.5)));
        assert!(b.contains(&Point::new(-122.0, 37.5)));
        assert!(!b.contains(&Point::new(-121.9, 37.5)));
    }

    #[test]
    fn bbox_area_grows_with_size() {
        let small = BoundingBox::new(-122.3, 37.8, -122.2, 37.9);
        let large = BoundingBox::new(-123.0, 37.0, -121.0, 39.0);
        assert!(small.approx_area() < large.approx_area());
        // ~13.6km diagonal
        let d = small.diagonal();
        assert!(d > 13_000.0 && d < 15_000.0, "diagonal {d}");
    }
}
