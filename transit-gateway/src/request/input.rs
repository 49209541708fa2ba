//! Normalization of client-supplied arguments.

use crate::domain::{BoundingBox, Cursor, PointRadius};

use super::error::ResolverError;

/// The row cap for a root selection.
///
/// Missing, zero or negative limits give `default`; anything above `max`
/// is clamped to it. The result is always in `1..=max`.
pub fn check_limit(limit: Option<i32>, default: usize, max: usize) -> usize {
    let max = max.max(1);
    match limit {
        Some(n) if n > 0 => (n as usize).min(max),
        _ => default.clamp(1, max),
    }
}

/// Decode a root `after` argument. Missing or blank input starts from the
/// beginning; anything else must be a cursor this gateway handed out.
pub fn check_cursor(after: Option<&str>) -> Result<Option<Cursor>, ResolverError> {
    match after.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_cursor(s).map(Some),
    }
}

/// Decode an opaque cursor string.
pub fn parse_cursor(s: &str) -> Result<Cursor, ResolverError> {
    Cursor::decode(s).map_err(|e| ResolverError::invalid(e.to_string()))
}

/// Clamp `value` into `[min, max]`. NaN becomes `min`.
pub fn check_float(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Clamp a search radius to `[0, max_radius]`.
pub fn check_radius(radius: f64, max_radius: f64) -> f64 {
    check_float(radius, 0.0, max_radius)
}

pub fn check_point_radius(near: PointRadius, max_radius: f64) -> PointRadius {
    PointRadius {
        radius: check_radius(near.radius, max_radius),
        ..near
    }
}

/// Reject boxes whose approximate area reaches `max_radius` squared.
pub fn check_bbox(bbox: &BoundingBox, max_radius: f64) -> Result<(), ResolverError> {
    let area = bbox.approx_area();
    let max_area = max_radius * max_radius;
    if !(area < max_area) {
        return Err(ResolverError::invalid(format!(
            "bounding box too large: {:.0} square meters (max {:.0})",
            area, max_area
        )));
    }
    Ok(())
}
