//! This module defines the plane the algorithms work in:
//!  - the 2-D point type
//!  - the Euclidian distance function
//!  - the mean of a set of points

use serde::{Deserialize, Serialize};

/// A location in the 2-D plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Builds a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Computes the Euclidian distance between two points.
pub fn euclid_dist(p1: &Point, p2: &Point) -> f64 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    (dx * dx + dy * dy).sqrt()
}

/// Computes the mean of a sequence of points, `None` when it is empty.
pub fn mean<'a>(points: impl Iterator<Item = &'a Point>) -> Option<Point> {
    let mut count = 0_usize;
    let mut sum = Point::new(0., 0.);
    for p in points {
        sum.x += p.x;
        sum.y += p.y;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(Point::new(sum.x / count as f64, sum.y / count as f64))
    }
}
