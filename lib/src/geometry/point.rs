//! Point types for 2D and 3D geometry.
//!
//! Points use integer coordinates in micrometers to keep the whole 2D
//! pipeline free of floating-point drift. Mesh vertices arrive as
//! floating-point millimeters and are snapped onto the integer grid by the
//! optimizer.

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A 2D point with integer micrometer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    /// Create a new point with the given coordinates.
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a new point from millimeter coordinates, scaling them.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self {
            x: scale(x),
            y: scale(y),
        }
    }

    /// Create a point at the origin (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Calculate the squared length of this point as a vector.
    /// Returns i128 to avoid overflow with large coordinates.
    #[inline]
    pub fn length_squared(&self) -> i128 {
        (self.x as i128) * (self.x as i128) + (self.y as i128) * (self.y as i128)
    }

    /// Calculate the length (magnitude) of this point as a vector.
    #[inline]
    pub fn length(&self) -> CoordF {
        (self.length_squared() as CoordF).sqrt()
    }

    /// Calculate the squared distance to another point.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        (*other - *self).length_squared()
    }

    /// Calculate the distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    /// Check whether this vector is strictly shorter than `len`.
    ///
    /// Compares squared magnitudes so no square root is taken.
    #[inline]
    pub fn shorter_than(&self, len: Coord) -> bool {
        self.length_squared() < (len as i128) * (len as i128)
    }

    /// Check whether this vector is shorter than or exactly `len` long.
    #[inline]
    pub fn shorter_than_or_equal(&self, len: Coord) -> bool {
        self.length_squared() <= (len as i128) * (len as i128)
    }

    /// Calculate the cross product with another point (2D pseudo-cross product).
    #[inline]
    pub fn cross(&self, other: &Point) -> i128 {
        (self.x as i128) * (other.y as i128) - (self.y as i128) * (other.x as i128)
    }

    /// Calculate the dot product with another point.
    #[inline]
    pub fn dot(&self, other: &Point) -> i128 {
        (self.x as i128) * (other.x as i128) + (self.y as i128) * (other.y as i128)
    }

    /// Rotate this point by the given angle (in radians) around the origin.
    #[inline]
    pub fn rotate(&self, angle: CoordF) -> Self {
        let cos_a = angle.cos();
        let sin_a = angle.sin();
        let x = self.x as CoordF;
        let y = self.y as CoordF;
        Self {
            x: (cos_a * x - sin_a * y).round() as Coord,
            y: (cos_a * y + sin_a * x).round() as Coord,
        }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", unscale(self.x), unscale(self.y))
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Point {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl SubAssign for Point {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl From<(Coord, Coord)> for Point {
    #[inline]
    fn from((x, y): (Coord, Coord)) -> Self {
        Self { x, y }
    }
}

/// A 3D point with integer micrometer coordinates.
///
/// Used by the mesh optimizer as the exact grid key for vertex
/// deduplication.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point3 {
    pub x: Coord,
    pub y: Coord,
    pub z: Coord,
}

impl Point3 {
    /// Create a new 3D point.
    #[inline]
    pub const fn new(x: Coord, y: Coord, z: Coord) -> Self {
        Self { x, y, z }
    }

    /// Create a new 3D point from millimeter coordinates.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self {
            x: scale(x),
            y: scale(y),
            z: scale(z),
        }
    }

    /// Project to 2D (drop z coordinate).
    #[inline]
    pub const fn to_2d(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    /// Component-wise minimum with another point.
    #[inline]
    pub fn min(&self, other: &Point3) -> Point3 {
        Point3 {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    /// Component-wise maximum with another point.
    #[inline]
    pub fn max(&self, other: &Point3) -> Point3 {
        Point3 {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            z: self.z.max(other.z),
        }
    }
}

impl fmt::Debug for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point3({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

/// A 3D point with floating-point millimeter coordinates.
///
/// This is the raw vertex representation produced by the STL reader before
/// the optimizer snaps it to the micrometer grid.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3F {
    pub x: CoordF,
    pub y: CoordF,
    pub z: CoordF,
}

impl Point3F {
    /// Create a new 3D floating-point point.
    #[inline]
    pub const fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self { x, y, z }
    }

    /// Convert to integer micrometer coordinates.
    #[inline]
    pub fn to_micrometer(&self) -> Point3 {
        Point3::new_scale(self.x, self.y, self.z)
    }

    /// Calculate the squared length.
    #[inline]
    pub fn length_squared(&self) -> CoordF {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Calculate the length.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.length_squared().sqrt()
    }

    /// Normalize to unit length.
    #[inline]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            *self
        }
    }

    /// Cross product.
    #[inline]
    pub fn cross(&self, other: &Point3F) -> Point3F {
        Point3F {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

impl fmt::Debug for Point3F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point3F({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

impl Add for Point3F {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Point3F {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

/// Type alias for a collection of 2D points.
pub type Points = Vec<Point>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_new_scale() {
        let p = Point::new_scale(1.0, 2.0);
        assert_eq!(p.x, 1_000);
        assert_eq!(p.y, 2_000);
    }

    #[test]
    fn test_point_distance() {
        let p1 = Point::new(0, 0);
        let p2 = Point::new(3_000, 4_000); // 3mm, 4mm
        assert!((p1.distance(&p2) - 5_000.0).abs() < 1.0);
    }

    #[test]
    fn test_shorter_than() {
        let v = Point::new(30, 40); // length 50
        assert!(v.shorter_than(51));
        assert!(!v.shorter_than(50));
        assert!(v.shorter_than_or_equal(50));
        assert!(!v.shorter_than_or_equal(49));
    }

    #[test]
    fn test_point_arithmetic() {
        let p1 = Point::new(10, 20);
        let p2 = Point::new(3, 4);

        assert_eq!(p1 + p2, Point::new(13, 24));
        assert_eq!(p1 - p2, Point::new(7, 16));
        assert_eq!(-p1, Point::new(-10, -20));
    }

    #[test]
    fn test_point_cross_dot() {
        let v1 = Point::new(1, 0);
        let v2 = Point::new(0, 1);
        assert_eq!(v1.cross(&v2), 1);
        assert_eq!(v2.cross(&v1), -1);
        assert_eq!(v1.dot(&v2), 0);
    }

    #[test]
    fn test_point_rotate() {
        let p = Point::new(1_000, 0);
        let rotated = p.rotate(std::f64::consts::FRAC_PI_2);
        assert!(rotated.x.abs() <= 1);
        assert!((rotated.y - 1_000).abs() <= 1);
    }

    #[test]
    fn test_point3_snap() {
        let v = Point3F::new(1.00012, -0.5, 3.0);
        let p = v.to_micrometer();
        assert_eq!(p.x, 1_000);
        assert_eq!(p.y, -500);
        assert_eq!(p.z, 3_000);
    }

    #[test]
    fn test_point3f_cross() {
        let v1 = Point3F::new(1.0, 0.0, 0.0);
        let v2 = Point3F::new(0.0, 1.0, 0.0);
        let c = v1.cross(&v2);
        assert!((c.z - 1.0).abs() < 1e-12);
        assert!(c.x.abs() < 1e-12 && c.y.abs() < 1e-12);
    }
}
