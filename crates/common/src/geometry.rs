//! Axis-aligned quads on the XZ plane.
//!
//! `top`/`bottom` bound the z axis and `left`/`right` the x axis, as seen from
//! above: `top` is the smaller z, `left` the smaller x.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Errors from validating a quad before an index is built over it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("bounds must be finite: {0:?}")]
    NonFinite(BoundingQuad),
    #[error("bounds are inverted: top={top} bottom={bottom} left={left} right={right}")]
    Inverted {
        top: f32,
        bottom: f32,
        left: f32,
        right: f32,
    },
    #[error("bounds enclose zero area: {width} x {height}")]
    ZeroArea { width: f32, height: f32 },
}

/// Child slot of a split quad. The discriminant is the child array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    Nw = 0,
    Sw = 1,
    Ne = 2,
    Se = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Nw, Quadrant::Sw, Quadrant::Ne, Quadrant::Se];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this child lies on the larger-x half of its parent.
    pub fn is_east(self) -> bool {
        matches!(self, Quadrant::Ne | Quadrant::Se)
    }

    /// Whether this child lies on the larger-z half of its parent.
    pub fn is_south(self) -> bool {
        matches!(self, Quadrant::Sw | Quadrant::Se)
    }
}

/// Axis-aligned rectangle on the world plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingQuad {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl BoundingQuad {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Square of side `extent` centered on the origin.
    pub fn centered(extent: f32) -> Self {
        let half = extent / 2.0;
        Self::new(-half, half, -half, half)
    }

    /// Check the quad can host an index: finite, ordered and non-empty.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if ![self.top, self.bottom, self.left, self.right]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(GeometryError::NonFinite(*self));
        }
        if self.top > self.bottom || self.left > self.right {
            return Err(GeometryError::Inverted {
                top: self.top,
                bottom: self.bottom,
                left: self.left,
                right: self.right,
            });
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(GeometryError::ZeroArea {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn diagonal(&self) -> f32 {
        self.width().hypot(self.height())
    }

    /// Midpoint on the XZ plane (y = 0).
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(
            (self.left + self.right) / 2.0,
            0.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Corners in order top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [Vec3; 4] {
        [
            Vec3::new(self.left, 0.0, self.top),
            Vec3::new(self.right, 0.0, self.top),
            Vec3::new(self.left, 0.0, self.bottom),
            Vec3::new(self.right, 0.0, self.bottom),
        ]
    }

    /// Split into four equal children, indexed by [`Quadrant`].
    pub fn split(&self) -> [BoundingQuad; 4] {
        let mid_x = self.left + self.width() / 2.0;
        let mid_z = self.top + self.height() / 2.0;
        [
            BoundingQuad::new(self.top, mid_z, self.left, mid_x),
            BoundingQuad::new(mid_z, self.bottom, self.left, mid_x),
            BoundingQuad::new(self.top, mid_z, mid_x, self.right),
            BoundingQuad::new(mid_z, self.bottom, mid_x, self.right),
        ]
    }

    pub fn child(&self, quadrant: Quadrant) -> BoundingQuad {
        self.split()[quadrant.index()]
    }

    /// Closed containment test on the XZ plane.
    pub fn contains(&self, pos: Vec3) -> bool {
        pos.x >= self.left && pos.x <= self.right && pos.z >= self.top && pos.z <= self.bottom
    }

    /// Half-open containment relative to an enclosing `outer` frame.
    ///
    /// Top and left edges are always inclusive. Bottom and right edges are
    /// inclusive only where they coincide with `outer`'s, so sibling quads that
    /// tile `outer` claim every point of it exactly once.
    pub fn contains_half_open(&self, pos: Vec3, outer: &BoundingQuad) -> bool {
        let in_x = pos.x >= self.left
            && (pos.x < self.right || (self.right == outer.right && pos.x <= self.right));
        let in_z = pos.z >= self.top
            && (pos.z < self.bottom || (self.bottom == outer.bottom && pos.z <= self.bottom));
        in_x && in_z
    }

    /// XZ distance from `pos` to the centroid.
    pub fn centroid_distance(&self, pos: Vec3) -> f32 {
        planar_distance(self.centroid(), pos)
    }

    /// Smallest XZ distance from `pos` to any of the four corners.
    pub fn min_corner_distance(&self, pos: Vec3) -> f32 {
        self.corners()
            .iter()
            .map(|c| planar_distance(*c, pos))
            .fold(f32::INFINITY, f32::min)
    }
}

/// Euclidean distance ignoring the y axis.
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    (a.x - b.x).hypot(a.z - b.z)
}
