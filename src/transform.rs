// SPDX: CC0-1.0

//! World ↔ screen mapping derived from pan, zoom and unit-per-square.

use crate::{Number, Point};

/// Screen pixels per grid square at zoom 1.
pub const GRID_SPACING: Number = 30.0;

pub const MIN_SCALE: Number = 0.5;
pub const MAX_SCALE: Number = 5.0;
pub const MIN_UNIT: Number = 0.1;
pub const MAX_UNIT: Number = 10.0;

/// 2×3 affine matrix mapping `(x, y)` to
/// `(sx·x + kx·y + tx, ky·x + sy·y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub sx: Number,
    pub kx: Number,
    pub tx: Number,
    pub ky: Number,
    pub sy: Number,
    pub ty: Number,
}

impl Matrix {
    pub const IDENTITY: Self = Self::scale_translate(1.0, 1.0, 0.0, 0.0);

    pub const fn scale_translate(sx: Number, sy: Number, tx: Number, ty: Number) -> Self {
        Self {
            sx,
            kx: 0.0,
            tx,
            ky: 0.0,
            sy,
            ty,
        }
    }

    #[inline]
    pub fn map_point(&self, p: Point) -> Point {
        Point::new(
            self.sx * p.x + self.kx * p.y + self.tx,
            self.ky * p.x + self.sy * p.y + self.ty,
        )
    }

    pub fn try_invert(&self) -> Option<Self> {
        let det = self.sx * self.sy - self.kx * self.ky;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        let sx = self.sy * inv;
        let kx = -self.kx * inv;
        let ky = -self.ky * inv;
        let sy = self.sx * inv;
        Some(Self {
            sx,
            kx,
            tx: -(sx * self.tx + kx * self.ty),
            ky,
            sy,
            ty: -(ky * self.tx + sy * self.ty),
        })
    }
}

/// Raw view state; two snapshots are equal exactly when pan, zoom and unit
/// all match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformSnapshot {
    pub offset: Point,
    pub scale: Number,
    pub unit: Number,
}

#[derive(Clone, Debug)]
pub struct Transform {
    state: TransformSnapshot,
    matrix: Matrix,
    inverse: Matrix,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    /// Identity mapping until the first [`Transform::update`].
    pub const fn new() -> Self {
        Self {
            state: TransformSnapshot {
                offset: Point::ZERO,
                scale: 1.0,
                unit: 1.0,
            },
            matrix: Matrix::IDENTITY,
            inverse: Matrix::IDENTITY,
        }
    }

    pub fn with_view(offset: Point, scale: Number, unit: Number) -> Self {
        let mut ret = Self::new();
        ret.update(offset, scale, unit);
        ret
    }

    pub fn update(&mut self, offset: Point, scale: Number, unit: Number) {
        self.state = TransformSnapshot {
            offset,
            scale,
            unit,
        };
        let factor = GRID_SPACING * scale / unit;
        // screen y grows downward
        self.matrix = Matrix::scale_translate(factor, -factor, offset.x, offset.y);
        self.inverse = self.matrix.try_invert().unwrap_or_else(|| {
            log::warn!("view transform is singular (scale {scale}, unit {unit}); using identity");
            Matrix::IDENTITY
        });
    }

    pub fn snapshot(&self) -> TransformSnapshot {
        self.state
    }

    pub fn matrix(&self) -> Matrix {
        self.matrix
    }

    #[inline]
    pub fn world_to_screen(&self, p: Point) -> Point {
        self.matrix.map_point(p)
    }

    #[inline]
    pub fn screen_to_world(&self, p: Point) -> Point {
        self.inverse.map_point(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trip() {
        let t = Transform::with_view(Point::new(400.0, 300.0), 1.5, 2.0);
        let world = Point::new(-3.25, 7.5);
        let back = t.screen_to_world(t.world_to_screen(world));
        assert_relative_eq!(back.x, world.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, world.y, epsilon = 1e-9);
    }

    #[test]
    fn origin_sits_at_offset_and_y_flips() {
        let t = Transform::with_view(Point::new(400.0, 300.0), 1.0, 1.0);
        assert_eq!(t.world_to_screen(Point::ZERO), Point::new(400.0, 300.0));
        let up = t.world_to_screen(Point::new(0.0, 1.0));
        assert_relative_eq!(up.y, 300.0 - GRID_SPACING);
        let m = t.matrix();
        assert_eq!((m.sx, m.sy), (GRID_SPACING, -GRID_SPACING));
    }

    #[test]
    fn singular_view_falls_back_to_identity() {
        let t = Transform::with_view(Point::new(10.0, 10.0), 0.0, 1.0);
        let p = Point::new(3.0, 4.0);
        assert_eq!(t.screen_to_world(p), p);
    }

    #[test]
    fn snapshot_tracks_every_component() {
        let a = Transform::with_view(Point::new(1.0, 2.0), 1.0, 1.0).snapshot();
        // same matrix, different state
        let b = Transform::with_view(Point::new(1.0, 2.0), 2.0, 2.0).snapshot();
        let c = Transform::with_view(Point::new(1.0, 2.0), 1.0, 1.0).snapshot();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
