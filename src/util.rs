/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use euclid::default::{Point2D, Rect, Transform3D};
use euclid::rect;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransformedRectKind {
    AxisAligned,
    Complex,
}

pub trait MatrixHelpers {
    /// Returns true if this matrix maps axis-aligned 2D rectangles to
    /// axis-aligned 2D rectangles (no rotation, shear or perspective).
    fn preserves_2d_axis_alignment(&self) -> bool;

    fn transformed_rect_kind(&self) -> TransformedRectKind {
        if self.preserves_2d_axis_alignment() {
            TransformedRectKind::AxisAligned
        } else {
            TransformedRectKind::Complex
        }
    }

    /// Drops the z mapping, matching CSS flattening of a non-3d-preserving
    /// ancestor: input z is ignored and output z is forced to zero.
    fn flattened(&self) -> Transform3D<f32>;

    /// True if the +z face of the transformed plane points away from the
    /// viewer. Perspective is ignored, which is conservative for the
    /// back-face culling done during scroll hit testing.
    fn is_back_face_visible(&self) -> bool;

    /// Bounding rect of the transformed (and perspective-divided) rect.
    /// None when every corner fails to project (w <= 0).
    fn transform_rect(&self, rect: &Rect<f32>) -> Option<Rect<f32>>;

    /// Treating self as a screen-to-local matrix, casts a ray through the
    /// given screen point and intersects it with the local z = 0 plane.
    fn unproject_point(&self, p: &Point2D<f32>) -> Option<Point2D<f32>>;

    /// Some(scale) if this matrix is a uniform, axis-aligned 2D scale
    /// (possibly with translation).
    fn uniform_2d_scale(&self) -> Option<f32>;
}

impl MatrixHelpers for Transform3D<f32> {
    fn preserves_2d_axis_alignment(&self) -> bool {
        self.m12 == 0.0 && self.m21 == 0.0 && self.m14 == 0.0 && self.m24 == 0.0 &&
            self.m44 > 0.0
    }

    fn flattened(&self) -> Transform3D<f32> {
        let mut m = *self;
        m.m13 = 0.0;
        m.m23 = 0.0;
        m.m43 = 0.0;
        m.m31 = 0.0;
        m.m32 = 0.0;
        m.m33 = 1.0;
        m.m34 = 0.0;
        m
    }

    fn is_back_face_visible(&self) -> bool {
        // z component of the transformed surface normal, from the cross
        // product of the transformed x and y basis vectors.
        self.m11 * self.m22 - self.m12 * self.m21 < 0.0
    }

    fn transform_rect(&self, rect: &Rect<f32>) -> Option<Rect<f32>> {
        self.outer_transformed_rect(rect)
    }

    fn unproject_point(&self, p: &Point2D<f32>) -> Option<Point2D<f32>> {
        // Solve for the input z that lands on the local z = 0 plane, then
        // run the full homogeneous transform at that z.
        if self.m33.abs() <= 1.0e-6 {
            return None;
        }
        let z = -(p.x * self.m13 + p.y * self.m23 + self.m43) / self.m33;
        let x = p.x * self.m11 + p.y * self.m21 + z * self.m31 + self.m41;
        let y = p.x * self.m12 + p.y * self.m22 + z * self.m32 + self.m42;
        let w = p.x * self.m14 + p.y * self.m24 + z * self.m34 + self.m44;
        if w <= 0.0 {
            return None;
        }
        Some(Point2D::new(x / w, y / w))
    }

    fn uniform_2d_scale(&self) -> Option<f32> {
        if self.preserves_2d_axis_alignment() && self.m11 == self.m22 && self.m11 > 0.0 &&
            self.m44 == 1.0
        {
            Some(self.m11)
        } else {
            None
        }
    }
}

fn rect_from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Rect<f32> {
    rect(x0, y0, x1 - x0, y1 - y0)
}

fn is_degenerate(r: &Rect<f32>) -> bool {
    r.size.width <= 0.0 || r.size.height <= 0.0
}

/// Appends to `results` the up-to-four rects covering `rect` minus `other`.
pub fn subtract_rect(rect: &Rect<f32>, other: &Rect<f32>, results: &mut Vec<Rect<f32>>) {
    let int = match rect.intersection(other) {
        Some(int) => int,
        None => {
            results.push(*rect);
            return;
        }
    };

    let rx0 = rect.origin.x;
    let ry0 = rect.origin.y;
    let rx1 = rx0 + rect.size.width;
    let ry1 = ry0 + rect.size.height;

    let ox0 = int.origin.x;
    let oy0 = int.origin.y;
    let ox1 = ox0 + int.size.width;
    let oy1 = oy0 + int.size.height;

    for r in &[
        rect_from_points(rx0, ry0, ox0, ry1),
        rect_from_points(ox0, ry0, ox1, oy0),
        rect_from_points(ox0, oy1, ox1, ry1),
        rect_from_points(ox1, ry0, rx1, ry1),
    ] {
        if !is_degenerate(r) {
            results.push(*r);
        }
    }
}

/// An axis-aligned region kept as a set of pairwise-disjoint rects. Used
/// by the occlusion tracker and for gutter-quad generation; all inputs
/// are expected to be axis aligned already.
#[derive(Debug, Clone, Default)]
pub struct Region {
    rects: Vec<Rect<f32>>,
}

impl Region {
    pub fn new() -> Region {
        Region { rects: Vec::new() }
    }

    pub fn from_rect(rect: &Rect<f32>) -> Region {
        let mut region = Region::new();
        region.union_rect(rect);
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn rects(&self) -> &[Rect<f32>] {
        &self.rects
    }

    pub fn bounds(&self) -> Rect<f32> {
        let mut iter = self.rects.iter();
        let first = match iter.next() {
            Some(r) => *r,
            None => return Rect::zero(),
        };
        iter.fold(first, |acc, r| acc.union(r))
    }

    pub fn area(&self) -> f32 {
        self.rects.iter().map(|r| r.size.width * r.size.height).sum()
    }

    pub fn union_rect(&mut self, rect: &Rect<f32>) {
        if is_degenerate(rect) {
            return;
        }
        let mut pieces = vec![*rect];
        let mut scratch = Vec::new();
        for existing in &self.rects {
            scratch.clear();
            for piece in &pieces {
                subtract_rect(piece, existing, &mut scratch);
            }
            std::mem::swap(&mut pieces, &mut scratch);
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
    }

    pub fn union_region(&mut self, other: &Region) {
        for r in &other.rects {
            self.union_rect(r);
        }
    }

    pub fn subtract_rect(&mut self, rect: &Rect<f32>) {
        if is_degenerate(rect) {
            return;
        }
        let mut next = Vec::with_capacity(self.rects.len());
        for existing in &self.rects {
            subtract_rect(existing, rect, &mut next);
        }
        self.rects = next;
    }

    pub fn intersects(&self, rect: &Rect<f32>) -> bool {
        self.rects.iter().any(|r| {
            r.intersection(rect).map_or(false, |int| !is_degenerate(&int))
        })
    }

    pub fn contains_point(&self, point: &Point2D<f32>) -> bool {
        self.rects.iter().any(|rect| rect.contains(*point))
    }

    pub fn contains_rect(&self, rect: &Rect<f32>) -> bool {
        if is_degenerate(rect) {
            return true;
        }
        self.parts_not_covered(rect).is_empty()
    }

    /// The parts of `rect` not covered by this region, as disjoint rects.
    pub fn parts_not_covered(&self, rect: &Rect<f32>) -> Vec<Rect<f32>> {
        if is_degenerate(rect) {
            return Vec::new();
        }
        let mut pieces = vec![*rect];
        let mut scratch = Vec::new();
        for existing in &self.rects {
            scratch.clear();
            for piece in &pieces {
                subtract_rect(piece, existing, &mut scratch);
            }
            std::mem::swap(&mut pieces, &mut scratch);
            if pieces.is_empty() {
                break;
            }
        }
        pieces
    }

    /// Bounding rect of the uncovered part of `rect`. The common fast
    /// paths (fully visible, fully occluded) avoid the rect split.
    pub fn unoccluded_bounds(&self, rect: &Rect<f32>) -> Rect<f32> {
        if !self.intersects(rect) {
            return *rect;
        }
        let parts = self.parts_not_covered(rect);
        let mut iter = parts.iter();
        let first = match iter.next() {
            Some(r) => *r,
            None => return Rect::zero(),
        };
        iter.fold(first, |acc, r| acc.union(r))
    }
}
