/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use euclid::default::{Rect, Size2D, Transform3D};
use smallvec::SmallVec;

use crate::internal_types::{ColorF, FilterOp, RenderPassId, ResourceId};
use crate::util::{MatrixHelpers, Region};

/// Per-layer state shared by every quad the layer appends in one
/// AppendQuads call: content-to-target transform, clip and opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedQuadState {
    pub content_to_target_transform: Transform3D<f32>,
    pub content_bounds: Size2D<f32>,
    pub visible_content_rect: Rect<f32>,
    pub clip_rect: Rect<f32>,
    pub is_clipped: bool,
    pub opacity: f32,
}

impl SharedQuadState {
    pub fn new(
        content_to_target_transform: Transform3D<f32>,
        content_bounds: Size2D<f32>,
        visible_content_rect: Rect<f32>,
        clip_rect: Rect<f32>,
        is_clipped: bool,
        opacity: f32,
    ) -> SharedQuadState {
        SharedQuadState {
            content_to_target_transform,
            content_bounds,
            visible_content_rect,
            clip_rect,
            is_clipped,
            opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    SolidColor {
        color: ColorF,
    },
    /// Placeholder drawn where tile contents are not yet available.
    Checkerboard {
        color: ColorF,
    },
    TiledContent {
        resource_id: ResourceId,
        tex_coord_rect: Rect<f32>,
        texture_size: Size2D<f32>,
    },
    Texture {
        resource_id: ResourceId,
        premultiplied_alpha: bool,
        uv_rect: Rect<f32>,
        flipped: bool,
    },
    Video {
        resource_id: ResourceId,
    },
    IoSurface {
        surface_id: u32,
        surface_size: Size2D<f32>,
    },
    RenderPass {
        render_pass_id: RenderPassId,
        is_replica: bool,
        mask_resource_id: Option<ResourceId>,
        /// Mask texture coordinates, as the ratio of the owning surface's
        /// content rect to the mask texture extent.
        mask_uv_rect: Rect<f32>,
        /// Sub-rect of the referenced pass that changed since the cached
        /// texture was produced. Empty means the cached copy is current.
        contents_changed_since_last_frame: Rect<f32>,
        filters: Vec<FilterOp>,
        background_filters: Vec<FilterOp>,
    },
}

/// A single paintable primitive. Immutable once appended to a pass for
/// the duration of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawQuad {
    /// Index into the owning pass's shared_quad_state_list.
    pub shared_quad_state: usize,
    /// Full quad extent, in the layer's content space.
    pub rect: Rect<f32>,
    /// Part of `rect` known to be fully opaque.
    pub opaque_rect: Rect<f32>,
    /// Part of `rect` that survives clipping and occlusion culling.
    pub visible_rect: Rect<f32>,
    pub material: Material,
}

impl DrawQuad {
    pub fn referenced_pass(&self) -> Option<RenderPassId> {
        match self.material {
            Material::RenderPass { render_pass_id, .. } => Some(render_pass_id),
            _ => None,
        }
    }
}

/// One draw target plus its ordered quad list. Quads are appended
/// front-to-back (so occlusion can cull); the renderer walks the list in
/// reverse to composite back-to-front.
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub id: RenderPassId,
    pub output_rect: Rect<f32>,
    pub damage_rect: Rect<f32>,
    pub transform_to_root_target: Transform3D<f32>,
    pub has_transparent_background: bool,
    pub has_occlusion_from_outside_target_surface: bool,
    pub shared_quad_state_list: SmallVec<[SharedQuadState; 4]>,
    pub quad_list: Vec<DrawQuad>,
}

impl RenderPass {
    pub fn new(
        id: RenderPassId,
        output_rect: Rect<f32>,
        transform_to_root_target: Transform3D<f32>,
    ) -> RenderPass {
        RenderPass {
            id,
            output_rect,
            damage_rect: Rect::zero(),
            transform_to_root_target,
            has_transparent_background: true,
            has_occlusion_from_outside_target_surface: false,
            shared_quad_state_list: SmallVec::new(),
            quad_list: Vec::new(),
        }
    }
}

/// Hands quads from a layer's AppendQuads into the render pass bound to
/// the layer's target, culling against the target's current occluded
/// region. The layer must install a shared quad state before appending.
pub struct QuadSink<'a> {
    pass: &'a mut RenderPass,
    occlusion: Option<&'a Region>,
    current_shared_state: Option<usize>,
    quads_culled: usize,
}

impl<'a> QuadSink<'a> {
    pub fn new(pass: &'a mut RenderPass, occlusion: Option<&'a Region>) -> QuadSink<'a> {
        QuadSink {
            pass,
            occlusion,
            current_shared_state: None,
            quads_culled: 0,
        }
    }

    pub fn use_shared_quad_state(&mut self, state: SharedQuadState) -> usize {
        let index = self.pass.shared_quad_state_list.len();
        self.pass.shared_quad_state_list.push(state);
        self.current_shared_state = Some(index);
        index
    }

    pub fn current_shared_quad_state(&self) -> usize {
        self.current_shared_state
            .expect("AppendQuads must install a shared quad state before appending")
    }

    pub fn quads_culled(&self) -> usize {
        self.quads_culled
    }

    /// Appends the quad unless it is entirely occluded. Returns whether
    /// the quad (possibly with a reduced visible rect) was kept.
    pub fn append(&mut self, mut quad: DrawQuad) -> bool {
        let state_index = self.current_shared_quad_state();
        debug_assert_eq!(quad.shared_quad_state, state_index);
        let state = &self.pass.shared_quad_state_list[state_index];

        if quad.visible_rect.is_empty() {
            self.quads_culled += 1;
            return false;
        }

        if let Some(occlusion) = self.occlusion {
            if !occlusion.is_empty() {
                let transform = state.content_to_target_transform;
                if let Some(target_rect) = transform.transform_rect(&quad.visible_rect) {
                    if occlusion.contains_rect(&target_rect) {
                        self.quads_culled += 1;
                        return false;
                    }
                    // Shrink the visible rect only when the mapping is
                    // exact both ways; rotated quads stay conservative.
                    if transform.preserves_2d_axis_alignment() {
                        if let Some(inverse) = transform.inverse() {
                            let unoccluded = occlusion.unoccluded_bounds(&target_rect);
                            if let Some(back) = inverse.transform_rect(&unoccluded) {
                                quad.visible_rect = back
                                    .intersection(&quad.visible_rect)
                                    .unwrap_or_else(Rect::zero);
                            }
                        }
                    }
                }
            }
        }

        if quad.visible_rect.is_empty() {
            self.quads_culled += 1;
            return false;
        }

        self.pass.quad_list.push(quad);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal_types::LayerId;
    use euclid::rect;
    use euclid::size2;

    fn test_pass() -> RenderPass {
        RenderPass::new(
            RenderPassId::new(LayerId(1), 0),
            rect(0.0, 0.0, 100.0, 100.0),
            Transform3D::identity(),
        )
    }

    fn solid_quad(state: usize, r: Rect<f32>) -> DrawQuad {
        DrawQuad {
            shared_quad_state: state,
            rect: r,
            opaque_rect: r,
            visible_rect: r,
            material: Material::SolidColor { color: ColorF::white() },
        }
    }

    fn identity_state() -> SharedQuadState {
        SharedQuadState::new(
            Transform3D::identity(),
            size2(100.0, 100.0),
            rect(0.0, 0.0, 100.0, 100.0),
            rect(0.0, 0.0, 100.0, 100.0),
            false,
            1.0,
        )
    }

    #[test]
    fn append_without_occlusion() {
        let mut pass = test_pass();
        let mut sink = QuadSink::new(&mut pass, None);
        let state = sink.use_shared_quad_state(identity_state());
        assert!(sink.append(solid_quad(state, rect(0.0, 0.0, 50.0, 50.0))));
        assert_eq!(pass.quad_list.len(), 1);
        assert_eq!(pass.shared_quad_state_list.len(), 1);
    }

    #[test]
    fn fully_occluded_quad_is_dropped() {
        let occlusion = Region::from_rect(&rect(0.0, 0.0, 100.0, 100.0));
        let mut pass = test_pass();
        let mut sink = QuadSink::new(&mut pass, Some(&occlusion));
        let state = sink.use_shared_quad_state(identity_state());
        assert!(!sink.append(solid_quad(state, rect(10.0, 10.0, 20.0, 20.0))));
        assert_eq!(sink.quads_culled(), 1);
        assert!(pass.quad_list.is_empty());
    }

    #[test]
    fn partially_occluded_quad_shrinks() {
        let occlusion = Region::from_rect(&rect(0.0, 0.0, 100.0, 30.0));
        let mut pass = test_pass();
        let mut sink = QuadSink::new(&mut pass, Some(&occlusion));
        let state = sink.use_shared_quad_state(identity_state());
        assert!(sink.append(solid_quad(state, rect(0.0, 0.0, 50.0, 50.0))));
        assert_eq!(pass.quad_list[0].visible_rect, rect(0.0, 30.0, 50.0, 20.0));
    }

    #[test]
    #[should_panic]
    fn append_before_shared_state_is_an_error() {
        let mut pass = test_pass();
        let mut sink = QuadSink::new(&mut pass, None);
        sink.append(solid_quad(0, rect(0.0, 0.0, 10.0, 10.0)));
    }
}
