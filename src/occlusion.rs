/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Incremental occlusion tracking. While layers are visited front-to-back
//! within a render target, each opaque axis-aligned layer grows a region
//! of the target already covered; later (further-back) layers are culled
//! against it.
//!
//! Occlusion is tracked per target on a stack, split into the part
//! produced inside the current target and the part inherited from
//! ancestor targets. The two matter separately to pass caching: external
//! occlusion can shrink a surface's output without its contents changing.
//!
//! Only exactly axis-aligned opaque rects contribute. Rotated or skewed
//! opaque layers are still culled against the region but never grow it.

use euclid::default::{Rect, Transform3D};

use crate::internal_types::LayerId;
use crate::tree::LayerTree;
use crate::util::{MatrixHelpers, Region};

struct StackEntry {
    target: LayerId,
    occlusion_from_inside_target: Region,
    occlusion_from_outside_target: Region,
}

pub struct OcclusionTracker {
    /// Device-space clip applied to everything; nothing outside it can
    /// be visible, so it bounds all contributed occlusion.
    screen_space_clip_rect: Rect<f32>,
    stack: Vec<StackEntry>,
}

impl OcclusionTracker {
    pub fn new(screen_space_clip_rect: Rect<f32>) -> OcclusionTracker {
        OcclusionTracker {
            screen_space_clip_rect,
            stack: Vec::new(),
        }
    }

    /// Begin visiting layers that draw into `target`. Inherited occlusion
    /// is the parent target's combined region mapped into the new
    /// target's content space, when that mapping is axis-aligned;
    /// otherwise the conservative answer is no inherited occlusion.
    pub fn enter_target(&mut self, tree: &LayerTree, target: LayerId) {
        let mut outside = Region::new();
        if let Some(parent) = self.stack.last() {
            let surface = tree
                .layer(target)
                .render_surface
                .as_ref()
                .expect("entering a target without a surface");
            if let Some(inverse) = surface.draw_transform.inverse() {
                if inverse.preserves_2d_axis_alignment() {
                    for rect in parent
                        .occlusion_from_inside_target
                        .rects()
                        .iter()
                        .chain(parent.occlusion_from_outside_target.rects().iter())
                    {
                        if let Some(mapped) = inverse.transform_rect(rect) {
                            outside.union_rect(&mapped);
                        }
                    }
                }
            }
        }
        self.stack.push(StackEntry {
            target,
            occlusion_from_inside_target: Region::new(),
            occlusion_from_outside_target: outside,
        });
    }

    /// Finish visiting `target` and compute the occlusion its contents
    /// contribute to the parent target, if the surface's contribution is
    /// opaque and rigid enough to preserve it. The region is returned in
    /// the parent target's space instead of merged: the caller first
    /// emits the quad that composites the surface, then feeds the
    /// contribution to `merge_surface_contribution`. Merging before the
    /// quad is appended would cull it against the surface's own pixels.
    pub fn leave_target(&mut self, tree: &LayerTree, target: LayerId) -> Region {
        let entry = match self.stack.pop() {
            Some(entry) => entry,
            None => panic!("leave_target with an empty target stack"),
        };
        assert_eq!(entry.target, target, "mismatched enter/leave target");

        let mut contribution = Region::new();
        if self.stack.is_empty() {
            return contribution;
        }
        let layer = tree.layer(target);
        let surface = match layer.render_surface {
            Some(ref surface) => surface,
            None => return contribution,
        };
        // A translucent, filtered or replicated surface repaints its
        // pixels in a way that may expose what it covered.
        if surface.draw_opacity < 1.0
            || !surface.filters.is_empty()
            || !surface.background_filters.is_empty()
            || surface.replica_draw_transform.is_some()
            || !surface.draw_transform.preserves_2d_axis_alignment()
        {
            return contribution;
        }
        for rect in entry.occlusion_from_inside_target.rects().iter() {
            let mut mapped = match surface.draw_transform.transform_rect(rect) {
                Some(mapped) => mapped,
                None => continue,
            };
            if surface.is_clipped {
                mapped = match mapped.intersection(&surface.clip_rect) {
                    Some(clipped) => clipped,
                    None => continue,
                };
            }
            contribution.union_rect(&mapped);
        }
        contribution
    }

    /// Merges a contribution returned by `leave_target` into the current
    /// target's opaque cover.
    pub fn merge_surface_contribution(&mut self, contribution: &Region) {
        let entry = match self.stack.last_mut() {
            Some(entry) => entry,
            None => return,
        };
        for rect in contribution.rects().iter() {
            entry.occlusion_from_inside_target.union_rect(rect);
        }
    }

    /// Union the layer's visible rect into the current target's opaque
    /// region, when the layer qualifies as an occluder.
    pub fn mark_occluded_behind_layer(&mut self, tree: &LayerTree, id: LayerId) {
        let layer = tree.layer(id);
        if !layer.contents_opaque || layer.opacity_is_animating {
            return;
        }
        if layer.draw_properties.opacity < 1.0 || !layer.filters.is_empty() {
            return;
        }
        let transform = &layer.draw_properties.target_space_transform;
        if !transform.preserves_2d_axis_alignment() {
            return;
        }
        let visible = layer.draw_properties.visible_content_rect;
        if visible.is_empty() {
            return;
        }
        let mut occluding = match transform.transform_rect(&visible) {
            Some(rect) => rect,
            None => return,
        };
        if layer.draw_properties.is_clipped {
            occluding = match occluding.intersection(&layer.draw_properties.clip_rect) {
                Some(rect) => rect,
                None => return,
            };
        }
        if let Some(clip) = self.screen_clip_in_target(tree) {
            occluding = match occluding.intersection(&clip) {
                Some(rect) => rect,
                None => return,
            };
        }
        let entry = self
            .stack
            .last_mut()
            .expect("marking occlusion outside any target");
        entry.occlusion_from_inside_target.union_rect(&occluding);
    }

    /// True when `content_rect` mapped by `transform` lands entirely
    /// inside occluded parts of the current target.
    pub fn occluded(
        &self,
        transform: &Transform3D<f32>,
        content_rect: &Rect<f32>,
        is_clipped: bool,
        clip_rect: &Rect<f32>,
    ) -> bool {
        self.unoccluded_content_rect(transform, content_rect, is_clipped, clip_rect)
            .is_empty()
    }

    /// The part of `content_rect` not already covered, in content space.
    /// Conservative for non-axis-aligned transforms: the full rect is
    /// returned whenever the occluded part cannot be mapped back exactly.
    pub fn unoccluded_content_rect(
        &self,
        transform: &Transform3D<f32>,
        content_rect: &Rect<f32>,
        is_clipped: bool,
        clip_rect: &Rect<f32>,
    ) -> Rect<f32> {
        if content_rect.is_empty() {
            return *content_rect;
        }
        let entry = match self.stack.last() {
            Some(entry) => entry,
            None => return *content_rect,
        };
        let mut target_rect = match transform.transform_rect(content_rect) {
            Some(rect) => rect,
            None => return Rect::zero(),
        };
        if is_clipped {
            target_rect = match target_rect.intersection(clip_rect) {
                Some(rect) => rect,
                None => return Rect::zero(),
            };
        }
        let mut unoccluded = entry
            .occlusion_from_inside_target
            .unoccluded_bounds(&target_rect);
        unoccluded = entry
            .occlusion_from_outside_target
            .unoccluded_bounds(&unoccluded);
        if unoccluded.is_empty() {
            return Rect::zero();
        }
        if !transform.preserves_2d_axis_alignment() {
            return *content_rect;
        }
        let inverse = match transform.inverse() {
            Some(inverse) => inverse,
            None => return *content_rect,
        };
        inverse
            .transform_rect(&unoccluded)
            .and_then(|rect| rect.intersection(content_rect))
            .unwrap_or(*content_rect)
    }

    /// Occlusion in the current target's space, for quad-level culling.
    pub fn current_occlusion(&self) -> Option<&Region> {
        self.stack
            .last()
            .map(|entry| &entry.occlusion_from_inside_target)
    }

    pub fn has_occlusion_from_outside_target(&self) -> bool {
        self.stack
            .last()
            .map_or(false, |entry| !entry.occlusion_from_outside_target.is_empty())
    }

    fn screen_clip_in_target(&self, tree: &LayerTree) -> Option<Rect<f32>> {
        let entry = self.stack.last()?;
        let surface = tree.layer(entry.target).render_surface.as_ref()?;
        let inverse = surface.screen_space_transform.inverse()?;
        if !inverse.preserves_2d_axis_alignment() {
            return None;
        }
        inverse.transform_rect(&self.screen_space_clip_rect)
    }
}
