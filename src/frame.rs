/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Per-frame render-pass construction. Walks each render target's layer
//! list front-to-back under the occlusion tracker, runs every drawing
//! layer through WillDraw and AppendQuads, and emits one render pass
//! per surface, ordered so that a pass always precedes any pass whose
//! quads reference it (root pass last). The matching DidDraw for every
//! recorded WillDraw is issued by the coordinator after the frame is
//! drawn or abandoned.

use euclid::default::{Point2D, Rect, Transform3D};
use euclid::rect;

use crate::internal_types::{DrawMode, FastHashMap, LayerId, RenderPassId, ResourceProvider};
use crate::layer::AppendQuadsData;
use crate::occlusion::OcclusionTracker;
use crate::quad::{DrawQuad, Material, QuadSink, RenderPass, SharedQuadState};
use crate::tree::LayerTree;
use crate::util::Region;

/// Everything the renderer needs for one frame, plus bookkeeping the
/// coordinator uses to decide whether the frame may be drawn at all.
pub struct FrameData {
    /// Ordered pass list; a referenced pass always precedes its
    /// referencing pass, and the root target's pass comes last.
    pub render_passes: Vec<RenderPass>,
    pub render_pass_map: FastHashMap<RenderPassId, usize>,
    /// Surface-owning layers, root first.
    pub render_surface_layer_list: Vec<LayerId>,
    /// Layers whose WillDraw returned true this frame, in draw sequence.
    pub will_draw_layers: Vec<LayerId>,
    pub missing_tile_count: usize,
    pub checkerboard_on_animating_layer: bool,
}

impl FrameData {
    pub fn new() -> FrameData {
        FrameData {
            render_passes: Vec::new(),
            render_pass_map: FastHashMap::default(),
            render_surface_layer_list: Vec::new(),
            will_draw_layers: Vec::new(),
            missing_tile_count: 0,
            checkerboard_on_animating_layer: false,
        }
    }

    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.render_passes.last()
    }

    fn push_pass(&mut self, pass: RenderPass) {
        self.render_pass_map.insert(pass.id, self.render_passes.len());
        self.render_passes.push(pass);
    }
}

/// Builds the frame's pass list from the already-prepared draw
/// properties. The caller runs `calculate_draw_properties` first and
/// hands its surface list in.
pub fn calculate_render_passes(
    tree: &mut LayerTree,
    render_surface_layer_list: &[LayerId],
    mode: DrawMode,
    resources: Option<&dyn ResourceProvider>,
    frame: &mut FrameData,
) {
    frame.render_passes.clear();
    frame.render_pass_map.clear();
    frame.render_surface_layer_list = render_surface_layer_list.to_vec();
    frame.will_draw_layers.clear();
    frame.missing_tile_count = 0;
    frame.checkerboard_on_animating_layer = false;

    let root = match tree.root_layer() {
        Some(root) => root,
        None => return,
    };
    let viewport = Rect::new(Point2D::origin(), tree.device_viewport_size);
    let mut tracker = OcclusionTracker::new(viewport);
    process_target(tree, root, true, mode, resources, &mut tracker, frame);

    if let Some(root_pass) = frame.render_passes.last_mut() {
        root_pass.has_transparent_background = tree.has_transparent_background;
    }
}

fn surface_pass_id(target: LayerId) -> RenderPassId {
    RenderPassId::new(target, 0)
}

fn process_target(
    tree: &mut LayerTree,
    target: LayerId,
    is_root: bool,
    mode: DrawMode,
    resources: Option<&dyn ResourceProvider>,
    tracker: &mut OcclusionTracker,
    frame: &mut FrameData,
) -> Region {
    let (output_rect, to_root, damage_rect, layer_list) = {
        let surface = tree
            .layer(target)
            .render_surface
            .as_ref()
            .expect("render target without a surface");
        (
            surface.content_rect,
            surface.screen_space_transform,
            surface.damage_rect,
            surface.layer_list.clone(),
        )
    };
    tracker.enter_target(tree, target);

    let mut pass = RenderPass::new(surface_pass_id(target), output_rect, to_root);
    pass.damage_rect = damage_rect;
    pass.has_occlusion_from_outside_target_surface = tracker.has_occlusion_from_outside_target();

    // Front-to-back within the target; the layer list is back-to-front.
    for &member in layer_list.iter().rev() {
        let owns_surface = member != target && tree.layer(member).render_surface.is_some();
        if owns_surface {
            // The surface's occlusion contribution is merged only after
            // the quad referencing its pass has been emitted; merging it
            // first would cull that quad against the surface's own
            // contents.
            let contribution = process_target(tree, member, false, mode, resources, tracker, frame);
            append_surface_quads(tree, member, tracker, &mut pass);
            tracker.merge_surface_contribution(&contribution);
            continue;
        }
        process_layer(tree, member, mode, resources, tracker, &mut pass, frame);
    }

    if is_root {
        append_gutter_quads(tree, tracker, &mut pass);
    }
    let contribution = tracker.leave_target(tree, target);
    frame.push_pass(pass);
    contribution
}

fn process_layer(
    tree: &mut LayerTree,
    id: LayerId,
    mode: DrawMode,
    resources: Option<&dyn ResourceProvider>,
    tracker: &mut OcclusionTracker,
    pass: &mut RenderPass,
    frame: &mut FrameData,
) {
    {
        let props = &tree.layer(id).draw_properties;
        if tracker.occluded(
            &props.target_space_transform,
            &props.visible_content_rect,
            props.is_clipped,
            &props.clip_rect,
        ) {
            return;
        }
    }
    if !tree.layer_mut(id).will_draw(mode, resources) {
        return;
    }
    frame.will_draw_layers.push(id);

    if tree.layer(id).has_contributing_delegated_render_passes() {
        append_delegated_content(tree, id, tracker, pass, frame);
    } else {
        let occlusion = tracker.current_occlusion();
        let mut sink = QuadSink::new(pass, occlusion);
        let mut data = AppendQuadsData::default();
        let layer = tree.layer_mut(id);
        layer.append_quads(&mut sink, &mut data, mode);
        if data.num_missing_tiles > 0 {
            frame.missing_tile_count += data.num_missing_tiles;
            if layer.transform_is_animating || layer.opacity_is_animating {
                frame.checkerboard_on_animating_layer = true;
            }
        }
    }

    // DidDraw is deferred to the coordinator once the whole frame is
    // drawn (or abandoned); every id recorded in will_draw_layers is
    // still inside its draw phase when pass generation finishes.
    tracker.mark_occluded_behind_layer(tree, id);
}

/// Splices an embedded frame: every non-root delegated pass goes into
/// the frame's pass list (remapped into this layer's id namespace), and
/// the root delegated pass's quads are drawn directly into the current
/// target, re-homed through the layer's own transform and clip.
fn append_delegated_content(
    tree: &LayerTree,
    id: LayerId,
    tracker: &OcclusionTracker,
    pass: &mut RenderPass,
    frame: &mut FrameData,
) {
    let layer = tree.layer(id);
    let content = match layer.as_delegated() {
        Some(content) => content,
        None => return,
    };
    for contributed in content.contributing_passes(id) {
        frame.push_pass(contributed);
    }
    let root_pass = match content.remapped_root_pass(id) {
        Some(root_pass) => root_pass,
        None => return,
    };

    let frame_to_layer = content.frame_to_layer_transform(&layer.bounds);
    let props = &layer.draw_properties;
    let occlusion = tracker.current_occlusion();
    let mut sink = QuadSink::new(pass, occlusion);
    let mut installed_for = None;
    for quad in root_pass.quad_list {
        if installed_for != Some(quad.shared_quad_state) {
            let delegated = &root_pass.shared_quad_state_list[quad.shared_quad_state];
            let combined = delegated
                .content_to_target_transform
                .then(&frame_to_layer)
                .then(&props.target_space_transform);
            let clip_rect = if delegated.is_clipped && props.is_clipped {
                props
                    .clip_rect
                    .intersection(&delegated.clip_rect)
                    .unwrap_or_else(Rect::zero)
            } else if props.is_clipped {
                props.clip_rect
            } else {
                delegated.clip_rect
            };
            sink.use_shared_quad_state(SharedQuadState::new(
                combined,
                delegated.content_bounds,
                delegated.visible_content_rect,
                clip_rect,
                delegated.is_clipped || props.is_clipped,
                delegated.opacity * props.opacity,
            ));
            installed_for = Some(quad.shared_quad_state);
        }
        let mut quad = quad;
        quad.shared_quad_state = sink.current_shared_quad_state();
        sink.append(quad);
    }
}

/// Emits the quad (and replica quad) through which a contributing
/// surface's pass is composited into its parent target.
fn append_surface_quads(
    tree: &LayerTree,
    owner: LayerId,
    tracker: &OcclusionTracker,
    pass: &mut RenderPass,
) {
    let layer = tree.layer(owner);
    let surface = match layer.render_surface {
        Some(ref surface) => surface,
        None => return,
    };
    let content_rect = surface.content_rect;
    if content_rect.is_empty() {
        return;
    }

    // A mask is sampled across the surface's actual content rect, so its
    // texture coordinates are that rect normalized by the owner's
    // content bounds. The ratio survives a uniform content-scale change
    // applied to both the owner and the mask.
    let mask_for = |mask_layer: Option<LayerId>| {
        let mask = mask_layer.map(|mask_id| tree.layer(mask_id))?;
        let resource = mask.contents_resource_id()?;
        let bounds = layer.content_bounds;
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return None;
        }
        Some((
            resource,
            rect(
                content_rect.origin.x / bounds.width,
                content_rect.origin.y / bounds.height,
                content_rect.size.width / bounds.width,
                content_rect.size.height / bounds.height,
            ),
        ))
    };
    let own_mask = mask_for(surface.mask_layer);
    let replica_mask = layer
        .replica_layer
        .and_then(|replica| mask_for(tree.layer(replica).mask_layer));

    let occlusion = tracker.current_occlusion();
    let mut emit = |transform: Transform3D<f32>,
                    is_replica: bool,
                    mask: Option<(crate::internal_types::ResourceId, Rect<f32>)>| {
        let mut sink = QuadSink::new(pass, occlusion);
        let state = sink.use_shared_quad_state(SharedQuadState::new(
            transform,
            content_rect.size,
            content_rect,
            surface.clip_rect,
            surface.is_clipped,
            surface.draw_opacity,
        ));
        let (mask_resource_id, mask_uv_rect) = match mask {
            Some((resource, uv)) => (Some(resource), uv),
            None => (None, Rect::zero()),
        };
        sink.append(DrawQuad {
            shared_quad_state: state,
            rect: content_rect,
            opaque_rect: Rect::zero(),
            visible_rect: content_rect,
            material: Material::RenderPass {
                render_pass_id: surface_pass_id(owner),
                is_replica,
                mask_resource_id,
                mask_uv_rect,
                contents_changed_since_last_frame: surface.damage_rect,
                filters: surface.filters.clone(),
                background_filters: surface.background_filters.clone(),
            },
        });
    };
    emit(surface.draw_transform, false, own_mask);
    if let Some(replica_transform) = surface.replica_draw_transform {
        emit(replica_transform, true, replica_mask);
    }
}

/// Fills the part of the viewport no opaque content reached with
/// background-colored quads, so the screen never shows stale pixels
/// around a small root layer.
fn append_gutter_quads(tree: &LayerTree, tracker: &OcclusionTracker, pass: &mut RenderPass) {
    if tree.has_transparent_background {
        return;
    }
    let viewport = Rect::new(Point2D::origin(), tree.device_viewport_size);
    let gutter: Vec<Rect<f32>> = match tracker.current_occlusion() {
        Some(occlusion) => occlusion.parts_not_covered(&viewport),
        None => vec![viewport],
    };
    if gutter.is_empty() {
        return;
    }
    let mut sink = QuadSink::new(pass, None);
    let state = sink.use_shared_quad_state(SharedQuadState::new(
        Transform3D::identity(),
        viewport.size,
        viewport,
        viewport,
        false,
        1.0,
    ));
    for piece in &gutter {
        sink.append(DrawQuad {
            shared_quad_state: state,
            rect: *piece,
            opaque_rect: *piece,
            visible_rect: *piece,
            material: Material::SolidColor {
                color: tree.background_color,
            },
        });
    }
}
