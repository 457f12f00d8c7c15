/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The per-frame draw-properties pass: a single top-down-then-bottom-up
//! traversal that computes, for every layer in paint order, its target
//! and screen transforms, accumulated opacity, clip, drawable and
//! visible rects, and render-target assignment.
//!
//! The pass never fails. Degenerate (non-invertible) transforms degrade
//! to an empty visible rect for the affected layer.

use euclid::default::{Point2D, Rect, Transform3D, Vector3D};
use euclid::vec3;

use crate::internal_types::{FilterOp, LayerId};
use crate::tree::LayerTree;
use crate::util::MatrixHelpers;

/// Offscreen target owned by a layer that isolates part of the tree
/// (masks, replicas, filters, group opacity). Lives in the owning
/// layer's content space.
#[derive(Debug, Clone)]
pub struct RenderSurface {
    /// Union of everything drawn into this surface, in the owner's
    /// content space. May exceed the owner's bounds when unclipped
    /// children hang outside.
    pub content_rect: Rect<f32>,
    /// Surface content space -> parent target space.
    pub draw_transform: Transform3D<f32>,
    pub screen_space_transform: Transform3D<f32>,
    pub replica_draw_transform: Option<Transform3D<f32>>,
    pub draw_opacity: f32,
    pub is_clipped: bool,
    pub clip_rect: Rect<f32>,
    /// Drawing layers assigned to this target, back-to-front. A layer id
    /// appearing here that owns its own surface is a contributing
    /// surface, not content.
    pub layer_list: Vec<LayerId>,
    pub nearest_ancestor_target: Option<LayerId>,
    pub mask_layer: Option<LayerId>,
    pub filters: Vec<FilterOp>,
    pub background_filters: Vec<FilterOp>,
    /// Sub-region of content_rect that changed since the last frame.
    pub damage_rect: Rect<f32>,
}

impl RenderSurface {
    pub fn new() -> RenderSurface {
        RenderSurface {
            content_rect: Rect::zero(),
            draw_transform: Transform3D::identity(),
            screen_space_transform: Transform3D::identity(),
            replica_draw_transform: None,
            draw_opacity: 1.0,
            is_clipped: false,
            clip_rect: Rect::zero(),
            layer_list: Vec::new(),
            nearest_ancestor_target: None,
            mask_layer: None,
            filters: Vec::new(),
            background_filters: Vec::new(),
            damage_rect: Rect::zero(),
        }
    }
}

#[derive(Clone)]
struct DataForRecursion {
    /// Layer space of the current layer -> target content space.
    parent_matrix: Transform3D<f32>,
    /// Layer space of the current layer -> screen space.
    parent_screen_matrix: Transform3D<f32>,
    /// Opacity accumulated since the nearest ancestor surface.
    parent_opacity: f32,
    render_target: LayerId,
    /// Accumulated clip in target space; None means unclipped.
    clip_in_target: Option<Rect<f32>>,
}

/// Entry point. Fills `render_surface_layer_list` with surface-owning
/// layers in pre-order (root first) and leaves per-layer draw properties
/// behind on every layer.
pub fn calculate_draw_properties(
    tree: &mut LayerTree,
    render_surface_layer_list: &mut Vec<LayerId>,
) {
    render_surface_layer_list.clear();
    let root = match tree.root_layer() {
        Some(root) => root,
        None => return,
    };

    let ideal_contents_scale = tree.device_scale_factor * tree.total_page_scale_factor();
    count_drawing_descendants(tree, root);

    // Device and page scale enter the transform hierarchy at the root.
    let root_scale = ideal_contents_scale;
    let data = DataForRecursion {
        parent_matrix: Transform3D::scale(root_scale, root_scale, 1.0),
        parent_screen_matrix: Transform3D::scale(root_scale, root_scale, 1.0),
        parent_opacity: 1.0,
        render_target: root,
        clip_in_target: None,
    };

    calculate_recursive(tree, root, ideal_contents_scale, true, &data, render_surface_layer_list);

    // The root target always renders exactly the viewport.
    let viewport = Rect::new(Point2D::origin(), tree.device_viewport_size);
    let root_layer = tree.layer_mut(root);
    if let Some(ref mut surface) = root_layer.render_surface {
        surface.content_rect = viewport;
        surface.draw_transform = Transform3D::identity();
    }
}

fn count_drawing_descendants(tree: &mut LayerTree, id: LayerId) -> usize {
    let children = tree.layer(id).children.clone();
    let mut count = 0;
    for child in children {
        let below = count_drawing_descendants(tree, child);
        let child_draws = tree.layer(child).draws_content;
        count += below + if child_draws { 1 } else { 0 };
    }
    tree.layer_mut(id).draw_properties.num_drawing_descendants = count;
    count
}

fn anchor_offset(tree: &LayerTree, id: LayerId) -> Vector3D<f32> {
    let layer = tree.layer(id);
    vec3(
        layer.anchor_point.x * layer.bounds.width,
        layer.anchor_point.y * layer.bounds.height,
        0.0,
    )
}

fn layer_needs_render_surface(tree: &LayerTree, id: LayerId, is_root: bool) -> bool {
    if is_root {
        return true;
    }
    let layer = tree.layer(id);
    layer.replica_layer.is_some()
        || layer.mask_layer.is_some()
        || !layer.filters.is_empty()
        || !layer.background_filters.is_empty()
        || layer.force_render_surface
        || !layer.clip_children.is_empty()
        || (layer.opacity < 1.0 && layer.draw_properties.num_drawing_descendants > 0)
}

fn calculate_recursive(
    tree: &mut LayerTree,
    id: LayerId,
    ideal_contents_scale: f32,
    is_root: bool,
    data: &DataForRecursion,
    render_surface_layer_list: &mut Vec<LayerId>,
) {
    let (csx, csy) = {
        let layer = tree.layer(id);
        layer.calculate_contents_scale(ideal_contents_scale)
    };
    tree.layer_mut(id).set_contents_scale(csx, csy);

    let anchor = anchor_offset(tree, id);
    let (local, bounds, content_bounds, opacity, preserves_3d, masks_to_bounds, double_sided) = {
        let layer = tree.layer(id);
        let scroll = layer.total_scroll_offset();
        let offset: Vector3D<f32> = vec3(
            layer.position.x - scroll.x + anchor.x,
            layer.position.y - scroll.y + anchor.y,
            0.0,
        );
        let local = Transform3D::translation(-anchor.x, -anchor.y, -anchor.z)
            .then(&layer.transform)
            .then(&Transform3D::translation(offset.x, offset.y, offset.z));
        (
            local,
            layer.bounds,
            layer.content_bounds,
            layer.opacity,
            layer.preserves_3d,
            layer.masks_to_bounds,
            layer.double_sided,
        )
    };

    // Layer space -> target / screen.
    let combined = local.then(&data.parent_matrix);
    let screen_combined = local.then(&data.parent_screen_matrix);

    let content_to_layer = Transform3D::scale(
        if csx > 0.0 { 1.0 / csx } else { 0.0 },
        if csy > 0.0 { 1.0 / csy } else { 0.0 },
        1.0,
    );
    let draw_from_content = content_to_layer.then(&combined);
    let screen_from_content = content_to_layer.then(&screen_combined);

    let accumulated_opacity = opacity * data.parent_opacity;
    let needs_surface = layer_needs_render_surface(tree, id, is_root);
    let content_rect = Rect::new(Point2D::origin(), content_bounds);

    // A one-sided layer facing away contributes nothing this frame.
    let back_face_hidden = !double_sided && screen_from_content.is_back_face_visible();

    let (child_data, owner_target_transform, owner_is_clipped, owner_clip) = if needs_surface {
        // Contributing-surface registration in the parent target.
        if !is_root {
            let parent_target = data.render_target;
            tree.layer_mut(parent_target)
                .render_surface
                .as_mut()
                .expect("render target without a surface")
                .layer_list
                .push(id);
        }
        render_surface_layer_list.push(id);

        let replica_draw_transform = replica_transform(tree, id, &content_to_layer, &combined);
        {
            let clip = data.clip_in_target;
            let ancestor_target = if is_root { None } else { Some(data.render_target) };
            let (filters, background_filters, mask_layer) = {
                let layer = tree.layer(id);
                (layer.filters.clone(), layer.background_filters.clone(), layer.mask_layer)
            };
            let layer = tree.layer_mut(id);
            let surface = layer.create_render_surface();
            surface.draw_transform = draw_from_content;
            surface.screen_space_transform = screen_from_content;
            surface.replica_draw_transform = replica_draw_transform;
            surface.draw_opacity = accumulated_opacity;
            surface.is_clipped = clip.is_some();
            surface.clip_rect = clip.unwrap_or_else(Rect::zero);
            surface.nearest_ancestor_target = ancestor_target;
            surface.mask_layer = mask_layer;
            surface.filters = filters;
            surface.background_filters = background_filters;
            surface.layer_list.clear();
            surface.content_rect = Rect::zero();
            surface.damage_rect = Rect::zero();
        }

        let child_clip = if masks_to_bounds { Some(content_rect) } else { None };
        (
            DataForRecursion {
                parent_matrix: Transform3D::scale(csx, csy, 1.0),
                parent_screen_matrix: screen_combined,
                parent_opacity: 1.0,
                render_target: id,
                clip_in_target: child_clip,
            },
            // The owner's own quads land in its own surface, whose
            // content space is the owner's content space.
            Transform3D::identity(),
            masks_to_bounds,
            if masks_to_bounds { Some(content_rect) } else { None },
        )
    } else {
        tree.layer_mut(id).clear_render_surface();
        let mut child_clip = data.clip_in_target;
        if masks_to_bounds {
            let own_rect_in_target = draw_from_content
                .transform_rect(&content_rect)
                .unwrap_or_else(Rect::zero);
            child_clip = Some(match child_clip {
                Some(clip) => clip
                    .intersection(&own_rect_in_target)
                    .unwrap_or_else(Rect::zero),
                None => own_rect_in_target,
            });
        }
        (
            DataForRecursion {
                parent_matrix: combined,
                parent_screen_matrix: screen_combined,
                parent_opacity: accumulated_opacity,
                render_target: data.render_target,
                clip_in_target: child_clip,
            },
            draw_from_content,
            data.clip_in_target.is_some(),
            data.clip_in_target,
        )
    };

    // Register the layer's own content in its target's draw order,
    // behind its children.
    let draws_content = tree.layer(id).draws_content && !back_face_hidden;
    if draws_content {
        let target = if needs_surface { id } else { data.render_target };
        tree.layer_mut(target)
            .render_surface
            .as_mut()
            .expect("render target without a surface")
            .layer_list
            .push(id);
    }

    // Sublayer transform applies about the anchor, between this layer
    // and its children; non-3d-preserving layers flatten it.
    let (children, sublayer) = {
        let layer = tree.layer(id);
        (layer.children.clone(), layer.sublayer_transform)
    };
    let mut child_data = child_data;
    if sublayer != Transform3D::identity() {
        let about_anchor = Transform3D::translation(-anchor.x, -anchor.y, 0.0)
            .then(&sublayer)
            .then(&Transform3D::translation(anchor.x, anchor.y, 0.0));
        child_data.parent_matrix = about_anchor.then(&child_data.parent_matrix);
        child_data.parent_screen_matrix = about_anchor.then(&child_data.parent_screen_matrix);
    }
    if !preserves_3d {
        child_data.parent_matrix = child_data.parent_matrix.flattened();
        child_data.parent_screen_matrix = child_data.parent_screen_matrix.flattened();
    }

    for child in children {
        calculate_recursive(
            tree,
            child,
            ideal_contents_scale,
            false,
            &child_data,
            render_surface_layer_list,
        );
    }

    // Bottom-up phase: visible/drawable rects, then surface finalize.
    let (drawable, visible) = if back_face_hidden {
        (Rect::zero(), Rect::zero())
    } else {
        compute_drawable_and_visible(
            &owner_target_transform,
            &content_rect,
            owner_is_clipped,
            &owner_clip,
        )
    };
    {
        let layer = tree.layer_mut(id);
        layer.draw_properties.target_space_transform = owner_target_transform;
        layer.draw_properties.screen_space_transform = screen_from_content;
        layer.draw_properties.opacity = if needs_surface { 1.0 } else { accumulated_opacity };
        layer.draw_properties.is_clipped = owner_is_clipped;
        layer.draw_properties.clip_rect = owner_clip.unwrap_or_else(Rect::zero);
        layer.draw_properties.render_target = Some(if needs_surface { id } else { data.render_target });
        layer.draw_properties.drawable_content_rect = drawable;
        layer.draw_properties.visible_content_rect = visible;
    }

    if needs_surface {
        finalize_surface(tree, id, masks_to_bounds, &content_rect, &draw_from_content);
    }
}

fn replica_transform(
    tree: &LayerTree,
    id: LayerId,
    content_to_layer: &Transform3D<f32>,
    combined: &Transform3D<f32>,
) -> Option<Transform3D<f32>> {
    let layer = tree.layer(id);
    let replica_id = layer.replica_layer?;
    let replica = tree.layer(replica_id);
    let anchor: Vector3D<f32> = vec3(
        replica.anchor_point.x * layer.bounds.width,
        replica.anchor_point.y * layer.bounds.height,
        0.0,
    );
    let local = Transform3D::translation(-anchor.x, -anchor.y, 0.0)
        .then(&replica.transform)
        .then(&Transform3D::translation(
            replica.position.x + anchor.x,
            replica.position.y + anchor.y,
            0.0,
        ));
    Some(content_to_layer.then(&local).then(combined))
}

fn compute_drawable_and_visible(
    target_transform: &Transform3D<f32>,
    content_rect: &Rect<f32>,
    is_clipped: bool,
    clip: &Option<Rect<f32>>,
) -> (Rect<f32>, Rect<f32>) {
    let mapped = match target_transform.transform_rect(content_rect) {
        Some(rect) => rect,
        None => return (Rect::zero(), Rect::zero()),
    };
    if !is_clipped {
        return (mapped, *content_rect);
    }
    let clip = clip.unwrap_or_else(Rect::zero);
    let drawable = match mapped.intersection(&clip) {
        Some(rect) => rect,
        None => return (Rect::zero(), Rect::zero()),
    };
    let inverse = match target_transform.inverse() {
        Some(inverse) => inverse,
        None => return (drawable, Rect::zero()),
    };
    let visible = inverse
        .transform_rect(&drawable)
        .and_then(|r| r.intersection(content_rect))
        .unwrap_or_else(Rect::zero);
    (drawable, visible)
}

fn finalize_surface(
    tree: &mut LayerTree,
    id: LayerId,
    masks_to_bounds: bool,
    owner_content_rect: &Rect<f32>,
    draw_from_content: &Transform3D<f32>,
) {
    let layer_list = tree
        .layer(id)
        .render_surface
        .as_ref()
        .expect("finalizing a layer without a surface")
        .layer_list
        .clone();

    let mut content_rect = Rect::zero();
    let mut damage = Rect::zero();
    let mut any_content = false;
    for &member in &layer_list {
        let layer = tree.layer(member);
        // For contributing surfaces this is the surface's (plus
        // replica's) footprint, set when the member was finalized.
        let drawable = layer.draw_properties.drawable_content_rect;
        if drawable.is_empty() {
            continue;
        }
        content_rect = if any_content { content_rect.union(&drawable) } else { drawable };
        any_content = true;
        if layer.layer_property_changed() {
            damage = if damage.is_empty() { drawable } else { damage.union(&drawable) };
        } else if !layer.update_rect.is_empty() {
            if let Some(update) = layer
                .draw_properties
                .target_space_transform
                .transform_rect(&layer.update_rect)
            {
                damage = if damage.is_empty() { update } else { damage.union(&update) };
            }
        }
    }
    if masks_to_bounds {
        content_rect = content_rect
            .intersection(owner_content_rect)
            .unwrap_or_else(Rect::zero);
    }

    // The owner's contribution to its parent target is the surface's
    // (and replica's) transformed footprint.
    let (drawable_in_parent, surface_clipped, surface_clip) = {
        let layer = tree.layer(id);
        let surface = layer.render_surface.as_ref().unwrap();
        let mut rect = draw_from_content
            .transform_rect(&content_rect)
            .unwrap_or_else(Rect::zero);
        if let Some(ref replica_transform) = surface.replica_draw_transform {
            if let Some(replica_rect) = replica_transform.transform_rect(&content_rect) {
                rect = if rect.is_empty() { replica_rect } else { rect.union(&replica_rect) };
            }
        }
        (rect, surface.is_clipped, surface.clip_rect)
    };
    let mut drawable_in_parent = drawable_in_parent;
    if surface_clipped {
        drawable_in_parent = drawable_in_parent
            .intersection(&surface_clip)
            .unwrap_or_else(Rect::zero);
    }

    let layer = tree.layer_mut(id);
    let stacking_changed = layer
        .change_flags
        .contains(crate::layer::ChangeFlags::STACKING_ORDER_CHANGED);
    layer.draw_properties.drawable_content_rect = drawable_in_parent;
    let surface = layer.render_surface.as_mut().unwrap();
    surface.content_rect = content_rect;
    surface.damage_rect = if stacking_changed { content_rect } else { damage };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal_types::ColorF;
    use crate::layer::{Layer, LayerKind};
    use euclid::{point2, rect, size2, vec2, Angle};

    fn solid(id: i32, w: f32, h: f32) -> Layer {
        let mut layer = Layer::new(LayerId(id), LayerKind::SolidColor { color: ColorF::white() });
        layer.anchor_point = point2(0.0, 0.0);
        layer.set_bounds(size2(w, h));
        layer
    }

    fn container(id: i32, w: f32, h: f32) -> Layer {
        let mut layer = Layer::new(LayerId(id), LayerKind::Container);
        layer.anchor_point = point2(0.0, 0.0);
        layer.set_bounds(size2(w, h));
        layer
    }

    fn prepared_tree() -> (LayerTree, Vec<LayerId>) {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        tree.add_child(root, solid(2, 100.0, 100.0));
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);
        (tree, rsll)
    }

    #[test]
    fn root_gets_a_surface_covering_the_viewport() {
        let (tree, rsll) = prepared_tree();
        assert_eq!(rsll, vec![LayerId(1)]);
        let surface = tree.layer(LayerId(1)).render_surface.as_ref().unwrap();
        assert_eq!(surface.content_rect, rect(0.0, 0.0, 100.0, 100.0));
        assert_eq!(surface.layer_list, vec![LayerId(2)]);
    }

    #[test]
    fn child_position_translates_target_transform() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut child = solid(2, 10.0, 10.0);
        child.position = point2(20.0, 30.0);
        tree.add_child(root, child);
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);

        let props = &tree.layer(LayerId(2)).draw_properties;
        assert_eq!(props.drawable_content_rect, rect(20.0, 30.0, 10.0, 10.0));
        assert_eq!(props.visible_content_rect, rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(props.render_target, Some(LayerId(1)));
    }

    #[test]
    fn masks_to_bounds_clips_children() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut clipper = container(2, 40.0, 40.0);
        clipper.masks_to_bounds = true;
        let clipper = tree.add_child(root, clipper);
        let mut child = solid(3, 100.0, 100.0);
        child.position = point2(30.0, 0.0);
        tree.add_child(clipper, child);
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);

        let props = &tree.layer(LayerId(3)).draw_properties;
        assert!(props.is_clipped);
        assert_eq!(props.drawable_content_rect, rect(30.0, 0.0, 10.0, 40.0));
        assert_eq!(props.visible_content_rect, rect(0.0, 0.0, 10.0, 40.0));
    }

    #[test]
    fn group_opacity_forces_a_surface() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut group = container(2, 100.0, 100.0);
        group.opacity = 0.5;
        let group = tree.add_child(root, group);
        tree.add_child(group, solid(3, 50.0, 50.0));
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);

        assert_eq!(rsll, vec![LayerId(1), LayerId(2)]);
        let surface = tree.layer(LayerId(2)).render_surface.as_ref().unwrap();
        assert_eq!(surface.draw_opacity, 0.5);
        // The descendant draws at full opacity into the surface.
        assert_eq!(tree.layer(LayerId(3)).draw_properties.opacity, 1.0);
        assert_eq!(
            tree.layer(LayerId(3)).draw_properties.render_target,
            Some(LayerId(2))
        );
    }

    #[test]
    fn opacity_without_drawing_descendants_needs_no_surface() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut leaf = solid(2, 10.0, 10.0);
        leaf.opacity = 0.5;
        tree.add_child(root, leaf);
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);
        assert_eq!(rsll.len(), 1);
        assert_eq!(tree.layer(LayerId(2)).draw_properties.opacity, 0.5);
    }

    #[test]
    fn degenerate_transform_yields_empty_visible_rect() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut clipper = container(2, 50.0, 50.0);
        clipper.masks_to_bounds = true;
        let clipper = tree.add_child(root, clipper);
        let mut squashed = solid(3, 10.0, 10.0);
        squashed.transform = Transform3D::scale(0.0, 1.0, 1.0);
        tree.add_child(clipper, squashed);
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);
        assert!(tree
            .layer(LayerId(3))
            .draw_properties
            .visible_content_rect
            .is_empty());
    }

    #[test]
    fn back_facing_single_sided_layer_is_hidden() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut flipped = solid(2, 10.0, 10.0);
        flipped.double_sided = false;
        flipped.transform = Transform3D::rotation(0.0, 1.0, 0.0, Angle::degrees(180.0));
        tree.add_child(root, flipped);
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);
        assert!(tree
            .layer(LayerId(2))
            .draw_properties
            .visible_content_rect
            .is_empty());
        let surface = tree.layer(LayerId(1)).render_surface.as_ref().unwrap();
        assert!(surface.layer_list.is_empty());
    }

    #[test]
    fn scroll_offset_shifts_content() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut scroller = solid(2, 200.0, 200.0);
        scroller.scrollable = true;
        scroller.max_scroll_offset = vec2(100.0, 100.0);
        let scroller = tree.add_child(root, scroller);
        tree.layer_mut(scroller).set_scroll_offset(vec2(25.0, 0.0));
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);
        assert_eq!(
            tree.layer(scroller).draw_properties.drawable_content_rect,
            rect(-25.0, 0.0, 200.0, 200.0)
        );
    }

    #[test]
    fn device_scale_factor_scales_drawable_rects() {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(200.0, 200.0);
        tree.device_scale_factor = 2.0;
        let root = tree.set_root_layer(container(1, 100.0, 100.0));
        let mut child = solid(2, 10.0, 10.0);
        child.position = point2(5.0, 5.0);
        tree.add_child(root, child);
        let mut rsll = Vec::new();
        calculate_draw_properties(&mut tree, &mut rsll);

        let layer = tree.layer(LayerId(2));
        // Content is rasterized at 2x, and positioned at 2x in the target.
        assert_eq!(layer.content_bounds, size2(20.0, 20.0));
        assert_eq!(
            layer.draw_properties.drawable_content_rect,
            rect(10.0, 10.0, 20.0, 20.0)
        );
    }
}
