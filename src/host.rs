/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The impl-side coordinator. Owns the active (and, between commit and
//! activation, pending) layer trees, handles scroll and pinch input
//! synchronously, drives the per-frame pipeline
//! (PrepareToDraw/DrawLayers/DidDrawAllLayers/SwapBuffers) and exports
//! accumulated deltas back to the main thread.

use euclid::default::{Point2D, Rect, Size2D, Vector2D};
use euclid::vec2;

use crate::commit::{CommitMessage, CommitReceiver, CommitSender, commit_channel};
use crate::draw_properties::calculate_draw_properties;
use crate::frame::{calculate_render_passes, FrameData};
use crate::internal_types::{
    CompositorFrameMetadata, DrawMode, LayerId, ManagedMemoryPolicy, RendererCapabilities,
    ResourceProvider, ScrollAndScaleSet,
};
use crate::optimizer::{remove_render_passes, RenderPassTextureCache};
use crate::tree::LayerTree;
use crate::util::MatrixHelpers;

/// Impl-thread callbacks back into the embedder's scheduler.
pub trait HostClient {
    /// Fired exactly once per actual transition of `can_draw`.
    fn on_can_draw_state_changed(&mut self, can_draw: bool);
    fn set_needs_redraw(&mut self);
    fn set_needs_commit(&mut self);
}

/// The GPU-facing half the coordinator drives. Pass-texture caching is
/// what the pass culler consults before a draw.
pub trait Renderer: RenderPassTextureCache {
    fn capabilities(&self) -> RendererCapabilities;
    fn draw_frame(&mut self, frame: &FrameData);
    fn swap_buffers(&mut self) -> bool;
}

impl RenderPassTextureCache for Box<dyn Renderer> {
    fn have_cached_resource_for_render_pass(
        &self,
        id: crate::internal_types::RenderPassId,
    ) -> bool {
        (**self).have_cached_resource_for_render_pass(id)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScrollStatus {
    ScrollStarted,
    ScrollOnMainThread,
    ScrollIgnored,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScrollType {
    Wheel,
    Gesture,
    /// Applies only to the layer the gesture started on; excess is
    /// recorded as overscroll, never bubbled.
    NonBubblingGesture,
}

struct ActiveScroll {
    layer: LayerId,
    scroll_type: ScrollType,
}

/// In-flight programmatic zoom. Progress is linear in time; the scroll
/// offset chases the target alongside the scale.
struct PageScaleAnimation {
    start_page_scale_delta: f32,
    target_page_scale_factor: f32,
    target_offset: Vector2D<f32>,
    use_anchor: bool,
    anchor: Vector2D<f32>,
    start_time: f64,
    duration: f64,
}

pub struct CompositorHost {
    active_tree: LayerTree,
    pending_tree: Option<LayerTree>,
    client: Box<dyn HostClient>,
    renderer: Option<Box<dyn Renderer>>,
    resources: Option<Box<dyn ResourceProvider>>,
    commit_rx: CommitReceiver,
    commit_tx: CommitSender,

    visible: bool,
    memory_policy: ManagedMemoryPolicy,

    scroll: Option<ActiveScroll>,
    accumulated_root_overscroll: Vector2D<f32>,

    pinch_gesture_active: bool,
    previous_pinch_anchor: Option<Point2D<f32>>,

    page_scale_animation: Option<PageScaleAnimation>,

    cached_can_draw: bool,
    render_surface_layer_list: Vec<LayerId>,
}

impl CompositorHost {
    pub fn new(client: Box<dyn HostClient>) -> CompositorHost {
        let (commit_tx, commit_rx) = commit_channel();
        CompositorHost {
            active_tree: LayerTree::new(),
            pending_tree: None,
            client,
            renderer: None,
            resources: None,
            commit_rx,
            commit_tx,
            visible: true,
            memory_policy: ManagedMemoryPolicy::new(usize::MAX),
            scroll: None,
            accumulated_root_overscroll: Vector2D::zero(),
            pinch_gesture_active: false,
            previous_pinch_anchor: None,
            page_scale_animation: None,
            cached_can_draw: false,
            render_surface_layer_list: Vec::new(),
        }
    }

    pub fn active_tree(&self) -> &LayerTree {
        &self.active_tree
    }

    pub fn active_tree_mut(&mut self) -> &mut LayerTree {
        &mut self.active_tree
    }

    /// Handle the main thread uses to push commits at this host.
    pub fn commit_sender(&self) -> CommitSender {
        self.commit_tx.clone()
    }

    // --- Embedder state -------------------------------------------------

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.client.set_needs_redraw();
        }
    }

    pub fn set_device_viewport_size(&mut self, size: Size2D<f32>) {
        if self.active_tree.device_viewport_size == size {
            return;
        }
        self.active_tree.device_viewport_size = size;
        self.active_tree.update_max_scroll_offset();
        self.evaluate_can_draw();
        self.client.set_needs_redraw();
    }

    pub fn set_device_scale_factor(&mut self, factor: f32) {
        if self.active_tree.device_scale_factor == factor {
            return;
        }
        self.active_tree.device_scale_factor = factor;
        self.active_tree.update_max_scroll_offset();
        self.client.set_needs_redraw();
    }

    pub fn initialize_renderer(&mut self, renderer: Box<dyn Renderer>) -> bool {
        self.renderer = Some(renderer);
        self.active_tree.set_contents_textures_purged(false);
        self.evaluate_can_draw();
        true
    }

    pub fn set_resource_provider(&mut self, resources: Option<Box<dyn ResourceProvider>>) {
        self.resources = resources;
    }

    /// A lost context invalidates every GPU-backed resource. Layers drop
    /// their resource ids and the main thread must recommit before the
    /// next successful renderer initialization can draw real content.
    pub fn did_lose_output_surface(&mut self) {
        self.renderer = None;
        let ids: Vec<LayerId> = self.active_tree.layer_ids().collect();
        for id in ids {
            self.active_tree.layer_mut(id).did_lose_output_surface();
        }
        self.active_tree.set_contents_textures_purged(true);
        self.client.set_needs_commit();
        self.evaluate_can_draw();
    }

    // --- CanDraw --------------------------------------------------------

    pub fn can_draw(&self) -> bool {
        if self.active_tree.root_layer().is_none() {
            return false;
        }
        if self.active_tree.device_viewport_size.is_empty() {
            return false;
        }
        let renderer = match self.renderer {
            Some(ref renderer) => renderer,
            None => return false,
        };
        if self.active_tree.contents_textures_purged()
            && !renderer.capabilities().allow_rasterize_on_demand
        {
            return false;
        }
        true
    }

    fn evaluate_can_draw(&mut self) {
        let can_draw = self.can_draw();
        if can_draw != self.cached_can_draw {
            self.cached_can_draw = can_draw;
            self.client.on_can_draw_state_changed(can_draw);
        }
    }

    // --- Commit / activation --------------------------------------------

    /// Drains the commit channel. Commits build a pending tree; aborted
    /// commits replay the deltas that were drained for them.
    pub fn process_commit_messages(&mut self) {
        while let Some(msg) = self.commit_rx.try_recv() {
            match msg {
                CommitMessage::Commit(snapshot) => {
                    self.pending_tree = Some(snapshot.build_tree());
                }
                CommitMessage::CommitAborted => {
                    self.active_tree.apply_sent_scroll_deltas_from_aborted_commit();
                }
            }
        }
    }

    pub fn has_pending_tree(&self) -> bool {
        self.pending_tree.is_some()
    }

    /// Atomic pending -> active swap. Scroll and page-scale deltas the
    /// main thread has not acknowledged yet carry over so input applied
    /// between commit and activation is not lost.
    pub fn activate_pending_tree(&mut self) {
        let mut pending = match self.pending_tree.take() {
            Some(pending) => pending,
            None => return,
        };
        // The snapshot was captured after the main thread folded in the
        // sent deltas; only the unsent remainder migrates.
        let ids: Vec<LayerId> = pending.layer_ids().collect();
        for id in ids {
            if let Some(old) = self.active_tree.try_layer(id) {
                let unsent = old.scroll_delta() - old.sent_scroll_delta();
                if unsent != Vector2D::zero() {
                    pending.layer_mut(id).set_scroll_delta(unsent);
                }
            }
        }
        let unsent_scale =
            self.active_tree.page_scale_delta() / self.active_tree.sent_page_scale_delta();
        pending.set_page_scale_delta(unsent_scale);
        pending.update_max_scroll_offset();

        if let Some(scrolling) = self.scroll.as_ref().map(|s| s.layer) {
            if !pending.contains(scrolling) {
                self.scroll = None;
            }
        }
        self.active_tree = pending;
        self.active_tree.update_scrollbars();
        self.evaluate_can_draw();
        self.client.set_needs_redraw();
    }

    // --- Frame pipeline -------------------------------------------------

    /// Builds the frame. Returns false when the frame must not be drawn:
    /// nothing to draw, or checkerboarding would tear a running
    /// animation. Resourceless software mode never refuses a frame; it
    /// skips the layer kinds it cannot express instead.
    pub fn prepare_to_draw(&mut self, frame: &mut FrameData, mode: DrawMode) -> bool {
        if !self.can_draw() {
            // Resourceless software exists to draw through states like
            // purged contents textures, but an empty tree or viewport
            // still has nothing to show.
            if mode != DrawMode::ResourcelessSoftware
                || self.active_tree.root_layer().is_none()
                || self.active_tree.device_viewport_size.is_empty()
            {
                return false;
            }
        }
        calculate_draw_properties(&mut self.active_tree, &mut self.render_surface_layer_list);
        calculate_render_passes(
            &mut self.active_tree,
            &self.render_surface_layer_list,
            mode,
            self.resources.as_deref(),
            frame,
        );
        if mode == DrawMode::Hardware && frame.checkerboard_on_animating_layer {
            self.rewind_draw(frame);
            return false;
        }
        if let Some(ref renderer) = self.renderer {
            remove_render_passes(renderer, frame);
        }
        true
    }

    pub fn draw_layers(&mut self, frame: &FrameData, _frame_time_ns: u64) {
        if let Some(ref mut renderer) = self.renderer {
            renderer.draw_frame(frame);
        }
    }

    /// Closes every WillDraw opened while building the frame.
    pub fn did_draw_all_layers(&mut self, frame: &FrameData) {
        for &id in &frame.will_draw_layers {
            self.active_tree
                .layer_mut(id)
                .did_draw(self.resources.as_deref_mut());
        }
    }

    /// Damage tracking is reset only here: a frame that never reached
    /// the screen keeps its damage for the retry.
    pub fn swap_buffers(&mut self, _frame: &FrameData) -> Option<CompositorFrameMetadata> {
        let renderer = self.renderer.as_mut()?;
        if !renderer.swap_buffers() {
            return None;
        }
        self.active_tree.reset_change_tracking();
        Some(self.make_compositor_frame_metadata())
    }

    pub fn make_compositor_frame_metadata(&self) -> CompositorFrameMetadata {
        let root_scroll_offset = self
            .active_tree
            .root_scroll_layer
            .and_then(|id| self.active_tree.try_layer(id))
            .map(|layer| layer.total_scroll_offset())
            .unwrap_or_else(Vector2D::zero);
        let root_layer_size = self
            .active_tree
            .root_layer()
            .map(|id| self.active_tree.layer(id).bounds)
            .unwrap_or_else(Size2D::zero);
        CompositorFrameMetadata {
            root_scroll_offset,
            page_scale_factor: self.active_tree.total_page_scale_factor(),
            min_page_scale_factor: self.active_tree.min_page_scale_factor,
            max_page_scale_factor: self.active_tree.max_page_scale_factor,
            viewport_size: self.active_tree.device_viewport_size,
            root_layer_size,
        }
    }

    // A refused frame still opened WillDraw on its layers; close them so
    // the next preparation starts from a balanced state.
    fn rewind_draw(&mut self, frame: &FrameData) {
        for &id in &frame.will_draw_layers {
            self.active_tree
                .layer_mut(id)
                .did_draw(self.resources.as_deref_mut());
        }
    }

    // --- Scrolling ------------------------------------------------------

    pub fn scroll_begin(&mut self, point: Point2D<f32>, scroll_type: ScrollType) -> ScrollStatus {
        self.scroll = None;

        let root = match self.active_tree.root_layer() {
            Some(root) => root,
            None => return ScrollStatus::ScrollIgnored,
        };
        calculate_draw_properties(&mut self.active_tree, &mut self.render_surface_layer_list);
        let mut draw_order = Vec::new();
        collect_front_to_back(&self.active_tree, root, &mut draw_order);

        for id in draw_order {
            let local = {
                let layer = self.active_tree.layer(id);
                let screen = &layer.draw_properties.screen_space_transform;
                if !layer.double_sided && screen.is_back_face_visible() {
                    continue;
                }
                let inverse = match screen.inverse() {
                    Some(inverse) => inverse,
                    None => continue,
                };
                let local = match inverse.unproject_point(&point) {
                    Some(local) => local,
                    None => continue,
                };
                let content_rect =
                    Rect::new(Point2D::origin(), self.active_tree.layer(id).content_bounds);
                if !content_rect.contains(local) {
                    continue;
                }
                local
            };

            // First layer under the point wins; resolve what it means
            // for scrolling.
            return self.start_scroll_from_hit(id, local, scroll_type);
        }
        ScrollStatus::ScrollIgnored
    }

    fn start_scroll_from_hit(
        &mut self,
        hit: LayerId,
        local_point: Point2D<f32>,
        scroll_type: ScrollType,
    ) -> ScrollStatus {
        // Walk from the hit layer up to the scrollable layer that will
        // take the gesture, checking main-thread blockers on the way.
        let mut cursor = Some(hit);
        let mut target = None;
        while let Some(id) = cursor {
            let layer = self.active_tree.layer(id);
            if layer.should_scroll_on_main_thread {
                return ScrollStatus::ScrollOnMainThread;
            }
            if scroll_type == ScrollType::Wheel && layer.have_wheel_event_handlers {
                return ScrollStatus::ScrollOnMainThread;
            }
            if id == hit && layer.non_fast_scrollable_region.contains_point(&local_point) {
                return ScrollStatus::ScrollOnMainThread;
            }
            if layer.scrollable {
                target = Some(id);
                break;
            }
            cursor = layer.scroll_parent.or(layer.parent);
        }
        let target = match target {
            Some(target) => target,
            None => return ScrollStatus::ScrollIgnored,
        };
        self.scroll = Some(ActiveScroll {
            layer: target,
            scroll_type,
        });
        self.accumulated_root_overscroll = Vector2D::zero();
        ScrollStatus::ScrollStarted
    }

    /// Continues an interrupted gesture as a fling on whatever layer was
    /// already scrolling; flings never re-hit-test.
    pub fn fling_scroll_begin(&mut self) -> ScrollStatus {
        match self.scroll {
            Some(_) => ScrollStatus::ScrollStarted,
            None => ScrollStatus::ScrollIgnored,
        }
    }

    /// Applies `viewport_delta` at `viewport_point` to the scrolling
    /// layer, bubbling leftovers to scroll ancestors unless the gesture
    /// forbids it. Returns whether any layer actually moved.
    pub fn scroll_by(
        &mut self,
        viewport_point: Point2D<f32>,
        viewport_delta: Vector2D<f32>,
    ) -> bool {
        let (start_layer, scroll_type) = match self.scroll {
            Some(ref scroll) => (scroll.layer, scroll.scroll_type),
            None => return false,
        };

        let mut remaining = viewport_delta;
        let mut did_scroll = false;
        let mut cursor = Some(start_layer);
        while let Some(id) = cursor {
            if self.active_tree.layer(id).scrollable {
                let applied = match scroll_type {
                    ScrollType::Wheel => self.scroll_layer_with_local_delta(id, remaining),
                    _ => self.scroll_layer_with_viewport_delta(id, viewport_point, remaining),
                };
                if applied.x.abs() > EPSILON || applied.y.abs() > EPSILON {
                    did_scroll = true;
                }
                remaining -= applied;
                if scroll_type == ScrollType::NonBubblingGesture {
                    break;
                }
                if remaining.x.abs() <= EPSILON && remaining.y.abs() <= EPSILON {
                    break;
                }
            }
            let layer = self.active_tree.layer(id);
            cursor = layer.scroll_parent.or(layer.parent);
        }

        let consumed = viewport_delta - remaining;
        if consumed.x.abs() > EPSILON {
            self.accumulated_root_overscroll.x = 0.0;
        }
        if consumed.y.abs() > EPSILON {
            self.accumulated_root_overscroll.y = 0.0;
        }
        self.accumulated_root_overscroll += remaining;

        if did_scroll {
            self.active_tree.update_scrollbars();
            self.client.set_needs_redraw();
        }
        did_scroll
    }

    pub fn scroll_end(&mut self) {
        self.scroll = None;
    }

    pub fn currently_scrolling_layer(&self) -> Option<LayerId> {
        self.scroll.as_ref().map(|scroll| scroll.layer)
    }

    pub fn accumulated_root_overscroll(&self) -> Vector2D<f32> {
        self.accumulated_root_overscroll
    }

    /// Wheel deltas arrive in windowed pixels; dividing out the device,
    /// page and layer scales yields layer-space units.
    fn scroll_layer_with_local_delta(
        &mut self,
        id: LayerId,
        viewport_delta: Vector2D<f32>,
    ) -> Vector2D<f32> {
        let scale = {
            let layer = self.active_tree.layer(id);
            let layer_scale = layer.transform.uniform_2d_scale().unwrap_or(1.0);
            self.active_tree.device_scale_factor
                * self.active_tree.total_page_scale_factor()
                * layer_scale
        };
        if scale <= 0.0 {
            return Vector2D::zero();
        }
        let local_delta = viewport_delta / scale;
        let unconsumed = self.active_tree.layer_mut(id).scroll_by(local_delta);
        (local_delta - unconsumed) * scale
    }

    /// Touch deltas are projected through the layer's screen transform
    /// so a rotated layer scrolls along its own axes; the applied part
    /// is mapped back to find how much of the viewport delta was spent.
    fn scroll_layer_with_viewport_delta(
        &mut self,
        id: LayerId,
        viewport_point: Point2D<f32>,
        viewport_delta: Vector2D<f32>,
    ) -> Vector2D<f32> {
        let (screen, csx, csy) = {
            let layer = self.active_tree.layer(id);
            (
                layer.draw_properties.screen_space_transform,
                layer.contents_scale_x,
                layer.contents_scale_y,
            )
        };
        let inverse = match screen.inverse() {
            Some(inverse) => inverse,
            None => return Vector2D::zero(),
        };
        let start = match inverse.unproject_point(&viewport_point) {
            Some(start) => start,
            None => return Vector2D::zero(),
        };
        let end = match inverse.unproject_point(&(viewport_point + viewport_delta)) {
            Some(end) => end,
            None => return Vector2D::zero(),
        };
        if csx <= 0.0 || csy <= 0.0 {
            return Vector2D::zero();
        }
        // Content space -> layer space for the clamp, back again for the
        // viewport-space bookkeeping.
        let local_delta = vec2((end.x - start.x) / csx, (end.y - start.y) / csy);
        let unconsumed = self.active_tree.layer_mut(id).scroll_by(local_delta);
        let applied = local_delta - unconsumed;
        let actual_end = Point2D::new(start.x + applied.x * csx, start.y + applied.y * csy);
        let screen_end = match screen.transform_point2d(actual_end) {
            Some(screen_end) => screen_end,
            None => return Vector2D::zero(),
        };
        screen_end - viewport_point
    }

    // --- Pinch zoom -----------------------------------------------------

    pub fn pinch_gesture_begin(&mut self) {
        self.pinch_gesture_active = true;
        self.previous_pinch_anchor = None;
    }

    /// Scales the page about `anchor` and pans by however much the
    /// anchor moved since the previous update. Without interleaved
    /// ScrollBy calls a pure zoom leaves the anchor visually fixed.
    pub fn pinch_gesture_update(&mut self, magnify: f32, anchor: Point2D<f32>) {
        if !self.pinch_gesture_active {
            return;
        }
        let root_scroll = match self.active_tree.root_scroll_layer {
            Some(root_scroll) => root_scroll,
            None => return,
        };

        let old_delta = self.active_tree.page_scale_delta();
        self.active_tree.set_page_scale_delta(old_delta * magnify);
        let new_delta = self.active_tree.page_scale_delta();

        let base = self.active_tree.page_scale_factor * self.active_tree.device_scale_factor;
        let mut scroll = Vector2D::zero();
        if old_delta > 0.0 && new_delta > 0.0 && base > 0.0 {
            scroll = vec2(
                anchor.x / old_delta - anchor.x / new_delta,
                anchor.y / old_delta - anchor.y / new_delta,
            ) / base;
        }
        if let Some(previous) = self.previous_pinch_anchor {
            let pan = previous - anchor;
            if base > 0.0 && new_delta > 0.0 {
                scroll += pan / (base * new_delta);
            }
        }
        self.previous_pinch_anchor = Some(anchor);

        self.active_tree.update_max_scroll_offset();
        self.active_tree.layer_mut(root_scroll).scroll_by(scroll);
        self.client.set_needs_redraw();
    }

    pub fn pinch_gesture_end(&mut self) {
        self.pinch_gesture_active = false;
        self.previous_pinch_anchor = None;
        self.client.set_needs_commit();
    }

    // --- Page scale animation -------------------------------------------

    pub fn start_page_scale_animation(
        &mut self,
        target_offset: Vector2D<f32>,
        use_anchor: bool,
        target_scale: f32,
        start_time: f64,
        duration: f64,
    ) {
        let anchor = target_offset;
        self.page_scale_animation = Some(PageScaleAnimation {
            start_page_scale_delta: self.active_tree.page_scale_delta(),
            target_page_scale_factor: target_scale,
            target_offset,
            use_anchor,
            anchor,
            start_time,
            duration,
        });
        self.client.set_needs_redraw();
    }

    /// Ticks time-driven state against the monotonic clock. Returns
    /// true while anything is still animating.
    pub fn animate(&mut self) -> bool {
        let now = time::precise_time_ns() as f64 * 1e-9;
        self.animate_page_scale(now)
    }

    /// Ticks the page-scale animation. Returns true while it is still
    /// running; on the tick that completes it, a commit is requested so
    /// the main thread learns the final scale.
    pub fn animate_page_scale(&mut self, time: f64) -> bool {
        let (scale_delta, scroll_target, done) = {
            let animation = match self.page_scale_animation {
                Some(ref animation) => animation,
                None => return false,
            };
            let progress = if animation.duration <= 0.0 {
                1.0
            } else {
                ((time - animation.start_time) / animation.duration).max(0.0).min(1.0) as f32
            };
            let target_delta =
                animation.target_page_scale_factor / self.active_tree.page_scale_factor;
            let scale_delta = animation.start_page_scale_delta
                + (target_delta - animation.start_page_scale_delta) * progress;
            let scroll_target = if animation.use_anchor {
                animation.anchor
            } else {
                animation.target_offset
            };
            (scale_delta, scroll_target, progress >= 1.0)
        };

        self.active_tree.set_page_scale_delta(scale_delta);
        self.active_tree.update_max_scroll_offset();
        if done {
            if let Some(root_scroll) = self.active_tree.root_scroll_layer {
                let layer = self.active_tree.layer_mut(root_scroll);
                let current = layer.total_scroll_offset();
                layer.scroll_by(scroll_target - current);
            }
            self.page_scale_animation = None;
            self.client.set_needs_commit();
        } else {
            self.client.set_needs_redraw();
        }
        !done
    }

    // --- Memory policy --------------------------------------------------

    /// Applies a new memory budget. When the stricter budget can no
    /// longer hold what is currently drawn, contents are purged and a
    /// commit is requested so the main thread can repaint within budget;
    /// a budget that changes nothing requests nothing.
    pub fn set_memory_policy(&mut self, policy: ManagedMemoryPolicy) {
        self.memory_policy = policy;
        self.enforce_memory_policy();
    }

    fn current_bytes_limit(&self) -> usize {
        if self.visible {
            self.memory_policy.bytes_limit_when_visible
        } else {
            self.memory_policy.bytes_limit_when_not_visible
        }
    }

    fn enforce_memory_policy(&mut self) {
        let needed = self.active_tree.contents_bytes();
        if needed > self.current_bytes_limit() && !self.active_tree.contents_textures_purged() {
            self.active_tree.set_contents_textures_purged(true);
            self.client.set_needs_commit();
            self.evaluate_can_draw();
        }
    }

    // --- Delta export ---------------------------------------------------

    /// Drains unsent scroll deltas and the page-scale delta for the main
    /// thread. Safe on an empty tree; a second call with no intervening
    /// input returns an empty set.
    pub fn process_scroll_deltas(&mut self) -> ScrollAndScaleSet {
        self.active_tree.process_scroll_deltas()
    }
}

const EPSILON: f32 = 1.0e-4;

/// Drawing layers of `target` and every nested surface, topmost first.
fn collect_front_to_back(tree: &LayerTree, target: LayerId, out: &mut Vec<LayerId>) {
    let surface = match tree.layer(target).render_surface {
        Some(ref surface) => surface,
        None => return,
    };
    let members = surface.layer_list.clone();
    for &member in members.iter().rev() {
        if member != target && tree.layer(member).render_surface.is_some() {
            collect_front_to_back(tree, member, out);
        } else {
            out.push(member);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal_types::{ColorF, FastHashSet, RenderPassId};
    use crate::layer::{Layer, LayerKind};
    use euclid::default::Transform3D;
    use euclid::{point2, size2};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct ClientLog {
        can_draw_transitions: Vec<bool>,
        needs_redraw: usize,
        needs_commit: usize,
    }

    struct TestClient {
        log: Rc<RefCell<ClientLog>>,
    }

    impl HostClient for TestClient {
        fn on_can_draw_state_changed(&mut self, can_draw: bool) {
            self.log.borrow_mut().can_draw_transitions.push(can_draw);
        }
        fn set_needs_redraw(&mut self) {
            self.log.borrow_mut().needs_redraw += 1;
        }
        fn set_needs_commit(&mut self) {
            self.log.borrow_mut().needs_commit += 1;
        }
    }

    struct TestRenderer {
        cached_passes: FastHashSet<RenderPassId>,
        frames_drawn: usize,
        swap_ok: Rc<Cell<bool>>,
    }

    impl TestRenderer {
        fn new() -> TestRenderer {
            TestRenderer {
                cached_passes: FastHashSet::default(),
                frames_drawn: 0,
                swap_ok: Rc::new(Cell::new(true)),
            }
        }
    }

    impl RenderPassTextureCache for TestRenderer {
        fn have_cached_resource_for_render_pass(&self, id: RenderPassId) -> bool {
            self.cached_passes.contains(&id)
        }
    }

    impl Renderer for TestRenderer {
        fn capabilities(&self) -> RendererCapabilities {
            RendererCapabilities::default()
        }
        fn draw_frame(&mut self, _frame: &FrameData) {
            self.frames_drawn += 1;
        }
        fn swap_buffers(&mut self) -> bool {
            self.swap_ok.get()
        }
    }

    fn make_host() -> (CompositorHost, Rc<RefCell<ClientLog>>) {
        let log = Rc::new(RefCell::new(ClientLog::default()));
        let host = CompositorHost::new(Box::new(TestClient { log: log.clone() }));
        (host, log)
    }

    fn container(id: i32, w: f32, h: f32) -> Layer {
        let mut layer = Layer::new(LayerId(id), LayerKind::Container);
        layer.anchor_point = point2(0.0, 0.0);
        layer.set_bounds(size2(w, h));
        layer
    }

    fn scroller(id: i32, w: f32, h: f32, max: f32) -> Layer {
        let mut layer = Layer::new(LayerId(id), LayerKind::SolidColor { color: ColorF::white() });
        layer.anchor_point = point2(0.0, 0.0);
        layer.set_bounds(size2(w, h));
        layer.scrollable = true;
        layer.max_scroll_offset = euclid::vec2(max, max);
        layer
    }

    fn setup_scrollable_host(
        viewport: f32,
        root_bounds: f32,
        content: f32,
        max: f32,
    ) -> (CompositorHost, Rc<RefCell<ClientLog>>, LayerId) {
        let (mut host, log) = make_host();
        host.initialize_renderer(Box::new(TestRenderer::new()));
        host.set_device_viewport_size(size2(viewport, viewport));
        let tree = host.active_tree_mut();
        let root = tree.set_root_layer(container(1, root_bounds, root_bounds));
        let scroll = tree.add_child(root, scroller(2, content, content, max));
        tree.update_root_scroll_layer();
        (host, log, scroll)
    }

    #[test]
    fn scroll_delta_round_trips_without_clamping() {
        let (mut host, _, scroll) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.active_tree_mut()
            .layer_mut(scroll)
            .set_scroll_offset(euclid::vec2(50.0, 50.0));

        assert_eq!(
            host.scroll_begin(point2(10.0, 10.0), ScrollType::Gesture),
            ScrollStatus::ScrollStarted
        );
        host.scroll_by(point2(10.0, 10.0), euclid::vec2(13.0, -7.0));
        host.scroll_by(point2(10.0, 10.0), euclid::vec2(-13.0, 7.0));
        host.scroll_end();

        assert_eq!(
            host.active_tree().layer(scroll).scroll_delta(),
            euclid::vec2(0.0, 0.0)
        );
    }

    // Root bounds (10,10): the scrollable child still takes the gesture
    // and reports exactly the applied delta.
    #[test]
    fn single_scroll_produces_one_exact_delta_entry() {
        let (mut host, _, scroll) = setup_scrollable_host(10.0, 10.0, 100.0, 100.0);
        host.active_tree_mut()
            .layer_mut(scroll)
            .set_scroll_offset(euclid::vec2(20.0, 30.0));

        assert_eq!(
            host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture),
            ScrollStatus::ScrollStarted
        );
        assert!(host.scroll_by(point2(5.0, 5.0), euclid::vec2(11.0, -15.0)));
        host.scroll_end();

        let set = host.process_scroll_deltas();
        assert_eq!(set.scrolls.len(), 1);
        assert_eq!(set.scrolls[0].layer_id, scroll);
        assert_eq!(set.scrolls[0].scroll_delta, euclid::vec2(11.0, -15.0));
        assert_eq!(set.page_scale_delta, 1.0);

        // Nothing new to report on a second drain.
        assert!(host.process_scroll_deltas().is_empty());
    }

    #[test]
    fn wheel_scroll_divides_out_page_scale() {
        let (mut host, _, scroll) = setup_scrollable_host(50.0, 50.0, 100.0, 75.0);
        host.active_tree_mut()
            .set_page_scale_factor_and_limits(2.0, 0.5, 4.0);
        host.active_tree_mut().update_max_scroll_offset();

        assert_eq!(
            host.scroll_begin(point2(1.0, 1.0), ScrollType::Wheel),
            ScrollStatus::ScrollStarted
        );
        host.scroll_by(point2(1.0, 1.0), euclid::vec2(10.0, 20.0));
        host.scroll_end();
        assert_eq!(
            host.active_tree().layer(scroll).scroll_delta(),
            euclid::vec2(5.0, 10.0)
        );
    }

    #[test]
    fn wheel_handlers_force_main_thread_scrolling() {
        let (mut host, _, scroll) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.active_tree_mut()
            .layer_mut(scroll)
            .have_wheel_event_handlers = true;

        assert_eq!(
            host.scroll_begin(point2(10.0, 10.0), ScrollType::Wheel),
            ScrollStatus::ScrollOnMainThread
        );
        // A touch gesture is unaffected by wheel handlers.
        assert_eq!(
            host.scroll_begin(point2(10.0, 10.0), ScrollType::Gesture),
            ScrollStatus::ScrollStarted
        );
    }

    #[test]
    fn scroll_on_empty_tree_is_ignored() {
        let (mut host, _) = make_host();
        assert_eq!(
            host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture),
            ScrollStatus::ScrollIgnored
        );
        assert!(!host.scroll_by(point2(5.0, 5.0), euclid::vec2(1.0, 1.0)));
    }

    #[test]
    fn non_bubbling_gesture_never_reaches_the_ancestor() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        // Nested scroller that can only move 10 units.
        let inner = {
            let tree = host.active_tree_mut();
            tree.layer_mut(LayerId(2)).set_scroll_offset(euclid::vec2(0.0, 0.0));
            tree.add_child(LayerId(2), scroller(3, 150.0, 150.0, 10.0))
        };

        assert_eq!(
            host.scroll_begin(point2(5.0, 5.0), ScrollType::NonBubblingGesture),
            ScrollStatus::ScrollStarted
        );
        assert_eq!(host.currently_scrolling_layer(), Some(inner));
        host.scroll_by(point2(5.0, 5.0), euclid::vec2(0.0, 30.0));
        host.scroll_end();

        assert_eq!(
            host.active_tree().layer(inner).scroll_delta(),
            euclid::vec2(0.0, 10.0)
        );
        // The outer scroller never saw the remainder.
        assert_eq!(
            host.active_tree().layer(LayerId(2)).scroll_delta(),
            euclid::vec2(0.0, 0.0)
        );
        assert_eq!(host.accumulated_root_overscroll(), euclid::vec2(0.0, 20.0));
    }

    #[test]
    fn overscroll_resets_per_axis_on_consumption() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        assert_eq!(
            host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture),
            ScrollStatus::ScrollStarted
        );
        // Scroll past the end on y: 100 consumed, 50 overscrolled.
        host.scroll_by(point2(5.0, 5.0), euclid::vec2(0.0, 150.0));
        assert_eq!(host.accumulated_root_overscroll(), euclid::vec2(0.0, 50.0));
        // Still pinned: the whole delta accumulates.
        host.scroll_by(point2(5.0, 5.0), euclid::vec2(0.0, 25.0));
        assert_eq!(host.accumulated_root_overscroll(), euclid::vec2(0.0, 75.0));
        // Scrolling back consumes on y, which resets that axis.
        host.scroll_by(point2(5.0, 5.0), euclid::vec2(0.0, -30.0));
        assert_eq!(host.accumulated_root_overscroll(), euclid::vec2(0.0, 0.0));
        host.scroll_end();
    }

    #[test]
    fn fling_continues_only_an_active_scroll() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        assert_eq!(host.fling_scroll_begin(), ScrollStatus::ScrollIgnored);
        host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture);
        assert_eq!(host.fling_scroll_begin(), ScrollStatus::ScrollStarted);
        host.scroll_end();
        assert_eq!(host.fling_scroll_begin(), ScrollStatus::ScrollIgnored);
    }

    #[test]
    fn pinch_round_trip_restores_page_scale_delta() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.active_tree_mut()
            .set_page_scale_factor_and_limits(1.0, 0.5, 4.0);

        host.pinch_gesture_begin();
        host.pinch_gesture_update(2.0, point2(50.0, 50.0));
        host.pinch_gesture_update(0.5, point2(50.0, 50.0));
        host.pinch_gesture_end();

        assert_eq!(host.active_tree().page_scale_delta(), 1.0);
    }

    // Viewport 50x50, content 100x100, pinch to 2x about (50,50):
    // max scroll becomes (100*2-50)/2 = (75,75).
    #[test]
    fn pinch_update_scales_and_grows_max_scroll() {
        let (mut host, _, scroll) = setup_scrollable_host(50.0, 50.0, 100.0, 50.0);
        host.active_tree_mut()
            .set_page_scale_factor_and_limits(1.0, 0.5, 4.0);

        assert_eq!(
            host.scroll_begin(point2(0.0, 0.0), ScrollType::Wheel),
            ScrollStatus::ScrollStarted
        );
        host.pinch_gesture_begin();
        host.pinch_gesture_update(2.0, point2(50.0, 50.0));
        host.pinch_gesture_end();
        host.scroll_end();

        assert_eq!(host.active_tree().page_scale_delta(), 2.0);
        assert_eq!(
            host.active_tree().layer(scroll).max_scroll_offset,
            euclid::vec2(75.0, 75.0)
        );
        // The anchor stayed fixed: zooming about (50,50) from scale 1 to
        // 2 scrolls by 50/1 - 50/2 = 25 on each axis.
        assert_eq!(
            host.active_tree().layer(scroll).scroll_delta(),
            euclid::vec2(25.0, 25.0)
        );
    }

    #[test]
    fn pure_pinch_without_anchor_movement_does_not_pan() {
        let (mut host, _, scroll) = setup_scrollable_host(50.0, 50.0, 100.0, 50.0);
        host.active_tree_mut()
            .set_page_scale_factor_and_limits(1.0, 0.5, 4.0);

        host.pinch_gesture_begin();
        host.pinch_gesture_update(1.0, point2(20.0, 20.0));
        host.pinch_gesture_update(1.0, point2(20.0, 20.0));
        host.pinch_gesture_end();
        assert_eq!(
            host.active_tree().layer(scroll).scroll_delta(),
            euclid::vec2(0.0, 0.0)
        );
    }

    #[test]
    fn page_scale_animation_reaches_target_and_requests_commit() {
        let (mut host, log, scroll) = setup_scrollable_host(50.0, 50.0, 100.0, 50.0);
        host.active_tree_mut()
            .set_page_scale_factor_and_limits(1.0, 0.5, 4.0);

        host.start_page_scale_animation(euclid::vec2(10.0, 10.0), false, 2.0, 0.0, 1.0);
        assert!(host.animate_page_scale(0.5));
        assert!(host.active_tree().page_scale_delta() > 1.0);

        let commits = log.borrow().needs_commit;
        assert!(!host.animate_page_scale(1.0));
        assert_eq!(host.active_tree().page_scale_delta(), 2.0);
        assert_eq!(log.borrow().needs_commit, commits + 1);
        assert_eq!(
            host.active_tree().layer(scroll).total_scroll_offset(),
            euclid::vec2(10.0, 10.0)
        );
    }

    #[test]
    fn can_draw_notifies_exactly_once_per_transition() {
        let (mut host, log) = make_host();
        host.active_tree_mut()
            .set_root_layer(container(1, 10.0, 10.0));
        host.initialize_renderer(Box::new(TestRenderer::new()));
        // Still false: the viewport is empty.
        assert!(log.borrow().can_draw_transitions.is_empty());

        host.set_device_viewport_size(size2(10.0, 10.0));
        assert_eq!(log.borrow().can_draw_transitions, vec![true]);
        // Re-applying the same viewport must not re-notify.
        host.set_device_viewport_size(size2(10.0, 10.0));
        assert_eq!(log.borrow().can_draw_transitions, vec![true]);

        host.did_lose_output_surface();
        assert_eq!(log.borrow().can_draw_transitions, vec![true, false]);
    }

    #[test]
    fn lost_output_surface_drops_layer_resources() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.did_lose_output_surface();
        assert!(host.active_tree().contents_textures_purged());
        assert!(!host.can_draw());
    }

    #[test]
    fn prepare_draw_swap_cycle_produces_metadata() {
        let (mut host, _, scroll) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.active_tree_mut()
            .layer_mut(scroll)
            .set_scroll_offset(euclid::vec2(30.0, 40.0));

        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::Hardware));
        assert!(!frame.render_passes.is_empty());
        host.draw_layers(&frame, 0);
        host.did_draw_all_layers(&frame);
        let metadata = host.swap_buffers(&frame).unwrap();
        assert_eq!(metadata.root_scroll_offset, euclid::vec2(30.0, 40.0));
        assert_eq!(metadata.viewport_size, size2(100.0, 100.0));

        // The draw contract is balanced; a second frame prepares cleanly.
        let mut second = FrameData::new();
        assert!(host.prepare_to_draw(&mut second, DrawMode::Hardware));
        host.did_draw_all_layers(&second);
    }

    #[test]
    fn stacking_order_change_forces_pass_regeneration() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 100.0, 0.0);
        let group = {
            let tree = host.active_tree_mut();
            let mut group = container(10, 100.0, 100.0);
            group.force_render_surface = true;
            let group = tree.add_child(LayerId(1), group);
            let mut child =
                Layer::new(LayerId(11), LayerKind::SolidColor { color: ColorF::white() });
            child.anchor_point = point2(0.0, 0.0);
            child.set_bounds(size2(100.0, 100.0));
            tree.add_child(group, child);
            group
        };
        let mut renderer = TestRenderer::new();
        renderer.cached_passes.insert(RenderPassId::new(group, 0));
        host.initialize_renderer(Box::new(renderer));
        host.active_tree_mut().reset_change_tracking();

        // Unchanged subtree with a cached texture: the group pass prunes.
        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::Hardware));
        host.did_draw_all_layers(&frame);
        host.swap_buffers(&frame);
        assert_eq!(frame.render_passes.len(), 1);

        // A stacking-order change damages the whole surface: both passes
        // must be emitted again.
        host.active_tree_mut()
            .layer_mut(group)
            .set_stacking_order_changed(true);
        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::Hardware));
        host.did_draw_all_layers(&frame);
        host.swap_buffers(&frame);
        assert_eq!(frame.render_passes.len(), 2);

        // An opacity-only change on the group leaves its contents alone:
        // the cached pass prunes again.
        host.active_tree_mut().layer_mut(group).opacity = 0.6;
        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::Hardware));
        host.did_draw_all_layers(&frame);
        host.swap_buffers(&frame);
        assert_eq!(frame.render_passes.len(), 1);
    }

    #[test]
    fn checkerboard_during_animation_refuses_the_frame() {
        use crate::layer::TiledData;

        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 100.0, 0.0);
        {
            let tree = host.active_tree_mut();
            let mut tiled =
                Layer::new(LayerId(5), LayerKind::Tiled(TiledData::new(size2(50.0, 50.0))));
            tiled.anchor_point = point2(0.0, 0.0);
            tiled.set_bounds(size2(100.0, 100.0));
            tiled.transform_is_animating = true;
            tree.add_child(LayerId(1), tiled);
        }

        let mut frame = FrameData::new();
        assert!(!host.prepare_to_draw(&mut frame, DrawMode::Hardware));
        // Software fallback always accepts the frame.
        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::ResourcelessSoftware));
        host.did_draw_all_layers(&frame);
    }

    #[test]
    fn resourceless_software_draws_with_purged_textures() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.active_tree_mut().set_contents_textures_purged(true);
        assert!(!host.can_draw());

        let mut frame = FrameData::new();
        assert!(!host.prepare_to_draw(&mut frame, DrawMode::Hardware));

        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::ResourcelessSoftware));
        assert!(!frame.render_passes.is_empty());
        host.did_draw_all_layers(&frame);
    }

    #[test]
    fn failed_swap_keeps_damage_for_the_next_frame() {
        let (mut host, _, _) = setup_scrollable_host(100.0, 100.0, 100.0, 0.0);
        let group = {
            let tree = host.active_tree_mut();
            let mut group = container(10, 100.0, 100.0);
            group.force_render_surface = true;
            let group = tree.add_child(LayerId(1), group);
            let mut child =
                Layer::new(LayerId(11), LayerKind::SolidColor { color: ColorF::white() });
            child.anchor_point = point2(0.0, 0.0);
            child.set_bounds(size2(100.0, 100.0));
            tree.add_child(group, child);
            group
        };
        let swap_ok = Rc::new(Cell::new(false));
        let mut renderer = TestRenderer::new();
        renderer.cached_passes.insert(RenderPassId::new(group, 0));
        renderer.swap_ok = swap_ok.clone();
        host.initialize_renderer(Box::new(renderer));
        host.active_tree_mut().reset_change_tracking();
        host.active_tree_mut()
            .layer_mut(group)
            .set_stacking_order_changed(true);

        let mut frame = FrameData::new();
        assert!(host.prepare_to_draw(&mut frame, DrawMode::Hardware));
        assert_eq!(frame.render_passes.len(), 2);
        host.did_draw_all_layers(&frame);
        assert!(host.swap_buffers(&frame).is_none());

        // The frame never reached the screen; its damage survives and
        // the cached pass still cannot prune.
        let mut retry = FrameData::new();
        assert!(host.prepare_to_draw(&mut retry, DrawMode::Hardware));
        assert_eq!(retry.render_passes.len(), 2);
        host.did_draw_all_layers(&retry);
        swap_ok.set(true);
        assert!(host.swap_buffers(&retry).is_some());

        let mut clean = FrameData::new();
        assert!(host.prepare_to_draw(&mut clean, DrawMode::Hardware));
        assert_eq!(clean.render_passes.len(), 1);
        host.did_draw_all_layers(&clean);
    }

    #[test]
    fn commit_activation_carries_unsent_scroll_deltas() {
        let (mut host, _, scroll) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture);
        host.scroll_by(point2(5.0, 5.0), euclid::vec2(12.0, 8.0));
        host.scroll_end();

        // The main thread commits its own tree, which has not heard of
        // the delta yet (it was never drained).
        let mut main_tree = LayerTree::new();
        main_tree.device_viewport_size = size2(100.0, 100.0);
        let root = main_tree.set_root_layer(container(1, 100.0, 100.0));
        main_tree.add_child(root, scroller(2, 200.0, 200.0, 100.0));
        let snapshot = crate::commit::TreeSnapshot::capture(&main_tree);

        let sender = host.commit_sender();
        sender.commit(snapshot);
        host.process_commit_messages();
        assert!(host.has_pending_tree());
        host.activate_pending_tree();

        // Input applied between commit and activation is not lost: the
        // unsent delta migrated onto the new tree.
        let layer = host.active_tree().layer(scroll);
        assert_eq!(layer.scroll_offset(), euclid::vec2(0.0, 0.0));
        assert_eq!(layer.scroll_delta(), euclid::vec2(12.0, 8.0));
        assert_eq!(layer.total_scroll_offset(), euclid::vec2(12.0, 8.0));
    }

    #[test]
    fn aborted_commit_replays_sent_deltas_once() {
        let (mut host, _, scroll) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture);
        host.scroll_by(point2(5.0, 5.0), euclid::vec2(12.0, 8.0));
        host.scroll_end();
        let sent = host.process_scroll_deltas();
        assert_eq!(sent.scrolls[0].scroll_delta, euclid::vec2(12.0, 8.0));

        host.commit_sender().abort_commit();
        host.process_commit_messages();

        let layer = host.active_tree().layer(scroll);
        assert_eq!(layer.scroll_offset(), euclid::vec2(12.0, 8.0));
        assert_eq!(layer.scroll_delta(), euclid::vec2(0.0, 0.0));
        assert!(host.process_scroll_deltas().is_empty());
    }

    #[test]
    fn stricter_memory_policy_purges_and_requests_commit() {
        use crate::internal_types::ResourceId;
        use crate::layer::{Tile, TiledData};

        let (mut host, log, _) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        {
            let tree = host.active_tree_mut();
            let mut data = TiledData::new(size2(50.0, 50.0));
            data.tiles.insert(
                (0, 0),
                Tile { resource_id: ResourceId(1), contents_opaque: true },
            );
            let mut tiled = Layer::new(LayerId(5), LayerKind::Tiled(data));
            tiled.anchor_point = point2(0.0, 0.0);
            tiled.set_bounds(size2(50.0, 50.0));
            tree.add_child(LayerId(1), tiled);
        }

        let commits_before = log.borrow().needs_commit;
        host.set_memory_policy(ManagedMemoryPolicy::new(1));
        assert!(host.active_tree().contents_textures_purged());
        assert_eq!(log.borrow().needs_commit, commits_before + 1);

        // Applying the same policy again changes nothing.
        host.set_memory_policy(ManagedMemoryPolicy::new(1));
        assert_eq!(log.borrow().needs_commit, commits_before + 1);
    }

    #[test]
    fn rotated_backfacing_layer_does_not_capture_scroll() {
        let (mut host, _, scroll) = setup_scrollable_host(100.0, 100.0, 200.0, 100.0);
        {
            let tree = host.active_tree_mut();
            let mut flipped =
                Layer::new(LayerId(7), LayerKind::SolidColor { color: ColorF::white() });
            flipped.anchor_point = point2(0.0, 0.0);
            flipped.set_bounds(size2(100.0, 100.0));
            flipped.double_sided = false;
            flipped.scrollable = true;
            flipped.transform =
                Transform3D::rotation(0.0, 1.0, 0.0, euclid::Angle::degrees(180.0));
            tree.add_child(LayerId(1), flipped);
        }
        // The backfacing layer is on top but skipped; the scrollable
        // layer behind it takes the gesture.
        assert_eq!(
            host.scroll_begin(point2(5.0, 5.0), ScrollType::Gesture),
            ScrollStatus::ScrollStarted
        );
        assert_eq!(host.currently_scrolling_layer(), Some(scroll));
    }
}
