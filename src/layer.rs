/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use euclid::default::{Point2D, Rect, Size2D, Transform3D, Vector2D};
use euclid::{point2, rect, size2, vec2};

use crate::delegated::DelegatedContent;
use crate::draw_properties::RenderSurface;
use crate::internal_types::{
    ColorF, DrawMode, FastHashMap, FilterOp, LayerId, Picture, ResourceId, ResourceProvider,
};
use crate::quad::{DrawQuad, Material, QuadSink, SharedQuadState};
use crate::util::Region;

bitflags::bitflags! {
    /// Change tracking feeding the damage model. Cleared after a
    /// successful swap.
    pub struct ChangeFlags: u8 {
        const LAYER_PROPERTY_CHANGED = 1 << 0;
        const STACKING_ORDER_CHANGED = 1 << 1;
    }
}

/// An injectable controller that owns the authoritative scroll offset
/// while attached (e.g. a platform overscroll controller).
pub trait ScrollOffsetDelegate {
    fn set_total_scroll_offset(&mut self, offset: Vector2D<f32>);
    fn total_scroll_offset(&self) -> Vector2D<f32>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScrollbarOrientation {
    Horizontal,
    Vertical,
}

/// Scrollbar paint state, refreshed from the bound scroll layer before
/// quads are appended.
#[derive(Debug, Clone)]
pub struct ScrollbarData {
    pub orientation: ScrollbarOrientation,
    pub scroll_layer_id: Option<LayerId>,
    pub track_resource_id: Option<ResourceId>,
    pub thumb_resource_id: Option<ResourceId>,
    pub current_pos: f32,
    pub maximum: f32,
    /// Visible length / total content length, in [0, 1].
    pub visible_ratio: f32,
    pub thumb_thickness: f32,
}

impl ScrollbarData {
    pub fn new(orientation: ScrollbarOrientation) -> ScrollbarData {
        ScrollbarData {
            orientation,
            scroll_layer_id: None,
            track_resource_id: None,
            thumb_resource_id: None,
            current_pos: 0.0,
            maximum: 0.0,
            visible_ratio: 1.0,
            thumb_thickness: 10.0,
        }
    }

    /// Thumb rect in the scrollbar's content space.
    pub fn thumb_rect(&self, content_bounds: &Size2D<f32>) -> Rect<f32> {
        let track_length = match self.orientation {
            ScrollbarOrientation::Horizontal => content_bounds.width,
            ScrollbarOrientation::Vertical => content_bounds.height,
        };
        let thumb_length = (track_length * self.visible_ratio).max(self.thumb_thickness);
        let travel = track_length - thumb_length;
        let fraction = if self.maximum > 0.0 {
            (self.current_pos / self.maximum).max(0.0).min(1.0)
        } else {
            0.0
        };
        let offset = travel * fraction;
        match self.orientation {
            ScrollbarOrientation::Horizontal => {
                rect(offset, 0.0, thumb_length, self.thumb_thickness)
            }
            ScrollbarOrientation::Vertical => {
                rect(0.0, offset, self.thumb_thickness, thumb_length)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub resource_id: ResourceId,
    pub contents_opaque: bool,
}

#[derive(Debug, Clone)]
pub struct TiledData {
    pub tile_size: Size2D<f32>,
    pub tiles: FastHashMap<(i32, i32), Tile>,
    pub picture: Option<Picture>,
}

impl TiledData {
    pub fn new(tile_size: Size2D<f32>) -> TiledData {
        assert!(tile_size.width > 0.0 && tile_size.height > 0.0);
        TiledData {
            tile_size,
            tiles: FastHashMap::default(),
            picture: None,
        }
    }
}

/// The closed set of layer kinds. Capability accessors on `Layer` return
/// harmless defaults for kinds that do not participate, so tree-walking
/// code never special-cases variants it does not care about.
pub enum LayerKind {
    Container,
    SolidColor { color: ColorF },
    Tiled(TiledData),
    Video { resource_id: Option<ResourceId> },
    Delegated(DelegatedContent),
    Scrollbar(ScrollbarData),
    IoSurface { surface_id: u32, surface_size: Size2D<f32> },
}

impl LayerKind {
    pub fn type_as_str(&self) -> &'static str {
        match *self {
            LayerKind::Container => "Container",
            LayerKind::SolidColor { .. } => "SolidColor",
            LayerKind::Tiled(..) => "Tiled",
            LayerKind::Video { .. } => "Video",
            LayerKind::Delegated(..) => "Delegated",
            LayerKind::Scrollbar(..) => "Scrollbar",
            LayerKind::IoSurface { .. } => "IoSurface",
        }
    }
}

/// Per-frame derived state, recomputed by the draw-properties pass and
/// never persisted across frames.
#[derive(Debug, Clone)]
pub struct DrawProperties {
    /// Content space -> target surface space.
    pub target_space_transform: Transform3D<f32>,
    /// Content space -> screen space.
    pub screen_space_transform: Transform3D<f32>,
    /// Accumulated opacity this layer draws with into its target.
    pub opacity: f32,
    pub is_clipped: bool,
    /// Clip in target space; only meaningful when is_clipped.
    pub clip_rect: Rect<f32>,
    /// Bounding rect this layer may draw to, in target space.
    pub drawable_content_rect: Rect<f32>,
    /// Part of the content rect that survives clipping, in content space.
    /// Empty is a valid, common outcome.
    pub visible_content_rect: Rect<f32>,
    /// The layer owning the render surface this layer draws into. Always
    /// set (to self or an ancestor) for a layer that draws.
    pub render_target: Option<LayerId>,
    pub num_drawing_descendants: usize,
}

impl Default for DrawProperties {
    fn default() -> DrawProperties {
        DrawProperties {
            target_space_transform: Transform3D::identity(),
            screen_space_transform: Transform3D::identity(),
            opacity: 1.0,
            is_clipped: false,
            clip_rect: Rect::zero(),
            drawable_content_rect: Rect::zero(),
            visible_content_rect: Rect::zero(),
            render_target: None,
            num_drawing_descendants: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum DrawPhase {
    Idle,
    InsideDraw,
}

/// Output parameters of one AppendQuads call.
#[derive(Debug, Default)]
pub struct AppendQuadsData {
    pub num_missing_tiles: usize,
    pub had_incomplete_tile: bool,
}

pub struct Layer {
    pub id: LayerId,
    pub kind: LayerKind,

    // Geometry.
    pub anchor_point: Point2D<f32>,
    pub position: Point2D<f32>,
    pub bounds: Size2D<f32>,
    pub content_bounds: Size2D<f32>,
    pub contents_scale_x: f32,
    pub contents_scale_y: f32,
    pub transform: Transform3D<f32>,
    pub sublayer_transform: Transform3D<f32>,
    pub preserves_3d: bool,

    // Paint state.
    pub draws_content: bool,
    pub opacity: f32,
    pub background_color: ColorF,
    pub filters: Vec<FilterOp>,
    pub background_filters: Vec<FilterOp>,
    pub masks_to_bounds: bool,
    pub contents_opaque: bool,
    pub double_sided: bool,
    pub force_render_surface: bool,

    // Animation state, pushed from the main thread.
    pub transform_is_animating: bool,
    pub opacity_is_animating: bool,

    // Scroll state.
    pub scrollable: bool,
    pub should_scroll_on_main_thread: bool,
    pub have_wheel_event_handlers: bool,
    pub non_fast_scrollable_region: Region,
    scroll_offset: Vector2D<f32>,
    scroll_delta: Vector2D<f32>,
    sent_scroll_delta: Vector2D<f32>,
    pub max_scroll_offset: Vector2D<f32>,
    scroll_offset_delegate: Option<Box<dyn ScrollOffsetDelegate>>,

    // Relationships, resolved through the owning tree. The scroll/clip
    // parent-child links are independent of the paint tree and must not
    // be used to infer paint order.
    pub parent: Option<LayerId>,
    pub children: Vec<LayerId>,
    pub mask_layer: Option<LayerId>,
    pub replica_layer: Option<LayerId>,
    pub scroll_parent: Option<LayerId>,
    pub scroll_children: Vec<LayerId>,
    pub clip_parent: Option<LayerId>,
    pub clip_children: Vec<LayerId>,
    pub horizontal_scrollbar_layer: Option<LayerId>,
    pub vertical_scrollbar_layer: Option<LayerId>,

    // Damage tracking.
    pub change_flags: ChangeFlags,
    pub update_rect: Rect<f32>,

    // Per-frame derived state.
    pub draw_properties: DrawProperties,
    /// Present while this layer is a render target. Callers must
    /// separately invalidate the tree's cached render-surface layer list.
    pub render_surface: Option<RenderSurface>,

    draw_phase: DrawPhase,
}

impl Layer {
    pub fn new(id: LayerId, kind: LayerKind) -> Layer {
        let draws_content = !matches!(kind, LayerKind::Container);
        Layer {
            id,
            kind,
            anchor_point: point2(0.5, 0.5),
            position: Point2D::origin(),
            bounds: Size2D::zero(),
            content_bounds: Size2D::zero(),
            contents_scale_x: 1.0,
            contents_scale_y: 1.0,
            transform: Transform3D::identity(),
            sublayer_transform: Transform3D::identity(),
            preserves_3d: false,
            draws_content,
            opacity: 1.0,
            background_color: ColorF::transparent(),
            filters: Vec::new(),
            background_filters: Vec::new(),
            masks_to_bounds: false,
            contents_opaque: false,
            double_sided: true,
            force_render_surface: false,
            transform_is_animating: false,
            opacity_is_animating: false,
            scrollable: false,
            should_scroll_on_main_thread: false,
            have_wheel_event_handlers: false,
            non_fast_scrollable_region: Region::new(),
            scroll_offset: Vector2D::zero(),
            scroll_delta: Vector2D::zero(),
            sent_scroll_delta: Vector2D::zero(),
            max_scroll_offset: Vector2D::zero(),
            scroll_offset_delegate: None,
            parent: None,
            children: Vec::new(),
            mask_layer: None,
            replica_layer: None,
            scroll_parent: None,
            scroll_children: Vec::new(),
            clip_parent: None,
            clip_children: Vec::new(),
            horizontal_scrollbar_layer: None,
            vertical_scrollbar_layer: None,
            change_flags: ChangeFlags::empty(),
            update_rect: Rect::zero(),
            draw_properties: DrawProperties::default(),
            render_surface: None,
            draw_phase: DrawPhase::Idle,
        }
    }

    pub fn set_bounds(&mut self, bounds: Size2D<f32>) {
        if self.bounds != bounds {
            self.bounds = bounds;
            self.content_bounds = size2(
                bounds.width * self.contents_scale_x,
                bounds.height * self.contents_scale_y,
            );
            self.note_property_changed();
        }
    }

    pub fn set_contents_scale(&mut self, sx: f32, sy: f32) {
        if self.contents_scale_x != sx || self.contents_scale_y != sy {
            self.contents_scale_x = sx;
            self.contents_scale_y = sy;
            self.content_bounds =
                size2(self.bounds.width * sx, self.bounds.height * sy);
            self.note_property_changed();
        }
    }

    /// Subtype hook letting a kind pick its content resolution
    /// independent of the draw-properties pass. Externally produced
    /// content keeps a fixed 1:1 scale.
    pub fn calculate_contents_scale(&self, ideal_scale: f32) -> (f32, f32) {
        match self.kind {
            LayerKind::Delegated(..) | LayerKind::IoSurface { .. } | LayerKind::Video { .. } => {
                (1.0, 1.0)
            }
            _ => (ideal_scale, ideal_scale),
        }
    }

    pub fn create_render_surface(&mut self) -> &mut RenderSurface {
        if self.render_surface.is_none() {
            self.render_surface = Some(RenderSurface::new());
        }
        self.render_surface.as_mut().unwrap()
    }

    pub fn clear_render_surface(&mut self) {
        self.render_surface = None;
    }

    pub fn note_property_changed(&mut self) {
        self.change_flags.insert(ChangeFlags::LAYER_PROPERTY_CHANGED);
    }

    pub fn set_stacking_order_changed(&mut self, changed: bool) {
        if changed {
            self.change_flags.insert(ChangeFlags::STACKING_ORDER_CHANGED);
        }
    }

    pub fn layer_property_changed(&self) -> bool {
        !self.change_flags.is_empty()
    }

    pub fn reset_change_tracking(&mut self) {
        self.change_flags = ChangeFlags::empty();
        self.update_rect = Rect::zero();
    }

    // --- Scroll state ---------------------------------------------------

    pub fn set_scroll_offset(&mut self, offset: Vector2D<f32>) {
        if self.scroll_offset != offset {
            self.scroll_offset = offset;
            self.note_property_changed();
        }
    }

    pub fn scroll_offset(&self) -> Vector2D<f32> {
        self.scroll_offset
    }

    pub fn set_scroll_delta(&mut self, delta: Vector2D<f32>) {
        if let Some(ref mut delegate) = self.scroll_offset_delegate {
            let offset = self.scroll_offset;
            delegate.set_total_scroll_offset(offset + delta);
        } else if self.scroll_delta != delta {
            self.scroll_delta = delta;
            self.note_property_changed();
        }
    }

    pub fn scroll_delta(&self) -> Vector2D<f32> {
        match self.scroll_offset_delegate {
            Some(ref delegate) => delegate.total_scroll_offset() - self.scroll_offset,
            None => self.scroll_delta,
        }
    }

    pub fn sent_scroll_delta(&self) -> Vector2D<f32> {
        self.sent_scroll_delta
    }

    pub fn set_sent_scroll_delta(&mut self, delta: Vector2D<f32>) {
        self.sent_scroll_delta = delta;
    }

    pub fn total_scroll_offset(&self) -> Vector2D<f32> {
        self.scroll_offset + self.scroll_delta()
    }

    pub fn set_scroll_offset_delegate(
        &mut self,
        delegate: Option<Box<dyn ScrollOffsetDelegate>>,
    ) {
        if let Some(mut delegate) = delegate {
            // The delegate takes over the current total offset; the local
            // delta collapses into it.
            delegate.set_total_scroll_offset(self.total_scroll_offset());
            self.scroll_delta = Vector2D::zero();
            self.scroll_offset_delegate = Some(delegate);
        } else {
            if let Some(ref old) = self.scroll_offset_delegate {
                let total = old.total_scroll_offset();
                self.scroll_delta = total - self.scroll_offset;
            }
            self.scroll_offset_delegate = None;
        }
    }

    /// Applies as much of `delta` as the scroll range allows and returns
    /// the unconsumed remainder, which the coordinator bubbles to a
    /// scroll ancestor.
    pub fn scroll_by(&mut self, delta: Vector2D<f32>) -> Vector2D<f32> {
        let old_total = self.total_scroll_offset();
        let new_total = vec2(
            (old_total.x + delta.x).max(0.0).min(self.max_scroll_offset.x),
            (old_total.y + delta.y).max(0.0).min(self.max_scroll_offset.y),
        );
        let applied = new_total - old_total;
        if applied != Vector2D::zero() {
            if let Some(ref mut delegate) = self.scroll_offset_delegate {
                delegate.set_total_scroll_offset(new_total);
            } else {
                self.scroll_delta += applied;
            }
            self.note_property_changed();
        }
        delta - applied
    }

    // --- Capability surface ---------------------------------------------

    pub fn has_delegated_content(&self) -> bool {
        matches!(self.kind, LayerKind::Delegated(..))
    }

    pub fn has_contributing_delegated_render_passes(&self) -> bool {
        match self.kind {
            LayerKind::Delegated(ref content) => content.has_contributing_passes(),
            _ => false,
        }
    }

    pub fn as_scrollbar(&self) -> Option<&ScrollbarData> {
        match self.kind {
            LayerKind::Scrollbar(ref data) => Some(data),
            _ => None,
        }
    }

    pub fn as_scrollbar_mut(&mut self) -> Option<&mut ScrollbarData> {
        match self.kind {
            LayerKind::Scrollbar(ref mut data) => Some(data),
            _ => None,
        }
    }

    pub fn as_delegated(&self) -> Option<&DelegatedContent> {
        match self.kind {
            LayerKind::Delegated(ref content) => Some(content),
            _ => None,
        }
    }

    pub fn as_delegated_mut(&mut self) -> Option<&mut DelegatedContent> {
        match self.kind {
            LayerKind::Delegated(ref mut content) => Some(content),
            _ => None,
        }
    }

    pub fn contents_resource_id(&self) -> Option<ResourceId> {
        match self.kind {
            LayerKind::Video { resource_id } => resource_id,
            LayerKind::Tiled(ref data) => data.tiles.get(&(0, 0)).map(|t| t.resource_id),
            _ => None,
        }
    }

    pub fn picture(&self) -> Option<Picture> {
        match self.kind {
            LayerKind::Tiled(ref data) => data.picture,
            _ => None,
        }
    }

    /// Rough per-layer texture footprint, used by the memory policy.
    pub fn content_bytes(&self) -> usize {
        if !self.draws_content {
            return 0;
        }
        (self.content_bounds.width as usize) * (self.content_bounds.height as usize) * 4
    }

    pub fn did_lose_output_surface(&mut self) {
        match self.kind {
            LayerKind::Tiled(ref mut data) => data.tiles.clear(),
            LayerKind::Video { ref mut resource_id } => *resource_id = None,
            LayerKind::Delegated(ref mut content) => content.drop_resources(),
            LayerKind::Scrollbar(ref mut data) => {
                data.track_resource_id = None;
                data.thumb_resource_id = None;
            }
            _ => {}
        }
    }

    // --- Per-frame draw contract ----------------------------------------

    /// First phase of the WillDraw/AppendQuads/DidDraw triple. AppendQuads
    /// and DidDraw may only follow a WillDraw that returned true, and
    /// DidDraw runs exactly once before the next WillDraw.
    pub fn will_draw(
        &mut self,
        mode: DrawMode,
        _resources: Option<&dyn ResourceProvider>,
    ) -> bool {
        assert_eq!(self.draw_phase, DrawPhase::Idle, "unbalanced WillDraw");
        if !self.draws_content || self.draw_properties.visible_content_rect.is_empty() {
            return false;
        }
        let ok = match self.kind {
            LayerKind::Video { resource_id } => {
                mode == DrawMode::Hardware && resource_id.is_some()
            }
            LayerKind::IoSurface { .. } => mode == DrawMode::Hardware,
            LayerKind::Delegated(ref content) => {
                mode == DrawMode::Hardware && content.has_frame()
            }
            _ => true,
        };
        if ok {
            self.draw_phase = DrawPhase::InsideDraw;
        }
        ok
    }

    pub fn did_draw(&mut self, _resources: Option<&mut (dyn ResourceProvider + '_)>) {
        assert_eq!(
            self.draw_phase,
            DrawPhase::InsideDraw,
            "DidDraw without a successful WillDraw"
        );
        self.draw_phase = DrawPhase::Idle;
    }

    fn shared_quad_state(&self) -> SharedQuadState {
        SharedQuadState::new(
            self.draw_properties.target_space_transform,
            self.content_bounds,
            self.draw_properties.visible_content_rect,
            self.draw_properties.clip_rect,
            self.draw_properties.is_clipped,
            self.draw_properties.opacity,
        )
    }

    /// Emits this layer's quads into the sink bound to its target's pass.
    /// Delegated content does not come through here; the frame builder
    /// splices its pass list directly.
    pub fn append_quads(&mut self, sink: &mut QuadSink, data: &mut AppendQuadsData, mode: DrawMode) {
        assert_eq!(
            self.draw_phase,
            DrawPhase::InsideDraw,
            "AppendQuads without a successful WillDraw"
        );
        let state = sink.use_shared_quad_state(self.shared_quad_state());
        let visible = self.draw_properties.visible_content_rect;
        let content_rect = Rect::new(Point2D::origin(), self.content_bounds);

        match self.kind {
            LayerKind::Container => {}
            LayerKind::SolidColor { color } => {
                let opaque = if color.a >= 1.0 { content_rect } else { Rect::zero() };
                sink.append(DrawQuad {
                    shared_quad_state: state,
                    rect: content_rect,
                    opaque_rect: opaque,
                    visible_rect: visible,
                    material: Material::SolidColor { color },
                });
            }
            LayerKind::Tiled(ref tiling) => {
                append_tile_quads(
                    tiling,
                    state,
                    &visible,
                    self.contents_opaque,
                    self.background_color,
                    mode,
                    sink,
                    data,
                );
            }
            LayerKind::Video { resource_id } => {
                if let Some(resource_id) = resource_id {
                    sink.append(DrawQuad {
                        shared_quad_state: state,
                        rect: content_rect,
                        opaque_rect: if self.contents_opaque { content_rect } else { Rect::zero() },
                        visible_rect: visible,
                        material: Material::Video { resource_id },
                    });
                }
            }
            LayerKind::Scrollbar(ref bar) => {
                let track_material = match bar.track_resource_id {
                    Some(resource_id) => Material::Texture {
                        resource_id,
                        premultiplied_alpha: true,
                        uv_rect: rect(0.0, 0.0, 1.0, 1.0),
                        flipped: false,
                    },
                    None => Material::SolidColor {
                        color: ColorF::new(0.2, 0.2, 0.2, 1.0),
                    },
                };
                sink.append(DrawQuad {
                    shared_quad_state: state,
                    rect: content_rect,
                    opaque_rect: Rect::zero(),
                    visible_rect: visible,
                    material: track_material,
                });
                let thumb = bar.thumb_rect(&self.content_bounds);
                let thumb_visible = thumb.intersection(&visible).unwrap_or_else(Rect::zero);
                let thumb_material = match bar.thumb_resource_id {
                    Some(resource_id) => Material::Texture {
                        resource_id,
                        premultiplied_alpha: true,
                        uv_rect: rect(0.0, 0.0, 1.0, 1.0),
                        flipped: false,
                    },
                    None => Material::SolidColor {
                        color: ColorF::new(0.5, 0.5, 0.5, 1.0),
                    },
                };
                sink.append(DrawQuad {
                    shared_quad_state: state,
                    rect: thumb,
                    opaque_rect: Rect::zero(),
                    visible_rect: thumb_visible,
                    material: thumb_material,
                });
            }
            LayerKind::IoSurface { surface_id, surface_size } => {
                sink.append(DrawQuad {
                    shared_quad_state: state,
                    rect: content_rect,
                    opaque_rect: if self.contents_opaque { content_rect } else { Rect::zero() },
                    visible_rect: visible,
                    material: Material::IoSurface { surface_id, surface_size },
                });
            }
            LayerKind::Delegated(..) => {
                unreachable!("delegated layers are spliced by the frame builder")
            }
        }
    }
}

fn append_tile_quads(
    tiling: &TiledData,
    state: usize,
    visible: &Rect<f32>,
    contents_opaque: bool,
    background_color: ColorF,
    mode: DrawMode,
    sink: &mut QuadSink,
    data: &mut AppendQuadsData,
) {
    if visible.is_empty() {
        return;
    }
    let tw = tiling.tile_size.width;
    let th = tiling.tile_size.height;
    let left = (visible.origin.x / tw).floor() as i32;
    let top = (visible.origin.y / th).floor() as i32;
    let right = ((visible.origin.x + visible.size.width) / tw).ceil() as i32;
    let bottom = ((visible.origin.y + visible.size.height) / th).ceil() as i32;

    for j in top..bottom {
        for i in left..right {
            let tile_rect = rect(i as f32 * tw, j as f32 * th, tw, th);
            let tile_visible = match tile_rect.intersection(visible) {
                Some(r) => r,
                None => continue,
            };
            let opaque_rect = if contents_opaque { tile_rect } else { Rect::zero() };
            match (tiling.tiles.get(&(i, j)), mode) {
                (Some(tile), DrawMode::Hardware) => {
                    sink.append(DrawQuad {
                        shared_quad_state: state,
                        rect: tile_rect,
                        opaque_rect: if tile.contents_opaque { tile_rect } else { opaque_rect },
                        visible_rect: tile_visible,
                        material: Material::TiledContent {
                            resource_id: tile.resource_id,
                            tex_coord_rect: rect(0.0, 0.0, 1.0, 1.0),
                            texture_size: tiling.tile_size,
                        },
                    });
                }
                (_, DrawMode::ResourcelessSoftware) => {
                    // Software fallback rasterizes in place; draw flat
                    // content instead of checkerboard.
                    sink.append(DrawQuad {
                        shared_quad_state: state,
                        rect: tile_rect,
                        opaque_rect,
                        visible_rect: tile_visible,
                        material: Material::SolidColor { color: background_color },
                    });
                }
                (None, DrawMode::Hardware) => {
                    data.num_missing_tiles += 1;
                    data.had_incomplete_tile = true;
                    sink.append(DrawQuad {
                        shared_quad_state: state,
                        rect: tile_rect,
                        opaque_rect: Rect::zero(),
                        visible_rect: tile_visible,
                        material: Material::Checkerboard {
                            color: ColorF::new(0.9, 0.9, 0.9, 1.0),
                        },
                    });
                }
            }
        }
    }
}
