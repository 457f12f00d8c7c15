/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Main-thread to impl-thread commit plumbing. The main thread owns the
//! authoritative layer tree and never mutates the impl thread's trees
//! directly; it captures an immutable `TreeSnapshot` and sends it over a
//! channel. The impl side rebuilds a pending tree from the snapshot and
//! activates it as an atomic swap.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use euclid::default::{Point2D, Rect, Size2D, Transform3D, Vector2D};

use crate::delegated::{DelegatedContent, DelegatedFrameData};
use crate::internal_types::{ColorF, FilterOp, LayerId};
use crate::layer::{Layer, LayerKind, ScrollbarData, TiledData};
use crate::tree::LayerTree;
use crate::util::Region;

/// How a snapshotted layer hangs off the tree. Mask and replica layers
/// are owned out-of-band rather than as ordinary children.
#[derive(Debug, Clone)]
pub enum SnapshotRole {
    Root,
    Child(LayerId),
    Mask(LayerId),
    Replica(LayerId),
}

/// Value-only mirror of `LayerKind`. Delegated content travels as its
/// latest frame data; the impl side owns the resource-child bookkeeping.
#[derive(Debug, Clone)]
pub enum SnapshotKind {
    Container,
    SolidColor { color: ColorF },
    Tiled(TiledData),
    Video { resource_id: Option<crate::internal_types::ResourceId> },
    Delegated { frame: Option<DelegatedFrameData> },
    Scrollbar(ScrollbarData),
    IoSurface { surface_id: u32, surface_size: Size2D<f32> },
}

#[derive(Debug, Clone)]
pub struct LayerSnapshot {
    pub id: LayerId,
    pub role: SnapshotRole,
    pub kind: SnapshotKind,

    pub bounds: Size2D<f32>,
    pub anchor_point: Point2D<f32>,
    pub position: Point2D<f32>,
    pub transform: Transform3D<f32>,
    pub sublayer_transform: Transform3D<f32>,
    pub preserves_3d: bool,

    pub draws_content: bool,
    pub opacity: f32,
    pub background_color: ColorF,
    pub filters: Vec<FilterOp>,
    pub background_filters: Vec<FilterOp>,
    pub masks_to_bounds: bool,
    pub contents_opaque: bool,
    pub double_sided: bool,
    pub force_render_surface: bool,

    pub transform_is_animating: bool,
    pub opacity_is_animating: bool,

    pub scrollable: bool,
    pub should_scroll_on_main_thread: bool,
    pub have_wheel_event_handlers: bool,
    pub non_fast_scrollable_region: Region,
    pub max_scroll_offset: Vector2D<f32>,
    pub scroll_offset: Vector2D<f32>,

    pub scroll_parent: Option<LayerId>,
    pub horizontal_scrollbar_layer: Option<LayerId>,
    pub vertical_scrollbar_layer: Option<LayerId>,

    pub update_rect: Rect<f32>,
    pub stacking_order_changed: bool,
}

/// Immutable capture of everything a commit pushes across threads.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub layers: Vec<LayerSnapshot>,
    pub page_scale_factor: f32,
    pub min_page_scale_factor: f32,
    pub max_page_scale_factor: f32,
    pub device_scale_factor: f32,
    pub device_viewport_size: Size2D<f32>,
    pub background_color: ColorF,
    pub has_transparent_background: bool,
}

impl TreeSnapshot {
    /// Captures a tree in attachment order: each layer's snapshot comes
    /// after the one it attaches to.
    pub fn capture(tree: &LayerTree) -> TreeSnapshot {
        let mut layers = Vec::with_capacity(tree.layer_count());
        if let Some(root) = tree.root_layer() {
            capture_recursive(tree, root, SnapshotRole::Root, &mut layers);
        }
        TreeSnapshot {
            layers,
            page_scale_factor: tree.page_scale_factor,
            min_page_scale_factor: tree.min_page_scale_factor,
            max_page_scale_factor: tree.max_page_scale_factor,
            device_scale_factor: tree.device_scale_factor,
            device_viewport_size: tree.device_viewport_size,
            background_color: tree.background_color,
            has_transparent_background: tree.has_transparent_background,
        }
    }

    /// Rebuilds a pending tree from the snapshot. The result carries no
    /// scroll deltas; the coordinator reconciles those against the
    /// previously active tree when it swaps.
    pub fn build_tree(&self) -> LayerTree {
        let mut tree = LayerTree::new();
        tree.set_page_scale_factor_and_limits(
            self.page_scale_factor,
            self.min_page_scale_factor,
            self.max_page_scale_factor,
        );
        tree.device_scale_factor = self.device_scale_factor;
        tree.device_viewport_size = self.device_viewport_size;
        tree.background_color = self.background_color;
        tree.has_transparent_background = self.has_transparent_background;

        for snapshot in &self.layers {
            let layer = materialize(snapshot);
            match snapshot.role {
                SnapshotRole::Root => {
                    tree.set_root_layer(layer);
                }
                SnapshotRole::Child(parent) => {
                    tree.add_child(parent, layer);
                }
                SnapshotRole::Mask(owner) => {
                    tree.set_mask_layer(owner, Some(layer));
                }
                SnapshotRole::Replica(owner) => {
                    tree.set_replica_layer(owner, Some(layer));
                }
            }
        }
        // Cross-references may point at layers captured later, so they
        // are wired up only once the whole arena exists.
        for snapshot in &self.layers {
            let layer = tree.layer_mut(snapshot.id);
            layer.scroll_parent = snapshot.scroll_parent;
            layer.horizontal_scrollbar_layer = snapshot.horizontal_scrollbar_layer;
            layer.vertical_scrollbar_layer = snapshot.vertical_scrollbar_layer;
            if let Some(parent) = snapshot.scroll_parent {
                tree.layer_mut(parent).scroll_children.push(snapshot.id);
            }
        }
        tree.update_root_scroll_layer();
        tree.update_max_scroll_offset();
        tree
    }
}

fn capture_recursive(
    tree: &LayerTree,
    id: LayerId,
    role: SnapshotRole,
    out: &mut Vec<LayerSnapshot>,
) {
    let layer = tree.layer(id);
    out.push(snapshot_layer(layer, role));
    if let Some(mask) = layer.mask_layer {
        capture_recursive(tree, mask, SnapshotRole::Mask(id), out);
    }
    if let Some(replica) = layer.replica_layer {
        capture_recursive(tree, replica, SnapshotRole::Replica(id), out);
    }
    for &child in &layer.children {
        capture_recursive(tree, child, SnapshotRole::Child(id), out);
    }
}

fn snapshot_layer(layer: &Layer, role: SnapshotRole) -> LayerSnapshot {
    let kind = match layer.kind {
        LayerKind::Container => SnapshotKind::Container,
        LayerKind::SolidColor { color } => SnapshotKind::SolidColor { color },
        LayerKind::Tiled(ref data) => SnapshotKind::Tiled(data.clone()),
        LayerKind::Video { resource_id } => SnapshotKind::Video { resource_id },
        LayerKind::Delegated(ref content) => SnapshotKind::Delegated {
            frame: content.frame().cloned(),
        },
        LayerKind::Scrollbar(ref data) => SnapshotKind::Scrollbar(data.clone()),
        LayerKind::IoSurface { surface_id, surface_size } => {
            SnapshotKind::IoSurface { surface_id, surface_size }
        }
    };
    LayerSnapshot {
        id: layer.id,
        role,
        kind,
        bounds: layer.bounds,
        anchor_point: layer.anchor_point,
        position: layer.position,
        transform: layer.transform,
        sublayer_transform: layer.sublayer_transform,
        preserves_3d: layer.preserves_3d,
        draws_content: layer.draws_content,
        opacity: layer.opacity,
        background_color: layer.background_color,
        filters: layer.filters.clone(),
        background_filters: layer.background_filters.clone(),
        masks_to_bounds: layer.masks_to_bounds,
        contents_opaque: layer.contents_opaque,
        double_sided: layer.double_sided,
        force_render_surface: layer.force_render_surface,
        transform_is_animating: layer.transform_is_animating,
        opacity_is_animating: layer.opacity_is_animating,
        scrollable: layer.scrollable,
        should_scroll_on_main_thread: layer.should_scroll_on_main_thread,
        have_wheel_event_handlers: layer.have_wheel_event_handlers,
        non_fast_scrollable_region: layer.non_fast_scrollable_region.clone(),
        max_scroll_offset: layer.max_scroll_offset,
        scroll_offset: layer.total_scroll_offset(),
        scroll_parent: layer.scroll_parent,
        horizontal_scrollbar_layer: layer.horizontal_scrollbar_layer,
        vertical_scrollbar_layer: layer.vertical_scrollbar_layer,
        update_rect: layer.update_rect,
        stacking_order_changed: false,
    }
}

fn materialize(snapshot: &LayerSnapshot) -> Layer {
    let kind = match snapshot.kind {
        SnapshotKind::Container => LayerKind::Container,
        SnapshotKind::SolidColor { color } => LayerKind::SolidColor { color },
        SnapshotKind::Tiled(ref data) => LayerKind::Tiled(data.clone()),
        SnapshotKind::Video { resource_id } => LayerKind::Video { resource_id },
        SnapshotKind::Delegated { ref frame } => {
            let mut content = DelegatedContent::new();
            if let Some(frame) = frame {
                content.set_frame_data(frame.clone());
            }
            LayerKind::Delegated(content)
        }
        SnapshotKind::Scrollbar(ref data) => LayerKind::Scrollbar(data.clone()),
        SnapshotKind::IoSurface { surface_id, surface_size } => {
            LayerKind::IoSurface { surface_id, surface_size }
        }
    };
    let mut layer = Layer::new(snapshot.id, kind);
    layer.set_bounds(snapshot.bounds);
    layer.anchor_point = snapshot.anchor_point;
    layer.position = snapshot.position;
    layer.transform = snapshot.transform;
    layer.sublayer_transform = snapshot.sublayer_transform;
    layer.preserves_3d = snapshot.preserves_3d;
    layer.draws_content = snapshot.draws_content;
    layer.opacity = snapshot.opacity;
    layer.background_color = snapshot.background_color;
    layer.filters = snapshot.filters.clone();
    layer.background_filters = snapshot.background_filters.clone();
    layer.masks_to_bounds = snapshot.masks_to_bounds;
    layer.contents_opaque = snapshot.contents_opaque;
    layer.double_sided = snapshot.double_sided;
    layer.force_render_surface = snapshot.force_render_surface;
    layer.transform_is_animating = snapshot.transform_is_animating;
    layer.opacity_is_animating = snapshot.opacity_is_animating;
    layer.scrollable = snapshot.scrollable;
    layer.should_scroll_on_main_thread = snapshot.should_scroll_on_main_thread;
    layer.have_wheel_event_handlers = snapshot.have_wheel_event_handlers;
    layer.non_fast_scrollable_region = snapshot.non_fast_scrollable_region.clone();
    layer.max_scroll_offset = snapshot.max_scroll_offset;
    layer.set_scroll_offset(snapshot.scroll_offset);
    layer.update_rect = snapshot.update_rect;
    if snapshot.stacking_order_changed {
        layer.set_stacking_order_changed(true);
    }
    layer
}

pub enum CommitMessage {
    /// A new main-thread snapshot to become the pending tree.
    Commit(TreeSnapshot),
    /// The main thread gave up on a commit it had already drained scroll
    /// deltas for; the impl side must replay them.
    CommitAborted,
}

#[derive(Clone)]
pub struct CommitSender {
    tx: Sender<CommitMessage>,
}

impl CommitSender {
    pub fn commit(&self, snapshot: TreeSnapshot) -> bool {
        self.tx.send(CommitMessage::Commit(snapshot)).is_ok()
    }

    pub fn abort_commit(&self) -> bool {
        self.tx.send(CommitMessage::CommitAborted).is_ok()
    }
}

pub struct CommitReceiver {
    rx: Receiver<CommitMessage>,
}

impl CommitReceiver {
    pub fn try_recv(&self) -> Option<CommitMessage> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("commit channel disconnected");
                None
            }
        }
    }
}

pub fn commit_channel() -> (CommitSender, CommitReceiver) {
    let (tx, rx) = channel();
    (CommitSender { tx }, CommitReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point2, size2, vec2};

    fn sample_tree() -> LayerTree {
        let mut tree = LayerTree::new();
        tree.device_viewport_size = size2(100.0, 100.0);
        tree.set_page_scale_factor_and_limits(1.0, 0.5, 4.0);
        let mut root = Layer::new(LayerId(1), LayerKind::Container);
        root.set_bounds(size2(100.0, 100.0));
        let root = tree.set_root_layer(root);
        let mut scroller = Layer::new(
            LayerId(2),
            LayerKind::SolidColor { color: ColorF::white() },
        );
        scroller.set_bounds(size2(200.0, 200.0));
        scroller.scrollable = true;
        scroller.max_scroll_offset = vec2(100.0, 100.0);
        scroller.position = point2(5.0, 5.0);
        let scroller = tree.add_child(root, scroller);
        tree.layer_mut(scroller).set_scroll_offset(vec2(10.0, 20.0));
        let mask = Layer::new(LayerId(3), LayerKind::Container);
        tree.set_mask_layer(scroller, Some(mask));
        tree
    }

    #[test]
    fn capture_and_rebuild_preserves_structure() {
        let tree = sample_tree();
        let snapshot = TreeSnapshot::capture(&tree);
        let rebuilt = snapshot.build_tree();

        assert_eq!(rebuilt.layer_count(), 3);
        assert_eq!(rebuilt.root_layer(), Some(LayerId(1)));
        assert_eq!(rebuilt.layer(LayerId(1)).children, vec![LayerId(2)]);
        assert_eq!(rebuilt.layer(LayerId(2)).mask_layer, Some(LayerId(3)));
        let scroller = rebuilt.layer(LayerId(2));
        assert_eq!(scroller.position, point2(5.0, 5.0));
        assert_eq!(scroller.scroll_offset(), vec2(10.0, 20.0));
        assert_eq!(scroller.scroll_delta(), vec2(0.0, 0.0));
        assert_eq!(rebuilt.root_scroll_layer, Some(LayerId(2)));
    }

    #[test]
    fn capture_folds_scroll_delta_into_offset() {
        let mut tree = sample_tree();
        tree.layer_mut(LayerId(2)).scroll_by(vec2(7.0, 0.0));
        let snapshot = TreeSnapshot::capture(&tree);
        let rebuilt = snapshot.build_tree();
        assert_eq!(rebuilt.layer(LayerId(2)).scroll_offset(), vec2(17.0, 20.0));
    }

    #[test]
    fn channel_delivers_commits_in_order() {
        let (tx, rx) = commit_channel();
        let tree = sample_tree();
        assert!(tx.commit(TreeSnapshot::capture(&tree)));
        assert!(tx.abort_commit());

        match rx.try_recv() {
            Some(CommitMessage::Commit(snapshot)) => {
                assert_eq!(snapshot.layers.len(), 3);
            }
            _ => panic!("expected a commit message"),
        }
        assert!(matches!(rx.try_recv(), Some(CommitMessage::CommitAborted)));
        assert!(rx.try_recv().is_none());
    }
}
