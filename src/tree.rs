/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use euclid::default::{Size2D, Vector2D};
use euclid::vec2;

use crate::internal_types::{ColorF, FastHashMap, LayerId, ScrollAndScaleSet, ScrollEntry};
use crate::layer::{Layer, ScrollbarOrientation};

/// A subtree detached from a tree's arena, root layer first. Layers keep
/// their ids so they can be re-attached (possibly to another tree) during
/// synchronization.
pub struct DetachedLayerSubtree {
    pub root: LayerId,
    pub layers: Vec<Layer>,
}

/// Owns every layer of one tree generation in an id-keyed arena. All
/// relationship fields on `Layer` are ids resolved through this arena.
pub struct LayerTree {
    layers: FastHashMap<LayerId, Layer>,
    root_layer: Option<LayerId>,
    pub root_scroll_layer: Option<LayerId>,

    pub page_scale_factor: f32,
    pub min_page_scale_factor: f32,
    pub max_page_scale_factor: f32,
    page_scale_delta: f32,
    sent_page_scale_delta: f32,

    pub device_scale_factor: f32,
    /// Viewport in device pixels.
    pub device_viewport_size: Size2D<f32>,
    pub background_color: ColorF,
    pub has_transparent_background: bool,
    contents_textures_purged: bool,
}

impl LayerTree {
    pub fn new() -> LayerTree {
        LayerTree {
            layers: FastHashMap::default(),
            root_layer: None,
            root_scroll_layer: None,
            page_scale_factor: 1.0,
            min_page_scale_factor: 1.0,
            max_page_scale_factor: 1.0,
            page_scale_delta: 1.0,
            sent_page_scale_delta: 1.0,
            device_scale_factor: 1.0,
            device_viewport_size: Size2D::zero(),
            background_color: ColorF::white(),
            has_transparent_background: false,
            contents_textures_purged: false,
        }
    }

    // --- Arena access ---------------------------------------------------

    pub fn layer(&self, id: LayerId) -> &Layer {
        self.layers
            .get(&id)
            .unwrap_or_else(|| panic!("unknown layer {:?}", id))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        self.layers
            .get_mut(&id)
            .unwrap_or_else(|| panic!("unknown layer {:?}", id))
    }

    pub fn try_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().cloned()
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        let previous = self.layers.insert(id, layer);
        assert!(previous.is_none(), "duplicate layer id {:?}", id);
        id
    }

    // --- Structure ------------------------------------------------------

    pub fn set_root_layer(&mut self, layer: Layer) -> LayerId {
        if let Some(old_root) = self.root_layer.take() {
            self.detach_subtree(old_root);
        }
        let id = self.insert(layer);
        self.root_layer = Some(id);
        id
    }

    pub fn root_layer(&self) -> Option<LayerId> {
        self.root_layer
    }

    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        self.insert(layer)
    }

    pub fn add_child(&mut self, parent: LayerId, child: Layer) -> LayerId {
        let child_id = self.insert(child);
        self.layer_mut(child_id).parent = Some(parent);
        self.layer_mut(parent).children.push(child_id);
        child_id
    }

    /// Detaches `child` (and its whole subtree) from `parent` and returns
    /// it. Removing a layer that is not a child of `parent` is pipeline
    /// corruption and fails fast.
    pub fn remove_child(&mut self, parent: LayerId, child: LayerId) -> DetachedLayerSubtree {
        let position = self
            .layer(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .unwrap_or_else(|| {
                panic!("{:?} is not a child of {:?}", child, parent)
            });
        self.layer_mut(parent).children.remove(position);
        let mut subtree = self.detach_subtree(child);
        subtree.layers[0].parent = None;
        subtree
    }

    /// Re-attaches a previously detached (stolen) subtree under `parent`.
    pub fn attach_child(&mut self, parent: LayerId, subtree: DetachedLayerSubtree) -> LayerId {
        let root = subtree.root;
        self.attach_subtree(subtree);
        self.layer_mut(root).parent = Some(parent);
        self.layer_mut(parent).children.push(root);
        root
    }

    pub fn set_mask_layer(&mut self, owner: LayerId, mask: Option<Layer>) {
        if let Some(old) = self.layer(owner).mask_layer {
            self.detach_subtree(old);
        }
        let mask_id = mask.map(|layer| self.insert(layer));
        if let Some(mask_id) = mask_id {
            self.layer_mut(mask_id).parent = Some(owner);
        }
        self.layer_mut(owner).mask_layer = mask_id;
    }

    pub fn take_mask_layer(&mut self, owner: LayerId) -> Option<DetachedLayerSubtree> {
        let mask = self.layer_mut(owner).mask_layer.take()?;
        let mut subtree = self.detach_subtree(mask);
        subtree.layers[0].parent = None;
        Some(subtree)
    }

    pub fn set_replica_layer(&mut self, owner: LayerId, replica: Option<Layer>) {
        if let Some(old) = self.layer(owner).replica_layer {
            self.detach_subtree(old);
        }
        let replica_id = replica.map(|layer| self.insert(layer));
        if let Some(replica_id) = replica_id {
            self.layer_mut(replica_id).parent = Some(owner);
        }
        self.layer_mut(owner).replica_layer = replica_id;
    }

    pub fn take_replica_layer(&mut self, owner: LayerId) -> Option<DetachedLayerSubtree> {
        let replica = self.layer_mut(owner).replica_layer.take()?;
        let mut subtree = self.detach_subtree(replica);
        subtree.layers[0].parent = None;
        Some(subtree)
    }

    fn collect_subtree_ids(&self, id: LayerId, out: &mut Vec<LayerId>) {
        out.push(id);
        let layer = self.layer(id);
        let children = layer.children.clone();
        let mask = layer.mask_layer;
        let replica = layer.replica_layer;
        for child in children {
            self.collect_subtree_ids(child, out);
        }
        if let Some(mask) = mask {
            self.collect_subtree_ids(mask, out);
        }
        if let Some(replica) = replica {
            self.collect_subtree_ids(replica, out);
        }
    }

    /// Removes a subtree (children, mask and replica cascade) from the
    /// arena, root first.
    pub fn detach_subtree(&mut self, id: LayerId) -> DetachedLayerSubtree {
        let mut ids = Vec::new();
        self.collect_subtree_ids(id, &mut ids);
        let layers = ids
            .iter()
            .map(|layer_id| {
                self.layers
                    .remove(layer_id)
                    .unwrap_or_else(|| panic!("unknown layer {:?}", layer_id))
            })
            .collect();
        if self.root_layer == Some(id) {
            self.root_layer = None;
        }
        if let Some(scroll) = self.root_scroll_layer {
            if ids.contains(&scroll) {
                self.root_scroll_layer = None;
            }
        }
        DetachedLayerSubtree { root: id, layers }
    }

    pub fn attach_subtree(&mut self, subtree: DetachedLayerSubtree) {
        for layer in subtree.layers {
            self.insert(layer);
        }
    }

    /// Paint-order (pre-order) walk of the paint tree, children only.
    pub fn collect_preorder(&self, id: LayerId, out: &mut Vec<LayerId>) {
        out.push(id);
        for &child in &self.layer(id).children {
            self.collect_preorder(child, out);
        }
    }

    pub fn find_root_scroll_layer(&self) -> Option<LayerId> {
        let root = self.root_layer?;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let layer = self.layer(id);
            if layer.scrollable {
                return Some(id);
            }
            for &child in layer.children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    pub fn update_root_scroll_layer(&mut self) {
        self.root_scroll_layer = self.find_root_scroll_layer();
    }

    // --- Page scale -----------------------------------------------------

    pub fn set_page_scale_factor_and_limits(&mut self, factor: f32, min: f32, max: f32) {
        assert!(min <= max && min > 0.0);
        self.page_scale_factor = factor.max(min).min(max);
        self.min_page_scale_factor = min;
        self.max_page_scale_factor = max;
    }

    /// Clamps so that the total page scale stays inside [min, max].
    pub fn set_page_scale_delta(&mut self, delta: f32) {
        let total = (self.page_scale_factor * delta)
            .max(self.min_page_scale_factor)
            .min(self.max_page_scale_factor);
        self.page_scale_delta = total / self.page_scale_factor;
    }

    pub fn sent_page_scale_delta(&self) -> f32 {
        self.sent_page_scale_delta
    }

    pub fn page_scale_delta(&self) -> f32 {
        self.page_scale_delta
    }

    pub fn total_page_scale_factor(&self) -> f32 {
        self.page_scale_factor * self.page_scale_delta
    }

    /// Recomputes the root scroll layer's scroll bounds from the current
    /// viewport and total page scale.
    pub fn update_max_scroll_offset(&mut self) {
        let scroll_id = match self.root_scroll_layer {
            Some(id) => id,
            None => return,
        };
        let scale = self.total_page_scale_factor() * self.device_scale_factor;
        if scale <= 0.0 {
            return;
        }
        let viewport: Vector2D<f32> = vec2(
            self.device_viewport_size.width,
            self.device_viewport_size.height,
        );
        let bounds = self.layer(scroll_id).bounds;
        let max = vec2(
            ((bounds.width * scale - viewport.x) / scale).max(0.0),
            ((bounds.height * scale - viewport.y) / scale).max(0.0),
        );
        self.layer_mut(scroll_id).max_scroll_offset = max;
    }

    /// Pushes scroll positions into any scrollbar layers bound to their
    /// scroll layers.
    pub fn update_scrollbars(&mut self) {
        let ids: Vec<LayerId> = self.layers.keys().cloned().collect();
        for id in ids {
            let binding = match self.layers.get(&id).and_then(|l| l.as_scrollbar()) {
                Some(bar) => bar.scroll_layer_id,
                None => continue,
            };
            let scroll_id = match binding {
                Some(scroll_id) if self.contains(scroll_id) => scroll_id,
                _ => continue,
            };
            let (offset, max, bounds, viewport_scale) = {
                let scroll = self.layer(scroll_id);
                (
                    scroll.total_scroll_offset(),
                    scroll.max_scroll_offset,
                    scroll.bounds,
                    self.total_page_scale_factor(),
                )
            };
            let viewport = self.device_viewport_size;
            let bar = self
                .layer_mut(id)
                .as_scrollbar_mut()
                .expect("layer kind changed during scrollbar update");
            match bar.orientation {
                ScrollbarOrientation::Horizontal => {
                    bar.current_pos = offset.x;
                    bar.maximum = max.x;
                    if bounds.width > 0.0 {
                        bar.visible_ratio =
                            (viewport.width / (bounds.width * viewport_scale)).min(1.0);
                    }
                }
                ScrollbarOrientation::Vertical => {
                    bar.current_pos = offset.y;
                    bar.maximum = max.y;
                    if bounds.height > 0.0 {
                        bar.visible_ratio =
                            (viewport.height / (bounds.height * viewport_scale)).min(1.0);
                    }
                }
            }
        }
    }

    // --- Memory state ---------------------------------------------------

    pub fn set_contents_textures_purged(&mut self, purged: bool) {
        self.contents_textures_purged = purged;
    }

    pub fn contents_textures_purged(&self) -> bool {
        self.contents_textures_purged
    }

    /// Estimated bytes needed for everything that currently draws.
    pub fn contents_bytes(&self) -> usize {
        self.layers.values().map(|layer| layer.content_bytes()).sum()
    }

    // --- Main-thread reconciliation -------------------------------------

    /// Drains every layer's not-yet-sent scroll delta plus the unsent
    /// page-scale delta. Safe on an empty tree; a second call with no
    /// intervening scroll yields an empty set.
    pub fn process_scroll_deltas(&mut self) -> ScrollAndScaleSet {
        let mut scrolls = Vec::new();
        let mut ids: Vec<LayerId> = self.layers.keys().cloned().collect();
        ids.sort();
        for id in ids {
            let layer = self.layers.get_mut(&id).unwrap();
            let unsent = layer.scroll_delta() - layer.sent_scroll_delta();
            if unsent != Vector2D::zero() {
                scrolls.push(ScrollEntry { layer_id: id, scroll_delta: unsent });
                let total = layer.scroll_delta();
                layer.set_sent_scroll_delta(total);
            }
        }
        let page_scale_delta = self.page_scale_delta / self.sent_page_scale_delta;
        self.sent_page_scale_delta = self.page_scale_delta;
        ScrollAndScaleSet { scrolls, page_scale_delta }
    }

    /// Rolls previously-sent-but-unacknowledged deltas back into the base
    /// state after the main thread aborts a commit, so nothing is counted
    /// twice.
    pub fn apply_sent_scroll_deltas_from_aborted_commit(&mut self) {
        for layer in self.layers.values_mut() {
            let sent = layer.sent_scroll_delta();
            if sent != Vector2D::zero() {
                let offset = layer.scroll_offset();
                layer.set_scroll_offset(offset + sent);
                let delta = layer.scroll_delta();
                layer.set_scroll_delta(delta - sent);
                layer.set_sent_scroll_delta(Vector2D::zero());
            }
        }
        self.page_scale_factor *= self.sent_page_scale_delta;
        self.page_scale_delta /= self.sent_page_scale_delta;
        self.sent_page_scale_delta = 1.0;
    }

    /// Called after a commit lands on the main thread: sent deltas are
    /// now folded into committed scroll offsets.
    pub fn did_commit_scroll_deltas(&mut self) {
        for layer in self.layers.values_mut() {
            layer.set_sent_scroll_delta(Vector2D::zero());
        }
        self.sent_page_scale_delta = 1.0;
    }

    pub fn reset_change_tracking(&mut self) {
        for layer in self.layers.values_mut() {
            layer.reset_change_tracking();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use euclid::size2;

    fn container(id: i32) -> Layer {
        Layer::new(LayerId(id), LayerKind::Container)
    }

    fn build_tree() -> (LayerTree, LayerId, LayerId) {
        let mut tree = LayerTree::new();
        let root = tree.set_root_layer(container(1));
        let child = tree.add_child(root, container(2));
        (tree, root, child)
    }

    #[test]
    fn add_and_remove_child() {
        let (mut tree, root, child) = build_tree();
        assert_eq!(tree.layer(child).parent, Some(root));
        let detached = tree.remove_child(root, child);
        assert_eq!(detached.root, child);
        assert!(!tree.contains(child));
        assert!(tree.layer(root).children.is_empty());
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn removing_absent_child_is_an_error() {
        let (mut tree, root, _child) = build_tree();
        tree.remove_child(root, LayerId(99));
    }

    #[test]
    fn mask_layer_can_be_stolen_and_reattached() {
        let (mut tree, root, _child) = build_tree();
        tree.set_mask_layer(root, Some(container(10)));
        assert_eq!(tree.layer(root).mask_layer, Some(LayerId(10)));

        let stolen = tree.take_mask_layer(root).unwrap();
        assert!(tree.layer(root).mask_layer.is_none());
        assert!(!tree.contains(LayerId(10)));

        tree.attach_subtree(stolen);
        tree.layer_mut(root).mask_layer = Some(LayerId(10));
        assert!(tree.contains(LayerId(10)));
    }

    #[test]
    fn detach_cascades_to_descendants_mask_and_replica() {
        let (mut tree, root, child) = build_tree();
        tree.add_child(child, container(3));
        tree.set_mask_layer(child, Some(container(4)));
        tree.set_replica_layer(child, Some(container(5)));
        let detached = tree.remove_child(root, child);
        assert_eq!(detached.layers.len(), 4);
        for id in [2, 3, 4, 5].iter() {
            assert!(!tree.contains(LayerId(*id)));
        }
    }

    #[test]
    fn process_scroll_deltas_drains_once() {
        let (mut tree, _root, child) = build_tree();
        {
            let layer = tree.layer_mut(child);
            layer.scrollable = true;
            layer.max_scroll_offset = vec2(100.0, 100.0);
            layer.scroll_by(vec2(11.0, 15.0));
        }
        let set = tree.process_scroll_deltas();
        assert_eq!(set.scrolls.len(), 1);
        assert_eq!(set.scrolls[0].layer_id, child);
        assert_eq!(set.scrolls[0].scroll_delta, vec2(11.0, 15.0));
        assert_eq!(tree.layer(child).sent_scroll_delta(), vec2(11.0, 15.0));

        let again = tree.process_scroll_deltas();
        assert!(again.scrolls.is_empty());
        assert_eq!(again.page_scale_delta, 1.0);
    }

    #[test]
    fn aborted_commit_replays_sent_deltas_without_double_count() {
        let (mut tree, _root, child) = build_tree();
        {
            let layer = tree.layer_mut(child);
            layer.scrollable = true;
            layer.max_scroll_offset = vec2(100.0, 100.0);
            layer.scroll_by(vec2(10.0, 0.0));
        }
        tree.process_scroll_deltas();
        tree.layer_mut(child).scroll_by(vec2(5.0, 0.0));
        tree.apply_sent_scroll_deltas_from_aborted_commit();

        let layer = tree.layer(child);
        assert_eq!(layer.scroll_offset(), vec2(10.0, 0.0));
        assert_eq!(layer.scroll_delta(), vec2(5.0, 0.0));
        assert_eq!(layer.total_scroll_offset(), vec2(15.0, 0.0));
    }

    #[test]
    fn page_scale_delta_clamps_to_limits() {
        let mut tree = LayerTree::new();
        tree.set_page_scale_factor_and_limits(1.0, 0.5, 4.0);
        tree.set_page_scale_delta(10.0);
        assert_eq!(tree.page_scale_delta(), 4.0);
        tree.set_page_scale_delta(0.1);
        assert_eq!(tree.page_scale_delta(), 0.5);
    }

    #[test]
    fn max_scroll_offset_follows_page_scale() {
        let (mut tree, _root, child) = build_tree();
        tree.device_viewport_size = size2(50.0, 50.0);
        {
            let layer = tree.layer_mut(child);
            layer.scrollable = true;
            layer.set_bounds(size2(100.0, 100.0));
        }
        tree.update_root_scroll_layer();
        tree.set_page_scale_factor_and_limits(1.0, 0.5, 4.0);
        tree.set_page_scale_delta(2.0);
        tree.update_max_scroll_offset();
        assert_eq!(tree.layer(child).max_scroll_offset, vec2(75.0, 75.0));
    }
}
