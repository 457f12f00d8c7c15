/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Delegated content: a frame of render passes produced by an external
//! source (e.g. an out-of-process renderer) that a layer injects,
//! re-indexed, into the owning frame's pass DAG.

use euclid::default::{Size2D, Transform3D};

use crate::internal_types::{ChildId, FastHashMap, LayerId, RenderPassId, ResourceId, ResourceProvider};
use crate::quad::{Material, RenderPass};

/// A render-pass list plus the resources its quads reference. The root
/// pass is last, matching the pass-list ordering everywhere else.
#[derive(Debug, Clone)]
pub struct DelegatedFrameData {
    pub render_passes: Vec<RenderPass>,
    pub resources: Vec<ResourceId>,
}

pub type ReturnResourcesCallback = Box<dyn FnMut(Vec<ResourceId>)>;

pub struct DelegatedContent {
    child_id: Option<ChildId>,
    own_child_id: bool,
    frame: Option<DelegatedFrameData>,
    frame_size: Size2D<f32>,
    return_callback: Option<ReturnResourcesCallback>,
}

impl DelegatedContent {
    pub fn new() -> DelegatedContent {
        DelegatedContent {
            child_id: None,
            own_child_id: false,
            frame: None,
            frame_size: Size2D::zero(),
            return_callback: None,
        }
    }

    pub fn set_return_resources_callback(&mut self, callback: Option<ReturnResourcesCallback>) {
        self.return_callback = callback;
    }

    /// Reuses a caller-supplied resource-provider child context. A child
    /// id adopted this way is never torn down by this layer.
    pub fn set_resource_child(&mut self, resources: &mut dyn ResourceProvider, child: ChildId) {
        self.release_child(resources);
        self.child_id = Some(child);
        self.own_child_id = false;
    }

    /// Creates a child context of our own; torn down on frame teardown.
    pub fn create_own_resource_child(&mut self, resources: &mut dyn ResourceProvider) -> ChildId {
        self.release_child(resources);
        let child = resources.create_child();
        self.child_id = Some(child);
        self.own_child_id = true;
        child
    }

    fn release_child(&mut self, resources: &mut dyn ResourceProvider) {
        if let Some(child) = self.child_id.take() {
            if self.own_child_id {
                resources.destroy_child(child);
            }
        }
        self.own_child_id = false;
    }

    pub fn child_id(&self) -> Option<ChildId> {
        self.child_id
    }

    /// Installs a new delegated frame and reports resources the old frame
    /// referenced but the new one no longer does.
    pub fn set_frame_data(&mut self, frame: DelegatedFrameData) {
        let unused: Vec<ResourceId> = match self.frame {
            Some(ref old) => old
                .resources
                .iter()
                .filter(|r| !frame.resources.contains(r))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        self.frame_size = frame
            .render_passes
            .last()
            .map(|pass| pass.output_rect.size)
            .unwrap_or_else(Size2D::zero);
        self.frame = Some(frame);
        if !unused.is_empty() {
            if let Some(ref mut callback) = self.return_callback {
                callback(unused);
            }
        }
    }

    /// Returns every held resource and destroys an owned child context.
    pub fn teardown(&mut self, resources: &mut dyn ResourceProvider) {
        if let Some(frame) = self.frame.take() {
            if let Some(ref mut callback) = self.return_callback {
                callback(frame.resources);
            }
        }
        self.release_child(resources);
        self.frame_size = Size2D::zero();
    }

    /// Output-surface loss: the resources are gone, not returnable.
    pub fn drop_resources(&mut self) {
        self.frame = None;
        self.frame_size = Size2D::zero();
    }

    pub fn frame(&self) -> Option<&DelegatedFrameData> {
        self.frame.as_ref()
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    pub fn has_contributing_passes(&self) -> bool {
        self.frame
            .as_ref()
            .map_or(false, |f| f.render_passes.len() > 1)
    }

    pub fn frame_size(&self) -> Size2D<f32> {
        self.frame_size
    }

    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.frame.as_ref().and_then(|f| f.render_passes.last())
    }

    /// Maps delegated-frame coordinates into the owning layer's content
    /// space (the frame is stretched to the layer bounds).
    pub fn frame_to_layer_transform(&self, layer_bounds: &Size2D<f32>) -> Transform3D<f32> {
        if self.frame_size.width <= 0.0 || self.frame_size.height <= 0.0 {
            return Transform3D::identity();
        }
        Transform3D::scale(
            layer_bounds.width / self.frame_size.width,
            layer_bounds.height / self.frame_size.height,
            1.0,
        )
    }

    fn pass_index_map(&self) -> FastHashMap<RenderPassId, usize> {
        let mut map = FastHashMap::default();
        if let Some(ref frame) = self.frame {
            for (i, pass) in frame.render_passes.iter().enumerate() {
                map.insert(pass.id, i);
            }
        }
        map
    }

    /// The id a producer pass gets inside the owning layer's namespace.
    /// Index 0 belongs to the owner's own surface pass, so delegated
    /// passes start at 1.
    fn remapped_id(owner: LayerId, producer_index: usize) -> RenderPassId {
        RenderPassId::new(owner, producer_index + 1)
    }

    fn remap_quads(pass: &mut RenderPass, owner: LayerId, index_map: &FastHashMap<RenderPassId, usize>) {
        for quad in &mut pass.quad_list {
            if let Material::RenderPass { ref mut render_pass_id, .. } = quad.material {
                match index_map.get(render_pass_id) {
                    Some(&idx) => *render_pass_id = Self::remapped_id(owner, idx),
                    // An unresolvable reference stays as-is; it will be
                    // absent from the frame's pass list and treated as a
                    // placeholder by the renderer.
                    None => {
                        log::warn!(
                            "delegated quad references unknown pass {:?}",
                            render_pass_id
                        );
                    }
                }
            }
        }
    }

    /// Clones every non-root delegated pass with ids (and internal pass
    /// references) remapped into the owner's namespace, in producer
    /// order.
    pub fn contributing_passes(&self, owner: LayerId) -> Vec<RenderPass> {
        let frame = match self.frame {
            Some(ref frame) => frame,
            None => return Vec::new(),
        };
        let index_map = self.pass_index_map();
        let count = frame.render_passes.len();
        frame
            .render_passes
            .iter()
            .take(count.saturating_sub(1))
            .enumerate()
            .map(|(i, pass)| {
                let mut out = pass.clone();
                out.id = Self::remapped_id(owner, i);
                Self::remap_quads(&mut out, owner, &index_map);
                out
            })
            .collect()
    }

    /// The root pass with its quads' pass references remapped, ready for
    /// its quads to be merged into the owner's target pass.
    pub fn remapped_root_pass(&self, owner: LayerId) -> Option<RenderPass> {
        let frame = self.frame.as_ref()?;
        let index_map = self.pass_index_map();
        frame.render_passes.last().map(|pass| {
            let mut out = pass.clone();
            out.id = Self::remapped_id(owner, frame.render_passes.len() - 1);
            Self::remap_quads(&mut out, owner, &index_map);
            out
        })
    }
}
