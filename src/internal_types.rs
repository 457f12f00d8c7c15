/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use euclid::default::{Size2D, Vector2D};
use fnv::FnvHasher;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FnvHasher>>;
pub type FastHashSet<K> = HashSet<K, BuildHasherDefault<FnvHasher>>;

/// Identifies a layer within one tree generation. Relationship "pointers"
/// between layers are stored as ids and resolved through the owning tree.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LayerId(pub i32);

/// Identifies a render pass. Passes produced for a layer's own render
/// surface use index 0; delegated content remaps its embedded passes to
/// indices 1.. within the owning layer's namespace.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderPassId {
    pub layer_id: LayerId,
    pub index: usize,
}

impl RenderPassId {
    pub fn new(layer_id: LayerId, index: usize) -> RenderPassId {
        RenderPassId { layer_id, index }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ResourceId(pub u32);

/// A resource-provider child namespace, used by delegated content to
/// track resources owned by an external producer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ChildId(pub u32);

/// Opaque handle to recorded paint content. Only some layer kinds can
/// produce one; the default capability answer is `None`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Picture(pub u64);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> ColorF {
        ColorF { r, g, b, a }
    }

    pub fn transparent() -> ColorF {
        ColorF::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn white() -> ColorF {
        ColorF::new(1.0, 1.0, 1.0, 1.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FilterOp {
    Blur(f32),
    Brightness(f32),
    Contrast(f32),
    Grayscale(f32),
    HueRotate(f32),
    Invert(f32),
    Opacity(f32),
    Saturate(f32),
    Sepia(f32),
}

/// How a frame is being drawn. Resourceless software mode never fails to
/// prepare and skips layer kinds that require GPU resources.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawMode {
    Hardware,
    ResourcelessSoftware,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollEntry {
    pub layer_id: LayerId,
    pub scroll_delta: Vector2D<f32>,
}

/// The single unit of impl-thread → main-thread reconciliation, drained
/// by `LayerTree::process_scroll_deltas`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAndScaleSet {
    pub scrolls: Vec<ScrollEntry>,
    pub page_scale_delta: f32,
}

impl ScrollAndScaleSet {
    pub fn is_empty(&self) -> bool {
        self.scrolls.is_empty() && self.page_scale_delta == 1.0
    }
}

/// Sent alongside every swap so the embedder can position browser UI
/// without waiting for the main thread.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorFrameMetadata {
    pub root_scroll_offset: Vector2D<f32>,
    pub page_scale_factor: f32,
    pub min_page_scale_factor: f32,
    pub max_page_scale_factor: f32,
    pub viewport_size: Size2D<f32>,
    pub root_layer_size: Size2D<f32>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum PriorityCutoff {
    AllowNothing,
    AllowRequiredOnly,
    AllowNiceToHave,
    AllowEverything,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ManagedMemoryPolicy {
    pub bytes_limit_when_visible: usize,
    pub priority_cutoff_when_visible: PriorityCutoff,
    pub bytes_limit_when_not_visible: usize,
    pub priority_cutoff_when_not_visible: PriorityCutoff,
}

impl ManagedMemoryPolicy {
    pub fn new(bytes_limit_when_visible: usize) -> ManagedMemoryPolicy {
        ManagedMemoryPolicy {
            bytes_limit_when_visible,
            priority_cutoff_when_visible: PriorityCutoff::AllowEverything,
            bytes_limit_when_not_visible: 0,
            priority_cutoff_when_not_visible: PriorityCutoff::AllowNothing,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct RendererCapabilities {
    pub using_partial_swap: bool,
    pub allow_partial_texture_updates: bool,
    /// Renderer can synthesize content on demand, so a frame may be drawn
    /// even while the contents textures have been purged.
    pub allow_rasterize_on_demand: bool,
}

impl Default for RendererCapabilities {
    fn default() -> RendererCapabilities {
        RendererCapabilities {
            using_partial_swap: false,
            allow_partial_texture_updates: false,
            allow_rasterize_on_demand: false,
        }
    }
}

/// The slice of the resource/rasterization layer the draw pipeline needs:
/// resource existence checks for WillDraw, and child namespaces for
/// delegated content.
pub trait ResourceProvider {
    fn have_resource(&self, id: ResourceId) -> bool;
    fn create_child(&mut self) -> ChildId;
    fn destroy_child(&mut self, child: ChildId);
}
