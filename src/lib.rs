/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! A compositor core: a retained layer tree on the main thread, an
//! impl-side tree driven by a per-frame pipeline that turns layers into
//! render passes of draw quads, with occlusion culling, render-pass
//! caching and synchronous scroll/pinch handling.
//!
//! The pieces, in pipeline order:
//!
//! - [`tree`] / [`layer`]: the arena-backed layer tree and the layer
//!   kinds that draw.
//! - [`draw_properties`]: the per-frame geometry pass (transforms,
//!   clips, visible rects, render-surface assignment).
//! - [`occlusion`] / [`quad`] / [`frame`]: back-to-front occlusion
//!   tracking and front-to-back quad emission into render passes.
//! - [`optimizer`]: pruning of passes the renderer can serve from its
//!   texture cache.
//! - [`commit`] / [`host`]: the main-thread commit channel and the
//!   impl-thread coordinator that owns input, memory policy and the
//!   draw/swap cycle.

pub mod commit;
pub mod delegated;
pub mod draw_properties;
pub mod frame;
pub mod host;
pub mod internal_types;
pub mod layer;
pub mod occlusion;
pub mod optimizer;
pub mod quad;
pub mod tree;
pub mod util;

pub use crate::commit::{commit_channel, CommitMessage, CommitReceiver, CommitSender, TreeSnapshot};
pub use crate::delegated::{DelegatedContent, DelegatedFrameData};
pub use crate::draw_properties::{calculate_draw_properties, RenderSurface};
pub use crate::frame::{calculate_render_passes, FrameData};
pub use crate::host::{CompositorHost, HostClient, Renderer, ScrollStatus, ScrollType};
pub use crate::internal_types::{
    ColorF, CompositorFrameMetadata, DrawMode, FilterOp, LayerId, ManagedMemoryPolicy,
    PriorityCutoff, RendererCapabilities, RenderPassId, ResourceId, ResourceProvider,
    ScrollAndScaleSet, ScrollEntry,
};
pub use crate::layer::{Layer, LayerKind};
pub use crate::occlusion::OcclusionTracker;
pub use crate::optimizer::{remove_render_passes, RenderPassTextureCache};
pub use crate::quad::{DrawQuad, Material, QuadSink, RenderPass, SharedQuadState};
pub use crate::tree::LayerTree;
pub use crate::util::Region;
