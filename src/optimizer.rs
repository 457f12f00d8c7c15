/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Render-pass pruning. Given the frame's pass list and the renderer's
//! knowledge of which pass textures it still holds from earlier frames,
//! drops every pass whose output the renderer can reproduce from cache,
//! along with anything that becomes unreachable from the root as a
//! result.

use crate::frame::FrameData;
use crate::internal_types::{FastHashSet, RenderPassId};
use crate::quad::Material;

/// The renderer's view of which pass outputs survive from prior frames.
pub trait RenderPassTextureCache {
    fn have_cached_resource_for_render_pass(&self, id: RenderPassId) -> bool;
}

impl RenderPassTextureCache for FastHashSet<RenderPassId> {
    fn have_cached_resource_for_render_pass(&self, id: RenderPassId) -> bool {
        self.contains(&id)
    }
}

/// A pass-reference quad can stand on a cached texture only when the
/// texture exists and nothing inside the pass changed this frame.
fn quad_keeps_contents_alive(cache: &dyn RenderPassTextureCache, material: &Material) -> bool {
    match *material {
        Material::RenderPass {
            render_pass_id,
            ref contents_changed_since_last_frame,
            ..
        } => {
            !cache.have_cached_resource_for_render_pass(render_pass_id)
                || !contents_changed_since_last_frame.is_empty()
        }
        _ => false,
    }
}

/// Walks the pass list root-first. A pass survives when it is the root,
/// or when at least one surviving pass references it through a quad that
/// cannot rely on a cached texture. Everything else, including passes
/// reachable only through dropped passes, is discarded. Reference quads
/// themselves always stay; the renderer resolves dropped ids from its
/// cache. Running the pruning again on its own output is a no-op.
pub fn remove_render_passes(cache: &dyn RenderPassTextureCache, frame: &mut FrameData) {
    let root_id = match frame.render_passes.last() {
        Some(root) => root.id,
        None => return,
    };
    let mut needed: FastHashSet<RenderPassId> = FastHashSet::default();
    needed.insert(root_id);

    // The list is ordered referenced-before-referencing, so scanning in
    // reverse settles every referencing pass before the pass it names.
    let mut kept = Vec::with_capacity(frame.render_passes.len());
    for pass in frame.render_passes.drain(..).rev() {
        if !needed.contains(&pass.id) {
            continue;
        }
        for quad in &pass.quad_list {
            if quad_keeps_contents_alive(cache, &quad.material) {
                if let Some(id) = quad.referenced_pass() {
                    needed.insert(id);
                }
            }
        }
        kept.push(pass);
    }
    kept.reverse();

    frame.render_pass_map.clear();
    for (index, pass) in kept.iter().enumerate() {
        frame.render_pass_map.insert(pass.id, index);
    }
    frame.render_passes = kept;
}
