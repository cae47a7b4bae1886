use std::collections::HashMap;

use seatile_tiles::{RenderSurface, RenderableSpec, TileTexture};

#[derive(Debug)]
pub struct HeadlessHandle(u64);

/// Surface that keeps renderables in memory and logs their lifecycle.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next_id: u64,
    live: HashMap<u64, RenderableSpec>,
    textured: usize,
    texture_bytes: usize,
}

impl HeadlessSurface {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn textured(&self) -> usize {
        self.textured
    }

    pub fn texture_bytes(&self) -> usize {
        self.texture_bytes
    }
}

impl RenderSurface for HeadlessSurface {
    type Handle = HeadlessHandle;

    fn add(&mut self, spec: RenderableSpec) -> HeadlessHandle {
        self.next_id += 1;
        tracing::trace!(
            label = %spec.label(),
            west = spec.bounds.west,
            south = spec.bounds.south,
            east = spec.bounds.east,
            north = spec.bounds.north,
            "Renderable added"
        );
        self.live.insert(self.next_id, spec);
        HeadlessHandle(self.next_id)
    }

    fn remove(&mut self, handle: HeadlessHandle) {
        match self.live.remove(&handle.0) {
            Some(spec) => tracing::trace!(label = %spec.label(), "Renderable removed"),
            None => tracing::warn!(handle = handle.0, "Unknown renderable released"),
        }
    }

    fn attach_texture(&mut self, handle: &HeadlessHandle, texture: TileTexture) {
        if let Some(spec) = self.live.get(&handle.0) {
            tracing::trace!(
                label = %spec.label(),
                width = texture.width,
                height = texture.height,
                "Texture attached"
            );
            self.textured += 1;
            self.texture_bytes += texture.data.len();
        }
    }
}
