use crate::cache::TileKey;
use seatile_geo::GeoBounds;

/// What the host needs to draw one tile: a rectangle on the globe textured
/// from `image_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableSpec {
    pub key: TileKey,
    pub bounds: GeoBounds,
    pub image_url: String,
}

impl RenderableSpec {
    pub fn label(&self) -> String {
        format!("Tile_{}", self.key)
    }
}

/// Decoded RGBA8 tile image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTexture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Host rendering surface. Handles are moved into `remove`, so a released
/// renderable can never be reached again through the cache.
pub trait RenderSurface {
    type Handle;

    fn add(&mut self, spec: RenderableSpec) -> Self::Handle;

    fn remove(&mut self, handle: Self::Handle);

    fn attach_texture(&mut self, _handle: &Self::Handle, _texture: TileTexture) {}
}
