//! Transient, frame-lifetime GPU resources keyed by handle.
//!
//! All pyramids and cascade buffers live here. They are owned exclusively by
//! the pipeline that created the pool, and are released and recreated as a
//! unit whenever the requested descriptor stops matching the held one.

use std::collections::HashMap;

/// Stable identifier for a pooled resource.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ResourceHandle(pub u64);

impl ResourceHandle {
    /// Deterministic handle derived from a resource name.
    pub fn named(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Complete description of a pooled texture. Two specs comparing unequal is
/// the reallocation trigger; there is no partial reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSpec {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub array_layers: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureSpec {
    pub fn color_target(label: &'static str, width: u32, height: u32) -> Self {
        Self {
            label,
            width: width.max(1),
            height: height.max(1),
            mip_level_count: 1,
            array_layers: 1,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }
}

/// A pooled texture plus the per-mip / per-layer views the compute passes
/// bind. Views are created once at allocation, not per frame.
pub struct PooledTexture {
    pub texture: wgpu::Texture,
    /// Full-chain view (all mips, all layers).
    pub view: wgpu::TextureView,
    /// One single-mip view per mip level (layer 0 when layered).
    pub mip_views: Vec<wgpu::TextureView>,
    /// One single-layer view per array layer (mip 0).
    pub layer_views: Vec<wgpu::TextureView>,
    pub spec: TextureSpec,
}

impl PooledTexture {
    fn create(device: &wgpu::Device, spec: TextureSpec) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(spec.label),
            size: wgpu::Extent3d {
                width: spec.width,
                height: spec.height,
                depth_or_array_layers: spec.array_layers,
            },
            mip_level_count: spec.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: spec.format,
            usage: spec.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mip_views = (0..spec.mip_level_count)
            .map(|mip| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_mip_level: mip,
                    mip_level_count: Some(1),
                    base_array_layer: 0,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let layer_views = (0..spec.array_layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_mip_level: 0,
                    mip_level_count: Some(1),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        Self { texture, view, mip_views, layer_views, spec }
    }

    pub fn mip_size(&self, mip: u32) -> (u32, u32) {
        ((self.spec.width >> mip).max(1), (self.spec.height >> mip).max(1))
    }
}

/// Pool of transient textures, owned by one pipeline instance.
#[derive(Default)]
pub struct ResourcePool {
    textures: HashMap<ResourceHandle, PooledTexture>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self { textures: HashMap::new() }
    }

    /// Make sure `handle` holds a texture matching `spec`, releasing any
    /// previously held texture first. Returns true when a reallocation
    /// happened.
    pub fn ensure(&mut self, device: &wgpu::Device, handle: ResourceHandle, spec: TextureSpec) -> bool {
        if let Some(existing) = self.textures.get(&handle) {
            if existing.spec == spec {
                return false;
            }
            log::debug!(
                "reallocating {}: {}x{} -> {}x{}",
                spec.label,
                existing.spec.width,
                existing.spec.height,
                spec.width,
                spec.height
            );
            // Drop before creating the replacement so the old allocation is
            // released first.
            self.textures.remove(&handle);
        }
        self.textures.insert(handle, PooledTexture::create(device, spec));
        true
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&PooledTexture> {
        self.textures.get(&handle)
    }

    pub fn release_all(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_handles_are_deterministic() {
        assert_eq!(ResourceHandle::named("hiz"), ResourceHandle::named("hiz"));
        assert_ne!(ResourceHandle::named("hiz"), ResourceHandle::named("variance"));
    }

    #[test]
    fn spec_mismatch_is_detected_by_equality() {
        let a = TextureSpec::color_target("t", 128, 128);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.width = 256;
        assert_ne!(a, b);
    }
}
