use crate::{Camera, Viewport};

/// Per-frame inputs produced by the host renderer, read-only to the pipeline.
///
/// `color` must additionally be usable as a render attachment: the composite
/// pass blends the upsampled irradiance onto it.
/// `depth` keeps whatever Z convention the host uses; the pipeline treats
/// depth as an opaque [0, 1] scalar and never converts it.
pub struct FrameInputs<'a> {
    pub viewport: Viewport,
    pub camera: &'a Camera,
    /// Scene color prior to global illumination.
    pub color: &'a wgpu::TextureView,
    /// Scene depth, full resolution.
    pub depth: &'a wgpu::TextureView,
    /// Surface normals for the normal-aware combine variant.
    pub normals: Option<&'a wgpu::TextureView>,
    /// Pre-smoothed color sampled during ray marching to reduce noise.
    pub blurred_color: Option<&'a wgpu::TextureView>,
    /// Voxelized scene radiance, consumed only by `RenderType::Rc3d`.
    pub scene_volume: Option<&'a wgpu::TextureView>,
}
