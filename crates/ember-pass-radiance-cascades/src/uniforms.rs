//! GPU-side uniform blocks, mirrored field-for-field by the WGSL structs.

use bytemuck::{Pod, Zeroable};
use ember_core::{Camera, RadianceSettings, Viewport};
use glam::Mat4;

use crate::layout::{CascadeLayout, MARCH_MAX_STEPS, PROBE_CELL};

/// Per-level uniforms for the build-and-merge kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CascadeUniforms {
    pub view: [[f32; 4]; 4],
    pub inv_view_projection: [[f32; 4]; 4],
    /// Arena base extent: (w, h, 1/w, 1/h).
    pub cascade_buffer_size: [f32; 4],
    /// Probe grid: (this level x, y, upper level x, y).
    pub probes_count: [f32; 4],
    /// Viewport extent: (w, h, 1/w, 1/h).
    pub screen_size: [f32; 4],
    /// Radiance for escaped rays; w > 0.5 means an upper level exists.
    pub sky_radiance: [f32; 4],
    /// (level, dirs per probe, ray offset px, ray length px).
    pub level_params: [f32; 4],
    /// (columns per thread, volume march flag, max march steps, probe cell).
    pub march_params: [f32; 4],
}

impl CascadeUniforms {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layout: &CascadeLayout,
        viewport: Viewport,
        camera: &Camera,
        settings: &RadianceSettings,
        level: u32,
        columns_per_thread: u32,
        volume_march: bool,
        has_upper: bool,
    ) -> Self {
        let view: Mat4 = camera.view_matrix();
        let inv_vp: Mat4 = camera.inverse_view_projection_matrix();
        let (pw, ph) = layout.probe_grid(level);
        let (uw, uh) = layout.probe_grid((level + 1).min(crate::layout::CASCADE_LEVELS - 1));
        let cell = PROBE_CELL as f32;
        Self {
            view: view.to_cols_array_2d(),
            inv_view_projection: inv_vp.to_cols_array_2d(),
            cascade_buffer_size: [
                layout.base_width as f32,
                layout.base_height as f32,
                1.0 / layout.base_width as f32,
                1.0 / layout.base_height as f32,
            ],
            probes_count: [pw as f32, ph as f32, uw as f32, uh as f32],
            screen_size: [
                viewport.width as f32,
                viewport.height as f32,
                1.0 / viewport.width.max(1) as f32,
                1.0 / viewport.height.max(1) as f32,
            ],
            sky_radiance: [
                settings.sky_radiance[0],
                settings.sky_radiance[1],
                settings.sky_radiance[2],
                if has_upper { 1.0 } else { 0.0 },
            ],
            level_params: [
                level as f32,
                CascadeLayout::dirs_per_probe(level) as f32,
                CascadeLayout::ray_origin_offset(level) * cell,
                CascadeLayout::ray_length(level) * cell,
            ],
            march_params: [
                columns_per_thread as f32,
                if volume_march { 1.0 } else { 0.0 },
                MARCH_MAX_STEPS as f32,
                cell,
            ],
        }
    }
}

/// Uniforms for the bilateral combine/upsample and composite kernels.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CombineUniforms {
    /// Viewport extent: (w, h, 1/w, 1/h).
    pub screen_size: [f32; 4],
    /// Level-0 probe grid: (x, y, 1/x, 1/y).
    pub probes_count: [f32; 4],
    /// (upsample tolerance, noise filter strength, debug view flag, probe cell).
    pub params: [f32; 4],
}

impl CombineUniforms {
    pub fn new(layout: &CascadeLayout, viewport: Viewport, settings: &RadianceSettings) -> Self {
        let (pw, ph) = layout.probe_grid(0);
        Self {
            screen_size: [
                viewport.width as f32,
                viewport.height as f32,
                1.0 / viewport.width.max(1) as f32,
                1.0 / viewport.height.max(1) as f32,
            ],
            probes_count: [pw as f32, ph as f32, 1.0 / pw as f32, 1.0 / ph as f32],
            params: [
                settings.upsample_tolerance,
                settings.noise_filter_strength,
                if settings.debug_view { 1.0 } else { 0.0 },
                PROBE_CELL as f32,
            ],
        }
    }
}

/// Uniforms for the spherical-harmonics combine kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShUniforms {
    /// SH probe grid: (x, y, 1/x, 1/y). One SH probe per 4x4 pixel tile.
    pub sh_grid: [f32; 4],
    /// Level-0 cascade probe grid: (x, y, dirs per probe, probe cell).
    pub probes_count: [f32; 4],
}

impl ShUniforms {
    pub fn new(layout: &CascadeLayout) -> Self {
        let (sw, sh) = sh_grid(layout);
        let (pw, ph) = layout.probe_grid(0);
        Self {
            sh_grid: [sw as f32, sh as f32, 1.0 / sw as f32, 1.0 / sh as f32],
            probes_count: [
                pw as f32,
                ph as f32,
                CascadeLayout::dirs_per_probe(0) as f32,
                PROBE_CELL as f32,
            ],
        }
    }
}

/// SH probe grid dimensions: one probe per 4x4 pixel tile of the arena base.
pub fn sh_grid(layout: &CascadeLayout) -> (u32, u32) {
    ((layout.base_width / 4).max(1), (layout.base_height / 4).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Viewport;

    #[test]
    fn uniform_sizes_are_multiple_of_16() {
        assert_eq!(std::mem::size_of::<CascadeUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<CombineUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ShUniforms>() % 16, 0);
    }

    #[test]
    fn ray_interval_scaled_to_pixels() {
        let layout = CascadeLayout::new(Viewport::new(1280, 720));
        let camera = Camera::default();
        let settings = RadianceSettings::default();
        let u = CascadeUniforms::new(
            &layout,
            Viewport::new(1280, 720),
            &camera,
            &settings,
            2,
            1,
            false,
            true,
        );
        // level 2: offset 2 cells, length 2 cells, 8 px per cell
        assert_eq!(u.level_params[2], 16.0);
        assert_eq!(u.level_params[3], 16.0);
        assert_eq!(u.sky_radiance[3], 1.0);
    }

    #[test]
    fn sh_grid_is_quarter_resolution() {
        let layout = CascadeLayout::new(Viewport::new(1920, 1080));
        assert_eq!(sh_grid(&layout), (480, 270));
    }
}
