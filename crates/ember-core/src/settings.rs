/// Which kernel sequence the pipeline runs. Selected once per frame before
/// any work is recorded; each variant owns its own resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderType {
    /// Screen-space probes, probe-first dispatch.
    Rc2d,
    /// Screen-space probes marching a voxelized scene volume supplied by the
    /// host. The volume itself is external scene submission.
    Rc3d,
    /// Screen-space probes, direction-first dispatch. Level 0 packs two
    /// interleaved angular samples per probe column.
    DirectionFirst,
}

impl Default for RenderType {
    fn default() -> Self {
        RenderType::DirectionFirst
    }
}

/// How the finest cascade leaves the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Dense bilateral upsample composited onto the scene color.
    Upsampled,
    /// Compact per-probe spherical harmonics buffer; no composition.
    SphericalHarmonics,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Upsampled
    }
}

/// Externally configured scalars, read-only to the passes and re-read every
/// frame. Passed by reference into every kernel invocation rather than looked
/// up from ambient global state.
#[derive(Debug, Clone)]
pub struct RadianceSettings {
    pub render_type: RenderType,
    pub output_mode: OutputMode,
    /// Depth-difference threshold below which the bilateral combine trusts a
    /// neighboring probe. Smaller is stricter.
    pub upsample_tolerance: f32,
    /// Blend from the bilateral result toward the raw nearest-probe value.
    /// 0 keeps the fully filtered output, 1 bypasses the filter.
    pub noise_filter_strength: f32,
    /// Radiance assigned to rays that leave the screen without a hit.
    pub sky_radiance: [f32; 3],
    pub debug_view: bool,
}

impl RadianceSettings {
    pub const UPSAMPLE_TOLERANCE_MIN: f32 = 1e-4;
    pub const UPSAMPLE_TOLERANCE_MAX: f32 = 0.1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_type(mut self, render_type: RenderType) -> Self {
        self.render_type = render_type;
        self
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn with_upsample_tolerance(mut self, tolerance: f32) -> Self {
        self.upsample_tolerance =
            tolerance.clamp(Self::UPSAMPLE_TOLERANCE_MIN, Self::UPSAMPLE_TOLERANCE_MAX);
        self
    }

    pub fn with_noise_filter_strength(mut self, strength: f32) -> Self {
        self.noise_filter_strength = strength.clamp(0.0, 1.0);
        self
    }

    pub fn with_sky_radiance(mut self, sky: [f32; 3]) -> Self {
        self.sky_radiance = sky;
        self
    }

    pub fn with_debug_view(mut self, debug: bool) -> Self {
        self.debug_view = debug;
        self
    }
}

impl Default for RadianceSettings {
    fn default() -> Self {
        Self {
            render_type: RenderType::default(),
            output_mode: OutputMode::default(),
            upsample_tolerance: 0.1,
            noise_filter_strength: 0.1,
            sky_radiance: [0.0; 3],
            debug_view: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_is_clamped_to_documented_range() {
        let s = RadianceSettings::new().with_upsample_tolerance(0.0);
        assert_eq!(s.upsample_tolerance, RadianceSettings::UPSAMPLE_TOLERANCE_MIN);
        let s = RadianceSettings::new().with_upsample_tolerance(5.0);
        assert_eq!(s.upsample_tolerance, RadianceSettings::UPSAMPLE_TOLERANCE_MAX);
    }

    #[test]
    fn noise_filter_strength_stays_in_unit_range() {
        let s = RadianceSettings::new().with_noise_filter_strength(-1.0);
        assert_eq!(s.noise_filter_strength, 0.0);
        let s = RadianceSettings::new().with_noise_filter_strength(2.0);
        assert_eq!(s.noise_filter_strength, 1.0);
    }
}
