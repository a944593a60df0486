/// Rectangular viewport the pipeline renders for. A single viewport per
/// invocation; stereo/multi-view is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Half-resolution extent used by the depth pyramids.
    pub fn half(&self) -> Self {
        Self::new(self.width >> 1, self.height >> 1)
    }

    /// Mip chain length: floor(log2(min(w, h))) + 1, so the smallest mip of
    /// the shorter axis is 1 texel.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.min(self.height).max(1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::Viewport;

    #[test]
    fn mip_count_follows_shorter_axis() {
        assert_eq!(Viewport::new(1, 1).mip_level_count(), 1);
        assert_eq!(Viewport::new(512, 256).mip_level_count(), 9);
        assert_eq!(Viewport::new(1920, 1080).mip_level_count(), 11);
    }

    #[test]
    fn half_never_degenerates_to_zero() {
        let v = Viewport::new(1, 3).half();
        assert_eq!((v.width, v.height), (1, 1));
    }
}
