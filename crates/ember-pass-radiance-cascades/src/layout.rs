//! Addressing math for the cascade arena.
//!
//! The cascade buffer is an arena of `CASCADE_LEVELS` levels. Level `l`
//! stores one direction sample per texel, direction-first: within each
//! probe block the horizontal slot axis is `8 << l` texels wide and the
//! vertical slot axis is always 8 texels tall, so a level occupies
//! `base_width x (base_height >> l)` texels. WebGPU forbids binding the
//! same subresource for sampling and storage writes in one pass, so the
//! arena is realized as a two-layer texture array: level `l` lives in
//! layer `l & 1` and reads its upper level from the opposite layer. All
//! addressing goes through this module; no pass hardcodes offsets.

use ember_core::Viewport;

/// Number of cascade levels, fixed for all render types.
pub const CASCADE_LEVELS: u32 = 6;

/// Probe spacing at level 0, in pixels.
pub const PROBE_CELL: u32 = 8;

/// Upper bound on ray-march steps per interval. The step size grows with
/// the interval so longer levels stay within this budget; short intervals
/// stop early at their interval end.
pub const MARCH_MAX_STEPS: u32 = 24;

/// Addressing for one frame's cascade arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeLayout {
    pub base_width: u32,
    pub base_height: u32,
}

impl CascadeLayout {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            base_width: viewport.width.max(PROBE_CELL),
            base_height: viewport.height.max(PROBE_CELL),
        }
    }

    /// Probe grid dimensions at `level`. Shrinks by 2x per axis per level.
    pub fn probe_grid(&self, level: u32) -> (u32, u32) {
        (
            (self.base_width / (PROBE_CELL << level)).max(1),
            (self.base_height / (PROBE_CELL << level)).max(1),
        )
    }

    /// Texel extent of the region level `level` occupies within its layer.
    pub fn level_extent(&self, level: u32) -> (u32, u32) {
        (self.base_width, (self.base_height >> level).max(1))
    }

    /// Array layer holding `level`. Adjacent levels alternate layers so a
    /// build pass can sample level `l + 1` while writing level `l`.
    pub fn level_layer(level: u32) -> u32 {
        level & 1
    }

    /// Direction samples stored per probe at `level`.
    pub fn dirs_per_probe(level: u32) -> u32 {
        64 << level
    }

    /// Horizontal slot-axis width of one probe block at `level`.
    pub fn probe_block_width(level: u32) -> u32 {
        PROBE_CELL << level
    }

    /// Start of the ray interval at `level`, in probe-cell units.
    pub fn ray_origin_offset(level: u32) -> f32 {
        if level == 0 {
            0.0
        } else {
            (1u32 << (level - 1)) as f32
        }
    }

    /// Length of the ray interval at `level`, in probe-cell units.
    pub fn ray_length(level: u32) -> f32 {
        (1u32 << level) as f32 - Self::ray_origin_offset(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> CascadeLayout {
        CascadeLayout::new(Viewport::new(1920, 1080))
    }

    #[test]
    fn intervals_tile_exactly() {
        // offset(l) + length(l) must equal offset(l + 1): consecutive
        // levels cover abutting radial bands with no gap and no overlap.
        for level in 0..CASCADE_LEVELS - 1 {
            let end = CascadeLayout::ray_origin_offset(level) + CascadeLayout::ray_length(level);
            assert_eq!(
                end,
                CascadeLayout::ray_origin_offset(level + 1),
                "gap or overlap between levels {} and {}",
                level,
                level + 1
            );
        }
    }

    #[test]
    fn level_zero_starts_at_probe() {
        assert_eq!(CascadeLayout::ray_origin_offset(0), 0.0);
        assert_eq!(CascadeLayout::ray_length(0), 1.0);
    }

    #[test]
    fn probe_grid_shrinks_per_level() {
        let l = layout();
        for level in 0..CASCADE_LEVELS - 1 {
            let (cx, cy) = l.probe_grid(level);
            let (nx, ny) = l.probe_grid(level + 1);
            assert!(nx <= cx && ny <= cy);
        }
        assert_eq!(l.probe_grid(0), (240, 135));
    }

    #[test]
    fn region_holds_every_probe_block() {
        let l = layout();
        for level in 0..CASCADE_LEVELS {
            let (px, py) = l.probe_grid(level);
            let (w, h) = l.level_extent(level);
            assert!(px * CascadeLayout::probe_block_width(level) <= w);
            assert!(py * PROBE_CELL <= h);
        }
    }

    #[test]
    fn adjacent_levels_use_opposite_layers() {
        for level in 0..CASCADE_LEVELS - 1 {
            assert_ne!(
                CascadeLayout::level_layer(level),
                CascadeLayout::level_layer(level + 1)
            );
        }
    }

    #[test]
    fn tiny_viewport_never_degenerates() {
        let l = CascadeLayout::new(Viewport::new(3, 2));
        for level in 0..CASCADE_LEVELS {
            let (px, py) = l.probe_grid(level);
            let (w, h) = l.level_extent(level);
            assert!(px >= 1 && py >= 1);
            assert!(w >= 1 && h >= 1);
        }
    }

    #[test]
    fn dirs_double_per_level() {
        for level in 0..CASCADE_LEVELS - 1 {
            assert_eq!(
                CascadeLayout::dirs_per_probe(level + 1),
                CascadeLayout::dirs_per_probe(level) * 2
            );
        }
    }
}
