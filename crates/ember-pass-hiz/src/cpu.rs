//! CPU reference for the Hi-Z kernels. Mirrors `shaders/hiz.wgsl` texel for
//! texel; the unit tests for the pyramid invariants run against this.

/// Fold full-resolution depth into half-resolution (min, max) pairs.
/// Output dimensions are `(w / 2, h / 2)`, each clamped to at least 1; edge
/// texels clamp their 2x2 footprint to the input extent.
pub fn min_max_from_depth(depth: &[f32], w: usize, h: usize) -> (Vec<[f32; 2]>, usize, usize) {
    assert_eq!(depth.len(), w * h);
    let ow = (w / 2).max(1);
    let oh = (h / 2).max(1);
    let mut out = vec![[0.0f32; 2]; ow * oh];
    for y in 0..oh {
        for x in 0..ow {
            let mut d_min = f32::MAX;
            let mut d_max = f32::MIN;
            for dy in 0..2 {
                for dx in 0..2 {
                    let px = (2 * x + dx).min(w - 1);
                    let py = (2 * y + dy).min(h - 1);
                    let d = depth[py * w + px];
                    d_min = d_min.min(d);
                    d_max = d_max.max(d);
                }
            }
            out[y * ow + x] = [d_min, d_max];
        }
    }
    (out, ow, oh)
}

/// Fold a (min, max) level into the next coarser one: component-wise min of
/// mins and max of maxes over 2x2 regions.
pub fn min_max_downsample(src: &[[f32; 2]], w: usize, h: usize) -> (Vec<[f32; 2]>, usize, usize) {
    assert_eq!(src.len(), w * h);
    let ow = (w / 2).max(1);
    let oh = (h / 2).max(1);
    let mut out = vec![[0.0f32; 2]; ow * oh];
    for y in 0..oh {
        for x in 0..ow {
            let mut d_min = f32::MAX;
            let mut d_max = f32::MIN;
            for dy in 0..2 {
                for dx in 0..2 {
                    let px = (2 * x + dx).min(w - 1);
                    let py = (2 * y + dy).min(h - 1);
                    let pair = src[py * w + px];
                    d_min = d_min.min(pair[0]);
                    d_max = d_max.max(pair[1]);
                }
            }
            out[y * ow + x] = [d_min, d_max];
        }
    }
    (out, ow, oh)
}

/// Build the whole pyramid: level 0 from depth, then `levels - 1` reductions.
pub fn build_pyramid(depth: &[f32], w: usize, h: usize, levels: usize) -> Vec<(Vec<[f32; 2]>, usize, usize)> {
    let mut out = Vec::with_capacity(levels);
    let mut level = min_max_from_depth(depth, w, h);
    for _ in 1..levels {
        let next = min_max_downsample(&level.0, level.1, level.2);
        out.push(level);
        level = next;
    }
    out.push(level);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_depth(w: usize, h: usize) -> Vec<f32> {
        (0..w * h).map(|i| (i % w) as f32 / w as f32).collect()
    }

    #[test]
    fn base_level_bounds_every_covered_texel() {
        let (w, h) = (16, 12);
        let depth = gradient_depth(w, h);
        let (mip0, ow, oh) = min_max_from_depth(&depth, w, h);
        for y in 0..h {
            for x in 0..w {
                let pair = mip0[(y / 2).min(oh - 1) * ow + (x / 2).min(ow - 1)];
                let d = depth[y * w + x];
                assert!(pair[0] <= d && d <= pair[1]);
            }
        }
    }

    #[test]
    fn intervals_widen_monotonically_with_level() {
        let (w, h) = (32, 32);
        let depth: Vec<f32> = (0..w * h).map(|i| ((i * 37) % 97) as f32 / 97.0).collect();
        let pyramid = build_pyramid(&depth, w, h, 5);
        for k in 0..pyramid.len() - 1 {
            let (fine, fw, _fh) = (&pyramid[k].0, pyramid[k].1, pyramid[k].2);
            let (coarse, cw, ch) = (&pyramid[k + 1].0, pyramid[k + 1].1, pyramid[k + 1].2);
            for (i, pair) in fine.iter().enumerate() {
                let x = (i % fw) / 2;
                let y = (i / fw) / 2;
                let c = coarse[y.min(ch - 1) * cw + x.min(cw - 1)];
                assert!(c[0] <= pair[0], "coarse min must not exceed fine min");
                assert!(c[1] >= pair[1], "coarse max must not undercut fine max");
            }
        }
    }

    #[test]
    fn odd_extents_clamp_instead_of_reading_out_of_bounds() {
        let (w, h) = (5, 3);
        let depth = gradient_depth(w, h);
        let (mip0, ow, oh) = min_max_from_depth(&depth, w, h);
        assert_eq!((ow, oh), (2, 1));
        for pair in &mip0 {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn constant_depth_collapses_to_equal_bounds() {
        let depth = vec![0.25f32; 64];
        let pyramid = build_pyramid(&depth, 8, 8, 4);
        for (level, _, _) in &pyramid {
            for pair in level {
                assert_eq!(pair[0], 0.25);
                assert_eq!(pair[1], 0.25);
            }
        }
    }
}
