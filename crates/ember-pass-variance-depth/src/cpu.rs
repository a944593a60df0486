//! CPU reference for the variance depth kernels, texel-exact against
//! `shaders/variance_depth.wgsl`.

/// 5-tap Gaussian, the same constants the WGSL carries.
pub const BLUR_WEIGHTS: [f32; 3] = [0.38774, 0.24477, 0.06136];

/// Depth to (E[d], E[d^2]) at half resolution.
pub fn moments_from_depth(depth: &[f32], w: usize, h: usize) -> (Vec<[f32; 2]>, usize, usize) {
    assert_eq!(depth.len(), w * h);
    let ow = (w / 2).max(1);
    let oh = (h / 2).max(1);
    let mut out = vec![[0.0f32; 2]; ow * oh];
    for y in 0..oh {
        for x in 0..ow {
            let mut m = [0.0f32; 2];
            for dy in 0..2 {
                for dx in 0..2 {
                    let px = (2 * x + dx).min(w - 1);
                    let py = (2 * y + dy).min(h - 1);
                    let d = depth[py * w + px];
                    m[0] += d;
                    m[1] += d * d;
                }
            }
            out[y * ow + x] = [m[0] * 0.25, m[1] * 0.25];
        }
    }
    (out, ow, oh)
}

/// Average 2x2 moment pairs into the next mip.
pub fn moments_downsample(src: &[[f32; 2]], w: usize, h: usize) -> (Vec<[f32; 2]>, usize, usize) {
    assert_eq!(src.len(), w * h);
    let ow = (w / 2).max(1);
    let oh = (h / 2).max(1);
    let mut out = vec![[0.0f32; 2]; ow * oh];
    for y in 0..oh {
        for x in 0..ow {
            let mut m = [0.0f32; 2];
            for dy in 0..2 {
                for dx in 0..2 {
                    let px = (2 * x + dx).min(w - 1);
                    let py = (2 * y + dy).min(h - 1);
                    m[0] += src[py * w + px][0];
                    m[1] += src[py * w + px][1];
                }
            }
            out[y * ow + x] = [m[0] * 0.25, m[1] * 0.25];
        }
    }
    (out, ow, oh)
}

fn tap(src: &[[f32; 2]], w: usize, h: usize, x: isize, y: isize) -> [f32; 2] {
    let cx = x.clamp(0, w as isize - 1) as usize;
    let cy = y.clamp(0, h as isize - 1) as usize;
    src[cy * w + cx]
}

/// One separable blur axis. `(dx, dy)` is (0, 1) for the vertical pass and
/// (1, 0) for the horizontal pass.
pub fn blur_axis(src: &[[f32; 2]], w: usize, h: usize, dx: isize, dy: isize) -> Vec<[f32; 2]> {
    assert_eq!(src.len(), w * h);
    let mut out = vec![[0.0f32; 2]; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let center = tap(src, w, h, x, y);
            let mut m = [center[0] * BLUR_WEIGHTS[0], center[1] * BLUR_WEIGHTS[0]];
            for o in 1..=2isize {
                let weight = BLUR_WEIGHTS[o as usize];
                let a = tap(src, w, h, x + dx * o, y + dy * o);
                let b = tap(src, w, h, x - dx * o, y - dy * o);
                m[0] += (a[0] + b[0]) * weight;
                m[1] += (a[1] + b[1]) * weight;
            }
            out[y as usize * w + x as usize] = m;
        }
    }
    out
}

/// Vertical then horizontal, matching the GPU scratch round trip.
pub fn separable_blur(src: &[[f32; 2]], w: usize, h: usize) -> Vec<[f32; 2]> {
    let vertical = blur_axis(src, w, h, 0, 1);
    blur_axis(&vertical, w, h, 1, 0)
}

/// Variance from a moment pair, clamped against floating-point error.
pub fn variance(moments: [f32; 2]) -> f32 {
    (moments[1] - moments[0] * moments[0]).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: usize, h: usize, a: f32, b: f32) -> Vec<f32> {
        (0..w * h)
            .map(|i| if (i % w + i / w) % 2 == 0 { a } else { b })
            .collect()
    }

    #[test]
    fn variance_is_non_negative_after_moments_pass() {
        let depth = checkerboard(16, 16, 0.2, 0.8);
        let (m, ow, oh) = moments_from_depth(&depth, 16, 16);
        for pair in &m {
            assert!(variance(*pair) >= -1e-6);
        }
        let (m2, w2, h2) = moments_downsample(&m, ow, oh);
        let blurred = separable_blur(&m2, w2, h2);
        for pair in &blurred {
            assert!(variance(*pair) >= -1e-6);
        }
    }

    #[test]
    fn mixed_depths_produce_positive_variance() {
        let depth = checkerboard(8, 8, 0.0, 1.0);
        let (m, _, _) = moments_from_depth(&depth, 8, 8);
        // Each 2x2 cell averages two zeros and two ones: E[d] = 0.5,
        // E[d^2] = 0.5, variance = 0.25.
        for pair in &m {
            assert!((variance(*pair) - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn constant_depth_has_zero_variance_through_the_chain() {
        let depth = vec![0.6f32; 64];
        let (m, w, h) = moments_from_depth(&depth, 8, 8);
        let blurred = separable_blur(&m, w, h);
        for pair in &blurred {
            assert!(variance(*pair) < 1e-6);
        }
    }

    #[test]
    fn blur_preserves_the_mean_of_an_interior_region() {
        // Away from clamped edges the kernel is normalized, so a constant
        // field passes through unchanged.
        let field = vec![[0.3f32, 0.09f32]; 11 * 11];
        let blurred = separable_blur(&field, 11, 11);
        let center = blurred[5 * 11 + 5];
        assert!((center[0] - 0.3).abs() < 1e-4);
        assert!((center[1] - 0.09).abs() < 1e-4);
    }

    #[test]
    fn blur_weights_are_normalized() {
        let sum = BLUR_WEIGHTS[0] + 2.0 * BLUR_WEIGHTS[1] + 2.0 * BLUR_WEIGHTS[2];
        assert!((sum - 1.0).abs() < 1e-4);
    }
}
