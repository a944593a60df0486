//! CPU reference implementations of the combine and SH kernels, kept in
//! lockstep with the WGSL so the weighting and projection math is testable
//! without a GPU device.

pub const WEIGHT_FLOOR: f32 = 1e-6;

const Y00: f32 = 0.282095;
const Y1: f32 = 0.488603;

/// Bilinear footprint weights for a fractional position inside a probe cell.
pub fn bilinear_weights(f: [f32; 2]) -> [f32; 4] {
    [
        (1.0 - f[0]) * (1.0 - f[1]),
        f[0] * (1.0 - f[1]),
        (1.0 - f[0]) * f[1],
        f[0] * f[1],
    ]
}

/// Gaussian depth affinity between a pixel and a probe center.
pub fn depth_affinity(pixel_depth: f32, probe_depth: f32, tolerance: f32) -> f32 {
    let delta = pixel_depth - probe_depth;
    (-(delta * delta) / (2.0 * tolerance * tolerance)).exp()
}

/// Walk one ray interval the way the cascade kernel does and return the
/// pixel distance the march's last step reaches. Step size is the interval
/// length over the step budget, floored at one pixel; the march stops at
/// the interval end so each level covers exactly its own radial band.
pub fn march_span(ray_offset_px: f32, ray_length_px: f32, max_steps: u32) -> f32 {
    let ray_end = ray_offset_px + ray_length_px;
    let dt = (ray_length_px / max_steps as f32).max(1.0);
    let mut t = ray_offset_px;
    for _ in 0..max_steps {
        if t >= ray_end {
            break;
        }
        t += dt;
    }
    t
}

/// Resolve one output pixel from its four surrounding probes.
///
/// Mirrors `combine_upsample`: bilinear times depth affinity, a weight
/// floor that falls back to the nearest probe instead of dividing by a
/// vanishing sum, and a final blend toward the nearest-probe value
/// controlled by `noise_filter_strength`.
pub fn resolve_pixel(
    pixel_depth: f32,
    probe_irradiance: [[f32; 3]; 4],
    probe_depths: [f32; 4],
    frac: [f32; 2],
    tolerance: f32,
    noise_filter_strength: f32,
) -> [f32; 3] {
    let bilinear = bilinear_weights(frac);

    let mut weight_sum = 0.0;
    let mut filtered = [0.0f32; 3];
    let mut nearest_weight = -1.0;
    let mut nearest = [0.0f32; 3];
    for i in 0..4 {
        let w = bilinear[i] * depth_affinity(pixel_depth, probe_depths[i], tolerance);
        weight_sum += w;
        for c in 0..3 {
            filtered[c] += w * probe_irradiance[i][c];
        }
        if bilinear[i] > nearest_weight {
            nearest_weight = bilinear[i];
            nearest = probe_irradiance[i];
        }
    }

    let bilateral = if weight_sum < WEIGHT_FLOOR {
        nearest
    } else {
        [
            filtered[0] / weight_sum,
            filtered[1] / weight_sum,
            filtered[2] / weight_sum,
        ]
    };

    let s = noise_filter_strength;
    [
        bilateral[0] * (1.0 - s) + nearest[0] * s,
        bilateral[1] * (1.0 - s) + nearest[1] * s,
        bilateral[2] * (1.0 - s) + nearest[2] * s,
    ]
}

/// Project a probe's direction fan into L1 spherical harmonics. Directions
/// are the evenly spaced planar fan the cascade kernel marched; coefficient
/// order is (Y00, Y1-1, Y10, Y11), matching the output array layers.
pub fn project_sh_l1(radiance: &[[f32; 3]]) -> [[f32; 3]; 4] {
    let n = radiance.len().max(1) as f32;
    let norm = 2.0 * std::f32::consts::PI / n;
    let mut coeffs = [[0.0f32; 3]; 4];
    for (i, sample) in radiance.iter().enumerate() {
        let theta = 2.0 * std::f32::consts::PI * (i as f32 + 0.5) / n;
        let dir = [theta.cos(), theta.sin(), 0.0f32];
        let basis = [Y00, Y1 * dir[1], Y1 * dir[2], Y1 * dir[0]];
        for (k, b) in basis.iter().enumerate() {
            for c in 0..3 {
                coeffs[k][c] += sample[c] * b * norm;
            }
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CascadeLayout, CASCADE_LEVELS, MARCH_MAX_STEPS, PROBE_CELL};

    const GRAY: [[f32; 3]; 4] = [[0.5; 3]; 4];

    #[test]
    fn march_stops_at_each_interval_end() {
        // Every level's march must reach exactly the end of its own radial
        // band; overshooting would re-cover pixels the upper level owns.
        for level in 0..CASCADE_LEVELS {
            let offset = CascadeLayout::ray_origin_offset(level) * PROBE_CELL as f32;
            let length = CascadeLayout::ray_length(level) * PROBE_CELL as f32;
            let end = march_span(offset, length, MARCH_MAX_STEPS);
            assert!(
                (end - (offset + length)).abs() < 1e-2,
                "level {level}: marched to {end} px, interval ends at {} px",
                offset + length
            );
        }
    }

    #[test]
    fn march_with_clamped_step_still_honors_interval_end() {
        // A short interval with a large budget hits the 1 px step floor; the
        // break keeps it from walking the whole budget.
        let end = march_span(0.0, 8.0, MARCH_MAX_STEPS);
        assert!((end - 8.0).abs() < 1e-4, "marched to {end} px past an 8 px interval");
    }

    #[test]
    fn uniform_probes_resolve_to_their_value() {
        let out = resolve_pixel(0.5, GRAY, [0.5; 4], [0.25, 0.75], 0.1, 1.0);
        for c in out {
            assert!((c - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn collapsed_weights_fall_back_to_nearest_probe() {
        // Every probe sits across a deep depth discontinuity; the weight sum
        // underflows and the output must still be finite.
        let irr = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]];
        let out = resolve_pixel(0.0, irr, [1.0; 4], [0.1, 0.1], 1e-4, 0.0);
        for c in out {
            assert!(c.is_finite());
        }
        // frac (0.1, 0.1) makes probe 0 the nearest.
        assert_eq!(out, irr[0]);
    }

    #[test]
    fn depth_mismatch_rejects_a_probe() {
        // Probe 1 is across an edge; its red must not bleed into the result.
        let irr = [[0.0; 3], [10.0, 0.0, 0.0], [0.0; 3], [0.0; 3]];
        let out = resolve_pixel(0.2, irr, [0.2, 0.9, 0.2, 0.2], [0.5, 0.5], 1e-3, 0.0);
        assert!(out[0] < 0.01, "rejected probe leaked: {}", out[0]);
    }

    #[test]
    fn cross_edge_weights_vanish_with_tight_tolerance() {
        // Weight matrix directly: probes 1 and 3 sit across a depth edge.
        let bilinear = bilinear_weights([0.5, 0.5]);
        let probe_depths = [0.2, 0.8, 0.2, 0.8];
        let weights: Vec<f32> = (0..4)
            .map(|i| bilinear[i] * depth_affinity(0.2, probe_depths[i], 1e-3))
            .collect();
        assert!(weights[1] < 1e-6);
        assert!(weights[3] < 1e-6);
        assert!(weights[0] > 0.1);
        assert!(weights[2] > 0.1);
    }

    #[test]
    fn zero_noise_filter_strength_keeps_bilateral_result() {
        let irr = [[1.0; 3], [0.0; 3], [0.0; 3], [0.0; 3]];
        let out = resolve_pixel(0.5, irr, [0.5; 4], [0.5, 0.5], 0.1, 0.0);
        // Equal depths at the cell center: plain bilinear average.
        for c in out {
            assert!((c - 0.25).abs() < 1e-5);
        }
    }

    #[test]
    fn full_noise_filter_strength_returns_nearest_probe() {
        let irr = [[1.0; 3], [0.0; 3], [0.0; 3], [0.0; 3]];
        let out = resolve_pixel(0.5, irr, [0.5; 4], [0.1, 0.1], 0.1, 1.0);
        assert_eq!(out, irr[0]);
    }

    #[test]
    fn resolve_is_deterministic() {
        let irr = [[0.3, 0.1, 0.9], [0.2, 0.4, 0.6], [0.8, 0.5, 0.1], [0.0, 0.7, 0.3]];
        let depths = [0.31, 0.33, 0.35, 0.37];
        let a = resolve_pixel(0.32, irr, depths, [0.4, 0.6], 0.05, 0.5);
        let b = resolve_pixel(0.32, irr, depths, [0.4, 0.6], 0.05, 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn bilinear_weights_partition_unity() {
        let w = bilinear_weights([0.3, 0.8]);
        let sum: f32 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constant_field_projects_to_dc_only() {
        let field = vec![[1.0f32, 1.0, 1.0]; 64];
        let coeffs = project_sh_l1(&field);
        let expected_dc = Y00 * 2.0 * std::f32::consts::PI;
        for c in 0..3 {
            assert!((coeffs[0][c] - expected_dc).abs() < 1e-3);
            // Directional coefficients cancel over a full even fan.
            assert!(coeffs[1][c].abs() < 1e-3);
            assert!(coeffs[2][c].abs() < 1e-3);
            assert!(coeffs[3][c].abs() < 1e-3);
        }
    }

    #[test]
    fn one_sided_field_has_directional_response() {
        // Radiance only from directions with positive x: Y11 must pick up a
        // positive lobe while the planar fan leaves Y10 (z axis) at zero.
        let field: Vec<[f32; 3]> = (0..64)
            .map(|i| {
                let theta = 2.0 * std::f32::consts::PI * (i as f32 + 0.5) / 64.0;
                if theta.cos() > 0.0 { [1.0; 3] } else { [0.0; 3] }
            })
            .collect();
        let coeffs = project_sh_l1(&field);
        assert!(coeffs[3][0] > 0.1);
        assert!(coeffs[2][0].abs() < 1e-3);
    }
}
