//! Ember: screen-space global illumination with radiance cascades on wgpu.
//!
//! The pipeline consumes the host renderer's color and depth each frame,
//! folds depth into Hi-Z and variance pyramids, builds a hierarchy of
//! radiance probes coarse to fine, and either composites an upsampled
//! irradiance image back onto the scene or emits a compact per-probe
//! spherical-harmonics buffer.
//!
//! ```no_run
//! # fn demo(device: &wgpu::Device, queue: &wgpu::Queue,
//! #         color: &wgpu::TextureView, depth: &wgpu::TextureView) -> ember::Result<()> {
//! let settings = ember::RadianceSettings::new()
//!     .with_sky_radiance([0.3, 0.5, 0.9]);
//! let mut pipeline = ember::RadianceCascadesPipeline::new(
//!     device, queue, wgpu::TextureFormat::Rgba16Float, settings)?;
//!
//! let camera = ember::Camera::new_perspective(1.2, 16.0 / 9.0, 0.1, 1000.0);
//! let mut encoder = device.create_command_encoder(&Default::default());
//! pipeline.frame(device, queue, &mut encoder, &ember::FrameInputs {
//!     viewport: ember::Viewport::new(1920, 1080),
//!     camera: &camera,
//!     color,
//!     depth,
//!     normals: None,
//!     blurred_color: None,
//!     scene_volume: None,
//! })?;
//! queue.submit([encoder.finish()]);
//! # Ok(())
//! # }
//! ```

mod pipeline;

pub use ember_core::{
    Camera, EmberError, FrameInputs, OutputMode, RadianceSettings, RenderType, Result, Viewport,
};
pub use ember_pass_hiz::hiz_depth_handle;
pub use ember_pass_radiance_cascades::{
    cascade_arena_handle, irradiance_handle, sh_output_handle, CascadeLayout, CASCADE_LEVELS,
};
pub use ember_pass_variance_depth::variance_depth_handle;
pub use pipeline::RadianceCascadesPipeline;

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Result as EmberResult;
    use ember_graph::{PassContext, PassResourceBuilder, RenderGraph, RenderPass, ResourceHandle};

    fn init_test_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // Stand-ins declaring the real pass handles, so the wiring between the
    // production handle functions is checked without a GPU device.
    struct DeclaredPass {
        name: &'static str,
        reads: Vec<ResourceHandle>,
        writes: Vec<ResourceHandle>,
    }

    impl RenderPass for DeclaredPass {
        fn name(&self) -> &str {
            self.name
        }

        fn declare_resources(&self, builder: &mut PassResourceBuilder) {
            for &r in &self.reads {
                builder.reads(r);
            }
            for &w in &self.writes {
                builder.writes(w);
            }
        }

        fn record(&mut self, _ctx: &mut PassContext) -> EmberResult<()> {
            Ok(())
        }
    }

    fn production_graph() -> RenderGraph {
        let mut graph = RenderGraph::new();
        // Registered deliberately out of dependency order.
        graph.add_pass(DeclaredPass {
            name: "cascade_combine",
            reads: vec![cascade_arena_handle()],
            writes: vec![irradiance_handle()],
        });
        graph.add_pass(DeclaredPass {
            name: "radiance_cascades",
            reads: vec![hiz_depth_handle(), variance_depth_handle()],
            writes: vec![cascade_arena_handle()],
        });
        graph.add_pass(DeclaredPass {
            name: "sh_combine",
            reads: vec![cascade_arena_handle()],
            writes: vec![sh_output_handle()],
        });
        graph.add_pass(DeclaredPass {
            name: "hiz_depth",
            reads: vec![],
            writes: vec![hiz_depth_handle()],
        });
        graph.add_pass(DeclaredPass {
            name: "variance_depth",
            reads: vec![],
            writes: vec![variance_depth_handle()],
        });
        graph
    }

    #[test]
    fn pyramids_run_before_cascades_and_outputs_last() {
        init_test_logging();
        let mut graph = production_graph();
        graph.build().unwrap();
        let order = graph.execution_order();
        let pos = |name: &str| order.iter().position(|&n| n == name).unwrap();
        assert!(pos("hiz_depth") < pos("radiance_cascades"));
        assert!(pos("variance_depth") < pos("radiance_cascades"));
        assert!(pos("radiance_cascades") < pos("cascade_combine"));
        assert!(pos("radiance_cascades") < pos("sh_combine"));
    }

    #[test]
    fn settings_builder_round_trips_through_reexport() {
        init_test_logging();
        let settings = RadianceSettings::new()
            .with_render_type(RenderType::Rc2d)
            .with_output_mode(OutputMode::SphericalHarmonics)
            .with_upsample_tolerance(0.05)
            .with_noise_filter_strength(0.7);
        assert_eq!(settings.render_type, RenderType::Rc2d);
        assert_eq!(settings.output_mode, OutputMode::SphericalHarmonics);
        assert_eq!(settings.upsample_tolerance, 0.05);
        assert_eq!(settings.noise_filter_strength, 0.7);
    }
}
