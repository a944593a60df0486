//! The pipeline facade: owns the pass graph and every transient GPU
//! resource, and records one frame of global illumination onto a host
//! command encoder.

use ember_core::{FrameInputs, RadianceSettings, RenderType, Result};
use ember_graph::{RenderGraph, ResourcePool};
use ember_pass_hiz::HiZDepthPass;
use ember_pass_radiance_cascades::{CascadeCombinePass, RadianceCascadesPass, ShCombinePass};
use ember_pass_variance_depth::VarianceDepthPass;

/// Screen-space global illumination via radiance cascades.
///
/// Construct once per device, then call [`frame`](Self::frame) each frame
/// with the host's inputs. Pyramids and the cascade arena are pooled
/// internally and reallocated automatically when the viewport changes.
pub struct RadianceCascadesPipeline {
    settings: RadianceSettings,
    pool: ResourcePool,
    graph: RenderGraph,
    warned_no_volume: bool,
}

impl RadianceCascadesPipeline {
    /// `color_format` is the format of the color target frames will be
    /// composited onto.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        settings: RadianceSettings,
    ) -> Result<Self> {
        // Both output passes are always registered; each skips itself when
        // the current output mode selects the other, so switching modes
        // never rebuilds the graph.
        let mut graph = RenderGraph::new();
        graph.add_pass(HiZDepthPass::new(device));
        graph.add_pass(VarianceDepthPass::new(device));
        graph.add_pass(RadianceCascadesPass::new(device, queue));
        graph.add_pass(CascadeCombinePass::new(device, queue, color_format));
        graph.add_pass(ShCombinePass::new(device));
        graph.build()?;

        Ok(Self {
            settings,
            pool: ResourcePool::new(),
            graph,
            warned_no_volume: false,
        })
    }

    pub fn settings(&self) -> &RadianceSettings {
        &self.settings
    }

    /// Replace the settings for subsequent frames.
    pub fn set_settings(&mut self, settings: RadianceSettings) {
        self.settings = settings;
    }

    /// Pass names in resolved execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.graph.execution_order()
    }

    /// Record one frame of GI onto `encoder`. The host submits the encoder;
    /// nothing is submitted here.
    pub fn frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameInputs,
    ) -> Result<()> {
        if self.settings.render_type == RenderType::Rc3d && frame.scene_volume.is_none() {
            if !self.warned_no_volume {
                log::warn!("render type Rc3d without a scene volume, skipping GI");
                self.warned_no_volume = true;
            }
            return Ok(());
        }

        self.graph.prepare(device, &mut self.pool, frame.viewport)?;
        self.graph.record(device, queue, encoder, frame, &self.settings, &self.pool)?;
        Ok(())
    }

    /// Drop all pooled textures. They are recreated on the next frame.
    pub fn release_resources(&mut self) {
        self.pool.release_all();
    }
}
