//! Render pass trait and execution context.

use crate::resource::{ResourceHandle, ResourcePool};
use ember_core::{FrameInputs, RadianceSettings, Result, Viewport};

/// A GPU pass in the pipeline. Ordering between passes comes from the
/// resources they declare, not from registration order.
pub trait RenderPass: Send + Sync {
    /// Unique name for this pass.
    fn name(&self) -> &str;

    /// Declare which pooled resources this pass reads and writes. Called once
    /// while building the graph.
    fn declare_resources(&self, _builder: &mut PassResourceBuilder) {}

    /// (Re)allocate this pass's pooled outputs for the current viewport.
    /// Called every frame before any recording; must compare against the held
    /// allocation and never reuse a wrongly sized buffer.
    fn prepare(&mut self, _device: &wgpu::Device, _pool: &mut ResourcePool, _viewport: Viewport) -> Result<()> {
        Ok(())
    }

    /// Record this pass's dispatches. A pass whose kernel or inputs are
    /// unavailable must degrade to a no-op, not fail the frame.
    fn record(&mut self, ctx: &mut PassContext) -> Result<()>;
}

/// Resource declarations collected from a pass.
#[derive(Default)]
pub struct PassResourceBuilder {
    pub(crate) reads: Vec<ResourceHandle>,
    pub(crate) writes: Vec<ResourceHandle>,
}

impl PassResourceBuilder {
    pub fn reads(&mut self, handle: ResourceHandle) -> &mut Self {
        self.reads.push(handle);
        self
    }

    pub fn writes(&mut self, handle: ResourceHandle) -> &mut Self {
        self.writes.push(handle);
        self
    }
}

/// Everything a pass needs while recording one frame.
pub struct PassContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub frame: &'a FrameInputs<'a>,
    pub settings: &'a RadianceSettings,
    pub pool: &'a ResourcePool,
}

impl<'a> PassContext<'a> {
    pub fn begin_compute_pass(&mut self, label: &str) -> wgpu::ComputePass {
        self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        })
    }
}
