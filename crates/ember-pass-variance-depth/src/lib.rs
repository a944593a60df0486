//! Variance depth pass: converts raw depth into a blurred two-moment
//! (d, d^2) pyramid. Raw depth is too discontinuous for safe bilateral
//! reconstruction; the blurred moments bound ray-march self-intersection
//! error and drive the combine stage's confidence weighting.

pub mod cpu;

use ember_core::gpu::{bgl_depth_texture, bgl_storage_tex_write, bgl_texture2d};
use ember_core::{Result, Viewport};
use ember_graph::{PassContext, PassResourceBuilder, RenderPass, ResourceHandle, ResourcePool, TextureSpec};

pub const VARIANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;

/// Pool handle for the blurred moments pyramid.
pub fn variance_depth_handle() -> ResourceHandle {
    ResourceHandle::named("variance_depth")
}

/// Pool handle for the blur scratch target.
pub fn variance_scratch_handle() -> ResourceHandle {
    ResourceHandle::named("variance_depth_scratch")
}

struct Pipelines {
    moments: wgpu::ComputePipeline,
    downsample: wgpu::ComputePipeline,
    blur_vertical: wgpu::ComputePipeline,
    blur_horizontal: wgpu::ComputePipeline,
}

pub struct VarianceDepthPass {
    pipelines: Option<Pipelines>,
    moments_bgl: wgpu::BindGroupLayout,
    resample_bgl: wgpu::BindGroupLayout,
    warned_missing: bool,
}

impl VarianceDepthPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("variance_depth_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/variance_depth.wgsl").into()),
        });

        let moments_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("variance_moments_bgl"),
            entries: &[
                bgl_depth_texture(0, wgpu::ShaderStages::COMPUTE),
                bgl_storage_tex_write(2, wgpu::ShaderStages::COMPUTE, VARIANCE_FORMAT),
            ],
        });
        let resample_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("variance_resample_bgl"),
            entries: &[
                bgl_texture2d(1, wgpu::ShaderStages::COMPUTE, false),
                bgl_storage_tex_write(2, wgpu::ShaderStages::COMPUTE, VARIANCE_FORMAT),
            ],
        });

        let moments_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&moments_bgl],
            push_constant_ranges: &[],
        });
        let resample_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&resample_bgl],
            push_constant_ranges: &[],
        });

        let make = |label: &str, entry: &str, layout: &wgpu::PipelineLayout| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                module: &shader,
                entry_point: entry,
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let pipelines = Pipelines {
            moments: make("variance_moments", "moments", &moments_layout),
            downsample: make("variance_downsample", "downsample", &resample_layout),
            blur_vertical: make("variance_blur_v", "blur_vertical", &resample_layout),
            blur_horizontal: make("variance_blur_h", "blur_horizontal", &resample_layout),
        };

        Self {
            pipelines: Some(pipelines),
            moments_bgl,
            resample_bgl,
            warned_missing: false,
        }
    }

    fn resample_bind_group(
        &self,
        device: &wgpu::Device,
        src: &wgpu::TextureView,
        dst: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("variance_resample_bg"),
            layout: &self.resample_bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(src) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(dst) },
            ],
        })
    }
}

impl RenderPass for VarianceDepthPass {
    fn name(&self) -> &str {
        "variance_depth"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.writes(variance_depth_handle());
        builder.writes(variance_scratch_handle());
    }

    fn prepare(&mut self, device: &wgpu::Device, pool: &mut ResourcePool, viewport: Viewport) -> Result<()> {
        let half = viewport.half();
        let spec = |label: &'static str| TextureSpec {
            label,
            width: half.width,
            height: half.height,
            mip_level_count: half.mip_level_count(),
            array_layers: 1,
            format: VARIANCE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        };
        pool.ensure(device, variance_depth_handle(), spec("variance_depth"));
        pool.ensure(device, variance_scratch_handle(), spec("variance_depth_scratch"));
        Ok(())
    }

    fn record(&mut self, ctx: &mut PassContext) -> Result<()> {
        let Some(pipelines) = self.pipelines.as_ref() else {
            if !self.warned_missing {
                log::warn!("variance_depth: kernel unavailable, skipping");
                self.warned_missing = true;
            }
            return Ok(());
        };
        let (Some(pyramid), Some(scratch)) = (
            ctx.pool.get(variance_depth_handle()),
            ctx.pool.get(variance_scratch_handle()),
        ) else {
            return Ok(());
        };

        // Moments pass: depth -> (d, d^2) at half resolution.
        let moments_bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("variance_moments_bg"),
            layout: &self.moments_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(ctx.frame.depth),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&pyramid.mip_views[0]),
                },
            ],
        });
        {
            let (w, h) = pyramid.mip_size(0);
            let mut pass = ctx.begin_compute_pass("variance_moments");
            pass.set_pipeline(&pipelines.moments);
            pass.set_bind_group(0, &moments_bg, &[]);
            pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
        }

        // Mip chain over the moments, sequential.
        for mip in 1..pyramid.spec.mip_level_count {
            let bg = self.resample_bind_group(
                ctx.device,
                &pyramid.mip_views[(mip - 1) as usize],
                &pyramid.mip_views[mip as usize],
            );
            let (w, h) = pyramid.mip_size(mip);
            let mut pass = ctx.begin_compute_pass("variance_downsample");
            pass.set_pipeline(&pipelines.downsample);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
        }

        // Per-mip separable blur: vertical into scratch, horizontal back.
        // Each level blurs at its own resolution.
        for mip in 0..pyramid.spec.mip_level_count {
            let (w, h) = pyramid.mip_size(mip);
            let vertical = self.resample_bind_group(
                ctx.device,
                &pyramid.mip_views[mip as usize],
                &scratch.mip_views[mip as usize],
            );
            {
                let mut pass = ctx.begin_compute_pass("variance_blur_v");
                pass.set_pipeline(&pipelines.blur_vertical);
                pass.set_bind_group(0, &vertical, &[]);
                pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
            }
            let horizontal = self.resample_bind_group(
                ctx.device,
                &scratch.mip_views[mip as usize],
                &pyramid.mip_views[mip as usize],
            );
            {
                let mut pass = ctx.begin_compute_pass("variance_blur_h");
                pass.set_pipeline(&pipelines.blur_horizontal);
                pass.set_bind_group(0, &horizontal, &[]);
                pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
            }
        }
        Ok(())
    }
}
