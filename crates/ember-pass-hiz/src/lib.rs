//! Hi-Z depth pass: folds the camera depth buffer into a half-resolution
//! mip pyramid of conservative (min, max) depth pairs. The cascade kernel
//! uses it to skip empty intervals while ray marching.

pub mod cpu;

use ember_core::gpu::{bgl_depth_texture, bgl_storage_tex_write, bgl_texture2d};
use ember_core::{Result, Viewport};
use ember_graph::{PassContext, PassResourceBuilder, RenderPass, ResourceHandle, ResourcePool, TextureSpec};

pub const HIZ_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;

/// Pool handle for the min/max depth pyramid.
pub fn hiz_depth_handle() -> ResourceHandle {
    ResourceHandle::named("hiz_min_max_depth")
}

pub struct HiZDepthPass {
    base_pipeline: Option<wgpu::ComputePipeline>,
    reduce_pipeline: Option<wgpu::ComputePipeline>,
    base_bgl: wgpu::BindGroupLayout,
    reduce_bgl: wgpu::BindGroupLayout,
    warned_missing: bool,
}

impl HiZDepthPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hiz_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/hiz.wgsl").into()),
        });

        let base_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hiz_base_bgl"),
            entries: &[
                bgl_depth_texture(0, wgpu::ShaderStages::COMPUTE),
                bgl_storage_tex_write(2, wgpu::ShaderStages::COMPUTE, HIZ_FORMAT),
            ],
        });
        let reduce_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hiz_reduce_bgl"),
            entries: &[
                bgl_texture2d(1, wgpu::ShaderStages::COMPUTE, false),
                bgl_storage_tex_write(2, wgpu::ShaderStages::COMPUTE, HIZ_FORMAT),
            ],
        });

        let base_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&base_bgl],
            push_constant_ranges: &[],
        });
        let reduce_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&reduce_bgl],
            push_constant_ranges: &[],
        });

        let base_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("hiz_build_base"),
            layout: Some(&base_layout),
            module: &shader,
            entry_point: "build_base",
            compilation_options: Default::default(),
            cache: None,
        });
        let reduce_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("hiz_reduce"),
            layout: Some(&reduce_layout),
            module: &shader,
            entry_point: "reduce",
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            base_pipeline: Some(base_pipeline),
            reduce_pipeline: Some(reduce_pipeline),
            base_bgl,
            reduce_bgl,
            warned_missing: false,
        }
    }
}

impl RenderPass for HiZDepthPass {
    fn name(&self) -> &str {
        "hiz_depth"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.writes(hiz_depth_handle());
    }

    fn prepare(&mut self, device: &wgpu::Device, pool: &mut ResourcePool, viewport: Viewport) -> Result<()> {
        let half = viewport.half();
        pool.ensure(
            device,
            hiz_depth_handle(),
            TextureSpec {
                label: "hiz_min_max_depth",
                width: half.width,
                height: half.height,
                mip_level_count: half.mip_level_count(),
                array_layers: 1,
                format: HIZ_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            },
        );
        Ok(())
    }

    fn record(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (Some(base), Some(reduce)) = (self.base_pipeline.as_ref(), self.reduce_pipeline.as_ref())
        else {
            // Degrade to a no-op for this frame; downstream tolerates a
            // stale pyramid.
            if !self.warned_missing {
                log::warn!("hiz_depth: kernel unavailable, skipping");
                self.warned_missing = true;
            }
            return Ok(());
        };
        let Some(pyramid) = ctx.pool.get(hiz_depth_handle()) else {
            return Ok(());
        };

        // Base level: full-res depth -> half-res (min, max).
        let base_bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hiz_base_bg"),
            layout: &self.base_bgl,
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
            let mut pass = ctx.begin_compute_pass("hiz_base");
            pass.set_pipeline(base);
            pass.set_bind_group(0, &base_bg, &[]);
            pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
        }

        // Mip chain, strictly sequential: mip k is complete before mip k+1
        // reads it. One compute pass per step keeps the ordering explicit.
        for mip in 1..pyramid.spec.mip_level_count {
            let bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("hiz_reduce_bg"),
                layout: &self.reduce_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(
                            &pyramid.mip_views[(mip - 1) as usize],
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&pyramid.mip_views[mip as usize]),
                    },
                ],
            });
            let (w, h) = pyramid.mip_size(mip);
            let mut pass = ctx.begin_compute_pass("hiz_reduce");
            pass.set_pipeline(reduce);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
        }
        Ok(())
    }
}
