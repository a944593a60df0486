//! Spherical-harmonics combine: folds the finest cascade level into a
//! compact 4-coefficient L1 SH buffer for hosts that want probe lighting
//! instead of a composited image. Runs only in
//! `OutputMode::SphericalHarmonics`; nothing is drawn to the color target.

use ember_core::gpu::{bgl_texture2d, bgl_uniform};
use ember_core::{OutputMode, Result, Viewport};
use ember_graph::{
    PassContext, PassResourceBuilder, RenderPass, ResourceHandle, ResourcePool, TextureSpec,
};

use crate::build_merge::{cascade_arena_handle, CASCADE_FORMAT};
use crate::layout::CascadeLayout;
use crate::uniforms::{sh_grid, ShUniforms};

/// Pool handle for the SH output: one array layer per coefficient.
pub fn sh_output_handle() -> ResourceHandle {
    ResourceHandle::named("cascade_sh")
}

fn bgl_storage_tex_array(binding: u32, format: wgpu::TextureFormat) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format,
            view_dimension: wgpu::TextureViewDimension::D2Array,
        },
        count: None,
    }
}

pub struct ShCombinePass {
    pipeline: Option<wgpu::ComputePipeline>,
    bgl: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    warned_missing: bool,
}

impl ShCombinePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sh_combine_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sh_combine.wgsl").into()),
        });

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sh_combine_bgl"),
            entries: &[
                bgl_uniform(0, wgpu::ShaderStages::COMPUTE),
                bgl_texture2d(1, wgpu::ShaderStages::COMPUTE, true),
                bgl_storage_tex_array(2, CASCADE_FORMAT),
            ],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("sh_combine"),
            layout: Some(&layout),
            module: &shader,
            entry_point: "project_sh",
            compilation_options: Default::default(),
            cache: None,
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sh_combine_uniforms"),
            size: std::mem::size_of::<ShUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { pipeline: Some(pipeline), bgl, uniforms, warned_missing: false }
    }
}

impl RenderPass for ShCombinePass {
    fn name(&self) -> &str {
        "sh_combine"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.reads(cascade_arena_handle()).writes(sh_output_handle());
    }

    fn prepare(&mut self, device: &wgpu::Device, pool: &mut ResourcePool, viewport: Viewport) -> Result<()> {
        let layout = CascadeLayout::new(viewport);
        let (sw, sh) = sh_grid(&layout);
        pool.ensure(
            device,
            sh_output_handle(),
            TextureSpec {
                label: "cascade_sh",
                width: sw,
                height: sh,
                mip_level_count: 1,
                array_layers: 4,
                format: CASCADE_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            },
        );
        Ok(())
    }

    fn record(&mut self, ctx: &mut PassContext) -> Result<()> {
        if ctx.settings.output_mode != OutputMode::SphericalHarmonics {
            return Ok(());
        }
        let Some(pipeline) = self.pipeline.as_ref() else {
            if !self.warned_missing {
                log::warn!("sh_combine: kernel unavailable, skipping");
                self.warned_missing = true;
            }
            return Ok(());
        };
        let (Some(arena), Some(sh_out)) =
            (ctx.pool.get(cascade_arena_handle()), ctx.pool.get(sh_output_handle()))
        else {
            return Ok(());
        };

        let layout = CascadeLayout::new(ctx.frame.viewport);
        let uniforms = ShUniforms::new(&layout);
        ctx.queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sh_combine_bg"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        &arena.layer_views[CascadeLayout::level_layer(0) as usize],
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&sh_out.view),
                },
            ],
        });

        let (sw, sh) = sh_out.mip_size(0);
        let mut pass = ctx.begin_compute_pass("sh_combine");
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bg, &[]);
        pass.dispatch_workgroups((sw + 7) / 8, (sh + 7) / 8, 1);
        Ok(())
    }
}
