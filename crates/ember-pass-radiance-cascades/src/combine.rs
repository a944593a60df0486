//! Bilateral combine/upsample of the finest cascade level, followed by a
//! fullscreen composite onto the host's color target. Runs only in
//! `OutputMode::Upsampled`.

use ember_core::gpu::{
    bgl_depth_texture, bgl_sampler, bgl_storage_tex_write, bgl_texture2d, bgl_uniform,
    dummy_texture_2d, linear_sampler,
};
use ember_core::{OutputMode, Result, Viewport};
use ember_graph::{
    PassContext, PassResourceBuilder, RenderPass, ResourceHandle, ResourcePool, TextureSpec,
};

use crate::build_merge::{cascade_arena_handle, CASCADE_FORMAT};
use crate::layout::CascadeLayout;
use crate::uniforms::CombineUniforms;

/// Pool handle for the full-resolution irradiance intermediate.
pub fn irradiance_handle() -> ResourceHandle {
    ResourceHandle::named("cascade_irradiance")
}

pub struct CascadeCombinePass {
    upsample_pipeline: Option<wgpu::ComputePipeline>,
    composite_pipeline: Option<wgpu::RenderPipeline>,
    upsample_bgl: wgpu::BindGroupLayout,
    composite_bgl: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    linear_clamp: wgpu::Sampler,
    dummy_normals: wgpu::TextureView,
    warned_missing: bool,
}

impl CascadeCombinePass {
    /// `color_format` is the format of the host's color target the composite
    /// blends onto.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("combine_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/combine.wgsl").into()),
        });

        let upsample_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("combine_upsample_bgl"),
            entries: &[
                bgl_uniform(0, wgpu::ShaderStages::COMPUTE),
                bgl_texture2d(1, wgpu::ShaderStages::COMPUTE, true),
                bgl_depth_texture(2, wgpu::ShaderStages::COMPUTE),
                bgl_texture2d(3, wgpu::ShaderStages::COMPUTE, true),
                bgl_storage_tex_write(4, wgpu::ShaderStages::COMPUTE, CASCADE_FORMAT),
            ],
        });
        let composite_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("combine_composite_bgl"),
            entries: &[
                bgl_uniform(0, wgpu::ShaderStages::FRAGMENT),
                bgl_texture2d(5, wgpu::ShaderStages::FRAGMENT, true),
                bgl_sampler(6, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let upsample_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&upsample_bgl],
            push_constant_ranges: &[],
        });
        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&composite_bgl],
            push_constant_ranges: &[],
        });

        let upsample_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("combine_upsample"),
            layout: Some(&upsample_layout),
            module: &shader,
            entry_point: "combine_upsample",
            compilation_options: Default::default(),
            cache: None,
        });

        // Alpha-driven blend: alpha 0 adds irradiance onto the scene color,
        // alpha 1 (debug view) replaces it.
        let composite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("combine_composite"),
            layout: Some(&composite_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "composite_vs",
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "composite_fs",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::Zero,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("combine_uniforms"),
            size: std::mem::size_of::<CombineUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            upsample_pipeline: Some(upsample_pipeline),
            composite_pipeline: Some(composite_pipeline),
            upsample_bgl,
            composite_bgl,
            uniforms,
            linear_clamp: linear_sampler(device, "combine_linear_clamp"),
            dummy_normals: dummy_texture_2d(device, queue, "combine_dummy_normals"),
            warned_missing: false,
        }
    }
}

impl RenderPass for CascadeCombinePass {
    fn name(&self) -> &str {
        "cascade_combine"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.reads(cascade_arena_handle()).writes(irradiance_handle());
    }

    fn prepare(&mut self, device: &wgpu::Device, pool: &mut ResourcePool, viewport: Viewport) -> Result<()> {
        pool.ensure(
            device,
            irradiance_handle(),
            TextureSpec::color_target("cascade_irradiance", viewport.width, viewport.height),
        );
        Ok(())
    }

    fn record(&mut self, ctx: &mut PassContext) -> Result<()> {
        if ctx.settings.output_mode != OutputMode::Upsampled {
            return Ok(());
        }
        let (Some(upsample), Some(composite)) =
            (self.upsample_pipeline.as_ref(), self.composite_pipeline.as_ref())
        else {
            if !self.warned_missing {
                log::warn!("cascade_combine: kernel unavailable, skipping");
                self.warned_missing = true;
            }
            return Ok(());
        };
        let (Some(arena), Some(irradiance)) =
            (ctx.pool.get(cascade_arena_handle()), ctx.pool.get(irradiance_handle()))
        else {
            return Ok(());
        };

        let layout = CascadeLayout::new(ctx.frame.viewport);
        let uniforms = CombineUniforms::new(&layout, ctx.frame.viewport, ctx.settings);
        ctx.queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let normals_view = ctx.frame.normals.unwrap_or(&self.dummy_normals);
        // Level 0 always lands in layer 0 of the arena.
        let level0_view = &arena.layer_views[CascadeLayout::level_layer(0) as usize];

        let upsample_bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("combine_upsample_bg"),
            layout: &self.upsample_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(level0_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(ctx.frame.depth),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(normals_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&irradiance.view),
                },
            ],
        });
        {
            let (w, h) = (ctx.frame.viewport.width, ctx.frame.viewport.height);
            let mut pass = ctx.begin_compute_pass("combine_upsample");
            pass.set_pipeline(upsample);
            pass.set_bind_group(0, &upsample_bg, &[]);
            pass.dispatch_workgroups((w + 7) / 8, (h + 7) / 8, 1);
        }

        let composite_bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("combine_composite_bg"),
            layout: &self.composite_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&self.linear_clamp),
                },
            ],
        });
        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("combine_composite"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: ctx.frame.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(composite);
        pass.set_bind_group(0, &composite_bg, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}
