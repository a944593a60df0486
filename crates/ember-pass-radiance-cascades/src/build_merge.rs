//! Cascade build-and-merge pass: clears the arena, then walks levels from
//! coarsest to finest, each dispatch marching its ray interval and folding
//! in the already-built upper level.

use ember_core::gpu::{
    bgl_depth_texture, bgl_sampler, bgl_storage_tex_write, bgl_texture2d, bgl_texture3d,
    bgl_uniform, dummy_texture_2d, dummy_texture_3d, linear_sampler,
};
use ember_core::{RenderType, Result, Viewport};
use ember_graph::{
    PassContext, PassResourceBuilder, RenderPass, ResourceHandle, ResourcePool, TextureSpec,
};
use ember_pass_hiz::hiz_depth_handle;
use ember_pass_variance_depth::variance_depth_handle;

use crate::layout::{CascadeLayout, CASCADE_LEVELS};
use crate::uniforms::CascadeUniforms;

pub const CASCADE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Pool handle for the two-layer cascade arena.
pub fn cascade_arena_handle() -> ResourceHandle {
    ResourceHandle::named("cascade_arena")
}

pub struct RadianceCascadesPass {
    build_pipeline: Option<wgpu::ComputePipeline>,
    clear_pipeline: Option<wgpu::ComputePipeline>,
    build_bgl: wgpu::BindGroupLayout,
    clear_bgl: wgpu::BindGroupLayout,
    /// One uniform buffer per level so every dispatch in the frame keeps its
    /// own parameters.
    level_uniforms: Vec<wgpu::Buffer>,
    linear_clamp: wgpu::Sampler,
    dummy_upper: wgpu::TextureView,
    dummy_volume: wgpu::TextureView,
    layout: Option<CascadeLayout>,
    warned_missing: bool,
}

impl RadianceCascadesPass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cascades_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/cascades.wgsl").into()),
        });
        let clear_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cascades_clear_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/clear.wgsl").into()),
        });

        let build_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cascades_build_bgl"),
            entries: &[
                bgl_uniform(0, wgpu::ShaderStages::COMPUTE),
                bgl_texture2d(1, wgpu::ShaderStages::COMPUTE, true),
                bgl_depth_texture(2, wgpu::ShaderStages::COMPUTE),
                bgl_texture2d(3, wgpu::ShaderStages::COMPUTE, false),
                bgl_texture2d(4, wgpu::ShaderStages::COMPUTE, false),
                bgl_texture2d(5, wgpu::ShaderStages::COMPUTE, true),
                bgl_storage_tex_write(6, wgpu::ShaderStages::COMPUTE, CASCADE_FORMAT),
                bgl_sampler(7, wgpu::ShaderStages::COMPUTE),
                bgl_texture3d(8, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let clear_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cascades_clear_bgl"),
            entries: &[bgl_storage_tex_write(0, wgpu::ShaderStages::COMPUTE, CASCADE_FORMAT)],
        });

        let build_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&build_bgl],
            push_constant_ranges: &[],
        });
        let clear_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&clear_bgl],
            push_constant_ranges: &[],
        });

        let build_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("cascades_render_and_merge"),
            layout: Some(&build_layout),
            module: &shader,
            entry_point: "render_and_merge",
            compilation_options: Default::default(),
            cache: None,
        });
        let clear_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("cascades_clear"),
            layout: Some(&clear_layout),
            module: &clear_shader,
            entry_point: "clear_cascade",
            compilation_options: Default::default(),
            cache: None,
        });

        let level_uniforms = (0..CASCADE_LEVELS)
            .map(|level| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("cascade_uniforms_l{level}")),
                    size: std::mem::size_of::<CascadeUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        Self {
            build_pipeline: Some(build_pipeline),
            clear_pipeline: Some(clear_pipeline),
            build_bgl,
            clear_bgl,
            level_uniforms,
            linear_clamp: linear_sampler(device, "cascades_linear_clamp"),
            dummy_upper: dummy_texture_2d(device, queue, "cascades_dummy_upper"),
            dummy_volume: dummy_texture_3d(device, queue, "cascades_dummy_volume"),
            layout: None,
            warned_missing: false,
        }
    }
}

impl RenderPass for RadianceCascadesPass {
    fn name(&self) -> &str {
        "radiance_cascades"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder
            .reads(hiz_depth_handle())
            .reads(variance_depth_handle())
            .writes(cascade_arena_handle());
    }

    fn prepare(&mut self, device: &wgpu::Device, pool: &mut ResourcePool, viewport: Viewport) -> Result<()> {
        let layout = CascadeLayout::new(viewport);
        pool.ensure(
            device,
            cascade_arena_handle(),
            TextureSpec {
                label: "cascade_arena",
                width: layout.base_width,
                height: layout.base_height,
                mip_level_count: 1,
                array_layers: 2,
                format: CASCADE_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            },
        );
        self.layout = Some(layout);
        Ok(())
    }

    fn record(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (Some(build), Some(clear)) = (self.build_pipeline.as_ref(), self.clear_pipeline.as_ref())
        else {
            if !self.warned_missing {
                log::warn!("radiance_cascades: kernel unavailable, skipping");
                self.warned_missing = true;
            }
            return Ok(());
        };
        let Some(layout) = self.layout else {
            return Ok(());
        };
        let (Some(arena), Some(hiz), Some(variance)) = (
            ctx.pool.get(cascade_arena_handle()),
            ctx.pool.get(hiz_depth_handle()),
            ctx.pool.get(variance_depth_handle()),
        ) else {
            return Ok(());
        };

        // The march samples the pre-blurred color when the host provides one.
        let radiance_view = ctx.frame.blurred_color.unwrap_or(ctx.frame.color);
        let volume_march =
            ctx.settings.render_type == RenderType::Rc3d && ctx.frame.scene_volume.is_some();
        let volume_view = ctx.frame.scene_volume.unwrap_or(&self.dummy_volume);

        // Both layers cleared up front so stale texels from the previous
        // frame never leak through partially covered probe blocks.
        for layer in &arena.layer_views {
            let bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("cascades_clear_bg"),
                layout: &self.clear_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(layer),
                }],
            });
            let mut pass = ctx.begin_compute_pass("cascades_clear");
            pass.set_pipeline(clear);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups(
                (layout.base_width + 7) / 8,
                (layout.base_height + 7) / 8,
                1,
            );
        }

        // Coarse to fine; level l + 1 is complete before level l samples it.
        for level in (0..CASCADE_LEVELS).rev() {
            let has_upper = level + 1 < CASCADE_LEVELS;
            let columns = if ctx.settings.render_type == RenderType::DirectionFirst && level == 0 {
                2
            } else {
                1
            };

            let uniforms = CascadeUniforms::new(
                &layout,
                ctx.frame.viewport,
                ctx.frame.camera,
                ctx.settings,
                level,
                columns,
                volume_march,
                has_upper,
            );
            ctx.queue.write_buffer(
                &self.level_uniforms[level as usize],
                0,
                bytemuck::bytes_of(&uniforms),
            );

            let upper_view = if has_upper {
                &arena.layer_views[CascadeLayout::level_layer(level + 1) as usize]
            } else {
                &self.dummy_upper
            };
            let out_view = &arena.layer_views[CascadeLayout::level_layer(level) as usize];

            let bg = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("cascades_build_bg"),
                layout: &self.build_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.level_uniforms[level as usize].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(radiance_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(ctx.frame.depth),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&hiz.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(&variance.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::TextureView(upper_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: wgpu::BindingResource::TextureView(out_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 7,
                        resource: wgpu::BindingResource::Sampler(&self.linear_clamp),
                    },
                    wgpu::BindGroupEntry {
                        binding: 8,
                        resource: wgpu::BindingResource::TextureView(volume_view),
                    },
                ],
            });

            let (extent_x, extent_y) = layout.level_extent(level);
            let groups_x = ((extent_x + columns * 8 - 1) / (columns * 8)).max(1);
            let groups_y = ((extent_y + 7) / 8).max(1);
            let mut pass = ctx.begin_compute_pass("cascades_build");
            pass.set_pipeline(build);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        Ok(())
    }
}
