use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use markerview_common::{ElementLayout, ElementSize, NodeId, SizedElement, VideoFrame};
use markerview_render::{RenderError, Renderer, RendererConfig, crop_transform, visible_rect};
use markerview_scene::{MeshNode, Scene, Side};
use wgpu::util::DeviceExt;

use crate::mesh::{Vertex, tessellate};
use crate::shaders;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SIDES: [Side; 3] = [Side::Front, Side::Back, Side::Double];

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct MeshUniforms {
    mvp: [[f32; 4]; 4],
    model_view: [[f32; 4]; 4],
    /// x: alpha.
    params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BackgroundUniforms {
    crop: [[f32; 4]; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    fn create(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, node: &MeshNode) -> Self {
        let data = tessellate(&node.geometry);
        tracing::debug!(
            name = %node.name,
            vertices = data.vertices.len(),
            triangles = data.indices.len() / 3,
            "mesh uploaded"
        );
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertex_buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_index_buffer"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_uniform_buffer"),
            size: std::mem::size_of::<MeshUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mesh_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }
}

struct Background {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: ElementSize,
}

/// What an overlay gets to draw with, after the scene and before present.
pub struct OverlayContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub size: ElementSize,
}

/// Extra drawing on top of each frame (the desktop HUD).
pub trait FrameOverlay {
    fn draw(&mut self, ctx: OverlayContext<'_>);
}

/// wgpu renderer owning its presentation surface.
///
/// The surface tracks the window. The element layout is the logical canvas
/// placed on it: a canvas larger than the window is cropped, a smaller one
/// leaves the rest of the surface at the clear colour.
pub struct WgpuRenderer {
    config: RendererConfig,
    layout: ElementLayout,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    sample_count: u32,
    mesh_layout: wgpu::BindGroupLayout,
    mesh_pipelines: [wgpu::RenderPipeline; 3],
    background_layout: wgpu::BindGroupLayout,
    background_pipeline: wgpu::RenderPipeline,
    background_uniforms: wgpu::Buffer,
    sampler: wgpu::Sampler,
    meshes: BTreeMap<NodeId, GpuMesh>,
    background: Option<Background>,
    depth: wgpu::TextureView,
    msaa: Option<wgpu::TextureView>,
    overlay: Option<Box<dyn FrameOverlay>>,
}

impl WgpuRenderer {
    pub fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_size: ElementSize,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;

        let wants_alpha = |m: &&wgpu::CompositeAlphaMode| {
            matches!(
                m,
                wgpu::CompositeAlphaMode::PreMultiplied | wgpu::CompositeAlphaMode::PostMultiplied
            )
        };
        let alpha_mode = caps
            .alpha_modes
            .iter()
            .find(|m| config.alpha && wants_alpha(m))
            .or_else(|| caps.alpha_modes.first())
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: surface_size.width.max(1),
            height: surface_size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let sample_count = if config.antialias
            && adapter
                .get_texture_format_features(format)
                .flags
                .sample_count_supported(config.sample_count())
        {
            config.sample_count()
        } else {
            1
        };

        // Meshes
        let mesh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let mesh_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&mesh_layout],
            push_constant_ranges: &[],
        });
        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MESH_SHADER.into()),
        });
        let mesh_pipelines = SIDES.map(|side| {
            Self::mesh_pipeline(&device, &mesh_pipeline_layout, &mesh_shader, format, sample_count, side)
        });

        // Video background
        let background_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let background_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background_pipeline_layout"),
            bind_group_layouts: &[&background_layout],
            push_constant_ranges: &[],
        });
        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BACKGROUND_SHADER.into()),
        });
        let background_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("background_pipeline"),
            layout: Some(&background_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &background_shader,
                entry_point: Some("vs_background"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &background_shader,
                entry_point: Some("fs_background"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });
        let background_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("background_uniform_buffer"),
            contents: bytemuck::bytes_of(&BackgroundUniforms {
                crop: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("background_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let depth = Self::create_depth_texture(&device, &surface_config, sample_count);
        let msaa = Self::create_msaa_texture(&device, &surface_config, sample_count);

        let layout = ElementLayout::fixed(config.size());
        tracing::info!(?format, ?alpha_mode, sample_count, surface = %surface_size, "wgpu renderer ready");

        Ok(Self {
            config,
            layout,
            surface,
            surface_config,
            device,
            queue,
            sample_count,
            mesh_layout,
            mesh_pipelines,
            background_layout,
            background_pipeline,
            background_uniforms,
            sampler,
            meshes: BTreeMap::new(),
            background: None,
            depth,
            msaa,
            overlay: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn surface_size(&self) -> ElementSize {
        ElementSize::new(self.surface_config.width, self.surface_config.height)
    }

    /// Match the presentation surface to a new window size.
    pub fn resize_surface(&mut self, size: ElementSize) {
        let (width, height) = (size.width.max(1), size.height.max(1));
        if (width, height) == (self.surface_config.width, self.surface_config.height) {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth = Self::create_depth_texture(&self.device, &self.surface_config, self.sample_count);
        self.msaa = Self::create_msaa_texture(&self.device, &self.surface_config, self.sample_count);
        tracing::debug!(%size, "render surface reconfigured");
    }

    /// Install an overlay drawn after the scene each frame.
    pub fn set_overlay(&mut self, overlay: Box<dyn FrameOverlay>) {
        self.overlay = Some(overlay);
    }

    fn mesh_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        sample_count: u32,
        side: Side,
    ) -> wgpu::RenderPipeline {
        let cull_mode = match side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        };
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_mesh"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_mesh"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: surface_config.width,
                height: surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn create_msaa_texture(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> Option<wgpu::TextureView> {
        if sample_count <= 1 {
            return None;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa_texture"),
            size: wgpu::Extent3d {
                width: surface_config.width,
                height: surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: surface_config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Some(texture.create_view(&Default::default()))
    }

    fn upload_background(&mut self, frame: &VideoFrame) -> bool {
        let size = frame.size();
        if size.is_empty() || frame.rgba.len() != size.width as usize * size.height as usize * 4 {
            return false;
        }
        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };

        if self.background.as_ref().is_none_or(|bg| bg.size != size) {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("background_texture"),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&Default::default());
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("background_bind_group"),
                layout: &self.background_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.background_uniforms.as_entire_binding(),
                    },
                ],
            });
            tracing::debug!(%size, "background texture allocated");
            self.background = Some(Background {
                texture,
                bind_group,
                size,
            });
        }

        let Some(bg) = &self.background else {
            return false;
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &bg.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            extent,
        );
        true
    }

    /// Upload uniforms for every node and return the draw list, opaque first.
    fn prepare_meshes(&mut self, scene: &Scene, crop: Mat4) -> Vec<(NodeId, Side)> {
        let view = scene.camera.view_matrix();
        let projection = crop * scene.camera.projection;

        let (opaque, transparent): (Vec<&MeshNode>, Vec<&MeshNode>) =
            scene.nodes().iter().partition(|n| !n.material.transparent);

        let mut draws = Vec::with_capacity(scene.node_count());
        for node in opaque.into_iter().chain(transparent) {
            let mesh = self
                .meshes
                .entry(node.id)
                .or_insert_with(|| GpuMesh::create(&self.device, &self.mesh_layout, node));

            let model_view: Mat4 = view * node.transform.matrix();
            let uniforms = MeshUniforms {
                mvp: (projection * model_view).to_cols_array_2d(),
                model_view: model_view.to_cols_array_2d(),
                params: [node.material.alpha(), 0.0, 0.0, 0.0],
            };
            self.queue
                .write_buffer(&mesh.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            draws.push((node.id, node.material.side));
        }
        draws
    }
}

fn pipeline_index(side: Side) -> usize {
    match side {
        Side::Front => 0,
        Side::Back => 1,
        Side::Double => 2,
    }
}

impl SizedElement for WgpuRenderer {
    fn element_size(&self) -> ElementSize {
        self.layout.size
    }

    fn set_element_size(&mut self, size: ElementSize) {
        self.layout = ElementLayout::fixed(size);
    }

    fn set_element_layout(&mut self, layout: ElementLayout) {
        if layout != self.layout {
            tracing::debug!(
                size = %layout.size,
                margin_left = layout.margin_left,
                margin_top = layout.margin_top,
                "canvas layout changed"
            );
        }
        self.layout = layout;
    }
}

impl Renderer for WgpuRenderer {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn render(&mut self, scene: &Scene, background: Option<&VideoFrame>) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out, frame skipped");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let surface_size = self.surface_size();
        let crop = crop_transform(self.layout, surface_size);
        let scissor = visible_rect(self.layout, surface_size);

        let has_background =
            scissor.is_some() && background.is_some_and(|frame| self.upload_background(frame));
        if has_background {
            self.queue.write_buffer(
                &self.background_uniforms,
                0,
                bytemuck::bytes_of(&BackgroundUniforms {
                    crop: crop.to_cols_array_2d(),
                }),
            );
        }
        let draws = if scene.visible && scissor.is_some() {
            self.prepare_meshes(scene, crop)
        } else {
            Vec::new()
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let (target, resolve_target) = match &self.msaa {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };
            let [r, g, b, a] = self.config.clear_color.map(f64::from);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some((x, y, width, height)) = scissor {
                pass.set_scissor_rect(x, y, width, height);
            }

            if let (true, Some(bg)) = (has_background, &self.background) {
                pass.set_pipeline(&self.background_pipeline);
                pass.set_bind_group(0, &bg.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }

            for (id, side) in &draws {
                let Some(mesh) = self.meshes.get(id) else {
                    continue;
                };
                pass.set_pipeline(&self.mesh_pipelines[pipeline_index(*side)]);
                pass.set_bind_group(0, &mesh.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        if let Some(overlay) = &mut self.overlay {
            overlay.draw(OverlayContext {
                device: &self.device,
                queue: &self.queue,
                encoder: &mut encoder,
                view: &view,
                size: surface_size,
            });
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        tracing::trace!(meshes = draws.len(), background = has_background, "frame presented");
        Ok(())
    }
}
