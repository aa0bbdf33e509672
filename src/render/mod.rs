pub mod camera;
mod egui_overlay;
pub mod pick;

pub use camera::OrbitCamera;
pub use egui_overlay::UiPaint;
pub use pick::{select_under, PickHit, Ray};

use crate::config::{HighlightConfig, ViewerConfig};
use crate::scene::{Geometry, GeometryId, NodeRole, SceneGraph};
use bytemuck::{Pod, Zeroable};
use egui_overlay::EguiOverlay;
use glam::{Mat4, Vec3};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const AMBIENT_INTENSITY: f32 = 0.8;
const SUN_INTENSITY: f32 = 0.6;
/// The sun sits here and shines at the origin.
const SUN_POSITION: Vec3 = Vec3::new(-1.0, -1.0, 2.0);
const INITIAL_DRAW_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    UnsupportedSurface,
    #[error("surface error: {0}")]
    Surface(wgpu::SurfaceError),
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    ambient: [f32; 4],
}

impl FrameUniforms {
    fn new(view_proj: Mat4) -> Self {
        let sun = SUN_POSITION.normalize();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: [sun.x, sun.y, sun.z, SUN_INTENSITY],
            ambient: [AMBIENT_INTENSITY, AMBIENT_INTENSITY, AMBIENT_INTENSITY, 1.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DrawUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
}

impl DrawUniforms {
    fn new(world: Mat4, role: NodeRole, base_color: [f32; 4], highlight: &HighlightConfig) -> Self {
        let (color, emissive) = match role {
            NodeRole::Model => {
                let [r, g, b, _] = base_color;
                ([r, g, b, 1.0], [0.0; 4])
            }
            NodeRole::Highlight => {
                let [r, g, b] = highlight.emissive;
                (highlight.color, [r, g, b, 0.0])
            }
        };
        Self {
            model: world.to_cols_array_2d(),
            normal_matrix: normal_matrix(world).to_cols_array_2d(),
            color,
            emissive,
        }
    }
}

/// Inverse-transpose of `world`, or `world` itself when it cannot be inverted.
fn normal_matrix(world: Mat4) -> Mat4 {
    if world.determinant().abs() <= f32::EPSILON {
        return world;
    }
    world.inverse().transpose()
}

/// `size` rounded up to the next multiple of `alignment`.
fn padded_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

struct GpuPrimitive {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    base_color: [f32; 4],
}

struct GpuGeometry {
    primitives: Vec<GpuPrimitive>,
}

impl GpuGeometry {
    fn upload(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let primitives = geometry
            .primitives()
            .iter()
            .filter(|primitive| !primitive.indices.is_empty())
            .map(|primitive| {
                let vertices: Vec<MeshVertex> = primitive
                    .positions
                    .iter()
                    .enumerate()
                    .map(|(i, position)| MeshVertex {
                        position: *position,
                        normal: primitive.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                    })
                    .collect();
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("mesh_vertex_buffer"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("mesh_index_buffer"),
                    contents: bytemuck::cast_slice(&primitive.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                GpuPrimitive {
                    vertex_buffer,
                    index_buffer,
                    index_count: primitive.indices.len() as u32,
                    base_color: primitive.material.base_color,
                }
            })
            .collect();
        Self { primitives }
    }
}

struct DrawCall {
    geometry: GeometryId,
    primitive: usize,
    role: NodeRole,
    offset: u32,
}

pub struct RenderContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    /// sRGB view of the surface used by the 3D pass; egui paints the plain one.
    scene_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_stride: u64,
    draw_capacity: usize,
    opaque_pipeline: wgpu::RenderPipeline,
    highlight_pipeline: wgpu::RenderPipeline,
    meshes: HashMap<GeometryId, GpuGeometry>,
    overlay: EguiOverlay,
    background: wgpu::Color,
    highlight: HighlightConfig,
}

impl RenderContext {
    pub fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;
        log::info!("GPU adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("part_inspector_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let scene_format = surface_format.add_srgb_suffix();
        let view_formats = if scene_format != surface_format {
            vec![scene_format]
        } else {
            Vec::new()
        };
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats,
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, surface_config.width, surface_config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/mesh.wgsl"
            ))),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_uniform_buffer"),
            contents: bytemuck::bytes_of(&FrameUniforms::new(Mat4::IDENTITY)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_uniform_bg"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let draw_stride = padded_stride(
            std::mem::size_of::<DrawUniforms>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (draw_buffer, draw_bind_group) =
            create_draw_buffer(&device, &draw_layout, draw_stride, INITIAL_DRAW_CAPACITY);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });
        let opaque_pipeline = create_mesh_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            scene_format,
            NodeRole::Model,
        );
        let highlight_pipeline = create_mesh_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            scene_format,
            NodeRole::Highlight,
        );

        let overlay = EguiOverlay::new(&device, surface_format);
        let [r, g, b] = config.background;

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            scene_format,
            depth_view,
            frame_buffer,
            frame_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_stride,
            draw_capacity: INITIAL_DRAW_CAPACITY,
            opaque_pipeline,
            highlight_pipeline,
            meshes: HashMap::new(),
            overlay,
            background: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            highlight: config.highlight.clone(),
        })
    }

    pub fn size(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Draws the scene and then the UI. Lost or outdated surfaces are
    /// reconfigured and the frame is dropped.
    pub fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &OrbitCamera,
        ui: &UiPaint,
    ) -> Result<(), RenderError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated; reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout; frame skipped");
                return Ok(());
            }
            Err(err) => return Err(RenderError::Surface(err)),
        };
        let scene_view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.scene_format),
            ..Default::default()
        });
        let ui_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniforms::new(camera.view_projection())),
        );
        let calls = self.prepare_draws(scene);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &scene_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            let mut bound_role = None;
            for call in &calls {
                let Some(primitive) = self
                    .meshes
                    .get(&call.geometry)
                    .and_then(|geometry| geometry.primitives.get(call.primitive))
                else {
                    continue;
                };
                if bound_role != Some(call.role) {
                    pass.set_pipeline(match call.role {
                        NodeRole::Model => &self.opaque_pipeline,
                        NodeRole::Highlight => &self.highlight_pipeline,
                    });
                    bound_role = Some(call.role);
                }
                pass.set_bind_group(1, &self.draw_bind_group, &[call.offset]);
                pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
                pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..primitive.index_count, 0, 0..1);
            }
        }

        let size_px = self.size();
        let (screen, extra_commands) =
            self.overlay
                .prepare(&self.device, &self.queue, &mut encoder, ui, size_px);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &ui_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.overlay.paint(&mut pass, ui, &screen);
        }

        self.queue
            .submit(extra_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        self.overlay.finish(ui);
        Ok(())
    }

    /// Uploads geometry not seen before, drops geometry no longer in the
    /// scene and writes one uniform slot per primitive. Model parts come
    /// first so the translucent overlay blends over them.
    fn prepare_draws(&mut self, scene: &SceneGraph) -> Vec<DrawCall> {
        let renderables = scene.renderables();

        let mut live = HashSet::with_capacity(renderables.len());
        for item in &renderables {
            let id = item.geometry.id();
            live.insert(id);
            if !self.meshes.contains_key(&id) {
                self.meshes
                    .insert(id, GpuGeometry::upload(&self.device, &item.geometry));
            }
        }
        self.meshes.retain(|id, _| live.contains(id));

        let mut uniforms = Vec::new();
        let mut calls = Vec::new();
        for role in [NodeRole::Model, NodeRole::Highlight] {
            for item in renderables.iter().filter(|item| item.role == role) {
                let id = item.geometry.id();
                let Some(gpu) = self.meshes.get(&id) else {
                    continue;
                };
                for (index, primitive) in gpu.primitives.iter().enumerate() {
                    calls.push(DrawCall {
                        geometry: id,
                        primitive: index,
                        role,
                        offset: (uniforms.len() as u64 * self.draw_stride) as u32,
                    });
                    uniforms.push(DrawUniforms::new(
                        item.world,
                        role,
                        primitive.base_color,
                        &self.highlight,
                    ));
                }
            }
        }

        if uniforms.is_empty() {
            return calls;
        }
        if uniforms.len() > self.draw_capacity {
            let capacity = uniforms.len().next_power_of_two();
            let (buffer, bind_group) =
                create_draw_buffer(&self.device, &self.draw_layout, self.draw_stride, capacity);
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
            self.draw_capacity = capacity;
        }

        let stride = self.draw_stride as usize;
        let mut bytes = vec![0u8; uniforms.len() * stride];
        for (slot, uniform) in bytes.chunks_exact_mut(stride).zip(&uniforms) {
            let data = bytemuck::bytes_of(uniform);
            slot[..data.len()].copy_from_slice(data);
        }
        self.queue.write_buffer(&self.draw_buffer, 0, &bytes);
        calls
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_draw_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("draw_uniform_buffer"),
        size: stride * capacity.max(1) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw_uniform_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

/// Model parts are opaque and double-sided. The highlight overlay blends over
/// them without writing depth, pulled slightly towards the camera so it wins
/// against the coincident original surface.
fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    role: NodeRole,
) -> wgpu::RenderPipeline {
    let (label, blend, depth_write_enabled, bias) = match role {
        NodeRole::Model => ("mesh_opaque_pipeline", None, true, wgpu::DepthBiasState::default()),
        NodeRole::Highlight => (
            "mesh_highlight_pipeline",
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
            wgpu::DepthBiasState {
                constant: -4,
                slope_scale: -1.0,
                clamp: 0.0,
            },
        ),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<MeshVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    // position
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    },
                    // normal
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 12,
                        shader_location: 1,
                    },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias,
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn uniform_stride_respects_offset_alignment() {
        let size = std::mem::size_of::<DrawUniforms>() as u64;
        assert_eq!(size, 160);
        assert_eq!(padded_stride(size, 256), 256);
        assert_eq!(padded_stride(256, 256), 256);
        assert_eq!(padded_stride(257, 256), 512);
        assert_eq!(padded_stride(size, 0), size);
    }

    #[test]
    fn model_draws_are_opaque_base_color() {
        let uniforms = DrawUniforms::new(
            Mat4::IDENTITY,
            NodeRole::Model,
            [0.2, 0.4, 0.6, 0.3],
            &HighlightConfig::default(),
        );
        assert_eq!(uniforms.color, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!(uniforms.emissive, [0.0; 4]);
    }

    #[test]
    fn highlight_draws_use_overlay_style() {
        let style = HighlightConfig::default();
        let uniforms = DrawUniforms::new(Mat4::IDENTITY, NodeRole::Highlight, [1.0; 4], &style);
        assert_eq!(uniforms.color, style.color);
        assert_eq!(uniforms.color[3], 0.5);
        assert_eq!(&uniforms.emissive[..3], &style.emissive[..]);
    }

    #[test]
    fn normals_survive_non_uniform_scale() {
        let world = Mat4::from_scale_rotation_translation(
            Vec3::new(4.0, 1.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(3.0, 0.0, 0.0),
        );
        // Surface tilted 45° in the unscaled frame.
        let normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let transformed = normal_matrix(world).transform_vector3(normal).normalize();
        let tangent = world.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(transformed.dot(tangent).abs() < 1e-5);

        let flat = Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(normal_matrix(flat), flat);
    }

    #[test]
    fn sun_light_points_towards_its_position() {
        let uniforms = FrameUniforms::new(Mat4::IDENTITY);
        let dir = Vec3::new(uniforms.light_dir[0], uniforms.light_dir[1], uniforms.light_dir[2]);
        assert!((dir - Vec3::new(-1.0, -1.0, 2.0).normalize()).length() < 1e-6);
        assert_eq!(uniforms.light_dir[3], 0.6);
        assert_eq!(uniforms.ambient[0], 0.8);
    }
}
