use crate::StagedFrame;
use crate::staging::GpuVertex;
use spine2d_widget::BlendMode;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    clip_from_world: [[f32; 4]; 4],
}

/// Draws staged widget frames into a wgpu render pass.
pub struct WidgetRenderer {
    pipelines: Pipelines,
    pipelines_pma: Pipelines,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_capacity: usize,
    /// Serial of the staged frame whose indices are in `index_buffer`.
    indices_serial: Option<u64>,
}

struct Pipelines {
    normal: wgpu::RenderPipeline,
    additive: wgpu::RenderPipeline,
    multiply: wgpu::RenderPipeline,
    screen: wgpu::RenderPipeline,
}

impl Pipelines {
    fn by_blend(&self, blend: BlendMode) -> &wgpu::RenderPipeline {
        match blend {
            BlendMode::Normal => &self.normal,
            BlendMode::Additive => &self.additive,
            BlendMode::Multiply => &self.multiply,
            BlendMode::Screen => &self.screen,
        }
    }
}

impl WidgetRenderer {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("spine2d-widget shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let globals_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("widget globals layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("widget texture layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("spine2d-widget pipeline layout"),
            bind_group_layouts: &[&globals_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipelines = create_pipelines(device, &pipeline_layout, &shader, color_format, false);
        let pipelines_pma = create_pipelines(device, &pipeline_layout, &shader, color_format, true);

        let globals = Globals {
            clip_from_world: glam::Mat4::IDENTITY.to_cols_array_2d(),
        };
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("widget globals"),
            contents: bytemuck::bytes_of(&globals),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("widget globals bind group"),
            layout: &globals_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let vertex_capacity = 1024;
        let index_capacity = 2048;
        let vertex_buffer = create_vertex_buffer(device, vertex_capacity);
        let index_buffer = create_index_buffer(device, index_capacity);

        Self {
            pipelines,
            pipelines_pma,
            globals_buffer,
            globals_bind_group,
            texture_bind_group_layout,
            vertex_buffer,
            index_buffer,
            vertex_capacity,
            index_capacity,
            indices_serial: None,
        }
    }

    pub fn texture_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_bind_group_layout
    }

    /// Writes the frame's projection and geometry to the GPU, growing buffers as needed. The
    /// index buffer is only rewritten when the frame's topology changed since the last upload.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &StagedFrame) {
        let globals = Globals {
            clip_from_world: frame.clip_from_world().to_cols_array_2d(),
        };
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        if frame.is_empty() {
            return;
        }

        let reallocated = self.ensure_buffers(device, frame.vertex_count(), frame.index_count());
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&frame.vertices));
        if reallocated || frame.needs_index_upload(self.indices_serial) {
            // Index writes must be 4-byte aligned; u32 indices always are.
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&frame.indices));
        }
        self.indices_serial = Some(frame.serial());
    }

    /// Replays the frame's batches. `frame` must have been uploaded.
    pub fn render<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'a>,
        frame: &StagedFrame,
        textures: &'a dyn TextureProvider,
    ) {
        if frame.is_empty() {
            return;
        }
        let [width, height] = frame.canvas_size();

        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        for batch in frame.batches() {
            let Some(bind_group) = textures.bind_group_for(&batch.texture) else {
                log::warn!("no bind group for texture '{}'", batch.texture);
                continue;
            };
            match batch.scissor {
                Some(rect) => {
                    let Some([x, y, w, h]) = frame.clamp_scissor(rect) else {
                        continue;
                    };
                    pass.set_scissor_rect(x, y, w, h);
                }
                None => pass.set_scissor_rect(0, 0, width.max(1), height.max(1)),
            }

            let pipeline = if batch.premultiplied_alpha {
                self.pipelines_pma.by_blend(batch.blend)
            } else {
                self.pipelines.by_blend(batch.blend)
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, bind_group, &[]);
            let start = batch.first_index;
            pass.draw_indexed(start..start + batch.index_count, 0, 0..1);
        }
    }

    /// Returns whether the index buffer was replaced.
    fn ensure_buffers(&mut self, device: &wgpu::Device, vertices: usize, indices: usize) -> bool {
        if vertices > self.vertex_capacity {
            while self.vertex_capacity < vertices {
                self.vertex_capacity *= 2;
            }
            self.vertex_buffer = create_vertex_buffer(device, self.vertex_capacity);
        }
        if indices > self.index_capacity {
            while self.index_capacity < indices {
                self.index_capacity *= 2;
            }
            self.index_buffer = create_index_buffer(device, self.index_capacity);
            return true;
        }
        false
    }
}

fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("widget vertices"),
        size: (capacity * std::mem::size_of::<GpuVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("widget indices"),
        size: (capacity * std::mem::size_of::<u32>()) as u64,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_pipelines(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    premultiplied_alpha: bool,
) -> Pipelines {
    let pipeline = |blend| create_pipeline(device, layout, shader, color_format, blend, premultiplied_alpha);
    Pipelines {
        normal: pipeline(BlendMode::Normal),
        additive: pipeline(BlendMode::Additive),
        multiply: pipeline(BlendMode::Multiply),
        screen: pipeline(BlendMode::Screen),
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    blend: BlendMode,
    premultiplied_alpha: bool,
) -> wgpu::RenderPipeline {
    let label = format!(
        "spine2d-widget pipeline {blend:?}{}",
        if premultiplied_alpha { " pma" } else { "" }
    );

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<GpuVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![
                    0 => Float32x2,
                    1 => Float32x2,
                    2 => Float32x4,
                    3 => Float32x4
                ],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(blend_state(blend, premultiplied_alpha)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Separate color/alpha factors with the alpha source factor fixed to one.
pub fn blend_state(blend: BlendMode, premultiplied_alpha: bool) -> wgpu::BlendState {
    use wgpu::{BlendComponent, BlendFactor, BlendOperation};

    let src_alpha_scaled = if premultiplied_alpha {
        BlendFactor::One
    } else {
        BlendFactor::SrcAlpha
    };
    let (src_color, dst) = match blend {
        BlendMode::Normal => (src_alpha_scaled, BlendFactor::OneMinusSrcAlpha),
        BlendMode::Additive => (src_alpha_scaled, BlendFactor::One),
        BlendMode::Multiply => (BlendFactor::Dst, BlendFactor::OneMinusSrcAlpha),
        BlendMode::Screen => (BlendFactor::One, BlendFactor::OneMinusSrc),
    };

    wgpu::BlendState {
        color: BlendComponent {
            src_factor: src_color,
            dst_factor: dst,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: dst,
            operation: BlendOperation::Add,
        },
    }
}

/// Resolves texture keys of draw batches to bind groups built with
/// [`WidgetRenderer::texture_bind_group_layout`].
pub trait TextureProvider {
    fn bind_group_for(&self, texture: &str) -> Option<&wgpu::BindGroup>;
}

#[derive(Default)]
pub struct HashMapTextureProvider {
    pub bind_groups: std::collections::HashMap<String, wgpu::BindGroup>,
}

impl HashMapTextureProvider {
    pub fn insert(&mut self, texture: impl Into<String>, bind_group: wgpu::BindGroup) {
        self.bind_groups.insert(texture.into(), bind_group);
    }

    pub fn contains(&self, texture: &str) -> bool {
        self.bind_groups.contains_key(texture)
    }
}

impl TextureProvider for HashMapTextureProvider {
    fn bind_group_for(&self, texture: &str) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(texture)
    }
}

pub fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("widget texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

const SHADER: &str = r#"
struct Globals {
  clip_from_world: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VsIn {
  @location(0) position: vec2<f32>,
  @location(1) uv: vec2<f32>,
  @location(2) light_color: vec4<f32>,
  @location(3) dark_color: vec4<f32>,
};

struct VsOut {
  @builtin(position) position: vec4<f32>,
  @location(0) uv: vec2<f32>,
  @location(1) light_color: vec4<f32>,
  @location(2) dark_color: vec4<f32>,
};

@vertex
fn vs_main(in: VsIn) -> VsOut {
  var out: VsOut;
  out.position = globals.clip_from_world * vec4<f32>(in.position, 0.0, 1.0);
  out.uv = in.uv;
  out.light_color = in.light_color;
  out.dark_color = in.dark_color;
  return out;
}

@group(1) @binding(0)
var tex: texture_2d<f32>;

@group(1) @binding(1)
var samp: sampler;

// Two-color tint: dark_color.a selects the premultiplied formula.
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
  let tex_color = textureSample(tex, samp, in.uv);
  let alpha = tex_color.a * in.light_color.a;
  let rgb = ((tex_color.a - 1.0) * in.dark_color.a + 1.0 - tex_color.rgb) * in.dark_color.rgb
    + tex_color.rgb * in.light_color.rgb;
  return vec4<f32>(rgb, alpha);
}
"#;
