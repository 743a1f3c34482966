//! Screen compositor: maps the trail field to palette colors.
//!
//! A compute pass writes one packed RGBA8 pixel per texel into a composite
//! buffer. That buffer is either read back into an image or drawn to a
//! surface by a fullscreen triangle.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::gpu::diffuse::Diffuser;
use crate::gpu::{
    buffer_bind_group, create_compute_pipeline, readback, storage_entry, tile_dispatch,
    uniform_entry, GpuContext,
};
use crate::palette::Palette;

/// Trail amount rendered at full foreground strength.
pub const MAX_AMOUNT: f32 = 4.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ScreenParamsGpu {
    pub background: [f32; 4],
    pub foreground: [[f32; 4]; 3],
    pub dims: [u32; 2],
    pub max_amount: f32,
    pub _pad: f32,
}

impl ScreenParamsGpu {
    pub fn new(palette: &Palette, width: u32, height: u32) -> Self {
        Self {
            background: palette.background.to_vec4(),
            foreground: [
                palette.foreground[0].to_vec4(),
                palette.foreground[1].to_vec4(),
                palette.foreground[2].to_vec4(),
            ],
            dims: [width, height],
            max_amount: MAX_AMOUNT,
            _pad: 0.0,
        }
    }
}

pub const COMPOSITE_WGSL: &str = r#"
struct ScreenParams {
    background: vec4<f32>,
    fg1: vec4<f32>,
    fg2: vec4<f32>,
    fg3: vec4<f32>,
    dims: vec2<u32>,
    max_amount: f32,
    _pad: f32,
};

@group(0) @binding(0) var<uniform> params: ScreenParams;
@group(0) @binding(1) var<storage, read> trail: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> composite: array<u32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.dims.x || id.y >= params.dims.y) {
        return;
    }
    let texel = id.y * params.dims.x + id.x;

    let pct = clamp(trail[texel].xyz / params.max_amount, vec3<f32>(0.0), vec3<f32>(1.0));
    let max_xy = max(pct.x, pct.y);
    let max_pct = max(pct.z, max_xy);

    var color = params.background.rgb;
    if (max_pct > 0.0) {
        var c12 = params.fg1.rgb;
        if (max_xy != 0.0) {
            c12 = mix(params.fg1.rgb, params.fg2.rgb, pct.y / (pct.x + pct.y));
        }
        let c123 = mix(c12, params.fg3.rgb, pct.z / (pct.x + pct.y + pct.z));
        color = mix(color, c123, max_pct);
    }

    composite[texel] = pack4x8unorm(vec4<f32>(color, 1.0));
}
"#;

pub const PRESENT_WGSL: &str = r#"
struct PresentParams {
    dims: vec2<u32>,
    _pad: vec2<u32>,
};

@group(0) @binding(0) var<uniform> params: PresentParams;
@group(0) @binding(1) var<storage, read> composite: array<u32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let size = vec2<f32>(params.dims);
    let texel = min(vec2<u32>(floor(in.uv * size)), params.dims - 1u);
    return unpack4x8unorm(composite[texel.y * params.dims.x + texel.x]);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct PresentParamsGpu {
    dims: [u32; 2],
    _pad: [u32; 2],
}

struct PresentPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    format: wgpu::TextureFormat,
}

/// Owner of the composite buffer and the pipelines that fill and show it.
pub struct Compositor {
    width: u32,
    height: u32,
    composite: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    /// Keyed by the diffuser's trail parity.
    bind_groups: [wgpu::BindGroup; 2],
    present: Option<PresentPipeline>,
}

impl Compositor {
    pub fn new(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        palette: &Palette,
        diffuser: &Diffuser,
    ) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let params = ScreenParamsGpu::new(palette, width, height);

        ctx.checked("compositor", || {
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Screen Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let composite = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Composite Buffer"),
                size: width as u64 * height as u64 * 4,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Composite Layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, true),
                    storage_entry(2, false),
                ],
            });
            let pipeline =
                create_compute_pipeline(device, "Composite Pipeline", COMPOSITE_WGSL, &[&layout]);
            let trails = diffuser.trail_buffers();
            let bind_groups = [
                buffer_bind_group(
                    device,
                    "Composite Bind Group A",
                    &layout,
                    &[&params_buffer, &trails[0], &composite],
                ),
                buffer_bind_group(
                    device,
                    "Composite Bind Group B",
                    &layout,
                    &[&params_buffer, &trails[1], &composite],
                ),
            ];

            Self {
                width,
                height,
                composite,
                pipeline,
                bind_groups,
                present: None,
            }
        })
    }

    /// Build the pipeline that draws the composite to surfaces of `format`.
    ///
    /// A non-sRGB format shows the palette colors unchanged.
    pub fn enable_present(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.present.as_ref().is_some_and(|p| p.format == format) {
            return;
        }

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Present Params"),
            contents: bytemuck::bytes_of(&PresentParamsGpu {
                dims: [self.width, self.height],
                _pad: [0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Present Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let bind_group = buffer_bind_group(device, "Present Bind Group", &layout, &[&params, &self.composite]);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Present Shader"),
            source: wgpu::ShaderSource::Wgsl(PRESENT_WGSL.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Present Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        self.present = Some(PresentPipeline {
            pipeline,
            bind_group,
            format,
        });
    }

    /// Record the composite pass for the diffuser's current trail.
    pub fn composite(&self, encoder: &mut wgpu::CommandEncoder, diffuser: &Diffuser) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Composite Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[diffuser.parity()], &[]);
        let (x, y) = tile_dispatch(self.width, self.height);
        pass.dispatch_workgroups(x, y, 1);
    }

    /// Composite and read the result back as an upright image.
    pub fn draw(&self, ctx: &GpuContext, diffuser: &Diffuser) -> Result<image::RgbaImage, GpuError> {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Draw Encoder"),
            });
        self.composite(&mut encoder, diffuser);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let pixels = readback::read_u32(ctx, &self.composite, (self.width * self.height) as usize)?;
        Ok(pixels_to_image(&pixels, self.width, self.height))
    }

    /// Composite and draw into `view`.
    ///
    /// Requires [`Self::enable_present`] for the view's format.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        diffuser: &Diffuser,
    ) -> Result<(), GpuError> {
        let present = self
            .present
            .as_ref()
            .ok_or_else(|| GpuError::Resource("present pipeline not enabled".to_string()))?;

        self.composite(encoder, diffuser);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&present.pipeline);
        pass.set_bind_group(0, &present.bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}

/// Convert packed pixels (row 0 at the bottom) to an upright image.
pub fn pixels_to_image(pixels: &[u32], width: u32, height: u32) -> image::RgbaImage {
    image::RgbaImage::from_fn(width, height, |x, y| {
        let row = height - 1 - y;
        image::Rgba(pixels[(row * width + x) as usize].to_le_bytes())
    })
}
