//! 精灵批次
//!
//! 每个着色资源槽位对应一个 bind group，在创建资源时建好。
//! 绘制时把一批 `SpriteDraw` 展开为顶点，按纹理区间依次绘制。

use tracing::debug;
use wgpu::util::DeviceExt;

use super::context::DEPTH_FORMAT;
use crate::core::error::Result;
use crate::renderer::descriptor::{DescriptorHeap, ResourceSlot};
use crate::renderer::resource::Extent2d;
use crate::renderer::sprite::{SpriteDraw, SpriteGeometry, SpriteVertex};

const SPRITE_SHADER: &str = include_str!("shaders/sprite.wgsl");

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

/// 精灵批次
pub struct SpriteBatch {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_groups: DescriptorHeap<ResourceSlot, wgpu::BindGroup>,
    viewport: Extent2d,
}

impl SpriteBatch {
    /// 创建精灵管线，`target_format` 为离屏目标格式
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        debug!("Creating sprite batch pipeline");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Bind Group Layout"),
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
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // 旋转后的精灵可能翻面
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // 精灵按提交顺序叠加，不做深度测试
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            bind_group_layout,
            sampler,
            bind_groups: DescriptorHeap::new(),
            viewport: Extent2d::default(),
        }
    }

    /// 为某个槽位的纹理建立 bind group
    pub fn bind_texture(&mut self, device: &wgpu::Device, slot: ResourceSlot, view: &wgpu::TextureView) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.bind_groups.create_view(slot, bind_group);
    }

    /// 设置像素坐标到裁剪空间换算所用的视口
    pub fn set_viewport(&mut self, viewport: Extent2d) {
        self.viewport = viewport;
    }

    /// 为一批绘制生成顶点缓冲；批次为空时返回 `None`
    pub fn prepare(
        &self,
        device: &wgpu::Device,
        draws: &[SpriteDraw],
    ) -> Option<(wgpu::Buffer, SpriteGeometry)> {
        let geometry = SpriteGeometry::build(draws, self.viewport);
        if geometry.is_empty() {
            return None;
        }
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Some((buffer, geometry))
    }

    /// 在渲染通道中绘制
    pub fn draw<'pass>(
        &'pass self,
        pass: &mut wgpu::RenderPass<'pass>,
        vertex_buffer: &'pass wgpu::Buffer,
        geometry: &SpriteGeometry,
    ) -> Result<()> {
        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        for range in &geometry.ranges {
            let bind_group = self.bind_groups.gpu_handle(range.texture)?;
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(range.first_vertex..range.first_vertex + range.vertex_count, 0..1);
        }
        Ok(())
    }
}
