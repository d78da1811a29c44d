//! wgpu 后端
//!
//! 把与 API 无关的命令列表翻译为 wgpu 渲染通道：
//! 每个 `BeginScene .. EndScene` 区间是一个离屏渲染通道，
//! `PostProcess` 是一个写入交换链纹理的全屏通道。

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};
use winit::window::Window;

use super::context::WgpuContext;
use super::post_process::BasicPostProcess;
use super::sprite_batch::SpriteBatch;
use super::texture::{GpuTexture, RenderTexture, ResourceUploadBatch};
use crate::core::error::{DistSpriteError, GraphicsError, Result};
use crate::core::math::Color;
use crate::core::Config;
use crate::gfx::backend::{
    DeviceDependentResources, FrameStatus, GraphicsBackend, PresentStatus, ResourceSetDescriptor,
};
use crate::renderer::command::{CommandList, CommandListState, RenderCommand};
use crate::renderer::descriptor::{DescriptorHeap, RenderTargetSlot, ResourceSlot};
use crate::renderer::resource::{Extent2d, GraphicsMemory, Rect, TextureFormat};
use crate::renderer::sprite::SpriteDraw;

/// 离屏目标格式
const RENDER_TEXTURE_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;

/// wgpu 后端的设备相关资源
pub struct WgpuResources {
    generation: u64,
    sprite: GpuTexture,
    background: GpuTexture,
    shader_resources: DescriptorHeap<ResourceSlot, wgpu::TextureView>,
    render_targets: DescriptorHeap<RenderTargetSlot, wgpu::TextureView>,
    render_texture: RenderTexture,
    sprite_batch: SpriteBatch,
    post_process: BasicPostProcess,
    graphics_memory: GraphicsMemory<wgpu::Buffer>,
}

impl DeviceDependentResources for WgpuResources {
    fn sprite_size(&self) -> Extent2d {
        self.sprite.size
    }

    fn background_size(&self) -> Extent2d {
        self.background.size
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// 一个离屏通道中收集的命令
#[derive(Default)]
struct ScenePass {
    target: Option<RenderTargetSlot>,
    clear: Option<(Color, f32)>,
    viewport: Option<Rect>,
    draws: Vec<SpriteDraw>,
}

/// wgpu 图形后端
pub struct WgpuBackend {
    context: WgpuContext,
    generation: u64,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let context = WgpuContext::new(window, config)?;
        Ok(Self {
            context,
            generation: 0,
            frame: None,
        })
    }

    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        resources: &WgpuResources,
        scene: &ScenePass,
    ) -> Result<Option<wgpu::Buffer>> {
        let target = scene.target.ok_or_else(|| {
            GraphicsError::CommandExecution("Scene pass without a target".to_string())
        })?;
        let view = resources.render_targets.gpu_handle(target)?;
        let target_size = resources
            .render_texture
            .size()
            .ok_or(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable))?;

        let (color_load, depth_load) = match scene.clear {
            Some((color, depth)) => (wgpu::LoadOp::Clear(to_wgpu_color(color)), wgpu::LoadOp::Clear(depth)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        let vertices = resources
            .sprite_batch
            .prepare(&self.context.device, &scene.draws);

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.context.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(rect) = scene.viewport {
                let (x, y, width, height) = clamp_rect(rect, target_size);
                pass.set_viewport(x as f32, y as f32, width as f32, height as f32, 0.0, 1.0);
                pass.set_scissor_rect(x, y, width, height);
            }

            if let Some((buffer, geometry)) = &vertices {
                resources.sprite_batch.draw(&mut pass, buffer, geometry)?;
            }
        }

        Ok(vertices.map(|(buffer, _)| buffer))
    }

    fn encode_post_process(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        resources: &WgpuResources,
        frame_view: &wgpu::TextureView,
        source: ResourceSlot,
    ) -> Result<()> {
        // 源纹理必须已经创建
        resources.shader_resources.gpu_handle(source)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Post Process Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame_view,
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
        resources.post_process.process(&mut pass)
    }
}

impl GraphicsBackend for WgpuBackend {
    type Resources = WgpuResources;

    fn backend_name(&self) -> &str {
        "wgpu"
    }

    fn output_size(&self) -> Extent2d {
        self.context.output_size()
    }

    fn window_size_changed(&mut self, width: u32, height: u32) -> bool {
        let size = Extent2d::new(width, height);
        if size.is_empty() || size == self.output_size() {
            return false;
        }
        debug!(width, height, "Resizing swap chain");
        // 未呈现的帧属于旧交换链
        self.frame = None;
        self.context.reconfigure_surface(width, height);
        true
    }

    fn create_device_dependent_resources(
        &mut self,
        desc: &ResourceSetDescriptor,
    ) -> Result<Self::Resources> {
        info!(generation = self.generation, "Creating device dependent resources");
        let device = &self.context.device;

        let mut upload = ResourceUploadBatch::begin(&self.context);
        let sprite = upload.create_texture_from_file(&desc.sprite)?;
        let background = upload.create_texture_from_file(&desc.background)?;
        upload.end();

        let mut shader_resources = DescriptorHeap::new();
        shader_resources.create_view(ResourceSlot::Cat, sprite.create_view());
        shader_resources.create_view(ResourceSlot::Background, background.create_view());

        let render_texture = RenderTexture::new(RENDER_TEXTURE_FORMAT);

        let mut sprite_batch = SpriteBatch::new(device, render_texture.format());
        for slot in [ResourceSlot::Cat, ResourceSlot::Background] {
            sprite_batch.bind_texture(device, slot, shader_resources.gpu_handle(slot)?);
        }
        // 精灵坐标按创建时的输出尺寸映射，与全屏矩形一致
        sprite_batch.set_viewport(self.context.output_size());

        let post_process =
            BasicPostProcess::new(device, self.context.surface_format(), desc.post_effect);

        Ok(WgpuResources {
            generation: self.generation,
            sprite,
            background,
            shader_resources,
            render_targets: DescriptorHeap::new(),
            render_texture,
            sprite_batch,
            post_process,
            graphics_memory: GraphicsMemory::new(),
        })
    }

    fn update_render_texture_size(
        &mut self,
        resources: &mut Self::Resources,
        size: Extent2d,
    ) -> Result<()> {
        if size.is_empty() {
            return Err(GraphicsError::ResourceCreation(format!(
                "Render texture size {}x{} is empty",
                size.width, size.height
            ))
            .into());
        }
        let device = &self.context.device;
        resources.render_texture.set_window(device, size);
        let (render_view, shader_view) = resources
            .render_texture
            .create_views()
            .ok_or(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable))?;
        resources
            .render_targets
            .create_view(RenderTargetSlot::IntermediateRT, render_view);
        resources
            .shader_resources
            .create_view(ResourceSlot::SceneTex, shader_view);
        Ok(())
    }

    fn set_post_process_source(&mut self, resources: &mut Self::Resources) -> Result<()> {
        let view = resources.shader_resources.gpu_handle(ResourceSlot::SceneTex)?;
        resources
            .post_process
            .set_source_texture(&self.context.device, view);
        Ok(())
    }

    fn prepare(&mut self) -> Result<FrameStatus> {
        if self.context.is_device_lost() {
            return Ok(FrameStatus::DeviceLost);
        }

        match self.context.surface.get_current_texture() {
            Ok(frame) => {
                self.frame = Some(frame);
                Ok(FrameStatus::Ready)
            }
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                debug!("Swap chain out of date, reconfiguring");
                let size = self.context.output_size();
                self.context.reconfigure_surface(size.width, size.height);
                Ok(FrameStatus::Skipped)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring the next swap chain image");
                Ok(FrameStatus::Skipped)
            }
            Err(e) => {
                error!("Failed to acquire swap chain image: {}", e);
                self.context.mark_device_lost();
                Ok(FrameStatus::DeviceLost)
            }
        }
    }

    fn submit(&mut self, resources: &mut Self::Resources, commands: &CommandList) -> Result<()> {
        if commands.state() != CommandListState::Executable {
            return Err(GraphicsError::CommandExecution(
                "Command list has not been closed".to_string(),
            )
            .into());
        }
        if resources.generation != self.generation {
            return Err(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable));
        }
        let frame = self.frame.as_ref().ok_or_else(|| {
            GraphicsError::CommandExecution("Submit outside of a frame".to_string())
        })?;
        if self.context.is_device_lost() {
            warn!("Device lost before submit, dropping frame commands");
            return Ok(());
        }
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut scene = ScenePass::default();
        let mut transient = Vec::new();

        for command in commands.commands() {
            match command {
                RenderCommand::BeginScene(target) => {
                    scene = ScenePass {
                        target: Some(*target),
                        ..ScenePass::default()
                    };
                }
                RenderCommand::Clear { color, depth, .. } => scene.clear = Some((*color, *depth)),
                RenderCommand::SetViewport(rect) => scene.viewport = Some(*rect),
                RenderCommand::DrawSprite(draw) => scene.draws.push(*draw),
                RenderCommand::EndScene(_) => {
                    let finished = std::mem::take(&mut scene);
                    if let Some(buffer) = self.encode_scene(&mut encoder, resources, &finished)? {
                        transient.push(buffer);
                    }
                }
                RenderCommand::PostProcess { source, .. } => {
                    self.encode_post_process(&mut encoder, resources, &frame_view, *source)?;
                }
                RenderCommand::SetDescriptorHeaps
                | RenderCommand::BeginSprites
                | RenderCommand::EndSprites
                | RenderCommand::BindBackBuffer => {}
            }
        }

        let (_, fence) = self.context.submit(std::iter::once(encoder.finish()));
        trace!(fence = fence.value(), buffers = transient.len(), "Submitted frame");

        for buffer in transient {
            resources.graphics_memory.allocate(buffer);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<PresentStatus> {
        let frame = self.frame.take().ok_or_else(|| {
            GraphicsError::SwapchainError("Present outside of a frame".to_string())
        })?;
        frame.present();

        if self.context.is_device_lost() {
            warn!("Device lost detected at present");
            return Ok(PresentStatus::DeviceLost);
        }
        Ok(PresentStatus::Presented)
    }

    fn commit_graphics_memory(&mut self, resources: &mut Self::Resources) {
        let _ = self.context.device.poll(wgpu::Maintain::Poll);
        let fences = &self.context.fences;
        resources.graphics_memory.commit(fences.current_value());
        let released = resources.graphics_memory.retire(fences.completed_value());
        if released > 0 {
            trace!(released, "Released transient buffers");
        }
    }

    fn handle_device_lost(&mut self) -> Result<()> {
        self.frame = None;
        self.context.recreate_device()?;
        self.generation += 1;
        info!(generation = self.generation, "wgpu device recreated");
        Ok(())
    }

    fn wait_for_gpu(&mut self) {
        self.context.wait_for_gpu();
    }
}

fn to_wgpu_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}

/// 把矩形裁剪到目标范围内，返回 (x, y, width, height)
fn clamp_rect(rect: Rect, target: Extent2d) -> (u32, u32, u32, u32) {
    let left = rect.left.clamp(0, target.width as i32) as u32;
    let top = rect.top.clamp(0, target.height as i32) as u32;
    let right = rect.right.clamp(0, target.width as i32) as u32;
    let bottom = rect.bottom.clamp(0, target.height as i32) as u32;
    (left, top, right.saturating_sub(left), bottom.saturating_sub(top))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rect() {
        let target = Extent2d::new(800, 600);
        assert_eq!(clamp_rect(Rect::new(0, 0, 800, 600), target), (0, 0, 800, 600));
        assert_eq!(clamp_rect(Rect::new(-10, 10, 1000, 700), target), (0, 10, 800, 590));
    }

    #[test]
    fn test_to_wgpu_color() {
        let color = to_wgpu_color(Color::new(0.5, 0.25, 1.0, 1.0));
        assert_eq!(color.r, 0.5);
        assert_eq!(color.g, 0.25);
    }
}
