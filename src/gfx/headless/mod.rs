//! 无窗口后端
//!
//! 不创建 GPU 设备，按与 wgpu 后端相同的契约执行每一次调用：
//! 读取图片头部得到纹理尺寸，维护描述符表和临时显存，校验命令列表，
//! 并把每一次调用记录到调用日志里（可关闭）。可以注入一次设备丢失。
//!
//! 模拟一帧的 GPU 延迟：提交的工作在下一次 `prepare` 时才算完成。
//!
//! 用于 `--headless` 冒烟运行以及生命周期测试。

use tracing::{debug, info, trace, warn};

use super::backend::{
    DeviceDependentResources, FrameStatus, GraphicsBackend, PresentStatus, ResourceSetDescriptor,
};
use crate::core::error::{AssetError, DistSpriteError, GraphicsError, Result};
use crate::renderer::command::{CommandList, CommandListState, RenderCommand};
use crate::renderer::descriptor::{DescriptorHeap, RenderTargetSlot, ResourceSlot};
use crate::renderer::post_process::PostEffect;
use crate::renderer::resource::{Extent2d, GraphicsMemory};
use crate::renderer::sprite::{SpriteGeometry, SpriteVertex};
use crate::renderer::sync::FenceManager;

/// 记录下来的后端调用
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateDeviceDependentResources { generation: u64 },
    UpdateRenderTextureSize(Extent2d),
    SetPostProcessSource(Extent2d),
    WindowSizeChanged(Extent2d),
    Prepare,
    Submit(Vec<RenderCommand>),
    Present,
    CommitGraphicsMemory,
    HandleDeviceLost,
    WaitForGpu,
}

/// 无窗口后端的设备相关资源
#[derive(Debug)]
pub struct HeadlessResources {
    generation: u64,
    sprite_size: Extent2d,
    background_size: Extent2d,
    post_effect: PostEffect,
    /// 视图用纹理尺寸表示
    shader_resources: DescriptorHeap<ResourceSlot, Extent2d>,
    render_targets: DescriptorHeap<RenderTargetSlot, Extent2d>,
    post_process_source: Option<Extent2d>,
    /// 精灵坐标映射到裁剪空间时使用的视口，创建时固定
    sprite_viewport: Extent2d,
    last_sprite_geometry: Option<SpriteGeometry>,
    /// 每帧精灵顶点的字节数
    graphics_memory: GraphicsMemory<usize>,
}

impl HeadlessResources {
    /// 离屏渲染目标尺寸
    pub fn render_texture_size(&self) -> Option<Extent2d> {
        self.render_targets.get(RenderTargetSlot::IntermediateRT).copied()
    }

    /// 后处理当前的输入尺寸
    pub fn post_process_source(&self) -> Option<Extent2d> {
        self.post_process_source
    }

    pub fn post_effect(&self) -> PostEffect {
        self.post_effect
    }

    pub fn graphics_memory(&self) -> &GraphicsMemory<usize> {
        &self.graphics_memory
    }

    pub fn sprite_viewport(&self) -> Extent2d {
        self.sprite_viewport
    }

    /// 最近一个精灵批次展开后的顶点
    pub fn last_sprite_geometry(&self) -> Option<&SpriteGeometry> {
        self.last_sprite_geometry.as_ref()
    }
}

impl DeviceDependentResources for HeadlessResources {
    fn sprite_size(&self) -> Extent2d {
        self.sprite_size
    }

    fn background_size(&self) -> Extent2d {
        self.background_size
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// 无窗口后端
#[derive(Debug)]
pub struct HeadlessBackend {
    output_size: Extent2d,
    generation: u64,
    device_lost: bool,
    frame_open: bool,
    presented_frames: u64,
    fences: FenceManager,
    record_calls: bool,
    calls: Vec<BackendCall>,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        info!(width, height, "Initializing headless backend");
        Self {
            output_size: Extent2d::new(width, height),
            generation: 0,
            device_lost: false,
            frame_open: false,
            presented_frames: 0,
            fences: FenceManager::new(),
            record_calls: true,
            calls: Vec::new(),
        }
    }

    /// 是否记录调用日志，长时间运行时关闭
    pub fn with_call_log(mut self, enabled: bool) -> Self {
        self.record_calls = enabled;
        self
    }

    /// 下一次 `prepare` / `present` 报告设备丢失
    pub fn inject_device_lost(&mut self) {
        warn!("Injecting device lost");
        self.device_lost = true;
    }

    /// 当前设备代数
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 已呈现的帧数
    pub fn presented_frames(&self) -> u64 {
        self.presented_frames
    }

    /// 调用日志
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// 取出并清空调用日志
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// 与 GPU 共享的完成进度
    pub fn fences(&self) -> FenceManager {
        self.fences.clone()
    }

    fn record(&mut self, call: BackendCall) {
        if self.record_calls {
            self.calls.push(call);
        }
    }

    /// 模拟 GPU 完成此前提交的全部工作
    fn complete_submitted_work(&self) {
        self.fences.update_completed_value(self.fences.current_value());
    }

    fn load_texture_size(path: &std::path::Path) -> Result<Extent2d> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| AssetError::from_image(path, e))?;
        debug!(path = %path.display(), width, height, "Loaded texture");
        Ok(Extent2d::new(width, height))
    }

    fn execute(resources: &mut HeadlessResources, commands: &[RenderCommand]) -> Result<()> {
        let mut draws = Vec::new();
        for command in commands {
            match command {
                RenderCommand::BeginScene(slot) | RenderCommand::Clear { target: slot, .. } => {
                    resources.render_targets.gpu_handle(*slot)?;
                }
                RenderCommand::DrawSprite(draw) => {
                    resources.shader_resources.gpu_handle(draw.texture)?;
                    draws.push(*draw);
                }
                RenderCommand::EndSprites => {
                    let geometry = SpriteGeometry::build(&draws, resources.sprite_viewport);
                    if !geometry.is_empty() {
                        let bytes = geometry.vertices.len() * std::mem::size_of::<SpriteVertex>();
                        resources.graphics_memory.allocate(bytes);
                    }
                    resources.last_sprite_geometry = Some(geometry);
                    draws.clear();
                }
                RenderCommand::PostProcess { source, .. } => {
                    resources.shader_resources.gpu_handle(*source)?;
                    if resources.post_process_source.is_none() {
                        return Err(GraphicsError::CommandExecution(
                            "Post process source is not bound".to_string(),
                        )
                        .into());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Resources = HeadlessResources;

    fn backend_name(&self) -> &str {
        "headless"
    }

    fn output_size(&self) -> Extent2d {
        self.output_size
    }

    fn window_size_changed(&mut self, width: u32, height: u32) -> bool {
        let size = Extent2d::new(width, height);
        if size.is_empty() || size == self.output_size {
            return false;
        }
        self.output_size = size;
        self.record(BackendCall::WindowSizeChanged(size));
        true
    }

    fn create_device_dependent_resources(
        &mut self,
        desc: &ResourceSetDescriptor,
    ) -> Result<Self::Resources> {
        self.record(BackendCall::CreateDeviceDependentResources {
            generation: self.generation,
        });

        // 上传批次：两张纹理之后一次阻塞等待
        let sprite_size = Self::load_texture_size(&desc.sprite)?;
        let background_size = Self::load_texture_size(&desc.background)?;
        let upload = self.fences.next_value();
        self.fences
            .wait_for_value(upload, || self.complete_submitted_work());

        let mut shader_resources = DescriptorHeap::new();
        shader_resources.create_view(ResourceSlot::Cat, sprite_size);
        shader_resources.create_view(ResourceSlot::Background, background_size);

        Ok(HeadlessResources {
            generation: self.generation,
            sprite_size,
            background_size,
            post_effect: desc.post_effect,
            shader_resources,
            render_targets: DescriptorHeap::new(),
            post_process_source: None,
            sprite_viewport: self.output_size,
            last_sprite_geometry: None,
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
        resources
            .render_targets
            .create_view(RenderTargetSlot::IntermediateRT, size);
        resources.shader_resources.create_view(ResourceSlot::SceneTex, size);
        self.record(BackendCall::UpdateRenderTextureSize(size));
        Ok(())
    }

    fn set_post_process_source(&mut self, resources: &mut Self::Resources) -> Result<()> {
        let source = *resources.shader_resources.gpu_handle(ResourceSlot::SceneTex)?;
        resources.post_process_source = Some(source);
        self.record(BackendCall::SetPostProcessSource(source));
        Ok(())
    }

    fn prepare(&mut self) -> Result<FrameStatus> {
        if self.device_lost {
            return Ok(FrameStatus::DeviceLost);
        }
        self.complete_submitted_work();
        self.frame_open = true;
        self.record(BackendCall::Prepare);
        Ok(FrameStatus::Ready)
    }

    fn submit(&mut self, resources: &mut Self::Resources, commands: &CommandList) -> Result<()> {
        if !self.frame_open {
            return Err(GraphicsError::CommandExecution("Submit outside of a frame".to_string()).into());
        }
        if commands.state() != CommandListState::Executable {
            return Err(GraphicsError::CommandExecution(
                "Command list has not been closed".to_string(),
            )
            .into());
        }
        if resources.generation != self.generation {
            return Err(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable));
        }

        Self::execute(resources, commands.commands())?;
        trace!(commands = commands.commands().len(), "Submitted command list");
        if self.record_calls {
            self.record(BackendCall::Submit(commands.commands().to_vec()));
        }
        self.fences.next_value();
        Ok(())
    }

    fn present(&mut self) -> Result<PresentStatus> {
        if !self.frame_open {
            return Err(GraphicsError::SwapchainError("Present outside of a frame".to_string()).into());
        }
        self.frame_open = false;

        if self.device_lost {
            return Ok(PresentStatus::DeviceLost);
        }

        self.presented_frames += 1;
        self.record(BackendCall::Present);
        Ok(PresentStatus::Presented)
    }

    fn commit_graphics_memory(&mut self, resources: &mut Self::Resources) {
        resources.graphics_memory.commit(self.fences.current_value());
        resources.graphics_memory.retire(self.fences.completed_value());
        self.record(BackendCall::CommitGraphicsMemory);
    }

    fn handle_device_lost(&mut self) -> Result<()> {
        self.generation += 1;
        self.device_lost = false;
        self.frame_open = false;
        self.fences.reset();
        info!(generation = self.generation, "Headless device recreated");
        self.record(BackendCall::HandleDeviceLost);
        Ok(())
    }

    fn wait_for_gpu(&mut self) {
        self.fences.flush(|| self.complete_submitted_work());
        self.record(BackendCall::WaitForGpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor(sprite: PathBuf, background: PathBuf) -> ResourceSetDescriptor {
        ResourceSetDescriptor {
            sprite,
            background,
            post_effect: PostEffect::Sepia,
            clear_color: crate::core::math::Color::BLACK,
        }
    }

    fn write_png(name: &str, width: u32, height: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!("dist_sprite_headless_{}_{}.png", std::process::id(), name));
        image::RgbaImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_window_size_changed() {
        let mut backend = HeadlessBackend::new(800, 600);
        assert!(!backend.window_size_changed(800, 600));
        assert!(!backend.window_size_changed(0, 600));
        assert!(backend.window_size_changed(1024, 768));
        assert_eq!(backend.output_size(), Extent2d::new(1024, 768));
        assert_eq!(backend.calls(), &[BackendCall::WindowSizeChanged(Extent2d::new(1024, 768))]);
    }

    #[test]
    fn test_creates_resources_from_image_headers() {
        let sprite = write_png("sprite", 33, 17);
        let background = write_png("background", 64, 32);
        let mut backend = HeadlessBackend::new(320, 240);

        let mut resources = backend
            .create_device_dependent_resources(&descriptor(sprite, background))
            .unwrap();
        assert_eq!(resources.sprite_size(), Extent2d::new(33, 17));
        assert_eq!(resources.background_size(), Extent2d::new(64, 32));
        assert_eq!(resources.generation(), 0);

        // 后处理输入必须先有离屏目标
        assert!(backend.set_post_process_source(&mut resources).is_err());
        backend
            .update_render_texture_size(&mut resources, Extent2d::new(320, 240))
            .unwrap();
        backend.set_post_process_source(&mut resources).unwrap();
        assert_eq!(resources.post_process_source(), Some(Extent2d::new(320, 240)));
    }

    #[test]
    fn test_missing_asset_is_fatal() {
        let mut backend = HeadlessBackend::new(320, 240);
        let missing = std::env::temp_dir().join("dist_sprite_does_not_exist.png");
        let err = backend
            .create_device_dependent_resources(&descriptor(missing.clone(), missing))
            .unwrap_err();
        assert!(matches!(err, DistSpriteError::Asset(AssetError::FileNotFound(_))));
    }

    #[test]
    fn test_device_lost_is_reported_until_handled() {
        let mut backend = HeadlessBackend::new(320, 240);
        assert_eq!(backend.prepare().unwrap(), FrameStatus::Ready);
        backend.inject_device_lost();
        assert_eq!(backend.present().unwrap(), PresentStatus::DeviceLost);
        assert_eq!(backend.prepare().unwrap(), FrameStatus::DeviceLost);

        backend.handle_device_lost().unwrap();
        assert_eq!(backend.generation(), 1);
        assert_eq!(backend.prepare().unwrap(), FrameStatus::Ready);
        assert_eq!(backend.present().unwrap(), PresentStatus::Presented);
        assert_eq!(backend.presented_frames(), 1);
    }

    #[test]
    fn test_present_requires_prepare() {
        let mut backend = HeadlessBackend::new(320, 240);
        assert!(backend.present().is_err());
    }

    #[test]
    fn test_call_log_can_be_disabled() {
        let mut backend = HeadlessBackend::new(320, 240).with_call_log(false);
        assert!(backend.window_size_changed(640, 480));
        assert_eq!(backend.prepare().unwrap(), FrameStatus::Ready);
        assert_eq!(backend.present().unwrap(), PresentStatus::Presented);
        backend.wait_for_gpu();

        assert!(backend.calls().is_empty());
        assert_eq!(backend.presented_frames(), 1);
    }

    #[test]
    fn test_submitted_work_completes_one_frame_later() {
        let sprite = write_png("latency_sprite", 8, 8);
        let background = write_png("latency_background", 8, 8);
        let mut backend = HeadlessBackend::new(320, 240);
        let mut resources = backend
            .create_device_dependent_resources(&descriptor(sprite, background))
            .unwrap();
        backend
            .update_render_texture_size(&mut resources, Extent2d::new(320, 240))
            .unwrap();
        let fences = backend.fences();
        let upload = fences.current_value();
        assert!(fences.is_completed(upload));

        let mut commands = CommandList::new();
        commands.begin().unwrap();
        commands.end().unwrap();
        backend.prepare().unwrap();
        backend.submit(&mut resources, &commands).unwrap();
        let frame = fences.current_value();
        assert!(frame > upload);
        assert!(!fences.is_completed(frame));

        backend.present().unwrap();
        backend.prepare().unwrap();
        assert!(fences.is_completed(frame));
    }
}
