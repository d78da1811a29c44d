//! 游戏循环
//!
//! `Game` 持有后端、计时器和设备相关资源集，每次 `tick` 推进计时器、
//! 更新精灵位置，然后渲染一帧：
//!
//! ```text
//! prepare → 离屏场景（清除、背景、精灵）→ 后缓冲 → 后处理 → present → 回收临时显存
//! ```
//!
//! # 设备丢失
//!
//! 后端在 `prepare` 或 `present` 时报告设备丢失。状态依次经过
//! `Active → Lost → Restoring → Active`：先整体释放资源集，后端重建设备，
//! 再按启动时的顺序重建全部资源。重建失败直接向上传播。

pub mod sprite;

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::core::error::{DistSpriteError, GraphicsError, Result};
use crate::core::event::{EventHandler, WindowMessage};
use crate::core::timer::StepTimer;
use crate::core::Config;
use crate::gfx::backend::{
    DeviceDependentResources, FrameStatus, GraphicsBackend, PresentStatus, ResourceSetDescriptor,
};
use crate::renderer::command::CommandList;
use crate::renderer::descriptor::{RenderTargetSlot, ResourceSlot};
use crate::renderer::resource::Rect;
use crate::renderer::sprite::SpriteDraw;

pub use sprite::{SpriteState, SPRITE_STEP};

/// 默认窗口尺寸
pub const DEFAULT_SIZE: (u32, u32) = (1280, 720);

/// 清除深度值
const CLEAR_DEPTH: f32 = 1.0;

/// 设备状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// 尚未初始化
    Uninitialized,
    Active,
    /// 资源已释放，等待重建设备
    Lost,
    /// 正在重建资源
    Restoring,
}

/// 游戏循环
pub struct Game<B: GraphicsBackend> {
    backend: B,
    timer: StepTimer,
    descriptor: ResourceSetDescriptor,
    resources: Option<B::Resources>,
    sprite: SpriteState,
    fullscreen_rect: Rect,
    device_state: DeviceState,
    command_list: CommandList,
    last_fps_report: u64,
}

impl<B: GraphicsBackend> Game<B> {
    /// 创建游戏循环，计时器模式取自配置
    pub fn new(backend: B, config: &Config) -> Self {
        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(config.timer.fixed_time_step);
        timer.set_target_elapsed_seconds(config.timer.target_elapsed_seconds);

        Self {
            backend,
            timer,
            descriptor: ResourceSetDescriptor::from_config(config),
            resources: None,
            sprite: SpriteState::default(),
            fullscreen_rect: Rect::default(),
            device_state: DeviceState::Uninitialized,
            command_list: CommandList::new(),
            last_fps_report: 0,
        }
    }

    /// 默认窗口尺寸
    pub fn default_size() -> (u32, u32) {
        DEFAULT_SIZE
    }

    /// 创建设备相关资源和窗口尺寸相关资源
    pub fn initialize(&mut self) -> Result<()> {
        info!(backend = self.backend.backend_name(), "Initializing game");
        self.create_device_dependent_resources()?;
        self.create_window_size_dependent_resources()?;
        self.device_state = DeviceState::Active;
        Ok(())
    }

    /// 按真实时间推进一帧
    pub fn tick(&mut self) -> Result<()> {
        let width = self.backend.output_size().width as f32;
        let sprite = &mut self.sprite;
        self.timer
            .tick(|timer| sprite.update(timer.elapsed_seconds() as f32, width));
        self.report_frame_rate();
        self.render()
    }

    /// 按给定的时间间隔推进一帧
    pub fn advance(&mut self, delta: Duration) -> Result<()> {
        let width = self.backend.output_size().width as f32;
        let sprite = &mut self.sprite;
        self.timer
            .advance(delta, |timer| sprite.update(timer.elapsed_seconds() as f32, width));
        self.render()
    }

    /// 更新一次精灵位置
    pub fn update(&mut self) {
        let width = self.backend.output_size().width as f32;
        self.sprite
            .update(self.timer.elapsed_seconds() as f32, width);
    }

    /// 渲染一帧
    ///
    /// 计时器还没有更新过时什么都不做。
    pub fn render(&mut self) -> Result<()> {
        if self.timer.frame_count() == 0 {
            return Ok(());
        }

        let (sprite_size, background_size) = match self.resources.as_ref() {
            Some(resources) => (resources.sprite_size(), resources.background_size()),
            None => return Err(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable)),
        };

        match self.backend.prepare()? {
            FrameStatus::Ready => {}
            FrameStatus::Skipped => {
                trace!("Frame skipped");
                return Ok(());
            }
            FrameStatus::DeviceLost => return self.handle_device_lost(),
        }

        self.command_list.begin()?;
        self.clear()?;

        self.command_list.set_descriptor_heaps()?;
        self.command_list.begin_sprites()?;
        self.command_list.draw_sprite(SpriteDraw::stretched(
            ResourceSlot::Background,
            background_size,
            self.fullscreen_rect,
        ))?;
        self.command_list.draw_sprite(
            SpriteDraw::at(ResourceSlot::Cat, sprite_size, self.sprite.screen_pos)
                .with_origin(self.sprite.origin),
        )?;
        self.command_list.end_sprites()?;

        self.command_list.end_scene(RenderTargetSlot::IntermediateRT)?;

        self.command_list.bind_back_buffer()?;
        self.command_list.set_descriptor_heaps()?;
        self.command_list
            .post_process(ResourceSlot::SceneTex, self.descriptor.post_effect)?;
        self.command_list.end()?;

        let resources = self
            .resources
            .as_mut()
            .ok_or(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable))?;
        self.backend.submit(resources, &self.command_list)?;

        match self.backend.present()? {
            PresentStatus::Presented => {
                self.backend.commit_graphics_memory(resources);
                Ok(())
            }
            PresentStatus::DeviceLost => self.handle_device_lost(),
        }
    }

    /// 开始离屏场景，清除颜色与深度，设置视口
    fn clear(&mut self) -> Result<()> {
        let target = RenderTargetSlot::IntermediateRT;
        self.command_list.begin_scene(target)?;
        self.command_list
            .clear(target, self.descriptor.clear_color, CLEAR_DEPTH)?;
        self.command_list
            .set_viewport(Rect::from_extent(self.backend.output_size()))?;
        Ok(())
    }

    // 消息处理

    pub fn on_activated(&mut self) {
        debug!("Game activated");
    }

    pub fn on_deactivated(&mut self) {
        debug!("Game deactivated");
    }

    pub fn on_suspending(&mut self) {
        info!("Game suspending");
    }

    /// 从挂起恢复，丢弃挂起期间流逝的时间
    pub fn on_resuming(&mut self) {
        info!("Game resuming");
        self.timer.reset_elapsed_time();
    }

    /// 窗口移动后按当前输出尺寸重新检查一次
    pub fn on_window_moved(&mut self) -> Result<()> {
        let size = self.backend.output_size();
        self.on_window_size_changed(size.width, size.height)
    }

    /// 窗口尺寸变化；尺寸未变时什么都不做
    pub fn on_window_size_changed(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.backend.window_size_changed(width, height) {
            return Ok(());
        }
        debug!(width, height, "Window size changed");
        self.create_window_size_dependent_resources()
    }

    /// 释放全部设备相关资源
    pub fn on_device_lost(&mut self) {
        warn!("Device lost, releasing device dependent resources");
        self.resources = None;
        self.device_state = DeviceState::Lost;
    }

    /// 按启动顺序重建全部资源
    pub fn on_device_restored(&mut self) -> Result<()> {
        info!("Restoring device dependent resources");
        self.device_state = DeviceState::Restoring;
        self.create_device_dependent_resources()?;
        self.create_window_size_dependent_resources()?;
        self.device_state = DeviceState::Active;
        Ok(())
    }

    fn handle_device_lost(&mut self) -> Result<()> {
        self.on_device_lost();
        self.backend.handle_device_lost()?;
        self.on_device_restored()
    }

    fn create_device_dependent_resources(&mut self) -> Result<()> {
        let resources = self
            .backend
            .create_device_dependent_resources(&self.descriptor)?;

        let output = self.backend.output_size();
        self.sprite = SpriteState::centered(output, resources.sprite_size());
        self.fullscreen_rect = Rect::from_extent(output);

        debug!(
            generation = resources.generation(),
            origin_x = self.sprite.origin.x,
            origin_y = self.sprite.origin.y,
            "Device dependent resources created"
        );
        self.resources = Some(resources);
        Ok(())
    }

    fn create_window_size_dependent_resources(&mut self) -> Result<()> {
        let size = self.backend.output_size();
        let resources = self
            .resources
            .as_mut()
            .ok_or(DistSpriteError::Graphics(GraphicsError::ResourcesUnavailable))?;
        self.backend.update_render_texture_size(resources, size)?;
        self.backend.set_post_process_source(resources)
    }

    fn report_frame_rate(&mut self) {
        let second = self.timer.total_seconds() as u64;
        if second > self.last_fps_report {
            self.last_fps_report = second;
            debug!(
                fps = self.timer.frames_per_second(),
                frames = self.timer.frame_count(),
                "Frame statistics"
            );
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn timer(&self) -> &StepTimer {
        &self.timer
    }

    pub fn sprite(&self) -> &SpriteState {
        &self.sprite
    }

    pub fn sprite_mut(&mut self) -> &mut SpriteState {
        &mut self.sprite
    }

    pub fn resources(&self) -> Option<&B::Resources> {
        self.resources.as_ref()
    }

    pub fn device_state(&self) -> DeviceState {
        self.device_state
    }

    pub fn fullscreen_rect(&self) -> Rect {
        self.fullscreen_rect
    }

    /// 最近一帧记录的命令列表
    pub fn command_list(&self) -> &CommandList {
        &self.command_list
    }
}

impl<B: GraphicsBackend> EventHandler for Game<B> {
    fn handle_message(&mut self, message: WindowMessage) -> Result<()> {
        trace!(message = %message.detail(), "Window message");
        match message {
            WindowMessage::SizeChanged { width, height } => self.on_window_size_changed(width, height),
            WindowMessage::Moved => self.on_window_moved(),
            WindowMessage::Activated => {
                self.on_activated();
                Ok(())
            }
            WindowMessage::Deactivated => {
                self.on_deactivated();
                Ok(())
            }
            WindowMessage::Suspending => {
                self.on_suspending();
                Ok(())
            }
            WindowMessage::Resuming => {
                self.on_resuming();
                Ok(())
            }
        }
    }
}

impl<B: GraphicsBackend> Drop for Game<B> {
    fn drop(&mut self) {
        self.backend.wait_for_gpu();
    }
}
