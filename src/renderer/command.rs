//! 命令列表
//!
//! 一帧的渲染命令先记录到与图形 API 无关的 `CommandList`，再由后端翻译执行。
//! 记录时校验顺序，错误的顺序在提交前就会被拒绝：
//!
//! - 精灵批次必须在离屏场景中、且已绑定描述符表之后开始
//! - 精灵绘制必须在批次内
//! - 后处理必须在离屏场景结束、后缓冲绑定之后
//! - 结束记录时不能有未关闭的场景或批次

use super::descriptor::{RenderTargetSlot, ResourceSlot};
use super::post_process::PostEffect;
use super::resource::Rect;
use super::sprite::SpriteDraw;
use crate::core::error::{DistSpriteError, GraphicsError, Result};
use crate::core::math::Color;

/// 渲染命令
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// 开始向离屏目标渲染
    BeginScene(RenderTargetSlot),
    /// 清除颜色与深度
    Clear {
        target: RenderTargetSlot,
        color: Color,
        depth: f32,
    },
    /// 设置视口与裁剪矩形
    SetViewport(Rect),
    /// 绑定着色资源表
    SetDescriptorHeaps,
    BeginSprites,
    DrawSprite(SpriteDraw),
    EndSprites,
    /// 结束离屏渲染，目标转为可采样
    EndScene(RenderTargetSlot),
    /// 绑定交换链后缓冲为输出
    BindBackBuffer,
    /// 全屏后处理
    PostProcess {
        source: ResourceSlot,
        effect: PostEffect,
    },
}

impl RenderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            RenderCommand::BeginScene(_) => "BeginScene",
            RenderCommand::Clear { .. } => "Clear",
            RenderCommand::SetViewport(_) => "SetViewport",
            RenderCommand::SetDescriptorHeaps => "SetDescriptorHeaps",
            RenderCommand::BeginSprites => "BeginSprites",
            RenderCommand::DrawSprite(_) => "DrawSprite",
            RenderCommand::EndSprites => "EndSprites",
            RenderCommand::EndScene(_) => "EndScene",
            RenderCommand::BindBackBuffer => "BindBackBuffer",
            RenderCommand::PostProcess { .. } => "PostProcess",
        }
    }
}

/// 命令列表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    /// 初始状态
    Initial,
    /// 正在记录
    Recording,
    /// 已完成记录
    Executable,
}

/// 一帧的命令列表
#[derive(Debug, Clone)]
pub struct CommandList {
    state: CommandListState,
    commands: Vec<RenderCommand>,
    open_scene: Option<RenderTargetSlot>,
    in_sprite_batch: bool,
    heaps_bound: bool,
    scene_resolved: bool,
    back_buffer_bound: bool,
}

impl CommandList {
    /// 创建新的命令列表
    pub fn new() -> Self {
        Self {
            state: CommandListState::Initial,
            commands: Vec::new(),
            open_scene: None,
            in_sprite_batch: false,
            heaps_bound: false,
            scene_resolved: false,
            back_buffer_bound: false,
        }
    }

    /// 开始记录命令
    pub fn begin(&mut self) -> Result<()> {
        match self.state {
            CommandListState::Initial | CommandListState::Executable => {
                self.reset();
                self.state = CommandListState::Recording;
                Ok(())
            }
            CommandListState::Recording => Err(invalid("Command list is already recording")),
        }
    }

    /// 结束记录命令
    pub fn end(&mut self) -> Result<()> {
        self.expect_recording("end")?;
        if self.in_sprite_batch {
            return Err(invalid("Sprite batch is still open"));
        }
        if let Some(slot) = self.open_scene {
            return Err(invalid(&format!("Scene {:?} is still open", slot)));
        }
        self.state = CommandListState::Executable;
        Ok(())
    }

    pub fn begin_scene(&mut self, target: RenderTargetSlot) -> Result<()> {
        self.expect_recording("begin_scene")?;
        if self.open_scene.is_some() {
            return Err(invalid("A scene is already open"));
        }
        self.open_scene = Some(target);
        self.scene_resolved = false;
        self.back_buffer_bound = false;
        self.push(RenderCommand::BeginScene(target));
        Ok(())
    }

    pub fn clear(&mut self, target: RenderTargetSlot, color: Color, depth: f32) -> Result<()> {
        self.expect_recording("clear")?;
        if self.open_scene != Some(target) {
            return Err(invalid("Clear target is not the open scene"));
        }
        self.push(RenderCommand::Clear { target, color, depth });
        Ok(())
    }

    pub fn set_viewport(&mut self, rect: Rect) -> Result<()> {
        self.expect_recording("set_viewport")?;
        self.push(RenderCommand::SetViewport(rect));
        Ok(())
    }

    pub fn set_descriptor_heaps(&mut self) -> Result<()> {
        self.expect_recording("set_descriptor_heaps")?;
        self.heaps_bound = true;
        self.push(RenderCommand::SetDescriptorHeaps);
        Ok(())
    }

    pub fn begin_sprites(&mut self) -> Result<()> {
        self.expect_recording("begin_sprites")?;
        if self.open_scene.is_none() {
            return Err(invalid("Sprite batch must be inside a scene"));
        }
        if !self.heaps_bound {
            return Err(invalid("Descriptor heaps are not bound"));
        }
        if self.in_sprite_batch {
            return Err(invalid("Sprite batch is already open"));
        }
        self.in_sprite_batch = true;
        self.push(RenderCommand::BeginSprites);
        Ok(())
    }

    pub fn draw_sprite(&mut self, draw: SpriteDraw) -> Result<()> {
        self.expect_recording("draw_sprite")?;
        if !self.in_sprite_batch {
            return Err(invalid("Sprite draw outside of a sprite batch"));
        }
        self.push(RenderCommand::DrawSprite(draw));
        Ok(())
    }

    pub fn end_sprites(&mut self) -> Result<()> {
        self.expect_recording("end_sprites")?;
        if !self.in_sprite_batch {
            return Err(invalid("No sprite batch is open"));
        }
        self.in_sprite_batch = false;
        self.push(RenderCommand::EndSprites);
        Ok(())
    }

    pub fn end_scene(&mut self, target: RenderTargetSlot) -> Result<()> {
        self.expect_recording("end_scene")?;
        if self.in_sprite_batch {
            return Err(invalid("Sprite batch is still open"));
        }
        if self.open_scene != Some(target) {
            return Err(invalid("End scene does not match the open scene"));
        }
        self.open_scene = None;
        self.scene_resolved = true;
        self.push(RenderCommand::EndScene(target));
        Ok(())
    }

    pub fn bind_back_buffer(&mut self) -> Result<()> {
        self.expect_recording("bind_back_buffer")?;
        if self.open_scene.is_some() {
            return Err(invalid("Cannot bind the back buffer while a scene is open"));
        }
        self.back_buffer_bound = true;
        self.push(RenderCommand::BindBackBuffer);
        Ok(())
    }

    pub fn post_process(&mut self, source: ResourceSlot, effect: PostEffect) -> Result<()> {
        self.expect_recording("post_process")?;
        if !self.scene_resolved {
            return Err(invalid("Post process before the scene has ended"));
        }
        if !self.back_buffer_bound {
            return Err(invalid("Post process before the back buffer is bound"));
        }
        if !self.heaps_bound {
            return Err(invalid("Descriptor heaps are not bound"));
        }
        self.push(RenderCommand::PostProcess { source, effect });
        Ok(())
    }

    /// 重置为空列表（保留分配）
    pub fn reset(&mut self) {
        self.state = CommandListState::Initial;
        self.commands.clear();
        self.open_scene = None;
        self.in_sprite_batch = false;
        self.heaps_bound = false;
        self.scene_resolved = false;
        self.back_buffer_bound = false;
    }

    /// 获取当前状态
    pub fn state(&self) -> CommandListState {
        self.state
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 精灵绘制次数
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawSprite(_)))
            .count()
    }

    fn push(&mut self, command: RenderCommand) {
        tracing::trace!(command = command.name(), "Record");
        self.commands.push(command);
    }

    fn expect_recording(&self, op: &str) -> Result<()> {
        if self.state != CommandListState::Recording {
            return Err(invalid(&format!("Must be in recording state for {}", op)));
        }
        Ok(())
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: &str) -> DistSpriteError {
    DistSpriteError::Graphics(GraphicsError::CommandExecution(message.to_string()))
}
