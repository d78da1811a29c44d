//! 图形后端的统一抽象接口
//!
//! 游戏循环只通过这个 trait 与设备/呈现上下文交互。
//! 后端负责设备、交换链、深度缓冲和命令执行，并在呈现时报告设备丢失；
//! 设备相关资源由后端创建，但整体归游戏循环所有，丢失时由游戏循环整体释放。

use std::path::PathBuf;

use crate::core::error::Result;
use crate::core::math::Color;
use crate::core::Config;
use crate::renderer::command::CommandList;
use crate::renderer::post_process::PostEffect;
use crate::renderer::resource::Extent2d;

/// 创建设备相关资源所需的参数
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSetDescriptor {
    /// 精灵纹理路径
    pub sprite: PathBuf,
    /// 背景纹理路径
    pub background: PathBuf,
    pub post_effect: PostEffect,
    /// 离屏目标的清除颜色（线性空间）
    pub clear_color: Color,
}

impl ResourceSetDescriptor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sprite: config.assets.sprite.clone(),
            background: config.assets.background.clone(),
            post_effect: config.graphics.post_effect,
            clear_color: Color::CORNFLOWER_BLUE.srgb_to_linear(),
        }
    }
}

/// 设备相关资源集
///
/// 纹理、描述符表、管线、精灵批次、临时显存都在这一个值里，不支持部分重建。
pub trait DeviceDependentResources {
    /// 精灵纹理尺寸
    fn sprite_size(&self) -> Extent2d;

    /// 背景纹理尺寸
    fn background_size(&self) -> Extent2d;

    /// 创建这组资源的设备代数，每次重建设备加一
    fn generation(&self) -> u64;
}

/// 帧准备结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// 可以记录并提交
    Ready,
    /// 本帧跳过（例如交换链过期已重建、窗口最小化）
    Skipped,
    /// 设备已丢失
    DeviceLost,
}

/// 呈现结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    /// 设备已丢失，需要整体重建设备相关资源
    DeviceLost,
}

/// 图形后端的统一接口
///
/// # 帧生命周期
///
/// `prepare` → `submit` → `present` → `commit_graphics_memory`
///
/// # 设备丢失
///
/// `prepare` 或 `present` 报告 `DeviceLost` 后，调用方先释放资源集，
/// 再调用 `handle_device_lost` 重建设备，然后重新创建资源集。
pub trait GraphicsBackend {
    /// 设备相关资源集的具体类型
    type Resources: DeviceDependentResources;

    /// 获取后端的名称
    fn backend_name(&self) -> &str;

    /// 当前输出（交换链）尺寸
    fn output_size(&self) -> Extent2d;

    /// 通知窗口尺寸变化
    ///
    /// 尺寸未变或为 0 时返回 `false`，不做任何事。
    /// 返回 `true` 表示交换链与深度缓冲已按新尺寸重建。
    fn window_size_changed(&mut self, width: u32, height: u32) -> bool;

    /// 创建全部设备相关资源
    ///
    /// 纹理通过一次上传批次同步加载，返回前阻塞等待上传完成。
    fn create_device_dependent_resources(
        &mut self,
        desc: &ResourceSetDescriptor,
    ) -> Result<Self::Resources>;

    /// 按输出尺寸重建离屏渲染目标
    fn update_render_texture_size(
        &mut self,
        resources: &mut Self::Resources,
        size: Extent2d,
    ) -> Result<()>;

    /// 把离屏渲染目标重新绑定为后处理输入
    fn set_post_process_source(&mut self, resources: &mut Self::Resources) -> Result<()>;

    /// 开始一帧
    fn prepare(&mut self) -> Result<FrameStatus>;

    /// 执行一帧的命令列表
    fn submit(&mut self, resources: &mut Self::Resources, commands: &CommandList) -> Result<()>;

    /// 呈现
    fn present(&mut self) -> Result<PresentStatus>;

    /// 回收 GPU 已完成的临时分配
    fn commit_graphics_memory(&mut self, resources: &mut Self::Resources);

    /// 重建设备与窗口尺寸相关的状态
    fn handle_device_lost(&mut self) -> Result<()>;

    /// 阻塞直到已提交的 GPU 工作全部完成
    fn wait_for_gpu(&mut self);
}
