//! 渲染工具包
//!
//! 与具体图形 API 无关的渲染组件：描述符表、命令列表、精灵几何、
//! 后处理参数、资源描述与 GPU 同步。具体的执行在 `gfx` 模块的后端中完成。
//!
//! # 架构设计
//!
//! - 游戏循环把一帧记录为 `CommandList`
//! - 后端（wgpu / headless）按命令顺序翻译执行
//! - 设备相关资源由后端创建，整体归游戏循环所有

pub mod resource;
pub mod sync;
pub mod command;
pub mod descriptor;
pub mod sprite;
pub mod post_process;

pub use command::{CommandList, RenderCommand};
pub use descriptor::{DescriptorHeap, RenderTargetSlot, ResourceSlot};
pub use post_process::PostEffect;
pub use resource::{Extent2d, Rect};
pub use sprite::SpriteDraw;
