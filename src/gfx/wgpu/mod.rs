//! wgpu 图形后端实现
//!
//! wgpu 是一个跨平台的图形 API，在 Windows 上可以运行于 DirectX 12，
//! 其他平台运行于 Vulkan 或 Metal。
//!
//! # 模块结构
//!
//! - `context` - 设备、队列、交换链与深度缓冲
//! - `texture` - 纹理上传批次与离屏渲染目标
//! - `sprite_batch` - 精灵管线
//! - `post_process` - 全屏后处理管线
//! - `backend` - `GraphicsBackend` 的实现

mod backend;
mod context;
mod post_process;
mod sprite_batch;
mod texture;

pub use backend::{WgpuBackend, WgpuResources};
pub use context::WgpuContext;
