//! 图形后端模块
//!
//! 本模块封装了设备/呈现上下文的具体实现：
//! - wgpu：真实的 GPU 后端（Windows 上可强制使用 DirectX 12）
//! - headless：无窗口、无 GPU 的后端，记录每一次调用
//!
//! 所有后端都实现了统一的 `GraphicsBackend` trait，
//! 游戏循环对具体后端是泛型的。

pub mod backend;
pub mod headless;
pub mod wgpu;

pub use backend::{
    DeviceDependentResources, FrameStatus, GraphicsBackend, PresentStatus, ResourceSetDescriptor,
};
pub use headless::HeadlessBackend;
