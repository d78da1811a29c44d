//! DistSprite - 精灵渲染示例
//!
//! 一个最小的 2D 示例：背景图拉伸铺满窗口，一只猫的精灵水平移动并循环，
//! 场景先画到离屏渲染目标，再经过一次后处理（默认棕褐色调）写入后缓冲。
//! 设备丢失时整体释放并重建全部设备相关资源。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（数学、日志、配置、错误处理、计时器、窗口消息）
//! - `renderer`: 与图形 API 无关的渲染抽象（命令列表、描述符堆、栅栏、精灵几何、后处理效果）
//! - `gfx`: 图形后端（wgpu 实现与用于测试的无窗口实现）
//! - `game`: 游戏循环与精灵状态
//!
//! # 使用示例
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use dist_sprite::core::Config;
//! use dist_sprite::game::Game;
//! use dist_sprite::gfx::HeadlessBackend;
//!
//! # fn main() -> dist_sprite::core::Result<()> {
//! let config = Config::default();
//! let mut game = Game::new(HeadlessBackend::new(1280, 720), &config);
//! game.initialize()?;
//!
//! for _ in 0..60 {
//!     game.advance(Duration::from_millis(16))?;
//! }
//! println!("精灵位置: {}", game.sprite().screen_pos.x);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod renderer;
pub mod gfx;
pub mod game;
