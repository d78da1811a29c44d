//! 核心功能模块
//!
//! 本模块提供了示例程序的基础功能，包括数学类型、日志系统、配置管理、
//! 错误处理、帧计时器和窗口消息。这些模块独立于具体的图形 API。
//!
//! # 模块组织
//!
//! - `math`：向量与颜色类型
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载设置
//! - `error`：错误处理，定义统一的错误类型
//! - `timer`：帧计时器，驱动更新节奏
//! - `event`：窗口生命周期消息

pub mod math;
pub mod log;
pub mod config;
pub mod error;
pub mod timer;
pub mod event;

// 重新导出常用类型，方便使用
pub use math::{Vector2, Vector3, Vector4, Color};
pub use error::{Result, DistSpriteError};
pub use config::Config;
pub use timer::StepTimer;
pub use event::{EventHandler, EventType, WindowMessage};
