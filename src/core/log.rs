//! 日志系统模块
//!
//! 基于 `tracing` 的结构化日志。控制台总是输出；打开 `file_output` 后
//! 另写一份按天滚动的日志文件。wgpu 内部的 crate 默认压到 `warn`，
//! 以免每帧的资源跟踪淹没示例自己的输出。
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_sprite::core::log;
//! use dist_sprite::core::config::LogLevel;
//!
//! log::init_logger(LogLevel::Debug, false, None);
//! tracing::info!(width = 1280, height = 720, "Window created");
//! ```

use std::path::Path;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::LogLevel;

const DEFAULT_LOG_FILE: &str = "distsprite.log";

/// 图形栈内部的 crate，除非显式要求否则只保留警告
const QUIET_TARGETS: [&str; 4] = ["wgpu_core", "wgpu_hal", "naga", "winit"];

/// 初始化日志系统
///
/// 在程序开始时调用一次，重复调用只打印一条警告。
/// 设置了 `RUST_LOG` 时以环境变量为准。
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    let console = fmt::layer().with_target(true).with_ansi(true);

    let result = if file_output {
        let path = Path::new(log_file_path.unwrap_or(DEFAULT_LOG_FILE));
        let directory = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);
        let appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(fmt::layer().with_ansi(false).with_writer(appender))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logger already initialized: {}", e);
    }
}

/// 全局级别加上图形栈内部 crate 的降噪指令
fn default_filter(level: LogLevel) -> EnvFilter {
    let mut directives = vec![level.as_filter().to_string()];
    if Level::from(level) > Level::WARN {
        directives.extend(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)));
    }
    EnvFilter::new(directives.join(","))
}

/// 应用层日志 - Info 级别
#[macro_export]
macro_rules! app_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "dist_sprite::app", $($arg)*)
    };
}

/// 应用层日志 - Warn 级别
#[macro_export]
macro_rules! app_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "dist_sprite::app", $($arg)*)
    };
}

/// 应用层日志 - Error 级别
#[macro_export]
macro_rules! app_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "dist_sprite::app", $($arg)*)
    };
}

impl LogLevel {
    /// `EnvFilter` 指令
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}
