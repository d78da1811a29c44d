//! 配置管理模块
//!
//! 提供示例程序配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//! title = "DistSprite"
//! resizable = true
//!
//! [graphics]
//! backend = "wgpu"        # wgpu, dx12 或 headless
//! vsync = true
//! post_effect = "sepia"   # copy, monochrome, sepia
//! back_buffer_count = 2
//!
//! [timer]
//! fixed_time_step = false
//! target_elapsed_seconds = 0.016666668
//!
//! [assets]
//! sprite = "cat.png"
//! background = "sunset.jpg"
//!
//! [headless]
//! frames = 120
//!
//! [logging]
//! level = "info"          # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use crate::game::DEFAULT_SIZE;
use crate::renderer::post_process::PostEffect;

/// 程序配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 计时器配置
    #[serde(default)]
    pub timer: TimerConfig,

    /// 纹理资源路径
    #[serde(default)]
    pub assets: AssetConfig,

    /// 无窗口运行配置
    #[serde(default)]
    pub headless: HeadlessConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 后处理效果
    #[serde(default)]
    pub post_effect: PostEffect,

    /// 交换链缓冲数量
    #[serde(default = "default_back_buffer_count")]
    pub back_buffer_count: u32,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// wgpu 后端，自动选择平台 API
    Wgpu,
    /// wgpu 后端，强制使用 DirectX 12
    Dx12,
    /// 无窗口、无 GPU 的记录后端
    Headless,
}

/// 计时器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// 是否使用固定时间步长
    #[serde(default)]
    pub fixed_time_step: bool,

    /// 固定步长的目标间隔（秒）
    #[serde(default = "default_target_elapsed_seconds")]
    pub target_elapsed_seconds: f64,
}

/// 纹理资源路径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// 移动精灵的纹理
    #[serde(default = "default_sprite_path")]
    pub sprite: PathBuf,

    /// 全屏背景纹理
    #[serde(default = "default_background_path")]
    pub background: PathBuf,
}

/// 无窗口运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessConfig {
    /// 运行的帧数
    #[serde(default = "default_headless_frames")]
    pub frames: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { DEFAULT_SIZE.0 }
fn default_height() -> u32 { DEFAULT_SIZE.1 }
fn default_title() -> String { "DistSprite".to_string() }
fn default_resizable() -> bool { true }
fn default_backend() -> GraphicsBackend { GraphicsBackend::Wgpu }
fn default_vsync() -> bool { true }
fn default_back_buffer_count() -> u32 { 2 }
fn default_target_elapsed_seconds() -> f64 { 1.0 / 60.0 }
fn default_sprite_path() -> PathBuf { PathBuf::from("cat.png") }
fn default_background_path() -> PathBuf { PathBuf::from("sunset.jpg") }
fn default_headless_frames() -> u64 { 120 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "distsprite.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: default_vsync(),
            post_effect: PostEffect::default(),
            back_buffer_count: default_back_buffer_count(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: false,
            target_elapsed_seconds: default_target_elapsed_seconds(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            sprite: default_sprite_path(),
            background: default_background_path(),
        }
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: default_headless_frames(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use dist_sprite::core::Config;
    ///
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或解析失败则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--dx12` / `--wgpu` / `--headless`: 选择后端
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--frames <value>`: 无窗口模式运行的帧数
    /// - `--effect <copy|monochrome|sepia>`: 后处理效果
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--dx12") {
            self.graphics.backend = GraphicsBackend::Dx12;
        }

        if args.iter().any(|a| a == "--wgpu") {
            self.graphics.backend = GraphicsBackend::Wgpu;
        }

        if args.iter().any(|a| a == "--headless") {
            self.graphics.backend = GraphicsBackend::Headless;
        }

        if let Some(width) = value_after(&args, "--width").and_then(|v| v.parse().ok()) {
            self.window.width = width;
        }

        if let Some(height) = value_after(&args, "--height").and_then(|v| v.parse().ok()) {
            self.window.height = height;
        }

        if let Some(frames) = value_after(&args, "--frames").and_then(|v| v.parse().ok()) {
            self.headless.frames = frames;
        }

        if let Some(effect) = value_after(&args, "--effect").and_then(PostEffect::from_name) {
            self.graphics.post_effect = effect;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if !matches!(self.graphics.back_buffer_count, 2 | 3) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.back_buffer_count".to_string(),
                reason: "Back buffer count must be 2 or 3".to_string(),
            }
            .into());
        }

        let step = self.timer.target_elapsed_seconds;
        if step.is_nan() || step <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "timer.target_elapsed_seconds".to_string(),
                reason: "Target elapsed time must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).map(String::as_str)
}

impl GraphicsBackend {
    /// 是否需要窗口和 GPU
    pub fn is_headless(&self) -> bool {
        matches!(self, GraphicsBackend::Headless)
    }

    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::Wgpu => "wgpu",
            GraphicsBackend::Dx12 => "DirectX 12",
            GraphicsBackend::Headless => "headless",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.backend, GraphicsBackend::Wgpu);
        assert_eq!(config.graphics.post_effect, PostEffect::Sepia);
        assert_eq!(config.assets.sprite, PathBuf::from("cat.png"));
        assert_eq!(config.assets.background, PathBuf::from("sunset.jpg"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "headless"
            post_effect = "monochrome"

            [assets]
            sprite = "sprites/ball.png"
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.backend, GraphicsBackend::Headless);
        assert_eq!(config.graphics.post_effect, PostEffect::Monochrome);
        assert_eq!(config.assets.sprite, PathBuf::from("sprites/ball.png"));
        assert_eq!(config.assets.background, PathBuf::from("sunset.jpg"));
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("dist_sprite_config_{}.toml", std::process::id()));
        let mut config = Config::default();
        config.graphics.post_effect = PostEffect::Copy;
        config.headless.frames = 7;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.graphics.post_effect, PostEffect::Copy);
        assert_eq!(reloaded.headless.frames, 7);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::from_toml_str("[window]\nwidth = \"wide\"").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: Failed to parse config"));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args([
            "dist_sprite", "--headless", "--width", "640", "--height", "480",
            "--frames", "10", "--effect", "copy",
        ]);

        assert!(config.graphics.backend.is_headless());
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 480);
        assert_eq!(config.headless.frames, 10);
        assert_eq!(config.graphics.post_effect, PostEffect::Copy);
    }

    #[test]
    fn test_apply_args_ignores_bad_values() {
        let mut config = Config::default();
        config.apply_args(["dist_sprite", "--width", "abc", "--effect", "bloom", "--height"]);
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.post_effect, PostEffect::Sepia);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.back_buffer_count = 5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timer.target_elapsed_seconds = 0.0;
        assert!(config.validate().is_err());
    }
}
