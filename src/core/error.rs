//! 错误处理模块
//!
//! 定义了示例程序中使用的统一错误类型，使用 `thiserror` 提供友好的错误消息。
//!
//! 错误分为三类：
//! - 初始化 / 恢复阶段的致命错误（配置、资源加载、资源创建），直接向上传播
//! - 设备丢失不是错误，而是由后端返回的生命周期状态（见 `gfx::PresentStatus`）
//! - 尺寸未变化的窗口通知直接忽略，不产生错误

use std::path::PathBuf;

use thiserror::Error;

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, DistSpriteError>;

/// DistSprite 的错误类型
#[derive(Debug, Error)]
pub enum DistSpriteError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 图形 API 错误
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// 资源文件加载错误
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 初始化错误
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// 设备创建失败
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// 交换链错误
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// 资源创建失败
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// 渲染命令记录或执行失败
    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    /// 在资源集不存在时访问设备相关资源
    #[error("Device dependent resources are not available")]
    ResourcesUnavailable,
}

/// 纹理文件加载错误
#[derive(Debug, Error)]
pub enum AssetError {
    /// 文件不存在
    #[error("Asset file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// 图像解码失败
    #[error("Failed to decode '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}

impl AssetError {
    /// 将 `image` 库的错误映射为资源错误
    pub fn from_image(path: impl Into<PathBuf>, err: image::ImageError) -> Self {
        let path = path.into();
        match err {
            image::ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                AssetError::FileNotFound(path)
            }
            other => AssetError::Decode {
                path,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_chain() {
        let err: DistSpriteError = GraphicsError::ResourceCreation("sprite pipeline".into()).into();
        assert_eq!(
            err.to_string(),
            "Graphics error: Resource creation failed: sprite pipeline"
        );

        let err: DistSpriteError = ConfigError::InvalidValue {
            field: "window.width".into(),
            reason: "must be greater than 0".into(),
        }
        .into();
        assert!(err.to_string().contains("window.width"));
    }

    #[test]
    fn test_missing_image_maps_to_file_not_found() {
        let path = std::env::temp_dir().join("dist_sprite_missing_asset_for_error_test.png");
        let err = image::open(&path).unwrap_err();
        match AssetError::from_image(&path, err) {
            AssetError::FileNotFound(p) => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
