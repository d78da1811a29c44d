//! 窗口消息模块
//!
//! 将宿主窗口系统（winit）的通知翻译为示例程序关心的生命周期消息：
//! 尺寸改变、移动、激活、失活、挂起与恢复。
//!
//! # 使用示例
//!
//! ```
//! use dist_sprite::core::event::{EventType, WindowMessage};
//!
//! let message = WindowMessage::SizeChanged { width: 1920, height: 1080 };
//! assert_eq!(message.event_type(), EventType::WindowResize);
//! assert_eq!(message.detail(), "WindowResize: 1920x1080");
//! ```

use winit::event::{Event as WinitEvent, WindowEvent};

use super::error::Result;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// 窗口客户区尺寸改变
    WindowResize,
    /// 窗口被移动
    WindowMoved,
    /// 窗口成为前台窗口
    Activated,
    /// 窗口进入后台
    Deactivated,
    /// 程序被挂起（或最小化、被完全遮挡）
    Suspending,
    /// 程序从挂起中恢复
    Resuming,
}

impl EventType {
    /// 获取消息类型的名称
    pub fn name(&self) -> &'static str {
        match self {
            EventType::WindowResize => "WindowResize",
            EventType::WindowMoved => "WindowMoved",
            EventType::Activated => "Activated",
            EventType::Deactivated => "Deactivated",
            EventType::Suspending => "Suspending",
            EventType::Resuming => "Resuming",
        }
    }
}

/// 生命周期消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMessage {
    SizeChanged { width: u32, height: u32 },
    Moved,
    Activated,
    Deactivated,
    Suspending,
    Resuming,
}

impl WindowMessage {
    /// 获取消息类型
    pub fn event_type(&self) -> EventType {
        match self {
            WindowMessage::SizeChanged { .. } => EventType::WindowResize,
            WindowMessage::Moved => EventType::WindowMoved,
            WindowMessage::Activated => EventType::Activated,
            WindowMessage::Deactivated => EventType::Deactivated,
            WindowMessage::Suspending => EventType::Suspending,
            WindowMessage::Resuming => EventType::Resuming,
        }
    }

    /// 用于日志的描述
    pub fn detail(&self) -> String {
        match self {
            WindowMessage::SizeChanged { width, height } => {
                format!("WindowResize: {}x{}", width, height)
            }
            other => other.event_type().name().to_string(),
        }
    }

    /// 从 winit 的窗口事件翻译
    ///
    /// 不属于生命周期的事件（输入、重绘、关闭等）返回 `None`。
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::Resized(size) => Some(WindowMessage::SizeChanged {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::Moved(_) => Some(WindowMessage::Moved),
            WindowEvent::Focused(true) => Some(WindowMessage::Activated),
            WindowEvent::Focused(false) => Some(WindowMessage::Deactivated),
            WindowEvent::Occluded(true) => Some(WindowMessage::Suspending),
            WindowEvent::Occluded(false) => Some(WindowMessage::Resuming),
            _ => None,
        }
    }

    /// 从 winit 的应用级事件翻译（挂起 / 恢复）
    pub fn from_event<T>(event: &WinitEvent<T>) -> Option<Self> {
        match event {
            WinitEvent::WindowEvent { event, .. } => Self::from_window_event(event),
            WinitEvent::Suspended => Some(WindowMessage::Suspending),
            WinitEvent::Resumed => Some(WindowMessage::Resuming),
            _ => None,
        }
    }
}

/// 生命周期消息处理器
///
/// 由游戏循环实现，消息处理失败（例如尺寸改变后重建资源失败）向上传播。
pub trait EventHandler {
    fn handle_message(&mut self, message: WindowMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::{PhysicalPosition, PhysicalSize};

    #[test]
    fn test_event_types() {
        assert_eq!(WindowMessage::Moved.event_type(), EventType::WindowMoved);
        assert_eq!(EventType::Suspending.name(), "Suspending");
        assert_eq!(WindowMessage::Resuming.detail(), "Resuming");
    }

    #[test]
    fn test_translate_window_events() {
        let resized = WindowEvent::Resized(PhysicalSize::new(800, 600));
        assert_eq!(
            WindowMessage::from_window_event(&resized),
            Some(WindowMessage::SizeChanged { width: 800, height: 600 })
        );

        let moved = WindowEvent::Moved(PhysicalPosition::new(10, 20));
        assert_eq!(WindowMessage::from_window_event(&moved), Some(WindowMessage::Moved));

        assert_eq!(
            WindowMessage::from_window_event(&WindowEvent::Focused(false)),
            Some(WindowMessage::Deactivated)
        );
        assert_eq!(WindowMessage::from_window_event(&WindowEvent::CloseRequested), None);
    }

    #[test]
    fn test_translate_application_events() {
        assert_eq!(
            WindowMessage::from_event::<()>(&WinitEvent::Suspended),
            Some(WindowMessage::Suspending)
        );
        assert_eq!(
            WindowMessage::from_event::<()>(&WinitEvent::Resumed),
            Some(WindowMessage::Resuming)
        );
        assert_eq!(WindowMessage::from_event::<()>(&WinitEvent::AboutToWait), None);
    }
}
