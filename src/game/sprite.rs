//! 精灵状态
//!
//! 整个示例唯一的“游戏逻辑”：一个沿水平方向移动、越过右边缘后回到 0 的精灵。

use crate::core::math::Vector2;
use crate::renderer::resource::Extent2d;

/// 每次更新的水平位移（像素）
pub const SPRITE_STEP: f32 = 5.0;

/// 移动精灵的位置与旋转中心
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteState {
    /// 屏幕位置（像素）
    pub screen_pos: Vector2,
    /// 旋转中心，纹理尺寸的一半
    pub origin: Vector2,
}

impl SpriteState {
    /// 精灵放在输出中心，旋转中心为纹理尺寸的一半（向下取整）
    pub fn centered(output: Extent2d, texture: Extent2d) -> Self {
        Self {
            screen_pos: output.center(),
            origin: texture.half_floor(),
        }
    }

    /// 推进一步
    ///
    /// 先判断是否严格越过右边缘再累加，所以精灵可能在边缘外停留一帧。
    /// 等于宽度时不回绕。
    pub fn update(&mut self, _elapsed_seconds: f32, viewport_width: f32) {
        if self.screen_pos.x > viewport_width {
            self.screen_pos.x = 0.0;
        }
        self.screen_pos.x += SPRITE_STEP;
    }
}

impl Default for SpriteState {
    fn default() -> Self {
        Self {
            screen_pos: Vector2::zeros(),
            origin: Vector2::zeros(),
        }
    }
}
