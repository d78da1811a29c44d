//! 数学类型模块
//!
//! 基于 `nalgebra` 提供精灵示例需要的向量类型，以及带颜色空间转换的 `Color`。

pub use nalgebra::{Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 从整数值创建颜色（0-255）
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// 转换为数组，用于顶点数据和 uniform
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// 转换为 Vector3（忽略 alpha）
    pub fn to_vec3(&self) -> Vector3 {
        Vector3::new(self.r, self.g, self.b)
    }

    /// sRGB 编码的颜色转换为线性空间，alpha 保持不变
    ///
    /// 渲染目标是 sRGB 格式时，清屏颜色需要先转换到线性空间。
    pub fn srgb_to_linear(&self) -> Self {
        let linear = color_space::srgb_to_linear(self.to_vec3());
        Self::new(linear.x, linear.y, linear.z, self.a)
    }

    // 预定义颜色
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    /// CornflowerBlue (100, 149, 237)
    pub const CORNFLOWER_BLUE: Color = Color::rgb(0.392_156_87, 0.584_313_75, 0.929_411_77);
}

/// 颜色空间转换
pub mod color_space {
    use super::*;

    /// Linear 转 sRGB
    pub fn linear_to_srgb(color: Vector3) -> Vector3 {
        let linear_to_srgb_component = |c: f32| -> f32 {
            if c <= 0.0031308 {
                c * 12.92
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            }
        };

        color.map(linear_to_srgb_component)
    }

    /// sRGB 转 Linear
    pub fn srgb_to_linear(color: Vector3) -> Vector3 {
        let srgb_to_linear_component = |c: f32| -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };

        color.map(srgb_to_linear_component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_creation() {
        let color = Color::rgb(1.0, 0.5, 0.0);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.a, 1.0);
        assert_eq!(Color::from_rgba_u8(255, 0, 0, 255), Color::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_srgb_round_trip_keeps_alpha() {
        let linear = Color::CORNFLOWER_BLUE.srgb_to_linear();
        assert!(linear.r < Color::CORNFLOWER_BLUE.r);
        assert!(linear.b < Color::CORNFLOWER_BLUE.b);
        assert_eq!(linear.a, 1.0);

        let back = color_space::linear_to_srgb(linear.to_vec3());
        assert!((back.x - Color::CORNFLOWER_BLUE.r).abs() < 1e-4);
        assert!((back.z - Color::CORNFLOWER_BLUE.b).abs() < 1e-4);
    }
}
