//! 后处理效果
//!
//! 全屏颜色变换：把中间渲染目标的颜色乘以一个 3x3 矩阵后写入后缓冲。
//! 矩阵以三行 `vec4` 的形式上传到 uniform 缓冲（第四分量为填充）。

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 灰度权重（Rec. 709 亮度）
const LUMINANCE: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// 后处理效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostEffect {
    /// 原样拷贝
    Copy,
    /// 灰度
    Monochrome,
    /// 怀旧棕褐色
    #[default]
    Sepia,
}

impl PostEffect {
    /// 按名称解析（大小写不敏感）
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "copy" => Some(PostEffect::Copy),
            "monochrome" => Some(PostEffect::Monochrome),
            "sepia" => Some(PostEffect::Sepia),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PostEffect::Copy => "copy",
            PostEffect::Monochrome => "monochrome",
            PostEffect::Sepia => "sepia",
        }
    }

    /// 颜色矩阵，每行对应一个输出通道
    pub fn color_matrix(&self) -> [[f32; 3]; 3] {
        match self {
            PostEffect::Copy => [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            PostEffect::Monochrome => [LUMINANCE, LUMINANCE, LUMINANCE],
            PostEffect::Sepia => [
                [0.393, 0.769, 0.189],
                [0.349, 0.686, 0.168],
                [0.272, 0.534, 0.131],
            ],
        }
    }

    /// 上传到着色器的参数
    pub fn uniforms(&self) -> PostProcessUniforms {
        let m = self.color_matrix();
        PostProcessUniforms {
            rows: [
                [m[0][0], m[0][1], m[0][2], 0.0],
                [m[1][0], m[1][1], m[1][2], 0.0],
                [m[2][0], m[2][1], m[2][2], 0.0],
            ],
        }
    }
}

/// 后处理着色器的 uniform 布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PostProcessUniforms {
    pub rows: [[f32; 4]; 3],
}
