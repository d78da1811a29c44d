//! 精灵绘制
//!
//! 一次精灵绘制描述为 `SpriteDraw`：纹理、目标位置（拉伸到矩形，或放在某点）、
//! 旋转中心、颜色和旋转角。`SpriteGeometry` 把一批绘制展开为裁剪空间的
//! 三角形顶点，并按纹理切分为连续的绘制区间，提交顺序保持不变。

use bytemuck::{Pod, Zeroable};

use super::descriptor::ResourceSlot;
use super::resource::{Extent2d, Rect};
use crate::core::math::{Color, Vector2};

/// 精灵的目标位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpriteDestination {
    /// 拉伸到像素矩形
    Stretched(Rect),
    /// 原尺寸放在某点，旋转中心对齐该点
    Position(Vector2),
}

/// 一次精灵绘制
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub texture: ResourceSlot,
    pub texture_size: Extent2d,
    pub destination: SpriteDestination,
    /// 旋转中心，纹理像素坐标
    pub origin: Vector2,
    pub tint: Color,
    /// 弧度
    pub rotation: f32,
}

impl SpriteDraw {
    /// 拉伸到整个矩形
    pub fn stretched(texture: ResourceSlot, texture_size: Extent2d, rect: Rect) -> Self {
        Self {
            texture,
            texture_size,
            destination: SpriteDestination::Stretched(rect),
            origin: Vector2::zeros(),
            tint: Color::WHITE,
            rotation: 0.0,
        }
    }

    /// 原尺寸放在某点
    pub fn at(texture: ResourceSlot, texture_size: Extent2d, position: Vector2) -> Self {
        Self {
            texture,
            texture_size,
            destination: SpriteDestination::Position(position),
            origin: Vector2::zeros(),
            tint: Color::WHITE,
            rotation: 0.0,
        }
    }

    pub fn with_origin(mut self, origin: Vector2) -> Self {
        self.origin = origin;
        self
    }

    /// 四个角的像素坐标：左上、右上、左下、右下
    pub fn corners(&self) -> [Vector2; 4] {
        let tex_w = self.texture_size.width.max(1) as f32;
        let tex_h = self.texture_size.height.max(1) as f32;

        let (anchor, size) = match self.destination {
            SpriteDestination::Stretched(rect) => (
                Vector2::new(rect.left as f32, rect.top as f32),
                Vector2::new(rect.width() as f32, rect.height() as f32),
            ),
            SpriteDestination::Position(position) => (position, Vector2::new(tex_w, tex_h)),
        };

        // 旋转中心按目标尺寸缩放
        let pivot = Vector2::new(self.origin.x * size.x / tex_w, self.origin.y * size.y / tex_h);
        let (sin, cos) = self.rotation.sin_cos();

        let corner = |u: f32, v: f32| {
            let local = Vector2::new(u * size.x, v * size.y) - pivot;
            anchor + Vector2::new(local.x * cos - local.y * sin, local.x * sin + local.y * cos)
        };

        [corner(0.0, 0.0), corner(1.0, 0.0), corner(0.0, 1.0), corner(1.0, 1.0)]
    }
}

/// 精灵顶点
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    /// 裁剪空间坐标
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
}

/// 每个精灵的顶点数（两个三角形，不使用索引）
pub const VERTICES_PER_SPRITE: u32 = 6;

/// 同一纹理的连续顶点区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteBatchRange {
    pub texture: ResourceSlot,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

/// 一批精灵展开后的几何数据
#[derive(Debug, Clone, Default)]
pub struct SpriteGeometry {
    pub vertices: Vec<SpriteVertex>,
    pub ranges: Vec<SpriteBatchRange>,
}

impl SpriteGeometry {
    /// 按提交顺序展开
    pub fn build(draws: &[SpriteDraw], viewport: Extent2d) -> Self {
        let mut geometry = SpriteGeometry {
            vertices: Vec::with_capacity(draws.len() * VERTICES_PER_SPRITE as usize),
            ranges: Vec::new(),
        };

        for draw in draws {
            let [tl, tr, bl, br] = draw.corners();
            let color = draw.tint.to_array();
            let vertex = |p: Vector2, uv: [f32; 2]| SpriteVertex {
                position: to_clip_space(p, viewport),
                tex_coord: uv,
                color,
            };

            let first_vertex = geometry.vertices.len() as u32;
            geometry.vertices.extend_from_slice(&[
                vertex(tl, [0.0, 0.0]),
                vertex(tr, [1.0, 0.0]),
                vertex(bl, [0.0, 1.0]),
                vertex(bl, [0.0, 1.0]),
                vertex(tr, [1.0, 0.0]),
                vertex(br, [1.0, 1.0]),
            ]);

            match geometry.ranges.last_mut() {
                Some(range) if range.texture == draw.texture => {
                    range.vertex_count += VERTICES_PER_SPRITE;
                }
                _ => geometry.ranges.push(SpriteBatchRange {
                    texture: draw.texture,
                    first_vertex,
                    vertex_count: VERTICES_PER_SPRITE,
                }),
            }
        }

        geometry
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// 像素坐标转裁剪空间（y 轴向上）
pub fn to_clip_space(point: Vector2, viewport: Extent2d) -> [f32; 2] {
    let width = viewport.width.max(1) as f32;
    let height = viewport.height.max(1) as f32;
    [point.x * 2.0 / width - 1.0, 1.0 - point.y * 2.0 / height]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vector2, b: Vector2) -> bool {
        (a - b).norm() < 1e-4
    }

    #[test]
    fn test_stretched_covers_rect() {
        let draw = SpriteDraw::stretched(
            ResourceSlot::Background,
            Extent2d::new(512, 256),
            Rect::new(0, 0, 1280, 720),
        );
        let [tl, tr, bl, br] = draw.corners();
        assert!(approx(tl, Vector2::new(0.0, 0.0)));
        assert!(approx(tr, Vector2::new(1280.0, 0.0)));
        assert!(approx(bl, Vector2::new(0.0, 720.0)));
        assert!(approx(br, Vector2::new(1280.0, 720.0)));
    }

    #[test]
    fn test_positioned_sprite_is_centered_on_origin() {
        let draw = SpriteDraw::at(ResourceSlot::Cat, Extent2d::new(64, 32), Vector2::new(640.0, 360.0))
            .with_origin(Vector2::new(32.0, 16.0));
        let [tl, _, _, br] = draw.corners();
        assert!(approx(tl, Vector2::new(608.0, 344.0)));
        assert!(approx(br, Vector2::new(672.0, 376.0)));
    }

    #[test]
    fn test_rotation_around_origin() {
        let draw = SpriteDraw {
            rotation: std::f32::consts::FRAC_PI_2,
            ..SpriteDraw::at(ResourceSlot::Cat, Extent2d::new(2, 2), Vector2::new(10.0, 10.0))
                .with_origin(Vector2::new(1.0, 1.0))
        };
        let [tl, ..] = draw.corners();
        // (-1, -1) 旋转 90 度后为 (1, -1)
        assert!(approx(tl, Vector2::new(11.0, 9.0)));
    }

    #[test]
    fn test_clip_space() {
        let viewport = Extent2d::new(1280, 720);
        assert_eq!(to_clip_space(Vector2::new(0.0, 0.0), viewport), [-1.0, 1.0]);
        assert_eq!(to_clip_space(Vector2::new(1280.0, 720.0), viewport), [1.0, -1.0]);
        assert_eq!(to_clip_space(Vector2::new(640.0, 360.0), viewport), [0.0, 0.0]);
    }

    #[test]
    fn test_geometry_keeps_submission_order() {
        let viewport = Extent2d::new(100, 100);
        let background = SpriteDraw::stretched(ResourceSlot::Background, Extent2d::new(10, 10), Rect::new(0, 0, 100, 100));
        let cat = SpriteDraw::at(ResourceSlot::Cat, Extent2d::new(10, 10), Vector2::new(50.0, 50.0));

        let geometry = SpriteGeometry::build(&[background, cat, cat], viewport);
        assert_eq!(geometry.vertices.len(), 18);
        assert_eq!(
            geometry.ranges,
            vec![
                SpriteBatchRange { texture: ResourceSlot::Background, first_vertex: 0, vertex_count: 6 },
                SpriteBatchRange { texture: ResourceSlot::Cat, first_vertex: 6, vertex_count: 12 },
            ]
        );
        assert_eq!(geometry.vertices[0].position, [-1.0, 1.0]);
        assert_eq!(geometry.vertices[0].color, [1.0, 1.0, 1.0, 1.0]);
    }
}
