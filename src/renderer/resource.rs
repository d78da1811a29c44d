//! 资源管理模块
//!
//! 与图形 API 无关的资源描述：尺寸、矩形、纹理格式，
//! 以及按帧回收的临时显存分配 `GraphicsMemory`。

use super::sync::FenceValue;
use crate::core::math::Vector2;

/// 二维尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 任一维度为 0（例如窗口最小化）
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 中心点（浮点除法，不取整）
    pub fn center(&self) -> Vector2 {
        Vector2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// 一半尺寸，整数除法向下取整
    pub fn half_floor(&self) -> Vector2 {
        Vector2::new((self.width / 2) as f32, (self.height / 2) as f32)
    }
}

/// 像素矩形，right / bottom 为开区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// 覆盖整个输出的矩形
    pub fn from_extent(extent: Extent2d) -> Self {
        Self::new(0, 0, extent.width as i32, extent.height as i32)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// 纹理格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// BGRA 8位sRGB（交换链和中间渲染目标）
    Bgra8UnormSrgb,
    /// RGBA 8位sRGB（加载的图片）
    Rgba8UnormSrgb,
}

impl TextureFormat {
    /// 每个像素的字节数
    pub fn bytes_per_pixel(&self) -> u32 {
        4
    }
}

/// 按帧回收的临时显存
///
/// 每帧的临时分配（例如精灵顶点缓冲）先放进当前帧列表，
/// `commit` 时用本帧提交的 fence 值封存，GPU 完成该 fence 后由 `retire` 释放。
/// 释放即 drop，具体 API 的资源句柄通过 RAII 归还。
#[derive(Debug)]
pub struct GraphicsMemory<T> {
    current: Vec<T>,
    pending: Vec<(FenceValue, Vec<T>)>,
    total_allocations: u64,
}

impl<T> GraphicsMemory<T> {
    pub fn new() -> Self {
        Self {
            current: Vec::new(),
            pending: Vec::new(),
            total_allocations: 0,
        }
    }

    /// 登记一个当前帧的临时分配，返回其引用
    pub fn allocate(&mut self, page: T) -> &T {
        self.total_allocations += 1;
        self.current.push(page);
        &self.current[self.current.len() - 1]
    }

    /// 封存当前帧的全部分配
    pub fn commit(&mut self, fence: FenceValue) {
        if self.current.is_empty() {
            return;
        }
        let pages = std::mem::take(&mut self.current);
        self.pending.push((fence, pages));
    }

    /// 释放 GPU 已经完成的分配，返回释放的数量
    pub fn retire(&mut self, completed: FenceValue) -> usize {
        let mut released = 0;
        self.pending.retain(|(fence, pages)| {
            if *fence <= completed {
                released += pages.len();
                false
            } else {
                true
            }
        });
        released
    }

    /// 当前帧尚未提交的分配数
    pub fn current_count(&self) -> usize {
        self.current.len()
    }

    /// 已提交、等待 GPU 完成的分配数
    pub fn pending_count(&self) -> usize {
        self.pending.iter().map(|(_, pages)| pages.len()).sum()
    }

    /// 累计分配次数
    pub fn total_allocations(&self) -> u64 {
        self.total_allocations
    }
}

impl<T> Default for GraphicsMemory<T> {
    fn default() -> Self {
        Self::new()
    }
}
