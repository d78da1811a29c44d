//! 描述符管理模块
//!
//! 描述符堆是图形 API 在绘制时索引的一张“资源视图表”。
//! 本示例的表都是定长的：槽位在编译期由枚举给出，
//! 创建设备相关资源时一次性填好，设备丢失时整张表随资源集一起释放。
//!
//! # 本示例用到的两张表
//!
//! - 着色资源表（SRV）：`Cat`、`Background`、`SceneTex`
//! - 渲染目标表（RTV）：`IntermediateRT`

use std::fmt;
use std::marker::PhantomData;

use crate::core::error::{DistSpriteError, GraphicsError, Result};

/// 描述符类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// 渲染目标视图 (RTV)
    RenderTargetView,
    /// 着色资源视图 (SRV)
    ShaderResourceView,
}

impl DescriptorType {
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorType::RenderTargetView => "RTV",
            DescriptorType::ShaderResourceView => "SRV",
        }
    }
}

/// 定长描述符表的槽位
pub trait DescriptorSlot: Copy + fmt::Debug {
    /// 槽位总数
    const COUNT: u32;
    /// 表的类型
    const TYPE: DescriptorType;

    fn index(self) -> u32;
    fn name(self) -> &'static str;
}

/// 着色资源表的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSlot {
    /// 精灵纹理
    Cat,
    /// 背景纹理
    Background,
    /// 中间渲染目标作为后处理输入
    SceneTex,
}

impl DescriptorSlot for ResourceSlot {
    const COUNT: u32 = 3;
    const TYPE: DescriptorType = DescriptorType::ShaderResourceView;

    fn index(self) -> u32 {
        self as u32
    }

    fn name(self) -> &'static str {
        match self {
            ResourceSlot::Cat => "Cat",
            ResourceSlot::Background => "Background",
            ResourceSlot::SceneTex => "SceneTex",
        }
    }
}

/// 渲染目标表的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetSlot {
    IntermediateRT,
}

impl DescriptorSlot for RenderTargetSlot {
    const COUNT: u32 = 1;
    const TYPE: DescriptorType = DescriptorType::RenderTargetView;

    fn index(self) -> u32 {
        self as u32
    }

    fn name(self) -> &'static str {
        match self {
            RenderTargetSlot::IntermediateRT => "IntermediateRT",
        }
    }
}

/// 定长描述符堆
///
/// `V` 是具体图形 API 的视图对象（例如 `wgpu::TextureView`），
/// 无 GPU 的后端可以用任意占位类型。
pub struct DescriptorHeap<S: DescriptorSlot, V> {
    views: Vec<Option<V>>,
    _slot: PhantomData<S>,
}

impl<S: DescriptorSlot, V> DescriptorHeap<S, V> {
    /// 按槽位枚举创建一张空表
    pub fn new() -> Self {
        let mut views = Vec::with_capacity(S::COUNT as usize);
        views.resize_with(S::COUNT as usize, || None);
        Self {
            views,
            _slot: PhantomData,
        }
    }

    /// 在槽位上创建视图，已有的视图被替换
    pub fn create_view(&mut self, slot: S, view: V) {
        let index = slot.index() as usize;
        self.views[index] = Some(view);
    }

    /// 获取槽位上的视图
    pub fn get(&self, slot: S) -> Option<&V> {
        self.views.get(slot.index() as usize).and_then(Option::as_ref)
    }

    /// 获取绘制时要用的视图，空槽位是错误
    pub fn gpu_handle(&self, slot: S) -> Result<&V> {
        self.get(slot).ok_or_else(|| {
            DistSpriteError::Graphics(GraphicsError::ResourceCreation(format!(
                "{} descriptor '{}' has not been created",
                S::TYPE.name(),
                slot.name()
            )))
        })
    }

    /// 已填充的槽位数
    pub fn len(&self) -> usize {
        self.views.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 表容量
    pub fn capacity(&self) -> u32 {
        self.views.len() as u32
    }
}

impl<S: DescriptorSlot, V> Default for DescriptorHeap<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DescriptorSlot, V> fmt::Debug for DescriptorHeap<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorHeap")
            .field("type", &S::TYPE.name())
            .field("filled", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_tables_have_types() {
        assert_eq!(ResourceSlot::TYPE, DescriptorType::ShaderResourceView);
        assert_eq!(RenderTargetSlot::TYPE.name(), "RTV");
        assert_eq!(RenderTargetSlot::COUNT, 1);
    }

    #[test]
    fn test_slots_are_dense() {
        assert_eq!(ResourceSlot::Cat.index(), 0);
        assert_eq!(ResourceSlot::Background.index(), 1);
        assert_eq!(ResourceSlot::SceneTex.index(), 2);
        assert_eq!(RenderTargetSlot::IntermediateRT.index(), 0);
    }

    #[test]
    fn test_heap_create_and_lookup() {
        let mut heap: DescriptorHeap<ResourceSlot, &str> = DescriptorHeap::new();
        assert_eq!(heap.capacity(), 3);
        assert!(heap.is_empty());

        heap.create_view(ResourceSlot::Cat, "cat-view");
        heap.create_view(ResourceSlot::Background, "sunset-view");
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.get(ResourceSlot::Cat), Some(&"cat-view"));

        // 重新创建替换旧视图
        heap.create_view(ResourceSlot::Cat, "cat-view-2");
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.gpu_handle(ResourceSlot::Cat).unwrap(), &"cat-view-2");
    }

    #[test]
    fn test_missing_view_is_error() {
        let heap: DescriptorHeap<ResourceSlot, u32> = DescriptorHeap::new();
        let err = heap.gpu_handle(ResourceSlot::SceneTex).unwrap_err();
        assert!(err.to_string().contains("SceneTex"));
    }
}
