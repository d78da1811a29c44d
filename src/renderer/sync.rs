//! CPU 与 GPU 的进度同步
//!
//! 每次提交都领取一个递增的 fence 值，GPU 完成后回报该值。
//! 示例里只有三处用到：
//! 1. 启动 / 设备恢复时等待纹理上传批次
//! 2. 每帧提交后按已完成的值回收临时显存（见 `GraphicsMemory`）
//! 3. 销毁前等待全部已提交的工作

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 一次提交的序号，单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FenceValue(u64);

impl FenceValue {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Default)]
struct FenceCounters {
    issued: AtomicU64,
    completed: AtomicU64,
}

/// 提交进度
///
/// 克隆后共享同一组计数，完成回调可以在任意线程上更新
/// （例如 wgpu 的 `on_submitted_work_done`）。
///
/// # 示例
///
/// ```
/// use dist_sprite::renderer::sync::FenceManager;
///
/// let fences = FenceManager::new();
/// let value = fences.next_value();
///
/// let signal = fences.clone();
/// fences.wait_for_value(value, || signal.update_completed_value(value));
/// assert!(fences.is_completed(value));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FenceManager {
    counters: Arc<FenceCounters>,
}

impl FenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近一次领取的值
    pub fn current_value(&self) -> FenceValue {
        FenceValue(self.counters.issued.load(Ordering::Acquire))
    }

    /// GPU 已回报的最大值
    pub fn completed_value(&self) -> FenceValue {
        FenceValue(self.counters.completed.load(Ordering::Acquire))
    }

    /// 为下一次提交领取一个新值
    pub fn next_value(&self) -> FenceValue {
        FenceValue(self.counters.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// 回报完成，乱序到达的旧值被忽略
    pub fn update_completed_value(&self, value: FenceValue) {
        self.counters.completed.fetch_max(value.0, Ordering::AcqRel);
    }

    pub fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// 反复调用 `poll` 直到 `value` 完成
    pub fn wait_for_value<F>(&self, value: FenceValue, mut poll: F)
    where
        F: FnMut(),
    {
        while !self.is_completed(value) {
            poll();
        }
    }

    /// 与 `wait_for_value` 相同，但 `poll` 报告队列已空时不再继续等待
    ///
    /// 队列排空而 `value` 仍未完成时把它记为完成并返回 `false`。
    pub fn wait_until_drained<F>(&self, value: FenceValue, mut poll: F) -> bool
    where
        F: FnMut() -> bool,
    {
        while !self.is_completed(value) {
            if poll() && !self.is_completed(value) {
                self.update_completed_value(value);
                return false;
            }
        }
        true
    }

    /// 等待目前领取过的所有值
    pub fn flush<F>(&self, poll: F)
    where
        F: FnMut(),
    {
        self.wait_for_value(self.current_value(), poll)
    }

    /// 新设备从零开始计数
    pub fn reset(&self) {
        self.counters.issued.store(0, Ordering::Release);
        self.counters.completed.store(0, Ordering::Release);
    }
}
