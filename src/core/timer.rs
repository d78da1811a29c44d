//! 帧计时器模块
//!
//! `StepTimer` 负责驱动更新节奏：记录两帧间隔、累计时间与帧数，
//! 支持可变步长和固定步长两种模式。
//!
//! # 时间单位
//!
//! 内部使用整数 tick（每秒 10,000,000 tick）累计，避免浮点误差随运行时间增长。
//!
//! # 使用示例
//!
//! ```
//! use std::time::Duration;
//! use dist_sprite::core::timer::StepTimer;
//!
//! let mut timer = StepTimer::new();
//! timer.set_fixed_time_step(true);
//! timer.set_target_elapsed_seconds(1.0 / 60.0);
//!
//! let mut updates = 0;
//! timer.advance(Duration::from_millis(50), |_| updates += 1);
//! assert_eq!(updates, 3);
//! ```

use std::time::{Duration, Instant};

/// 每秒的 tick 数
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// 单帧允许的最大间隔，调试器暂停之后不会一次性补算大量时间
const MAX_DELTA: Duration = Duration::from_millis(100);

/// 帧计时器
#[derive(Debug, Clone)]
pub struct StepTimer {
    last_time: Instant,
    max_delta: Duration,

    // 派生的计时数据，单位为 tick
    elapsed_ticks: u64,
    total_ticks: u64,
    left_over_ticks: u64,

    // 帧率统计
    frame_count: u64,
    frames_per_second: u32,
    frames_this_second: u32,
    second_counter: Duration,

    // 固定步长配置
    is_fixed_time_step: bool,
    target_elapsed_ticks: u64,
}

impl StepTimer {
    /// 创建新的计时器（可变步长，目标 60 FPS）
    pub fn new() -> Self {
        Self {
            last_time: Instant::now(),
            max_delta: MAX_DELTA,
            elapsed_ticks: 0,
            total_ticks: 0,
            left_over_ticks: 0,
            frame_count: 0,
            frames_per_second: 0,
            frames_this_second: 0,
            second_counter: Duration::ZERO,
            is_fixed_time_step: false,
            target_elapsed_ticks: TICKS_PER_SECOND / 60,
        }
    }

    /// 上一次更新的间隔（tick）
    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    /// 上一次更新的间隔（秒）
    pub fn elapsed_seconds(&self) -> f64 {
        ticks_to_seconds(self.elapsed_ticks)
    }

    /// 程序启动以来的累计时间（tick）
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// 程序启动以来的累计时间（秒）
    pub fn total_seconds(&self) -> f64 {
        ticks_to_seconds(self.total_ticks)
    }

    /// 程序启动以来的更新次数
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// 当前帧率
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// 是否使用固定步长
    pub fn is_fixed_time_step(&self) -> bool {
        self.is_fixed_time_step
    }

    /// 设置固定步长或可变步长模式
    pub fn set_fixed_time_step(&mut self, is_fixed_time_step: bool) {
        self.is_fixed_time_step = is_fixed_time_step;
    }

    /// 设置固定步长模式下的更新间隔（tick）
    pub fn set_target_elapsed_ticks(&mut self, target: u64) {
        self.target_elapsed_ticks = target.max(1);
    }

    /// 设置固定步长模式下的更新间隔（秒）
    pub fn set_target_elapsed_seconds(&mut self, target: f64) {
        self.set_target_elapsed_ticks(seconds_to_ticks(target));
    }

    /// 丢弃已经流逝的时间
    ///
    /// 在长时间阻塞（例如窗口最小化、从挂起恢复）之后调用，
    /// 避免固定步长逻辑一次性补算大量更新。帧数和累计时间保持不变。
    pub fn reset_elapsed_time(&mut self) {
        self.last_time = Instant::now();
        self.left_over_ticks = 0;
        self.frames_per_second = 0;
        self.frames_this_second = 0;
        self.second_counter = Duration::ZERO;
    }

    /// 根据真实时间推进计时器，并按需调用更新回调
    pub fn tick<F>(&mut self, update: F)
    where
        F: FnMut(&StepTimer),
    {
        let now = Instant::now();
        let delta = now.duration_since(self.last_time);
        self.last_time = now;
        self.advance(delta, update);
    }

    /// 以给定的时间间隔推进计时器
    ///
    /// 可变步长模式下每次调用恰好更新一次；
    /// 固定步长模式下更新次数由累计时间决定，可能为零次或多次。
    pub fn advance<F>(&mut self, delta: Duration, mut update: F)
    where
        F: FnMut(&StepTimer),
    {
        self.second_counter += delta;

        let delta = delta.min(self.max_delta);
        let mut delta_ticks = duration_to_ticks(delta);

        let last_frame_count = self.frame_count;

        if self.is_fixed_time_step {
            // 与目标间隔相差极小时直接对齐目标间隔，避免时钟抖动累积出多余的一帧
            if delta_ticks.abs_diff(self.target_elapsed_ticks) < TICKS_PER_SECOND / 4000 {
                delta_ticks = self.target_elapsed_ticks;
            }

            self.left_over_ticks += delta_ticks;

            while self.left_over_ticks >= self.target_elapsed_ticks {
                self.elapsed_ticks = self.target_elapsed_ticks;
                self.total_ticks += self.target_elapsed_ticks;
                self.left_over_ticks -= self.target_elapsed_ticks;
                self.frame_count += 1;

                update(self);
            }
        } else {
            self.elapsed_ticks = delta_ticks;
            self.total_ticks += delta_ticks;
            self.left_over_ticks = 0;
            self.frame_count += 1;

            update(self);
        }

        if self.frame_count != last_frame_count {
            self.frames_this_second += 1;
        }

        if self.second_counter >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.second_counter = Duration::from_nanos(
                (self.second_counter.as_nanos() % 1_000_000_000) as u64,
            );
        }
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// tick 转秒
pub fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// 秒转 tick
pub fn seconds_to_ticks(seconds: f64) -> u64 {
    (seconds * TICKS_PER_SECOND as f64) as u64
}

fn duration_to_ticks(duration: Duration) -> u64 {
    (duration.as_nanos() / 100) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_step_updates_once_per_tick() {
        let mut timer = StepTimer::new();
        let mut updates = 0;

        timer.advance(Duration::from_millis(16), |t| {
            updates += 1;
            assert!((t.elapsed_seconds() - 0.016).abs() < 1e-9);
        });

        assert_eq!(updates, 1);
        assert_eq!(timer.frame_count(), 1);
        assert_eq!(timer.total_ticks(), 160_000);
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let mut timer = StepTimer::new();
        timer.advance(Duration::from_secs(5), |_| {});
        assert!((timer.elapsed_seconds() - 0.1).abs() < 1e-9);
        assert!((timer.total_seconds() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_step_carries_remainder() {
        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(true);
        timer.set_target_elapsed_ticks(100_000); // 10ms

        let mut updates = 0;
        timer.advance(Duration::from_millis(25), |t| {
            updates += 1;
            assert_eq!(t.elapsed_ticks(), 100_000);
        });
        assert_eq!(updates, 2);

        // 剩余 5ms + 本次 5ms 正好凑成一帧
        timer.advance(Duration::from_millis(5), |_| updates += 1);
        assert_eq!(updates, 3);
        assert_eq!(timer.frame_count(), 3);
    }

    #[test]
    fn test_fixed_step_may_skip_update() {
        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(true);
        timer.set_target_elapsed_seconds(1.0 / 30.0);

        let mut updates = 0;
        timer.advance(Duration::from_millis(10), |_| updates += 1);
        assert_eq!(updates, 0);
        assert_eq!(timer.frame_count(), 0);
    }

    #[test]
    fn test_fixed_step_snaps_jitter_to_target() {
        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(true);
        timer.set_target_elapsed_ticks(166_666);

        let mut updates = 0;
        // 比目标间隔少 0.1ms，仍然算作一帧
        timer.advance(Duration::from_nanos(16_566_600), |_| updates += 1);
        assert_eq!(updates, 1);
    }

    #[test]
    fn test_reset_elapsed_time_keeps_frame_count() {
        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(true);
        timer.set_target_elapsed_ticks(100_000);
        timer.advance(Duration::from_millis(15), |_| {});
        assert_eq!(timer.frame_count(), 1);

        timer.reset_elapsed_time();

        let mut updates = 0;
        timer.advance(Duration::from_millis(5), |_| updates += 1);
        // 重置前的 5ms 余量已被丢弃
        assert_eq!(updates, 0);
        assert_eq!(timer.frame_count(), 1);
    }

    #[test]
    fn test_frames_per_second() {
        let mut timer = StepTimer::new();
        for _ in 0..10 {
            timer.advance(Duration::from_millis(100), |_| {});
        }
        assert_eq!(timer.frames_per_second(), 10);
    }
}
