//! DistSprite - 精灵渲染示例
//!
//! 背景图拉伸铺满窗口，猫的精灵每帧右移 5 像素，越过右边缘后回到左侧。
//! 场景先画到离屏目标，再经过后处理写入后缓冲。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 强制使用 DirectX 12（经由 wgpu 的 DX12 后端）
//! cargo run -- --dx12
//!
//! # 无窗口运行 300 帧，使用单色效果
//! cargo run -- --headless --frames 300 --effect monochrome
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  应用程序入口，窗口消息泵
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │    Game     │  计时器、精灵状态、设备丢失状态机
//! └──────┬──────┘
//!        │ CommandList
//! ┌──────▼──────┐
//! │   Backend   │  统一的后端接口
//! └──────┬──────┘
//!        │
//!   ┌────┴─────┐
//!   │          │
//! ┌─▼──┐   ┌───▼────┐
//! │wgpu│   │Headless│  具体后端实现
//! └────┘   └────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dist_sprite::core::event::{EventHandler, WindowMessage};
use dist_sprite::core::{log, Config};
use dist_sprite::game::Game;
use dist_sprite::gfx::wgpu::WgpuBackend;
use dist_sprite::gfx::HeadlessBackend;
use dist_sprite::{app_error, app_info};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）
/// 2. 应用命令行参数覆盖
/// 3. 验证配置
/// 4. 初始化日志系统
/// 5. 按后端类型进入窗口消息循环或无窗口循环
///
/// # 命令行参数
///
/// - `--dx12` / `--wgpu` / `--headless`: 选择后端
/// - `--width <value>` / `--height <value>`: 窗口尺寸
/// - `--frames <value>`: 无窗口模式的帧数
/// - `--effect <copy|monochrome|sepia>`: 后处理效果
fn main() {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args());

    // 3. 验证配置
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // 4. 初始化日志系统
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    app_info!(version = env!("CARGO_PKG_VERSION"), "DistSprite starting");

    info!(
        backend = config.graphics.backend.name(),
        width = config.window.width,
        height = config.window.height,
        effect = config.graphics.post_effect.name(),
        "Graphics configuration"
    );

    // 5. 运行
    let result = if config.graphics.backend.is_headless() {
        run_headless(&config)
    } else {
        run_windowed(&config)
    };

    if let Err(e) = result {
        app_error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    app_info!("DistSprite exited");
}

/// 无窗口运行固定帧数，每帧按目标间隔推进
fn run_headless(config: &Config) -> anyhow::Result<()> {
    let backend =
        HeadlessBackend::new(config.window.width, config.window.height).with_call_log(false);
    let mut game = Game::new(backend, config);
    game.initialize().context("Failed to initialize game")?;

    let step = Duration::from_secs_f64(config.timer.target_elapsed_seconds);
    for frame in 0..config.headless.frames {
        game.advance(step)
            .with_context(|| format!("Frame {} failed", frame))?;
    }

    info!(
        frames = game.backend().presented_frames(),
        sprite_x = game.sprite().screen_pos.x,
        "Headless run finished"
    );
    Ok(())
}

/// 创建窗口并进入消息循环
fn run_windowed(config: &Config) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;

    let title = format!("{} [{}]", config.window.title, config.graphics.backend.name());
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable)
            .build(&event_loop)
            .context("Failed to create window")?,
    );

    let backend =
        WgpuBackend::new(window.clone(), config).context("Failed to initialize graphics backend")?;
    let mut game = Game::new(backend, config);
    game.initialize().context("Failed to initialize game")?;

    info!("Entering main loop...");
    let mut failure: Option<anyhow::Error> = None;

    event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        if let Some(message) = WindowMessage::from_event(&event) {
            if let Err(e) = game.handle_message(message) {
                failure = Some(anyhow::Error::new(e).context("Window message failed"));
                elwt.exit();
                return;
            }
        }

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                info!("Close requested, shutting down...");
                elwt.exit();
            }
            Event::WindowEvent {
                event: WindowEvent::RedrawRequested,
                ..
            } => {
                if let Err(e) = game.tick() {
                    failure = Some(anyhow::Error::new(e).context("Frame failed"));
                    elwt.exit();
                }
            }
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => debug!("Event loop exiting"),
            _ => (),
        }
    })?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
