//! 游戏循环生命周期测试
//!
//! 使用无窗口后端驱动 `Game`，检查绘制顺序、精灵循环、尺寸变化和设备丢失恢复。

use std::path::PathBuf;
use std::time::Duration;

use dist_sprite::core::error::DistSpriteError;
use dist_sprite::core::event::{EventHandler, WindowMessage};
use dist_sprite::core::{Config, Vector2};
use dist_sprite::game::{DeviceState, Game};
use dist_sprite::gfx::headless::BackendCall;
use dist_sprite::gfx::{DeviceDependentResources, HeadlessBackend};
use dist_sprite::renderer::command::RenderCommand;
use dist_sprite::renderer::descriptor::ResourceSlot;
use dist_sprite::renderer::post_process::PostEffect;
use dist_sprite::renderer::resource::{Extent2d, Rect};

const FRAME: Duration = Duration::from_millis(16);

/// 在临时目录生成 64x48 的精灵 PNG 和 320x180 的背景 JPG
fn write_assets(name: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("dist_sprite_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let sprite = dir.join("cat.png");
    image::RgbaImage::from_pixel(64, 48, image::Rgba([255, 128, 0, 255]))
        .save(&sprite)
        .unwrap();

    let background = dir.join("sunset.jpg");
    image::RgbImage::from_pixel(320, 180, image::Rgb([200, 100, 50]))
        .save(&background)
        .unwrap();

    (sprite, background)
}

fn config_for(name: &str) -> Config {
    let (sprite, background) = write_assets(name);
    let mut config = Config::default();
    config.assets.sprite = sprite;
    config.assets.background = background;
    config
}

fn new_game(name: &str) -> Game<HeadlessBackend> {
    let config = config_for(name);
    let mut game = Game::new(HeadlessBackend::new(1280, 720), &config);
    game.initialize().unwrap();
    game
}

fn submitted_commands(calls: &[BackendCall]) -> Vec<RenderCommand> {
    calls
        .iter()
        .find_map(|call| match call {
            BackendCall::Submit(commands) => Some(commands.clone()),
            _ => None,
        })
        .expect("no submit call recorded")
}

#[test]
fn test_initialize_creates_resources_in_order() {
    let game = new_game("initialize");

    assert_eq!(game.device_state(), DeviceState::Active);
    assert_eq!(
        game.backend().calls(),
        &[
            BackendCall::CreateDeviceDependentResources { generation: 0 },
            BackendCall::UpdateRenderTextureSize(Extent2d::new(1280, 720)),
            BackendCall::SetPostProcessSource(Extent2d::new(1280, 720)),
        ]
    );

    let resources = game.resources().unwrap();
    assert_eq!(resources.sprite_size(), Extent2d::new(64, 48));
    assert_eq!(resources.background_size(), Extent2d::new(320, 180));
    assert_eq!(resources.render_texture_size(), Some(Extent2d::new(1280, 720)));

    assert_eq!(game.sprite().screen_pos, Vector2::new(640.0, 360.0));
    assert_eq!(game.sprite().origin, Vector2::new(32.0, 24.0));
    assert_eq!(game.fullscreen_rect(), Rect::new(0, 0, 1280, 720));
}

#[test]
fn test_render_before_first_update_does_nothing() {
    let mut game = new_game("first_frame");
    game.backend_mut().take_calls();

    game.render().unwrap();

    assert!(game.backend().calls().is_empty());
    assert_eq!(game.backend().presented_frames(), 0);
}

#[test]
fn test_frame_draw_order() {
    let mut game = new_game("draw_order");
    game.backend_mut().take_calls();

    game.advance(FRAME).unwrap();

    let calls = game.backend().calls().to_vec();
    assert!(matches!(calls[0], BackendCall::Prepare));
    assert!(matches!(calls[1], BackendCall::Submit(_)));
    assert_eq!(calls[2], BackendCall::Present);
    assert_eq!(calls[3], BackendCall::CommitGraphicsMemory);

    let commands = submitted_commands(&calls);
    let position = |predicate: &dyn Fn(&RenderCommand) -> bool| {
        commands.iter().position(|c| predicate(c)).unwrap()
    };

    let background = position(&|c| {
        matches!(c, RenderCommand::DrawSprite(d) if d.texture == ResourceSlot::Background)
    });
    let cat = position(&|c| matches!(c, RenderCommand::DrawSprite(d) if d.texture == ResourceSlot::Cat));
    let clear = position(&|c| matches!(c, RenderCommand::Clear { .. }));
    let end_scene = position(&|c| matches!(c, RenderCommand::EndScene(_)));
    let post = position(&|c| matches!(c, RenderCommand::PostProcess { .. }));

    assert!(clear < background);
    assert!(background < cat);
    assert!(cat < end_scene);
    assert!(end_scene < post);

    assert_eq!(game.backend().presented_frames(), 1);
    assert_eq!(game.command_list().draw_count(), 2);
}

#[test]
fn test_cat_is_drawn_at_screen_position_with_origin() {
    let mut game = new_game("cat_draw");
    game.backend_mut().take_calls();

    game.advance(FRAME).unwrap();

    let commands = submitted_commands(game.backend().calls());
    let cat = commands
        .iter()
        .find_map(|c| match c {
            RenderCommand::DrawSprite(d) if d.texture == ResourceSlot::Cat => Some(*d),
            _ => None,
        })
        .unwrap();

    assert_eq!(cat.origin, Vector2::new(32.0, 24.0));
    assert_eq!(game.sprite().screen_pos.x, 645.0);
}

#[test]
fn test_post_effect_follows_config() {
    let mut config = config_for("effect");
    config.graphics.post_effect = PostEffect::Monochrome;
    let mut game = Game::new(HeadlessBackend::new(1280, 720), &config);
    game.initialize().unwrap();
    game.backend_mut().take_calls();

    game.advance(FRAME).unwrap();

    let commands = submitted_commands(game.backend().calls());
    assert!(commands.iter().any(|c| matches!(
        c,
        RenderCommand::PostProcess {
            source: ResourceSlot::SceneTex,
            effect: PostEffect::Monochrome,
        }
    )));
    assert_eq!(game.resources().unwrap().post_effect(), PostEffect::Monochrome);
}

#[test]
fn test_sprite_wraps_past_right_edge() {
    let mut game = new_game("wrap");

    game.sprite_mut().screen_pos.x = 1279.0;
    game.update();
    assert_eq!(game.sprite().screen_pos.x, 1284.0);

    game.sprite_mut().screen_pos.x = 1281.0;
    game.update();
    assert_eq!(game.sprite().screen_pos.x, 5.0);
}

#[test]
fn test_sprite_moves_once_per_frame() {
    let mut game = new_game("per_frame");

    for _ in 0..10 {
        game.advance(FRAME).unwrap();
    }

    assert_eq!(game.sprite().screen_pos.x, 690.0);
    assert_eq!(game.timer().frame_count(), 10);
    assert_eq!(game.backend().presented_frames(), 10);
}

#[test]
fn test_device_lost_recreates_resources() {
    let mut game = new_game("device_lost");
    game.advance(FRAME).unwrap();
    assert_eq!(game.sprite().screen_pos.x, 645.0);

    game.backend_mut().inject_device_lost();
    game.backend_mut().take_calls();
    game.advance(FRAME).unwrap();

    let calls = game.backend().calls().to_vec();
    assert_eq!(calls[0], BackendCall::HandleDeviceLost);
    assert_eq!(calls[1], BackendCall::CreateDeviceDependentResources { generation: 1 });
    assert!(!calls.contains(&BackendCall::Present));

    assert_eq!(game.device_state(), DeviceState::Active);
    assert_eq!(game.backend().generation(), 1);

    let resources = game.resources().unwrap();
    assert_eq!(resources.generation(), 1);
    assert_eq!(resources.render_texture_size(), Some(Extent2d::new(1280, 720)));
    assert_eq!(game.sprite().origin, Vector2::new(32.0, 24.0));
    assert_eq!(game.sprite().screen_pos, Vector2::new(640.0, 360.0));

    game.advance(FRAME).unwrap();
    assert_eq!(game.backend().presented_frames(), 2);
}

#[test]
fn test_origin_uses_integer_half_size() {
    let (sprite, background) = write_assets("odd_size");
    std::fs::remove_file(&sprite).unwrap();
    image::RgbaImage::new(65, 49).save(&sprite).unwrap();

    let mut config = Config::default();
    config.assets.sprite = sprite;
    config.assets.background = background;
    let mut game = Game::new(HeadlessBackend::new(1280, 720), &config);
    game.initialize().unwrap();

    assert_eq!(game.sprite().origin, Vector2::new(32.0, 24.0));
}

#[test]
fn test_same_size_resize_is_ignored() {
    let mut game = new_game("same_size");
    game.backend_mut().take_calls();

    game.on_window_size_changed(1280, 720).unwrap();
    game.on_window_size_changed(0, 0).unwrap();

    assert!(game.backend().calls().is_empty());
}

#[test]
fn test_resize_recreates_size_dependent_resources_once() {
    let mut game = new_game("resize");
    game.backend_mut().take_calls();

    game.handle_message(WindowMessage::SizeChanged {
        width: 800,
        height: 600,
    })
    .unwrap();

    assert_eq!(
        game.backend().calls(),
        &[
            BackendCall::WindowSizeChanged(Extent2d::new(800, 600)),
            BackendCall::UpdateRenderTextureSize(Extent2d::new(800, 600)),
            BackendCall::SetPostProcessSource(Extent2d::new(800, 600)),
        ]
    );
    assert_eq!(
        game.resources().unwrap().post_process_source(),
        Some(Extent2d::new(800, 600))
    );
    // 全屏矩形与精灵视口都在创建设备资源时确定
    assert_eq!(game.fullscreen_rect(), Rect::new(0, 0, 1280, 720));
    assert_eq!(game.resources().unwrap().sprite_viewport(), Extent2d::new(1280, 720));

    game.sprite_mut().screen_pos.x = 801.0;
    game.update();
    assert_eq!(game.sprite().screen_pos.x, 5.0);
}

#[test]
fn test_background_still_covers_output_after_resize() {
    let mut game = new_game("resize_cover");

    game.on_window_size_changed(1920, 1080).unwrap();
    game.advance(FRAME).unwrap();

    let geometry = game.resources().unwrap().last_sprite_geometry().unwrap();
    let background = geometry
        .ranges
        .iter()
        .find(|range| range.texture == ResourceSlot::Background)
        .unwrap();
    let start = background.first_vertex as usize;
    let vertices = &geometry.vertices[start..start + background.vertex_count as usize];

    let xs = vertices.iter().map(|v| v.position[0]);
    let ys = vertices.iter().map(|v| v.position[1]);
    assert_eq!(xs.clone().fold(f32::MAX, f32::min), -1.0);
    assert_eq!(xs.fold(f32::MIN, f32::max), 1.0);
    assert_eq!(ys.clone().fold(f32::MAX, f32::min), -1.0);
    assert_eq!(ys.fold(f32::MIN, f32::max), 1.0);
}

#[test]
fn test_restore_failure_is_fatal() {
    let config = config_for("restore_failure");
    let mut game = Game::new(HeadlessBackend::new(1280, 720), &config);
    game.initialize().unwrap();
    game.advance(FRAME).unwrap();

    std::fs::remove_file(&config.assets.sprite).unwrap();
    game.backend_mut().inject_device_lost();
    let err = game.advance(FRAME).unwrap_err();

    assert!(matches!(err, DistSpriteError::Asset(_)));
    assert_eq!(game.device_state(), DeviceState::Restoring);
    assert!(game.resources().is_none());
}

#[test]
fn test_drop_waits_for_submitted_frames() {
    let mut game = new_game("drop_wait");
    for _ in 0..3 {
        game.advance(FRAME).unwrap();
    }

    let fences = game.backend().fences();
    assert!(fences.completed_value() < fences.current_value());
    assert_eq!(game.resources().unwrap().graphics_memory().pending_count(), 1);

    drop(game);
    assert_eq!(fences.completed_value(), fences.current_value());
}

#[test]
fn test_missing_asset_fails_initialize() {
    let mut config = config_for("missing");
    config.assets.sprite = std::env::temp_dir().join("dist_sprite_does_not_exist.png");

    let mut game = Game::new(HeadlessBackend::new(1280, 720), &config);
    let err = game.initialize().unwrap_err();

    assert!(matches!(err, DistSpriteError::Asset(_)));
    assert_eq!(game.device_state(), DeviceState::Uninitialized);
    assert!(game.resources().is_none());
}

#[test]
fn test_resuming_keeps_frame_count() {
    let mut game = new_game("resume");
    for _ in 0..3 {
        game.advance(FRAME).unwrap();
    }

    game.handle_message(WindowMessage::Suspending).unwrap();
    game.handle_message(WindowMessage::Resuming).unwrap();

    assert_eq!(game.timer().frame_count(), 3);
    assert_eq!(game.device_state(), DeviceState::Active);
}

#[test]
fn test_window_moved_without_size_change_does_nothing() {
    let mut game = new_game("moved");
    game.backend_mut().take_calls();

    game.handle_message(WindowMessage::Moved).unwrap();
    game.handle_message(WindowMessage::Activated).unwrap();
    game.handle_message(WindowMessage::Deactivated).unwrap();

    assert!(game.backend().calls().is_empty());
}

#[test]
fn test_shipped_config_runs_headless() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let mut config = Config::from_file(root.join("config.toml")).unwrap();
    config.validate().unwrap();
    config.assets.sprite = root.join(&config.assets.sprite);
    config.assets.background = root.join(&config.assets.background);

    let mut game = Game::new(HeadlessBackend::new(config.window.width, config.window.height), &config);
    game.initialize().unwrap();
    for _ in 0..5 {
        game.advance(FRAME).unwrap();
    }

    assert_eq!(game.backend().presented_frames(), 5);
    assert_eq!(game.resources().unwrap().sprite_size(), Extent2d::new(128, 128));
    assert_eq!(game.sprite().origin, Vector2::new(64.0, 64.0));
}
