/// Build script for DistSprite
///
/// # Shader Strategy:
/// - wgpu: WGSL shaders embedded with `include_str!` and compiled at runtime
fn main() {
    // Trigger rebuild if shader files change
    println!("cargo:rerun-if-changed=src/gfx/wgpu/shaders/sprite.wgsl");
    println!("cargo:rerun-if-changed=src/gfx/wgpu/shaders/post_process.wgsl");
}
