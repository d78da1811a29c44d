//! wgpu 设备与呈现上下文
//!
//! 本模块负责 wgpu 图形设备的初始化和管理，包括：
//! - 创建 wgpu 实例（按配置选择 DX12 或全部后端）
//! - 创建窗口表面
//! - 选择图形适配器，创建逻辑设备和命令队列
//! - 配置交换链和深度缓冲
//! - 监听设备错误，内存耗尽视为设备丢失
//!
//! 设备丢失后 `recreate_device` 沿用实例和表面，重新请求适配器和设备。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use winit::window::Window;

use crate::core::config::{Config, GraphicsBackend as BackendKind};
use crate::core::error::{GraphicsError, Result};
use crate::renderer::resource::Extent2d;
use crate::renderer::sync::{FenceManager, FenceValue};

/// 深度缓冲格式
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// wgpu 设备上下文
pub struct WgpuContext {
    /// wgpu 实例（入口点）
    pub instance: wgpu::Instance,
    /// 窗口表面
    pub surface: wgpu::Surface<'static>,
    /// 图形适配器（GPU）
    pub adapter: wgpu::Adapter,
    /// 逻辑设备
    pub device: wgpu::Device,
    /// 命令队列
    pub queue: wgpu::Queue,
    /// 表面配置
    pub surface_config: wgpu::SurfaceConfiguration,
    /// 深度缓冲视图
    pub depth_view: wgpu::TextureView,
    /// GPU 完成进度
    pub fences: FenceManager,
    /// 设备错误回调置位
    device_lost: Arc<AtomicBool>,
    vsync: bool,
}

impl WgpuContext {
    /// 在已创建的窗口上初始化设备
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        info!("Initializing wgpu context");

        // 1. 创建 wgpu 实例
        let backends = match config.graphics.backend {
            BackendKind::Dx12 => wgpu::Backends::DX12,
            _ => wgpu::Backends::all(),
        };
        debug!(?backends, "Creating wgpu instance");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        // 2. 创建表面
        debug!("Creating surface");
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create surface: {}", e)))?;

        // 3. 适配器、设备、队列
        let (adapter, device, queue) = request_device(&instance, &surface)?;
        let device_lost = Arc::new(AtomicBool::new(false));
        watch_device_errors(&device, device_lost.clone());

        // 4. 配置表面
        let size = window.inner_size();
        let surface_config = surface_configuration(
            &surface,
            &adapter,
            Extent2d::new(size.width.max(1), size.height.max(1)),
            config.graphics.vsync,
            config.graphics.back_buffer_count,
        );
        debug!(format = ?surface_config.format, "Configuring surface");
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        info!("wgpu context initialized successfully");

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            depth_view,
            fences: FenceManager::new(),
            device_lost,
            vsync: config.graphics.vsync,
        })
    }

    /// 交换链尺寸
    pub fn output_size(&self) -> Extent2d {
        Extent2d::new(self.surface_config.width, self.surface_config.height)
    }

    /// 交换链格式
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// 设备错误回调是否报告了设备丢失
    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Acquire)
    }

    /// 标记设备丢失
    pub fn mark_device_lost(&self) {
        self.device_lost.store(true, Ordering::Release);
    }

    /// 重新配置表面与深度缓冲（用于窗口调整）
    pub fn reconfigure_surface(&mut self, width: u32, height: u32) {
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// 重建设备
    ///
    /// 沿用实例和表面，按当前交换链尺寸重新配置。
    pub fn recreate_device(&mut self) -> Result<()> {
        info!("Recreating wgpu device");
        let (adapter, device, queue) = request_device(&self.instance, &self.surface)?;

        let device_lost = Arc::new(AtomicBool::new(false));
        watch_device_errors(&device, device_lost.clone());

        let surface_config = surface_configuration(
            &self.surface,
            &adapter,
            self.output_size(),
            self.vsync,
            self.surface_config.desired_maximum_frame_latency,
        );
        self.surface.configure(&device, &surface_config);

        self.depth_view = create_depth_view(&device, &surface_config);
        self.adapter = adapter;
        self.device = device;
        self.queue = queue;
        self.surface_config = surface_config;
        self.device_lost = device_lost;
        self.fences.reset();
        Ok(())
    }

    /// 提交一批命令缓冲，并登记完成回调
    pub fn submit<I>(&self, command_buffers: I) -> (wgpu::SubmissionIndex, FenceValue)
    where
        I: IntoIterator<Item = wgpu::CommandBuffer>,
    {
        let index = self.queue.submit(command_buffers);
        let fence = self.fences.next_value();
        let signal = self.fences.clone();
        self.queue
            .on_submitted_work_done(move || signal.update_completed_value(fence));
        (index, fence)
    }

    /// 阻塞直到已提交的工作全部完成
    pub fn wait_for_gpu(&self) {
        self.wait_for_fence(self.fences.current_value());
    }

    /// 轮询设备直到 `fence` 的完成回调触发
    ///
    /// 队列已空但回调仍未到达时说明设备已经不可用，此时直接视为完成。
    pub fn wait_for_fence(&self, fence: FenceValue) {
        let signaled = self
            .fences
            .wait_until_drained(fence, || self.device.poll(wgpu::Maintain::Wait).is_queue_empty());
        if !signaled {
            warn!(
                fence = fence.value(),
                lost = self.is_device_lost(),
                "Queue drained without completion, dropping fence"
            );
        }
    }
}

fn request_device(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'static>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    debug!("Requesting adapter");
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(surface),
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| GraphicsError::DeviceCreation("Failed to find suitable adapter".to_string()))?;

    let info = adapter.get_info();
    info!(name = %info.name, backend = ?info.backend, "Selected adapter");

    debug!("Requesting device and queue");
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Main Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        },
        None,
    ))
    .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create device: {}", e)))?;

    Ok((adapter, device, queue))
}

fn watch_device_errors(device: &wgpu::Device, device_lost: Arc<AtomicBool>) {
    let flag = device_lost.clone();
    device.on_uncaptured_error(Box::new(move |e| {
        error!("wgpu device error: {}", e);
        if matches!(e, wgpu::Error::OutOfMemory { .. }) {
            flag.store(true, Ordering::Release);
        }
    }));

    device.set_device_lost_callback(device_lost_callback(device_lost));
}

fn device_lost_callback(
    device_lost: Arc<AtomicBool>,
) -> impl Fn(wgpu::DeviceLostReason, String) + Send + 'static {
    move |reason, message| {
        error!(?reason, %message, "wgpu device lost");
        device_lost.store(true, Ordering::Release);
    }
}

fn surface_configuration(
    surface: &wgpu::Surface<'static>,
    adapter: &wgpu::Adapter,
    size: Extent2d,
    vsync: bool,
    frame_latency: u32,
) -> wgpu::SurfaceConfiguration {
    let caps = surface.get_capabilities(adapter);
    // 优先选择 BGRA sRGB，与离屏目标一致
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| *f == wgpu::TextureFormat::Bgra8UnormSrgb)
        .or_else(|| caps.formats.iter().copied().find(|f| f.is_srgb()))
        .or_else(|| caps.formats.first().copied())
        .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);

    let present_mode = if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    };

    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width,
        height: size.height,
        present_mode,
        alpha_mode: caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: frame_latency,
    }
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_lost_callback_sets_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let callback = device_lost_callback(flag.clone());

        callback(wgpu::DeviceLostReason::Destroyed, "adapter removed".to_string());
        assert!(flag.load(Ordering::Acquire));
    }
}
