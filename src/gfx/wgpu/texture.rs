//! 纹理、上传批次与离屏渲染目标

use std::path::Path;

use tracing::{debug, info};

use super::context::WgpuContext;
use crate::core::error::{AssetError, Result};
use crate::renderer::resource::{Extent2d, TextureFormat};

/// 映射到 wgpu 的格式
pub fn to_wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// 纹理及其尺寸
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub size: Extent2d,
}

impl GpuTexture {
    /// 新建一个着色资源视图
    pub fn create_view(&self) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

/// 资源上传批次
///
/// 在批次内排队任意多个纹理写入，`end` 提交后阻塞等待 GPU 完成。
pub struct ResourceUploadBatch<'a> {
    context: &'a WgpuContext,
    uploads: usize,
}

impl<'a> ResourceUploadBatch<'a> {
    pub fn begin(context: &'a WgpuContext) -> Self {
        Self { context, uploads: 0 }
    }

    /// 从文件解码图片并排队上传，返回 sRGB 纹理
    pub fn create_texture_from_file(&mut self, path: &Path) -> Result<GpuTexture> {
        let image = image::open(path)
            .map_err(|e| AssetError::from_image(path, e))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        debug!(path = %path.display(), width, height, "Decoded texture");

        let label = path.to_string_lossy();
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: to_wgpu_format(TextureFormat::Rgba8UnormSrgb),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_pixel = TextureFormat::Rgba8UnormSrgb.bytes_per_pixel();
        self.context.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_pixel * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.uploads += 1;

        Ok(GpuTexture {
            texture,
            size: Extent2d::new(width, height),
        })
    }

    /// 提交批次并等待完成
    pub fn end(self) {
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Upload Batch"),
            });
        let (_, fence) = self.context.submit(std::iter::once(encoder.finish()));
        self.context.wait_for_fence(fence);
        info!(uploads = self.uploads, "Upload batch completed");
    }
}

/// 离屏渲染目标
///
/// 尺寸跟随输出尺寸，`set_window` 在尺寸变化时重建纹理。
/// 清除颜色由命令列表中的 `Clear` 给出。
pub struct RenderTexture {
    format: TextureFormat,
    target: Option<GpuTexture>,
}

impl RenderTexture {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            target: None,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        to_wgpu_format(self.format)
    }

    pub fn size(&self) -> Option<Extent2d> {
        self.target.as_ref().map(|t| t.size)
    }

    /// 按输出尺寸（重新）创建纹理，尺寸未变时返回 `false`
    pub fn set_window(&mut self, device: &wgpu::Device, size: Extent2d) -> bool {
        if self.size() == Some(size) {
            return false;
        }
        debug!(width = size.width, height = size.height, "Creating render texture");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Intermediate Render Target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        self.target = Some(GpuTexture { texture, size });
        true
    }

    /// 渲染目标视图与着色资源视图
    pub fn create_views(&self) -> Option<(wgpu::TextureView, wgpu::TextureView)> {
        self.target.as_ref().map(|t| (t.create_view(), t.create_view()))
    }
}
