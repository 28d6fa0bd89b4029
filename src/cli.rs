// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Rendering a synthetic cloud to an image
//! - Printing the selected adapter

use gsplat_renderer::camera::Camera;
use gsplat_renderer::config::RendererConfig;
use gsplat_renderer::gpu::{create_render_device, wgpu};
use gsplat_renderer::point_cloud::{PointCloud, synthetic};
use gsplat_renderer::renderer::{GaussianRenderer, RenderOptions};
use gsplat_renderer::shaders::read_texture_rgba;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Offscreen target format; also what the PNG encoder expects
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub struct RenderArgs {
    pub points: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<f32>,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
}

/// Render a synthetic Fibonacci sphere and save it as PNG
pub fn render(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let RenderArgs {
        points,
        width,
        height,
        scale,
        output,
        config,
    } = args;

    let config_path = config.unwrap_or_else(RendererConfig::default_path);
    let config = RendererConfig::load_or_default(&config_path)?;

    let width = width.unwrap_or(config.width).max(1);
    let height = height.unwrap_or(config.height).max(1);
    let scale = scale.unwrap_or(config.scale_multiplier);

    pollster::block_on(async {
        let (device, queue, gpu_info) =
            create_render_device("gsplat_render_device", config.power_preference.into()).await?;
        println!("Using {} ({:?})", gpu_info.adapter_name, gpu_info.backend);

        let gaussians = synthetic::fibonacci_sphere(points, 1.0, [0.0, 0.0, 0.0]);
        let point_cloud = PointCloud::from_gaussians(&device, &gaussians, 0)?;

        let camera = Camera::look_at([0.0, 0.6, 3.5], [0.0, 0.0, 0.0], width, height);
        let camera_buffer = camera.create_buffer(&device).await?;

        let mut renderer = GaussianRenderer::with_options(
            device.clone(),
            queue.clone(),
            &point_cloud,
            TARGET_FORMAT,
            camera_buffer,
            RenderOptions::from(&config),
        )
        .await?;
        renderer.set_scale_multiplier(scale);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("render_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let start = Instant::now();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        renderer.frame(&mut encoder, &view);
        queue.submit(std::iter::once(encoder.finish()));

        let pixels = read_texture_rgba(&device, &queue, &texture, width, height).await?;
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Frame complete");

        let visible = renderer.read_visible_count().await?;
        println!("Rendered {} of {} splats", visible, renderer.point_count());

        let image = image::RgbaImage::from_raw(width, height, pixels)
            .ok_or("rendered pixel buffer has the wrong size")?;
        image.save(&output)?;
        println!("Saved: {}", output.display());

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Print the adapter and its relevant limits
pub fn info() -> Result<(), Box<dyn std::error::Error>> {
    let config = RendererConfig::load_or_default(&RendererConfig::default_path())?;

    pollster::block_on(async {
        let (device, _queue, gpu_info) =
            create_render_device("gsplat_info_device", config.power_preference.into()).await?;
        let limits = device.limits();

        println!("Adapter:     {}", gpu_info.adapter_name);
        println!("Backend:     {:?}", gpu_info.backend);
        println!("Device type: {:?}", gpu_info.device_type);
        println!(
            "Max storage binding: {} bytes",
            limits.max_storage_buffer_binding_size
        );
        println!(
            "Max splats:  {}",
            limits.max_storage_buffer_binding_size as u64
                / std::mem::size_of::<gsplat_renderer::Gaussian>() as u64
        );

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
