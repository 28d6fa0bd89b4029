// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipeline for Gaussian splat rendering
//!
//! [`GaussianRenderer`] owns every buffer and pipeline a frame needs and records
//! the frame as one linear command sequence:
//!
//! 1. reset the visible counter and the draw's instance count
//! 2. preprocess: project, cull and emit sort keys
//! 3. depth sort
//! 4. copy the visible count into the indirect draw arguments
//! 5. draw the sorted splats with one indirect draw
//!
//! Everything after construction stays on the device; `frame` never waits on or
//! reads from the GPU.

mod buffers;
mod pipelines;
mod settings;

pub use buffers::{DrawIndirectArgs, RenderBuffers, RenderingSettings, splat_buffer_size};
pub use pipelines::{BindGroupLayouts, PreprocessPipeline, SplatRenderPipeline};
pub use settings::SettingsController;

use crate::config::RendererConfig;
use crate::constants::{COUNTER_SIZE, DEFAULT_CLEAR_COLOR, WORKGROUP_SIZE};
use crate::errors::{RendererError, RendererResult};
use crate::gpu::wgpu;
use crate::point_cloud::PointCloud;
use crate::shaders::gpu_utils::with_error_scopes;
use crate::shaders::{compute_dispatch_size, read_buffer_region};
use crate::sort::RadixSorter;
use std::sync::Arc;
use tracing::{info, trace};

/// Construction-time render options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub clear_color: wgpu::Color,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let [r, g, b, a] = DEFAULT_CLEAR_COLOR;
        Self {
            clear_color: wgpu::Color { r, g, b, a },
        }
    }
}

impl From<&RendererConfig> for RenderOptions {
    fn from(config: &RendererConfig) -> Self {
        Self {
            clear_color: config.clear_color(),
        }
    }
}

pub struct GaussianRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    point_count: u32,
    options: RenderOptions,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    buffers: RenderBuffers,
    settings: SettingsController,
    sorter: RadixSorter,
    preprocess: PreprocessPipeline,
    render: SplatRenderPipeline,
}

impl GaussianRenderer {
    /// Build a renderer for `point_cloud`, drawing into targets of `format`.
    ///
    /// `camera_buffer` is a uniform buffer holding a
    /// [`CameraUniform`](crate::camera::CameraUniform); the caller keeps
    /// writing it between frames.
    pub async fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        point_cloud: &PointCloud,
        format: wgpu::TextureFormat,
        camera_buffer: wgpu::Buffer,
    ) -> RendererResult<Self> {
        Self::with_options(
            device,
            queue,
            point_cloud,
            format,
            camera_buffer,
            RenderOptions::default(),
        )
        .await
    }

    pub async fn with_options(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        point_cloud: &PointCloud,
        format: wgpu::TextureFormat,
        camera_buffer: wgpu::Buffer,
        options: RenderOptions,
    ) -> RendererResult<Self> {
        let point_count = point_cloud.num_points();
        info!(
            point_count,
            sh_deg = point_cloud.sh_deg(),
            format = ?format,
            "Creating Gaussian renderer"
        );

        if !camera_buffer.usage().contains(wgpu::BufferUsages::UNIFORM) {
            return Err(RendererError::Validation(
                "camera buffer lacks UNIFORM usage".to_string(),
            ));
        }

        let sorter = RadixSorter::new(&device, point_count).await?;

        let (buffers, settings, camera_bind_group, preprocess, render) =
            with_error_scopes(&device, || {
                let buffers = RenderBuffers::new(&device, point_count);
                let settings = SettingsController::new(&device, point_cloud.sh_deg());
                let layouts = BindGroupLayouts::new(&device);
                let camera_bind_group = layouts.camera_bind_group(&device, &camera_buffer);
                let preprocess = PreprocessPipeline::new(
                    &device,
                    &layouts,
                    point_cloud,
                    &buffers.splats,
                    settings.buffer(),
                    &sorter,
                );
                let render =
                    SplatRenderPipeline::new(&device, &layouts, format, &buffers.splats, &sorter);
                (buffers, settings, camera_bind_group, preprocess, render)
            })
            .await?;

        Ok(Self {
            device,
            queue,
            point_count,
            options,
            camera_buffer,
            camera_bind_group,
            buffers,
            settings,
            sorter,
            preprocess,
            render,
        })
    }

    /// Blocking constructor for callers without an async runtime.
    pub fn new_blocking(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        point_cloud: &PointCloud,
        format: wgpu::TextureFormat,
        camera_buffer: wgpu::Buffer,
    ) -> RendererResult<Self> {
        pollster::block_on(Self::new(device, queue, point_cloud, format, camera_buffer))
    }

    /// Record one frame into `encoder`, drawing into `target_view`.
    ///
    /// The commands must be submitted on the renderer's queue. Frames never
    /// overlap as long as they are recorded and submitted in order.
    pub fn frame(&self, encoder: &mut wgpu::CommandEncoder, target_view: &wgpu::TextureView) {
        trace!(point_count = self.point_count, "Recording frame");

        let instance_count_offset = self.buffers.instance_count_offset();

        self.sorter.reset(encoder, &self.buffers.zeroes);
        encoder.copy_buffer_to_buffer(
            &self.buffers.zeroes,
            0,
            &self.buffers.draw_indirect,
            instance_count_offset,
            COUNTER_SIZE,
        );

        self.preprocess
            .record(encoder, &self.camera_bind_group, self.preprocess_workgroups());

        self.sorter.sort(encoder);

        encoder.copy_buffer_to_buffer(
            self.sorter.sort_info_buffer(),
            0,
            &self.buffers.draw_indirect,
            instance_count_offset,
            COUNTER_SIZE,
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gaussian_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.options.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.render
            .record(&mut pass, &self.camera_bind_group, &self.buffers.draw_indirect);
    }

    /// Change the Gaussian scale multiplier for subsequent frames.
    pub fn set_scale_multiplier(&mut self, scale_multiplier: f32) {
        self.settings
            .set_scale_multiplier(&self.queue, scale_multiplier);
    }

    /// The camera uniform buffer bound at set 0 of both pipelines.
    pub fn camera_buffer(&self) -> &wgpu::Buffer {
        &self.camera_buffer
    }

    pub fn point_count(&self) -> u32 {
        self.point_count
    }

    /// Workgroups each preprocess dispatch launches.
    pub fn preprocess_workgroups(&self) -> u32 {
        compute_dispatch_size(self.point_count, WORKGROUP_SIZE)
    }

    /// Host copy of the current settings.
    pub fn settings(&self) -> RenderingSettings {
        self.settings.settings()
    }

    pub fn sorter(&self) -> &RadixSorter {
        &self.sorter
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Read the indirect draw arguments back. Diagnostics only.
    pub async fn read_draw_args(&self) -> RendererResult<DrawIndirectArgs> {
        let size = std::mem::size_of::<DrawIndirectArgs>() as u64;
        let bytes = read_buffer_region(
            &self.device,
            &self.queue,
            &self.buffers.draw_indirect,
            0,
            size,
        )
        .await?;
        bytemuck::try_pod_read_unaligned(&bytes)
            .map_err(|e| RendererError::Readback(format!("draw args: {:?}", e)))
    }

    /// Read the settings uniform back. Diagnostics only.
    pub async fn read_settings(&self) -> RendererResult<RenderingSettings> {
        let size = std::mem::size_of::<RenderingSettings>() as u64;
        let bytes =
            read_buffer_region(&self.device, &self.queue, self.settings.buffer(), 0, size).await?;
        bytemuck::try_pod_read_unaligned(&bytes)
            .map_err(|e| RendererError::Readback(format!("settings: {:?}", e)))
    }

    /// Visible count of the last completed frame. Diagnostics only.
    pub async fn read_visible_count(&self) -> RendererResult<u32> {
        self.sorter
            .read_visible_count(&self.device, &self.queue)
            .await
    }
}
