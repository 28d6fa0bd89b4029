// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the per-frame command sequence
//!
//! These need a GPU adapter and skip with a message when none is available.

use gsplat_renderer::camera::Camera;
use gsplat_renderer::gpu::{create_render_device, wgpu};
use gsplat_renderer::point_cloud::{Gaussian, PointCloud, synthetic};
use gsplat_renderer::renderer::{DrawIndirectArgs, GaussianRenderer, RenderingSettings};
use gsplat_renderer::shaders::read_texture_rgba;
use gsplat_renderer::RendererError;
use std::sync::Arc;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const SIZE: u32 = 64;

async fn gpu() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    match create_render_device("frame_pipeline_test", wgpu::PowerPreference::default()).await {
        Ok((device, queue, _)) => Some((device, queue)),
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            None
        }
    }
}

struct Harness {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    renderer: GaussianRenderer,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Harness {
    async fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        gaussians: &[Gaussian],
        sh_deg: u32,
        camera: &Camera,
    ) -> Self {
        let point_cloud = PointCloud::from_gaussians(&device, gaussians, sh_deg).unwrap();
        let camera_buffer = camera.create_buffer(&device).await.unwrap();
        let renderer = GaussianRenderer::new(
            device.clone(),
            queue.clone(),
            &point_cloud,
            FORMAT,
            camera_buffer,
        )
        .await
        .unwrap();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test_target"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            device,
            queue,
            renderer,
            texture,
            view,
        }
    }

    fn frame(&self) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("test_frame_encoder"),
            });
        self.renderer.frame(&mut encoder, &self.view);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn move_camera(&self, camera: &Camera) {
        camera.write(&self.queue, self.renderer.camera_buffer());
    }

    async fn instance_count(&self) -> u32 {
        self.renderer.read_draw_args().await.unwrap().instance_count
    }

    async fn pixels(&self) -> Vec<u8> {
        read_texture_rgba(&self.device, &self.queue, &self.texture, SIZE, SIZE)
            .await
            .unwrap()
    }
}

fn looking_down_negative_z(eye_z: f32) -> Camera {
    Camera::look_at([0.0, 0.0, eye_z], [0.0, 0.0, eye_z - 1.0], SIZE, SIZE)
}

/// `in_front` points at z = -5 and `behind` points at z = +5.
fn split_cloud(in_front: u32, behind: u32) -> Vec<Gaussian> {
    let mut gaussians = synthetic::grid(in_front, 1.0, -5.0);
    gaussians.extend(synthetic::grid(behind, 1.0, 5.0));
    gaussians
}

#[tokio::test]
async fn test_instance_count_matches_visible_points() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let cloud = split_cloud(700, 300);
    let harness = Harness::new(device, queue, &cloud, 0, &looking_down_negative_z(0.0)).await;

    assert_eq!(harness.renderer.point_count(), 1000);
    assert_eq!(harness.renderer.preprocess_workgroups(), 4);

    // Before any frame the arguments hold the full point count
    assert_eq!(
        harness.renderer.read_draw_args().await.unwrap(),
        DrawIndirectArgs {
            vertex_count: 6,
            instance_count: 1000,
            first_vertex: 0,
            first_instance: 0,
        }
    );

    harness.frame();

    assert_eq!(
        harness.renderer.read_draw_args().await.unwrap(),
        DrawIndirectArgs {
            vertex_count: 6,
            instance_count: 700,
            first_vertex: 0,
            first_instance: 0,
        }
    );
    assert_eq!(harness.renderer.read_visible_count().await.unwrap(), 700);
}

#[tokio::test]
async fn test_counts_do_not_accumulate_across_frames() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let cloud = split_cloud(500, 400);
    let near_camera = looking_down_negative_z(0.0);
    // From z = 10 both layers are in front
    let far_camera = looking_down_negative_z(10.0);
    let harness = Harness::new(device, queue, &cloud, 0, &near_camera).await;

    harness.frame();
    assert_eq!(harness.instance_count().await, 500);

    harness.move_camera(&far_camera);
    harness.frame();
    assert_eq!(harness.instance_count().await, 900);

    harness.move_camera(&near_camera);
    harness.frame();
    assert_eq!(harness.instance_count().await, 500);
}

#[tokio::test]
async fn test_repeated_frames_are_idempotent() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let cloud = synthetic::fibonacci_sphere(5000, 1.0, [0.0, 0.0, -6.0]);
    let harness = Harness::new(device, queue, &cloud, 0, &looking_down_negative_z(0.0)).await;

    harness.frame();
    let first_args = harness.renderer.read_draw_args().await.unwrap();
    let first_sorted = harness
        .renderer
        .sorter()
        .read_sorted(&harness.device, &harness.queue)
        .await
        .unwrap();

    for _ in 0..3 {
        harness.frame();
        let args = harness.renderer.read_draw_args().await.unwrap();
        assert_eq!(args, first_args);
        assert_eq!(args.vertex_count, 6);

        let sorted = harness
            .renderer
            .sorter()
            .read_sorted(&harness.device, &harness.queue)
            .await
            .unwrap();
        assert_eq!(sorted.keys, first_sorted.keys);
    }
}

#[tokio::test]
async fn test_empty_cloud_draws_nothing() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let harness = Harness::new(device, queue, &[], 0, &looking_down_negative_z(0.0)).await;
    assert_eq!(harness.renderer.preprocess_workgroups(), 0);

    harness.frame();

    let args = harness.renderer.read_draw_args().await.unwrap();
    assert_eq!(args.vertex_count, 6);
    assert_eq!(args.instance_count, 0);

    // Only the clear color remains
    let pixels = harness.pixels().await;
    assert!(pixels.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

#[tokio::test]
async fn test_scale_multiplier_updates_first_slot_only() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let cloud = synthetic::grid(16, 0.5, -3.0);
    let mut harness = Harness::new(device, queue, &cloud, 2, &looking_down_negative_z(0.0)).await;

    assert_eq!(
        harness.renderer.read_settings().await.unwrap(),
        RenderingSettings {
            scale_multiplier: 1.0,
            sh_degree: 2.0,
            _pad: [0.0; 2],
        }
    );

    harness.renderer.set_scale_multiplier(2.5);
    let settings = harness.renderer.read_settings().await.unwrap();
    assert_eq!(settings.scale_multiplier, 2.5);
    assert_eq!(settings.sh_degree, 2.0);
    assert_eq!(harness.renderer.settings(), settings);

    // Later frames still see every point
    harness.frame();
    assert_eq!(harness.instance_count().await, 16);
}

#[tokio::test]
async fn test_single_splat_covers_center_only() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let splat = Gaussian::new(
        [0.0, 0.0, -3.0],
        [0.3; 3],
        [1.0, 0.0, 0.0, 0.0],
        0.9,
        [1.0, 1.0, 1.0],
    );
    let harness = Harness::new(device, queue, &[splat], 0, &looking_down_negative_z(0.0)).await;
    harness.frame();

    let pixels = harness.pixels().await;
    let pixel = |x: u32, y: u32| {
        let i = ((y * SIZE + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    };

    let center = pixel(SIZE / 2, SIZE / 2);
    assert!(center[0] > 100, "center pixel too dark: {:?}", center);
    assert_eq!(pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(pixel(SIZE - 1, SIZE - 1), [0, 0, 0, 255]);
}

#[tokio::test]
async fn test_camera_buffer_must_be_uniform() {
    let Some((device, queue)) = gpu().await else {
        return;
    };

    let point_cloud = PointCloud::from_gaussians(&device, &synthetic::grid(4, 1.0, -5.0), 0).unwrap();
    let storage_only = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("not_a_camera_buffer"),
        size: 272,
        usage: wgpu::BufferUsages::STORAGE,
        mapped_at_creation: false,
    });

    let result =
        GaussianRenderer::new(device, queue, &point_cloud, FORMAT, storage_only).await;
    assert!(matches!(result, Err(RendererError::Validation(_))));
}
