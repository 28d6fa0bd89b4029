// SPDX-License-Identifier: GPL-3.0-only

//! Perspective camera and its uniform block
//!
//! The renderer binds a caller-owned camera buffer; this module is how the
//! binary and the tests fill one. View space is right-handed and looks down -z.

use crate::errors::RendererResult;
use crate::gpu::wgpu;
use crate::shaders::gpu_utils::with_error_scopes;
use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use wgpu::util::DeviceExt;

/// Camera uniform as the kernels read it (272 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub view_inv: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub proj_inv: [[f32; 4]; 4],
    /// Target size in pixels
    pub viewport: [f32; 2],
    /// Focal lengths in pixels
    pub focal: [f32; 2],
}

/// Look-at pinhole camera with square pixels.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    pub fn look_at(eye: [f32; 3], target: [f32; 3], width: u32, height: u32) -> Self {
        Self {
            eye: Point3::from(eye),
            target: Point3::from(target),
            up: Vector3::y(),
            fov_y: std::f32::consts::FRAC_PI_3,
            near: 0.1,
            far: 1000.0,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Perspective3::new(self.aspect(), self.fov_y, self.near, self.far).to_homogeneous()
    }

    /// Focal lengths in pixels, matching the projection's x and y scale.
    pub fn focal(&self) -> [f32; 2] {
        let fy = 0.5 * self.height as f32 / (0.5 * self.fov_y).tan();
        [fy, fy]
    }

    pub fn uniform(&self) -> CameraUniform {
        let view = self.view_matrix();
        let proj = self.projection_matrix();

        CameraUniform {
            view: view.into(),
            view_inv: view.try_inverse().unwrap_or_else(Matrix4::identity).into(),
            proj: proj.into(),
            proj_inv: proj.try_inverse().unwrap_or_else(Matrix4::identity).into(),
            viewport: [self.width as f32, self.height as f32],
            focal: self.focal(),
        }
    }

    /// Uniform buffer holding this camera, writable through the queue.
    pub async fn create_buffer(&self, device: &wgpu::Device) -> RendererResult<wgpu::Buffer> {
        let uniform = self.uniform();
        with_error_scopes(device, || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("camera_uniform_buffer"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        })
        .await
    }

    pub fn write(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(&self.uniform()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 272);
        assert_eq!(std::mem::offset_of!(CameraUniform, viewport), 256);
        assert_eq!(std::mem::offset_of!(CameraUniform, focal), 264);
    }

    #[test]
    fn test_points_ahead_have_negative_view_z() {
        let camera = Camera::look_at([0.0, 0.0, 5.0], [0.0, 0.0, 0.0], 64, 64);
        let p = camera.view_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((p.z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_focal_matches_projection() {
        let camera = Camera::look_at([0.0; 3], [0.0, 0.0, -1.0], 200, 100);
        let proj = camera.projection_matrix();
        let [fx, fy] = camera.focal();
        assert!((proj[(0, 0)] * 100.0 - fx).abs() < 1e-3);
        assert!((proj[(1, 1)] * 50.0 - fy).abs() < 1e-3);
    }

    #[test]
    fn test_view_inverse_holds_eye() {
        let camera = Camera::look_at([1.0, 2.0, 3.0], [0.0, 0.0, 0.0], 64, 64);
        let uniform = camera.uniform();
        // Column-major: the fourth column is the translation
        let eye = uniform.view_inv[3];
        assert!((eye[0] - 1.0).abs() < 1e-4);
        assert!((eye[1] - 2.0).abs() < 1e-4);
        assert!((eye[2] - 3.0).abs() < 1e-4);
    }
}
