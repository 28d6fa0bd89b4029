// SPDX-License-Identifier: GPL-3.0-only

//! Gaussian point cloud input
//!
//! A point cloud is a device buffer of [`Gaussian`] records plus the point
//! count and the spherical-harmonics degree the records carry. The renderer
//! only reads it.

use crate::constants::{MAX_SH_DEGREE, SH_COEFF_COUNT};
use crate::errors::{RendererError, RendererResult};
use crate::gpu::wgpu;
use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

/// Zeroth-order SH basis constant
pub const SH_C0: f32 = 0.282_094_8;

/// One 3D Gaussian as the preprocessing kernel reads it.
///
/// Layout matches the WGSL `Gaussian` struct: 304 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Gaussian {
    pub position: [f32; 3],
    pub opacity: f32,
    /// Unit quaternion (w, x, y, z)
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub _pad: f32,
    /// SH coefficients per color channel, RGB in xyz
    pub sh: [[f32; 4]; SH_COEFF_COUNT],
}

impl Gaussian {
    /// Gaussian with a view-independent base color.
    pub fn new(
        position: [f32; 3],
        scale: [f32; 3],
        rotation: [f32; 4],
        opacity: f32,
        color: [f32; 3],
    ) -> Self {
        let mut sh = [[0.0; 4]; SH_COEFF_COUNT];
        // The kernel adds 0.5 after evaluating the DC term
        for (channel, value) in color.iter().enumerate() {
            sh[0][channel] = (value - 0.5) / SH_C0;
        }

        Self {
            position,
            opacity,
            rotation,
            scale,
            _pad: 0.0,
            sh,
        }
    }
}

/// Gaussians uploaded to the device.
#[derive(Debug)]
pub struct PointCloud {
    num_points: u32,
    sh_deg: u32,
    gaussian_buffer: wgpu::Buffer,
}

impl PointCloud {
    /// Upload `gaussians` into a new storage buffer.
    ///
    /// An empty slice still gets a one-record buffer so the binding is never
    /// zero-sized; `num_points` stays 0.
    pub fn from_gaussians(
        device: &wgpu::Device,
        gaussians: &[Gaussian],
        sh_deg: u32,
    ) -> RendererResult<Self> {
        validate_sh_degree(sh_deg)?;
        let num_points = u32::try_from(gaussians.len()).map_err(|_| {
            RendererError::InvalidPointCloud(format!("{} points exceed u32", gaussians.len()))
        })?;

        let placeholder = [Gaussian::zeroed()];
        let records = if gaussians.is_empty() {
            &placeholder[..]
        } else {
            gaussians
        };

        let gaussian_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gaussian_buffer"),
            contents: bytemuck::cast_slice(records),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        debug!(
            num_points,
            sh_deg,
            bytes = gaussian_buffer.size(),
            "Uploaded point cloud"
        );

        Ok(Self {
            num_points,
            sh_deg,
            gaussian_buffer,
        })
    }

    /// Wrap a buffer of [`Gaussian`] records the caller already filled.
    pub fn from_buffer(
        gaussian_buffer: wgpu::Buffer,
        num_points: u32,
        sh_deg: u32,
    ) -> RendererResult<Self> {
        validate_sh_degree(sh_deg)?;

        let required = u64::from(num_points.max(1)) * std::mem::size_of::<Gaussian>() as u64;
        if gaussian_buffer.size() < required {
            return Err(RendererError::InvalidPointCloud(format!(
                "buffer holds {} bytes, {} points need {}",
                gaussian_buffer.size(),
                num_points,
                required
            )));
        }
        if !gaussian_buffer.usage().contains(wgpu::BufferUsages::STORAGE) {
            return Err(RendererError::InvalidPointCloud(
                "point buffer lacks STORAGE usage".to_string(),
            ));
        }

        Ok(Self {
            num_points,
            sh_deg,
            gaussian_buffer,
        })
    }

    pub fn num_points(&self) -> u32 {
        self.num_points
    }

    pub fn sh_deg(&self) -> u32 {
        self.sh_deg
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.gaussian_buffer
    }
}

fn validate_sh_degree(sh_deg: u32) -> RendererResult<()> {
    if sh_deg > MAX_SH_DEGREE {
        return Err(RendererError::InvalidPointCloud(format!(
            "SH degree {} exceeds {}",
            sh_deg, MAX_SH_DEGREE
        )));
    }
    Ok(())
}

/// Deterministic clouds for the demo binary and tests.
pub mod synthetic {
    use super::Gaussian;
    use std::f32::consts::PI;

    const IDENTITY_ROTATION: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

    /// `count` Gaussians spread evenly over a sphere surface.
    ///
    /// Colors follow the surface normal so the sphere reads as shaded from any
    /// angle.
    pub fn fibonacci_sphere(count: u32, radius: f32, center: [f32; 3]) -> Vec<Gaussian> {
        let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
        // Roughly covers the surface without large gaps
        let splat_scale = radius * 2.0 / (count.max(1) as f32).sqrt();

        (0..count)
            .map(|i| {
                let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
                let ring = (1.0 - y * y).max(0.0).sqrt();
                let theta = golden_angle * i as f32;
                let normal = [theta.cos() * ring, y, theta.sin() * ring];

                Gaussian::new(
                    [
                        center[0] + normal[0] * radius,
                        center[1] + normal[1] * radius,
                        center[2] + normal[2] * radius,
                    ],
                    [splat_scale; 3],
                    IDENTITY_ROTATION,
                    0.8,
                    [
                        0.5 + 0.5 * normal[0],
                        0.5 + 0.5 * normal[1],
                        0.5 + 0.5 * normal[2],
                    ],
                )
            })
            .collect()
    }

    /// `count` identical small Gaussians on a square grid in the plane `z`.
    ///
    /// The grid spans `[-extent, extent]` in x and y.
    pub fn grid(count: u32, extent: f32, z: f32) -> Vec<Gaussian> {
        let side = (count as f32).sqrt().ceil().max(1.0) as u32;
        let step = if side > 1 {
            2.0 * extent / (side - 1) as f32
        } else {
            0.0
        };

        (0..count)
            .map(|i| {
                let x = -extent + (i % side) as f32 * step;
                let y = -extent + (i / side) as f32 * step;
                Gaussian::new(
                    [x, y, z],
                    [0.02; 3],
                    IDENTITY_ROTATION,
                    0.8,
                    [1.0, 0.5, 0.2],
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_layout() {
        assert_eq!(std::mem::size_of::<Gaussian>(), 304);
        assert_eq!(std::mem::offset_of!(Gaussian, opacity), 12);
        assert_eq!(std::mem::offset_of!(Gaussian, rotation), 16);
        assert_eq!(std::mem::offset_of!(Gaussian, scale), 32);
        assert_eq!(std::mem::offset_of!(Gaussian, sh), 48);
    }

    #[test]
    fn test_base_color_round_trips_through_dc_term() {
        let g = Gaussian::new([0.0; 3], [1.0; 3], [1.0, 0.0, 0.0, 0.0], 1.0, [0.2, 0.5, 0.9]);
        for (channel, expected) in [0.2f32, 0.5, 0.9].iter().enumerate() {
            let color = SH_C0 * g.sh[0][channel] + 0.5;
            assert!((color - expected).abs() < 1e-5);
        }
        assert!(g.sh[1..].iter().all(|c| *c == [0.0; 4]));
    }

    #[test]
    fn test_fibonacci_sphere_on_surface() {
        let center = [1.0, -2.0, 3.0];
        let cloud = synthetic::fibonacci_sphere(500, 2.0, center);
        assert_eq!(cloud.len(), 500);
        for g in &cloud {
            let d = (0..3)
                .map(|i| (g.position[i] - center[i]).powi(2))
                .sum::<f32>()
                .sqrt();
            assert!((d - 2.0).abs() < 1e-4, "point off the sphere: {d}");
        }
    }

    #[test]
    fn test_fibonacci_sphere_is_deterministic() {
        assert_eq!(
            synthetic::fibonacci_sphere(64, 1.0, [0.0; 3]),
            synthetic::fibonacci_sphere(64, 1.0, [0.0; 3])
        );
        assert!(synthetic::fibonacci_sphere(0, 1.0, [0.0; 3]).is_empty());
    }

    #[test]
    fn test_grid_bounds() {
        let cloud = synthetic::grid(100, 1.0, -5.0);
        assert_eq!(cloud.len(), 100);
        for g in &cloud {
            assert!(g.position[0].abs() <= 1.0 + 1e-5);
            assert!(g.position[1].abs() <= 1.0 + 1e-5);
            assert_eq!(g.position[2], -5.0);
        }
    }

    #[test]
    fn test_sh_degree_limit() {
        assert!(validate_sh_degree(3).is_ok());
        assert!(matches!(
            validate_sh_degree(4),
            Err(RendererError::InvalidPointCloud(_))
        ));
    }
}
