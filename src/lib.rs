// SPDX-License-Identifier: GPL-3.0-only

//! gsplat-renderer - GPU frame pipeline for Gaussian splat point clouds
//!
//! Projects every Gaussian to screen space, depth-sorts the visible ones with
//! a GPU radix sort and composites them back to front with one indirect draw.
//! The visible count is produced and consumed on the device; the host never
//! reads it while recording a frame.
//!
//! # Architecture
//!
//! - [`renderer`]: buffers, pipelines, settings and the per-frame command sequence
//! - [`sort`]: radix sort of depth keys with indirect dispatch
//! - [`shaders`]: WGSL sources and shared GPU helpers
//! - [`point_cloud`]: Gaussian records and device upload
//! - [`camera`]: camera uniform block
//! - [`gpu`]: device creation
//! - [`config`]: user configuration
//!
//! # Example
//!
//! ```ignore
//! let mut encoder = device.create_command_encoder(&Default::default());
//! renderer.frame(&mut encoder, &target_view);
//! queue.submit([encoder.finish()]);
//! ```

pub mod camera;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod point_cloud;
pub mod renderer;
pub mod shaders;
pub mod sort;

// Re-export commonly used types
pub use camera::{Camera, CameraUniform};
pub use config::RendererConfig;
pub use errors::{RendererError, RendererResult};
pub use point_cloud::{Gaussian, PointCloud};
pub use renderer::{DrawIndirectArgs, GaussianRenderer, RenderOptions, RenderingSettings};
pub use sort::RadixSorter;
