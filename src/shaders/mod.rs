// SPDX-License-Identifier: GPL-3.0-only
//! WGSL sources for the frame pipeline and shared GPU helpers
//!
//! The preprocess and render kernels share the camera and splat record types
//! from `common.wgsl`; the combined sources are built once and cached.

mod gpu_processor;
pub mod gpu_utils;

pub use gpu_processor::{
    compute_dispatch_size, read_buffer_async, read_buffer_region, read_texture_rgba,
};

use crate::constants::{SORT_KEYS_PER_THREAD, WORKGROUP_SIZE};
use std::sync::OnceLock;

/// Camera uniform and splat record declarations
const COMMON_WGSL: &str = include_str!("common.wgsl");

/// Per-Gaussian projection, culling and key emission
const PREPROCESS_MAIN_WGSL: &str = include_str!("preprocess.wgsl");

/// Instanced quad rasterization of sorted splats
const RENDER_MAIN_WGSL: &str = include_str!("gaussian.wgsl");

/// Histogram, scan and scatter kernels of the depth sort
pub const RADIX_SORT_WGSL: &str = include_str!("radix_sort.wgsl");

static PREPROCESS_SHADER_COMBINED: OnceLock<String> = OnceLock::new();
static RENDER_SHADER_COMBINED: OnceLock<String> = OnceLock::new();

/// Get the combined preprocess shader source
pub fn preprocess_shader() -> &'static str {
    PREPROCESS_SHADER_COMBINED.get_or_init(|| format!("{}\n\n{}", COMMON_WGSL, PREPROCESS_MAIN_WGSL))
}

/// Get the combined render shader source
pub fn render_shader() -> &'static str {
    RENDER_SHADER_COMBINED.get_or_init(|| format!("{}\n\n{}", COMMON_WGSL, RENDER_MAIN_WGSL))
}

/// Override constants the preprocess kernel is specialized with.
///
/// `sortKeyPerThread` must agree with the sort kernels so both sides count
/// blocks of the same size.
pub fn preprocess_constants() -> [(&'static str, f64); 2] {
    [
        ("workgroupSize", WORKGROUP_SIZE as f64),
        ("sortKeyPerThread", SORT_KEYS_PER_THREAD as f64),
    ]
}

/// Override constants for the radix sort kernels.
pub fn sort_constants() -> [(&'static str, f64); 1] {
    [("sortKeyPerThread", SORT_KEYS_PER_THREAD as f64)]
}
