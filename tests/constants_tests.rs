// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants shared between host code and kernels

use gsplat_renderer::constants::*;
use gsplat_renderer::renderer::{DrawIndirectArgs, RenderingSettings, splat_buffer_size};
use gsplat_renderer::shaders::compute_dispatch_size;

#[test]
fn test_shared_kernel_constants() {
    assert_eq!(WORKGROUP_SIZE, 256);
    assert_eq!(SORT_KEYS_PER_THREAD, 15);
    assert_eq!(SORT_BLOCK_SIZE, WORKGROUP_SIZE * SORT_KEYS_PER_THREAD);
}

#[test]
fn test_preprocess_dispatch_sizes() {
    assert_eq!(compute_dispatch_size(0, WORKGROUP_SIZE), 0);
    assert_eq!(compute_dispatch_size(1000, WORKGROUP_SIZE), 4);
    assert_eq!(compute_dispatch_size(256, WORKGROUP_SIZE), 1);
    assert_eq!(compute_dispatch_size(257, WORKGROUP_SIZE), 2);
}

#[test]
fn test_host_layouts() {
    assert_eq!(std::mem::size_of::<RenderingSettings>(), 16);
    assert_eq!(std::mem::size_of::<DrawIndirectArgs>(), 16);
    assert_eq!(
        std::mem::offset_of!(DrawIndirectArgs, instance_count) as u64,
        INSTANCE_COUNT_OFFSET
    );
    assert_eq!(splat_buffer_size(10), 10 * SPLAT_STRIDE);
}
