// SPDX-License-Identifier: GPL-3.0-only

//! Renderer-owned GPU buffers and their byte layouts

use crate::constants::{
    DEFAULT_SCALE_MULTIPLIER, INSTANCE_COUNT_OFFSET, SPLAT_STRIDE, VERTICES_PER_SPLAT,
};
use crate::gpu::wgpu;
use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

/// Uniform block of scalar render controls: `[scale, sh_degree, pad, pad]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RenderingSettings {
    pub scale_multiplier: f32,
    /// Stored as f32 to keep the block a plain vec4
    pub sh_degree: f32,
    pub _pad: [f32; 2],
}

impl RenderingSettings {
    pub fn new(sh_degree: u32) -> Self {
        Self {
            scale_multiplier: DEFAULT_SCALE_MULTIPLIER,
            sh_degree: sh_degree as f32,
            _pad: [0.0; 2],
        }
    }
}

/// Arguments consumed by `draw_indirect`.
///
/// Total size: 16 bytes, `instance_count` at byte offset 4.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    /// One quad per point; the instance count is overwritten on the device every frame.
    pub fn for_points(point_count: u32) -> Self {
        Self {
            vertex_count: VERTICES_PER_SPLAT,
            instance_count: point_count,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Bytes backing the splat buffer; never zero so the binding stays valid.
pub fn splat_buffer_size(point_count: u32) -> u64 {
    u64::from(point_count.max(1)) * SPLAT_STRIDE
}

/// Buffers the frame sequence writes and reads besides the sorter's own.
pub struct RenderBuffers {
    /// Per-point render records, written by preprocessing only
    pub splats: wgpu::Buffer,
    pub draw_indirect: wgpu::Buffer,
    /// 4 bytes of zero, copy source for device-side counter resets
    pub zeroes: wgpu::Buffer,
}

impl RenderBuffers {
    pub fn new(device: &wgpu::Device, point_count: u32) -> Self {
        let splats = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("splat_buffer"),
            size: splat_buffer_size(point_count),
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let draw_indirect = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("draw_indirect_buffer"),
            contents: bytemuck::bytes_of(&DrawIndirectArgs::for_points(point_count)),
            usage: wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        let zeroes = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("zero_fill_buffer"),
            contents: &[0u8; 4],
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        debug!(
            point_count,
            splat_bytes = splats.size(),
            "Allocated render buffers"
        );

        Self {
            splats,
            draw_indirect,
            zeroes,
        }
    }

    /// Destination offset of the per-frame instance count.
    pub fn instance_count_offset(&self) -> wgpu::BufferAddress {
        INSTANCE_COUNT_OFFSET
    }
}

/// Uniform buffer holding `settings`, updatable through the queue.
pub fn create_settings_buffer(device: &wgpu::Device, settings: &RenderingSettings) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("render_settings_buffer"),
        contents: bytemuck::bytes_of(settings),
        usage: wgpu::BufferUsages::UNIFORM
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_indirect_layout() {
        assert_eq!(std::mem::size_of::<DrawIndirectArgs>(), 16);
        assert_eq!(
            std::mem::offset_of!(DrawIndirectArgs, instance_count) as u64,
            INSTANCE_COUNT_OFFSET
        );
    }

    #[test]
    fn test_draw_indirect_initial_words() {
        let args = DrawIndirectArgs::for_points(1000);
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&args));
        assert_eq!(words, &[6, 1000, 0, 0]);
    }

    #[test]
    fn test_settings_layout() {
        let settings = RenderingSettings::new(3);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&settings));
        assert_eq!(floats, &[1.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_splat_buffer_never_empty() {
        assert_eq!(splat_buffer_size(0), 32);
        assert_eq!(splat_buffer_size(1000), 32_000);
    }
}
