// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU helpers
//!
//! - Workgroup dispatch calculations
//! - Async buffer readback (map, poll, read, unmap)
//!
//! Readback is for diagnostics and tests; the frame path never maps anything.

use crate::errors::{RendererError, RendererResult};
use crate::gpu::wgpu;

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
///
/// # Returns
/// The buffer contents as a Vec<u8>
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> RendererResult<Vec<u8>> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = device.poll(wgpu::PollType::wait_indefinitely());

    receiver
        .await
        .map_err(|_| RendererError::Readback("Failed to receive buffer mapping".to_string()))?
        .map_err(|e| RendererError::Readback(format!("Failed to map buffer: {:?}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Copy `size` bytes at `offset` of a COPY_SRC buffer into a staging buffer and
/// read them back.
///
/// Submits its own command buffer, so everything already submitted on `queue`
/// is complete by the time the data is returned.
pub async fn read_buffer_region(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    offset: wgpu::BufferAddress,
    size: wgpu::BufferAddress,
) -> RendererResult<Vec<u8>> {
    if size == 0 {
        return Ok(Vec::new());
    }

    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging_buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, offset, &staging_buffer, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    read_buffer_async(device, &staging_buffer).await
}

/// Read an RGBA8 texture back as tightly packed rows.
///
/// The texture needs COPY_SRC. Rows are copied with the 256-byte alignment
/// wgpu requires and the padding is stripped afterwards.
pub async fn read_texture_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> RendererResult<Vec<u8>> {
    let unpadded_bytes_per_row = width * 4;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("texture_readback_buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("texture_readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let padded = read_buffer_async(device, &staging_buffer).await?;

    let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
    for row in padded.chunks_exact(padded_bytes_per_row as usize) {
        pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
    }
    Ok(pixels)
}

/// Calculate compute shader dispatch size (workgroups needed)
///
/// Given an item count and workgroup size, returns the number of workgroups
/// needed to cover every item. Zero items dispatch zero workgroups.
#[inline]
pub fn compute_dispatch_size(count: u32, workgroup_size: u32) -> u32 {
    count.div_ceil(workgroup_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_dispatch_size() {
        assert_eq!(compute_dispatch_size(1000, 256), 4);
        assert_eq!(compute_dispatch_size(1024, 256), 4);
        assert_eq!(compute_dispatch_size(1025, 256), 5);
        assert_eq!(compute_dispatch_size(1, 256), 1);
        assert_eq!(compute_dispatch_size(0, 256), 0);
    }

    #[test]
    fn test_dispatch_covers_all_items() {
        for count in [0u32, 1, 255, 256, 257, 3839, 3840, 3841, 100_000] {
            let groups = compute_dispatch_size(count, 256);
            assert!(groups * 256 >= count);
            if count > 0 {
                assert!((groups - 1) * 256 < count);
            }
        }
    }
}
