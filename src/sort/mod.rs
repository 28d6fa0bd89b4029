// SPDX-License-Identifier: GPL-3.0-only

//! GPU radix sort of splat depth keys
//!
//! The preprocessing kernel appends (key, index) pairs into the current
//! ping-pong slot and bumps two device-side counters: the key count in
//! `sort_info` and the block count in the dispatch-indirect buffer. [`RadixSorter::sort`]
//! then runs one histogram / scan / scatter round per 8-bit digit. The key count
//! never reaches the host during a frame; every sort dispatch after the scan is
//! sized from the dispatch-indirect buffer.

use crate::constants::{COUNTER_SIZE, RADIX_BASE, RADIX_DIGIT_PLACES, SORT_BLOCK_SIZE};
use crate::errors::{RendererError, RendererResult};
use crate::gpu::wgpu;
use crate::shaders::gpu_utils::{create_buffer_bind_group, storage_entry, uniform_entry, with_error_scopes};
use crate::shaders::{RADIX_SORT_WGSL, compute_dispatch_size, read_buffer_region, sort_constants};
use bytemuck::{Pod, Zeroable};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

/// Device-side sort header. Only `keys_size` is used; it is the visible count.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SortInfo {
    pub keys_size: u32,
    pub _pad: [u32; 3],
}

/// Arguments of an indirect compute dispatch.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchIndirectArgs {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Default for DispatchIndirectArgs {
    fn default() -> Self {
        Self { x: 0, y: 1, z: 1 }
    }
}

/// Uniform selecting which digit a sort round works on.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SortPassUniform {
    pass_index: u32,
    _pad: [u32; 3],
}

/// One side of the double-buffered key/value storage.
#[derive(Debug)]
pub struct PingPong {
    pub keys: wgpu::Buffer,
    pub indices: wgpu::Buffer,
}

/// Sorted keys and indices read back from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedPairs {
    pub keys: Vec<u32>,
    pub indices: Vec<u32>,
}

pub struct RadixSorter {
    point_count: u32,
    sort_info_buffer: wgpu::Buffer,
    dispatch_indirect_buffer: wgpu::Buffer,
    block_histogram_buffer: wgpu::Buffer,
    ping_pong: [PingPong; 2],
    current: usize,
    // Kept alive for the pass bind groups
    _pass_buffers: Vec<wgpu::Buffer>,
    pass_bind_groups: Vec<wgpu::BindGroup>,
    histogram_pipeline: wgpu::ComputePipeline,
    scan_pipeline: wgpu::ComputePipeline,
    scatter_pipeline: wgpu::ComputePipeline,
}

impl RadixSorter {
    /// Allocate sort storage for up to `point_count` keys and build the sort kernels.
    pub async fn new(device: &wgpu::Device, point_count: u32) -> RendererResult<Self> {
        let capacity = point_count.max(1);
        let max_blocks = compute_dispatch_size(capacity, SORT_BLOCK_SIZE);
        let key_bytes = u64::from(capacity) * std::mem::size_of::<u32>() as u64;
        let histogram_bytes =
            u64::from(max_blocks) * u64::from(RADIX_BASE) * std::mem::size_of::<u32>() as u64;

        info!(
            point_count,
            max_blocks, key_bytes, histogram_bytes, "Creating radix sorter"
        );

        let sorter = with_error_scopes(device, || {
            Self::build(device, point_count, key_bytes, histogram_bytes)
        })
        .await?;

        debug!("Radix sorter ready");
        Ok(sorter)
    }

    fn build(
        device: &wgpu::Device,
        point_count: u32,
        key_bytes: u64,
        histogram_bytes: u64,
    ) -> Self {
        let sort_info_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sort_info_buffer"),
            contents: bytemuck::bytes_of(&SortInfo::default()),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        let dispatch_indirect_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sort_dispatch_indirect_buffer"),
                contents: bytemuck::bytes_of(&DispatchIndirectArgs::default()),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::INDIRECT
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            });

        let block_histogram_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sort_block_histogram_buffer"),
            size: histogram_bytes,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let key_value_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: key_bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let ping_pong = [
            PingPong {
                keys: key_value_buffer("sort_keys_0"),
                indices: key_value_buffer("sort_indices_0"),
            },
            PingPong {
                keys: key_value_buffer("sort_keys_1"),
                indices: key_value_buffer("sort_indices_1"),
            },
        ];

        let pass_buffers: Vec<wgpu::Buffer> = (0..RADIX_DIGIT_PLACES)
            .map(|pass_index| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("sort_pass_buffer_{}", pass_index)),
                    contents: bytemuck::bytes_of(&SortPassUniform {
                        pass_index,
                        _pad: [0; 3],
                    }),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
            })
            .collect();

        let compute = wgpu::ShaderStages::COMPUTE;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("radix_sort_bind_group_layout"),
            entries: &[
                storage_entry(0, compute, true),
                storage_entry(1, compute, true),
                storage_entry(2, compute, false),
                uniform_entry(3, compute),
                storage_entry(4, compute, true),
                storage_entry(5, compute, true),
                storage_entry(6, compute, false),
                storage_entry(7, compute, false),
            ],
        });

        // Round p reads slot p % 2 and writes the other one
        let pass_bind_groups: Vec<wgpu::BindGroup> = pass_buffers
            .iter()
            .enumerate()
            .map(|(pass, pass_buffer)| {
                let src = &ping_pong[pass % 2];
                let dst = &ping_pong[(pass + 1) % 2];
                create_buffer_bind_group(
                    device,
                    &format!("radix_sort_bind_group_{}", pass),
                    &bind_group_layout,
                    &[
                        &sort_info_buffer,
                        &dispatch_indirect_buffer,
                        &block_histogram_buffer,
                        pass_buffer,
                        &src.keys,
                        &src.indices,
                        &dst.keys,
                        &dst.indices,
                    ],
                )
            })
            .collect();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("radix_sort_shader"),
            source: wgpu::ShaderSource::Wgsl(RADIX_SORT_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("radix_sort_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let constants = sort_constants();
        let kernel = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&format!("radix_sort_{}_pipeline", entry_point)),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                cache: None,
            })
        };

        Self {
            point_count,
            histogram_pipeline: kernel("histogram"),
            scan_pipeline: kernel("scan"),
            scatter_pipeline: kernel("scatter"),
            sort_info_buffer,
            dispatch_indirect_buffer,
            block_histogram_buffer,
            // An even number of rounds ends where preprocessing started
            current: (RADIX_DIGIT_PLACES % 2) as usize,
            ping_pong,
            _pass_buffers: pass_buffers,
            pass_bind_groups,
        }
    }

    pub fn point_count(&self) -> u32 {
        self.point_count
    }

    /// Buffer whose first u32 is the visible-key counter.
    pub fn sort_info_buffer(&self) -> &wgpu::Buffer {
        &self.sort_info_buffer
    }

    pub fn dispatch_indirect_buffer(&self) -> &wgpu::Buffer {
        &self.dispatch_indirect_buffer
    }

    pub fn ping_pong(&self) -> &[PingPong; 2] {
        &self.ping_pong
    }

    /// Slot preprocessing writes into and the sorted result lands in.
    pub fn current(&self) -> &PingPong {
        &self.ping_pong[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Zero the key counter and the dispatch block count from a 4-byte zero buffer.
    pub fn reset(&self, encoder: &mut wgpu::CommandEncoder, zeroes: &wgpu::Buffer) {
        encoder.copy_buffer_to_buffer(zeroes, 0, &self.sort_info_buffer, 0, COUNTER_SIZE);
        encoder.copy_buffer_to_buffer(zeroes, 0, &self.dispatch_indirect_buffer, 0, COUNTER_SIZE);
    }

    /// Record the sort. Leaves the current slot ordered ascending by key.
    ///
    /// Reads the counters preprocessing produced; does not reset them.
    pub fn sort(&self, encoder: &mut wgpu::CommandEncoder) {
        for bind_group in &self.pass_bind_groups {
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_histogram_pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.histogram_pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.dispatch_workgroups_indirect(&self.dispatch_indirect_buffer, 0);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_scan_pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.scan_pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.dispatch_workgroups(1, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_scatter_pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.scatter_pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.dispatch_workgroups_indirect(&self.dispatch_indirect_buffer, 0);
            }
        }
    }

    /// Read the visible-key counter. Diagnostics only.
    pub async fn read_visible_count(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> RendererResult<u32> {
        let bytes = read_buffer_region(device, queue, &self.sort_info_buffer, 0, COUNTER_SIZE).await?;
        bytemuck::try_pod_read_unaligned::<u32>(&bytes)
            .map_err(|e| RendererError::Readback(format!("sort info: {:?}", e)))
    }

    /// Read the dispatch-indirect arguments. Diagnostics only.
    pub async fn read_dispatch_args(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> RendererResult<DispatchIndirectArgs> {
        let size = std::mem::size_of::<DispatchIndirectArgs>() as u64;
        let bytes = read_buffer_region(device, queue, &self.dispatch_indirect_buffer, 0, size).await?;
        bytemuck::try_pod_read_unaligned(&bytes)
            .map_err(|e| RendererError::Readback(format!("dispatch args: {:?}", e)))
    }

    /// Read the first `visible` keys and indices of the current slot. Diagnostics only.
    pub async fn read_sorted(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> RendererResult<SortedPairs> {
        let visible = self.read_visible_count(device, queue).await?;
        let size = u64::from(visible) * std::mem::size_of::<u32>() as u64;
        let slot = self.current();

        let keys = read_buffer_region(device, queue, &slot.keys, 0, size).await?;
        let indices = read_buffer_region(device, queue, &slot.indices, 0, size).await?;

        Ok(SortedPairs {
            keys: words(&keys),
            indices: words(&indices),
        })
    }
}

fn words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_info_layout() {
        assert_eq!(std::mem::size_of::<SortInfo>(), 16);
        assert_eq!(std::mem::offset_of!(SortInfo, keys_size), 0);
    }

    #[test]
    fn test_dispatch_args_default() {
        let args = DispatchIndirectArgs::default();
        assert_eq!(std::mem::size_of::<DispatchIndirectArgs>(), 12);
        assert_eq!((args.x, args.y, args.z), (0, 1, 1));
    }

    #[test]
    fn test_words_little_endian() {
        assert_eq!(words(&[1, 0, 0, 0, 0, 1, 0, 0]), vec![1, 256]);
        assert!(words(&[]).is_empty());
    }

    #[test]
    fn test_pass_uniform_meets_minimum_binding() {
        assert_eq!(std::mem::size_of::<SortPassUniform>(), 16);
    }
}
