// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU utilities for the preprocess, sort and render pipelines
//!
//! - Bind group layout entry builders
//! - Error-scoped construction

use crate::errors::RendererResult;
use crate::gpu::wgpu;

/// Storage buffer layout entry.
pub fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Uniform buffer layout entry.
pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bind every buffer in order, starting at binding 0.
pub fn create_buffer_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffers: &[&wgpu::Buffer],
) -> wgpu::BindGroup {
    let entries: Vec<wgpu::BindGroupEntry> = buffers
        .iter()
        .enumerate()
        .map(|(binding, buffer)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: buffer.as_entire_binding(),
        })
        .collect();

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}

/// Run `build` inside out-of-memory and validation error scopes.
///
/// Resource creation in wgpu reports failures asynchronously through the
/// device; popping the scopes turns them into a construction error instead of
/// an uncaptured-error panic later.
pub async fn with_error_scopes<T>(
    device: &wgpu::Device,
    build: impl FnOnce() -> T,
) -> RendererResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = build();

    // Scopes pop in reverse order of pushing
    let validation = device.pop_error_scope().await;
    let out_of_memory = device.pop_error_scope().await;

    if let Some(err) = out_of_memory {
        return Err(err.into());
    }
    if let Some(err) = validation {
        return Err(err.into());
    }

    Ok(value)
}
