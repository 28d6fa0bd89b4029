// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities.
//!
//! The renderer itself takes a device and queue from its caller; this module is
//! what the binary and the tests use to get one.

use crate::errors::{RendererError, RendererResult};
use std::sync::Arc;
use tracing::{debug, info};

pub use wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Adapter class (discrete, integrated, cpu)
    pub device_type: wgpu::DeviceType,
}

/// Create a wgpu device and queue for headless rendering.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
/// * `power_preference` - Adapter selection hint
///
/// # Returns
///
/// A tuple of (Device, Queue, GpuDeviceInfo)
pub async fn create_render_device(
    label: &str,
    power_preference: wgpu::PowerPreference,
) -> RendererResult<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo)> {
    info!(label = label, "Creating GPU device for splat rendering");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RendererError::AdapterUnavailable(e.to_string()))?;

    let adapter_info = adapter.get_info();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        device_type = ?adapter_info.device_type,
        "GPU adapter selected"
    );

    // Large clouds need the adapter's full storage buffer ceiling
    let required_limits = adapter.limits();
    debug!(
        max_storage_buffer_binding_size = required_limits.max_storage_buffer_binding_size,
        max_buffer_size = required_limits.max_buffer_size,
        "Requesting device limits"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits,
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        device_type: adapter_info.device_type,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_render_device() {
        // This test requires a GPU, so it may be skipped in CI
        match create_render_device("test_device", wgpu::PowerPreference::default()).await {
            Ok((device, queue, info)) => {
                println!("Created device: {:?}", info);
                assert!(device.limits().max_compute_workgroup_size_x >= 256);
                drop(queue);
                drop(device);
            }
            Err(e) => {
                // Skip if no GPU available
                println!("Skipping test (no GPU): {}", e);
            }
        }
    }
}
