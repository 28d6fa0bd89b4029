// SPDX-License-Identifier: GPL-3.0-only

use super::buffers::{RenderingSettings, create_settings_buffer};
use crate::gpu::wgpu;
use tracing::debug;

/// Host copy of the rendering settings plus the uniform buffer it mirrors.
///
/// Every change rewrites the whole 16-byte record, so the buffer never holds a
/// mix of old and new fields.
pub struct SettingsController {
    settings: RenderingSettings,
    buffer: wgpu::Buffer,
}

impl SettingsController {
    pub fn new(device: &wgpu::Device, sh_degree: u32) -> Self {
        let settings = RenderingSettings::new(sh_degree);
        let buffer = create_settings_buffer(device, &settings);
        Self { settings, buffer }
    }

    pub fn settings(&self) -> RenderingSettings {
        self.settings
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Takes effect for frames submitted after this call.
    pub fn set_scale_multiplier(&mut self, queue: &wgpu::Queue, scale_multiplier: f32) {
        self.settings.scale_multiplier = scale_multiplier;
        debug!(scale_multiplier, "Updating render settings");
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.settings));
    }
}
