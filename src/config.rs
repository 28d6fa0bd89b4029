// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{DEFAULT_CLEAR_COLOR, DEFAULT_SCALE_MULTIPLIER};
use crate::errors::RendererResult;
use crate::gpu::wgpu;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user config dir
const CONFIG_DIR_NAME: &str = "gsplat-renderer";
const CONFIG_FILE_NAME: &str = "config.json";

/// Adapter selection preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum GpuPowerPreference {
    /// Let wgpu decide
    #[default]
    Default,
    /// Prefer an integrated GPU
    LowPower,
    /// Prefer a discrete GPU
    HighPerformance,
}

impl From<GpuPowerPreference> for wgpu::PowerPreference {
    fn from(preference: GpuPowerPreference) -> Self {
        match preference {
            GpuPowerPreference::Default => wgpu::PowerPreference::None,
            GpuPowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Background the render pass clears to (linear RGBA)
    pub clear_color: [f64; 4],
    /// Initial Gaussian scale multiplier
    pub scale_multiplier: f32,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    pub power_preference: GpuPowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: DEFAULT_CLEAR_COLOR,
            scale_multiplier: DEFAULT_SCALE_MULTIPLIER,
            width: 1280,
            height: 720,
            power_preference: GpuPowerPreference::default(),
        }
    }
}

impl RendererConfig {
    /// `<config dir>/gsplat-renderer/config.json`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Parse a config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> RendererResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded renderer config");
        Ok(config)
    }

    /// Like [`RendererConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> RendererResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> RendererResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved renderer config");
        Ok(())
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: RendererConfig = serde_json::from_str(r#"{"width": 64}"#).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 720);
        assert_eq!(config.scale_multiplier, 1.0);
    }

    #[test]
    fn test_power_preference_mapping() {
        assert_eq!(
            wgpu::PowerPreference::from(GpuPowerPreference::HighPerformance),
            wgpu::PowerPreference::HighPerformance
        );
        assert_eq!(
            wgpu::PowerPreference::from(GpuPowerPreference::Default),
            wgpu::PowerPreference::None
        );
    }

    #[test]
    fn test_default_clear_color_is_opaque_black() {
        let color = RendererConfig::default().clear_color();
        assert_eq!(color, wgpu::Color::BLACK);
    }
}
