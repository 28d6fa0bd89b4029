// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the splat renderer
//!
//! Every fallible path is construction-time (device, buffers, pipelines) or
//! diagnostic readback. Recording a frame never fails.

use std::fmt;

/// Result type alias using RendererError
pub type RendererResult<T> = Result<T, RendererError>;

/// Main renderer error type
#[derive(Debug, Clone)]
pub enum RendererError {
    /// No GPU adapter matched the request
    AdapterUnavailable(String),
    /// The adapter refused to create a device
    DeviceRequest(String),
    /// Accelerator memory exhausted while allocating renderer resources
    OutOfMemory(String),
    /// Shader compilation, pipeline creation or bind group/layout mismatch
    Validation(String),
    /// Point cloud parameters the kernels cannot handle
    InvalidPointCloud(String),
    /// Mapping a buffer back to host memory failed
    Readback(String),
    /// Configuration could not be parsed or written
    Config(String),
    /// Filesystem errors
    Io(String),
}

impl fmt::Display for RendererError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererError::AdapterUnavailable(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            RendererError::DeviceRequest(msg) => write!(f, "Failed to create GPU device: {}", msg),
            RendererError::OutOfMemory(msg) => write!(f, "GPU out of memory: {}", msg),
            RendererError::Validation(msg) => write!(f, "GPU validation error: {}", msg),
            RendererError::InvalidPointCloud(msg) => write!(f, "Invalid point cloud: {}", msg),
            RendererError::Readback(msg) => write!(f, "Buffer readback failed: {}", msg),
            RendererError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RendererError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for RendererError {}

impl From<wgpu::Error> for RendererError {
    fn from(err: wgpu::Error) -> Self {
        match err {
            wgpu::Error::OutOfMemory { .. } => RendererError::OutOfMemory(err.to_string()),
            _ => RendererError::Validation(err.to_string()),
        }
    }
}

impl From<wgpu::RequestDeviceError> for RendererError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        RendererError::DeviceRequest(err.to_string())
    }
}

impl From<serde_json::Error> for RendererError {
    fn from(err: serde_json::Error) -> Self {
        RendererError::Config(err.to_string())
    }
}

impl From<std::io::Error> for RendererError {
    fn from(err: std::io::Error) -> Self {
        RendererError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = RendererError::OutOfMemory("splat buffer".into());
        assert_eq!(err.to_string(), "GPU out of memory: splat buffer");

        let err = RendererError::InvalidPointCloud("sh degree 4".into());
        assert!(err.to_string().contains("sh degree 4"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RendererError = io.into();
        assert!(matches!(err, RendererError::Io(_)));
    }
}
