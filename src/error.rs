//! Error types for the simulation.
//!
//! Construction is the only fallible phase: device setup, palette parsing,
//! landscape sources and layer validation all surface here. Stepping a
//! constructed simulation does not fail.

use std::fmt;

/// Errors raised while acquiring or using the GPU.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for presentation.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
    /// A kernel, field or buffer could not be created.
    Resource(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
            GpuError::Resource(msg) => write!(f, "Failed to allocate GPU resource: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors raised while loading an image used as a landscape source.
#[derive(Debug)]
pub enum TextureError {
    /// Failed to decode the image.
    ImageLoad(image::ImageError),
    /// Failed to read file from disk.
    Io(std::io::Error),
    /// The image has zero width or height.
    Empty,
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::ImageLoad(e) => write!(f, "Failed to load image: {}", e),
            TextureError::Io(e) => write!(f, "Failed to read image file: {}", e),
            TextureError::Empty => write!(f, "Image has no pixels"),
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::ImageLoad(e) => Some(e),
            TextureError::Io(e) => Some(e),
            TextureError::Empty => None,
        }
    }
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::ImageLoad(e)
    }
}

impl From<std::io::Error> for TextureError {
    fn from(e: std::io::Error) -> Self {
        TextureError::Io(e)
    }
}

/// Fatal errors raised while constructing a simulation.
#[derive(Debug)]
pub enum PhysarumError {
    /// More agent layers than deposit channels.
    TooManyLayers(usize),
    /// An agent layer was configured without agents.
    EmptyLayer(usize),
    /// A palette color is not a 6-digit hex string.
    InvalidColor(String),
    /// A palette string does not hold exactly four colors.
    InvalidPalette(String),
    /// Domain width or height is zero.
    InvalidDimensions(u32, u32),
    /// A numeric parameter is out of range or not finite.
    InvalidParameter(String),
    /// GPU setup or allocation failed.
    Gpu(GpuError),
    /// Landscape source image could not be loaded.
    Texture(TextureError),
}

impl fmt::Display for PhysarumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysarumError::TooManyLayers(n) => write!(
                f,
                "{} agent layers requested, at most {} are supported",
                n,
                crate::MAX_LAYERS
            ),
            PhysarumError::EmptyLayer(i) => write!(f, "Agent layer {} has no agents", i),
            PhysarumError::InvalidColor(s) => write!(f, "Invalid color string: {:?}", s),
            PhysarumError::InvalidPalette(s) => write!(f, "Invalid palette: {}", s),
            PhysarumError::InvalidDimensions(w, h) => {
                write!(f, "Invalid simulation size {}x{}", w, h)
            }
            PhysarumError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PhysarumError::Gpu(e) => write!(f, "GPU error: {}", e),
            PhysarumError::Texture(e) => write!(f, "Landscape image error: {}", e),
        }
    }
}

impl std::error::Error for PhysarumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PhysarumError::Gpu(e) => Some(e),
            PhysarumError::Texture(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for PhysarumError {
    fn from(e: GpuError) -> Self {
        PhysarumError::Gpu(e)
    }
}

impl From<TextureError> for PhysarumError {
    fn from(e: TextureError) -> Self {
        PhysarumError::Texture(e)
    }
}
