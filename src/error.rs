//! Error taxonomy for the render core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable accelerator on this machine.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// Rejected synchronously, before any device work is dispatched.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// The device memory pool cannot satisfy a buffer reservation.
    #[error("accelerator pool exhausted: requested {requested} bytes with {available} available")]
    Allocation { requested: u64, available: u64 },

    /// Kernel dispatch or readback failed; the view should be destroyed and
    /// recreated.
    #[error("accelerator execution failed: {0}")]
    Execution(String),

    /// An operation needed an escape field or image that has not been
    /// rendered yet.
    #[error("view has not been rendered yet")]
    Unbuilt,

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

impl From<wgpu::BufferAsyncError> for Error {
    fn from(error: wgpu::BufferAsyncError) -> Self {
        Error::Execution(error.to_string())
    }
}
