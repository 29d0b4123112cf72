use bytemuck::{Pod, Zeroable};

/// Element of the device-resident coordinate grid.
///
/// Host-side geometry is computed in `f64` and narrowed to `f32` here; the
/// kernels iterate in single precision, trading maximum usable magnification
/// for render speed.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub re: f32,
    pub im: f32,
}

impl Complex {
    pub const ZERO: Self = Complex { re: 0.0, im: 0.0 };

    pub fn new(re: f32, im: f32) -> Self {
        Complex { re, im }
    }
}
