/*!
Interactive GPU Mandelbrot renderer.

The core turns a view window (center, magnification, aspect ratio, pixel
resolution, iteration budget) into a per-pixel escape-count field on the
GPU, colour-maps the counts under a fixed palette, and assembles an
HSV-like image ready for display or PNG export. Each stage is a single
data-parallel dispatch; the host orchestration in [`MandelbrotView`] is
sequential and blocking.

The winit shell in `main.rs` is a thin consumer of this API: it owns one
[`MandelbrotView`], translates clicks and keys into [`SettingsUpdate`]s, and
presents the resulting image.
*/

pub mod buffer;
pub mod colour;
pub mod complex;
pub mod compute;
pub mod device;
pub mod encoder;
pub mod error;
pub mod escape;
pub mod export;
pub mod pool;
pub mod render;
pub mod settings;
pub mod var;
pub mod view;

pub use colour::Palette;
pub use complex::Complex;
pub use device::GpuContext;
pub use error::Error;
pub use export::ColourImage;
pub use pool::MemoryPool;
pub use render::{EscapeField, MandelbrotView};
pub use settings::{SettingsUpdate, ViewSettings};
pub use view::{Frame, GridSize};
