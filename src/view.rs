//! View-window geometry: the rectangle of the complex plane currently mapped
//! onto the pixel grid.

use rayon::prelude::*;

use crate::complex::Complex;

/// Plane bounds of the current view, stored in (min, max) order until a
/// reversal flag swaps the endpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub re_range: (f64, f64),
    pub im_range: (f64, f64),
}

impl Frame {
    /// Bounds symmetric around `center`, with half-width `1/magnification`
    /// on the real axis and `aspect_ratio/magnification` on the imaginary
    /// axis. Non-positive magnification renders as magnification 1.
    pub fn from_center(center: (f64, f64), magnification: f64, aspect_ratio: f64) -> Self {
        let zoom = if magnification > 0.0 {
            1.0 / magnification
        } else {
            1.0
        };
        Frame {
            re_range: (center.0 - zoom, center.0 + zoom),
            im_range: (center.1 - zoom * aspect_ratio, center.1 + zoom * aspect_ratio),
        }
    }

    /// Swap the endpoint order of the flagged ranges. Involutive: applying
    /// the same flags twice restores the original frame.
    pub fn oriented(self, reversed_x: bool, reversed_y: bool) -> Self {
        let flip = |range: (f64, f64), reversed: bool| {
            if reversed {
                (range.1, range.0)
            } else {
                range
            }
        };
        Frame {
            re_range: flip(self.re_range, reversed_x),
            im_range: flip(self.im_range, reversed_y),
        }
    }
}

/// Pixel dimensions of the render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    /// `height` is the configured side length; `width` scales with the
    /// aspect ratio.
    pub fn from_settings(pixels_per_side: u32, aspect_ratio: f64) -> Self {
        GridSize {
            width: (pixels_per_side as f64 * aspect_ratio).round() as u32,
            height: pixels_per_side,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Linear pixel → plane mapping with a caller-supplied divisor.
///
/// Pixel row 0 maps to the *maximum* imaginary value, matching the
/// top-left-origin image convention. `swap_axes` exchanges the pixel roles
/// before the mapping is applied.
pub fn pixel_to_coord(px: u32, py: u32, pixels: u32, frame: &Frame, swap_axes: bool) -> (f64, f64) {
    let (px, py) = if swap_axes { (py, px) } else { (px, py) };
    let (re0, re1) = frame.re_range;
    let (im0, im1) = frame.im_range;
    let divisor = pixels.max(1) as f64;
    (
        px as f64 / divisor * (re1 - re0) + re0,
        py as f64 / divisor * (im0 - im1) + im1,
    )
}

fn axis_step(from: f64, to: f64, samples: u32) -> f64 {
    if samples > 1 {
        (to - from) / (samples - 1) as f64
    } else {
        0.0
    }
}

/// Plane coordinate of a grid cell, with inclusive endpoints on both axes:
/// column 0 sits on the lower real bound, column `width-1` on the upper, and
/// rows run from the maximum imaginary value downwards. `swap_axes`
/// exchanges which pixel axis walks which range.
pub fn grid_coord(frame: &Frame, size: GridSize, swap_axes: bool, px: u32, py: u32) -> (f64, f64) {
    let (re0, re1) = frame.re_range;
    let (im0, im1) = frame.im_range;
    if swap_axes {
        (
            re0 + py as f64 * axis_step(re0, re1, size.height),
            im1 + px as f64 * axis_step(im1, im0, size.width),
        )
    } else {
        (
            re0 + px as f64 * axis_step(re0, re1, size.width),
            im1 + py as f64 * axis_step(im1, im0, size.height),
        )
    }
}

/// Row-major grid of plane coordinates for every pixel.
pub fn coordinate_grid(frame: &Frame, size: GridSize, swap_axes: bool) -> Vec<Complex> {
    let frame = *frame;
    (0..size.height)
        .into_par_iter()
        .flat_map_iter(move |py| {
            (0..size.width).map(move |px| {
                let (re, im) = grid_coord(&frame, size, swap_axes, px, py);
                Complex::new(re as f32, im as f32)
            })
        })
        .collect()
}
