//! Image assembly and export.

use std::io::Cursor;

use image::{ImageOutputFormat, RgbImage};
use rayon::prelude::*;

use crate::error::Error;
use crate::view::GridSize;

/// Three parallel byte planes holding an HSV-like triple per pixel.
/// Replaced wholesale on every render; conversion to RGB happens only at
/// display or export time.
#[derive(Clone, Debug, PartialEq)]
pub struct ColourImage {
    pub size: GridSize,
    pub channel_a: Vec<u8>,
    pub channel_b: Vec<u8>,
    pub channel_c: Vec<u8>,
}

impl ColourImage {
    /// Interleaved RGB8 conversion of the channel planes.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = vec![0u8; self.size.pixel_count() * 3];
        rgb.par_chunks_mut(3).enumerate().for_each(|(index, pixel)| {
            let [r, g, b] = hsv_to_rgb(
                self.channel_a[index],
                self.channel_b[index],
                self.channel_c[index],
            );
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        });
        rgb
    }

    /// PNG-encode the RGB conversion of the current image.
    pub fn encode_png(&self) -> Result<Vec<u8>, Error> {
        let image = RgbImage::from_raw(self.size.width, self.size.height, self.to_rgb())
            .ok_or_else(|| {
                Error::Execution("channel planes do not match the image dimensions".into())
            })?;
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageOutputFormat::Png)?;
        Ok(bytes.into_inner())
    }
}

/// Byte-scaled HSV to RGB. Hue wraps over 0..=255, matching the palette
/// kernels' cycle period.
pub fn hsv_to_rgb(h: u8, s: u8, v: u8) -> [u8; 3] {
    if s == 0 {
        return [v, v, v];
    }

    let h = h as f32 / 255.0 * 6.0;
    let s = s as f32 / 255.0;
    let v = v as f32 / 255.0;

    let sector = (h.floor() as u32) % 6;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image() -> ColourImage {
        let size = GridSize { width: 3, height: 2 };
        ColourImage {
            size,
            channel_a: vec![0, 42, 85, 128, 170, 255],
            channel_b: vec![0, 255, 255, 200, 255, 255],
            channel_c: vec![0, 255, 255, 255, 255, 255],
        }
    }

    #[test]
    fn zero_saturation_is_grey() {
        assert_eq!(hsv_to_rgb(17, 0, 200), [200, 200, 200]);
        assert_eq!(hsv_to_rgb(0, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn primary_hues_convert() {
        assert_eq!(hsv_to_rgb(0, 255, 255), [255, 0, 0]);
        // 85/255 * 6 = 2.0: the green sector boundary.
        assert_eq!(hsv_to_rgb(85, 255, 255), [0, 255, 0]);
        // 170/255 * 6 = 4.0: the blue sector boundary.
        assert_eq!(hsv_to_rgb(170, 255, 255), [0, 0, 255]);
    }

    #[test]
    fn zero_value_is_black_at_any_hue() {
        assert_eq!(hsv_to_rgb(99, 255, 0), [0, 0, 0]);
    }

    #[test]
    fn rgb_buffer_is_interleaved_per_pixel() {
        let rgb = test_image().to_rgb();
        assert_eq!(rgb.len(), 18);
        // First pixel is the background triple.
        assert_eq!(&rgb[0..3], &[0, 0, 0]);
        // Second pixel keeps full value.
        assert_eq!(rgb[3..6].iter().max(), Some(&255));
    }

    #[test]
    fn png_round_trips_through_the_decoder() {
        let bytes = test_image().encode_png().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
    }
}
