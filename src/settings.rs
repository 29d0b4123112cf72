//! Typed configuration for a view.

use crate::colour::Palette;
use crate::error::Error;

/// Everything a render derives from. Validated up front, never mutated
/// mid-render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewSettings {
    pub center: (f64, f64),
    pub magnification: f64,
    pub pixels_per_side: u32,
    pub max_iterations: u32,
    pub palette: Palette,
    pub aspect_ratio: f64,
    pub reversed_x: bool,
    pub reversed_y: bool,
    pub swap_axes: bool,
}

impl Default for ViewSettings {
    /// Startup view: the classic full-set framing.
    fn default() -> Self {
        ViewSettings {
            center: (-0.75, 0.0),
            magnification: 0.8,
            pixels_per_side: 1024,
            max_iterations: 1024,
            palette: Palette::default(),
            aspect_ratio: 1.0,
            reversed_x: false,
            reversed_y: false,
            swap_axes: false,
        }
    }
}

impl ViewSettings {
    /// Reject bad parameters before any device work is dispatched.
    ///
    /// Non-positive magnification is deliberately not an error; it renders
    /// as magnification 1.
    pub fn validate(&self) -> Result<(), Error> {
        if self.pixels_per_side == 0 {
            return Err(invalid("pixels_per_side", self.pixels_per_side));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", self.max_iterations));
        }
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(invalid("aspect_ratio", self.aspect_ratio));
        }
        if !self.center.0.is_finite() || !self.center.1.is_finite() {
            return Err(Error::InvalidParameter {
                name: "center",
                value: format!("({}, {})", self.center.0, self.center.1),
            });
        }
        if !self.magnification.is_finite() {
            return Err(invalid("magnification", self.magnification));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: impl std::fmt::Display) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettingsUpdate {
    pub center: Option<(f64, f64)>,
    pub magnification: Option<f64>,
    pub pixels_per_side: Option<u32>,
    pub max_iterations: Option<u32>,
    pub palette: Option<Palette>,
    pub aspect_ratio: Option<f64>,
    pub reversed_x: Option<bool>,
    pub reversed_y: Option<bool>,
    pub swap_axes: Option<bool>,
}

impl SettingsUpdate {
    pub fn applied_to(&self, settings: &ViewSettings) -> ViewSettings {
        let mut next = *settings;
        if let Some(center) = self.center {
            next.center = center;
        }
        if let Some(magnification) = self.magnification {
            next.magnification = magnification;
        }
        if let Some(pixels_per_side) = self.pixels_per_side {
            next.pixels_per_side = pixels_per_side;
        }
        if let Some(max_iterations) = self.max_iterations {
            next.max_iterations = max_iterations;
        }
        if let Some(palette) = self.palette {
            next.palette = palette;
        }
        if let Some(aspect_ratio) = self.aspect_ratio {
            next.aspect_ratio = aspect_ratio;
        }
        if let Some(reversed_x) = self.reversed_x {
            next.reversed_x = reversed_x;
        }
        if let Some(reversed_y) = self.reversed_y {
            next.reversed_y = reversed_y;
        }
        if let Some(swap_axes) = self.swap_axes {
            next.swap_axes = swap_axes;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ViewSettings::default().validate().unwrap();
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        let mut settings = ViewSettings::default();
        settings.pixels_per_side = 0;
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidParameter { name: "pixels_per_side", .. })
        ));

        let mut settings = ViewSettings::default();
        settings.max_iterations = 0;
        assert!(settings.validate().is_err());

        let mut settings = ViewSettings::default();
        settings.aspect_ratio = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = ViewSettings::default();
        settings.aspect_ratio = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn non_positive_magnification_is_allowed() {
        let mut settings = ViewSettings::default();
        settings.magnification = 0.0;
        settings.validate().unwrap();
        settings.magnification = -2.0;
        settings.validate().unwrap();
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut settings = ViewSettings::default();
        settings.center = (f64::NAN, 0.0);
        assert!(settings.validate().is_err());

        let mut settings = ViewSettings::default();
        settings.magnification = f64::INFINITY;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn update_touches_only_supplied_fields() {
        let base = ViewSettings::default();
        let update = SettingsUpdate {
            magnification: Some(4.0),
            reversed_x: Some(true),
            ..SettingsUpdate::default()
        };
        let next = update.applied_to(&base);
        assert_eq!(next.magnification, 4.0);
        assert!(next.reversed_x);
        assert_eq!(next.center, base.center);
        assert_eq!(next.pixels_per_side, base.pixels_per_side);
        assert_eq!(next.palette, base.palette);

        let unchanged = SettingsUpdate::default().applied_to(&base);
        assert_eq!(unchanged, base);
    }
}
