//! Physical length units and per-axis camera calibration.
//!
//! A camera is calibrated by how much physical distance one source pixel
//! covers on each axis. Reticles are specified in their own unit and
//! converted into the camera's unit before being turned into pixels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of physical length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Millimeters.
    Millimeters,
    /// Centimeters.
    Centimeters,
    /// Meters.
    Meters,
    /// Inches.
    Inches,
    /// Feet.
    Feet,
    /// Thousandths of an inch.
    Mils,
}

impl LengthUnit {
    /// Number of millimeters in one of this unit.
    pub fn millimeters(self) -> f64 {
        match self {
            LengthUnit::Millimeters => 1.0,
            LengthUnit::Centimeters => 10.0,
            LengthUnit::Meters => 1000.0,
            LengthUnit::Inches => 25.4,
            LengthUnit::Feet => 304.8,
            LengthUnit::Mils => 0.0254,
        }
    }

    /// Converts `value` expressed in `self` into `target` units.
    pub fn convert(self, value: f64, target: LengthUnit) -> f64 {
        if self == target {
            return value;
        }
        value * self.millimeters() / target.millimeters()
    }

    /// Short symbol used in logs and labels.
    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "mm",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Meters => "m",
            LengthUnit::Inches => "in",
            LengthUnit::Feet => "ft",
            LengthUnit::Mils => "mil",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Physical distance covered by one pixel, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitsPerPixel {
    /// Horizontal scale.
    pub x: f64,
    /// Vertical scale.
    pub y: f64,
    /// Unit both axes are expressed in.
    pub units: LengthUnit,
}

impl Default for UnitsPerPixel {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            units: LengthUnit::Millimeters,
        }
    }
}

impl UnitsPerPixel {
    /// Creates a calibration without validating it.
    pub fn new(x: f64, y: f64, units: LengthUnit) -> Self {
        Self { x, y, units }
    }

    /// Both axes must be strictly positive and finite.
    pub fn validate(&self) -> Result<(), InvalidScale> {
        if !(self.x.is_finite() && self.x > 0.0) {
            return Err(InvalidScale::Axis { axis: 'x', value: self.x });
        }
        if !(self.y.is_finite() && self.y > 0.0) {
            return Err(InvalidScale::Axis { axis: 'y', value: self.y });
        }
        Ok(())
    }

    /// Returns the scale multiplied per axis, e.g. after resampling the image.
    pub fn scaled(&self, ratio_x: f64, ratio_y: f64) -> Self {
        Self {
            x: self.x * ratio_x,
            y: self.y * ratio_y,
            units: self.units,
        }
    }
}

/// Rejected calibration value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidScale {
    #[error("units per pixel on {axis} axis must be positive and finite, got {value}")]
    Axis {
        /// `'x'` or `'y'`.
        axis: char,
        /// The rejected value.
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_inches_to_mm() {
        let mm = LengthUnit::Inches.convert(1.0, LengthUnit::Millimeters);
        assert!((mm - 25.4).abs() < 1e-12);
    }

    #[test]
    fn test_convert_identity() {
        assert_eq!(LengthUnit::Mils.convert(3.5, LengthUnit::Mils), 3.5);
    }

    #[test]
    fn test_convert_mm_to_mils() {
        let mils = LengthUnit::Millimeters.convert(0.0254, LengthUnit::Mils);
        assert!((mils - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_zero_and_nan() {
        assert!(UnitsPerPixel::new(0.1, 0.1, LengthUnit::Millimeters)
            .validate()
            .is_ok());
        assert!(matches!(
            UnitsPerPixel::new(0.0, 0.1, LengthUnit::Millimeters).validate(),
            Err(InvalidScale::Axis { axis: 'x', .. })
        ));
        assert!(matches!(
            UnitsPerPixel::new(0.1, f64::NAN, LengthUnit::Millimeters).validate(),
            Err(InvalidScale::Axis { axis: 'y', .. })
        ));
    }

    #[test]
    fn test_unit_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            unit: LengthUnit,
        }
        let w: Wrapper = toml::from_str("unit = \"inches\"").unwrap();
        assert_eq!(w.unit, LengthUnit::Inches);
    }
}
