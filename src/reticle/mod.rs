//! Unit-calibrated overlays drawn on top of the rendered frame.
//!
//! Every overlay implements the single [`Reticle::draw`] operation. The
//! renderer supplies the per-axis physical size of one rendered pixel, so
//! marks placed at physical intervals line up with the scaled image.

mod crosshair;
mod unit_tick;

pub use crosshair::CrosshairReticle;
pub use unit_tick::UnitTickReticle;

use crate::capture::ConfigError;
use crate::render::{Color, DrawList};
use crate::units::LengthUnit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A drawing strategy for a measurement overlay.
pub trait Reticle: Send + Sync + fmt::Debug {
    /// Draws the overlay centered at (`center_x`, `center_y`) over an image
    /// of `width` x `height` rendered pixels.
    ///
    /// `scale_x` and `scale_y` are the physical size of one rendered pixel
    /// in `units`.
    #[allow(clippy::too_many_arguments)]
    fn draw(
        &self,
        surface: &mut DrawList,
        units: LengthUnit,
        scale_x: f64,
        scale_y: f64,
        center_x: i32,
        center_y: i32,
        width: i32,
        height: i32,
    );
}

/// Reticle variant and parameters as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReticleConfig {
    /// Center lines with ticks at a fixed physical spacing.
    UnitTick {
        /// Unit the spacing is given in.
        units: LengthUnit,
        /// Distance between ticks.
        spacing: f64,
        /// Stroke color.
        color: Color,
    },
    /// Plain center lines.
    Crosshair {
        /// Stroke color.
        color: Color,
    },
    /// No overlay.
    None,
}

impl Default for ReticleConfig {
    fn default() -> Self {
        ReticleConfig::UnitTick {
            units: LengthUnit::Millimeters,
            spacing: 1.0,
            color: Color::RED,
        }
    }
}

impl ReticleConfig {
    /// Checks the reticle parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ReticleConfig::UnitTick { spacing, .. } if !(spacing.is_finite() && *spacing > 0.0) => {
                Err(ConfigError::InvalidReticle(format!(
                    "tick spacing must be positive, got {spacing}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Builds the configured reticle, or `None` for no overlay.
    pub fn build(&self) -> Option<Box<dyn Reticle>> {
        match *self {
            ReticleConfig::UnitTick {
                units,
                spacing,
                color,
            } => Some(Box::new(UnitTickReticle::new(units, spacing, color))),
            ReticleConfig::Crosshair { color } => Some(Box::new(CrosshairReticle::new(color))),
            ReticleConfig::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_one_mm_red_ticks() {
        assert_eq!(
            ReticleConfig::default(),
            ReticleConfig::UnitTick {
                units: LengthUnit::Millimeters,
                spacing: 1.0,
                color: Color::RED,
            }
        );
    }

    #[test]
    fn test_build_variants() {
        assert!(ReticleConfig::default().build().is_some());
        assert!(ReticleConfig::Crosshair { color: Color::GREEN }.build().is_some());
        assert!(ReticleConfig::None.build().is_none());
    }

    #[test]
    fn test_zero_spacing_invalid() {
        let config = ReticleConfig::UnitTick {
            units: LengthUnit::Millimeters,
            spacing: 0.0,
            color: Color::RED,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidReticle(_))
        ));
    }

    #[test]
    fn test_none_variant_from_toml() {
        let config: ReticleConfig = toml::from_str("type = \"none\"").unwrap();
        assert_eq!(config, ReticleConfig::None);
    }
}
