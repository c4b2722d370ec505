use super::Reticle;
use crate::render::{Color, DrawList};
use crate::units::LengthUnit;

/// Half-length of an ordinary tick, in rendered pixels.
const MINOR_TICK: i32 = 3;
/// Half-length of every tenth tick.
const MAJOR_TICK: i32 = 7;
/// Ticks closer than this many pixels are not drawn.
const MIN_TICK_SPACING: f64 = 2.0;

/// Crosshair with tick marks at a fixed physical spacing.
///
/// The spacing is given in the reticle's own unit and converted to the
/// camera's unit before being divided by the per-axis pixel scale, so the
/// ticks stay at true physical distances on non-square pixels too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitTickReticle {
    units: LengthUnit,
    spacing: f64,
    color: Color,
}

impl UnitTickReticle {
    /// Creates a reticle with a tick every `spacing` `units`.
    pub fn new(units: LengthUnit, spacing: f64, color: Color) -> Self {
        Self {
            units,
            spacing,
            color,
        }
    }

    /// Offsets from the center, in pixels, of the ticks along one half-axis.
    fn tick_offsets(step: f64, half_extent: i32) -> impl Iterator<Item = (u32, i32)> {
        let usable = step.is_finite() && step >= MIN_TICK_SPACING;
        let count = if usable {
            // Tolerate float noise from unit conversion at the image edge
            ((f64::from(half_extent) + 1e-6) / step).floor() as u32
        } else {
            0
        };
        (1..=count).map(move |i| (i, (f64::from(i) * step).round() as i32))
    }

    fn tick_length(index: u32) -> i32 {
        if index % 10 == 0 {
            MAJOR_TICK
        } else {
            MINOR_TICK
        }
    }
}

impl Reticle for UnitTickReticle {
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
    ) {
        let (half_w, half_h) = (width / 2, height / 2);
        let color = self.color;

        surface.line(center_x - half_w, center_y, center_x + half_w, center_y, color);
        surface.line(center_x, center_y - half_h, center_x, center_y + half_h, color);

        let spacing = self.units.convert(self.spacing, units);
        let step_x = spacing / scale_x;
        let step_y = spacing / scale_y;

        for (i, offset) in Self::tick_offsets(step_x, half_w) {
            let len = Self::tick_length(i);
            for x in [center_x - offset, center_x + offset] {
                surface.line(x, center_y - len, x, center_y + len, color);
            }
        }
        for (i, offset) in Self::tick_offsets(step_y, half_h) {
            let len = Self::tick_length(i);
            for y in [center_y - offset, center_y + offset] {
                surface.line(center_x - len, y, center_x + len, y, color);
            }
        }
    }
}
