use super::Reticle;
use crate::render::{Color, DrawList};
use crate::units::LengthUnit;

/// Two lines through the center spanning the scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrosshairReticle {
    color: Color,
}

impl CrosshairReticle {
    /// Creates a crosshair drawn in `color`.
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Reticle for CrosshairReticle {
    fn draw(
        &self,
        surface: &mut DrawList,
        _units: LengthUnit,
        _scale_x: f64,
        _scale_y: f64,
        center_x: i32,
        center_y: i32,
        width: i32,
        height: i32,
    ) {
        let (half_w, half_h) = (width / 2, height / 2);
        surface.line(center_x - half_w, center_y, center_x + half_w, center_y, self.color);
        surface.line(center_x, center_y - half_h, center_x, center_y + half_h, self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_two_lines() {
        let mut list = DrawList::new();
        CrosshairReticle::new(Color::GREEN).draw(
            &mut list,
            LengthUnit::Millimeters,
            1.0,
            1.0,
            50,
            40,
            60,
            30,
        );
        let lines: Vec<_> = list.lines().collect();
        assert_eq!(
            lines,
            vec![
                (20, 40, 80, 40, Color::GREEN),
                (50, 25, 50, 55, Color::GREEN),
            ]
        );
    }
}
