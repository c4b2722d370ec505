//! Aspect-preserving scaling and centering of a frame into a viewport.
//!
//! All results are integer pixels. Scaled sizes are truncated and the
//! centering offset uses integer division, so the border on one side may
//! be one pixel wider than on the other. That asymmetry is part of the
//! rendered output and is kept as is.

use super::Rect;
use crate::units::UnitsPerPixel;

/// Margins between the viewport edge and its drawable area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Insets {
    /// Left margin.
    pub left: i32,
    /// Top margin.
    pub top: i32,
    /// Right margin.
    pub right: i32,
    /// Bottom margin.
    pub bottom: i32,
}

impl Insets {
    /// Creates insets from each margin.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same margin on every side.
    pub const fn uniform(margin: i32) -> Self {
        Self::new(margin, margin, margin, margin)
    }
}

/// Display surface a frame is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Total width in pixels.
    pub width: i32,
    /// Total height in pixels.
    pub height: i32,
    /// Margins around the drawable area.
    pub insets: Insets,
}

impl Viewport {
    /// Creates a viewport without insets.
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            insets: Insets::new(0, 0, 0, 0),
        }
    }

    /// Replaces the insets.
    pub const fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    /// The area inside the insets. May be empty.
    pub fn drawable(&self) -> Rect {
        Rect::new(
            self.insets.left,
            self.insets.top,
            self.width - self.insets.left - self.insets.right,
            self.height - self.insets.top - self.insets.bottom,
        )
    }
}

/// Size of the frame after scaling into the drawable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledSize {
    /// Scaled width in pixels.
    pub width: i32,
    /// Scaled height in pixels.
    pub height: i32,
}

/// Scales a `src_w` x `src_h` frame to the largest size that fits in
/// `dest_w` x `dest_h` while keeping its aspect ratio.
///
/// The axis with the larger source/destination ratio is fitted exactly and
/// the other axis is derived from the aspect ratio and truncated.
pub fn fit(dest_w: i32, dest_h: i32, src_w: u32, src_h: u32) -> ScaledSize {
    let (dest_w_f, dest_h_f) = (f64::from(dest_w), f64::from(dest_h));
    let (src_w_f, src_h_f) = (f64::from(src_w), f64::from(src_h));

    let height_ratio = src_h_f / dest_h_f;
    let width_ratio = src_w_f / dest_w_f;

    if height_ratio > width_ratio {
        let height = dest_h;
        let width = (f64::from(height) * (src_w_f / src_h_f)) as i32;
        ScaledSize { width, height }
    } else {
        let width = dest_w;
        let height = (f64::from(width) * (src_h_f / src_w_f)) as i32;
        ScaledSize { width, height }
    }
}

/// Where a frame lands in a viewport and how large its pixels are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Destination rectangle of the scaled image.
    pub image: Rect,
    /// Horizontal center of the drawable area, which the reticle is drawn around.
    pub center_x: i32,
    /// Vertical center of the drawable area.
    pub center_y: i32,
    /// Physical size of one rendered pixel, per axis.
    pub effective: UnitsPerPixel,
}

/// Computes the placement of a `src_w` x `src_h` frame in `viewport`.
///
/// Returns `None` when the drawable area is empty, the frame has no
/// pixels, or the scaled image would collapse to zero pixels on an axis.
pub fn place(
    viewport: &Viewport,
    src_w: u32,
    src_h: u32,
    units_per_pixel: &UnitsPerPixel,
) -> Option<Placement> {
    let area = viewport.drawable();
    if area.is_empty() || src_w == 0 || src_h == 0 {
        return None;
    }

    let scaled = fit(area.width, area.height, src_w, src_h);
    if scaled.width <= 0 || scaled.height <= 0 {
        return None;
    }

    let x = area.x + area.width / 2 - scaled.width / 2;
    let y = area.y + area.height / 2 - scaled.height / 2;

    let ratio_x = f64::from(src_w) / f64::from(scaled.width);
    let ratio_y = f64::from(src_h) / f64::from(scaled.height);

    Some(Placement {
        image: Rect::new(x, y, scaled.width, scaled.height),
        center_x: area.x + area.width / 2,
        center_y: area.y + area.height / 2,
        effective: units_per_pixel.scaled(ratio_x, ratio_y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::LengthUnit;
    use proptest::prelude::*;

    fn mm(x: f64, y: f64) -> UnitsPerPixel {
        UnitsPerPixel::new(x, y, LengthUnit::Millimeters)
    }

    #[test]
    fn test_wide_frame_fits_width() {
        // heightRatio 1.5 < widthRatio 2.0
        let p = place(&Viewport::new(800, 600), 1600, 900, &mm(1.0, 1.0)).unwrap();
        assert_eq!(p.image, Rect::new(0, 75, 800, 450));
        assert_eq!((p.center_x, p.center_y), (400, 300));
    }

    #[test]
    fn test_tall_frame_fits_height() {
        let p = place(&Viewport::new(800, 600), 600, 1200, &mm(1.0, 1.0)).unwrap();
        assert_eq!(p.image, Rect::new(250, 0, 300, 600));
    }

    #[test]
    fn test_effective_scale_doubles_when_halved() {
        let p = place(&Viewport::new(500, 400), 1000, 800, &mm(0.1, 0.1)).unwrap();
        assert_eq!(p.image.width, 500);
        assert_eq!(p.image.height, 400);
        assert!((p.effective.x - 0.2).abs() < 1e-12);
        assert!((p.effective.y - 0.2).abs() < 1e-12);
        assert_eq!(p.effective.units, LengthUnit::Millimeters);
    }

    #[test]
    fn test_anisotropic_scale_is_kept_per_axis() {
        let p = place(&Viewport::new(320, 240), 640, 480, &mm(0.01, 0.03)).unwrap();
        assert!((p.effective.x - 0.02).abs() < 1e-12);
        assert!((p.effective.y - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_insets_offset_placement() {
        let viewport = Viewport::new(820, 640).with_insets(Insets::new(10, 30, 10, 10));
        let p = place(&viewport, 1600, 900, &mm(1.0, 1.0)).unwrap();
        assert_eq!(p.image, Rect::new(10, 30 + 75, 800, 450));
        assert_eq!((p.center_x, p.center_y), (410, 330));
    }

    #[test]
    fn test_odd_border_is_asymmetric() {
        // 101 wide drawable, 51 wide image: left border 25, right border 25 + 1
        let p = place(&Viewport::new(101, 100), 51, 100, &mm(1.0, 1.0)).unwrap();
        assert_eq!(p.image.width, 51);
        assert_eq!(p.image.x, 25);
        assert_eq!(101 - p.image.right(), 25);

        let p = place(&Viewport::new(101, 100), 50, 100, &mm(1.0, 1.0)).unwrap();
        assert_eq!(p.image.x, 25);
        assert_eq!(101 - p.image.right(), 26);
    }

    #[test]
    fn test_degenerate_inputs() {
        let upp = mm(1.0, 1.0);
        assert!(place(&Viewport::new(0, 600), 640, 480, &upp).is_none());
        let squeezed = Viewport::new(100, 100).with_insets(Insets::uniform(60));
        assert!(place(&squeezed, 640, 480, &upp).is_none());
        assert!(place(&Viewport::new(100, 100), 0, 480, &upp).is_none());
        // 1 px tall viewport and a very tall frame collapses the width
        assert!(place(&Viewport::new(100, 1), 10, 1000, &upp).is_none());
    }

    proptest! {
        #[test]
        fn prop_scaled_fits_and_keeps_aspect(
            dest_w in 1i32..4000,
            dest_h in 1i32..4000,
            src_w in 1u32..8000,
            src_h in 1u32..8000,
        ) {
            let s = fit(dest_w, dest_h, src_w, src_h);
            prop_assert!(s.width <= dest_w);
            prop_assert!(s.height <= dest_h);
            prop_assert!(s.width == dest_w || s.height == dest_h);

            // Truncation of the derived axis loses less than one pixel
            let aspect = f64::from(src_w) / f64::from(src_h);
            let drift = (f64::from(s.width) - f64::from(s.height) * aspect).abs();
            prop_assert!(drift <= aspect.max(1.0) + 1e-9);
        }

        #[test]
        fn prop_centering_within_one_pixel(
            dest_w in 1i32..4000,
            dest_h in 1i32..4000,
            src_w in 1u32..8000,
            src_h in 1u32..8000,
            left in 0i32..50,
            top in 0i32..50,
        ) {
            let viewport = Viewport::new(dest_w + left, dest_h + top)
                .with_insets(Insets::new(left, top, 0, 0));
            if let Some(p) = place(&viewport, src_w, src_h, &mm(1.0, 1.0)) {
                let ideal_x = f64::from(dest_w - p.image.width) / 2.0;
                let ideal_y = f64::from(dest_h - p.image.height) / 2.0;
                prop_assert!((f64::from(p.image.x - left) - ideal_x).abs() <= 1.0);
                prop_assert!((f64::from(p.image.y - top) - ideal_y).abs() <= 1.0);
                prop_assert!(viewport.drawable().contains_rect(&p.image));
            }
        }
    }
}
