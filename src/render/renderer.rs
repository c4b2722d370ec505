//! Turns the latest frame into draw commands for a viewport.

use super::geometry::{place, Viewport};
use super::{Color, DrawList};
use crate::capture::{Frame, ViewConfig};
use crate::reticle::Reticle;
use crate::units::UnitsPerPixel;
use std::sync::Arc;

/// Visual settings of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    /// Fill of the drawable area behind the image.
    pub background: Color,
    /// Draw a diagonal cross over the drawable area when no frame exists.
    pub cross_missing_frame: bool,
    /// Color of that cross.
    pub cross_color: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            cross_missing_frame: false,
            cross_color: Color::GRAY,
        }
    }
}

impl From<&ViewConfig> for RenderStyle {
    fn from(config: &ViewConfig) -> Self {
        Self {
            background: config.background,
            cross_missing_frame: config.cross_missing_frame,
            ..Default::default()
        }
    }
}

/// Scales and centers a frame into a viewport and overlays a reticle.
///
/// Rendering is a pure function of its arguments and the style; nothing
/// is cached between calls. Rotation of the source frame is not handled.
#[derive(Debug, Clone, Default)]
pub struct DisplayRenderer {
    style: RenderStyle,
}

impl DisplayRenderer {
    /// Creates a renderer with the given style.
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    /// Current style.
    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Renders `frame` into `viewport`.
    ///
    /// Without a frame only the placeholder (background, optionally a
    /// cross) is produced. The reticle receives the center of the drawable
    /// area, the scaled image size and the per-axis physical size of one
    /// rendered pixel.
    pub fn render(
        &self,
        viewport: &Viewport,
        frame: Option<&Arc<Frame>>,
        units_per_pixel: &UnitsPerPixel,
        reticle: Option<&dyn Reticle>,
    ) -> DrawList {
        let mut list = DrawList::new();
        let area = viewport.drawable();
        if area.is_empty() {
            return list;
        }
        list.fill_rect(area, self.style.background);

        let Some(frame) = frame else {
            if self.style.cross_missing_frame {
                let color = self.style.cross_color;
                list.line(area.x, area.y, area.right() - 1, area.bottom() - 1, color);
                list.line(area.x, area.bottom() - 1, area.right() - 1, area.y, color);
            }
            return list;
        };

        let Some(placement) = place(viewport, frame.width(), frame.height(), units_per_pixel)
        else {
            tracing::trace!(?viewport, "Viewport too small to show frame");
            return list;
        };

        list.image(Arc::clone(frame), placement.image);

        if let Some(reticle) = reticle {
            reticle.draw(
                &mut list,
                units_per_pixel.units,
                placement.effective.x,
                placement.effective.y,
                placement.center_x,
                placement.center_y,
                placement.image.width,
                placement.image.height,
            );
        }
        list
    }
}
