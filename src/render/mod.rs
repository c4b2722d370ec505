//! Display rendering of the latest frame.
//!
//! Rendering produces a [`DrawList`] that the host executes against its
//! own surface during its paint cycle. Scaling keeps the frame's aspect
//! ratio and centers it in the viewport's drawable area.

mod command;
mod geometry;
mod renderer;

pub use command::{Color, DrawCommand, DrawList, Rect};
pub use geometry::{fit, place, Insets, Placement, ScaledSize, Viewport};
pub use renderer::{DisplayRenderer, RenderStyle};
