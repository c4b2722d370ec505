//! Draw commands returned to the host paint cycle.

use crate::capture::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque RGB color.
///
/// Serialized as `#rrggbb` and accepts a few common names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// `#000000`
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// `#ffffff`
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// `#ff0000`
    pub const RED: Color = Color::rgb(255, 0, 0);
    /// `#00ff00`
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    /// `#0000ff`
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    /// `#ffff00`
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    /// `#808080`
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    /// Creates a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::RED,
            "green" => Self::GREEN,
            "blue" => Self::BLUE,
            "yellow" => Self::YELLOW,
            "gray" | "grey" => Self::GRAY,
            _ => return None,
        };
        Some(color)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim().to_ascii_lowercase();
        if let Some(color) = Self::named(&trimmed) {
            return Ok(color);
        }
        let hex = trimmed
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| format!("unrecognized color {value:?}"))?;
        // Only ASCII hex digits remain, so byte slicing stays on char boundaries
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex color {value:?}"))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Integer rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width, may be zero.
    pub width: i32,
    /// Height, may be zero.
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle from its origin and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// One past the right-most column.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Returns true if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// One primitive for the host to execute against its surface.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Solid rectangle.
    FillRect {
        /// Area to fill.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Frame scaled into a destination rectangle.
    Image {
        /// Frame to draw.
        frame: Arc<Frame>,
        /// Scaled destination.
        dest: Rect,
    },
    /// Line segment between two points.
    Line {
        /// Start column.
        x1: i32,
        /// Start row.
        y1: i32,
        /// End column.
        x2: i32,
        /// End row.
        y2: i32,
        /// Stroke color.
        color: Color,
    },
}

/// Ordered list of draw commands; later commands paint over earlier ones.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filled rectangle; empty rectangles are skipped.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if !rect.is_empty() {
            self.commands.push(DrawCommand::FillRect { rect, color });
        }
    }

    /// Appends a frame drawn into `dest`.
    pub fn image(&mut self, frame: Arc<Frame>, dest: Rect) {
        self.commands.push(DrawCommand::Image { frame, dest });
    }

    /// Appends a line segment.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) {
        self.commands.push(DrawCommand::Line {
            x1,
            y1,
            x2,
            y2,
            color,
        });
    }

    /// Commands in paint order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is drawn.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterates over the line commands only.
    pub fn lines(&self) -> impl Iterator<Item = (i32, i32, i32, i32, Color)> + '_ {
        self.commands.iter().filter_map(|c| match *c {
            DrawCommand::Line {
                x1,
                y1,
                x2,
                y2,
                color,
            } => Some((x1, y1, x2, y2, color)),
            _ => None,
        })
    }

    /// Destination of the image command, if any.
    pub fn image_dest(&self) -> Option<Rect> {
        self.commands.iter().find_map(|c| match c {
            DrawCommand::Image { dest, .. } => Some(*dest),
            _ => None,
        })
    }

    /// Consumes the list, returning its commands.
    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }
}
