//! Deterministic raster canvas backing the shared whiteboard.
//!
//! DESIGN
//! ======
//! The canvas is a flat `width * height` buffer of packed ARGB pixels.
//! Segments are stamped with pure integer math — a fixed-step walk along
//! the segment with a filled disc at each step — so replaying the same
//! events in the same order always produces the same pixels, regardless of
//! which client renders them. That property is what makes local apply and
//! remote replay interchangeable.
//!
//! A blank pixel is `0`. The eraser stamps blank rather than a background
//! color, so erased regions compare equal to a never-drawn canvas.

use crate::event::ToolKind;

/// Packed ARGB pixel. `0` means blank.
pub type Pixel = u32;

const OPAQUE: u32 = 0xFF00_0000;

/// Stamp radii above this are clamped. Bounds the per-step disc cost no
/// matter what width a peer publishes.
const MAX_STAMP_RADIUS: i64 = 100;

/// Parse a `#rrggbb` CSS color into an opaque packed pixel.
/// Returns `None` for anything that is not a 7-char hex color.
#[must_use]
pub fn parse_color(color: &str) -> Option<Pixel> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let rgb = u32::from_str_radix(hex, 16).ok()?;
    Some(OPAQUE | rgb)
}

/// Full-canvas snapshot used for undo/redo checkpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pixels: Vec<Pixel>,
}

/// The in-memory raster canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Raster {
    /// Create a blank canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; (width as usize) * (height as usize)] }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y as usize) * (self.width as usize) + (x as usize)])
    }

    /// True when every pixel is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    /// Blank the whole canvas.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Capture a full-canvas snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { pixels: self.pixels.clone() }
    }

    /// Restore a snapshot captured from a same-sized canvas.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        if snapshot.pixels.len() == self.pixels.len() {
            self.pixels.copy_from_slice(&snapshot.pixels);
        }
    }

    /// Stamp one stroke segment. Pen stamps the given color, eraser stamps
    /// blank. Endpoints are clamped to the canvas rectangle and the radius
    /// is capped, so the walk stays bounded by the canvas size regardless
    /// of the coordinates an event carries. Non-finite input is ignored.
    pub fn stamp_segment(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Pixel, width: f64, tool: ToolKind) {
        if self.pixels.is_empty() {
            return;
        }
        if ![x1, y1, x2, y2, width].into_iter().all(f64::is_finite) {
            return;
        }
        let value = match tool {
            ToolKind::Pen => color,
            ToolKind::Eraser => 0,
        };
        // Disc radius from stroke width; a width of 1 is a single pixel.
        let radius = (((width / 2.0).floor().max(0.0)) as i64).min(MAX_STAMP_RADIUS);

        let max_x = f64::from(self.width - 1);
        let max_y = f64::from(self.height - 1);
        let x1 = x1.clamp(0.0, max_x);
        let y1 = y1.clamp(0.0, max_y);
        let x2 = x2.clamp(0.0, max_x);
        let y2 = y2.clamp(0.0, max_y);

        let dx = x2 - x1;
        let dy = y2 - y1;
        let steps = dx.abs().max(dy.abs()).ceil() as i64;
        if steps == 0 {
            self.stamp_disc(x1.round() as i64, y1.round() as i64, radius, value);
            return;
        }
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let cx = (x1 + dx * t).round() as i64;
            let cy = (y1 + dy * t).round() as i64;
            self.stamp_disc(cx, cy, radius, value);
        }
    }

    fn stamp_disc(&mut self, cx: i64, cy: i64, radius: i64, value: Pixel) {
        for oy in -radius..=radius {
            for ox in -radius..=radius {
                if ox * ox + oy * oy > radius * radius {
                    continue;
                }
                let x = cx + ox;
                let y = cy + oy;
                if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
                    continue;
                }
                self.pixels[(y as usize) * (self.width as usize) + (x as usize)] = value;
            }
        }
    }
}

#[cfg(test)]
#[path = "raster_test.rs"]
mod tests;
