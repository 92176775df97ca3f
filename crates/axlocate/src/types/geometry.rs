/*! Geometry types for screen coordinates. */

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Element frame in screen coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS, Default)]
#[ts(export)]
pub struct Frame {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Frame {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// Check if two frames match within a margin of error on every component.
  pub fn matches(&self, other: &Frame, margin: f64) -> bool {
    (self.x - other.x).abs() <= margin
      && (self.y - other.y).abs() <= margin
      && (self.width - other.width).abs() <= margin
      && (self.height - other.height).abs() <= margin
  }

  /// Rounded integer components with non-finite values mapped to zero.
  ///
  /// Providers report infinite frames for offscreen or collapsed elements;
  /// documents only ever carry these normalized values.
  #[allow(clippy::cast_possible_truncation)] // Intentional: screen coordinates fit i64
  pub fn normalized(&self) -> [i64; 4] {
    let norm = |v: f64| if v.is_finite() { v.round() as i64 } else { 0 };
    [
      norm(self.x),
      norm(self.y),
      norm(self.width),
      norm(self.height),
    ]
  }
}
