//! Page geometry and length units.
//!
//! Every length in the crate is expressed in PostScript points (1/72 inch).
//! Positions use a top-left origin with `y` growing downward, which keeps the
//! layout cursor arithmetic additive; sinks that target bottom-up coordinate
//! systems flip the axis themselves.

use crate::error::{Error, Result};

/// Points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

const MM_PER_INCH: f64 = 25.4;

/// Converts inches to points.
pub fn inch(value: f64) -> f64 {
    value * POINTS_PER_INCH
}

/// Converts millimetres to points.
pub fn mm(value: f64) -> f64 {
    value * POINTS_PER_INCH / MM_PER_INCH
}

/// Converts points to millimetres.
pub fn pt_to_mm(value: f64) -> f64 {
    value * MM_PER_INCH / POINTS_PER_INCH
}

/// A point on the page, measured from the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Horizontal offset from the left page edge.
    pub x: f64,
    /// Vertical offset from the top page edge.
    pub y: f64,
}

impl Position {
    /// Creates a new position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered extent of a placed block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Creates a new size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Page margins in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    /// Creates margins from explicit top, right, bottom and left values.
    pub fn trbl(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Uses the same margin on all four sides.
    pub fn uniform(value: f64) -> Self {
        Self::trbl(value, value, value, value)
    }

    /// Uses one value for top/bottom and another for left/right.
    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self::trbl(vertical, horizontal, vertical, horizontal)
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(inch(1.0))
    }
}

impl From<f64> for Margins {
    fn from(value: f64) -> Self {
        Self::uniform(value)
    }
}

/// Physical page size together with its margins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl PageGeometry {
    /// Creates a geometry with the given page size and default one-inch margins.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margins: Margins::default(),
        }
    }

    /// US Letter, 8.5 x 11 inches.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// ISO A4, 210 x 297 millimetres.
    pub fn a4() -> Self {
        Self::new(mm(210.0), mm(297.0))
    }

    /// Replaces the margins and returns the updated geometry.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = margins.into();
        self
    }

    /// Width available between the left and right margins.
    pub fn usable_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    /// Height available between the top and bottom margins.
    pub fn usable_height(&self) -> f64 {
        self.height - self.margins.top - self.margins.bottom
    }

    /// Offset of the first line of content from the top edge.
    pub fn content_top(&self) -> f64 {
        self.margins.top
    }

    /// Offset of the end of the usable area from the top edge.
    pub fn content_bottom(&self) -> f64 {
        self.height - self.margins.bottom
    }

    /// Rejects geometries that leave no room for content.
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.width,
            self.height,
            self.margins.top,
            self.margins.bottom,
            self.margins.left,
            self.margins.right,
        ];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(Error::InvalidGeometry(
                "page size and margins must be finite".to_owned(),
            ));
        }
        if values[2..].iter().any(|margin| *margin < 0.0) {
            return Err(Error::InvalidGeometry(
                "margins must not be negative".to_owned(),
            ));
        }
        if self.usable_width() <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "left and right margins ({} + {}) consume the page width {}",
                self.margins.left, self.margins.right, self.width
            )));
        }
        if self.usable_height() <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "top and bottom margins ({} + {}) consume the page height {}",
                self.margins.top, self.margins.bottom, self.height
            )));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::letter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_with_half_inch_margins() {
        let geometry = PageGeometry::letter().with_margins(Margins::symmetric(36.0, 72.0));
        assert_eq!(geometry.usable_height(), 720.0);
        assert_eq!(geometry.usable_width(), 468.0);
        assert_eq!(geometry.content_bottom(), 756.0);
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn margins_wider_than_page_are_rejected() {
        let geometry = PageGeometry::new(100.0, 100.0).with_margins(60.0);
        assert!(matches!(
            geometry.validate(),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn unit_conversions_agree() {
        assert_eq!(inch(0.5), 36.0);
        assert!((mm(25.4) - 72.0).abs() < 1e-9);
        assert!((pt_to_mm(72.0) - 25.4).abs() < 1e-9);
    }
}
