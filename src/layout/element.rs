//! Element geometry: from cell-relative coordinates to page pixels.

use super::Rect;
use crate::model::{Coord, ElementGeometry};

impl Coord {
    /// Resolve against the cell extent on the same axis.
    pub fn resolve(&self, extent: f64) -> f64 {
        match *self {
            Coord::Absolute(px) => px,
            Coord::Fraction(f) => f * extent,
        }
    }
}

/// Page-relative rectangle of an element placed in `cell`. Negative sizes
/// collapse to zero.
pub fn resolve_element_rect(geometry: &ElementGeometry, cell: &Rect) -> Rect {
    Rect::new(
        cell.x + geometry.x.resolve(cell.width),
        cell.y + geometry.y.resolve(cell.height),
        geometry.width.resolve(cell.width).max(0.0),
        geometry.height.resolve(cell.height).max(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fractional(x: f64, y: f64, w: f64, h: f64) -> ElementGeometry {
        ElementGeometry {
            x: Coord::Fraction(x),
            y: Coord::Fraction(y),
            width: Coord::Fraction(w),
            height: Coord::Fraction(h),
        }
    }

    #[test]
    fn test_fractions_of_cell() {
        let cell = Rect::new(100.0, 50.0, 400.0, 200.0);
        let rect = resolve_element_rect(&fractional(0.25, 0.5, 0.5, 0.25), &cell);
        assert_eq!(rect, Rect::new(200.0, 150.0, 200.0, 50.0));
    }

    #[test]
    fn test_absolute_is_cell_relative() {
        let cell = Rect::new(100.0, 50.0, 400.0, 200.0);
        let geometry = ElementGeometry {
            x: Coord::Absolute(20.0),
            y: Coord::Absolute(30.0),
            width: Coord::Absolute(150.0),
            height: Coord::Fraction(1.0),
        };
        let rect = resolve_element_rect(&geometry, &cell);
        assert_eq!(rect, Rect::new(120.0, 80.0, 150.0, 200.0));
    }

    #[rstest]
    #[case(0.5, 0.5)]
    #[case(1.0, 0.1)]
    #[case(0.0, 0.75)]
    fn test_fractional_size_scales_linearly(#[case] fw: f64, #[case] fh: f64) {
        let geometry = fractional(0.1, 0.2, fw, fh);
        let small = resolve_element_rect(&geometry, &Rect::new(0.0, 0.0, 300.0, 200.0));
        let large = resolve_element_rect(&geometry, &Rect::new(0.0, 0.0, 600.0, 200.0));
        assert_eq!(large.width, small.width * 2.0);
        assert_eq!(large.height, small.height);
    }

    #[test]
    fn test_negative_size_collapses() {
        let geometry = ElementGeometry {
            width: Coord::Absolute(-20.0),
            ..ElementGeometry::default()
        };
        let rect = resolve_element_rect(&geometry, &Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 100.0);
    }
}
