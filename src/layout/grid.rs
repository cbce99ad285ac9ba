//! # Grid Layout
//!
//! Resolves a page's cell rectangles from its grid template. Tracks are
//! uniform: every column has the same width and every row the same height.
//! Cells are placed in declaration order with greedy first-fit auto-placement:
//! - scan positions row-major (top to bottom, left to right)
//! - take the first position where the whole span block is free
//! - never backtrack
//!
//! A cell that finds no free block overflows. It gets the fallback rect
//! `{0, 0, col_width, row_height}` and the caller records a warning.
//!
//! Padding and gaps too large for the canvas are shrunk first, so every
//! rect stays on the canvas whatever the template says.

use super::catalog::{CellSpan, Layout};
use super::Rect;

/// Where a declared cell landed in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPlacement {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

/// Cell rectangles for one layout on one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRects {
    /// One rect per declared cell, in declaration order.
    pub rects: Vec<Rect>,
    /// Indices of cells that received the overflow fallback.
    pub overflowed: Vec<usize>,
    /// The fallback rect itself.
    pub fallback: Rect,
}

/// Size of one uniform track: `(extent - 2*padding - gap*(count-1)) / count`.
pub fn track_size(extent: f64, padding: f64, gap: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let gaps = gap * (count - 1) as f64;
    ((extent - padding * 2.0 - gaps) / count as f64).max(0.0)
}

/// Offset of track `index` from the canvas edge.
pub fn track_offset(index: usize, track: f64, gap: f64, padding: f64) -> f64 {
    padding + index as f64 * (track + gap)
}

/// Extent of `span` consecutive tracks including the gaps between them.
pub fn span_extent(span: usize, track: f64, gap: f64) -> f64 {
    if span == 0 {
        return 0.0;
    }
    track * span as f64 + gap * (span - 1) as f64
}

/// Padding and gap used on one axis. Padding never exceeds half the extent
/// and the gaps never push the last track past the far edge.
pub fn fit_spacing(extent: f64, padding: f64, gap: f64, count: usize) -> (f64, f64) {
    let extent = extent.max(0.0);
    let padding = padding.max(0.0).min(extent / 2.0);
    let gap = gap.max(0.0);
    let gap = if count > 1 {
        gap.min((extent - 2.0 * padding) / (count - 1) as f64)
    } else {
        gap
    };
    (padding, gap)
}

/// Greedy first-fit placement. `None` marks an overflowing cell.
pub fn place_cells(columns: usize, rows: usize, cells: &[CellSpan]) -> Vec<Option<GridPlacement>> {
    let mut occupied = vec![vec![false; columns]; rows];

    cells
        .iter()
        .map(|span| {
            let col_span = span.col_span.max(1);
            let row_span = span.row_span.max(1);
            if col_span > columns || row_span > rows {
                return None;
            }
            for row in 0..=(rows - row_span) {
                for col in 0..=(columns - col_span) {
                    let free = (row..row + row_span)
                        .all(|r| (col..col + col_span).all(|c| !occupied[r][c]));
                    if free {
                        for r in row..row + row_span {
                            for c in col..col + col_span {
                                occupied[r][c] = true;
                            }
                        }
                        return Some(GridPlacement {
                            row,
                            col,
                            row_span,
                            col_span,
                        });
                    }
                }
            }
            None
        })
        .collect()
}

/// Resolve every declared cell of `layout` to a canvas rectangle.
pub fn resolve_cell_rects(layout: &Layout, width: f64, height: f64) -> CellRects {
    let columns = layout.columns.max(1);
    let rows = layout.rows.max(1);
    let (pad_x, gap_x) = fit_spacing(width, layout.padding, layout.gap, columns);
    let (pad_y, gap_y) = fit_spacing(height, layout.padding, layout.gap, rows);
    let col_width = track_size(width, pad_x, gap_x, columns);
    let row_height = track_size(height, pad_y, gap_y, rows);
    let fallback = Rect::new(0.0, 0.0, col_width, row_height);

    let mut overflowed = Vec::new();
    let rects = place_cells(columns, rows, &layout.cells)
        .into_iter()
        .enumerate()
        .map(|(i, placement)| match placement {
            Some(p) => Rect::new(
                track_offset(p.col, col_width, gap_x, pad_x),
                track_offset(p.row, row_height, gap_y, pad_y),
                span_extent(p.col_span, col_width, gap_x),
                span_extent(p.row_span, row_height, gap_y),
            ),
            None => {
                overflowed.push(i);
                fallback
            }
        })
        .collect();

    CellRects {
        rects,
        overflowed,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::catalog::LayoutCatalog;
    use rstest::rstest;

    #[test]
    fn test_single_cell_fills_canvas() {
        let layout = Layout::single();
        let out = resolve_cell_rects(&layout, 800.0, 600.0);
        assert_eq!(out.rects, vec![Rect::new(0.0, 0.0, 800.0, 600.0)]);
        assert!(out.overflowed.is_empty());
    }

    #[test]
    fn test_track_size_with_gap_and_padding() {
        // (800 - 2*20 - 10) / 2
        assert_eq!(track_size(800.0, 20.0, 10.0, 2), 375.0);
        assert_eq!(track_size(100.0, 60.0, 0.0, 1), 0.0);
    }

    #[test]
    fn test_span_extent_includes_inner_gaps() {
        assert_eq!(span_extent(1, 100.0, 10.0), 100.0);
        assert_eq!(span_extent(3, 100.0, 10.0), 320.0);
    }

    #[test]
    fn test_two_by_two_with_full_width_first_cell_overflows() {
        let layout = Layout::new(
            "t",
            "t",
            2,
            2,
            0.0,
            0.0,
            vec![
                CellSpan::new(2, 1),
                CellSpan::unit(),
                CellSpan::unit(),
                CellSpan::unit(),
            ],
        );
        let out = resolve_cell_rects(&layout, 800.0, 600.0);
        assert_eq!(out.rects[0], Rect::new(0.0, 0.0, 800.0, 300.0));
        assert_eq!(out.rects[1], Rect::new(0.0, 300.0, 400.0, 300.0));
        assert_eq!(out.rects[2], Rect::new(400.0, 300.0, 400.0, 300.0));
        assert_eq!(out.rects[3], Rect::new(0.0, 0.0, 400.0, 300.0));
        assert_eq!(out.overflowed, vec![3]);
        assert_eq!(out.fallback, out.rects[3]);
    }

    #[test]
    fn test_first_fit_fills_holes_left_by_tall_cell() {
        let placements = place_cells(
            2,
            2,
            &[CellSpan::new(1, 2), CellSpan::unit(), CellSpan::unit()],
        );
        assert_eq!(placements[0].unwrap().col, 0);
        assert_eq!((placements[1].unwrap().row, placements[1].unwrap().col), (0, 1));
        assert_eq!((placements[2].unwrap().row, placements[2].unwrap().col), (1, 1));
    }

    #[test]
    fn test_span_larger_than_grid_overflows() {
        let placements = place_cells(2, 1, &[CellSpan::new(3, 1), CellSpan::unit()]);
        assert_eq!(placements[0], None);
        assert_eq!(
            placements[1],
            Some(GridPlacement {
                row: 0,
                col: 0,
                row_span: 1,
                col_span: 1
            })
        );
    }

    #[test]
    fn test_zero_span_treated_as_one() {
        let placements = place_cells(1, 1, &[CellSpan::new(0, 0)]);
        assert_eq!(placements[0].unwrap().col_span, 1);
    }

    #[test]
    fn test_oversized_spacing_is_fitted() {
        assert_eq!(fit_spacing(100.0, 80.0, 10.0, 2), (50.0, 0.0));
        assert_eq!(fit_spacing(100.0, 20.0, 500.0, 3), (20.0, 30.0));
        assert_eq!(fit_spacing(100.0, 20.0, 500.0, 1), (20.0, 500.0));
        assert_eq!(fit_spacing(800.0, 20.0, 10.0, 2), (20.0, 10.0));
    }

    #[rstest]
    #[case::spans_to_last_track(
        r#"{"id": "banner", "columns": 3, "rows": 3, "gap": 8, "padding": 16,
            "cells": [{"colSpan": 3}, {"rowSpan": 2}, {"colSpan": 2, "rowSpan": 2}]}"#,
        900.0,
        600.0,
        0
    )]
    #[case::span_past_the_grid(
        r#"{"id": "tall", "columns": 2, "rows": 3, "gap": 10, "padding": 5,
            "cells": [{"rowSpan": 3}, {"rowSpan": 2}, {}, {"colSpan": 3}]}"#,
        400.0,
        900.0,
        1
    )]
    #[case::gap_wider_than_canvas(
        r#"{"id": "crowded", "columns": 3, "rows": 2, "gap": 500, "padding": 20,
            "cells": [{"colSpan": 2}, {"rowSpan": 2}, {}, {}]}"#,
        300.0,
        200.0,
        0
    )]
    #[case::padding_wider_than_canvas(
        r#"{"id": "boxed", "columns": 2, "rows": 2, "gap": 4, "padding": 400,
            "cells": [{"colSpan": 2, "rowSpan": 2}]}"#,
        300.0,
        200.0,
        0
    )]
    fn test_custom_span_layouts_stay_on_canvas(
        #[case] json: &str,
        #[case] w: f64,
        #[case] h: f64,
        #[case] overflows: usize,
    ) {
        let mut catalog = LayoutCatalog::builtin();
        catalog.extend_from_json(&format!("[{}]", json)).unwrap();
        let id = serde_json::from_str::<serde_json::Value>(json).unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();
        let layout = catalog.get(&id).unwrap();
        let out = resolve_cell_rects(layout, w, h);

        assert_eq!(out.rects.len(), layout.cell_count());
        assert_eq!(out.overflowed.len(), overflows);
        let canvas = Rect::new(0.0, 0.0, w, h);
        let (pad_x, _) = fit_spacing(w, layout.padding, layout.gap, layout.columns);
        let (pad_y, _) = fit_spacing(h, layout.padding, layout.gap, layout.rows);
        let inner = Rect::new(pad_x, pad_y, w - 2.0 * pad_x, h - 2.0 * pad_y);
        for rect in &out.rects {
            assert!(canvas.contains(rect), "{:?} outside the canvas", rect);
        }
        let placed: Vec<&Rect> = out
            .rects
            .iter()
            .enumerate()
            .filter(|(i, _)| !out.overflowed.contains(i))
            .map(|(_, r)| r)
            .collect();
        for (i, a) in placed.iter().enumerate() {
            assert!(inner.contains(a), "{:?} outside {:?}", a, inner);
            for b in &placed[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[rstest]
    #[case("single", 800.0, 600.0)]
    #[case("two-columns", 800.0, 600.0)]
    #[case("two-rows", 1120.0, 840.0)]
    #[case("three-columns", 900.0, 900.0)]
    #[case("three-rows", 600.0, 400.0)]
    #[case("grid-2x2", 800.0, 800.0)]
    #[case("hero-top", 840.0, 1120.0)]
    #[case("hero-left", 1120.0, 840.0)]
    #[case("grid-3x3", 900.0, 900.0)]
    #[case("mosaic", 900.0, 600.0)]
    fn test_builtin_layouts_fit_canvas(#[case] id: &str, #[case] w: f64, #[case] h: f64) {
        let catalog = LayoutCatalog::builtin();
        let layout = catalog.get(id).unwrap();
        let out = resolve_cell_rects(layout, w, h);

        assert_eq!(out.rects.len(), layout.cell_count());
        assert!(out.overflowed.is_empty());
        let inner = Rect::new(
            layout.padding,
            layout.padding,
            w - 2.0 * layout.padding,
            h - 2.0 * layout.padding,
        );
        for rect in &out.rects {
            assert!(rect.width > 0.0 && rect.height > 0.0);
            assert!(inner.contains(rect), "{:?} outside {:?}", rect, inner);
        }
        for (i, a) in out.rects.iter().enumerate() {
            for b in &out.rects[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }
}
