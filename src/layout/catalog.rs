//! Static grid layout catalog.
//!
//! Layouts are reference data: a grid template (tracks, gap, padding) plus the
//! ordered list of cell spans the template declares. Pages point into the
//! catalog by id. An id the catalog does not know resolves to the full-bleed
//! `single` layout.

use serde::Deserialize;

use crate::error::Result;

/// Column/row span of one declared cell, in grid tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpan {
    #[serde(default = "one")]
    pub col_span: usize,
    #[serde(default = "one")]
    pub row_span: usize,
}

fn one() -> usize {
    1
}

impl Default for CellSpan {
    fn default() -> Self {
        Self::unit()
    }
}

impl CellSpan {
    pub const fn unit() -> Self {
        Self {
            col_span: 1,
            row_span: 1,
        }
    }

    pub const fn new(col_span: usize, row_span: usize) -> Self {
        Self { col_span, row_span }
    }
}

/// A grid template. Gap and padding are canvas pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub columns: usize,
    pub rows: usize,
    #[serde(default)]
    pub gap: f64,
    #[serde(default)]
    pub padding: f64,
    pub cells: Vec<CellSpan>,
}

impl Layout {
    pub fn new(
        id: &str,
        name: &str,
        columns: usize,
        rows: usize,
        gap: f64,
        padding: f64,
        cells: Vec<CellSpan>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            columns,
            rows,
            gap,
            padding,
            cells,
        }
    }

    /// A uniform grid with one 1×1 cell per slot.
    pub fn uniform(id: &str, name: &str, columns: usize, rows: usize, gap: f64, padding: f64) -> Self {
        Self::new(
            id,
            name,
            columns,
            rows,
            gap,
            padding,
            vec![CellSpan::unit(); columns * rows],
        )
    }

    /// The full-bleed fallback.
    pub fn single() -> Self {
        Self::uniform("single", "Single", 1, 1, 0.0, 0.0)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// The set of layouts pages can reference.
#[derive(Debug, Clone)]
pub struct LayoutCatalog {
    layouts: Vec<Layout>,
    fallback: Layout,
}

impl Default for LayoutCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LayoutCatalog {
    pub fn builtin() -> Self {
        let gap = 12.0;
        let pad = 24.0;
        let layouts = vec![
            Layout::single(),
            Layout::uniform("two-columns", "Two columns", 2, 1, gap, pad),
            Layout::uniform("two-rows", "Two rows", 1, 2, gap, pad),
            Layout::uniform("three-columns", "Three columns", 3, 1, gap, pad),
            Layout::uniform("three-rows", "Three rows", 1, 3, gap, pad),
            Layout::uniform("grid-2x2", "Grid 2×2", 2, 2, gap, pad),
            Layout::new(
                "hero-top",
                "Hero on top",
                2,
                2,
                gap,
                pad,
                vec![CellSpan::new(2, 1), CellSpan::unit(), CellSpan::unit()],
            ),
            Layout::new(
                "hero-left",
                "Hero on the left",
                2,
                2,
                gap,
                pad,
                vec![CellSpan::new(1, 2), CellSpan::unit(), CellSpan::unit()],
            ),
            Layout::uniform("grid-3x3", "Grid 3×3", 3, 3, 8.0, pad),
            Layout::new(
                "mosaic",
                "Mosaic",
                3,
                2,
                gap,
                pad,
                vec![CellSpan::new(2, 2), CellSpan::unit(), CellSpan::unit()],
            ),
        ];
        Self {
            layouts,
            fallback: Layout::single(),
        }
    }

    /// Add layouts from a JSON array, replacing built-ins with the same id.
    pub fn extend_from_json(&mut self, json: &str) -> Result<()> {
        let extra: Vec<Layout> = serde_json::from_str(json)?;
        for layout in extra {
            self.insert(layout);
        }
        Ok(())
    }

    pub fn insert(&mut self, layout: Layout) {
        match self.layouts.iter_mut().find(|l| l.id == layout.id) {
            Some(existing) => *existing = layout,
            None => self.layouts.push(layout),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }

    /// Look up a layout; `false` in the second slot means the fallback was used.
    pub fn resolve(&self, id: &str) -> (&Layout, bool) {
        match self.get(id) {
            Some(layout) => (layout, true),
            None => (&self.fallback, false),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.iter()
    }
}
