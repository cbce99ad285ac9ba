//! # Page Layout
//!
//! Turns a page of the project into a resolved tree of absolute rectangles:
//!
//! ```text
//! Page ──layout id──▶ catalog ──▶ grid::resolve_cell_rects ──▶ cell rects
//!   └─ cells[i].elements ──▶ element::resolve_element_rect ──▶ element rects
//! ```
//!
//! The resolved tree ([`ResolvedPage`]) is the single geometric description of
//! a page. The rasterizer and both PDF export strategies consume it as is,
//! so the three render targets cannot drift apart.

pub mod catalog;
pub mod element;
pub mod grid;

use serde::Serialize;

use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::model::{CanvasConfig, Cell, Element, Page};
use crate::style::Color;
use catalog::LayoutCatalog;

const EPSILON: f64 = 1e-6;

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn scaled(&self, k: f64) -> Rect {
        Rect::new(self.x * k, self.y * k, self.width * k, self.height * k)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Whether `other` lies inside this rect (edges inclusive).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }

    /// The common area, or `None` when it is empty.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = Rect::new(
            x,
            y,
            self.right().min(other.right()) - x,
            self.bottom().min(other.bottom()) - y,
        );
        (!r.is_empty()).then_some(r)
    }

    /// Whether the interiors intersect; shared edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right() - EPSILON
            && other.x < self.right() - EPSILON
            && self.y < other.bottom() - EPSILON
            && other.y < self.bottom() - EPSILON
    }
}

/// An element with its page-space rectangle.
#[derive(Debug, Clone)]
pub struct PlacedElement<'a> {
    pub element: &'a Element,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct ResolvedCell<'a> {
    pub cell: &'a Cell,
    pub index: usize,
    pub rect: Rect,
    /// Sorted by ascending paint order; ties keep document order.
    pub elements: Vec<PlacedElement<'a>>,
}

/// Everything a render target needs to paint one page, in canvas pixels.
#[derive(Debug, Clone)]
pub struct ResolvedPage<'a> {
    pub page: &'a Page,
    pub width: f64,
    pub height: f64,
    pub background: Color,
    pub background_image: Option<&'a str>,
    pub cells: Vec<ResolvedCell<'a>>,
}

/// Resolve the geometry of one page against the project canvas.
pub fn resolve_page<'a>(
    page: &'a Page,
    canvas: &CanvasConfig,
    catalog: &LayoutCatalog,
    diag: &mut Diagnostics,
) -> ResolvedPage<'a> {
    let (layout, found) = catalog.resolve(&page.layout_id);
    if !found {
        diag.warn(RenderWarning::UnsupportedLayout {
            page_id: page.id.clone(),
            layout_id: page.layout_id.clone(),
        });
    }

    let cell_rects = grid::resolve_cell_rects(layout, canvas.width, canvas.height);
    for &index in &cell_rects.overflowed {
        diag.warn(RenderWarning::LayoutOverflow {
            page_id: page.id.clone(),
            layout_id: layout.id.clone(),
            cell_index: index,
        });
    }

    let cells = page
        .cells
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            // Cells beyond the layout's declared slots have nowhere to go.
            let rect = match cell_rects.rects.get(index) {
                Some(rect) => *rect,
                None => {
                    diag.warn(RenderWarning::LayoutOverflow {
                        page_id: page.id.clone(),
                        layout_id: layout.id.clone(),
                        cell_index: index,
                    });
                    cell_rects.fallback
                }
            };
            let mut elements: Vec<PlacedElement<'a>> = cell
                .elements
                .iter()
                .filter(|e| !e.is_reserved())
                .map(|element| PlacedElement {
                    element,
                    rect: element::resolve_element_rect(&element.geometry, &rect),
                })
                .collect();
            elements.sort_by(|a, b| a.element.paint_order().total_cmp(&b.element.paint_order()));
            ResolvedCell {
                cell,
                index,
                rect,
                elements,
            }
        })
        .collect();

    ResolvedPage {
        page,
        width: canvas.width,
        height: canvas.height,
        background: page.background_color.unwrap_or(canvas.background_color),
        background_image: page.background_image.as_deref(),
        cells,
    }
}
