//! # Project Model
//!
//! The input representation for the rendering engine. A project is an ordered
//! list of pages; each page picks a grid layout from the catalog and holds one
//! [`Cell`] per grid slot; each cell holds positioned text and image elements.
//!
//! Cell rectangles are never stored. They are derived from the page's layout
//! id and the cell's ordinal (see [`crate::layout`]), which is what keeps the
//! editor, the thumbnail rasterizer and the print exporter in agreement.
//!
//! The JSON the editor produces is described by [`wire`]; [`Project::from_json`]
//! converts it into these types once, resolving the legacy "a value ≤ 1 is a
//! fraction" coordinate heuristic into an explicit [`Coord`].

pub mod preset;
pub mod wire;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::compose::filters::Filters;
use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::error::{FolioError, Result};
use crate::layout::catalog::LayoutCatalog;
use crate::style::{parse_font_weight, Color, TextAlign, TextStyle};
use preset::{find_preset, parse_workspace_size, LayoutPreset};
use wire::{
    CanvasConfigWire, CellWire, ElementWire, NumberLike, PageWire, PointWire, ProjectWire,
    SizeWire, StyleWire,
};

/// Element ids starting with this prefix are the layout's auto-generated
/// page background placeholder, painted through `Page::background_image`.
pub const BASE_IMAGE_PREFIX: &str = "base-image";

/// Project lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectStatus {
    #[default]
    Draft,
    Completed,
    Exported,
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(ProjectStatus::Draft),
            "completed" => Some(ProjectStatus::Completed),
            "exported" => Some(ProjectStatus::Exported),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Exported => "exported",
        }
    }

    /// Staying in the same state is always allowed (re-exporting).
    pub fn can_transition_to(&self, to: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, to),
            (Draft, Completed) | (Draft, Exported) | (Completed, Exported)
        ) || *self == to
    }
}

/// Canvas resolution assumed when a project does not state one.
pub const DEFAULT_DPI: f64 = 96.0;

/// Canvas the whole project is designed against, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub dpi: f64,
    pub background_color: Color,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::from_wire(&CanvasConfigWire::default())
    }
}

impl CanvasConfig {
    fn from_wire(w: &CanvasConfigWire) -> Self {
        let positive = |v: f64, default: f64| if v.is_finite() && v > 0.0 { v } else { default };
        Self {
            width: positive(w.width, 800.0),
            height: positive(w.height, 600.0),
            dpi: positive(w.dpi, DEFAULT_DPI),
            background_color: Color::parse_or(&w.background_color, Color::WHITE),
        }
    }

    fn to_wire(&self) -> CanvasConfigWire {
        CanvasConfigWire {
            width: self.width,
            height: self.height,
            dpi: self.dpi,
            background_color: color_to_css(&self.background_color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Content,
    Final,
}

impl PageKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cover" => Some(PageKind::Cover),
            "content" => Some(PageKind::Content),
            "final" => Some(PageKind::Final),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Cover => "cover",
            PageKind::Content => "content",
            PageKind::Final => "final",
        }
    }
}

/// A position or size component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coord {
    /// Pixels, relative to the cell origin.
    Absolute(f64),
    /// Fraction of the cell's extent on the same axis.
    Fraction(f64),
}

impl Coord {
    /// The legacy magnitude rule: `|v| <= 1` is a fraction.
    pub fn infer(v: f64) -> Self {
        if v.abs() <= 1.0 {
            Coord::Fraction(v)
        } else {
            Coord::Absolute(v)
        }
    }

    /// The number as stored on the wire.
    pub fn raw(&self) -> f64 {
        match self {
            Coord::Absolute(v) | Coord::Fraction(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementGeometry {
    pub x: Coord,
    pub y: Coord,
    pub width: Coord,
    pub height: Coord,
}

impl Default for ElementGeometry {
    /// The whole cell.
    fn default() -> Self {
        Self {
            x: Coord::Fraction(0.0),
            y: Coord::Fraction(0.0),
            width: Coord::Fraction(1.0),
            height: Coord::Fraction(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Text { content: String, style: TextStyle },
    Image { src: String, filters: Filters },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
    pub geometry: ElementGeometry,
    pub z_index: f64,
}

impl Element {
    /// Ascending paint order within the cell.
    pub fn paint_order(&self) -> f64 {
        match &self.kind {
            ElementKind::Image { filters, .. } => filters.z_index.unwrap_or(self.z_index),
            ElementKind::Text { .. } => self.z_index,
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.id.starts_with(BASE_IMAGE_PREFIX)
    }

    pub fn image_source(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Image { src, .. } if !src.trim().is_empty() => Some(src),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: String,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    pub kind: PageKind,
    pub page_number: Option<u32>,
    pub layout_id: String,
    pub background_color: Option<Color>,
    pub background_image: Option<String>,
    pub cells: Vec<Cell>,
}

impl Page {
    pub fn to_wire(&self) -> PageWire {
        PageWire {
            id: self.id.clone(),
            kind: self.kind.as_str().to_string(),
            page_number: self.page_number,
            layout: self.layout_id.clone(),
            background_color: self.background_color.as_ref().map(color_to_css),
            background_image: self.background_image.clone(),
            cells: self
                .cells
                .iter()
                .map(|c| CellWire {
                    id: c.id.clone(),
                    elements: c.elements.iter().map(element_to_wire).collect(),
                })
                .collect(),
        }
    }

    /// Image URIs this page needs, background first, in paint order.
    pub fn image_sources(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(bg) = self.background_image.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push(bg);
        }
        for cell in &self.cells {
            for el in &cell.elements {
                if el.is_reserved() {
                    continue;
                }
                if let Some(src) = el.image_source() {
                    out.push(src);
                }
            }
        }
        out
    }
}

/// The root aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub owner_id: Option<String>,
    pub preset_id: Option<String>,
    pub status: ProjectStatus,
    pub generated_at: Option<DateTime<Utc>>,
    pub pages: Vec<Page>,
    pub current_page: usize,
    pub workspace_size: Option<String>,
    pub canvas: CanvasConfig,
}

impl Project {
    /// Parse project JSON, logging any migration warnings.
    pub fn from_json(json: &str) -> Result<Self> {
        let (project, _) = Self::from_json_with_diagnostics(json)?;
        Ok(project)
    }

    /// Parse project JSON and return the migration warnings as well.
    pub fn from_json_with_diagnostics(json: &str) -> Result<(Self, Diagnostics)> {
        let wire: ProjectWire = serde_json::from_str(json)?;
        let mut diag = Diagnostics::new();
        let project = Self::from_wire(wire, &mut diag);
        Ok((project, diag))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_wire())?)
    }

    pub fn from_wire(w: ProjectWire, diag: &mut Diagnostics) -> Self {
        let status = w
            .status
            .as_deref()
            .and_then(|s| {
                let parsed = ProjectStatus::parse(s);
                if parsed.is_none() {
                    log::warn!("unknown project status {:?}, treating as draft", s);
                }
                parsed
            })
            .unwrap_or_default();
        let generated_at = w.generated_at.as_deref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| log::debug!("ignoring generatedAt {:?}: {}", s, e))
                .ok()
        });
        let pages = w
            .pages
            .into_iter()
            .enumerate()
            .map(|(i, p)| page_from_wire(p, i, diag))
            .collect();
        Self {
            id: w.id.unwrap_or_default(),
            owner_id: w.owner_id,
            preset_id: w.selected_layout_preset_id,
            status,
            generated_at,
            pages,
            current_page: w.current_page,
            workspace_size: w.workspace_size,
            canvas: CanvasConfig::from_wire(&w.canvas_config),
        }
    }

    pub fn to_wire(&self) -> ProjectWire {
        ProjectWire {
            id: Some(self.id.clone()).filter(|id| !id.is_empty()),
            owner_id: self.owner_id.clone(),
            selected_layout_preset_id: self.preset_id.clone(),
            status: Some(self.status.as_str().to_string()),
            generated_at: self
                .generated_at
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            pages: self.pages.iter().map(Page::to_wire).collect(),
            current_page: self.current_page,
            workspace_size: self.workspace_size.clone(),
            canvas_config: self.canvas.to_wire(),
        }
    }

    /// Move along the lifecycle, or fail with [`FolioError::Lifecycle`].
    pub fn transition(&mut self, to: ProjectStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(FolioError::Lifecycle {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn preset(&self) -> Option<&'static LayoutPreset> {
        self.preset_id.as_deref().and_then(find_preset)
    }

    /// Physical trim size in centimeters: preset, then the workspace size
    /// label, then canvas pixels over dpi ([`DEFAULT_DPI`] when unset).
    pub fn physical_size_cm(&self) -> (f64, f64) {
        if let Some(p) = self.preset() {
            return (p.width_cm, p.height_cm);
        }
        if let Some(size) = self.workspace_size.as_deref().and_then(parse_workspace_size) {
            return size;
        }
        let dpi = if self.canvas.dpi > 0.0 {
            self.canvas.dpi
        } else {
            DEFAULT_DPI
        };
        let to_cm = |px: f64| px / dpi * 2.54;
        (to_cm(self.canvas.width), to_cm(self.canvas.height))
    }

    /// Check the cover/content/final page ordering. Rendering never refuses a
    /// project over these; they are reported as warnings.
    pub fn structure_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.pages.is_empty() {
            return issues;
        }
        let covers = self.pages.iter().filter(|p| p.kind == PageKind::Cover).count();
        let finals = self.pages.iter().filter(|p| p.kind == PageKind::Final).count();
        if covers != 1 {
            issues.push(format!("expected exactly one cover page, found {}", covers));
        }
        if finals != 1 {
            issues.push(format!("expected exactly one final page, found {}", finals));
        }
        if self.pages.first().map(|p| p.kind) != Some(PageKind::Cover) {
            issues.push("first page is not the cover".to_string());
        }
        if self.pages.last().map(|p| p.kind) != Some(PageKind::Final) {
            issues.push("last page is not the final page".to_string());
        }
        let mut last_number: Option<u32> = None;
        for page in self.pages.iter().filter(|p| p.kind == PageKind::Content) {
            match page.page_number {
                None => issues.push(format!("content page '{}' has no page number", page.id)),
                Some(n) => {
                    if let Some(prev) = last_number {
                        if n <= prev {
                            issues.push(format!(
                                "content page '{}' number {} does not follow {}",
                                page.id, n, prev
                            ));
                        }
                    }
                    last_number = Some(n);
                }
            }
        }
        issues
    }

    /// Instantiate a fresh draft from a preset: one cover, `content_pages`
    /// numbered content pages and one final page, each with one cell per
    /// layout slot and a default text element in the first cell.
    pub fn from_preset(
        preset: &LayoutPreset,
        content_pages: usize,
        owner_id: Option<String>,
        catalog: &LayoutCatalog,
    ) -> Self {
        let now = Utc::now();
        let mut pages = Vec::with_capacity(content_pages + 2);
        pages.push(default_page(
            "page-cover".to_string(),
            PageKind::Cover,
            None,
            preset.cover_layout,
            "Título del álbum",
            catalog,
        ));
        for n in 1..=content_pages {
            pages.push(default_page(
                format!("page-{}", n),
                PageKind::Content,
                Some(n as u32),
                preset.content_layout,
                &format!("Página {}", n),
                catalog,
            ));
        }
        pages.push(default_page(
            "page-final".to_string(),
            PageKind::Final,
            None,
            preset.final_layout,
            "Fin",
            catalog,
        ));
        Self {
            id: format!("project-{}", now.timestamp_millis()),
            owner_id,
            preset_id: Some(preset.id.to_string()),
            status: ProjectStatus::Draft,
            generated_at: Some(now),
            pages,
            current_page: 0,
            workspace_size: Some(format!("{}x{}", preset.width_cm, preset.height_cm)),
            canvas: CanvasConfig {
                width: preset.canvas_width,
                height: preset.canvas_height,
                dpi: preset.dpi,
                background_color: Color::parse_or(preset.background, Color::WHITE),
            },
        }
    }
}

fn default_page(
    id: String,
    kind: PageKind,
    page_number: Option<u32>,
    layout_id: &str,
    text: &str,
    catalog: &LayoutCatalog,
) -> Page {
    let slots = catalog.get(layout_id).map(|l| l.cells.len()).unwrap_or(1);
    let cells = (0..slots)
        .map(|i| {
            let cell_id = format!("{}-cell-{}", id, i);
            let elements = if i == 0 {
                vec![Element {
                    id: format!("{}-text", cell_id),
                    kind: ElementKind::Text {
                        content: text.to_string(),
                        style: TextStyle::default(),
                    },
                    geometry: ElementGeometry {
                        x: Coord::Fraction(0.1),
                        y: Coord::Fraction(0.4),
                        width: Coord::Fraction(0.8),
                        height: Coord::Fraction(0.2),
                    },
                    z_index: 1.0,
                }]
            } else {
                Vec::new()
            };
            Cell {
                id: cell_id,
                elements,
            }
        })
        .collect();
    Page {
        id,
        kind,
        page_number,
        layout_id: layout_id.to_string(),
        background_color: None,
        background_image: None,
        cells,
    }
}

fn color_to_css(c: &Color) -> String {
    if c.a >= 1.0 {
        c.to_hex()
    } else {
        let [r, g, b, _] = c.to_rgba8();
        format!("rgba({}, {}, {}, {})", r, g, b, (c.a * 1000.0).round() / 1000.0)
    }
}

fn page_from_wire(w: PageWire, index: usize, diag: &mut Diagnostics) -> Page {
    let kind = PageKind::parse(&w.kind).unwrap_or_else(|| {
        diag.warn(RenderWarning::Structure(format!(
            "page {} has unknown type '{}', treating as content",
            index, w.kind
        )));
        PageKind::Content
    });
    let id = if w.id.is_empty() {
        format!("page-{}", index)
    } else {
        w.id
    };
    let cells = w
        .cells
        .into_iter()
        .enumerate()
        .map(|(ci, c)| Cell {
            id: if c.id.is_empty() {
                format!("{}-cell-{}", id, ci)
            } else {
                c.id
            },
            elements: c
                .elements
                .into_iter()
                .filter_map(|e| element_from_wire(e, diag))
                .collect(),
        })
        .collect();
    Page {
        id,
        kind,
        page_number: w.page_number,
        layout_id: w.layout,
        background_color: w.background_color.as_deref().and_then(|s| {
            Color::parse(s).or_else(|| {
                log::warn!("unrecognized page background {:?}, using canvas background", s);
                None
            })
        }),
        background_image: w.background_image.filter(|s| !s.trim().is_empty()),
        cells,
    }
}

/// Classify the four geometry numbers once, reporting missing values and
/// exact ±1 values that sit next to pixel values.
fn geometry_from_wire(
    element_id: &str,
    position: Option<&PointWire>,
    size: Option<&SizeWire>,
    diag: &mut Diagnostics,
) -> ElementGeometry {
    let num = |v: Option<&NumberLike>| v.and_then(NumberLike::as_f64);
    let x = num(position.and_then(|p| p.x.as_ref()));
    let y = num(position.and_then(|p| p.y.as_ref()));
    let width = num(size.and_then(|s| s.width.as_ref()));
    let height = num(size.and_then(|s| s.height.as_ref()));

    if x.is_none() || y.is_none() {
        diag.warn(RenderWarning::MalformedGeometry {
            element_id: element_id.to_string(),
            detail: "missing position, using (0, 0)".to_string(),
        });
    }
    if width.is_none() || height.is_none() {
        diag.warn(RenderWarning::MalformedGeometry {
            element_id: element_id.to_string(),
            detail: "missing size, using the full cell".to_string(),
        });
    }

    let values = [("x", x), ("y", y), ("width", width), ("height", height)];
    let uses_pixels = values.iter().any(|(_, v)| v.is_some_and(|v| v.abs() > 1.0));
    if uses_pixels {
        for (axis, v) in values {
            if let Some(v) = v.filter(|v| v.abs() == 1.0) {
                diag.warn(RenderWarning::AmbiguousCoordinate {
                    element_id: element_id.to_string(),
                    axis,
                    value: v,
                });
            }
        }
    }

    ElementGeometry {
        x: Coord::infer(x.unwrap_or(0.0)),
        y: Coord::infer(y.unwrap_or(0.0)),
        width: width.map(Coord::infer).unwrap_or(Coord::Fraction(1.0)),
        height: height.map(Coord::infer).unwrap_or(Coord::Fraction(1.0)),
    }
}

fn text_style_from_wire(w: Option<&StyleWire>) -> TextStyle {
    let d = TextStyle::default();
    let Some(w) = w else {
        return d;
    };
    let font_size = w
        .font_size
        .as_ref()
        .and_then(NumberLike::as_f64)
        .filter(|v| *v > 0.0)
        .unwrap_or(d.font_size);
    let font_weight = match &w.font_weight {
        Some(NumberLike::Number(v)) => (v.round() as i64).clamp(100, 900) as u16,
        Some(NumberLike::Text(s)) => parse_font_weight(s),
        None => d.font_weight,
    };
    // Unitless line heights multiply the font size; "px" values are absolute.
    let line_height = match &w.line_height {
        Some(NumberLike::Text(s)) if s.trim().ends_with("px") => NumberLike::Text(s.clone())
            .as_f64()
            .map(|px| px / font_size)
            .unwrap_or(d.line_height),
        Some(v) => v.as_f64().filter(|v| *v > 0.0).unwrap_or(d.line_height),
        None => d.line_height,
    };
    TextStyle {
        color: w
            .color
            .as_deref()
            .map(|c| Color::parse_or(c, Color::BLACK))
            .unwrap_or(d.color),
        font_size,
        font_family: w
            .font_family
            .clone()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(d.font_family),
        font_weight,
        text_align: w
            .text_align
            .as_deref()
            .map(TextAlign::parse)
            .unwrap_or(d.text_align),
        background_color: w
            .background_color
            .as_deref()
            .and_then(Color::parse)
            .filter(Color::is_visible),
        line_height,
    }
}

fn element_from_wire(w: ElementWire, diag: &mut Diagnostics) -> Option<Element> {
    let geometry = geometry_from_wire(&w.id, w.position.as_ref(), w.size.as_ref(), diag);
    let kind = match w.kind.as_str() {
        "text" => ElementKind::Text {
            content: w.content,
            style: text_style_from_wire(w.style.as_ref()),
        },
        "image" => ElementKind::Image {
            filters: Filters::from_wire(w.filters.as_ref(), &w.id, diag),
            src: w.content,
        },
        other => {
            diag.warn(RenderWarning::UnsupportedElement {
                element_id: w.id.clone(),
                kind: other.to_string(),
            });
            return None;
        }
    };
    Some(Element {
        id: w.id,
        kind,
        geometry,
        z_index: w.z_index.as_ref().and_then(NumberLike::as_f64).unwrap_or(0.0),
    })
}

fn element_to_wire(e: &Element) -> ElementWire {
    let (kind, content, style, filters) = match &e.kind {
        ElementKind::Text { content, style } => (
            "text",
            content.clone(),
            Some(StyleWire {
                color: Some(color_to_css(&style.color)),
                font_size: Some(style.font_size.into()),
                font_family: Some(style.font_family.clone()),
                font_weight: Some((style.font_weight as f64).into()),
                text_align: Some(style.text_align.as_str().to_string()),
                background_color: style.background_color.as_ref().map(color_to_css),
                line_height: Some(style.line_height.into()),
            }),
            None,
        ),
        ElementKind::Image { src, filters } => ("image", src.clone(), None, Some(filters.to_wire())),
    };
    ElementWire {
        id: e.id.clone(),
        kind: kind.to_string(),
        content,
        position: Some(PointWire {
            x: Some(e.geometry.x.raw().into()),
            y: Some(e.geometry.y.raw().into()),
        }),
        size: Some(SizeWire {
            width: Some(e.geometry.width.raw().into()),
            height: Some(e.geometry.height.raw().into()),
        }),
        style,
        filters,
        z_index: Some(e.z_index.into()),
    }
}
