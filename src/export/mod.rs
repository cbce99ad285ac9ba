//! # Document Export
//!
//! Walks the project's pages in order and emits one PDF page per project
//! page, sized to the physical album format plus bleed. Two strategies
//! produce the page content:
//!
//! - **Raster**: the page is painted in print mode at ~300 DPI and embedded
//!   as a single image in the trim box.
//! - **Markup**: the resolved page tree is written as vector PDF. Cells
//!   become clipping paths, images become cover-fitted XObjects placed with
//!   the element transform, and text is set in Helvetica.
//!
//! Both get the print color boost: the raster over the whole surface, the
//! markup page on every fill color and embedded bitmap.
//!
//! Both consume the same [`ResolvedPage`], so they agree on geometry with
//! each other and with the thumbnails. An export always yields a document:
//! a project without pages gets a single placeholder page.

use std::fmt::Write as _;

use crate::compose::filters::{boost_color, boost_straight, BlendMode, Filters};
use crate::compose::{compose_region, cover_image, dest_pixels, element_density};
use crate::config::ExportStrategy;
use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::error::Result;
use crate::image_loader::ImageSet;
use crate::layout::{resolve_page, PlacedElement, Rect, ResolvedPage};
use crate::model::{ElementKind, Project};
use crate::pdf::metrics::{justify_spacing, text_width, wrap_paragraph, ASCENT, DESCENT};
use crate::pdf::{encode_winansi, fmt_num, GraphicsState, Metadata, PdfImage, PdfPage, PdfWriter};
use crate::raster::{element_transform, visible_region, RasterSurface, RenderMode};
use crate::renderer::Renderer;
use crate::style::{Color, TextAlign, TextStyle};

/// Text of the page emitted for a project without pages.
pub const EMPTY_PLACEHOLDER: &str = "Proyecto sin contenido";

pub const POINTS_PER_CM: f64 = 72.0 / 2.54;

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub diagnostics: Diagnostics,
}

/// Output page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub trim_width: f64,
    pub trim_height: f64,
    /// Added on every side.
    pub bleed: f64,
}

impl PageFrame {
    pub fn for_project(project: &Project, bleed_cm: f64) -> Self {
        let (width_cm, height_cm) = project.physical_size_cm();
        Self {
            trim_width: width_cm.max(0.0) * POINTS_PER_CM,
            trim_height: height_cm.max(0.0) * POINTS_PER_CM,
            bleed: bleed_cm.max(0.0) * POINTS_PER_CM,
        }
    }

    pub fn width(&self) -> f64 {
        self.trim_width + 2.0 * self.bleed
    }

    pub fn height(&self) -> f64 {
        self.trim_height + 2.0 * self.bleed
    }

    pub fn trim_box(&self) -> Option<[f64; 4]> {
        (self.bleed > 0.0).then(|| {
            [
                self.bleed,
                self.bleed,
                self.bleed + self.trim_width,
                self.bleed + self.trim_height,
            ]
        })
    }

    fn empty_page(&self) -> PdfPage {
        PdfPage {
            width: self.width(),
            height: self.height(),
            trim_box: self.trim_box(),
            ..PdfPage::default()
        }
    }
}

pub(crate) async fn export_project(
    renderer: &Renderer,
    project: &Project,
    strategy: ExportStrategy,
) -> Result<ExportArtifact> {
    let config = renderer.config();
    let mut diagnostics = Diagnostics::new();
    for issue in project.structure_issues() {
        diagnostics.warn(RenderWarning::Structure(issue));
    }

    let frame = PageFrame::for_project(project, config.effective_bleed_cm());
    let scale = config.print_scale(project.canvas.width, project.physical_size_cm().0);
    log::info!(
        "exporting project '{}': {} pages, {:?} strategy, {:.1}x{:.1} pt, print scale {:.2}",
        project.id,
        project.pages.len(),
        strategy,
        frame.width(),
        frame.height(),
        scale
    );

    let mut pages = Vec::with_capacity(project.pages.len().max(1));
    if project.pages.is_empty() {
        pages.push(placeholder_page(&frame));
    }
    for page in &project.pages {
        let images = renderer.load_images(page, &mut diagnostics).await;
        let resolved = resolve_page(page, &project.canvas, renderer.catalog(), &mut diagnostics);
        let pdf_page = match strategy {
            ExportStrategy::Raster => {
                let surface =
                    renderer.paint(&resolved, &images, scale, RenderMode::Print, &mut diagnostics)?;
                let bleed = boost_color(resolved.background, config.print_color_boost);
                raster_page(&surface, bleed, &frame)
            }
            ExportStrategy::Markup => markup_page(
                &resolved,
                &images,
                scale,
                config.print_color_boost,
                &frame,
                &mut diagnostics,
            ),
        };
        pages.push(pdf_page);
    }

    let metadata = Metadata {
        title: Some(project.id.clone()),
        author: project.owner_id.clone(),
        subject: project.preset().map(|p| p.name.to_string()),
    };
    let bytes = PdfWriter::new().write(&pages, &metadata);
    log::info!(
        "exported {} pages, {} bytes, {} warnings",
        pages.len(),
        bytes.len(),
        diagnostics.len()
    );
    Ok(ExportArtifact {
        bytes,
        page_count: pages.len(),
        diagnostics,
    })
}

/// The single page emitted for an empty project.
pub fn placeholder_page(frame: &PageFrame) -> PdfPage {
    let size = 24.0;
    let x = (frame.width() - text_width(EMPTY_PLACEHOLDER, size, false)) / 2.0;
    let y = frame.height() / 2.0;
    let mut page = frame.empty_page();
    let mut c = String::new();
    let _ = writeln!(c, "1 1 1 rg\n0 0 {} {} re f", fmt_num(page.width), fmt_num(page.height));
    let _ = writeln!(
        c,
        "0.4 0.4 0.4 rg\nBT\n/F0 {} Tf\n{} {} Td\n({}) Tj\nET",
        fmt_num(size),
        fmt_num(x),
        fmt_num(y),
        encode_winansi(EMPTY_PLACEHOLDER)
    );
    page.content = c;
    page
}

/// Background over the full page (bleed included), then the print raster
/// stretched over the trim box.
pub fn raster_page(surface: &RasterSurface, background: Color, frame: &PageFrame) -> PdfPage {
    let mut page = frame.empty_page();
    let mut c = String::new();
    fill_page(&mut c, background, page.width, page.height);
    let _ = writeln!(
        c,
        "q\n{} 0 0 {} {} {} cm\n/Im0 Do\nQ",
        fmt_num(frame.trim_width),
        fmt_num(frame.trim_height),
        fmt_num(frame.bleed),
        fmt_num(frame.bleed)
    );
    let rgb = surface.to_rgb();
    page.images.push(PdfImage {
        width: rgb.width(),
        height: rgb.height(),
        rgb: rgb.into_raw(),
        alpha: None,
    });
    page.content = c;
    page
}

/// Vector page description. Drawing happens in canvas pixels with y down:
/// the page-level matrix maps the canvas onto the trim box. Colors and
/// bitmaps get `print_boost`, as the print raster does.
pub fn markup_page(
    resolved: &ResolvedPage<'_>,
    images: &ImageSet,
    scale: f64,
    print_boost: f64,
    frame: &PageFrame,
    diag: &mut Diagnostics,
) -> PdfPage {
    let mut out = MarkupPage {
        page: frame.empty_page(),
        content: String::new(),
        boost: print_boost,
    };
    fill_page(
        &mut out.content,
        boost_color(resolved.background, print_boost),
        out.page.width,
        out.page.height,
    );

    let k = frame.trim_width / resolved.width;
    let ky = frame.trim_height / resolved.height;
    let _ = writeln!(
        out.content,
        "q\n{} 0 0 {} {} {} cm",
        fmt_num(k),
        fmt_num(-ky),
        fmt_num(frame.bleed),
        fmt_num(frame.bleed + frame.trim_height)
    );

    let canvas = Rect::new(0.0, 0.0, resolved.width, resolved.height);
    if let Some(bg) = resolved.background_image.and_then(|uri| images.get(uri)) {
        let composed = dest_pixels(canvas.width, canvas.height, scale)
            .and_then(|(w, h)| cover_image(bg, w, h));
        match composed {
            Some(img) => out.draw_image(img, &canvas, &canvas, &Filters::default()),
            None => log::warn!("page '{}': background image has no pixels", resolved.page.id),
        }
    }

    for cell in &resolved.cells {
        let Some(clip) = cell.rect.intersection(&canvas) else {
            continue;
        };
        let r = &cell.rect;
        let _ = writeln!(
            out.content,
            "q\n{} {} {} {} re W n",
            fmt_num(r.x),
            fmt_num(r.y),
            fmt_num(r.width),
            fmt_num(r.height)
        );
        for placed in &cell.elements {
            match &placed.element.kind {
                ElementKind::Image { src, filters } => {
                    let Some(source) = images.get(src) else {
                        if src.trim().is_empty() {
                            diag.warn(RenderWarning::ImageSkipped {
                                element_id: placed.element.id.clone(),
                                reason: "empty image source".to_string(),
                            });
                        }
                        continue;
                    };
                    let skip = |diag: &mut Diagnostics| {
                        diag.warn(RenderWarning::ImageSkipped {
                            element_id: placed.element.id.clone(),
                            reason: "nothing to draw at this size".to_string(),
                        })
                    };
                    if dest_pixels(placed.rect.width, placed.rect.height, scale).is_none() {
                        skip(diag);
                        continue;
                    }
                    let Some(visible) = visible_region(&placed.rect, &clip, filters) else {
                        log::debug!("element '{}' lies outside its cell", placed.element.id);
                        continue;
                    };
                    let composed = compose_region(
                        source,
                        placed.rect.width,
                        placed.rect.height,
                        &visible,
                        filters,
                        element_density(scale, filters),
                    );
                    match composed {
                        Some(region) => {
                            out.draw_image(region.image, &placed.rect, &region.local, filters)
                        }
                        None => skip(diag),
                    }
                }
                ElementKind::Text { content, style } => {
                    out.draw_text(placed, content, style);
                }
            }
        }
        out.content.push_str("Q\n");
    }
    out.content.push_str("Q\n");

    out.page.content = out.content;
    out.page
}

struct MarkupPage {
    page: PdfPage,
    content: String,
    boost: f64,
}

impl MarkupPage {
    /// Place `img` over `local`, a part of the element `rect` in element
    /// coordinates.
    fn draw_image(
        &mut self,
        mut img: image::RgbaImage,
        rect: &Rect,
        local: &Rect,
        filters: &Filters,
    ) {
        boost_straight(&mut img, self.boost);
        let index = self.page.images.len();
        self.page.images.push(PdfImage::from_rgba(&img));

        // Unit square, top row first, onto `local`, then the element's own
        // scale/rotate/flip.
        let m = element_transform(rect, filters)
            .pre_translate(local.x as f32, local.y as f32)
            .pre_concat(tiny_skia::Transform::from_row(
                local.width as f32,
                0.0,
                0.0,
                -local.height as f32,
                0.0,
                local.height as f32,
            ));
        self.content.push_str("q\n");
        if filters.alpha() < 1.0 || filters.blend_mode != BlendMode::Normal {
            let gs = self.page.graphics_states.len();
            self.page.graphics_states.push(GraphicsState {
                fill_alpha: filters.alpha(),
                blend_mode: filters.blend_mode.pdf_name(),
            });
            let _ = writeln!(self.content, "/GS{} gs", gs);
        }
        let _ = writeln!(
            self.content,
            "{} {} {} {} {} {} cm\n/Im{} Do\nQ",
            fmt_num(m.sx as f64),
            fmt_num(m.ky as f64),
            fmt_num(m.kx as f64),
            fmt_num(m.sy as f64),
            fmt_num(m.tx as f64),
            fmt_num(m.ty as f64),
            index
        );
    }

    fn draw_text(&mut self, placed: &PlacedElement<'_>, content: &str, style: &TextStyle) {
        let r = &placed.rect;
        if let Some(bg) = style.background_color.filter(Color::is_visible) {
            let _ = writeln!(
                self.content,
                "{} rg\n{} {} {} {} re f",
                rgb_operands(boost_color(bg, self.boost)),
                fmt_num(r.x),
                fmt_num(r.y),
                fmt_num(r.width),
                fmt_num(r.height)
            );
        }
        if content.trim().is_empty() || !(style.font_size > 0.0) {
            return;
        }
        let bold = style.is_bold();
        let size = style.font_size;
        let line_height = size * style.line_height;
        let font = if bold { "/F1" } else { "/F0" };
        // Center the em box (ascent + descent) in each line box.
        let em = (ASCENT + DESCENT) / 1000.0 * size;
        let ascent = ASCENT / 1000.0 * size;

        let _ = writeln!(
            self.content,
            "{} rg\nBT\n{} {} Tf",
            rgb_operands(boost_color(style.color, self.boost)),
            font,
            fmt_num(size)
        );
        let mut row = 0usize;
        let mut spacing = 0.0;
        for paragraph in content.split('\n') {
            let lines = wrap_paragraph(paragraph, size, bold, r.width);
            let count = lines.len();
            for (i, line) in lines.iter().enumerate() {
                row += 1;
                if line.is_empty() {
                    continue;
                }
                let width = text_width(line, size, bold);
                let x = match style.text_align {
                    TextAlign::Left | TextAlign::Justify => r.x,
                    TextAlign::Center => r.x + (r.width - width) / 2.0,
                    TextAlign::Right => r.x + r.width - width,
                };
                // Last line of a paragraph stays ragged.
                let tw = match style.text_align {
                    TextAlign::Justify if i + 1 < count => {
                        justify_spacing(line, size, bold, r.width)
                    }
                    _ => 0.0,
                };
                if tw != spacing {
                    let _ = writeln!(self.content, "{} Tw", fmt_num(tw));
                    spacing = tw;
                }
                let baseline =
                    r.y + (row - 1) as f64 * line_height + (line_height - em) / 2.0 + ascent;
                // The page matrix flips y; flip glyphs back upright.
                let _ = writeln!(
                    self.content,
                    "1 0 0 -1 {} {} Tm\n({}) Tj",
                    fmt_num(x),
                    fmt_num(baseline),
                    encode_winansi(line)
                );
            }
        }
        self.content.push_str("ET\n");
    }
}

fn fill_page(c: &mut String, color: Color, width: f64, height: f64) {
    let _ = writeln!(
        c,
        "q\n{} rg\n0 0 {} {} re f\nQ",
        rgb_operands(color),
        fmt_num(width),
        fmt_num(height)
    );
}

/// PDF has no alpha on fill colors; composite over white.
fn rgb_operands(color: Color) -> String {
    let over_white = |c: f64| c * color.a + (1.0 - color.a);
    format!(
        "{} {} {}",
        fmt_num(over_white(color.r)),
        fmt_num(over_white(color.g)),
        fmt_num(over_white(color.b))
    )
}
