//! # Page Rasterizer
//!
//! Paints one resolved page onto a [`RasterSurface`] at a scale factor:
//!
//! 1. background color
//! 2. cover-fitted background image, when it loaded
//! 3. cells in declared order, each clipped to its rectangle
//! 4. elements of a cell in ascending paint order
//!
//! Images are gathered before painting starts (see
//! [`ImageSet`](crate::image_loader::ImageSet)), so painting is synchronous and
//! its order never depends on load timing. An image that failed to load is
//! simply absent from the set and its element is left out.
//!
//! Print mode finishes with the contrast/saturation boost over the whole
//! surface and is encoded losslessly; preview mode is encoded as JPEG.

pub mod cache;
pub mod text;

use std::io::Cursor;

use image::{RgbImage, RgbaImage};
use tiny_skia::{
    FillRule, FilterQuality, IntSize, Mask, PathBuilder, Pixmap, PixmapPaint, Point, Transform,
};

use crate::compose::filters::{boost_premultiplied, Filters};
use crate::compose::{compose_region, cover_image, dest_pixels, element_density};
use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::error::{FolioError, Result};
use crate::image_loader::ImageSet;
use crate::layout::{PlacedElement, Rect, ResolvedPage};
use crate::model::ElementKind;
use text::FontContext;

/// Which output a raster is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Thumbnails: low scale, lossy encoding.
    Preview,
    /// Print export: high scale, boosted colors, lossless encoding.
    Print,
}

/// An owned raster surface. Never shared between renders.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            FolioError::Raster(format!("cannot allocate a {}x{} surface", width, height))
        })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA copy.
    pub fn to_rgba(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width(), self.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// RGB composited over white.
    pub fn to_rgb(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width(), self.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            // Premultiplied: c + (255 - a) is "over white".
            let white = 255 - src.alpha();
            *dst = image::Rgb([
                src.red().saturating_add(white),
                src.green().saturating_add(white),
                src.blue().saturating_add(white),
            ]);
        }
        out
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| FolioError::Raster(format!("PNG encoding failed: {}", e)))
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb = self.to_rgb();
        let mut out = Cursor::new(Vec::new());
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
            .map_err(|e| FolioError::Raster(format!("JPEG encoding failed: {}", e)))?;
        Ok(out.into_inner())
    }

    /// PNG for print, JPEG for preview.
    pub fn encode(&self, mode: RenderMode, jpeg_quality: u8) -> Result<Vec<u8>> {
        match mode {
            RenderMode::Print => self.encode_png(),
            RenderMode::Preview => self.encode_jpeg(jpeg_quality),
        }
    }
}

/// Apply the print contrast/saturation boost to the whole surface.
pub fn apply_print_boost(surface: &mut RasterSurface, boost: f64) {
    boost_premultiplied(surface.pixmap.data_mut(), boost);
}

/// Paint a resolved page. The only error is a surface that cannot be
/// allocated; everything else degrades and is recorded in `diag`.
#[allow(clippy::too_many_arguments)]
pub fn paint_page(
    page: &ResolvedPage<'_>,
    images: &ImageSet,
    fonts: &mut FontContext,
    scale: f64,
    mode: RenderMode,
    print_boost: f64,
    diag: &mut Diagnostics,
) -> Result<RasterSurface> {
    let (width, height) = dest_pixels(page.width, page.height, scale).ok_or_else(|| {
        FolioError::Raster(format!(
            "page '{}' is empty at scale {} ({}x{})",
            page.page.id, scale, page.width, page.height
        ))
    })?;
    let mut surface = RasterSurface::new(width, height)?;
    let pixmap = &mut surface.pixmap;

    let [r, g, b, a] = page.background.to_rgba8();
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

    if let Some(bg) = page.background_image.and_then(|uri| images.get(uri)) {
        match cover_image(bg, width, height).and_then(|img| to_pixmap(&img)) {
            Some(pm) => pixmap.draw_pixmap(
                0,
                0,
                pm.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            ),
            None => log::warn!("page '{}': background image has no pixels", page.page.id),
        }
    }

    let page_rect = Rect::new(0.0, 0.0, page.width, page.height);
    for cell in &page.cells {
        let Some((clip, mask)) = cell
            .rect
            .intersection(&page_rect)
            .and_then(|c| clip_mask(width, height, &c.scaled(scale)).map(|m| (c, m)))
        else {
            log::debug!("page '{}': cell {} has no area", page.page.id, cell.index);
            continue;
        };
        for placed in &cell.elements {
            match &placed.element.kind {
                ElementKind::Image { src, filters } => match images.get(src) {
                    Some(img) => {
                        paint_image(pixmap, &mask, &clip, placed, img, filters, scale, diag)
                    }
                    None if src.trim().is_empty() => diag.warn(RenderWarning::ImageSkipped {
                        element_id: placed.element.id.clone(),
                        reason: "empty image source".to_string(),
                    }),
                    // The load failure was already recorded.
                    None => {}
                },
                ElementKind::Text { content, style } => fonts.paint_text(
                    pixmap,
                    Some(&mask),
                    &placed.element.id,
                    content,
                    style,
                    &placed.rect.scaled(scale),
                    scale,
                    diag,
                ),
            }
        }
    }

    if mode == RenderMode::Print {
        apply_print_boost(&mut surface, print_boost);
    }
    Ok(surface)
}

#[allow(clippy::too_many_arguments)]
fn paint_image(
    pixmap: &mut Pixmap,
    mask: &Mask,
    clip: &Rect,
    placed: &PlacedElement<'_>,
    source: &RgbaImage,
    filters: &Filters,
    scale: f64,
    diag: &mut Diagnostics,
) {
    let skip = |diag: &mut Diagnostics, reason: &str| {
        diag.warn(RenderWarning::ImageSkipped {
            element_id: placed.element.id.clone(),
            reason: reason.to_string(),
        })
    };
    if dest_pixels(placed.rect.width, placed.rect.height, scale).is_none() {
        skip(diag, "element rectangle has no area");
        return;
    }
    let Some(visible) = visible_region(&placed.rect, clip, filters) else {
        log::debug!("element '{}' lies outside its cell", placed.element.id);
        return;
    };
    let density = element_density(scale, filters);
    let region = compose_region(
        source,
        placed.rect.width,
        placed.rect.height,
        &visible,
        filters,
        density,
    );
    let Some((bitmap, local)) = region.and_then(|r| Some((to_pixmap(&r.image)?, r.local))) else {
        skip(diag, "source image has no pixels");
        return;
    };
    let transform = element_transform(&placed.rect.scaled(scale), filters)
        .pre_translate((local.x * scale) as f32, (local.y * scale) as f32)
        .pre_scale(
            (local.width * scale / bitmap.width() as f64) as f32,
            (local.height * scale / bitmap.height() as f64) as f32,
        );
    let paint = PixmapPaint {
        opacity: filters.alpha() as f32,
        blend_mode: filters.blend_mode.to_skia(),
        quality: FilterQuality::Bilinear,
    };
    pixmap.draw_pixmap(0, 0, bitmap.as_ref(), &paint, transform, Some(mask));
}

/// The part of an element, in its local canvas pixels, that can land inside
/// `clip` once the element transform is applied. `None` when nothing can.
pub fn visible_region(rect: &Rect, clip: &Rect, filters: &Filters) -> Option<Rect> {
    let inverse = element_transform(rect, filters).invert()?;
    let mut corners = [
        Point::from_xy(clip.x as f32, clip.y as f32),
        Point::from_xy(clip.right() as f32, clip.y as f32),
        Point::from_xy(clip.x as f32, clip.bottom() as f32),
        Point::from_xy(clip.right() as f32, clip.bottom() as f32),
    ];
    inverse.map_points(&mut corners);
    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in &corners {
        x0 = x0.min(p.x as f64);
        y0 = y0.min(p.y as f64);
        x1 = x1.max(p.x as f64);
        y1 = y1.max(p.y as f64);
    }
    // One pixel of slack for f32 rounding and resampling at the edges.
    Rect::new(x0 - 1.0, y0 - 1.0, x1 - x0 + 2.0, y1 - y0 + 2.0)
        .intersection(&Rect::new(0.0, 0.0, rect.width, rect.height))
}

/// Maps element-local coordinates (`0..width`, `0..height`, y down) into the
/// coordinate space of `rect`: scale, then rotate, then flip, all about the
/// element center.
pub fn element_transform(rect: &Rect, filters: &Filters) -> Transform {
    let (cx, cy) = rect.center();
    let fx = if filters.flip_horizontal { -1.0 } else { 1.0 };
    let fy = if filters.flip_vertical { -1.0 } else { 1.0 };
    let k = filters.scale as f32;
    Transform::from_translate(cx as f32, cy as f32)
        .pre_scale(k, k)
        .pre_concat(Transform::from_rotate(filters.rotate as f32))
        .pre_scale(fx, fy)
        .pre_translate(-(rect.width / 2.0) as f32, -(rect.height / 2.0) as f32)
}

fn clip_mask(width: u32, height: u32, rect: &Rect) -> Option<Mask> {
    let r = tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    )?;
    let path = PathBuilder::from_rect(r);
    let mut mask = Mask::new(width, height)?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
    Some(mask)
}

/// Premultiply straight-alpha RGBA into a pixmap.
fn to_pixmap(img: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(img.width(), img.height())?;
    let mut data = Vec::with_capacity(img.as_raw().len());
    for px in img.pixels() {
        let a = px[3] as u16;
        let mul = |c: u8| ((c as u16 * a + 127) / 255) as u8;
        data.extend_from_slice(&[mul(px[0]), mul(px[1]), mul(px[2]), px[3]]);
    }
    Pixmap::from_vec(data, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::catalog::LayoutCatalog;
    use crate::layout::resolve_page;
    use crate::model::Project;
    use image::Rgba;

    fn render(project: &Project, images: &ImageSet, scale: f64, mode: RenderMode) -> (RasterSurface, Diagnostics) {
        let mut diag = Diagnostics::new();
        let resolved = resolve_page(&project.pages[0], &project.canvas, &LayoutCatalog::builtin(), &mut diag);
        let mut fonts = FontContext::empty();
        let surface = paint_page(&resolved, images, &mut fonts, scale, mode, 1.05, &mut diag).unwrap();
        (surface, diag)
    }

    fn solid_png(color: [u8; 4]) -> String {
        use base64::Engine;
        let img = RgbaImage::from_pixel(8, 8, Rgba(color));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }

    async fn images_for(project: &Project) -> ImageSet {
        let mut diag = Diagnostics::new();
        ImageSet::load(
            project.pages[0].image_sources(),
            &crate::image_loader::DefaultFetcher::new(),
            std::time::Duration::from_secs(5),
            &mut diag,
        )
        .await
    }

    #[test]
    fn test_background_fill_and_size() {
        let p = Project::from_json(
            r##"{"canvasConfig": {"width": 40, "height": 20, "backgroundColor": "#ff0000"},
                "pages": [{"id": "p", "type": "cover", "layout": "single", "cells": []}]}"##,
        )
        .unwrap();
        let (surface, diag) = render(&p, &ImageSet::default(), 2.0, RenderMode::Preview);
        assert_eq!((surface.width(), surface.height()), (80, 40));
        assert_eq!(surface.to_rgba().get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert!(diag.is_empty());
    }

    #[tokio::test]
    async fn test_image_clipped_to_cell() {
        let json = format!(
            r##"{{"canvasConfig": {{"width": 100, "height": 100, "backgroundColor": "#ffffff"}},
                "pages": [{{"id": "p", "type": "cover", "layout": "two-columns", "cells": [
                {{"id": "c0", "elements": [{{"id": "img", "type": "image", "content": "{}",
                  "position": {{"x": 0, "y": 0}}, "size": {{"width": 1, "height": 1}},
                  "filters": {{"scale": 3}}}}]}},
                {{"id": "c1", "elements": []}}]}}]}}"##,
            solid_png([0, 0, 255, 255])
        );
        let p = Project::from_json(&json).unwrap();
        let images = images_for(&p).await;
        let (surface, _) = render(&p, &images, 1.0, RenderMode::Preview);
        let rgba = surface.to_rgba();
        // two-columns: padding 24, gap 12 on a 100px canvas.
        assert_eq!(rgba.get_pixel(30, 50), &Rgba([0, 0, 255, 255]));
        // Scaled 3x, but clipped: the second column and the padding stay white.
        assert_eq!(rgba.get_pixel(70, 50), &Rgba([255, 255, 255, 255]));
        assert_eq!(rgba.get_pixel(5, 50), &Rgba([255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn test_oversized_element_renders_visible_part() {
        use base64::Engine;
        // Left half red, right half blue.
        let split = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut buf = Cursor::new(Vec::new());
        split.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        let data = base64::engine::general_purpose::STANDARD.encode(buf.into_inner());
        let json = format!(
            r##"{{"canvasConfig": {{"width": 200, "height": 200, "backgroundColor": "#ffffff"}},
                "pages": [{{"id": "p", "type": "cover", "layout": "single", "cells": [
                {{"id": "c", "elements": [{{"id": "huge", "type": "image", "content": "{}",
                  "position": {{"x": -5900, "y": -5900}}, "size": {{"width": 12000, "height": 12000}}}}]}}]}}]}}"##,
            data
        );
        let p = Project::from_json(&json).unwrap();
        let images = images_for(&p).await;

        let placed = {
            let mut diag = Diagnostics::new();
            let resolved = resolve_page(&p.pages[0], &p.canvas, &LayoutCatalog::builtin(), &mut diag);
            resolved.cells[0].elements[0].rect
        };
        let visible =
            visible_region(&placed, &Rect::new(0.0, 0.0, 200.0, 200.0), &Filters::default()).unwrap();
        assert!(visible.width <= 202.0 && visible.height <= 202.0);

        let (surface, diag) = render(&p, &images, 1.0, RenderMode::Preview);
        assert!(diag.is_empty());
        let rgba = surface.to_rgba();
        // The whole page shows the blend across the red/blue split at
        // canvas x = 100; no background shows through.
        let (left, right) = (rgba.get_pixel(5, 100), rgba.get_pixel(195, 100));
        for px in [left, right, rgba.get_pixel(100, 5), rgba.get_pixel(100, 195)] {
            assert_eq!((px[1], px[3]), (0, 255));
        }
        assert!(left[0] > right[0] && left[2] < right[2]);
    }

    #[test]
    fn test_visible_region_follows_rotation() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let rotated = Filters {
            rotate: 90.0,
            ..Filters::default()
        };
        // A clip covering only the element center sees only its middle.
        let clip = Rect::new(40.0, 15.0, 20.0, 20.0);
        let visible = visible_region(&rect, &clip, &rotated).unwrap();
        assert!(visible.x > 35.0 && visible.right() < 65.0);
        assert!(visible.y > 10.0 && visible.bottom() < 40.0);
        assert!(visible_region(&rect, &Rect::new(500.0, 500.0, 10.0, 10.0), &rotated).is_none());
    }

    #[tokio::test]
    async fn test_higher_paint_order_wins() {
        let json = format!(
            r##"{{"canvasConfig": {{"width": 50, "height": 50}},
                "pages": [{{"id": "p", "type": "cover", "layout": "single", "cells": [
                {{"id": "c", "elements": [
                  {{"id": "top", "type": "image", "content": "{}", "zIndex": 5,
                    "position": {{"x": 0, "y": 0}}, "size": {{"width": 1, "height": 1}}}},
                  {{"id": "bottom", "type": "image", "content": "{}", "zIndex": 1,
                    "position": {{"x": 0, "y": 0}}, "size": {{"width": 1, "height": 1}}}}
                ]}}]}}]}}"##,
            solid_png([0, 255, 0, 255]),
            solid_png([255, 0, 0, 255])
        );
        let p = Project::from_json(&json).unwrap();
        let images = images_for(&p).await;
        let (surface, _) = render(&p, &images, 1.0, RenderMode::Preview);
        assert_eq!(surface.to_rgba().get_pixel(25, 25), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_print_boost_changes_pixels() {
        let p = Project::from_json(
            r##"{"canvasConfig": {"width": 10, "height": 10, "backgroundColor": "#c86464"},
                "pages": [{"id": "p", "type": "cover", "layout": "single", "cells": []}]}"##,
        )
        .unwrap();
        let (preview, _) = render(&p, &ImageSet::default(), 1.0, RenderMode::Preview);
        let (print, _) = render(&p, &ImageSet::default(), 1.0, RenderMode::Print);
        let a = preview.to_rgba().get_pixel(0, 0).0;
        let b = print.to_rgba().get_pixel(0, 0).0;
        assert_eq!(a, [200, 100, 100, 255]);
        assert!(b[0] > a[0] && b[1] < a[1]);
    }

    #[test]
    fn test_rasterize_is_deterministic() {
        let p = Project::from_json(
            r##"{"canvasConfig": {"width": 64, "height": 48, "backgroundColor": "#336699"},
                "pages": [{"id": "p", "type": "cover", "layout": "grid-2x2", "cells": []}]}"##,
        )
        .unwrap();
        let (a, _) = render(&p, &ImageSet::default(), 1.5, RenderMode::Print);
        let (b, _) = render(&p, &ImageSet::default(), 1.5, RenderMode::Print);
        assert_eq!(a.encode_png().unwrap(), b.encode_png().unwrap());
    }

    #[test]
    fn test_encoders() {
        let surface = RasterSurface::new(4, 4).unwrap();
        assert!(surface.encode(RenderMode::Print, 80).unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(surface.encode(RenderMode::Preview, 80).unwrap().starts_with(&[0xFF, 0xD8]));
        // Transparent surface composites to white.
        assert_eq!(surface.to_rgb().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_element_transform_identity_and_flip() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        let t = element_transform(&rect, &Filters::default());
        let mut p = [tiny_skia::Point::from_xy(0.0, 0.0)];
        t.map_points(&mut p);
        assert!((p[0].x - 10.0).abs() < 1e-4 && (p[0].y - 20.0).abs() < 1e-4);

        let flipped = Filters {
            flip_horizontal: true,
            ..Filters::default()
        };
        let mut p = [tiny_skia::Point::from_xy(0.0, 0.0)];
        element_transform(&rect, &flipped).map_points(&mut p);
        assert!((p[0].x - 40.0).abs() < 1e-4 && (p[0].y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_unallocatable_surface_is_error() {
        assert!(matches!(RasterSurface::new(0, 10), Err(FolioError::Raster(_))));
    }
}
