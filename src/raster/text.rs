//! Wrapped text painting for the page rasterizer.
//!
//! Text is shaped and wrapped with cosmic-text inside the element rectangle,
//! then every glyph outline is filled as a vector path through tiny-skia so
//! the result does not depend on a glyph bitmap cache. Lines are stacked
//! from the top of the rectangle.

use cosmic_text::{
    fontdb, Align, Attrs, Buffer, Command, Family, FontSystem, Metrics, Shaping, SwashCache,
    Weight,
};
use tiny_skia::{FillRule, Mask, Paint, PathBuilder, Pixmap, Transform};

use crate::config::RenderConfig;
use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::layout::Rect;
use crate::style::{Color, TextAlign, TextStyle};

/// Font database and glyph outline cache, reused across pages.
pub struct FontContext {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl FontContext {
    /// Load system fonts (when enabled) and every configured font directory.
    pub fn new(config: &RenderConfig) -> Self {
        let mut db = fontdb::Database::new();
        if config.load_system_fonts {
            db.load_system_fonts();
        }
        for dir in &config.font_dirs {
            db.load_fonts_dir(dir);
        }
        log::debug!("font database holds {} faces", db.len());
        Self::with_database(db)
    }

    pub fn with_database(db: fontdb::Database) -> Self {
        Self {
            font_system: FontSystem::new_with_locale_and_db("en".to_string(), db),
            swash_cache: SwashCache::new(),
        }
    }

    /// A context without faces. Text elements are skipped with a warning.
    pub fn empty() -> Self {
        Self::with_database(fontdb::Database::new())
    }

    pub fn has_faces(&self) -> bool {
        self.font_system.db().faces().next().is_some()
    }

    /// Paint `content` inside `rect` (device pixels). `scale` converts the
    /// style's canvas-pixel sizes to device pixels.
    #[allow(clippy::too_many_arguments)]
    pub fn paint_text(
        &mut self,
        pixmap: &mut Pixmap,
        mask: Option<&Mask>,
        element_id: &str,
        content: &str,
        style: &TextStyle,
        rect: &Rect,
        scale: f64,
        diag: &mut Diagnostics,
    ) {
        if let Some(bg) = style.background_color.filter(Color::is_visible) {
            fill_rect(pixmap, rect, bg, mask);
        }
        if content.trim().is_empty() || rect.is_empty() {
            return;
        }
        if !self.has_faces() {
            diag.warn(RenderWarning::TextSkipped {
                element_id: element_id.to_string(),
                reason: "no font faces available".to_string(),
            });
            return;
        }
        let font_size = (style.font_size * scale) as f32;
        if !(font_size > 0.0 && font_size.is_finite()) {
            diag.warn(RenderWarning::TextSkipped {
                element_id: element_id.to_string(),
                reason: format!("invalid font size {}", style.font_size),
            });
            return;
        }
        let line_height = (font_size * style.line_height as f32).max(1.0);

        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(font_size, line_height));
        buffer.set_size(&mut self.font_system, Some(rect.width as f32), None);
        let attrs = Attrs::new()
            .family(Family::Name(&style.font_family))
            .weight(Weight(style.font_weight));
        buffer.set_text(
            &mut self.font_system,
            content,
            &attrs,
            Shaping::Advanced,
            Some(to_align(style.text_align)),
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut paint = Paint::default();
        let [r, g, b, a] = style.color.to_rgba8();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;

        let x0 = rect.x as f32;
        let y0 = rect.y as f32;
        for run in buffer.layout_runs() {
            for glyph in run.glyphs.iter() {
                let physical = glyph.physical((0.0, 0.0), 1.0);
                let Some(commands) = self
                    .swash_cache
                    .get_outline_commands(&mut self.font_system, physical.cache_key)
                else {
                    continue;
                };
                // Outlines are y-up; the pixmap is y-down.
                let mut pb = PathBuilder::new();
                for cmd in commands {
                    match cmd {
                        Command::MoveTo(p) => pb.move_to(p.x, -p.y),
                        Command::LineTo(p) => pb.line_to(p.x, -p.y),
                        Command::QuadTo(c, p) => pb.quad_to(c.x, -c.y, p.x, -p.y),
                        Command::CurveTo(c1, c2, p) => {
                            pb.cubic_to(c1.x, -c1.y, c2.x, -c2.y, p.x, -p.y)
                        }
                        Command::Close => pb.close(),
                    }
                }
                let Some(path) = pb.finish() else {
                    continue;
                };
                let gx = x0 + glyph.x + glyph.font_size * glyph.x_offset;
                let gy = y0 + run.line_y + glyph.y - glyph.font_size * glyph.y_offset;
                pixmap.fill_path(
                    &path,
                    &paint,
                    FillRule::Winding,
                    Transform::from_translate(gx, gy),
                    mask,
                );
            }
        }
    }
}

fn to_align(align: TextAlign) -> Align {
    match align {
        TextAlign::Left => Align::Left,
        TextAlign::Right => Align::Right,
        TextAlign::Center => Align::Center,
        TextAlign::Justify => Align::Justified,
    }
}

/// Fill a device-pixel rectangle with a solid color.
pub(crate) fn fill_rect(pixmap: &mut Pixmap, rect: &Rect, color: Color, mask: Option<&Mask>) {
    let Some(r) = tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    ) else {
        return;
    };
    let mut paint = Paint::default();
    let [cr, cg, cb, ca] = color.to_rgba8();
    paint.set_color_rgba8(cr, cg, cb, ca);
    pixmap.fill_rect(r, &paint, Transform::identity(), mask);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_pixmap() -> Pixmap {
        let mut pm = Pixmap::new(100, 40).unwrap();
        pm.fill(tiny_skia::Color::WHITE);
        pm
    }

    #[test]
    fn test_no_faces_skips_with_warning() {
        let mut fonts = FontContext::empty();
        let mut pm = white_pixmap();
        let mut diag = Diagnostics::new();
        fonts.paint_text(
            &mut pm,
            None,
            "t1",
            "Hola",
            &TextStyle::default(),
            &Rect::new(0.0, 0.0, 100.0, 40.0),
            1.0,
            &mut diag,
        );
        assert_eq!(diag.len(), 1);
        assert!(matches!(diag.warnings()[0], RenderWarning::TextSkipped { .. }));
        assert!(pm.pixels().iter().all(|p| p.red() == 255));
    }

    #[test]
    fn test_background_painted_without_faces() {
        let mut fonts = FontContext::empty();
        let mut pm = white_pixmap();
        let mut diag = Diagnostics::new();
        let style = TextStyle {
            background_color: Some(Color::BLACK),
            ..TextStyle::default()
        };
        fonts.paint_text(
            &mut pm,
            None,
            "t1",
            "",
            &style,
            &Rect::new(10.0, 10.0, 20.0, 10.0),
            1.0,
            &mut diag,
        );
        assert!(diag.is_empty());
        let px = pm.pixel(15, 15).unwrap();
        assert_eq!((px.red(), px.alpha()), (0, 255));
        assert_eq!(pm.pixel(5, 5).unwrap().red(), 255);
    }

    #[test]
    fn test_system_text_leaves_ink() {
        let fonts_cfg = RenderConfig::default();
        let mut fonts = FontContext::new(&fonts_cfg);
        if !fonts.has_faces() {
            return;
        }
        let mut pm = white_pixmap();
        let mut diag = Diagnostics::new();
        let style = TextStyle {
            font_family: "sans-serif".to_string(),
            font_size: 20.0,
            ..TextStyle::default()
        };
        fonts.paint_text(
            &mut pm,
            None,
            "t1",
            "Hola",
            &style,
            &Rect::new(0.0, 0.0, 100.0, 40.0),
            1.0,
            &mut diag,
        );
        assert!(pm.pixels().iter().any(|p| p.red() < 128));
    }
}
