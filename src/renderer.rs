//! # Renderer
//!
//! The long-lived entry point that owns everything shared between renders:
//! configuration, the layout catalog, the image fetcher and the font
//! database. Each render call gets its own surface, image set and
//! diagnostics; nothing mutable is shared except the font cache, which is
//! only locked while painting and never across an await.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;

use crate::config::{ExportStrategy, RenderConfig};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::export::{self, ExportArtifact};
use crate::image_loader::{DefaultFetcher, ImageFetcher, ImageSet};
use crate::layout::catalog::LayoutCatalog;
use crate::layout::{resolve_page, ResolvedPage};
use crate::model::{CanvasConfig, Page, Project};
use crate::raster::text::FontContext;
use crate::raster::{paint_page, RasterSurface, RenderMode};

/// A painted page and what went wrong while painting it.
#[derive(Debug)]
pub struct Rasterized {
    pub surface: RasterSurface,
    pub diagnostics: Diagnostics,
}

/// An encoded preview of one page.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub page_id: String,
    pub width: u32,
    pub height: u32,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    pub diagnostics: Diagnostics,
}

pub struct Renderer {
    config: RenderConfig,
    catalog: LayoutCatalog,
    fetcher: Arc<dyn ImageFetcher>,
    fonts: Mutex<FontContext>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let fonts = FontContext::new(&config);
        Self {
            config,
            catalog: LayoutCatalog::builtin(),
            fetcher: Arc::new(DefaultFetcher::new()),
            fonts: Mutex::new(fonts),
        }
    }

    /// Replace the image-fetch collaborator.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_catalog(mut self, catalog: LayoutCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_fonts(mut self, fonts: FontContext) -> Self {
        self.fonts = Mutex::new(fonts);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LayoutCatalog {
        &self.catalog
    }

    /// Rasterize one page at `scale`. Image loads run first, concurrently and
    /// each under the configured timeout; painting starts once all of them
    /// have settled.
    pub async fn rasterize(
        &self,
        page: &Page,
        canvas: &CanvasConfig,
        scale: f64,
        mode: RenderMode,
    ) -> Result<Rasterized> {
        let mut diagnostics = Diagnostics::new();
        let images = self.load_images(page, &mut diagnostics).await;
        let resolved = resolve_page(page, canvas, &self.catalog, &mut diagnostics);
        let surface = self.paint(&resolved, &images, scale, mode, &mut diagnostics)?;
        log::debug!(
            "rasterized page '{}' at {}x{} ({} warnings)",
            page.id,
            surface.width(),
            surface.height(),
            diagnostics.len()
        );
        Ok(Rasterized {
            surface,
            diagnostics,
        })
    }

    /// Render a preview-scale JPEG of one page.
    pub async fn thumbnail(&self, page: &Page, canvas: &CanvasConfig) -> Result<Thumbnail> {
        let Rasterized {
            surface,
            diagnostics,
        } = self
            .rasterize(page, canvas, self.config.preview_scale, RenderMode::Preview)
            .await?;
        let bytes = surface.encode(RenderMode::Preview, self.config.jpeg_quality)?;
        Ok(Thumbnail {
            page_id: page.id.clone(),
            width: surface.width(),
            height: surface.height(),
            bytes,
            diagnostics,
        })
    }

    /// Thumbnails for every page, rendered concurrently. Results keep page
    /// order; one failed page does not affect the others.
    pub async fn thumbnails(&self, project: &Project) -> Vec<Result<Thumbnail>> {
        join_all(
            project
                .pages
                .iter()
                .map(|page| self.thumbnail(page, &project.canvas)),
        )
        .await
    }

    /// Export with the configured strategy.
    pub async fn export(&self, project: &Project) -> Result<ExportArtifact> {
        self.export_with(project, self.config.export_strategy).await
    }

    pub async fn export_with(
        &self,
        project: &Project,
        strategy: ExportStrategy,
    ) -> Result<ExportArtifact> {
        export::export_project(self, project, strategy).await
    }

    pub(crate) async fn load_images(&self, page: &Page, diag: &mut Diagnostics) -> ImageSet {
        ImageSet::load(
            page.image_sources(),
            self.fetcher.as_ref(),
            self.config.image_timeout(),
            diag,
        )
        .await
    }

    pub(crate) fn paint(
        &self,
        page: &ResolvedPage<'_>,
        images: &ImageSet,
        scale: f64,
        mode: RenderMode,
        diag: &mut Diagnostics,
    ) -> Result<RasterSurface> {
        // A panic in another render leaves the cache usable.
        let mut fonts = self.fonts.lock().unwrap_or_else(PoisonError::into_inner);
        paint_page(
            page,
            images,
            &mut fonts,
            scale,
            mode,
            self.config.print_color_boost,
            diag,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(RenderConfig {
            load_system_fonts: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_thumbnails_in_page_order() {
        let project = Project::from_json(
            r##"{"canvasConfig": {"width": 100, "height": 80},
                "pages": [
                  {"id": "cover", "type": "cover", "layout": "single", "cells": []},
                  {"id": "p1", "type": "content", "pageNumber": 1, "layout": "grid-2x2", "cells": []},
                  {"id": "final", "type": "final", "layout": "single", "cells": []}
                ]}"##,
        )
        .unwrap();
        let thumbs = renderer().thumbnails(&project).await;
        let ids: Vec<String> = thumbs
            .into_iter()
            .map(|t| {
                let t = t.unwrap();
                assert_eq!((t.width, t.height), (150, 120));
                assert!(t.bytes.starts_with(&[0xFF, 0xD8]));
                t.page_id
            })
            .collect();
        assert_eq!(ids, vec!["cover", "p1", "final"]);
    }

    #[tokio::test]
    async fn test_rasterize_reports_unknown_layout() {
        let project = Project::from_json(
            r##"{"pages": [{"id": "p", "type": "cover", "layout": "nope", "cells": []}]}"##,
        )
        .unwrap();
        let out = renderer()
            .rasterize(&project.pages[0], &project.canvas, 0.5, RenderMode::Preview)
            .await
            .unwrap();
        assert_eq!((out.surface.width(), out.surface.height()), (400, 300));
        assert_eq!(out.diagnostics.len(), 1);
    }
}
