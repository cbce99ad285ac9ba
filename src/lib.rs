//! # Folio
//!
//! A page renderer for photo-album projects.
//!
//! An album is a list of pages. Each page picks a grid layout, the grid
//! yields cells, and the cells hold positioned text and image elements.
//! Folio turns that structure into pixels and print-ready PDF, and it does so
//! with one set of geometry and filter functions shared by every target:
//! the thumbnail you see is the page you print.
//!
//! ## Architecture
//!
//! ```text
//! Project JSON
//!       ↓
//!   [model]    wire schema, load-time migration, domain types
//!       ↓
//!   [layout]   grid cells, element rects, paint order
//!       ↓
//!   [compose]  cover-fit crop, filters, transforms
//!       ↓
//!   [raster]   thumbnails and print rasters
//!   [export]   paginated PDF (raster or vector markup)
//!       ↓
//!   [pdf]      serialize to PDF bytes
//! ```
//!
//! Recoverable problems (a missing image, an overflowing grid, an unknown
//! layout) never fail a render. They are returned as
//! [`Diagnostics`](diagnostics::Diagnostics) next to the output and logged.

pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod raster;
pub mod renderer;
pub mod store;
pub mod style;

pub use config::{ExportStrategy, RenderConfig};
pub use diagnostics::{Diagnostics, RenderWarning};
pub use error::{FolioError, Result};
pub use export::ExportArtifact;
pub use model::Project;
pub use raster::cache::ThumbnailCache;
pub use raster::RenderMode;
pub use renderer::{Rasterized, Renderer, Thumbnail};

/// Export a project described as JSON to PDF with the given configuration.
///
/// This is the primary one-shot entry point. Long-running callers should keep
/// a [`Renderer`] instead, so fonts are loaded once.
pub async fn export_json(json: &str, config: RenderConfig) -> Result<ExportArtifact> {
    let (project, migration) = Project::from_json_with_diagnostics(json)?;
    let mut artifact = Renderer::new(config).export(&project).await?;
    let mut diagnostics = migration;
    diagnostics.extend(artifact.diagnostics);
    artifact.diagnostics = diagnostics;
    Ok(artifact)
}
