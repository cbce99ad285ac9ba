//! Render configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file
//! and callers only spell out what they change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Contrast and saturation multiplier applied to print rasters after painting.
pub const PRINT_COLOR_BOOST: f64 = 1.05;

/// How the export serializer embeds page content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportStrategy {
    /// Each page rasterized at print resolution and embedded as one image.
    #[default]
    Raster,
    /// Vector page description: fills, clipped image XObjects, text.
    Markup,
}

impl std::str::FromStr for ExportStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" => Ok(ExportStrategy::Raster),
            "markup" => Ok(ExportStrategy::Markup),
            other => Err(format!("unknown export strategy '{}' (raster|markup)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Scale factor for preview thumbnails.
    pub preview_scale: f64,
    /// Target print resolution.
    pub print_dpi: f64,
    /// Print scale used when the physical page size or canvas width is degenerate.
    pub print_scale_fallback: f64,
    pub print_color_boost: f64,
    /// Per-image load timeout.
    pub image_timeout_ms: u64,
    pub bleed_cm: f64,
    pub apply_bleed: bool,
    /// JPEG quality for preview thumbnails, 1-100.
    pub jpeg_quality: u8,
    pub load_system_fonts: bool,
    pub font_dirs: Vec<PathBuf>,
    pub export_strategy: ExportStrategy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_scale: 1.5,
            print_dpi: 300.0,
            print_scale_fallback: 12.0,
            print_color_boost: PRINT_COLOR_BOOST,
            image_timeout_ms: 30_000,
            bleed_cm: 0.3,
            apply_bleed: true,
            jpeg_quality: 85,
            load_system_fonts: true,
            font_dirs: Vec::new(),
            export_strategy: ExportStrategy::Raster,
        }
    }
}

impl RenderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn image_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.image_timeout_ms)
    }

    /// Bleed added on each side, in centimeters.
    pub fn effective_bleed_cm(&self) -> f64 {
        if self.apply_bleed {
            self.bleed_cm.max(0.0)
        } else {
            0.0
        }
    }

    /// Raster scale that reaches `print_dpi` for a canvas `canvas_width_px`
    /// wide printed at `physical_width_cm`. Never below 1; degenerate sizes
    /// get `print_scale_fallback`.
    pub fn print_scale(&self, canvas_width_px: f64, physical_width_cm: f64) -> f64 {
        let scale = physical_width_cm / 2.54 * self.print_dpi / canvas_width_px;
        if physical_width_cm > 0.0 && canvas_width_px > 0.0 && scale.is_finite() {
            scale.max(1.0)
        } else {
            self.print_scale_fallback.max(1.0)
        }
    }
}
