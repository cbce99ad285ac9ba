//! # Wire Schema
//!
//! The project JSON exactly as the editor and the persistence store exchange
//! it. Everything the producer may omit is optional here; the conversion into
//! the domain model (see [`super::Project::from_wire`]) applies defaults and
//! migrates the legacy coordinate format once, at load time.

use serde::{Deserialize, Serialize};

use crate::style::parse_px;

/// A number the editor sometimes writes as a string (`"24px"`, `"90deg"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberLike::Number(v) if v.is_finite() => Some(*v),
            NumberLike::Number(_) => None,
            NumberLike::Text(s) => {
                let s = s.trim();
                let s = s
                    .strip_suffix('%')
                    .or_else(|| s.strip_suffix("deg"))
                    .unwrap_or(s);
                parse_px(s)
            }
        }
    }
}

impl From<f64> for NumberLike {
    fn from(v: f64) -> Self {
        NumberLike::Number(v)
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_layout_preset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub pages: Vec<PageWire>,
    #[serde(default)]
    pub current_page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_size: Option<String>,
    #[serde(default)]
    pub canvas_config: CanvasConfigWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasConfigWire {
    #[serde(default = "default_canvas_width")]
    pub width: f64,
    #[serde(default = "default_canvas_height")]
    pub height: f64,
    #[serde(default = "default_dpi")]
    pub dpi: f64,
    #[serde(default = "default_background")]
    pub background_color: String,
}

fn default_canvas_width() -> f64 {
    800.0
}

fn default_canvas_height() -> f64 {
    600.0
}

fn default_dpi() -> f64 {
    96.0
}

fn default_background() -> String {
    "#ffffff".to_string()
}

impl Default for CanvasConfigWire {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
            dpi: default_dpi(),
            background_color: default_background(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWire {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_page_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub layout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default)]
    pub cells: Vec<CellWire>,
}

fn default_page_type() -> String {
    "content".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellWire {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub elements: Vec<ElementWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementWire {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PointWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FiltersWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<NumberLike>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<NumberLike>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SizeWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<NumberLike>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<NumberLike>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<NumberLike>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub flip_horizontal: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub flip_vertical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<NumberLike>,
}
