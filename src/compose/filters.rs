//! # Filter / Transform Pipeline
//!
//! An image element's filter state is normalized once into [`Filters`] (every
//! field has a default) and then mapped to render operations. Two renderings
//! of the same state exist:
//!
//! - [`to_render_ops`] produces the CSS filter and transform strings the
//!   editor canvas applies, in a fixed order;
//! - [`apply_color_filters`] and [`apply_blur`] apply the very same operations
//!   to pixels, using the W3C Filter Effects matrices, so
//!   the raster and PDF targets match the editor.
//!
//! Filter order is `brightness → contrast → saturate → sepia → hue-rotate →
//! blur`. It must not change: sepia, hue rotation and blur do not commute.

use image::RgbaImage;

use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::model::wire::{FiltersWire, NumberLike};
use crate::style::Color;

/// Compositing mode between an element and what is below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Parse a CSS `mix-blend-mode` keyword.
    pub fn parse(s: &str) -> Option<Self> {
        let mode = match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "" => BlendMode::Normal,
            "multiply" => BlendMode::Multiply,
            "screen" => BlendMode::Screen,
            "overlay" => BlendMode::Overlay,
            "darken" => BlendMode::Darken,
            "lighten" => BlendMode::Lighten,
            "color-dodge" => BlendMode::ColorDodge,
            "color-burn" => BlendMode::ColorBurn,
            "hard-light" => BlendMode::HardLight,
            "soft-light" => BlendMode::SoftLight,
            "difference" => BlendMode::Difference,
            "exclusion" => BlendMode::Exclusion,
            "hue" => BlendMode::Hue,
            "saturation" => BlendMode::Saturation,
            "color" => BlendMode::Color,
            "luminosity" => BlendMode::Luminosity,
            _ => return None,
        };
        Some(mode)
    }

    pub fn as_css(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Hue => "hue",
            BlendMode::Saturation => "saturation",
            BlendMode::Color => "color",
            BlendMode::Luminosity => "luminosity",
        }
    }

    /// Name of the blend mode in a PDF ExtGState `/BM` entry.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "ColorDodge",
            BlendMode::ColorBurn => "ColorBurn",
            BlendMode::HardLight => "HardLight",
            BlendMode::SoftLight => "SoftLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Hue => "Hue",
            BlendMode::Saturation => "Saturation",
            BlendMode::Color => "Color",
            BlendMode::Luminosity => "Luminosity",
        }
    }

    pub fn to_skia(self) -> tiny_skia::BlendMode {
        use tiny_skia::BlendMode as B;
        match self {
            BlendMode::Normal => B::SourceOver,
            BlendMode::Multiply => B::Multiply,
            BlendMode::Screen => B::Screen,
            BlendMode::Overlay => B::Overlay,
            BlendMode::Darken => B::Darken,
            BlendMode::Lighten => B::Lighten,
            BlendMode::ColorDodge => B::ColorDodge,
            BlendMode::ColorBurn => B::ColorBurn,
            BlendMode::HardLight => B::HardLight,
            BlendMode::SoftLight => B::SoftLight,
            BlendMode::Difference => B::Difference,
            BlendMode::Exclusion => B::Exclusion,
            BlendMode::Hue => B::Hue,
            BlendMode::Saturation => B::Saturation,
            BlendMode::Color => B::Color,
            BlendMode::Luminosity => B::Luminosity,
        }
    }
}

/// Normalized image filter state. Percentages stay percentages (100 = no
/// change) and angles stay degrees, exactly as the editor stores them.
#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    /// Hue rotation in degrees.
    pub hue: f64,
    /// Sepia amount in percent.
    pub tint: f64,
    /// Blur radius in canvas pixels.
    pub blur: f64,
    /// 0-100.
    pub opacity: f64,
    pub scale: f64,
    /// Rotation in degrees, clockwise.
    pub rotate: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub blend_mode: BlendMode,
    /// Paint order override; wins over the element's own zIndex.
    pub z_index: Option<f64>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            tint: 0.0,
            blur: 0.0,
            opacity: 100.0,
            scale: 1.0,
            rotate: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            blend_mode: BlendMode::Normal,
            z_index: None,
        }
    }
}

impl Filters {
    /// Normalize the wire filter record, filling every missing or
    /// unparseable field with its default.
    pub fn from_wire(wire: Option<&FiltersWire>, element_id: &str, diag: &mut Diagnostics) -> Self {
        let d = Filters::default();
        let Some(w) = wire else {
            return d;
        };
        let num = |v: &Option<NumberLike>, default: f64| {
            v.as_ref().and_then(NumberLike::as_f64).unwrap_or(default)
        };
        let blend_mode = match w.blend_mode.as_deref() {
            None => BlendMode::Normal,
            Some(name) => BlendMode::parse(name).unwrap_or_else(|| {
                diag.warn(RenderWarning::UnknownBlendMode {
                    element_id: element_id.to_string(),
                    value: name.to_string(),
                });
                BlendMode::Normal
            }),
        };
        Self {
            brightness: num(&w.brightness, d.brightness).max(0.0),
            contrast: num(&w.contrast, d.contrast).max(0.0),
            saturation: num(&w.saturation, d.saturation).max(0.0),
            hue: num(&w.hue, d.hue),
            tint: num(&w.tint, d.tint).clamp(0.0, 100.0),
            blur: num(&w.blur, d.blur).max(0.0),
            opacity: num(&w.opacity, d.opacity).clamp(0.0, 100.0),
            scale: num(&w.scale, d.scale),
            rotate: num(&w.rotate, d.rotate),
            flip_horizontal: w.flip_horizontal,
            flip_vertical: w.flip_vertical,
            blend_mode,
            z_index: w.z_index.as_ref().and_then(NumberLike::as_f64),
        }
    }

    pub fn to_wire(&self) -> FiltersWire {
        FiltersWire {
            brightness: Some(self.brightness.into()),
            contrast: Some(self.contrast.into()),
            saturation: Some(self.saturation.into()),
            hue: Some(self.hue.into()),
            tint: Some(self.tint.into()),
            blur: Some(self.blur.into()),
            opacity: Some(self.opacity.into()),
            scale: Some(self.scale.into()),
            rotate: Some(self.rotate.into()),
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
            blend_mode: Some(self.blend_mode.as_css().to_string()),
            z_index: self.z_index.map(NumberLike::from),
        }
    }

    /// True when no color operation changes pixels.
    pub fn is_color_identity(&self) -> bool {
        self.brightness == 100.0
            && self.contrast == 100.0
            && self.saturation == 100.0
            && self.tint == 0.0
            && self.hue.rem_euclid(360.0) == 0.0
    }

    /// Opacity as a 0-1 alpha factor.
    pub fn alpha(&self) -> f64 {
        (self.opacity / 100.0).clamp(0.0, 1.0)
    }

    pub fn has_transform(&self) -> bool {
        self.scale != 1.0 || self.rotate != 0.0 || self.flip_horizontal || self.flip_vertical
    }
}

/// What a render target needs to draw an image element.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOps {
    /// CSS `filter` value.
    pub filter: String,
    /// CSS `transform` value, applied about the element center.
    pub transform: String,
    /// 0-1.
    pub opacity: f64,
    pub blend_mode: BlendMode,
}

/// Map a filter state to its render operations. Pure and total.
pub fn to_render_ops(f: &Filters) -> RenderOps {
    let filter = format!(
        "brightness({}%) contrast({}%) saturate({}%) sepia({}%) hue-rotate({}deg) blur({}px)",
        f.brightness, f.contrast, f.saturation, f.tint, f.hue, f.blur
    );
    let mut transform = format!("scale({}) rotate({}deg)", f.scale, f.rotate);
    if f.flip_horizontal {
        transform.push_str(" scaleX(-1)");
    }
    if f.flip_vertical {
        transform.push_str(" scaleY(-1)");
    }
    RenderOps {
        filter,
        transform,
        opacity: f.alpha(),
        blend_mode: f.blend_mode,
    }
}

type Matrix3 = [[f64; 3]; 3];

enum ColorStep {
    /// `c * slope + intercept` on every channel.
    Linear { slope: f64, intercept: f64 },
    Matrix(Matrix3),
}

fn saturate_matrix(s: f64) -> Matrix3 {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn sepia_matrix(amount: f64) -> Matrix3 {
    let k = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
        [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
        [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
    ]
}

fn hue_rotate_matrix(degrees: f64) -> Matrix3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn color_steps(f: &Filters) -> Vec<ColorStep> {
    let mut steps = Vec::new();
    if f.brightness != 100.0 {
        steps.push(ColorStep::Linear {
            slope: f.brightness / 100.0,
            intercept: 0.0,
        });
    }
    if f.contrast != 100.0 {
        let c = f.contrast / 100.0;
        steps.push(ColorStep::Linear {
            slope: c,
            intercept: 0.5 - 0.5 * c,
        });
    }
    if f.saturation != 100.0 {
        steps.push(ColorStep::Matrix(saturate_matrix(f.saturation / 100.0)));
    }
    if f.tint != 0.0 {
        steps.push(ColorStep::Matrix(sepia_matrix(f.tint / 100.0)));
    }
    if f.hue.rem_euclid(360.0) != 0.0 {
        steps.push(ColorStep::Matrix(hue_rotate_matrix(f.hue)));
    }
    steps
}

fn apply_steps(steps: &[ColorStep], rgb: [f64; 3]) -> [f64; 3] {
    let mut c = rgb;
    for step in steps {
        c = match step {
            ColorStep::Linear { slope, intercept } => c.map(|v| v * slope + intercept),
            ColorStep::Matrix(m) => [
                m[0][0] * c[0] + m[0][1] * c[1] + m[0][2] * c[2],
                m[1][0] * c[0] + m[1][1] * c[1] + m[1][2] * c[2],
                m[2][0] * c[0] + m[2][1] * c[1] + m[2][2] * c[2],
            ],
        }
        .map(|v| v.clamp(0.0, 1.0));
    }
    c
}

/// Apply brightness, contrast, saturate, sepia and hue-rotate, in that order,
/// to straight-alpha pixels. Alpha is untouched.
pub fn apply_color_filters(img: &mut RgbaImage, f: &Filters) {
    let steps = color_steps(f);
    if steps.is_empty() {
        return;
    }
    for px in img.pixels_mut() {
        let rgb = [
            px[0] as f64 / 255.0,
            px[1] as f64 / 255.0,
            px[2] as f64 / 255.0,
        ];
        let out = apply_steps(&steps, rgb);
        px[0] = (out[0] * 255.0).round() as u8;
        px[1] = (out[1] * 255.0).round() as u8;
        px[2] = (out[2] * 255.0).round() as u8;
    }
}

/// Gaussian blur with the CSS radius scaled to the target resolution.
pub fn apply_blur(img: RgbaImage, blur_px: f64, scale: f64) -> RgbaImage {
    let sigma = blur_px * scale;
    if sigma <= 0.0 || !sigma.is_finite() {
        return img;
    }
    image::imageops::blur(&img, sigma as f32)
}

fn boost_steps(boost: f64) -> [ColorStep; 2] {
    [
        ColorStep::Linear {
            slope: boost,
            intercept: 0.5 - 0.5 * boost,
        },
        ColorStep::Matrix(saturate_matrix(boost)),
    ]
}

/// The print micro-boost: contrast and saturation multiplied by `boost`,
/// applied to premultiplied RGBA (a `tiny_skia::Pixmap` buffer).
pub fn boost_premultiplied(data: &mut [u8], boost: f64) {
    if boost == 1.0 {
        return;
    }
    let steps = boost_steps(boost);
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            continue;
        }
        let af = a as f64 / 255.0;
        let rgb = [
            (px[0] as f64 / 255.0 / af).min(1.0),
            (px[1] as f64 / 255.0 / af).min(1.0),
            (px[2] as f64 / 255.0 / af).min(1.0),
        ];
        let out = apply_steps(&steps, rgb);
        px[0] = (out[0] * af * 255.0).round() as u8;
        px[1] = (out[1] * af * 255.0).round() as u8;
        px[2] = (out[2] * af * 255.0).round() as u8;
    }
}

/// The print boost on straight-alpha pixels, for bitmaps embedded in vector
/// output.
pub fn boost_straight(img: &mut RgbaImage, boost: f64) {
    if boost == 1.0 {
        return;
    }
    let steps = boost_steps(boost);
    for px in img.pixels_mut() {
        let out = apply_steps(
            &steps,
            [px[0] as f64 / 255.0, px[1] as f64 / 255.0, px[2] as f64 / 255.0],
        );
        px[0] = (out[0] * 255.0).round() as u8;
        px[1] = (out[1] * 255.0).round() as u8;
        px[2] = (out[2] * 255.0).round() as u8;
    }
}

/// The print boost on a single fill color. Alpha is kept.
pub fn boost_color(color: Color, boost: f64) -> Color {
    if boost == 1.0 {
        return color;
    }
    let [r, g, b] = apply_steps(&boost_steps(boost), [color.r, color.g, color.b]);
    Color { r, g, b, a: color.a }
}
