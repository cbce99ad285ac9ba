//! # Style System
//!
//! Colors and text styling for page elements. The editor stores styles as
//! CSS-ish strings (`"#ff0000"`, `"rgba(0,0,0,0.5)"`, `"bold"`, `"24px"`);
//! this module turns them into concrete values once, so that every render
//! target reads the same numbers.

use serde::{Deserialize, Serialize};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    pub fn hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        let r = channel(0)?;
        let g = channel(2)?;
        let b = channel(4)?;
        let a = if expanded.len() == 8 { channel(6)? } else { 255 };
        Some(Self::rgba8(r, g, b, a))
    }

    /// Parse a CSS color string: hex, `rgb()`, `rgba()` or a small set of
    /// named colors. Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_ascii_lowercase();
        if s.starts_with('#') {
            return Self::hex(&s);
        }
        if let Some(args) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args
                .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() != 3 && parts.len() != 4 {
                return None;
            }
            let channel = |p: &str| -> Option<f64> {
                if let Some(pct) = p.strip_suffix('%') {
                    pct.parse::<f64>().ok().map(|v| (v / 100.0).clamp(0.0, 1.0))
                } else {
                    p.parse::<f64>().ok().map(|v| (v / 255.0).clamp(0.0, 1.0))
                }
            };
            let alpha = match parts.get(3) {
                Some(p) => match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f64>().ok()? / 100.0,
                    None => p.parse::<f64>().ok()?,
                },
                None => 1.0,
            };
            return Some(Self {
                r: channel(parts[0])?,
                g: channel(parts[1])?,
                b: channel(parts[2])?,
                a: alpha.clamp(0.0, 1.0),
            });
        }
        match s.as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "transparent" => Some(Self::TRANSPARENT),
            "red" => Some(Self::rgba8(255, 0, 0, 255)),
            "green" => Some(Self::rgba8(0, 128, 0, 255)),
            "blue" => Some(Self::rgba8(0, 0, 255, 255)),
            "gray" | "grey" => Some(Self::rgba8(128, 128, 128, 255)),
            "yellow" => Some(Self::rgba8(255, 255, 0, 255)),
            "orange" => Some(Self::rgba8(255, 165, 0, 255)),
            "pink" => Some(Self::rgba8(255, 192, 203, 255)),
            "purple" => Some(Self::rgba8(128, 0, 128, 255)),
            _ => None,
        }
    }

    /// Parse with a fallback, logging when the input is not understood.
    pub fn parse_or(input: &str, fallback: Color) -> Self {
        Self::parse(input).unwrap_or_else(|| {
            log::warn!("unrecognized color {:?}, using fallback", input);
            fallback
        })
    }

    /// `#rrggbb` (alpha is dropped).
    pub fn to_hex(&self) -> String {
        let to8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", to8(self.r), to8(self.g), to8(self.b))
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let to8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [to8(self.r), to8(self.g), to8(self.b), to8(self.a)]
    }

    pub fn is_visible(&self) -> bool {
        self.a > 0.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

impl TextAlign {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "right" | "end" => TextAlign::Right,
            "center" => TextAlign::Center,
            "justify" => TextAlign::Justify,
            _ => TextAlign::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Right => "right",
            TextAlign::Center => "center",
            TextAlign::Justify => "justify",
        }
    }
}

/// Resolved text style: all values concrete, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub font_size: f64,
    pub font_family: String,
    /// CSS weight, 100-900.
    pub font_weight: u16,
    pub text_align: TextAlign,
    pub background_color: Option<Color>,
    /// Multiplier of font size.
    pub line_height: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            font_size: 24.0,
            font_family: "Arial".to_string(),
            font_weight: 400,
            text_align: TextAlign::Center,
            background_color: None,
            line_height: 1.2,
        }
    }
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight >= 600
    }
}

/// Parse a CSS font weight: numeric (`700`, `"700"`) or keyword.
pub fn parse_font_weight(s: &str) -> u16 {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "normal" | "regular" => 400,
        "bold" => 700,
        "bolder" => 800,
        "lighter" => 300,
        _ => s
            .parse::<f64>()
            .map(|v| (v.round() as i64).clamp(100, 900) as u16)
            .unwrap_or(400),
    }
}

/// Parse a CSS length in pixels: `24`, `"24px"`, `"24"`.
pub fn parse_px(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix("px").unwrap_or(s).trim();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.002
    }

    #[test]
    fn test_hex_six_digits() {
        let c = Color::hex("#ff8000").unwrap();
        assert!(approx(c.r, 1.0));
        assert!(approx(c.g, 128.0 / 255.0));
        assert!(approx(c.b, 0.0));
        assert!(approx(c.a, 1.0));
    }

    #[test]
    fn test_hex_short_and_alpha() {
        let c = Color::hex("#f00").unwrap();
        assert_eq!(c.to_rgba8(), [255, 0, 0, 255]);
        let c = Color::hex("#00000080").unwrap();
        assert_eq!(c.to_rgba8(), [0, 0, 0, 128]);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Color::hex("#12").is_none());
        assert!(Color::hex("#zzzzzz").is_none());
    }

    #[test]
    fn test_rgb_functions() {
        assert_eq!(Color::parse("rgb(255, 0, 0)").unwrap().to_rgba8(), [255, 0, 0, 255]);
        assert_eq!(
            Color::parse("rgba(0, 0, 255, 0.5)").unwrap().to_rgba8(),
            [0, 0, 255, 128]
        );
        assert_eq!(Color::parse("rgb(100% 0% 0%)").unwrap().to_rgba8(), [255, 0, 0, 255]);
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(Color::parse("White"), Some(Color::WHITE));
        assert_eq!(Color::parse("transparent"), Some(Color::TRANSPARENT));
        assert!(Color::parse("no-such-color").is_none());
    }

    #[test]
    fn test_parse_or_falls_back() {
        assert_eq!(Color::parse_or("garbage", Color::WHITE), Color::WHITE);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(Color::rgba8(18, 52, 86, 255).to_hex(), "#123456");
    }

    #[test]
    fn test_font_weight() {
        assert_eq!(parse_font_weight("bold"), 700);
        assert_eq!(parse_font_weight("normal"), 400);
        assert_eq!(parse_font_weight("600"), 600);
        assert_eq!(parse_font_weight("1200"), 900);
        assert_eq!(parse_font_weight("heavy-ish"), 400);
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("24px"), Some(24.0));
        assert_eq!(parse_px(" 18 "), Some(18.0));
        assert_eq!(parse_px("large"), None);
    }

    #[test]
    fn test_text_align() {
        assert_eq!(TextAlign::parse("CENTER"), TextAlign::Center);
        assert_eq!(TextAlign::parse("end"), TextAlign::Right);
        assert_eq!(TextAlign::parse("weird"), TextAlign::Left);
    }
}
