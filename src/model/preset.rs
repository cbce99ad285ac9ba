//! Static album format presets.
//!
//! A preset fixes the editing canvas (pixels) and the physical trim size
//! (centimeters) of a product. The canvas is what the editor and every
//! renderer lay out against; the physical size only decides the print page
//! dimensions and the print scale factor.

/// One purchasable album format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Canvas pixels per inch at the physical size.
    pub dpi: f64,
    pub background: &'static str,
    pub width_cm: f64,
    pub height_cm: f64,
    pub cover_layout: &'static str,
    pub content_layout: &'static str,
    pub final_layout: &'static str,
}

pub const PRESETS: &[LayoutPreset] = &[
    LayoutPreset {
        id: "square-20",
        name: "Square 20x20 cm",
        canvas_width: 800.0,
        canvas_height: 800.0,
        dpi: 101.6,
        background: "#ffffff",
        width_cm: 20.0,
        height_cm: 20.0,
        cover_layout: "single",
        content_layout: "grid-2x2",
        final_layout: "single",
    },
    LayoutPreset {
        id: "square-30",
        name: "Square 30x30 cm",
        canvas_width: 900.0,
        canvas_height: 900.0,
        dpi: 76.2,
        background: "#ffffff",
        width_cm: 30.0,
        height_cm: 30.0,
        cover_layout: "single",
        content_layout: "mosaic",
        final_layout: "single",
    },
    LayoutPreset {
        id: "landscape-28x21",
        name: "Landscape 28x21 cm",
        canvas_width: 1120.0,
        canvas_height: 840.0,
        dpi: 101.6,
        background: "#ffffff",
        width_cm: 28.0,
        height_cm: 21.0,
        cover_layout: "hero-left",
        content_layout: "two-columns",
        final_layout: "single",
    },
    LayoutPreset {
        id: "portrait-21x28",
        name: "Portrait 21x28 cm",
        canvas_width: 840.0,
        canvas_height: 1120.0,
        dpi: 101.6,
        background: "#ffffff",
        width_cm: 21.0,
        height_cm: 28.0,
        cover_layout: "hero-top",
        content_layout: "two-rows",
        final_layout: "single",
    },
    LayoutPreset {
        id: "mini-15x10",
        name: "Mini 15x10 cm",
        canvas_width: 600.0,
        canvas_height: 400.0,
        dpi: 101.6,
        background: "#faf7f2",
        width_cm: 15.0,
        height_cm: 10.0,
        cover_layout: "single",
        content_layout: "three-columns",
        final_layout: "single",
    },
];

pub fn find_preset(id: &str) -> Option<&'static LayoutPreset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Parse a workspace size label such as `"20x20"`, `"28 x 21 cm"` or
/// `"21×28"` into centimeters.
pub fn parse_workspace_size(label: &str) -> Option<(f64, f64)> {
    let lower = label.trim().to_ascii_lowercase();
    let cleaned = lower.trim_end_matches("cm").trim();
    let (w, h) = cleaned
        .split_once('x')
        .or_else(|| cleaned.split_once('×'))?;
    let w: f64 = w.trim().trim_end_matches("cm").trim().parse().ok()?;
    let h: f64 = h.trim().trim_end_matches("cm").trim().parse().ok()?;
    if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() {
        Some((w, h))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_unique_ids() {
        for (i, a) in PRESETS.iter().enumerate() {
            for b in &PRESETS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_preset_dpi_matches_physical_size() {
        for p in PRESETS {
            let inches = p.width_cm / 2.54;
            assert!((p.canvas_width / inches - p.dpi).abs() < 0.5, "{}", p.id);
        }
    }

    #[test]
    fn test_find_preset() {
        assert_eq!(find_preset("square-20").unwrap().width_cm, 20.0);
        assert!(find_preset("nope").is_none());
    }

    #[test]
    fn test_parse_workspace_size() {
        assert_eq!(parse_workspace_size("20x20"), Some((20.0, 20.0)));
        assert_eq!(parse_workspace_size("28 x 21 cm"), Some((28.0, 21.0)));
        assert_eq!(parse_workspace_size("21×28"), Some((21.0, 28.0)));
        assert_eq!(parse_workspace_size("large"), None);
        assert_eq!(parse_workspace_size("0x10"), None);
    }
}
