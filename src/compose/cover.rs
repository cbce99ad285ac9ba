//! Cover-fit crop math (CSS `object-fit: cover`).

/// Source-image region to draw into the whole destination rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceCrop {
    pub sx: f64,
    pub sy: f64,
    pub sw: f64,
    pub sh: f64,
}

impl SourceCrop {
    /// Integer pixel bounds inside a `natural_w` × `natural_h` image.
    pub fn to_pixels(&self, natural_w: u32, natural_h: u32) -> (u32, u32, u32, u32) {
        let x = (self.sx.round() as u32).min(natural_w.saturating_sub(1));
        let y = (self.sy.round() as u32).min(natural_h.saturating_sub(1));
        let w = (self.sw.round() as u32).clamp(1, (natural_w - x).max(1));
        let h = (self.sh.round() as u32).clamp(1, (natural_h - y).max(1));
        (x, y, w, h)
    }
}

/// Compute the centered crop that scales the source to cover the destination
/// while keeping its aspect ratio. `None` when either size is degenerate; the
/// caller skips the draw.
pub fn compute_source_crop(
    natural_width: f64,
    natural_height: f64,
    dest_width: f64,
    dest_height: f64,
) -> Option<SourceCrop> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !(valid(natural_width) && valid(natural_height) && valid(dest_width) && valid(dest_height)) {
        log::debug!(
            "cover crop skipped: source {}x{}, destination {}x{}",
            natural_width,
            natural_height,
            dest_width,
            dest_height
        );
        return None;
    }

    let dest_ratio = dest_width / dest_height;
    let src_ratio = natural_width / natural_height;

    let (sw, sh) = if dest_ratio > src_ratio {
        (natural_width, natural_width / dest_ratio)
    } else {
        (natural_height * dest_ratio, natural_height)
    };
    let sw = sw.min(natural_width);
    let sh = sh.min(natural_height);
    let sx = ((natural_width - sw) / 2.0).max(0.0);
    let sy = ((natural_height - sh) / 2.0).max(0.0);

    Some(SourceCrop { sx, sy, sw, sh })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(640.0, 480.0)]
    #[case(1.0, 1.0)]
    #[case(3000.0, 1000.0)]
    fn test_matching_aspect_is_full_source(#[case] w: f64, #[case] h: f64) {
        let crop = compute_source_crop(w, h, w, h).unwrap();
        assert_eq!(crop, SourceCrop { sx: 0.0, sy: 0.0, sw: w, sh: h });
    }

    #[rstest]
    #[case(4000.0, 3000.0, 200.0, 200.0)]
    #[case(800.0, 1200.0, 300.0, 100.0)]
    #[case(100.0, 100.0, 16.0, 9.0)]
    #[case(1920.0, 1080.0, 1.0, 1000.0)]
    fn test_crop_aspect_matches_destination(
        #[case] nw: f64,
        #[case] nh: f64,
        #[case] dw: f64,
        #[case] dh: f64,
    ) {
        let crop = compute_source_crop(nw, nh, dw, dh).unwrap();
        assert!((crop.sw / crop.sh - dw / dh).abs() < 1e-9);
        assert!(crop.sx >= 0.0 && crop.sy >= 0.0);
        assert!(crop.sx + crop.sw <= nw + 1e-9);
        assert!(crop.sy + crop.sh <= nh + 1e-9);
    }

    #[test]
    fn test_wide_destination_crops_vertically_centered() {
        let crop = compute_source_crop(400.0, 400.0, 200.0, 100.0).unwrap();
        assert_eq!(crop, SourceCrop { sx: 0.0, sy: 100.0, sw: 400.0, sh: 200.0 });
    }

    #[test]
    fn test_tall_destination_crops_horizontally_centered() {
        let crop = compute_source_crop(400.0, 200.0, 100.0, 100.0).unwrap();
        assert_eq!(crop, SourceCrop { sx: 100.0, sy: 0.0, sw: 200.0, sh: 200.0 });
    }

    #[rstest]
    #[case(0.0, 100.0, 10.0, 10.0)]
    #[case(100.0, 100.0, 0.0, 10.0)]
    #[case(100.0, 100.0, 10.0, -5.0)]
    #[case(f64::NAN, 100.0, 10.0, 10.0)]
    fn test_degenerate_sizes_skip(#[case] nw: f64, #[case] nh: f64, #[case] dw: f64, #[case] dh: f64) {
        assert!(compute_source_crop(nw, nh, dw, dh).is_none());
    }

    #[test]
    fn test_to_pixels_stays_in_bounds() {
        let crop = compute_source_crop(101.0, 50.0, 10.0, 10.0).unwrap();
        let (x, y, w, h) = crop.to_pixels(101, 50);
        assert!(x + w <= 101);
        assert!(y + h <= 50);
        assert_eq!(h, 50);
    }
}
