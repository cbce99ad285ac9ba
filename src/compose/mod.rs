//! # Image Composition
//!
//! The pixel pipeline every render target runs for an image element:
//! cover-fit crop → resample to the destination pixel size → color filters
//! → blur. The result is a straight-alpha RGBA bitmap the exact size of the
//! destination. Opacity, blend mode and the geometric transform are left to
//! the target, which applies them while compositing.
//!
//! Elements are often larger than their cell. [`compose_region`] builds only
//! the part that can show, so the bitmap never outgrows what is on the page.

pub mod cover;
pub mod filters;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::layout::Rect;
use cover::compute_source_crop;
use filters::Filters;

/// Largest bitmap side the composer will allocate.
pub const MAX_DIMENSION: u32 = 16_384;

/// Destination pixel size for a rect of `width` × `height` canvas pixels at
/// `scale`. `None` when the rect collapses below one pixel.
pub fn dest_pixels(width: f64, height: f64, scale: f64) -> Option<(u32, u32)> {
    let w = (width * scale).round();
    let h = (height * scale).round();
    if !(w >= 1.0 && h >= 1.0) {
        return None;
    }
    Some((
        (w as u32).min(MAX_DIMENSION),
        (h as u32).min(MAX_DIMENSION),
    ))
}

/// Crop `source` to cover `dest_w` × `dest_h`, resample, then filter.
/// `scale` converts the blur radius from canvas pixels to destination pixels.
pub fn compose_image(
    source: &RgbaImage,
    dest_w: u32,
    dest_h: u32,
    filters: &Filters,
    scale: f64,
) -> Option<RgbaImage> {
    let crop = compute_source_crop(
        source.width() as f64,
        source.height() as f64,
        dest_w as f64,
        dest_h as f64,
    )?;
    let (x, y, w, h) = crop.to_pixels(source.width(), source.height());
    let cropped = imageops::crop_imm(source, x, y, w, h).to_image();
    let mut out = if (w, h) == (dest_w, dest_h) {
        cropped
    } else {
        imageops::resize(&cropped, dest_w, dest_h, FilterType::Triangle)
    };
    filters::apply_color_filters(&mut out, filters);
    Some(filters::apply_blur(out, filters.blur, scale))
}

/// Bitmap pixels per canvas pixel for an element drawn at `scale`. An element
/// shrunk by its own scale filter needs fewer pixels.
pub fn element_density(scale: f64, filters: &Filters) -> f64 {
    let k = filters.scale.abs();
    if k > 0.0 && k < 1.0 {
        scale * k
    } else {
        scale
    }
}

/// A composed part of an element. `local` is where the bitmap goes, in the
/// element's own canvas pixels (origin at its top-left corner, before the
/// element transform).
#[derive(Debug, Clone)]
pub struct ComposedRegion {
    pub image: RgbaImage,
    pub local: Rect,
}

/// [`compose_image`] for a `width` × `height` element, restricted to the
/// element-local area `visible`, at `density` bitmap pixels per canvas pixel.
///
/// The result always lies inside the element and matches the corresponding
/// part of the full composition: the fully visible case goes through
/// [`compose_image`] unchanged.
pub fn compose_region(
    source: &RgbaImage,
    width: f64,
    height: f64,
    visible: &Rect,
    filters: &Filters,
    density: f64,
) -> Option<ComposedRegion> {
    let full = Rect::new(0.0, 0.0, width, height);
    // Blur reads pixels from outside the visible area.
    let margin = 3.0 * filters.blur.max(0.0);
    let visible = Rect::new(
        visible.x - margin,
        visible.y - margin,
        visible.width + 2.0 * margin,
        visible.height + 2.0 * margin,
    )
    .intersection(&full)?;

    if visible.contains(&full) {
        let (dw, dh) = dest_pixels(width, height, density)?;
        let image = compose_image(source, dw, dh, filters, density)?;
        return Some(ComposedRegion { image, local: full });
    }

    let crop = compute_source_crop(
        source.width() as f64,
        source.height() as f64,
        width,
        height,
    )?;
    let (cx, cy, cw, ch) = crop.to_pixels(source.width(), source.height());
    let (vw, vh) = dest_pixels(visible.width, visible.height, density)?;

    // Whole source pixels of the crop that the visible area touches.
    let span = |start: f64, end: f64, extent: f64, n: u32| {
        let lo = ((start / extent * n as f64).floor().max(0.0) as u32).min(n - 1);
        let hi = ((end / extent * n as f64).ceil() as u32).clamp(lo + 1, n);
        (lo, hi)
    };
    let (x0, x1) = span(visible.x, visible.right(), width, cw);
    let (y0, y1) = span(visible.y, visible.bottom(), height, ch);

    let (mut image, local) = if x1 - x0 >= vw && y1 - y0 >= vh {
        // Downsampling: resample whole source pixels. The overhang past the
        // visible area is under one bitmap pixel.
        let local = Rect::new(
            x0 as f64 / cw as f64 * width,
            y0 as f64 / ch as f64 * height,
            (x1 - x0) as f64 / cw as f64 * width,
            (y1 - y0) as f64 / ch as f64 * height,
        );
        let (dw, dh) = dest_pixels(local.width, local.height, density)?;
        let part = imageops::crop_imm(source, cx + x0, cy + y0, x1 - x0, y1 - y0).to_image();
        let image = if (x1 - x0, y1 - y0) == (dw, dh) {
            part
        } else {
            imageops::resize(&part, dw, dh, FilterType::Triangle)
        };
        (image, local)
    } else {
        // Upsampling: a few source pixels spread over the visible area.
        let view = imageops::crop_imm(source, cx, cy, cw, ch);
        let image = RgbaImage::from_fn(vw, vh, |i, j| {
            let u = (visible.x + (i as f64 + 0.5) / vw as f64 * visible.width) / width;
            let v = (visible.y + (j as f64 + 0.5) / vh as f64 * visible.height) / height;
            imageops::sample_bilinear(&*view, u.clamp(0.0, 1.0) as f32, v.clamp(0.0, 1.0) as f32)
                .unwrap_or(Rgba([0, 0, 0, 0]))
        });
        (image, visible)
    };

    filters::apply_color_filters(&mut image, filters);
    let image = filters::apply_blur(image, filters.blur, density);
    Some(ComposedRegion { image, local })
}

/// Cover-fit without filters, for page background images.
pub fn cover_image(source: &RgbaImage, dest_w: u32, dest_h: u32) -> Option<RgbaImage> {
    compose_image(source, dest_w, dest_h, &Filters::default(), 1.0)
}
