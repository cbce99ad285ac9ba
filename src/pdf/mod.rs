//! # PDF Serializer
//!
//! A from-scratch PDF 1.7 writer. The export paginator hands it finished
//! pages: a content stream, the images it references as `/Im0`, `/Im1`, ...
//! and the graphics states it references as `/GS0`, `/GS1`, ... Fonts are the
//! two standard Type1 Helvetica faces (`/F0` regular, `/F1` bold), which need
//! no embedding.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```

pub mod metrics;

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

/// An RGB image with optional soft mask, 8 bits per component.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    /// width * height * 3 bytes.
    pub rgb: Vec<u8>,
    /// width * height bytes. `None` if fully opaque.
    pub alpha: Option<Vec<u8>>,
}

impl PdfImage {
    /// Split straight-alpha RGBA into RGB plus an alpha mask when needed.
    pub fn from_rgba(img: &image::RgbaImage) -> Self {
        let pixel_count = (img.width() * img.height()) as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        let mut has_transparency = false;
        for pixel in img.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel[3]);
            if pixel[3] != 255 {
                has_transparency = true;
            }
        }
        Self {
            width: img.width(),
            height: img.height(),
            rgb,
            alpha: if has_transparency { Some(alpha) } else { None },
        }
    }
}

/// Constant opacity and blend mode, written as an ExtGState.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub fill_alpha: f64,
    pub blend_mode: &'static str,
}

/// One finished output page. Dimensions are in points.
#[derive(Debug, Clone, Default)]
pub struct PdfPage {
    pub width: f64,
    pub height: f64,
    /// `[x0, y0, x1, y1]` of the trim box when the page carries bleed.
    pub trim_box: Option<[f64; 4]>,
    pub content: String,
    pub images: Vec<PdfImage>,
    pub graphics_states: Vec<GraphicsState>,
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(data, "<< {} /Length {} >>\nstream\n", dict_entries, payload.len());
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write finished pages to a PDF byte vector.
    pub fn write(&self, pages: &[PdfPage], metadata: &Metadata) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        builder.push(vec![]);
        builder.push(vec![]);
        builder.push(vec![]);

        let regular = builder.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        let bold = builder.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        let font_resources = format!("/F0 {} 0 R /F1 {} 0 R", regular, bold);

        let mut page_obj_ids: Vec<usize> = Vec::new();
        for page in pages {
            let image_ids: Vec<usize> = page
                .images
                .iter()
                .map(|img| Self::write_image_xobject(&mut builder, img))
                .collect();
            let gs_ids: Vec<usize> = page
                .graphics_states
                .iter()
                .map(|gs| {
                    builder.push(
                        format!(
                            "<< /Type /ExtGState /ca {} /CA {} /BM /{} >>",
                            fmt_num(gs.fill_alpha),
                            fmt_num(gs.fill_alpha),
                            gs.blend_mode
                        )
                        .into_bytes(),
                    )
                })
                .collect();

            let compressed = compress_to_vec_zlib(page.content.as_bytes(), 6);
            let content_obj_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let mut resources = format!("/Font << {} >>", font_resources);
            if !image_ids.is_empty() {
                let entries: Vec<String> = image_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                    .collect();
                let _ = write!(resources, " /XObject << {} >>", entries.join(" "));
            }
            if !gs_ids.is_empty() {
                let entries: Vec<String> = gs_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| format!("/GS{} {} 0 R", i, id))
                    .collect();
                let _ = write!(resources, " /ExtGState << {} >>", entries.join(" "));
            }
            let trim = page
                .trim_box
                .map(|[x0, y0, x1, y1]| {
                    format!(
                        " /TrimBox [{} {} {} {}] /BleedBox [0 0 {} {}]",
                        fmt_num(x0),
                        fmt_num(y0),
                        fmt_num(x1),
                        fmt_num(y1),
                        fmt_num(page.width),
                        fmt_num(page.height)
                    )
                })
                .unwrap_or_default();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}]{} \
                 /Contents {} 0 R /Resources << {} >> >>",
                fmt_num(page.width),
                fmt_num(page.height),
                trim,
                content_obj_id,
                resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        // Write Catalog (object 1)
        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        // Write Pages tree (object 2)
        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", escape_pdf_string(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject ({}) ", escape_pdf_string(subject));
        }
        let _ = write!(
            info,
            "/Producer (folio {}) /Creator (folio) >>",
            env!("CARGO_PKG_VERSION")
        );
        let info_obj_id = builder.push(info.into_bytes());

        Self::serialize(&builder, info_obj_id)
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &PdfImage) -> usize {
        // Write SMask first if alpha channel exists
        let smask_id = image.alpha.as_ref().map(|alpha_data| {
            let compressed_alpha = compress_to_vec_zlib(alpha_data, 6);
            builder.push_stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                    image.width, image.height
                ),
                &compressed_alpha,
            )
        });

        let smask_ref = smask_id
            .map(|id| format!(" /SMask {} 0 R", id))
            .unwrap_or_default();
        let compressed_rgb = compress_to_vec_zlib(&image.rgb, 6);
        builder.push_stream(
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode{}",
                image.width, image.height, smask_ref
            ),
            &compressed_rgb,
        )
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        // Header
        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

/// Format a coordinate with up to three decimals and no trailing zeros.
pub fn fmt_num(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape special characters in a PDF string.
pub fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Encode text as a WinAnsi PDF literal string body. Characters outside the
/// encoding become `?`.
pub fn encode_winansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match unicode_to_winansi(ch) {
            Some(b'\\') => out.push_str("\\\\"),
            Some(b'(') => out.push_str("\\("),
            Some(b')') => out.push_str("\\)"),
            Some(b) if b.is_ascii() => out.push(b as char),
            Some(b) => {
                let _ = write!(out, "\\{:03o}", b);
            }
            None => out.push('?'),
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is based on Windows-1252. Most codepoints in
/// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
/// contains special mappings for smart quotes, bullets, dashes, etc.
pub fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}
