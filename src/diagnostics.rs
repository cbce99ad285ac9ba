//! # Render Diagnostics
//!
//! Every rendering-stage problem that folio recovers from is recorded here and
//! mirrored to the log. Callers get the list back next to the output, so a
//! degraded page is visible without scraping logs.

use thiserror::Error;

/// A recovered, non-fatal rendering condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderWarning {
    /// A cell found no free grid position and got the fallback rect.
    #[error(
        "layout overflow on page '{page_id}': cell {cell_index} does not fit layout '{layout_id}', using fallback rect"
    )]
    LayoutOverflow {
        page_id: String,
        layout_id: String,
        cell_index: usize,
    },
    /// The page referenced a layout id missing from the catalog.
    #[error("page '{page_id}' uses unknown layout '{layout_id}', falling back to a single full-bleed cell")]
    UnsupportedLayout { page_id: String, layout_id: String },
    /// An image could not be fetched, decoded, or arrived too late.
    #[error("image '{}' failed to load: {reason}", truncate_uri(.uri))]
    ImageLoadFailed { uri: String, reason: String },
    /// An image was loaded but could not be composited.
    #[error("image element '{element_id}' skipped: {reason}")]
    ImageSkipped { element_id: String, reason: String },
    /// Missing position or size; defaults were applied.
    #[error("element '{element_id}' geometry defaulted: {detail}")]
    MalformedGeometry { element_id: String, detail: String },
    /// A value of exactly 1 in an element that otherwise uses pixels.
    #[error(
        "element '{element_id}' {axis} = {value} is read as a fraction of the cell, but the element also uses pixel values"
    )]
    AmbiguousCoordinate {
        element_id: String,
        axis: &'static str,
        value: f64,
    },
    /// A blend mode name that no render target understands.
    #[error("element '{element_id}' has unknown blend mode '{value}', using normal")]
    UnknownBlendMode { element_id: String, value: String },
    /// An element type other than `text` or `image`.
    #[error("element '{element_id}' has unsupported type '{kind}'")]
    UnsupportedElement { element_id: String, kind: String },
    /// Text could not be painted (no font faces available).
    #[error("text element '{element_id}' not painted: {reason}")]
    TextSkipped { element_id: String, reason: String },
    /// The page sequence breaks the cover/content/final ordering.
    #[error("document structure: {0}")]
    Structure(String),
}

/// Data URIs can be megabytes long; keep log lines readable.
fn truncate_uri(uri: &str) -> String {
    if uri.len() <= 80 {
        uri.to_string()
    } else {
        let cut = uri
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= 60)
            .last()
            .unwrap_or(0);
        format!("{}...", &uri[..cut])
    }
}

/// An ordered list of warnings collected during one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<RenderWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, warning: RenderWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Append already-logged warnings from a sub-operation.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn image_failures(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, RenderWarning::ImageLoadFailed { .. }))
            .count()
    }

    pub fn overflows(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, RenderWarning::LayoutOverflow { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut d = Diagnostics::new();
        d.warn(RenderWarning::ImageLoadFailed {
            uri: "https://example.com/a.jpg".into(),
            reason: "404".into(),
        });
        d.warn(RenderWarning::LayoutOverflow {
            page_id: "p".into(),
            layout_id: "grid-2x2".into(),
            cell_index: 3,
        });
        assert_eq!(d.len(), 2);
        assert_eq!(d.image_failures(), 1);
        assert_eq!(d.overflows(), 1);
    }

    #[test]
    fn test_long_uri_truncated_in_message() {
        let uri = format!("data:image/png;base64,{}", "A".repeat(500));
        let msg = RenderWarning::ImageLoadFailed {
            uri,
            reason: "bad".into(),
        }
        .to_string();
        assert!(msg.len() < 120);
        assert!(msg.contains("..."));
        assert!(msg.ends_with("failed to load: bad"));
    }

    #[test]
    fn test_messages_name_the_subject() {
        let w = RenderWarning::LayoutOverflow {
            page_id: "p1".into(),
            layout_id: "mosaic".into(),
            cell_index: 4,
        };
        assert_eq!(
            w.to_string(),
            "layout overflow on page 'p1': cell 4 does not fit layout 'mosaic', using fallback rect"
        );
        assert_eq!(
            RenderWarning::Structure("two covers".into()).to_string(),
            "document structure: two covers"
        );
    }
}
