//! Caller-owned thumbnail cache.
//!
//! Entries are keyed by page id and stamped with a fingerprint of the page
//! subtree and the canvas. A lookup only hits when the fingerprint still
//! matches, so an edited page never serves a stale thumbnail even if the
//! caller forgets to call [`ThumbnailCache::invalidate`].

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::model::{CanvasConfig, Page};
use crate::renderer::{Renderer, Thumbnail};

struct CacheEntry {
    fingerprint: u64,
    thumbnail: Thumbnail,
}

#[derive(Default)]
pub struct ThumbnailCache {
    entries: HashMap<String, CacheEntry>,
}

/// Hash of everything that affects a page's pixels.
pub fn fingerprint(page: &Page, canvas: &CanvasConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    page.id.hash(&mut hasher);
    serde_json::to_vec(&page.to_wire())
        .unwrap_or_default()
        .hash(&mut hasher);
    canvas.width.to_bits().hash(&mut hasher);
    canvas.height.to_bits().hash(&mut hasher);
    canvas.dpi.to_bits().hash(&mut hasher);
    canvas.background_color.to_rgba8().hash(&mut hasher);
    hasher.finish()
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached thumbnail, if it was rendered from this exact page state.
    pub fn get(&self, page: &Page, canvas: &CanvasConfig) -> Option<&Thumbnail> {
        let entry = self.entries.get(&page.id)?;
        (entry.fingerprint == fingerprint(page, canvas)).then_some(&entry.thumbnail)
    }

    /// Drop the entry for `page_id`. Returns whether one existed.
    pub fn invalidate(&mut self, page_id: &str) -> bool {
        let removed = self.entries.remove(page_id).is_some();
        if removed {
            log::debug!("thumbnail for page '{}' invalidated", page_id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached thumbnail or render and store a fresh one.
    pub async fn generate(
        &mut self,
        renderer: &Renderer,
        page: &Page,
        canvas: &CanvasConfig,
    ) -> Result<&Thumbnail> {
        let fp = fingerprint(page, canvas);
        let slot = match self.entries.entry(page.id.clone()) {
            Entry::Occupied(mut o) => {
                if o.get().fingerprint != fp {
                    let thumbnail = renderer.thumbnail(page, canvas).await?;
                    o.insert(CacheEntry {
                        fingerprint: fp,
                        thumbnail,
                    });
                }
                o.into_mut()
            }
            Entry::Vacant(v) => {
                let thumbnail = renderer.thumbnail(page, canvas).await?;
                v.insert(CacheEntry {
                    fingerprint: fp,
                    thumbnail,
                })
            }
        };
        Ok(&slot.thumbnail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Project;

    fn project() -> Project {
        Project::from_json(
            r##"{"pages": [{"id": "p1", "type": "cover", "layout": "single", "cells": [
                {"id": "c", "elements": []}]}]}"##,
        )
        .unwrap()
    }

    #[test]
    fn test_fingerprint_tracks_page_and_canvas() {
        let p = project();
        let base = fingerprint(&p.pages[0], &p.canvas);
        assert_eq!(base, fingerprint(&p.pages[0], &p.canvas));

        let mut edited = p.pages[0].clone();
        edited.layout_id = "grid-2x2".to_string();
        assert_ne!(base, fingerprint(&edited, &p.canvas));

        let mut canvas = p.canvas.clone();
        canvas.width += 1.0;
        assert_ne!(base, fingerprint(&p.pages[0], &canvas));
    }

    #[tokio::test]
    async fn test_generate_get_invalidate() {
        let renderer = Renderer::new(crate::config::RenderConfig {
            load_system_fonts: false,
            ..Default::default()
        });
        let p = project();
        let mut cache = ThumbnailCache::new();
        assert!(cache.get(&p.pages[0], &p.canvas).is_none());

        let bytes = cache
            .generate(&renderer, &p.pages[0], &p.canvas)
            .await
            .unwrap()
            .bytes
            .clone();
        assert!(!bytes.is_empty());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&p.pages[0], &p.canvas).is_some());

        let mut edited = p.pages[0].clone();
        edited.background_color = Some(crate::style::Color::BLACK);
        assert!(cache.get(&edited, &p.canvas).is_none());

        assert!(cache.invalidate("p1"));
        assert!(!cache.invalidate("p1"));
        assert!(cache.is_empty());
    }
}
