//! Rendered-page cache shared by the host and the render worker

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::RenderParams;
use super::types::PageData;
use crate::theme::ThemeId;
use crate::view_state::Rotation;

/// Everything that changes a page's pixels.
///
/// Contrast and brightness are display-time filters and stay out of the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub page: usize,
    /// Raster scale in thousandths so the key hashes
    pub scale_millis: u32,
    pub rotation: Rotation,
    pub theme: ThemeId,
}

impl CacheKey {
    #[must_use]
    pub fn new(page: usize, params: &RenderParams) -> Self {
        Self {
            page,
            scale_millis: (params.raster_scale() * 1000.0).round() as u32,
            rotation: params.rotation,
            theme: params.theme,
        }
    }
}

/// Bounded LRU of finished pages; at least one page is always retained
pub struct PageCache {
    pages: LruCache<CacheKey, Arc<PageData>>,
}

impl PageCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: LruCache::new(capacity),
        }
    }

    /// Look up a page rendered with matching pixel parameters
    pub fn lookup(&mut self, page: usize, params: &RenderParams) -> Option<Arc<PageData>> {
        self.pages.get(&CacheKey::new(page, params)).map(Arc::clone)
    }

    /// Keep a finished page and hand back the shared copy
    pub fn store(&mut self, params: &RenderParams, data: PageData) -> Arc<PageData> {
        let key = CacheKey::new(data.page_num, params);
        let shared = Arc::new(data);
        self.pages.put(key, Arc::clone(&shared));
        shared
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::theme::{PixelTransform, Rgb};

    fn params() -> RenderParams {
        RenderParams {
            zoom: 1.0,
            render_scale: 1.5,
            rotation: Rotation::Deg0,
            theme: ThemeId::Dark,
            page_fill: Rgb::WHITE,
            transform: PixelTransform::Invert,
        }
    }

    fn page(page_num: usize) -> PageData {
        PageData {
            image: RgbaImage::new(4, 4),
            page_num,
            scale_factor: 1.5,
            rotation: Rotation::Deg0,
            theme: ThemeId::Dark,
        }
    }

    #[test]
    fn stored_page_is_found_again() {
        let mut cache = PageCache::new(4);
        let stored = cache.store(&params(), page(2));
        let found = cache.lookup(2, &params()).unwrap();
        assert!(Arc::ptr_eq(&stored, &found));
        assert!(cache.lookup(1, &params()).is_none());
    }

    #[test]
    fn least_recently_used_page_goes_first() {
        let mut cache = PageCache::new(2);
        cache.store(&params(), page(1));
        cache.store(&params(), page(2));
        // Touch page 1 so page 2 is the eviction candidate.
        let _ = cache.lookup(1, &params());
        cache.store(&params(), page(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(1, &params()).is_some());
        assert!(cache.lookup(2, &params()).is_none());
    }

    #[test]
    fn pixel_parameters_change_the_key() {
        let base = CacheKey::new(1, &params());
        let variants = [
            RenderParams { zoom: 1.25, ..params() },
            RenderParams { rotation: Rotation::Deg90, ..params() },
            RenderParams { theme: ThemeId::Sepia, ..params() },
        ];
        for variant in &variants {
            assert_ne!(base, CacheKey::new(1, variant));
        }
    }

    #[test]
    fn zero_capacity_still_holds_one_page() {
        let mut cache = PageCache::new(0);
        cache.store(&params(), page(1));
        cache.store(&params(), page(2));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
