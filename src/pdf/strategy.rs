//! Paginated raster strategy for PDF documents

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::engine::PdfEngine;
use super::request::{RenderParams as RasterParams, RenderResponse};
use super::service::{PageRequest, RenderService};
use super::types::{DocumentInfo, PageData};
use crate::error::{Result, ViewerError};
use crate::format::{Document, Format};
use crate::strategy::{
    Phase, RenderParams, RenderStrategy, StrategyEvent, invalid_state,
};
use crate::surface::{Presentation, Surface};
use crate::task::TaskSlot;
use crate::view_state::Invalidation;

pub struct PdfStrategy {
    engine: Arc<dyn PdfEngine>,
    render_scale: f32,
    cache_size: usize,
    phase: Phase,
    loader: TaskSlot<Result<DocumentInfo>>,
    bytes: Option<Arc<[u8]>>,
    info: Option<DocumentInfo>,
    service: Option<RenderService>,
    /// Page whose render is in flight
    rendering_page: Option<usize>,
    surface: Option<Arc<PageData>>,
    events: Vec<StrategyEvent>,
}

impl PdfStrategy {
    pub fn new(engine: Arc<dyn PdfEngine>, render_scale: f32, cache_size: usize) -> Self {
        Self {
            engine,
            render_scale,
            cache_size,
            phase: Phase::Unloaded,
            loader: TaskSlot::new("pdf-load"),
            bytes: None,
            info: None,
            service: None,
            rendering_page: None,
            surface: None,
            events: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.info.as_ref().map_or(0, |info| info.page_count)
    }

    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.info.as_ref()
    }

    /// Queue a render of `page` (1-indexed), superseding any in-flight one
    pub fn render_page(&mut self, page: usize, params: &RenderParams) -> Result<()> {
        if !self.phase.is_loaded() {
            return Err(invalid_state(Format::Pdf, "render", self.phase));
        }
        let total = self.page_count();
        if page == 0 || page > total {
            return Err(ViewerError::Range { page, total });
        }
        let Some(service) = self.service.as_mut() else {
            return Err(invalid_state(Format::Pdf, "render", self.phase));
        };

        let raster = RasterParams {
            zoom: params.zoom,
            render_scale: self.render_scale,
            rotation: params.rotation,
            theme: params.theme.theme,
            page_fill: params.theme.page_fill,
            transform: params.theme.pixel_transform,
        };

        match service.request_page(page, raster) {
            PageRequest::Cached(data) => {
                debug!("Page {page} served from cache");
                self.surface = Some(data);
                self.rendering_page = None;
                self.phase = Phase::Ready;
                self.events.push(StrategyEvent::Rendered { page });
            }
            PageRequest::Queued(id) => {
                debug!("Rendering page {page} as {id:?}");
                self.rendering_page = Some(page);
                self.phase = Phase::Rendering;
            }
        }
        Ok(())
    }

    fn finish_load(&mut self, result: Result<DocumentInfo>) {
        let info = match result {
            Ok(info) => info,
            Err(e) => return self.fail_load(e),
        };
        let Some(bytes) = self.bytes.clone() else {
            return self.fail_load(ViewerError::Load("document released during load".into()));
        };

        match RenderService::spawn(Arc::clone(&self.engine), bytes, self.cache_size) {
            Ok(service) => {
                info!(
                    "PDF loaded: {} pages{}",
                    info.page_count,
                    info.title
                        .as_deref()
                        .map(|t| format!(" ({t})"))
                        .unwrap_or_default()
                );
                self.service = Some(service);
                self.phase = Phase::Ready;
                self.events.push(StrategyEvent::Loaded {
                    page_count: info.page_count,
                    title: info.title.clone(),
                    warnings: Vec::new(),
                });
                self.info = Some(info);
            }
            Err(e) => self.fail_load(ViewerError::Load(format!("cannot start renderer: {e}"))),
        }
    }

    fn fail_load(&mut self, error: ViewerError) {
        warn!("PDF load failed: {error}");
        self.phase = Phase::Failed;
        self.events.push(StrategyEvent::LoadFailed(error));
    }

    fn handle_response(&mut self, response: RenderResponse) {
        match response {
            RenderResponse::Rendered { data, .. } => {
                let page = data.page_num;
                self.surface = Some(data);
                self.rendering_page = None;
                self.phase = Phase::Ready;
                self.events.push(StrategyEvent::Rendered { page });
            }
            RenderResponse::Failed { page, fault, .. } => {
                warn!("Rendering page {page} failed: {fault}");
                self.rendering_page = None;
                self.phase = Phase::Failed;
                self.events
                    .push(StrategyEvent::RenderFailed(ViewerError::Engine(fault.to_string())));
            }
        }
    }

    fn drain(&mut self) -> Vec<StrategyEvent> {
        std::mem::take(&mut self.events)
    }
}

impl RenderStrategy for PdfStrategy {
    fn format(&self) -> Format {
        Format::Pdf
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn load(&mut self, document: &Document) -> Result<()> {
        if self.phase != Phase::Unloaded {
            return Err(invalid_state(Format::Pdf, "load", self.phase));
        }
        let bytes = document.shared_bytes();
        let engine = Arc::clone(&self.engine);
        let job_bytes = Arc::clone(&bytes);

        self.loader
            .spawn(move || {
                let doc = engine
                    .open(&job_bytes)
                    .map_err(|e| ViewerError::Load(e.to_string()))?;
                let page_count = doc.page_count();
                if page_count == 0 {
                    return Err(ViewerError::Load("document has no pages".into()));
                }
                Ok(DocumentInfo {
                    page_count,
                    title: doc.title(),
                })
            })
            .map_err(|e| ViewerError::Load(format!("cannot start loader: {e}")))?;

        debug!("Loading PDF {:?} ({} bytes)", document.name(), bytes.len());
        self.bytes = Some(bytes);
        self.phase = Phase::Loading;
        Ok(())
    }

    fn refresh(&mut self, params: &RenderParams, what: Invalidation) -> Result<()> {
        match what {
            // Contrast and brightness are display filters; pixels are unchanged.
            Invalidation::Filter => {
                if !self.phase.is_loaded() {
                    return Err(invalid_state(Format::Pdf, "restyle", self.phase));
                }
                self.events.push(StrategyEvent::Restyled);
                Ok(())
            }
            Invalidation::Page | Invalidation::Geometry | Invalidation::Palette => {
                self.render_page(params.page, params)
            }
        }
    }

    fn poll(&mut self) -> Vec<StrategyEvent> {
        if let Some(result) = self.loader.try_take() {
            self.finish_load(result);
        }
        let responses = self
            .service
            .as_mut()
            .map(RenderService::poll_responses)
            .unwrap_or_default();
        for response in responses {
            self.handle_response(response);
        }
        self.drain()
    }

    fn wait(&mut self, timeout: Duration) -> Vec<StrategyEvent> {
        let deadline = Instant::now() + timeout;
        if self.loader.is_pending() {
            if let Some(result) = self.loader.wait(timeout) {
                self.finish_load(result);
            }
        }
        if let Some(service) = self.service.as_mut() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Some(response) = service.wait_response(remaining) {
                self.handle_response(response);
            }
        }
        self.poll()
    }

    fn is_busy(&self) -> bool {
        self.loader.is_pending() || self.service.as_ref().is_some_and(RenderService::is_pending)
    }

    fn surface(&self) -> Option<Surface<'_>> {
        self.surface.as_deref().map(Surface::Raster)
    }

    fn presentation(&self, params: &RenderParams) -> Presentation {
        Presentation {
            background: params.theme.background,
            css_filter: params.theme.css_filter.clone(),
            // Zoom is already baked into the raster.
            scale: 1.0,
            transform_origin: "top center",
        }
    }

    fn teardown(&mut self) {
        self.loader.cancel();
        if let Some(mut service) = self.service.take() {
            service.shutdown();
        }
        self.surface = None;
        self.bytes = None;
        self.info = None;
        self.rendering_page = None;
        self.events.clear();
        self.phase = Phase::Unloaded;
    }
}

impl Drop for PdfStrategy {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakePdfEngine, pdf_document};
    use crate::theme::{self, ThemeId};
    use crate::view_state::Rotation;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn params(page: usize, theme: ThemeId) -> RenderParams {
        RenderParams {
            page,
            zoom: 1.0,
            rotation: Rotation::Deg0,
            theme: theme::resolve(theme, 1.0, 1.0),
        }
    }

    fn loaded(engine: FakePdfEngine, pages: usize) -> PdfStrategy {
        let mut strategy = PdfStrategy::new(Arc::new(engine), 1.0, 8);
        strategy.load(&pdf_document(pages)).unwrap();
        assert_eq!(strategy.phase(), Phase::Loading);
        let events = strategy.wait(TIMEOUT);
        assert!(matches!(
            events.as_slice(),
            [StrategyEvent::Loaded { page_count, .. }] if *page_count == pages
        ));
        strategy
    }

    #[test]
    fn load_reports_page_count_and_becomes_ready() {
        let strategy = loaded(FakePdfEngine::new(), 3);
        assert_eq!(strategy.phase(), Phase::Ready);
        assert_eq!(strategy.page_count(), 3);
    }

    #[test]
    fn invalid_payload_fails_load() {
        let mut strategy = PdfStrategy::new(Arc::new(FakePdfEngine::new()), 1.0, 8);
        let doc = Document::new("broken.pdf", Some("application/pdf"), b"not a pdf".to_vec());
        strategy.load(&doc).unwrap();
        let events = strategy.wait(TIMEOUT);
        assert!(matches!(
            events.as_slice(),
            [StrategyEvent::LoadFailed(ViewerError::Load(_))]
        ));
        assert_eq!(strategy.phase(), Phase::Failed);
    }

    #[test]
    fn render_before_load_is_rejected() {
        let mut strategy = PdfStrategy::new(Arc::new(FakePdfEngine::new()), 1.0, 8);
        let err = strategy
            .render_page(1, &params(1, ThemeId::Dark))
            .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidState { .. }));
    }

    #[test]
    fn out_of_range_page_is_range_error() {
        let mut strategy = loaded(FakePdfEngine::new(), 2);
        for page in [0, 3] {
            let err = strategy
                .render_page(page, &params(page, ThemeId::Dark))
                .unwrap_err();
            assert_eq!(err, ViewerError::Range { page, total: 2 });
        }
    }

    #[test]
    fn render_produces_raster_surface() {
        let mut strategy = loaded(FakePdfEngine::new(), 2);
        strategy.render_page(2, &params(2, ThemeId::Sepia)).unwrap();
        assert_eq!(strategy.phase(), Phase::Rendering);

        let events = strategy.wait(TIMEOUT);
        assert_eq!(events, vec![StrategyEvent::Rendered { page: 2 }]);
        assert_eq!(strategy.phase(), Phase::Ready);

        let surface = strategy.surface().and_then(|s| s.as_raster().cloned());
        let page = surface.expect("raster surface");
        assert_eq!(page.page_num, 2);
        assert_eq!(page.theme, ThemeId::Sepia);
    }

    #[test]
    fn rerender_of_same_params_hits_cache() {
        let mut strategy = loaded(FakePdfEngine::new(), 2);
        strategy.render_page(1, &params(1, ThemeId::Dark)).unwrap();
        let _ = strategy.wait(TIMEOUT);

        strategy.render_page(1, &params(1, ThemeId::Dark)).unwrap();
        assert_eq!(strategy.phase(), Phase::Ready);
        assert_eq!(strategy.poll(), vec![StrategyEvent::Rendered { page: 1 }]);
    }

    #[test]
    fn newer_request_supersedes_older_one() {
        let engine = FakePdfEngine::new().with_render_delay(Duration::from_millis(50));
        let mut strategy = loaded(engine, 5);

        for page in 1..=5 {
            strategy.render_page(page, &params(page, ThemeId::Dark)).unwrap();
        }

        let mut rendered = Vec::new();
        let deadline = Instant::now() + TIMEOUT;
        while strategy.is_busy() && Instant::now() < deadline {
            rendered.extend(strategy.wait(Duration::from_millis(100)));
        }
        // Give stragglers a chance to arrive; they must be discarded.
        std::thread::sleep(Duration::from_millis(150));
        rendered.extend(strategy.poll());

        assert_eq!(rendered, vec![StrategyEvent::Rendered { page: 5 }]);
        let page = strategy.surface().and_then(|s| s.as_raster().cloned());
        assert_eq!(page.map(|p| p.page_num), Some(5));
    }

    #[test]
    fn filter_change_restyles_without_rendering() {
        let mut strategy = loaded(FakePdfEngine::new(), 1);
        strategy
            .refresh(&params(1, ThemeId::Dark), Invalidation::Filter)
            .unwrap();
        assert!(!strategy.is_busy());
        assert_eq!(strategy.poll(), vec![StrategyEvent::Restyled]);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut strategy = loaded(FakePdfEngine::new(), 1);
        strategy.render_page(1, &params(1, ThemeId::Dark)).unwrap();
        let _ = strategy.wait(TIMEOUT);

        strategy.teardown();
        assert_eq!(strategy.phase(), Phase::Unloaded);
        assert!(strategy.surface().is_none());
        assert_eq!(strategy.page_count(), 0);
        assert!(strategy.poll().is_empty());
    }

    #[test]
    fn failed_render_is_terminal() {
        let engine = FakePdfEngine::new().failing_page(2);
        let mut strategy = loaded(engine, 3);
        strategy.render_page(2, &params(2, ThemeId::Dark)).unwrap();
        let events = strategy.wait(TIMEOUT);
        assert!(matches!(
            events.as_slice(),
            [StrategyEvent::RenderFailed(ViewerError::Engine(_))]
        ));
        assert_eq!(strategy.phase(), Phase::Failed);
        assert!(strategy.render_page(1, &params(1, ThemeId::Dark)).is_err());
    }
}
