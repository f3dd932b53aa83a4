//! Render service - owns the worker thread and page cache

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::PageCache;
use super::engine::PdfEngine;
use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId};
use super::types::PageData;
use super::worker::{lock, render_worker};

/// Outcome of a page request
#[derive(Debug)]
pub enum PageRequest {
    /// Served from cache; no worker round-trip
    Cached(Arc<PageData>),
    /// Queued for rendering under this id
    Queued(RequestId),
}

/// Manages PDF rendering on a worker thread with caching.
///
/// Only the most recent request is live: responses for any earlier id are
/// dropped in [`RenderService::poll_responses`].
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    last_issued: RequestId,
    latest: Option<RequestId>,
    cache: Arc<Mutex<PageCache>>,
}

impl RenderService {
    pub fn spawn(
        engine: Arc<dyn PdfEngine>,
        bytes: Arc<[u8]>,
        cache_size: usize,
    ) -> std::io::Result<Self> {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let cache_clone = cache.clone();
        // The worker is detached: shutdown must not block on an engine call in progress.
        thread::Builder::new()
            .name("docview-pdf-render".to_string())
            .spawn(move || {
                render_worker(engine, bytes, request_rx, response_tx, cache_clone);
            })?;

        Ok(Self {
            request_tx,
            response_rx,
            last_issued: RequestId(0),
            latest: None,
            cache,
        })
    }

    /// Request a page, superseding any request still in flight
    pub fn request_page(&mut self, page: usize, params: RenderParams) -> PageRequest {
        if let Some(cached) = self.get_cached_page(page, &params) {
            // Anything still in flight is now stale.
            self.latest = None;
            return PageRequest::Cached(cached);
        }

        let id = self.next_id();
        if self
            .request_tx
            .send(RenderRequest::Page { id, page, params })
            .is_err()
        {
            warn!("Render worker is gone; page {page} request dropped");
        }
        self.latest = Some(id);
        PageRequest::Queued(id)
    }

    /// Whether a request is awaiting its response
    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }

    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// Poll for completed responses, discarding superseded ones
    pub fn poll_responses(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            if let Some(response) = self.accept(response) {
                responses.push(response);
            }
        }
        responses
    }

    /// Block up to `timeout` for the live request's response
    pub fn wait_response(&mut self, timeout: Duration) -> Option<RenderResponse> {
        let deadline = Instant::now() + timeout;
        while self.latest.is_some() {
            let response = self.response_rx.recv_deadline(deadline).ok()?;
            if let Some(response) = self.accept(response) {
                return Some(response);
            }
        }
        None
    }

    fn accept(&mut self, response: RenderResponse) -> Option<RenderResponse> {
        let id = response.id();
        if self.latest == Some(id) {
            self.latest = None;
            Some(response)
        } else {
            debug!("Discarding superseded render response {id}");
            None
        }
    }

    #[must_use]
    pub fn get_cached_page(&self, page: usize, params: &RenderParams) -> Option<Arc<PageData>> {
        lock(&self.cache).lookup(page, params)
    }

    pub fn cached_pages(&self) -> usize {
        lock(&self.cache).len()
    }

    /// Stop the worker and release cached pages
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
        self.latest = None;
        lock(&self.cache).clear();
    }

    fn next_id(&mut self) -> RequestId {
        let id = self.last_issued.next();
        self.last_issued = id;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakePdfEngine, fake_pdf_bytes};
    use crate::theme::{PixelTransform, Rgb, ThemeId};
    use crate::view_state::Rotation;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn params() -> RenderParams {
        RenderParams {
            zoom: 1.0,
            render_scale: 1.0,
            rotation: Rotation::Deg0,
            theme: ThemeId::HighContrast,
            page_fill: Rgb::WHITE,
            transform: PixelTransform::None,
        }
    }

    fn spawn(engine: FakePdfEngine, pages: usize) -> RenderService {
        RenderService::spawn(Arc::new(engine), fake_pdf_bytes(pages).into(), 4).unwrap()
    }

    #[test]
    fn only_the_latest_request_is_answered() {
        let engine = FakePdfEngine::new().with_render_delay(Duration::from_millis(20));
        let mut service = spawn(engine, 3);

        let PageRequest::Queued(first) = service.request_page(1, params()) else {
            panic!("empty cache must queue");
        };
        let PageRequest::Queued(second) = service.request_page(2, params()) else {
            panic!("empty cache must queue");
        };
        assert!(second > first);
        assert_eq!(service.latest(), Some(second));

        let response = service.wait_response(TIMEOUT).unwrap();
        assert_eq!(response.id(), second);
        assert!(matches!(
            response,
            RenderResponse::Rendered { ref data, .. } if data.page_num == 2
        ));
        assert!(!service.is_pending());
    }

    #[test]
    fn rendered_page_is_served_from_cache() {
        let mut service = spawn(FakePdfEngine::new(), 1);
        let _ = service.request_page(1, params());
        let _ = service.wait_response(TIMEOUT).unwrap();
        assert_eq!(service.cached_pages(), 1);

        assert!(matches!(
            service.request_page(1, params()),
            PageRequest::Cached(_)
        ));
        assert!(!service.is_pending());
    }

    #[test]
    fn engine_failure_is_reported_for_the_request() {
        let mut service = spawn(FakePdfEngine::new().failing_page(1), 1);
        let _ = service.request_page(1, params());
        assert!(matches!(
            service.wait_response(TIMEOUT),
            Some(RenderResponse::Failed { page: 1, .. })
        ));
        assert_eq!(service.cached_pages(), 0);
    }
}
