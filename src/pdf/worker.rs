//! Render worker: owns the engine document on its own thread

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::PageCache;
use super::engine::{PdfDocument, PdfEngine};
use super::postprocess;
use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId, WorkerFault};
use super::types::PageData;

struct PageJob {
    id: RequestId,
    page: usize,
    params: RenderParams,
}

enum Next {
    Job(PageJob),
    Stop,
}

/// Thread body. The document is opened here because engine handles are
/// not required to be `Send`.
#[expect(
    clippy::needless_pass_by_value,
    reason = "moved into the worker thread"
)]
pub fn render_worker(
    engine: Arc<dyn PdfEngine>,
    bytes: Arc<[u8]>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<PageCache>>,
) {
    let doc = match engine.open(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Render worker could not open document: {e}");
            // Answer every request so the host never waits forever.
            while let Some(Next::Job(job)) = next_job(&requests) {
                let _ = responses.send(RenderResponse::Failed {
                    id: job.id,
                    page: job.page,
                    fault: WorkerFault::Pdf(e.clone()),
                });
            }
            return;
        }
    };

    while let Some(Next::Job(job)) = next_job(&requests) {
        let response = run_job(doc.as_ref(), job, &cache);
        let _ = responses.send(response);
    }
    debug!("Render worker exiting");
}

/// Block for the next request, then collapse any backlog to its newest entry
fn next_job(requests: &Receiver<RenderRequest>) -> Option<Next> {
    let mut next = into_next(requests.recv().ok()?);
    while let Ok(queued) = requests.try_recv() {
        if let Next::Job(skipped) = &next {
            debug!("Skipping superseded render of page {} ({})", skipped.page, skipped.id);
        }
        next = into_next(queued);
        if matches!(next, Next::Stop) {
            break;
        }
    }
    Some(next)
}

fn into_next(request: RenderRequest) -> Next {
    match request {
        RenderRequest::Page { id, page, params } => Next::Job(PageJob { id, page, params }),
        RenderRequest::Shutdown => Next::Stop,
    }
}

fn run_job(doc: &dyn PdfDocument, job: PageJob, cache: &Mutex<PageCache>) -> RenderResponse {
    let PageJob { id, page, params } = job;
    let cached = lock(cache).lookup(page, &params);
    let rendered = match cached {
        Some(data) => Ok(data),
        None => render_page(doc, page, &params).map(|data| lock(cache).store(&params, data)),
    };
    match rendered {
        Ok(data) => RenderResponse::Rendered { id, data },
        Err(fault) => RenderResponse::Failed { id, page, fault },
    }
}

pub(super) fn lock(cache: &Mutex<PageCache>) -> MutexGuard<'_, PageCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rasterize a 1-indexed page, then fill, theme and rotate it
pub fn render_page(
    doc: &dyn PdfDocument,
    page_num: usize,
    params: &RenderParams,
) -> Result<PageData, WorkerFault> {
    let index = page_num
        .checked_sub(1)
        .ok_or(WorkerFault::NoSuchPage(page_num))?;

    let scale = params.raster_scale();
    let raster = doc.render(index, scale)?;
    if raster.width() == 0 || raster.height() == 0 {
        return Err(WorkerFault::EmptyRaster(page_num));
    }

    let mut canvas = postprocess::compose_on_fill(&raster, params.page_fill);
    postprocess::apply_transform(&mut canvas, params.transform);

    Ok(PageData {
        image: postprocess::rotate(canvas, params.rotation),
        page_num,
        scale_factor: scale,
        rotation: params.rotation,
        theme: params.theme,
    })
}
