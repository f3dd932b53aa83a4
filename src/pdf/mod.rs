//! PDF support: engine boundary, render worker, page cache and the
//! paginated raster strategy

pub mod cache;
pub mod engine;
pub mod postprocess;
pub mod request;
pub mod service;
pub mod strategy;
pub mod types;
pub mod worker;

pub use cache::{CacheKey, PageCache};
#[cfg(feature = "pdf")]
pub use engine::MupdfEngine;
pub use engine::{EngineError, PdfDocument, PdfEngine};
pub use request::{RenderRequest, RenderResponse, RequestId, WorkerFault};
pub use service::{PageRequest, RenderService};
pub use strategy::PdfStrategy;
pub use types::{DocumentInfo, PageData};
