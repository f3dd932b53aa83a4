//! Common lifecycle for the per-format rendering strategies

use std::time::Duration;

use crate::error::{Result, ViewerError};
use crate::format::{Document, Format};
use crate::surface::{Presentation, Surface};
use crate::text::TextStrategy;
use crate::theme::{self, ResolvedTheme};
use crate::view_state::{Invalidation, Rotation, ViewState};

/// Lifecycle phase shared by every strategy.
///
/// `Unloaded -> Loading -> Ready <-> Rendering`, with `Failed` terminal and
/// `Unloaded` again after teardown. Flow formats never enter `Rendering`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Ready,
    Rendering,
    Failed,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Unloaded => "unloaded",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Rendering => "rendering",
            Phase::Failed => "failed",
        }
    }

    /// Whether the strategy accepts render/restyle requests
    pub fn is_loaded(self) -> bool {
        matches!(self, Phase::Ready | Phase::Rendering)
    }
}

/// Inputs a strategy needs to produce or restyle its surface
#[derive(Clone, Debug, PartialEq)]
pub struct RenderParams {
    /// 1-indexed page
    pub page: usize,
    pub zoom: f32,
    pub rotation: Rotation,
    pub theme: ResolvedTheme,
}

impl RenderParams {
    pub fn from_state(state: &ViewState) -> Self {
        Self {
            page: state.current_page,
            zoom: state.zoom,
            rotation: state.rotation,
            theme: theme::resolve(state.theme, state.contrast, state.brightness),
        }
    }
}

/// Asynchronous outcomes reported by a strategy
#[derive(Clone, Debug, PartialEq)]
pub enum StrategyEvent {
    Loaded {
        page_count: usize,
        title: Option<String>,
        warnings: Vec<String>,
    },
    LoadFailed(ViewerError),
    Rendered {
        page: usize,
    },
    Restyled,
    RenderFailed(ViewerError),
}

/// One implementation per format, owned by the viewer host.
pub trait RenderStrategy {
    fn format(&self) -> Format;

    fn phase(&self) -> Phase;

    /// Start loading `document` in the background.
    ///
    /// Errors returned here mean the load could not even be started; decode
    /// failures arrive later as [`StrategyEvent::LoadFailed`].
    fn load(&mut self, document: &Document) -> Result<()>;

    /// React to a view change. Only valid once loaded.
    fn refresh(&mut self, params: &RenderParams, what: Invalidation) -> Result<()>;

    /// Drain finished background work without blocking
    fn poll(&mut self) -> Vec<StrategyEvent>;

    /// Block up to `timeout` until outstanding work produces events
    fn wait(&mut self, timeout: Duration) -> Vec<StrategyEvent>;

    /// Whether a load or render is still outstanding
    fn is_busy(&self) -> bool;

    fn surface(&self) -> Option<Surface<'_>>;

    fn presentation(&self, params: &RenderParams) -> Presentation;

    /// Release every derived resource and return to `Unloaded`
    fn teardown(&mut self);

    /// Access to text-only display toggles
    fn as_text_mut(&mut self) -> Option<&mut TextStrategy> {
        None
    }
}

pub(crate) fn invalid_state(format: Format, action: &'static str, phase: Phase) -> ViewerError {
    ViewerError::InvalidState {
        format,
        action,
        phase: phase.name(),
    }
}
