//! Markup flow strategy for Word documents

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::converter::{Conversion, WordConverter};
use super::markup;
use super::style;
use crate::error::{Result, ViewerError};
use crate::format::{Document, Format};
use crate::strategy::{Phase, RenderParams, RenderStrategy, StrategyEvent, invalid_state};
use crate::surface::{Presentation, Surface};
use crate::task::TaskSlot;
use crate::view_state::Invalidation;

/// Converted Word content ready for display
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupSurface {
    /// Block markup, to be placed inside an element with [`style::SCOPE_CLASS`]
    pub html: String,
    pub stylesheet: String,
    pub warnings: Vec<String>,
}

impl MarkupSurface {
    /// Markup wrapped in its scoping container
    pub fn scoped_html(&self) -> String {
        format!("<div class=\"{}\">{}</div>", style::SCOPE_CLASS, self.html)
    }
}

pub struct WordStrategy {
    converter: Arc<dyn WordConverter>,
    phase: Phase,
    loader: TaskSlot<Result<Conversion>>,
    surface: Option<MarkupSurface>,
    events: Vec<StrategyEvent>,
}

impl WordStrategy {
    pub fn new(converter: Arc<dyn WordConverter>) -> Self {
        Self {
            converter,
            phase: Phase::Unloaded,
            loader: TaskSlot::new("word-convert"),
            surface: None,
            events: Vec::new(),
        }
    }

    fn finish_load(&mut self, result: Result<Conversion>) {
        match result {
            Ok(conversion) => {
                for warning in &conversion.warnings {
                    warn!("Word conversion: {warning}");
                }
                info!(
                    "Word document converted: {} blocks",
                    conversion.blocks.len()
                );
                let html = markup::to_html(&conversion.blocks);
                self.events.push(StrategyEvent::Loaded {
                    page_count: 1,
                    title: None,
                    warnings: conversion.warnings.clone(),
                });
                // Styled by the first refresh
                self.surface = Some(MarkupSurface {
                    html,
                    stylesheet: String::new(),
                    warnings: conversion.warnings,
                });
                self.phase = Phase::Ready;
            }
            Err(e) => {
                warn!("Word conversion failed: {e}");
                self.phase = Phase::Failed;
                self.events.push(StrategyEvent::LoadFailed(e));
            }
        }
    }
}

impl RenderStrategy for WordStrategy {
    fn format(&self) -> Format {
        Format::Word
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn load(&mut self, document: &Document) -> Result<()> {
        if self.phase != Phase::Unloaded {
            return Err(invalid_state(Format::Word, "load", self.phase));
        }
        let converter = Arc::clone(&self.converter);
        let bytes = document.shared_bytes();
        self.loader
            .spawn(move || {
                converter
                    .convert(&bytes)
                    .map_err(|e| ViewerError::Conversion(e.to_string()))
            })
            .map_err(|e| ViewerError::Load(format!("cannot start converter: {e}")))?;

        debug!("Converting Word document {:?}", document.name());
        self.phase = Phase::Loading;
        Ok(())
    }

    /// Every change is a restyle; conversion never reruns
    fn refresh(&mut self, params: &RenderParams, _what: Invalidation) -> Result<()> {
        let phase = self.phase;
        let Some(surface) = self.surface.as_mut().filter(|_| phase.is_loaded()) else {
            return Err(invalid_state(Format::Word, "restyle", phase));
        };
        surface.stylesheet = style::stylesheet(&params.theme, params.zoom);
        self.events.push(StrategyEvent::Restyled);
        Ok(())
    }

    fn poll(&mut self) -> Vec<StrategyEvent> {
        if let Some(result) = self.loader.try_take() {
            self.finish_load(result);
        }
        std::mem::take(&mut self.events)
    }

    fn wait(&mut self, timeout: Duration) -> Vec<StrategyEvent> {
        if let Some(result) = self.loader.wait(timeout) {
            self.finish_load(result);
        }
        self.poll()
    }

    fn is_busy(&self) -> bool {
        self.loader.is_pending()
    }

    fn surface(&self) -> Option<Surface<'_>> {
        self.surface.as_ref().map(Surface::Markup)
    }

    fn presentation(&self, params: &RenderParams) -> Presentation {
        Presentation {
            background: params.theme.background,
            css_filter: params.theme.css_filter.clone(),
            // Zoom is carried by the scoped stylesheet.
            scale: 1.0,
            transform_origin: "top center",
        }
    }

    fn teardown(&mut self) {
        self.loader.cancel();
        self.surface = None;
        self.events.clear();
        self.phase = Phase::Unloaded;
    }
}
