//! Formatted text flow strategy

use std::time::Duration;

use log::{debug, info, warn};

use super::layout::{self, TextOptions, TextSurface};
use crate::error::{Result, ViewerError};
use crate::format::{Document, Format};
use crate::settings::TextSettings;
use crate::strategy::{Phase, RenderParams, RenderStrategy, StrategyEvent, invalid_state};
use crate::surface::{Presentation, Surface};
use crate::task::TaskSlot;
use crate::theme::ResolvedTheme;
use crate::view_state::Invalidation;

pub struct TextStrategy {
    settings: TextSettings,
    phase: Phase,
    loader: TaskSlot<Result<Vec<String>>>,
    options: TextOptions,
    surface: Option<TextSurface>,
    /// Style inputs of the last refresh, reused when a display option flips
    style: Option<(ResolvedTheme, f32)>,
    events: Vec<StrategyEvent>,
}

impl TextStrategy {
    pub fn new(settings: TextSettings) -> Self {
        let options = TextOptions::for_extension(None, &settings);
        Self {
            settings,
            phase: Phase::Unloaded,
            loader: TaskSlot::new("text-decode"),
            options,
            surface: None,
            style: None,
            events: Vec::new(),
        }
    }

    pub fn options(&self) -> TextOptions {
        self.options
    }

    pub fn toggle_line_numbers(&mut self) -> Result<bool> {
        self.update_options(|o| o.line_numbers = !o.line_numbers)?;
        Ok(self.options.line_numbers)
    }

    pub fn toggle_word_wrap(&mut self) -> Result<bool> {
        self.update_options(|o| o.word_wrap = !o.word_wrap)?;
        Ok(self.options.word_wrap)
    }

    pub fn toggle_monospace(&mut self) -> Result<bool> {
        self.update_options(|o| o.monospace = !o.monospace)?;
        Ok(self.options.monospace)
    }

    fn update_options(&mut self, change: impl FnOnce(&mut TextOptions)) -> Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(invalid_state(Format::Text, "change display options", self.phase));
        };
        change(&mut self.options);
        surface.options = self.options;
        if let Some((theme, zoom)) = &self.style {
            surface.restyle(theme, *zoom);
        }
        self.events.push(StrategyEvent::Restyled);
        Ok(())
    }

    fn finish_load(&mut self, result: Result<Vec<String>>) {
        match result {
            Ok(lines) => {
                info!("Text document decoded: {} lines", lines.len());
                self.surface = Some(TextSurface::new(lines, self.options));
                self.phase = Phase::Ready;
                self.events.push(StrategyEvent::Loaded {
                    page_count: 1,
                    title: None,
                    warnings: Vec::new(),
                });
            }
            Err(e) => {
                warn!("Text decode failed: {e}");
                self.phase = Phase::Failed;
                self.events.push(StrategyEvent::LoadFailed(e));
            }
        }
    }
}

impl RenderStrategy for TextStrategy {
    fn format(&self) -> Format {
        Format::Text
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn load(&mut self, document: &Document) -> Result<()> {
        if self.phase != Phase::Unloaded {
            return Err(invalid_state(Format::Text, "load", self.phase));
        }
        self.options = TextOptions::for_extension(document.extension().as_deref(), &self.settings);
        debug!(
            "Reading text document {:?} with {:?}",
            document.name(),
            self.options
        );

        let bytes = document.shared_bytes();
        self.loader
            .spawn(move || layout::decode(&bytes).map(|text| layout::split_lines(&text)))
            .map_err(|e| ViewerError::Load(format!("cannot start reader: {e}")))?;
        self.phase = Phase::Loading;
        Ok(())
    }

    /// Every change is a restyle; the text is never re-read
    fn refresh(&mut self, params: &RenderParams, _what: Invalidation) -> Result<()> {
        let phase = self.phase;
        let Some(surface) = self.surface.as_mut().filter(|_| phase.is_loaded()) else {
            return Err(invalid_state(Format::Text, "restyle", phase));
        };
        surface.restyle(&params.theme, params.zoom);
        self.style = Some((params.theme.clone(), params.zoom));
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
        self.surface.as_ref().map(Surface::Text)
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
        self.style = None;
        self.events.clear();
        self.phase = Phase::Unloaded;
    }

    fn as_text_mut(&mut self) -> Option<&mut TextStrategy> {
        Some(self)
    }
}
