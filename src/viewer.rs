//! Viewer host: owns the view state, the active strategy and the
//! auto-advance timer, and turns commands into strategy work.
//!
//! The host never blocks. Background results are collected by [`Viewer::tick`]
//! (or [`Viewer::poll`]), which also drives the auto-advance deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::KeyEvent;
use log::{debug, info, warn};

use crate::auto_advance::AutoAdvance;
use crate::error::{Result, ViewerError};
use crate::format::{self, Document, Format};
use crate::keymap::{self, KeyAction};
use crate::pdf::{PdfEngine, PdfStrategy};
use crate::settings::Settings;
use crate::strategy::{Phase, RenderParams, RenderStrategy, StrategyEvent};
use crate::surface::{Presentation, Surface};
use crate::text::TextStrategy;
use crate::theme::{self, ThemeId};
use crate::view_state::{Command, Effect, Invalidation, Rotation, ViewState};
use crate::word::{WordConverter, WordStrategy};

/// External engines the strategies delegate to
#[derive(Clone)]
pub struct Collaborators {
    pub pdf: Arc<dyn PdfEngine>,
    pub word: Arc<dyn WordConverter>,
}

impl Collaborators {
    /// MuPDF for PDF, the built-in OOXML converter for Word
    #[cfg(feature = "pdf")]
    pub fn native() -> Self {
        Self {
            pdf: Arc::new(crate::pdf::MupdfEngine),
            word: Arc::new(crate::word::DocxConverter),
        }
    }
}

/// Notifications for the chrome
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    /// A document was accepted and its load started
    Opened { name: String, format: Format },
    Loaded {
        page_count: usize,
        title: Option<String>,
        warnings: Vec<String>,
    },
    LoadFailed(ViewerError),
    PageRendered { page: usize },
    /// Styling changed without new content
    Restyled,
    RenderFailed(ViewerError),
    /// The auto-advance timer moved to this page
    AutoAdvanced { page: usize },
    AutoAdvanceStopped,
    Closed,
}

/// Snapshot of everything the chrome displays
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub name: Option<String>,
    pub format: Option<Format>,
    pub phase: Phase,
    pub current_page: usize,
    pub total_pages: usize,
    pub zoom: f32,
    pub rotation: Rotation,
    pub theme: ThemeId,
    pub contrast: f32,
    pub brightness: f32,
    pub auto_scroll: bool,
    pub scroll_speed: f32,
    pub busy: bool,
    pub can_go_next: bool,
    pub can_go_prev: bool,
    pub error: Option<ViewerError>,
}

pub struct Viewer {
    settings: Settings,
    collaborators: Collaborators,
    state: ViewState,
    document: Option<Document>,
    strategy: Option<Box<dyn RenderStrategy>>,
    timer: AutoAdvance,
    error: Option<ViewerError>,
    events: Vec<ViewerEvent>,
}

impl Viewer {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        let state = ViewState::new(settings.theme, settings.zoom_step);
        let timer = AutoAdvance::new(Duration::from_millis(settings.auto_advance_base_ms));
        Self {
            settings,
            collaborators,
            state,
            document: None,
            strategy: None,
            timer,
            error: None,
            events: Vec::new(),
        }
    }

    /// Select a new document, replacing the current one.
    ///
    /// An unsupported document is rejected before anything changes.
    pub fn open(&mut self, document: Document) -> Result<Format> {
        self.open_at(document, Instant::now())
    }

    pub fn open_at(&mut self, document: Document, now: Instant) -> Result<Format> {
        let format = match format::detect(&document) {
            Ok(format) => format,
            Err(e) => {
                warn!("Rejected {:?}: {e}", document.name());
                return Err(e);
            }
        };

        // Timer first: nothing may tick against the outgoing strategy.
        self.release_document();
        let effects = self.state.apply(Command::OpenDocument(format));
        let _ = self.run_effects(effects, now);

        info!("Opening {:?} as {}", document.name(), format.name());
        let mut strategy = self.create_strategy(format);
        self.events.push(ViewerEvent::Opened {
            name: document.name().to_string(),
            format,
        });
        let started = strategy.load(&document);
        self.strategy = Some(strategy);
        self.document = Some(document);

        if let Err(e) = started {
            warn!("Could not start loading: {e}");
            self.error = Some(e.clone());
            self.events.push(ViewerEvent::LoadFailed(e.clone()));
            return Err(e);
        }
        Ok(format)
    }

    /// Drop the current document without a replacement
    pub fn close(&mut self) {
        if self.document.is_none() && self.strategy.is_none() {
            return;
        }
        self.release_document();
        let effects = self.state.apply(Command::CloseDocument);
        let _ = self.run_effects(effects, Instant::now());
        self.events.push(ViewerEvent::Closed);
    }

    fn release_document(&mut self) {
        if self.timer.is_armed() {
            self.stop_auto_scroll();
        }
        if let Some(mut strategy) = self.strategy.take() {
            debug!("Tearing down {} strategy", strategy.format().name());
            strategy.teardown();
        }
        self.document = None;
        self.error = None;
    }

    fn create_strategy(&self, format: Format) -> Box<dyn RenderStrategy> {
        match format {
            Format::Pdf => Box::new(PdfStrategy::new(
                Arc::clone(&self.collaborators.pdf),
                self.settings.pdf_render_scale,
                self.settings.pdf_cache_size,
            )),
            Format::Word => Box::new(WordStrategy::new(Arc::clone(&self.collaborators.word))),
            Format::Text => Box::new(TextStrategy::new(self.settings.text.clone())),
        }
    }

    pub fn apply(&mut self, cmd: Command) -> Result<()> {
        self.apply_at(cmd, Instant::now())
    }

    /// Apply a command with an explicit clock, for deterministic timers
    pub fn apply_at(&mut self, cmd: Command, now: Instant) -> Result<()> {
        debug!("Applying {cmd:?}");
        let effects = self.state.apply(cmd);
        self.run_effects(effects, now)
    }

    fn run_effects(&mut self, effects: Vec<Effect>, now: Instant) -> Result<()> {
        let mut first_error = None;
        for effect in effects {
            let outcome = match effect {
                Effect::Refresh(what) => self.refresh(what),
                Effect::StartAutoAdvance => {
                    self.start_timer(now);
                    Ok(())
                }
                Effect::StopAutoAdvance => {
                    self.cancel_timer();
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn cancel_timer(&mut self) {
        if self.timer.is_armed() {
            self.timer.cancel();
            self.events.push(ViewerEvent::AutoAdvanceStopped);
        }
    }

    /// Only live paginated documents advance; flow formats keep the flag alone
    fn start_timer(&mut self, now: Instant) {
        let phase = self.phase();
        if phase == Phase::Failed || phase == Phase::Unloaded {
            debug!("Auto-advance not started: strategy is {}", phase.name());
            return;
        }
        if self.state.format.is_some_and(|f| f.is_paginated()) {
            self.timer.start(now, self.state.scroll_speed);
            debug!("Auto-advance every {:?}", self.timer.interval());
        }
    }

    fn refresh(&mut self, what: Invalidation) -> Result<()> {
        let Some(strategy) = self.strategy.as_mut() else {
            return Ok(());
        };
        // Until loaded there is nothing to refresh; the load completion
        // refreshes with whatever state is current by then.
        if !strategy.phase().is_loaded() {
            return Ok(());
        }
        let params = RenderParams::from_state(&self.state);
        match strategy.refresh(&params, what) {
            Ok(()) => Ok(()),
            Err(ViewerError::Range { page, total }) => {
                debug!("Page {page} outside 1..={total}, ignored");
                Ok(())
            }
            Err(e) => {
                warn!("Refresh failed: {e}");
                self.error = Some(e.clone());
                self.events.push(ViewerEvent::RenderFailed(e.clone()));
                Err(e)
            }
        }
    }

    /// Collect background results and fire the auto-advance timer if due
    pub fn tick(&mut self, now: Instant) -> Vec<ViewerEvent> {
        if let Some(strategy) = self.strategy.as_mut() {
            let events = strategy.poll();
            self.handle_strategy_events(events);
        }
        if self.timer.poll(now) {
            let before = self.state.current_page;
            let effects = self.state.apply(Command::AdvancePage);
            let _ = self.run_effects(effects, now);
            if self.state.current_page != before {
                self.events.push(ViewerEvent::AutoAdvanced {
                    page: self.state.current_page,
                });
            }
        }
        std::mem::take(&mut self.events)
    }

    pub fn poll(&mut self) -> Vec<ViewerEvent> {
        self.tick(Instant::now())
    }

    /// Block until outstanding loads and renders settle, or `timeout` passes
    pub fn wait_for_idle(&mut self, timeout: Duration) -> Vec<ViewerEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(strategy) = self.strategy.as_mut() else {
                break;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !strategy.is_busy() || remaining.is_zero() {
                break;
            }
            let events = strategy.wait(remaining);
            self.handle_strategy_events(events);
        }
        if let Some(strategy) = self.strategy.as_mut() {
            let events = strategy.poll();
            self.handle_strategy_events(events);
        }
        std::mem::take(&mut self.events)
    }

    fn handle_strategy_events(&mut self, events: Vec<StrategyEvent>) {
        for event in events {
            match event {
                StrategyEvent::Loaded {
                    page_count,
                    title,
                    warnings,
                } => {
                    self.events.push(ViewerEvent::Loaded {
                        page_count,
                        title,
                        warnings,
                    });
                    let effects = self.state.apply(Command::SetPageCount(page_count));
                    let _ = self.run_effects(effects, Instant::now());
                }
                StrategyEvent::LoadFailed(e) => {
                    self.error = Some(e.clone());
                    self.events.push(ViewerEvent::LoadFailed(e));
                    self.stop_auto_scroll();
                }
                StrategyEvent::Rendered { page } => {
                    self.events.push(ViewerEvent::PageRendered { page });
                }
                StrategyEvent::Restyled => self.events.push(ViewerEvent::Restyled),
                StrategyEvent::RenderFailed(e) => {
                    self.error = Some(e.clone());
                    self.events.push(ViewerEvent::RenderFailed(e));
                    self.stop_auto_scroll();
                }
            }
        }
    }

    /// A failed strategy has nothing to advance through
    fn stop_auto_scroll(&mut self) {
        self.cancel_timer();
        self.state.auto_scroll = false;
    }

    /// Map a key press to a command or display toggle and run it.
    ///
    /// Returns whether the key was recognised.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Result<bool> {
        let Some(action) = keymap::map_key(key) else {
            return Ok(false);
        };
        match action {
            KeyAction::Command(cmd) => self.apply(cmd)?,
            KeyAction::CycleTheme => {
                let next = self.state.theme.next();
                self.set_theme(next)?;
            }
            KeyAction::ToggleLineNumbers => {
                self.toggle_line_numbers()?;
            }
            KeyAction::ToggleWordWrap => {
                self.toggle_word_wrap()?;
            }
            KeyAction::ToggleMonospace => {
                self.toggle_monospace()?;
            }
        }
        Ok(true)
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<()> {
        self.apply(Command::SetZoom(zoom))
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.apply(Command::ZoomIn)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.apply(Command::ZoomOut)
    }

    pub fn next_page(&mut self) -> Result<()> {
        self.apply(Command::NextPage)
    }

    pub fn prev_page(&mut self) -> Result<()> {
        self.apply(Command::PrevPage)
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<()> {
        self.apply(Command::GoToPage(page))
    }

    pub fn rotate(&mut self) -> Result<()> {
        self.apply(Command::Rotate)
    }

    pub fn set_theme(&mut self, theme: ThemeId) -> Result<()> {
        self.apply(Command::SetTheme(theme))
    }

    pub fn set_contrast(&mut self, contrast: f32) -> Result<()> {
        self.apply(Command::SetContrast(contrast))
    }

    pub fn set_brightness(&mut self, brightness: f32) -> Result<()> {
        self.apply(Command::SetBrightness(brightness))
    }

    pub fn reset_visual(&mut self) -> Result<()> {
        self.apply(Command::ResetVisual)
    }

    pub fn toggle_auto_scroll(&mut self) -> Result<()> {
        self.apply(Command::ToggleAutoScroll)
    }

    pub fn set_scroll_speed(&mut self, speed: f32) -> Result<()> {
        self.apply(Command::SetScrollSpeed(speed))
    }

    pub fn toggle_line_numbers(&mut self) -> Result<bool> {
        self.text_strategy("toggle line numbers")?
            .toggle_line_numbers()
    }

    pub fn toggle_word_wrap(&mut self) -> Result<bool> {
        self.text_strategy("toggle word wrap")?.toggle_word_wrap()
    }

    pub fn toggle_monospace(&mut self) -> Result<bool> {
        self.text_strategy("toggle monospace")?.toggle_monospace()
    }

    fn text_strategy(&mut self, action: &'static str) -> Result<&mut TextStrategy> {
        let format = self.state.format;
        let phase = self.phase();
        self.strategy
            .as_mut()
            .and_then(|s| s.as_text_mut())
            .ok_or(ViewerError::InvalidState {
                format: format.unwrap_or(Format::Text),
                action,
                phase: phase.name(),
            })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn format(&self) -> Option<Format> {
        self.state.format
    }

    pub fn phase(&self) -> Phase {
        self.strategy.as_ref().map_or(Phase::Unloaded, |s| s.phase())
    }

    pub fn surface(&self) -> Option<Surface<'_>> {
        self.strategy.as_ref().and_then(|s| s.surface())
    }

    /// Display directives for the current surface
    pub fn presentation(&self) -> Option<Presentation> {
        let params = RenderParams::from_state(&self.state);
        self.strategy.as_ref().map(|s| s.presentation(&params))
    }

    pub fn resolved_theme(&self) -> theme::ResolvedTheme {
        theme::resolve(self.state.theme, self.state.contrast, self.state.brightness)
    }

    /// Most recent load or render failure for the current document
    pub fn error(&self) -> Option<&ViewerError> {
        self.error.as_ref()
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn can_go_next(&self) -> bool {
        self.state.can_go_next()
    }

    pub fn can_go_prev(&self) -> bool {
        self.state.can_go_prev()
    }

    pub fn status(&self) -> Status {
        Status {
            name: self.document.as_ref().map(|d| d.name().to_string()),
            format: self.state.format,
            phase: self.phase(),
            current_page: self.state.current_page,
            total_pages: self.state.total_pages,
            zoom: self.state.zoom,
            rotation: self.state.rotation,
            theme: self.state.theme,
            contrast: self.state.contrast,
            brightness: self.state.brightness,
            auto_scroll: self.state.auto_scroll,
            scroll_speed: self.state.scroll_speed,
            busy: self.strategy.as_ref().is_some_and(|s| s.is_busy()),
            can_go_next: self.can_go_next(),
            can_go_prev: self.can_go_prev(),
            error: self.error.clone(),
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.timer.cancel();
        if let Some(mut strategy) = self.strategy.take() {
            strategy.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakePdfEngine, pdf_document, text_document, word_document};
    use crate::word::DocxConverter;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn viewer() -> Viewer {
        Viewer::new(
            Settings::default(),
            Collaborators {
                pdf: Arc::new(FakePdfEngine::new()),
                word: Arc::new(DocxConverter),
            },
        )
    }

    #[test]
    fn unsupported_document_leaves_session_untouched() {
        let mut viewer = viewer();
        viewer.open(text_document("notes.txt", "hi")).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);
        let before = viewer.status();

        let err = viewer
            .open(Document::new("photo.png", Some("image/png"), vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, ViewerError::UnsupportedFormat { .. }));
        assert_eq!(viewer.status(), before);
        assert!(viewer.poll().is_empty());
    }

    #[test]
    fn load_reports_page_count_and_renders_first_page() {
        let mut viewer = viewer();
        assert_eq!(viewer.open(pdf_document(3)).unwrap(), Format::Pdf);
        let events = viewer.wait_for_idle(TIMEOUT);

        assert_eq!(
            events,
            vec![
                ViewerEvent::Opened {
                    name: "fake.pdf".into(),
                    format: Format::Pdf
                },
                ViewerEvent::Loaded {
                    page_count: 3,
                    title: None,
                    warnings: vec![]
                },
                ViewerEvent::PageRendered { page: 1 },
            ]
        );
        assert_eq!(viewer.state().total_pages, 3);
        assert!(viewer.surface().and_then(|s| s.as_raster().cloned()).is_some());
    }

    #[test]
    fn navigation_is_clamped() {
        let mut viewer = viewer();
        viewer.open(pdf_document(2)).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);

        viewer.prev_page().unwrap();
        assert_eq!(viewer.state().current_page, 1);
        viewer.go_to_page(99).unwrap();
        assert_eq!(viewer.state().current_page, 2);
        assert!(!viewer.can_go_next());
        viewer.next_page().unwrap();
        assert_eq!(viewer.state().current_page, 2);
        viewer.go_to_page(0).unwrap();
        assert_eq!(viewer.state().current_page, 1);
    }

    #[test]
    fn failed_load_keeps_document_selected() {
        let mut viewer = viewer();
        viewer
            .open(Document::new("broken.pdf", None, b"garbage".to_vec()))
            .unwrap();
        let events = viewer.wait_for_idle(TIMEOUT);
        assert!(matches!(
            events.last(),
            Some(ViewerEvent::LoadFailed(ViewerError::Load(_)))
        ));
        assert_eq!(viewer.phase(), Phase::Failed);
        assert_eq!(viewer.document().map(Document::name), Some("broken.pdf"));
        assert!(viewer.error().is_some());
    }

    #[test]
    fn rotate_only_affects_pdf() {
        let mut viewer = viewer();
        viewer.open(word_document("<w:p/>")).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);
        viewer.rotate().unwrap();
        assert_eq!(viewer.state().rotation, Rotation::Deg0);

        viewer.open(pdf_document(1)).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);
        viewer.rotate().unwrap();
        assert_eq!(viewer.state().rotation, Rotation::Deg90);
        let _ = viewer.wait_for_idle(TIMEOUT);
        let page = viewer.surface().and_then(|s| s.as_raster().cloned()).unwrap();
        assert_eq!(page.rotation, Rotation::Deg90);
    }

    #[test]
    fn text_toggles_need_a_text_document() {
        let mut viewer = viewer();
        viewer.open(pdf_document(1)).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);
        assert!(matches!(
            viewer.toggle_word_wrap(),
            Err(ViewerError::InvalidState { .. })
        ));

        viewer.open(text_document("main.rs", "fn main() {}")).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);
        assert!(!viewer.toggle_line_numbers().unwrap());
    }

    #[test]
    fn close_releases_everything() {
        let mut viewer = viewer();
        viewer.open(pdf_document(2)).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);
        viewer.close();

        assert!(viewer.surface().is_none());
        assert!(viewer.document().is_none());
        assert_eq!(viewer.format(), None);
        assert_eq!(viewer.phase(), Phase::Unloaded);
        assert_eq!(viewer.poll(), vec![ViewerEvent::Closed]);
    }

    #[test]
    fn filter_changes_only_restyle_pdf() {
        let mut viewer = viewer();
        viewer.open(pdf_document(1)).unwrap();
        let _ = viewer.wait_for_idle(TIMEOUT);

        viewer.set_contrast(1.5).unwrap();
        assert_eq!(viewer.wait_for_idle(TIMEOUT), vec![ViewerEvent::Restyled]);
        assert_eq!(
            viewer.presentation().map(|p| p.css_filter),
            Some("contrast(1.5) brightness(1)".to_string())
        );
    }
}
