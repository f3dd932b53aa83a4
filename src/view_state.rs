//! View state shared by every rendering strategy
//!
//! All mutations go through [`ViewState::apply`], which clamps inputs and
//! returns the [`Effect`]s the host has to carry out. Keeping the state pure
//! lets navigation, zoom and timer rules be tested without any strategy.

use crate::format::Format;
use crate::theme::{self, ThemeId};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const MIN_SCROLL_SPEED: f32 = 0.5;
pub const MAX_SCROLL_SPEED: f32 = 3.0;

/// Page rotation in quarter turns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotate a further 90 degrees clockwise, wrapping at 360
    #[must_use]
    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    /// Format of the active document, if any
    pub format: Option<Format>,
    /// Current page (1-indexed)
    pub current_page: usize,
    /// Page count reported by the strategy, 0 until loaded
    pub total_pages: usize,
    pub zoom: f32,
    pub rotation: Rotation,
    pub theme: ThemeId,
    pub contrast: f32,
    pub brightness: f32,
    pub auto_scroll: bool,
    pub scroll_speed: f32,
    zoom_step: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(ThemeId::default(), 0.25)
    }
}

impl ViewState {
    #[must_use]
    pub fn new(theme: ThemeId, zoom_step: f32) -> Self {
        Self {
            format: None,
            current_page: 1,
            total_pages: 0,
            zoom: 1.0,
            rotation: Rotation::Deg0,
            theme,
            contrast: 1.0,
            brightness: 1.0,
            auto_scroll: false,
            scroll_speed: 1.0,
            zoom_step,
        }
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_page > 1 && self.total_pages > 0
    }

    /// Clamp a requested page to `[1, total_pages]`
    pub fn clamp_page(&self, page: usize) -> usize {
        page.min(self.total_pages).max(1)
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::OpenDocument(format) => {
                let was_scrolling = self.auto_scroll;
                self.format = Some(format);
                self.current_page = 1;
                self.total_pages = 0;
                self.rotation = Rotation::Deg0;
                self.auto_scroll = false;
                if was_scrolling {
                    vec![Effect::StopAutoAdvance]
                } else {
                    vec![]
                }
            }

            Command::CloseDocument => {
                let was_scrolling = self.auto_scroll;
                self.format = None;
                self.current_page = 1;
                self.total_pages = 0;
                self.auto_scroll = false;
                if was_scrolling {
                    vec![Effect::StopAutoAdvance]
                } else {
                    vec![]
                }
            }

            Command::SetPageCount(count) => {
                self.total_pages = count;
                self.current_page = self.clamp_page(self.current_page);
                vec![Effect::Refresh(Invalidation::Page)]
            }

            Command::SetZoom(zoom) => self.set_zoom(zoom),
            Command::ZoomIn => self.set_zoom(self.zoom + self.zoom_step),
            Command::ZoomOut => self.set_zoom(self.zoom - self.zoom_step),

            Command::GoToPage(page) => self.go_to_page(page),
            Command::NextPage => {
                if self.can_go_next() {
                    self.go_to_page(self.current_page + 1)
                } else {
                    vec![]
                }
            }
            Command::PrevPage => {
                if self.can_go_prev() {
                    self.go_to_page(self.current_page - 1)
                } else {
                    vec![]
                }
            }

            Command::AdvancePage => {
                if self.total_pages == 0 {
                    return vec![];
                }
                let next = if self.current_page >= self.total_pages {
                    1
                } else {
                    self.current_page + 1
                };
                self.go_to_page(next)
            }

            Command::Rotate => {
                if self.format.is_some_and(|f| f.is_paginated()) {
                    self.rotation = self.rotation.clockwise();
                    vec![Effect::Refresh(Invalidation::Geometry)]
                } else {
                    vec![]
                }
            }

            Command::SetTheme(theme) => {
                if self.theme != theme {
                    self.theme = theme;
                    vec![Effect::Refresh(Invalidation::Palette)]
                } else {
                    vec![]
                }
            }

            Command::SetContrast(contrast) => {
                let clamped = theme::clamp_contrast(contrast);
                if (self.contrast - clamped).abs() > f32::EPSILON {
                    self.contrast = clamped;
                    vec![Effect::Refresh(Invalidation::Filter)]
                } else {
                    vec![]
                }
            }

            Command::SetBrightness(brightness) => {
                let clamped = theme::clamp_brightness(brightness);
                if (self.brightness - clamped).abs() > f32::EPSILON {
                    self.brightness = clamped;
                    vec![Effect::Refresh(Invalidation::Filter)]
                } else {
                    vec![]
                }
            }

            Command::ResetVisual => {
                let mut effects = self.set_zoom(1.0);
                let filter_changed = (self.contrast - 1.0).abs() > f32::EPSILON
                    || (self.brightness - 1.0).abs() > f32::EPSILON;
                self.contrast = 1.0;
                self.brightness = 1.0;
                if filter_changed {
                    effects.push(Effect::Refresh(Invalidation::Filter));
                }
                effects
            }

            Command::ToggleAutoScroll => {
                self.auto_scroll = !self.auto_scroll;
                if self.auto_scroll {
                    vec![Effect::StartAutoAdvance]
                } else {
                    vec![Effect::StopAutoAdvance]
                }
            }

            Command::SetScrollSpeed(speed) => {
                let clamped = clamp_scroll_speed(speed);
                if (self.scroll_speed - clamped).abs() <= f32::EPSILON {
                    return vec![];
                }
                self.scroll_speed = clamped;
                if self.auto_scroll {
                    // Restart so the old period never fires again
                    vec![Effect::StopAutoAdvance, Effect::StartAutoAdvance]
                } else {
                    vec![]
                }
            }
        }
    }

    fn set_zoom(&mut self, zoom: f32) -> Vec<Effect> {
        let clamped = clamp_zoom(zoom);
        if (self.zoom - clamped).abs() > f32::EPSILON {
            self.zoom = clamped;
            vec![Effect::Refresh(Invalidation::Geometry)]
        } else {
            vec![]
        }
    }

    fn go_to_page(&mut self, page: usize) -> Vec<Effect> {
        let clamped = self.clamp_page(page);
        if self.current_page != clamped {
            self.current_page = clamped;
            vec![Effect::Refresh(Invalidation::Page)]
        } else {
            vec![]
        }
    }
}

/// Clamp zoom to its range, rounding away accumulated float drift
pub fn clamp_zoom(zoom: f32) -> f32 {
    let clamped = theme::clamp_finite(zoom, MIN_ZOOM, MAX_ZOOM);
    (clamped * 1000.0).round() / 1000.0
}

pub fn clamp_scroll_speed(speed: f32) -> f32 {
    theme::clamp_finite(speed, MIN_SCROLL_SPEED, MAX_SCROLL_SPEED)
}

/// Commands that modify view state
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// A new document was selected; resets pagination
    OpenDocument(Format),
    /// The document was closed without a replacement
    CloseDocument,
    /// The strategy finished loading and reported its page count
    SetPageCount(usize),
    SetZoom(f32),
    ZoomIn,
    ZoomOut,
    GoToPage(usize),
    NextPage,
    PrevPage,
    /// Auto-advance tick: next page, wrapping to the first
    AdvancePage,
    /// Rotate 90 degrees clockwise (paginated formats only)
    Rotate,
    SetTheme(ThemeId),
    SetContrast(f32),
    SetBrightness(f32),
    /// Reset zoom, contrast and brightness to 1.0
    ResetVisual,
    ToggleAutoScroll,
    SetScrollSpeed(f32),
}

/// What part of the rendered surface a state change invalidated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// The current page changed
    Page,
    /// Zoom or rotation changed
    Geometry,
    /// Theme changed
    Palette,
    /// Contrast or brightness changed
    Filter,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Refresh(Invalidation),
    /// Arm the auto-advance timer at the current scroll speed
    StartAutoAdvance,
    /// Cancel the auto-advance timer
    StopAutoAdvance,
}
