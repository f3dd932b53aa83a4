//! Document viewer core: PDF, Word and plain-text rendering behind one
//! presentation contract with shared zoom, theme and pagination.

pub mod auto_advance;
pub mod error;
pub mod format;
pub mod keymap;
pub mod logging;
pub mod pdf;
pub mod settings;
pub mod strategy;
pub mod surface;
pub mod task;
pub mod text;
pub mod theme;
pub mod view_state;
pub mod viewer;
pub mod word;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Result, ViewerError};
pub use format::{Document, Format};
pub use settings::Settings;
pub use surface::{Presentation, Surface};
pub use theme::ThemeId;
pub use view_state::{Command, ViewState};
pub use viewer::{Collaborators, Status, Viewer, ViewerEvent};
