//! Keyboard shortcuts mapped from crossterm key events

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::view_state::Command;

/// What a key press asks the viewer to do
#[derive(Clone, Debug, PartialEq)]
pub enum KeyAction {
    Command(Command),
    CycleTheme,
    ToggleLineNumbers,
    ToggleWordWrap,
    ToggleMonospace,
}

/// Ctrl on most platforms, Cmd (reported as SUPER) on macOS
fn is_accel(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER)
}

pub fn map_key(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if is_accel(key.modifiers) {
        return match key.code {
            KeyCode::Char('+' | '=') => Some(KeyAction::Command(Command::ZoomIn)),
            KeyCode::Char('-') => Some(KeyAction::Command(Command::ZoomOut)),
            KeyCode::Char('0') => Some(KeyAction::Command(Command::SetZoom(1.0))),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char('l' | 'n' | ' ') => {
            KeyAction::Command(Command::NextPage)
        }
        KeyCode::Left | KeyCode::PageUp | KeyCode::Char('h' | 'p') => {
            KeyAction::Command(Command::PrevPage)
        }
        KeyCode::Home | KeyCode::Char('g') => KeyAction::Command(Command::GoToPage(1)),
        KeyCode::End | KeyCode::Char('G') => KeyAction::Command(Command::GoToPage(usize::MAX)),
        KeyCode::Char('r') => KeyAction::Command(Command::Rotate),
        KeyCode::Char('a') => KeyAction::Command(Command::ToggleAutoScroll),
        KeyCode::Char('t') => KeyAction::CycleTheme,
        KeyCode::Char('#') => KeyAction::ToggleLineNumbers,
        KeyCode::Char('w') => KeyAction::ToggleWordWrap,
        KeyCode::Char('m') => KeyAction::ToggleMonospace,
        _ => return None,
    };
    Some(action)
}
