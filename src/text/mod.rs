//! Plain text support: decoding, gutter layout and the flow strategy

pub mod layout;
pub mod strategy;

pub use layout::{TextOptions, TextSurface};
pub use strategy::TextStrategy;
