//! Word support: OOXML conversion, markup rendering and the flow strategy

pub mod converter;
pub mod markup;
pub mod strategy;
pub mod style;

pub use converter::{Conversion, ConversionError, DocxConverter, WordConverter};
pub use markup::{Block, Inline, RunStyle};
pub use strategy::{MarkupSurface, WordStrategy};
