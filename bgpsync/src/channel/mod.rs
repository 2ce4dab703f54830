//! Channel layer: output buffering and prompt search.

mod buffer;

pub use buffer::PatternBuffer;
