// src/ui/mod.rs

// Terminal presentation: colors, formatting and the live progress block.

pub mod render;
pub mod theme;
pub mod utils;

pub use theme::Theme;
