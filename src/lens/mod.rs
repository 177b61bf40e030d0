/// Lens rules
///
/// This module holds the static rules the catalog applies to lens metadata:
/// - Lookup tables for name substitution, crop fixes and presets (tables.rs)
/// - Resolution of a preset against an image's raw lens name (preset.rs)

pub mod preset;
pub mod tables;

pub use preset::{resolve, Resolution};
pub use tables::LensTables;
