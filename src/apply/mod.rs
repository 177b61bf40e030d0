/// Lens flows
///
/// - Manual assignment from the lens panel (manual.rs)
/// - Automatic fixes for newly imported images (import.rs)

pub mod import;
pub mod manual;

pub use manual::{apply_to_images, ApplyOptions, ApplySummary};
