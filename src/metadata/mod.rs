/// File metadata module
///
/// This module handles:
/// - Metadata edit directives and their exiftool arguments (edit.rs)
/// - Running exiftool to read and write RAW file metadata (exiftool.rs)

pub mod edit;
pub mod exiftool;

pub use edit::MetadataEdit;
pub use exiftool::{ExifSummary, ExifTool, MetadataWriter, WriteStatus};
