/// Metadata edit directives
///
/// A `MetadataEdit` is one change to an image's lens or capture metadata.
/// The same directive is applied twice: to the catalog record and, as
/// exiftool arguments, to the file itself.

use chrono::NaiveDateTime;
use std::fmt;

/// EXIF date format used by exiftool and the lens panel
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataEdit {
    /// Lens model name
    Lens(String),
    /// Actual focal length in mm
    FocalLength(f64),
    /// F-number
    Aperture(f64),
    /// 35mm-equivalent focal length in mm
    FocalLengthIn35mm(u32),
    /// Capture timestamp
    CaptureTime(NaiveDateTime),
}

impl MetadataEdit {
    /// exiftool arguments that write this directive
    pub fn exiftool_args(&self) -> Vec<String> {
        match self {
            MetadataEdit::Lens(name) => vec![
                format!("-LensModel={}", name),
                format!("-LensType={}", name),
                format!("-Lens={}", name),
            ],
            MetadataEdit::FocalLength(mm) => vec![format!("-FocalLength={}", format_number(*mm))],
            MetadataEdit::Aperture(f_number) => {
                let value = format_number(*f_number);
                vec![
                    format!("-FNumber={}", value),
                    format!("-ApertureValue={}", value),
                    format!("-MaxApertureValue={}", value),
                ]
            }
            MetadataEdit::FocalLengthIn35mm(mm) => vec![format!("-FocalLengthIn35mmFormat={}", mm)],
            MetadataEdit::CaptureTime(time) => {
                let value = time.format(EXIF_DATETIME_FORMAT).to_string();
                vec![
                    format!("-DateTimeOriginal={}", value),
                    format!("-CreateDate={}", value),
                    format!("-ModifyDate={}", value),
                ]
            }
        }
    }
}

impl fmt::Display for MetadataEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataEdit::Lens(name) => write!(f, "lens = {}", name),
            MetadataEdit::FocalLength(mm) => write!(f, "focal length = {}mm", format_number(*mm)),
            MetadataEdit::Aperture(f_number) => {
                write!(f, "aperture = f/{}", format_number(*f_number))
            }
            MetadataEdit::FocalLengthIn35mm(mm) => write!(f, "35mm focal length = {}mm", mm),
            MetadataEdit::CaptureTime(time) => {
                write!(f, "capture time = {}", time.format(EXIF_DATETIME_FORMAT))
            }
        }
    }
}

/// All exiftool arguments for a list of directives, in order
pub fn exiftool_args(edits: &[MetadataEdit]) -> Vec<String> {
    edits.iter().flat_map(MetadataEdit::exiftool_args).collect()
}

/// Render a number without trailing zeros (50.0 -> "50", 1.40 -> "1.4")
fn format_number(value: f64) -> String {
    let rendered = format!("{:.2}", value);
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
