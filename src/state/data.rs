/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the database layer, the lens flows and the UI layer.

use chrono::NaiveDateTime;

/// Represents a single image in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Unique database ID
    pub id: i64,
    /// Filename only (e.g., "DSC_0001.NEF")
    pub filename: String,
    /// Full path to the RAW file
    pub path: String,
    /// Lens name as stored in the catalog (raw EXIF name until fixed)
    pub lens_name: Option<String>,
    /// Lens name the file reported at import; never rewritten
    pub exif_lens_name: Option<String>,
    /// Camera model as reported by EXIF
    pub camera_model: Option<String>,
    /// Actual focal length in mm
    pub focal_length: Option<f64>,
    /// F-number
    pub aperture: Option<f64>,
    /// Sensor crop factor relative to 35mm
    pub crop_factor: Option<f64>,
    /// Capture timestamp
    pub capture_time: Option<NaiveDateTime>,
    /// File status: 'exists' or 'deleted'
    pub file_status: String,
}

impl Image {
    /// Lens name from the file's EXIF at import, or "" when it had none
    pub fn raw_lens_name(&self) -> &str {
        self.exif_lens_name.as_deref().unwrap_or("")
    }

    /// Camera model, or "" when EXIF had none
    pub fn camera(&self) -> &str {
        self.camera_model.as_deref().unwrap_or("")
    }
}
