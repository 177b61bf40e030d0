/// Manual lens assignment
///
/// Applies the lens panel's choices to a batch of selected images.
/// Every image is processed on its own: a failure on one image is recorded
/// in its report and never stops the rest of the batch.

use chrono::NaiveDateTime;
use std::fmt;
use std::path::Path;
use tracing::{error, info, warn};

use crate::lens::{resolve, LensTables, Resolution};
use crate::metadata::{MetadataEdit, MetadataWriter, WriteStatus};
use crate::state::data::Image;
use crate::state::library::Library;

/// Tag attached to every image that gets a film camera
pub const FILM_TAG: &str = "Film";

/// What the lens panel asked for, captured at click time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOptions {
    /// Lens preset id
    pub preset: Option<String>,
    /// Capture time override
    pub capture_time: Option<NaiveDateTime>,
    /// Film camera, tagged as `Camera|<name>` plus `Film`
    pub camera: Option<String>,
    /// Film stock, tagged as `Film|<name>`
    pub film_stock: Option<String>,
}

impl ApplyOptions {
    /// Nothing selected at all
    pub fn is_empty(&self) -> bool {
        self.preset.is_none()
            && self.capture_time.is_none()
            && self.camera.is_none()
            && self.film_stock.is_none()
    }

    /// Tags these options attach, in attach order
    pub fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(camera) = &self.camera {
            tags.push(camera_tag(camera));
            tags.push(FILM_TAG.to_string());
        }
        if let Some(stock) = &self.film_stock {
            tags.push(film_stock_tag(stock));
        }
        tags
    }
}

pub fn camera_tag(camera: &str) -> String {
    format!("Camera|{}", camera)
}

pub fn film_stock_tag(stock: &str) -> String {
    format!("Film|{}", stock)
}

/// Directives planned for one image
#[derive(Debug, Clone, PartialEq)]
pub struct EditPlan {
    /// None when no preset was selected
    pub resolution: Option<Resolution>,
    pub edits: Vec<MetadataEdit>,
    /// The lens/camera pair is in the crop-fix table
    pub crop_fix: bool,
}

/// One directive and how writing it to the catalog went
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveOutcome {
    pub edit: MetadataEdit,
    pub error: Option<String>,
}

/// How the metadata writer run for one image went
#[derive(Debug, Clone, PartialEq)]
pub enum WriterOutcome {
    /// No directives, nothing to write
    Skipped,
    Finished(WriteStatus),
    /// The writer could not be run
    Failed(String),
}

/// One tag and whether it could be created and attached
#[derive(Debug, Clone, PartialEq)]
pub struct TagOutcome {
    pub tag: String,
    pub error: Option<String>,
}

/// Everything that happened to one image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub image_id: i64,
    /// The image could not be loaded; nothing else was attempted
    pub load_error: Option<String>,
    pub resolution: Option<Resolution>,
    pub directives: Vec<DirectiveOutcome>,
    /// Crop factor reset to 1.0 (Some(error) if the write failed)
    pub crop_factor: Option<Option<String>>,
    pub writer: WriterOutcome,
    pub tags: Vec<TagOutcome>,
}

impl ImageReport {
    fn new(image_id: i64) -> Self {
        Self {
            image_id,
            load_error: None,
            resolution: None,
            directives: Vec::new(),
            crop_factor: None,
            writer: WriterOutcome::Skipped,
            tags: Vec::new(),
        }
    }

    /// No failure of any kind
    pub fn is_clean(&self) -> bool {
        self.load_error.is_none()
            && !matches!(
                self.resolution,
                Some(Resolution::UnknownPreset(_) | Resolution::NoSubstitution { .. })
            )
            && self.directives.iter().all(|d| d.error.is_none())
            && !matches!(self.crop_factor, Some(Some(_)))
            && !matches!(self.writer, WriterOutcome::Failed(_))
            && self.tags.iter().all(|t| t.error.is_none())
    }
}

/// Work out the directives for one image without touching anything
pub fn plan_edits(tables: &LensTables, image: &Image, options: &ApplyOptions) -> EditPlan {
    let mut edits = Vec::new();
    let mut crop_fix = false;

    let resolution = options
        .preset
        .as_deref()
        .map(|preset| resolve(tables, preset, image.raw_lens_name()));

    if let Some(lens) = resolution.as_ref().and_then(Resolution::lens) {
        edits.push(MetadataEdit::Lens(lens.name.clone()));

        let focal_length = lens.focal_length.as_deref().and_then(|v| v.parse::<f64>().ok());
        if let Some(mm) = focal_length {
            edits.push(MetadataEdit::FocalLength(mm));
        }
        if let Some(f_number) = lens.aperture.as_deref().and_then(|v| v.parse::<f64>().ok()) {
            edits.push(MetadataEdit::Aperture(f_number));
        }

        // Only substitution entries are checked against the crop-fix table
        if lens.substitution && tables.needs_crop_fix(&lens.name, image.camera()) {
            crop_fix = true;
            match focal_length.or(image.focal_length).filter(|mm| *mm > 0.0) {
                Some(mm) => edits.push(MetadataEdit::FocalLengthIn35mm(mm.round() as u32)),
                None => warn!(
                    "⚠️  {}: crop fix without a usable focal length, 35mm value left as is",
                    image.filename
                ),
            }
        }
    }

    if let Some(time) = options.capture_time {
        edits.push(MetadataEdit::CaptureTime(time));
    }

    EditPlan {
        resolution,
        edits,
        crop_fix,
    }
}

/// Apply the lens panel options to every image in `image_ids`
pub fn apply_to_images(
    library: &Library,
    tables: &LensTables,
    writer: &dyn MetadataWriter,
    image_ids: &[i64],
    options: &ApplyOptions,
) -> Vec<ImageReport> {
    let reports: Vec<ImageReport> = image_ids
        .iter()
        .map(|&image_id| apply_to_image(library, tables, writer, image_id, options))
        .collect();

    info!("🔧 Lens apply finished: {}", ApplySummary::from_reports(&reports));
    reports
}

fn apply_to_image(
    library: &Library,
    tables: &LensTables,
    writer: &dyn MetadataWriter,
    image_id: i64,
    options: &ApplyOptions,
) -> ImageReport {
    let mut report = ImageReport::new(image_id);

    let image = match library.image(image_id) {
        Ok(image) => image,
        Err(e) => {
            error!("❌ Cannot load image {}: {}", image_id, e);
            report.load_error = Some(e.to_string());
            return report;
        }
    };

    let plan = plan_edits(tables, &image, options);
    match &plan.resolution {
        Some(Resolution::NoSubstitution { raw }) => {
            warn!("⚠️  {}: no substitution for lens '{}'", image.filename, raw)
        }
        Some(Resolution::UnknownPreset(id)) => {
            warn!("⚠️  {}: unknown lens preset '{}'", image.filename, id)
        }
        _ => {}
    }

    report.directives = plan
        .edits
        .iter()
        .map(|edit| DirectiveOutcome {
            edit: edit.clone(),
            error: store_edit(library, image_id, edit).err().map(|e| e.to_string()),
        })
        .collect();

    if plan.crop_fix {
        let result = library.set_crop_factor(image_id, 1.0);
        report.crop_factor = Some(result.err().map(|e| e.to_string()));
    }

    if !plan.edits.is_empty() {
        report.writer = match writer.write(Path::new(&image.path), &plan.edits) {
            Ok(status) => WriterOutcome::Finished(status),
            Err(e) => {
                error!("❌ Could not write metadata for {}: {}", image.filename, e);
                WriterOutcome::Failed(e.to_string())
            }
        };
    }

    report.tags = options
        .tags()
        .into_iter()
        .map(|tag| {
            let result = library
                .find_or_create_tag(&tag)
                .and_then(|tag_id| library.attach_tag(image_id, tag_id));
            TagOutcome {
                error: result.err().map(|e| e.to_string()),
                tag,
            }
        })
        .collect();

    report.resolution = plan.resolution;
    report
}

/// Write one directive to the catalog record
fn store_edit(library: &Library, image_id: i64, edit: &MetadataEdit) -> crate::error::Result<()> {
    match edit {
        MetadataEdit::Lens(name) => library.set_lens_name(image_id, name),
        MetadataEdit::FocalLength(mm) => library.set_focal_length(image_id, *mm),
        MetadataEdit::Aperture(f_number) => library.set_aperture(image_id, *f_number),
        MetadataEdit::CaptureTime(time) => library.set_capture_time(image_id, *time),
        // Not stored in the catalog; the crop factor reset covers it
        MetadataEdit::FocalLengthIn35mm(_) => Ok(()),
    }
}

/// Batch totals for the status line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub images: usize,
    pub clean: usize,
    pub unresolved: usize,
    /// Images that could not be loaded from the catalog
    pub missing: usize,
    /// Images whose metadata writer could not run
    pub failed_writes: usize,
    pub failed_tags: usize,
}

impl ApplySummary {
    pub fn from_reports(reports: &[ImageReport]) -> Self {
        let mut summary = Self {
            images: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.is_clean() {
                summary.clean += 1;
            }
            if matches!(
                report.resolution,
                Some(Resolution::UnknownPreset(_) | Resolution::NoSubstitution { .. })
            ) {
                summary.unresolved += 1;
            }
            if report.load_error.is_some() {
                summary.missing += 1;
            }
            if matches!(report.writer, WriterOutcome::Failed(_)) {
                summary.failed_writes += 1;
            }
            summary.failed_tags += report.tags.iter().filter(|t| t.error.is_some()).count();
        }
        summary
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} images updated cleanly", self.clean, self.images)?;
        if self.unresolved > 0 {
            write!(f, ", {} without a lens match", self.unresolved)?;
        }
        if self.missing > 0 {
            write!(f, ", {} not found", self.missing)?;
        }
        if self.failed_writes > 0 {
            write!(f, ", {} file writes failed", self.failed_writes)?;
        }
        if self.failed_tags > 0 {
            write!(f, ", {} tags not attached", self.failed_tags)?;
        }
        Ok(())
    }
}
