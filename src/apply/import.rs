/// Import-time lens fixes
///
/// Runs for every image added to the catalog. Rewrites raw EXIF lens names
/// to their Lensfun names and resets the crop factor for known bad
/// lens/camera pairs. Only catalog fields change; files are not touched.

use tracing::{debug, info};

use crate::error::Result;
use crate::lens::LensTables;
use crate::state::events::{self, Event};
use crate::state::library::Library;

/// Name the handler is registered under
pub const HANDLER_NAME: &str = "lens-fix-on-import";

/// What the import hook did to one image
#[derive(Debug, Clone, PartialEq)]
pub enum ImportFix {
    /// No substitution for the raw lens name
    Unchanged,
    Renamed {
        from: String,
        to: String,
        /// Crop factor was reset to 1.0
        crop_fixed: bool,
    },
}

/// Fix the lens metadata of one freshly imported image.
/// The lookup uses the lens name the file reported, so running it again
/// gives the same result.
pub fn fix_imported_image(
    library: &Library,
    tables: &LensTables,
    image_id: i64,
) -> Result<ImportFix> {
    let image = library.image(image_id)?;

    let Some(new_name) = tables.substitute(image.raw_lens_name()) else {
        debug!("{}: no lens substitution for '{}'", image.filename, image.raw_lens_name());
        return Ok(ImportFix::Unchanged);
    };

    library.set_lens_name(image_id, new_name)?;

    // The crop table is keyed on the corrected name
    let crop_fixed = tables.needs_crop_fix(new_name, image.camera());
    if crop_fixed {
        library.set_crop_factor(image_id, 1.0)?;
    }

    Ok(ImportFix::Renamed {
        from: image.raw_lens_name().to_string(),
        to: new_name.to_string(),
        crop_fixed,
    })
}

/// Event handler for `Event::ImageImported`, using the built-in tables
pub fn on_image_imported(library: &Library, image_id: i64) -> Result<()> {
    if let ImportFix::Renamed {
        from,
        to,
        crop_fixed,
    } = fix_imported_image(library, LensTables::builtin(), image_id)?
    {
        info!(
            "🔁 Image {}: lens '{}' -> '{}'{}",
            image_id,
            from,
            to,
            if crop_fixed { " (crop factor 1.0)" } else { "" }
        );
    }
    Ok(())
}

/// Hook the import fix into the catalog's event table
pub fn register() -> Result<()> {
    events::register(Event::ImageImported, HANDLER_NAME, on_image_imported)
}

/// Remove the import fix from the catalog's event table
pub fn unregister() -> bool {
    events::unregister(Event::ImageImported, HANDLER_NAME)
}
