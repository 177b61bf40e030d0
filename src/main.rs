use iced::widget::{button, checkbox, column, container, row, scrollable, text, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

mod apply;
mod config;
mod error;
mod lens;
mod metadata;
mod state;
mod ui;

use apply::{apply_to_images, ApplySummary};
use config::Settings;
use error::LensError;
use lens::LensTables;
use metadata::ExifTool;
use state::data::Image;
use state::events::{self, Event};
use state::library::Library;
use ui::lens_panel::{LensPanel, PanelMessage};

/// Supported RAW file extensions (common formats)
const RAW_EXTENSIONS: &[&str] = &[
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2",
    "pef", "srw", "erf", "kdc", "dcr", "mos", "raw", "rwl",
];

/// Result of a folder import operation
#[derive(Debug, Clone, Default)]
struct ImportResult {
    imported_count: usize,
    skipped_count: usize,
    /// Import hooks that returned an error
    hook_failures: usize,
    /// The import could not run at all
    error: Option<String>,
}

/// Main application state
struct LensFix {
    /// The catalog database
    library: Library,
    /// Metadata writer for the lens panel
    exiftool: ExifTool,
    /// Images shown in the list, newest first
    images: Vec<Image>,
    /// Tag names per image ID, shown next to each image
    tags: HashMap<i64, Vec<String>>,
    /// IDs of the images ticked in the list
    selected: BTreeSet<i64>,
    panel: LensPanel,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Import Folder" button
    ImportFolder,
    /// Background import completed with results
    ImportComplete(ImportResult),
    /// An image checkbox was toggled
    ToggleImage(i64, bool),
    SelectAll,
    SelectNone,
    Panel(PanelMessage),
    /// User clicked "Apply to selected"
    Apply,
}

impl LensFix {
    /// Create a new instance of the application
    fn new(library: Library, settings: Settings) -> (Self, Task<Message>) {
        let exiftool = ExifTool::from_settings(&settings);
        let mut status = String::new();

        if !exiftool.available() {
            warn!("⚠️  exiftool not found at {}", settings.exiftool_path.display());
            status = format!(
                "exiftool not found at {}: files will not be updated. ",
                settings.exiftool_path.display()
            );
        }

        if let Err(e) = library.verify_files() {
            warn!("⚠️  Could not verify catalog files: {}", e);
        }

        let images = library.all_images().unwrap_or_else(|e| {
            error!("❌ Could not load catalog: {}", e);
            Vec::new()
        });
        let tags = load_tags(&library, &images);
        info!("🎨 Lens Fix initialized with {} images", images.len());
        status.push_str(&format!("Ready. {} images in library.", images.len()));

        (
            LensFix {
                library,
                exiftool,
                images,
                tags,
                selected: BTreeSet::new(),
                panel: LensPanel::new(),
                status,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImportFolder => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with RAW Photos")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Importing from {}...", folder_path.display());

                    // The import task opens its own connection
                    let db_path = self.library.path().clone();
                    let exiftool = self.exiftool.clone();

                    return Task::perform(
                        import_folder_async(folder_path, db_path, exiftool),
                        Message::ImportComplete,
                    );
                }

                Task::none()
            }
            Message::ImportComplete(result) => {
                self.status = match &result.error {
                    Some(e) => format!("❌ Import failed: {}", e),
                    None => format!(
                        "✅ Import complete! Added {} images, skipped {} duplicates.",
                        result.imported_count, result.skipped_count
                    ),
                };
                if result.hook_failures > 0 {
                    self.status
                        .push_str(&format!(" {} lens fixes failed.", result.hook_failures));
                }

                self.reload_images();
                Task::none()
            }
            Message::ToggleImage(image_id, checked) => {
                if checked {
                    self.selected.insert(image_id);
                } else {
                    self.selected.remove(&image_id);
                }
                Task::none()
            }
            Message::SelectAll => {
                self.selected = self.images.iter().map(|image| image.id).collect();
                Task::none()
            }
            Message::SelectNone => {
                self.selected.clear();
                Task::none()
            }
            Message::Panel(message) => {
                self.panel.update(message);
                Task::none()
            }
            Message::Apply => {
                self.apply_lens_panel();
                Task::none()
            }
        }
    }

    /// Run the manual lens flow on the current selection.
    /// Blocks the UI until exiftool has finished with every image.
    fn apply_lens_panel(&mut self) {
        if self.selected.is_empty() {
            self.status = "No images selected.".to_string();
            return;
        }

        let options = match self.panel.options() {
            Ok(options) => options,
            Err(message) => {
                self.status = message;
                return;
            }
        };
        if options.is_empty() {
            self.status =
                "Nothing to apply: pick a lens, capture time, camera or film stock.".to_string();
            return;
        }

        let image_ids: Vec<i64> = self.selected.iter().copied().collect();
        let reports = apply_to_images(
            &self.library,
            LensTables::builtin(),
            &self.exiftool,
            &image_ids,
            &options,
        );

        self.status = format!("🔧 {}", ApplySummary::from_reports(&reports));
        self.reload_images();
    }

    fn reload_images(&mut self) {
        match self.library.all_images() {
            Ok(images) => {
                // Drop selections for images that are gone
                self.selected
                    .retain(|id| images.iter().any(|image| image.id == *id));
                self.tags = load_tags(&self.library, &images);
                self.images = images;
            }
            Err(e) => error!("❌ Could not reload catalog: {}", e),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let no_tags = Vec::new();
        let image_list = Column::with_children(self.images.iter().map(|image| -> Element<Message> {
            let image_id = image.id;
            let tags = self.tags.get(&image_id).unwrap_or(&no_tags);
            checkbox(image_label(image, tags), self.selected.contains(&image_id))
                .on_toggle(move |checked| Message::ToggleImage(image_id, checked))
                .into()
        }))
        .spacing(6);

        let toolbar = row![
            button("Import Folder")
                .on_press(Message::ImportFolder)
                .padding(10),
            button("Select All").on_press(Message::SelectAll).padding(10),
            button("Select None").on_press(Message::SelectNone).padding(10),
            text(format!("{} selected", self.selected.len())),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let side_panel = column![
            self.panel.view(LensTables::builtin()).map(Message::Panel),
            button("Apply to selected")
                .on_press(Message::Apply)
                .padding(10),
        ]
        .spacing(20);

        let content: Column<Message> = column![
            text("Lens Fix").size(36),
            toolbar,
            row![
                scrollable(image_list)
                    .width(Length::Fill)
                    .height(Length::Fill),
                side_panel,
            ]
            .spacing(20)
            .height(Length::Fill),
            text(&self.status).size(16),
        ]
        .spacing(20)
        .padding(20);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// One line per image: file, lens, camera, tags
fn image_label(image: &Image, tags: &[String]) -> String {
    let lens = image.lens_name.as_deref().unwrap_or("no lens");
    let camera = image.camera_model.as_deref().unwrap_or("unknown camera");
    let mut label = format!("{}  ·  {}  ·  {}", image.filename, lens, camera);
    if !tags.is_empty() {
        label.push_str(&format!("  ·  [{}]", tags.join(", ")));
    }
    if image.file_status == "deleted" {
        label.push_str("  (missing)");
    }
    label
}

fn load_tags(library: &Library, images: &[Image]) -> HashMap<i64, Vec<String>> {
    images
        .iter()
        .filter_map(|image| match library.tags_for_image(image.id) {
            Ok(tags) => Some((image.id, tags)),
            Err(e) => {
                warn!("⚠️  Could not load tags for {}: {}", image.filename, e);
                None
            }
        })
        .collect()
}

fn open_library(settings: &Settings) -> error::Result<Library> {
    let db_path = settings.database_path().ok_or_else(|| {
        LensError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine user data directory",
        ))
    })?;
    Library::open(&db_path)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wgpu_core=warn,wgpu_hal=warn,iced_wgpu=warn".into()),
        )
        .init();
}

fn main() -> iced::Result {
    init_tracing();

    let settings = Settings::load().unwrap_or_else(|e| {
        warn!("⚠️  Could not read settings, using defaults: {}", e);
        Settings::default()
    });

    let library = match open_library(&settings) {
        Ok(library) => library,
        Err(e) => {
            error!("❌ Failed to open catalog. Check permissions and disk space: {}", e);
            std::process::exit(1);
        }
    };

    events::init();
    if let Err(e) = apply::import::register() {
        error!("❌ Could not register import lens fix: {}", e);
    }

    let result = iced::application("Lens Fix", LensFix::update, LensFix::view)
        .theme(LensFix::theme)
        .centered()
        .run_with(move || LensFix::new(library, settings));

    apply::import::unregister();
    events::shutdown();
    result
}

/// Import all RAW files from a folder.
/// Runs on a blocking thread since every file goes through exiftool.
async fn import_folder_async(
    folder_path: PathBuf,
    db_path: PathBuf,
    exiftool: ExifTool,
) -> ImportResult {
    tokio::task::spawn_blocking(move || import_folder(&folder_path, &db_path, &exiftool))
        .await
        .unwrap_or_else(|e| ImportResult {
            error: Some(format!("Task join error: {}", e)),
            ..ImportResult::default()
        })
}

fn import_folder(folder_path: &Path, db_path: &Path, exiftool: &ExifTool) -> ImportResult {
    let mut result = ImportResult::default();

    // rusqlite::Connection is not Sync, so this thread gets its own catalog handle
    let library = match Library::open(db_path) {
        Ok(library) => library,
        Err(e) => {
            error!("❌ Could not open catalog for import: {}", e);
            result.error = Some(e.to_string());
            return result;
        }
    };

    info!("🔍 Scanning folder: {}", folder_path.display());

    for entry in WalkDir::new(folder_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_raw_file(path) {
            continue;
        }

        let path_str = path.to_string_lossy().to_string();
        let filename = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let exif = exiftool.read(path).unwrap_or_else(|e| {
            warn!("⚠️  No EXIF for {}: {}", filename, e);
            Default::default()
        });

        match library.import_image(&path_str, &filename, &exif) {
            Ok(Some(image_id)) => {
                result.imported_count += 1;
                for outcome in events::emit(Event::ImageImported, &library, image_id) {
                    if let Err(e) = outcome.result {
                        warn!("⚠️  {}: '{}' failed: {}", filename, outcome.handler, e);
                        result.hook_failures += 1;
                    }
                }
                if result.imported_count % 100 == 0 {
                    info!("⏳ Imported {} files...", result.imported_count);
                }
            }
            Ok(None) => result.skipped_count += 1,
            Err(e) => warn!("⚠️  Error importing {}: {}", filename, e),
        }
    }

    info!(
        "✅ Import complete: {} new, {} skipped",
        result.imported_count, result.skipped_count
    );
    match library.image_count() {
        Ok(total) => info!("📚 Catalog now holds {} images", total),
        Err(e) => warn!("⚠️  Could not count catalog images: {}", e),
    }

    result
}

fn is_raw_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| RAW_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}
