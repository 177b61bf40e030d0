use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::data::Image;
use crate::error::{LensError, Result};
use crate::metadata::edit::EXIF_DATETIME_FORMAT;
use crate::metadata::ExifSummary;

/// Columns selected for every `Image` query, in `image_from_row` order
const IMAGE_COLUMNS: &str = "id, filename, path, lens_name, exif_lens_name, camera_model, \
     focal_length, aperture, crop_factor, capture_time, COALESCE(file_status, 'exists')";

/// The Library manages the SQLite catalog database.
/// It stores image metadata, tags, and references to RAW files.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the catalog at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        info!("📁 Catalog opened at: {}", db_path.display());

        let mut library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.init_schema()?;

        Ok(library)
    }

    /// A throwaway catalog that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let mut library = Library {
            conn: Connection::open_in_memory()?,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&mut self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Lens and capture fields are written by the import hook and the lens panel
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL UNIQUE,
                filename        TEXT NOT NULL,
                imported_at     INTEGER NOT NULL,
                lens_name       TEXT,
                exif_lens_name  TEXT,
                camera_model    TEXT,
                focal_length    REAL,
                aperture        REAL,
                crop_factor     REAL,
                capture_time    TEXT,
                file_status     TEXT DEFAULT 'exists'
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tags (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS image_tags (
                image_id        INTEGER NOT NULL,
                tag_id          INTEGER NOT NULL,
                PRIMARY KEY(image_id, tag_id),
                FOREIGN KEY(image_id) REFERENCES images(id) ON DELETE CASCADE,
                FOREIGN KEY(tag_id) REFERENCES tags(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Catalogs created before exif_lens_name existed: start it from the
        // current lens name. The ALTER fails harmlessly when the column is there.
        if self
            .conn
            .execute("ALTER TABLE images ADD COLUMN exif_lens_name TEXT", [])
            .is_ok()
        {
            self.conn.execute(
                "UPDATE images SET exif_lens_name = lens_name WHERE exif_lens_name IS NULL",
                [],
            )?;
        }

        // Create indexes for fast queries
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_imported_at
             ON images(imported_at DESC)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_image_tags_tag_id
             ON image_tags(tag_id)",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Get a count of images in the library
    pub fn image_count(&self) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM images",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Import a new image into the library.
    /// The EXIF lens name lands in both `lens_name`, which the lens flows
    /// rewrite, and `exif_lens_name`, which keeps what the file reported.
    /// Returns the new image ID, or None if the path is already cataloged.
    pub fn import_image(
        &self,
        path: &str,
        filename: &str,
        exif: &ExifSummary,
    ) -> Result<Option<i64>> {
        let result = self.conn.execute(
            "INSERT INTO images (path, filename, imported_at, lens_name, exif_lens_name,
                                 camera_model, focal_length, aperture, crop_factor, capture_time)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                path,
                filename,
                Utc::now().timestamp(),
                exif.lens_name,
                exif.camera_model,
                exif.focal_length,
                exif.aperture,
                exif.crop_factor,
                exif.capture_time.map(format_time),
            ],
        );

        match result {
            Ok(_) => Ok(Some(self.conn.last_insert_rowid())),
            // UNIQUE constraint on path: already in the catalog
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get one image by ID
    pub fn image(&self, image_id: i64) -> Result<Image> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM images WHERE id = ?1", IMAGE_COLUMNS),
                params![image_id],
                image_from_row,
            )
            .optional()?
            .ok_or(LensError::ImageNotFound(image_id))
    }

    /// Get all images from the library
    /// Returns a vector of Image structs ordered by import date (newest first)
    pub fn all_images(&self) -> Result<Vec<Image>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM images ORDER BY imported_at DESC, id DESC",
            IMAGE_COLUMNS
        ))?;

        let images = stmt
            .query_map([], image_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(images)
    }

    pub fn set_lens_name(&self, image_id: i64, lens_name: &str) -> Result<()> {
        self.update_column(image_id, "lens_name", &lens_name)
    }

    pub fn set_focal_length(&self, image_id: i64, focal_length: f64) -> Result<()> {
        self.update_column(image_id, "focal_length", &focal_length)
    }

    pub fn set_aperture(&self, image_id: i64, aperture: f64) -> Result<()> {
        self.update_column(image_id, "aperture", &aperture)
    }

    pub fn set_crop_factor(&self, image_id: i64, crop_factor: f64) -> Result<()> {
        self.update_column(image_id, "crop_factor", &crop_factor)
    }

    pub fn set_capture_time(&self, image_id: i64, time: NaiveDateTime) -> Result<()> {
        self.update_column(image_id, "capture_time", &format_time(time))
    }

    /// Write one image column; `column` is always one of the literals above
    fn update_column(
        &self,
        image_id: i64,
        column: &'static str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<()> {
        let changed = self.conn.execute(
            &format!("UPDATE images SET {} = ?1 WHERE id = ?2", column),
            params![value, image_id],
        )?;
        if changed == 0 {
            return Err(LensError::ImageNotFound(image_id));
        }
        Ok(())
    }

    /// Look up a tag by its full name
    pub fn find_tag(&self, name: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    /// Get the ID of a tag, creating it if needed
    pub fn find_or_create_tag(&self, name: &str) -> Result<i64> {
        if let Some(id) = self.find_tag(name)? {
            return Ok(id);
        }
        self.conn
            .execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Attach a tag to an image.
    /// Returns false if the image already carried the tag.
    pub fn attach_tag(&self, image_id: i64, tag_id: i64) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?1, ?2)",
            params![image_id, tag_id],
        )?;
        Ok(inserted > 0)
    }

    /// Names of all tags on an image, sorted
    pub fn tags_for_image(&self, image_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tags t
             JOIN image_tags it ON it.tag_id = t.id
             WHERE it.image_id = ?1
             ORDER BY t.name",
        )?;
        let names = stmt
            .query_map(params![image_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Verify that RAW files still exist on disk
    /// Mark as 'deleted' if file is missing
    pub fn verify_files(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path FROM images WHERE file_status = 'exists'"
        )?;

        let existing_images: Vec<(i64, String)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();

        let mut deleted_count = 0;
        for (id, file_path) in existing_images {
            if !Path::new(&file_path).exists() {
                self.conn.execute(
                    "UPDATE images SET file_status = 'deleted' WHERE id = ?1",
                    params![id],
                )?;
                deleted_count += 1;
            }
        }

        if deleted_count > 0 {
            warn!("⚠️  Marked {} missing files as deleted", deleted_count);
        }

        Ok(deleted_count)
    }

    /// Run raw SQL against the catalog, for tests that need to break it
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    let capture_time: Option<String> = row.get(9)?;
    Ok(Image {
        id: row.get(0)?,
        filename: row.get(1)?,
        path: row.get(2)?,
        lens_name: row.get(3)?,
        exif_lens_name: row.get(4)?,
        camera_model: row.get(5)?,
        focal_length: row.get(6)?,
        aperture: row.get(7)?,
        crop_factor: row.get(8)?,
        capture_time: capture_time
            .and_then(|s| NaiveDateTime::parse_from_str(&s, EXIF_DATETIME_FORMAT).ok()),
        file_status: row.get(10)?,
    })
}

fn format_time(time: NaiveDateTime) -> String {
    time.format(EXIF_DATETIME_FORMAT).to_string()
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
