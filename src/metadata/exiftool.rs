/// exiftool integration
///
/// Reads lens and capture metadata when images are imported and writes
/// lens directives back into RAW files. exiftool runs as a blocking
/// subprocess, one invocation per image, with no timeout.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use super::edit::{self, MetadataEdit, EXIF_DATETIME_FORMAT};
use crate::config::Settings;
use crate::error::{LensError, Result};

/// Tags requested when reading an image at import time
const READ_TAGS: &[&str] = &[
    "-LensModel",
    "-Lens",
    "-Model",
    "-FocalLength",
    "-FNumber",
    "-ScaleFactor35efl",
    "-DateTimeOriginal",
];

/// How a write invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStatus {
    /// Process exit code (None if killed by a signal)
    pub exit_code: Option<i32>,
}

impl WriteStatus {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Writes metadata directives into an image file
pub trait MetadataWriter {
    /// Apply all `edits` to the file at `path` in a single invocation.
    /// Only a failure to launch the writer is an error; the exit status is
    /// reported as-is.
    fn write(&self, path: &Path, edits: &[MetadataEdit]) -> Result<WriteStatus>;
}

/// Lens and capture metadata read from a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    pub lens_name: Option<String>,
    pub camera_model: Option<String>,
    pub focal_length: Option<f64>,
    pub aperture: Option<f64>,
    pub crop_factor: Option<f64>,
    pub capture_time: Option<NaiveDateTime>,
}

/// Raw `exiftool -j -n` record. Values may come back as strings or numbers
/// depending on the tag and file, so they are kept loose here.
#[derive(Debug, Deserialize)]
struct ExifToolRecord {
    #[serde(rename = "LensModel")]
    lens_model: Option<Value>,
    #[serde(rename = "Lens")]
    lens: Option<Value>,
    #[serde(rename = "Model")]
    model: Option<Value>,
    #[serde(rename = "FocalLength")]
    focal_length: Option<Value>,
    #[serde(rename = "FNumber")]
    f_number: Option<Value>,
    #[serde(rename = "ScaleFactor35efl")]
    scale_factor: Option<Value>,
    #[serde(rename = "DateTimeOriginal")]
    date_time_original: Option<Value>,
}

impl ExifSummary {
    /// Parse the JSON array printed by `exiftool -j -n` for a single file
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<ExifToolRecord> = serde_json::from_str(json)?;
        let Some(record) = records.into_iter().next() else {
            return Ok(Self::default());
        };

        let lens_name = value_to_string(record.lens_model.as_ref())
            .or_else(|| value_to_string(record.lens.as_ref()));

        Ok(Self {
            lens_name,
            camera_model: value_to_string(record.model.as_ref()),
            focal_length: value_to_f64(record.focal_length.as_ref()),
            aperture: value_to_f64(record.f_number.as_ref()),
            crop_factor: value_to_f64(record.scale_factor.as_ref()),
            capture_time: value_to_string(record.date_time_original.as_ref()).and_then(|s| {
                NaiveDateTime::parse_from_str(&s, EXIF_DATETIME_FORMAT).ok()
            }),
        })
    }
}

/// The exiftool command-line program
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    keep_backups: bool,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>, keep_backups: bool) -> Self {
        Self {
            program: program.into(),
            keep_backups,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.exiftool_path, settings.keep_backups)
    }

    /// Check whether the program can be run at all
    pub fn available(&self) -> bool {
        Command::new(&self.program)
            .arg("-ver")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Read lens and capture metadata from one file
    pub fn read(&self, path: &Path) -> Result<ExifSummary> {
        let output = Command::new(&self.program)
            .arg("-j")
            .arg("-n")
            .args(READ_TAGS)
            .arg(path)
            .output()
            .map_err(|source| LensError::ToolLaunch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(LensError::ToolOutput {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        ExifSummary::from_json(&String::from_utf8_lossy(&output.stdout))
    }

    /// Full argument list for writing `edits` to `path`
    pub fn write_args(&self, path: &Path, edits: &[MetadataEdit]) -> Vec<OsString> {
        let mut args: Vec<OsString> = edit::exiftool_args(edits)
            .into_iter()
            .map(OsString::from)
            .collect();
        if !self.keep_backups {
            args.push("-overwrite_original".into());
        }
        args.push(path.as_os_str().to_owned());
        args
    }
}

impl MetadataWriter for ExifTool {
    fn write(&self, path: &Path, edits: &[MetadataEdit]) -> Result<WriteStatus> {
        let args = self.write_args(path, edits);
        debug!("exiftool {:?}", args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| LensError::ToolLaunch {
                program: self.program.clone(),
                source,
            })?;

        let status = WriteStatus {
            exit_code: output.status.code(),
        };
        if !status.success() {
            warn!(
                "⚠️  exiftool exited with {:?} for {}: {}",
                status.exit_code,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(status)
    }
}

fn value_to_string(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty() && text != "-").then_some(text)
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exiftool_json() {
        let json = r#"[{
            "SourceFile": "/photos/IMG_0001.CR2",
            "LensModel": "EF35mm f/2 IS USM",
            "Model": "Canon EOS RP",
            "FocalLength": 35,
            "FNumber": 2.8,
            "ScaleFactor35efl": 1.0,
            "DateTimeOriginal": "2023:08:14 09:12:44"
        }]"#;
        let summary = ExifSummary::from_json(json).unwrap();
        assert_eq!(summary.lens_name.as_deref(), Some("EF35mm f/2 IS USM"));
        assert_eq!(summary.camera_model.as_deref(), Some("Canon EOS RP"));
        assert_eq!(summary.focal_length, Some(35.0));
        assert_eq!(summary.aperture, Some(2.8));
        assert_eq!(summary.crop_factor, Some(1.0));
        assert_eq!(
            summary.capture_time.unwrap().format(EXIF_DATETIME_FORMAT).to_string(),
            "2023:08:14 09:12:44"
        );
    }

    #[test]
    fn test_parse_falls_back_to_lens_tag() {
        let json = r#"[{"Lens": "XF35mmF1.4 R", "Model": "X-T3", "FocalLength": "35.0"}]"#;
        let summary = ExifSummary::from_json(json).unwrap();
        assert_eq!(summary.lens_name.as_deref(), Some("XF35mmF1.4 R"));
        assert_eq!(summary.focal_length, Some(35.0));
        assert_eq!(summary.capture_time, None);
    }

    #[test]
    fn test_parse_ignores_placeholder_values() {
        let json =
            r#"[{"LensModel": "-", "Model": "", "DateTimeOriginal": "0000:00:00 00:00:00"}]"#;
        assert_eq!(ExifSummary::from_json(json).unwrap(), ExifSummary::default());
    }

    #[test]
    fn test_parse_empty_output() {
        assert_eq!(ExifSummary::from_json("[]").unwrap(), ExifSummary::default());
        assert!(ExifSummary::from_json("not json").is_err());
    }

    #[test]
    fn test_write_args() {
        let tool = ExifTool::new("exiftool", false);
        let args = tool.write_args(
            Path::new("/photos/scan.dng"),
            &[MetadataEdit::FocalLength(58.0)],
        );
        assert_eq!(
            args,
            vec![
                OsString::from("-FocalLength=58"),
                OsString::from("-overwrite_original"),
                OsString::from("/photos/scan.dng"),
            ]
        );

        let tool = ExifTool::new("exiftool", true);
        let args = tool.write_args(Path::new("a.dng"), &[]);
        assert_eq!(args, vec![OsString::from("a.dng")]);
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let tool = ExifTool::new("/nonexistent/exiftool-binary", false);
        assert!(!tool.available());

        let result = tool.write(Path::new("a.dng"), &[MetadataEdit::Aperture(2.0)]);
        assert!(matches!(result, Err(LensError::ToolLaunch { .. })));
    }
}
