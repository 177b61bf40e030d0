/// Static lens lookup tables
///
/// Three tables drive every lens fix in the catalog:
/// - Raw EXIF lens names mapped to the names Lensfun expects
/// - `lens|camera` pairs whose reported crop factor is wrong
/// - Lens presets offered in the lens panel
///
/// The built-in tables are compiled in and never change during a session.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use tracing::error;

use crate::error::{LensError, Result};

/// Separator between lens and camera in a crop-fix key
const CROP_KEY_SEPARATOR: char = '|';

/// Raw EXIF lens name -> Lensfun lens name
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("EF35mm f/2 IS USM", "Canon EF 35mm f/2 IS USM"),
    ("EF50mm f/1.8 STM", "Canon EF 50mm f/1.8 STM"),
    ("EF50mm f/1.4 USM", "Canon EF 50mm f/1.4 USM"),
    ("EF100mm f/2.8L Macro IS USM", "Canon EF 100mm f/2.8L Macro IS USM"),
    ("EF24-105mm f/4L IS USM", "Canon EF 24-105mm f/4L IS USM"),
    ("EF-S18-55mm f/3.5-5.6 IS STM", "Canon EF-S 18-55mm f/3.5-5.6 IS STM"),
    ("EF-S60mm f/2.8 Macro USM", "Canon EF-S 60mm f/2.8 Macro USM"),
    ("RF35mm F1.8 MACRO IS STM", "Canon RF 35mm F1.8 MACRO IS STM"),
    ("XF35mmF1.4 R", "Fujifilm XF 35mm f/1.4 R"),
    ("XF60mmF2.4 R Macro", "Fujifilm XF 60mm f/2.4 R Macro"),
    ("OLYMPUS M.60mm F2.8 Macro", "Olympus M.Zuiko Digital ED 60mm f/2.8 Macro"),
    ("OLYMPUS M.12-40mm F2.8", "Olympus M.Zuiko Digital ED 12-40mm f/2.8 Pro"),
    ("E 30mm F3.5 Macro", "Sony E 30mm F3.5 Macro"),
    ("FE 50mm F2.8 Macro", "Sony FE 50mm F2.8 Macro"),
    ("FE 90mm F2.8 Macro G OSS", "Sony FE 90mm F2.8 Macro G OSS"),
    ("AF-S Micro NIKKOR 60mm f/2.8G ED", "Nikon AF-S Micro-Nikkor 60mm f/2.8G ED"),
    ("AF-S DX Micro NIKKOR 40mm f/2.8G", "Nikon AF-S DX Micro-Nikkor 40mm f/2.8G"),
];

/// `lens|camera` pairs where the camera reports a crop factor that does not
/// match the image circle the lens actually covers
const CROP_FIXES: &[&str] = &[
    "Canon EF 100mm f/2.8L Macro IS USM|Canon EOS R6",
    "Canon EF 50mm f/1.8 STM|Canon EOS R6",
    "Canon EF 35mm f/2 IS USM|Canon EOS RP",
    "Sony FE 50mm F2.8 Macro|ILCE-6400",
    "Sony FE 90mm F2.8 Macro G OSS|ILCE-6400",
    "Nikon AF-S Micro-Nikkor 60mm f/2.8G ED|NIKON Z 50",
];

/// Lens panel presets: (id, focal length, aperture, substitution)
///
/// An empty focal length or aperture means the preset leaves that field alone.
const PRESETS: &[(&str, &str, &str, bool)] = &[
    ("EXIF lens (Lensfun name)", "", "", true),
    ("EXIF lens at 1:1 scan distance", "", "", true),
    ("Canon FD 50mm f/1.4 S.S.C.", "50", "1.4", false),
    ("Helios 44-2 58mm f/2", "58", "2", false),
    ("Jupiter-8 50mm f/2", "50", "2", false),
    ("Minolta MC Rokkor-PF 50mm f/1.7", "50", "1.7", false),
    ("Nikon Nikkor 50mm f/1.4 AI", "50", "1.4", false),
    ("Olympus OM Zuiko 28mm f/3.5", "28", "3.5", false),
    ("Pentax SMC Takumar 55mm f/1.8", "55", "1.8", false),
    ("Zeiss Tessar 45mm f/2.8", "45", "2.8", false),
];

/// Film cameras offered for the camera tag
pub const FILM_CAMERAS: &[&str] = &[
    "Canon AE-1",
    "Minolta X-700",
    "Nikon FM2",
    "Olympus OM-1",
    "Pentax K1000",
    "Zenit E",
];

/// Film stocks offered for the film-stock tag
pub const FILM_STOCKS: &[&str] = &[
    "CineStill 800T",
    "Fujifilm Superia 400",
    "Ilford HP5 Plus",
    "Kodak Gold 200",
    "Kodak Portra 400",
    "Kodak Tri-X 400",
];

/// A lens entry offered in the lens panel
#[derive(Debug, Clone, PartialEq)]
pub struct LensPreset {
    /// Unique preset id; doubles as the lens name for plain presets
    pub id: String,
    /// Focal length in mm, as written to EXIF
    pub focal_length: Option<String>,
    /// F-number, as written to EXIF
    pub aperture: Option<String>,
    /// The lens name comes from the substitution table instead of the id
    pub substitution: bool,
}

impl LensPreset {
    pub fn new(id: &str, focal_length: &str, aperture: &str, substitution: bool) -> Self {
        Self {
            id: id.to_string(),
            focal_length: non_empty(focal_length),
            aperture: non_empty(aperture),
            substitution,
        }
    }
}

/// The three lens lookup tables
#[derive(Debug, Clone)]
pub struct LensTables {
    substitutions: HashMap<String, String>,
    crop_fixes: HashSet<String>,
    presets: Vec<LensPreset>,
}

impl LensTables {
    /// Build tables from explicit entries, rejecting duplicate keys and
    /// non-numeric preset values
    pub fn new<'a>(
        substitutions: impl IntoIterator<Item = (&'a str, &'a str)>,
        crop_fixes: impl IntoIterator<Item = &'a str>,
        presets: Vec<LensPreset>,
    ) -> Result<Self> {
        let mut substitution_map = HashMap::new();
        for (raw, fixed) in substitutions {
            if substitution_map.insert(raw.to_string(), fixed.to_string()).is_some() {
                return Err(LensError::DuplicateKey {
                    table: "lens substitutions",
                    key: raw.to_string(),
                });
            }
        }

        let mut crop_set = HashSet::new();
        for key in crop_fixes {
            if !crop_set.insert(key.to_string()) {
                return Err(LensError::DuplicateKey {
                    table: "crop fixes",
                    key: key.to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        for preset in &presets {
            if preset.id.trim().is_empty() {
                return Err(LensError::InvalidPreset {
                    preset: preset.id.clone(),
                    field: "id",
                    value: preset.id.clone(),
                });
            }
            if !seen.insert(preset.id.as_str()) {
                return Err(LensError::DuplicateKey {
                    table: "lens presets",
                    key: preset.id.clone(),
                });
            }
            check_numeric(&preset.id, "focal length", preset.focal_length.as_deref())?;
            check_numeric(&preset.id, "aperture", preset.aperture.as_deref())?;
        }

        Ok(Self {
            substitutions: substitution_map,
            crop_fixes: crop_set,
            presets,
        })
    }

    /// The compiled-in tables, built once per process
    pub fn builtin() -> &'static LensTables {
        static BUILTIN: OnceLock<LensTables> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            LensTables::new(
                SUBSTITUTIONS.iter().copied(),
                CROP_FIXES.iter().copied(),
                builtin_presets(),
            )
            .unwrap_or_else(|e| {
                error!("❌ Built-in lens tables are invalid, lens fixes disabled: {}", e);
                LensTables {
                    substitutions: HashMap::new(),
                    crop_fixes: HashSet::new(),
                    presets: Vec::new(),
                }
            })
        })
    }

    /// Corrected lens name for a raw EXIF lens name
    pub fn substitute(&self, raw_lens_name: &str) -> Option<&str> {
        self.substitutions.get(raw_lens_name).map(String::as_str)
    }

    /// Whether this lens/camera pair is known to report a bad crop factor
    pub fn needs_crop_fix(&self, lens: &str, camera: &str) -> bool {
        self.crop_fixes.contains(&crop_fix_key(lens, camera))
    }

    pub fn preset(&self, id: &str) -> Option<&LensPreset> {
        self.presets.iter().find(|preset| preset.id == id)
    }

    /// Presets in declaration order
    pub fn presets(&self) -> &[LensPreset] {
        &self.presets
    }
}

/// Composite crop-fix key for a lens/camera pair
pub fn crop_fix_key(lens: &str, camera: &str) -> String {
    format!("{lens}{CROP_KEY_SEPARATOR}{camera}")
}

fn builtin_presets() -> Vec<LensPreset> {
    PRESETS
        .iter()
        .map(|(id, focal_length, aperture, substitution)| {
            LensPreset::new(id, focal_length, aperture, *substitution)
        })
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn check_numeric(preset: &str, field: &'static str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v.parse::<f64>().map(|n| !n.is_finite() || n <= 0.0).unwrap_or(true) => {
            Err(LensError::InvalidPreset {
                preset: preset.to_string(),
                field,
                value: v.to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_are_valid() {
        let tables = LensTables::new(
            SUBSTITUTIONS.iter().copied(),
            CROP_FIXES.iter().copied(),
            builtin_presets(),
        );
        assert!(tables.is_ok(), "{:?}", tables.err());
        assert_eq!(LensTables::builtin().presets().len(), PRESETS.len());
    }

    #[test]
    fn test_substitute() {
        let tables = LensTables::builtin();
        assert_eq!(
            tables.substitute("EF35mm f/2 IS USM"),
            Some("Canon EF 35mm f/2 IS USM")
        );
        assert_eq!(tables.substitute("Canon EF 35mm f/2 IS USM"), None);
        assert_eq!(tables.substitute(""), None);
    }

    #[test]
    fn test_crop_fix_key() {
        assert_eq!(crop_fix_key("A", "B"), "A|B");

        let tables = LensTables::new([], ["A|B"], Vec::new()).unwrap();
        assert!(tables.needs_crop_fix("A", "B"));
        assert!(!tables.needs_crop_fix("B", "A"));
        assert!(!tables.needs_crop_fix("A", ""));
    }

    #[test]
    fn test_every_crop_fix_names_a_substituted_lens() {
        let tables = LensTables::builtin();
        for key in CROP_FIXES {
            let (lens, _camera) = key.split_once(CROP_KEY_SEPARATOR).unwrap();
            assert!(
                SUBSTITUTIONS.iter().any(|(_, fixed)| *fixed == lens),
                "crop fix for unknown lens: {}",
                key
            );
            assert!(tables.crop_fixes.contains(*key));
        }
    }

    #[test]
    fn test_duplicate_substitution_rejected() {
        let result = LensTables::new([("a", "x"), ("a", "y")], [], Vec::new());
        assert!(matches!(
            result,
            Err(LensError::DuplicateKey { table: "lens substitutions", .. })
        ));
    }

    #[test]
    fn test_duplicate_crop_fix_rejected() {
        let result = LensTables::new([], ["A|B", "A|B"], Vec::new());
        assert!(matches!(result, Err(LensError::DuplicateKey { .. })));
    }

    #[test]
    fn test_duplicate_preset_rejected() {
        let presets = vec![
            LensPreset::new("Helios", "58", "2", false),
            LensPreset::new("Helios", "", "", true),
        ];
        let result = LensTables::new([], [], presets);
        assert!(matches!(
            result,
            Err(LensError::DuplicateKey { table: "lens presets", .. })
        ));
    }

    #[test]
    fn test_non_numeric_preset_rejected() {
        let presets = vec![LensPreset::new("Bad", "fifty", "2", false)];
        assert!(matches!(
            LensTables::new([], [], presets),
            Err(LensError::InvalidPreset { field: "focal length", .. })
        ));

        let presets = vec![LensPreset::new("", "50", "2", false)];
        assert!(LensTables::new([], [], presets).is_err());
    }

    #[test]
    fn test_empty_values_become_none() {
        let preset = LensPreset::new("X", "", "  ", true);
        assert_eq!(preset.focal_length, None);
        assert_eq!(preset.aperture, None);
    }

    #[test]
    fn test_presets_keep_declaration_order() {
        let ids: Vec<&str> = LensTables::builtin()
            .presets()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        let expected: Vec<&str> = PRESETS.iter().map(|p| p.0).collect();
        assert_eq!(ids, expected);
    }
}
