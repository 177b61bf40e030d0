/// Preset resolution
///
/// Turns a lens panel preset into the concrete lens metadata for one image.
/// Plain presets carry their own name; substitution presets borrow the name
/// from the image's raw EXIF lens via the substitution table.

use super::tables::LensTables;

/// Concrete lens metadata for one image
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLens {
    pub name: String,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    /// Resolved through the substitution table
    pub substitution: bool,
}

/// Outcome of resolving a preset for one image
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedLens),
    /// No preset with this id
    UnknownPreset(String),
    /// Substitution preset, but the raw lens name has no table entry
    NoSubstitution { raw: String },
}

impl Resolution {
    pub fn lens(&self) -> Option<&ResolvedLens> {
        match self {
            Resolution::Resolved(lens) => Some(lens),
            _ => None,
        }
    }
}

/// Resolve `preset_id` against the image's raw EXIF lens name
pub fn resolve(tables: &LensTables, preset_id: &str, raw_lens_name: &str) -> Resolution {
    let Some(preset) = tables.preset(preset_id) else {
        return Resolution::UnknownPreset(preset_id.to_string());
    };

    if !preset.substitution {
        return Resolution::Resolved(ResolvedLens {
            name: preset.id.clone(),
            focal_length: preset.focal_length.clone(),
            aperture: preset.aperture.clone(),
            substitution: false,
        });
    }

    match tables.substitute(raw_lens_name) {
        Some(name) => Resolution::Resolved(ResolvedLens {
            name: name.to_string(),
            focal_length: preset.focal_length.clone(),
            aperture: preset.aperture.clone(),
            substitution: true,
        }),
        None => Resolution::NoSubstitution {
            raw: raw_lens_name.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::tables::LensPreset;

    fn tables() -> LensTables {
        LensTables::new(
            [("EF35mm f/2 IS USM", "Canon EF 35mm f/2 IS USM")],
            [],
            vec![
                LensPreset::new("X", "", "", true),
                LensPreset::new("Macro 1:1", "100", "", true),
                LensPreset::new("Helios 44-2 58mm f/2", "50", "1.4", false),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_substitution_preset() {
        let resolution = resolve(&tables(), "X", "EF35mm f/2 IS USM");
        assert_eq!(
            resolution,
            Resolution::Resolved(ResolvedLens {
                name: "Canon EF 35mm f/2 IS USM".to_string(),
                focal_length: None,
                aperture: None,
                substitution: true,
            })
        );
    }

    #[test]
    fn test_substitution_keeps_preset_values() {
        let resolution = resolve(&tables(), "Macro 1:1", "EF35mm f/2 IS USM");
        let lens = resolution.lens().unwrap();
        assert_eq!(lens.name, "Canon EF 35mm f/2 IS USM");
        assert_eq!(lens.focal_length.as_deref(), Some("100"));
        assert_eq!(lens.aperture, None);
    }

    #[test]
    fn test_substitution_missing() {
        let resolution = resolve(&tables(), "X", "Some Unknown Lens");
        assert_eq!(
            resolution,
            Resolution::NoSubstitution {
                raw: "Some Unknown Lens".to_string()
            }
        );
        assert!(resolution.lens().is_none());
    }

    #[test]
    fn test_plain_preset_ignores_raw_name() {
        for raw in ["", "EF35mm f/2 IS USM", "anything"] {
            let resolution = resolve(&tables(), "Helios 44-2 58mm f/2", raw);
            let lens = resolution.lens().unwrap();
            assert_eq!(lens.name, "Helios 44-2 58mm f/2");
            assert_eq!(lens.focal_length.as_deref(), Some("50"));
            assert_eq!(lens.aperture.as_deref(), Some("1.4"));
            assert!(!lens.substitution);
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(
            resolve(&tables(), "nope", "EF35mm f/2 IS USM"),
            Resolution::UnknownPreset("nope".to_string())
        );
    }
}
