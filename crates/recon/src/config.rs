use serde::Deserialize;

use crate::detect::DEFAULT_IDENTITY_MARKERS;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A sync run: one snapshot, optional answer keys, one grid per subject.
/// File paths are relative to the config file.
#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    pub name: String,
    pub snapshot: String,
    #[serde(default)]
    pub answer_keys: Option<String>,
    pub sheets: Vec<SheetConfig>,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
    /// Matched against snapshot subject names (substring, case-insensitive).
    pub subject: String,
    /// `.csv` / `.tsv` / `.txt` or `.json` grid.
    pub file: String,
}

// ---------------------------------------------------------------------------
// Detection + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectConfig {
    #[serde(default = "default_identity_markers")]
    pub identity_markers: Vec<String>,
}

fn default_identity_markers() -> Vec<String> {
    DEFAULT_IDENTITY_MARKERS.iter().map(|m| m.to_string()).collect()
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            identity_markers: default_identity_markers(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the snapshot with merged evaluations.
    #[serde(default)]
    pub snapshot: Option<String>,
    /// Where to write the JSON sync report.
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.snapshot.trim().is_empty() {
            return Err(ReconError::ConfigValidation("snapshot path is empty".into()));
        }

        if self.sheets.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least 1 sheet is required".into(),
            ));
        }

        for (i, sheet) in self.sheets.iter().enumerate() {
            if sheet.subject.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "sheets[{i}]: subject is empty"
                )));
            }
            if sheet.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "sheets[{i}] ('{}'): file is empty",
                    sheet.subject
                )));
            }
        }

        if self.detect.identity_markers.is_empty() {
            return Err(ReconError::ConfigValidation(
                "detect.identity_markers must not be empty".into(),
            ));
        }
        if self.detect.identity_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "detect.identity_markers contains an empty marker".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "1r trimestre"
snapshot = "snapshot.json"
answer_keys = "answer_keys.csv"

[[sheets]]
subject = "Matemàtiques"
file = "mates.csv"

[[sheets]]
subject = "Català"
file = "catala.json"

[output]
snapshot = "snapshot.out.json"
"#;

    #[test]
    fn parse_valid() {
        let config = SyncConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "1r trimestre");
        assert_eq!(config.sheets.len(), 2);
        assert_eq!(config.sheets[1].file, "catala.json");
        assert_eq!(config.answer_keys.as_deref(), Some("answer_keys.csv"));
        assert_eq!(config.output.snapshot.as_deref(), Some("snapshot.out.json"));
        assert!(config.output.json.is_none());
        assert_eq!(config.detect, DetectConfig::default());
    }

    #[test]
    fn custom_markers() {
        let toml = r#"
name = "x"
snapshot = "s.json"
[[sheets]]
subject = "Anglès"
file = "a.csv"
[detect]
identity_markers = ["usuari"]
"#;
        let config = SyncConfig::from_toml(toml).unwrap();
        assert_eq!(config.detect.identity_markers, vec!["usuari".to_string()]);
    }

    #[test]
    fn no_sheets_rejected() {
        let toml = r#"
name = "x"
snapshot = "s.json"
sheets = []
"#;
        let err = SyncConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn empty_subject_rejected() {
        let toml = r#"
name = "x"
snapshot = "s.json"
[[sheets]]
subject = " "
file = "a.csv"
"#;
        let err = SyncConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("sheets[0]"));
    }

    #[test]
    fn empty_marker_rejected() {
        let toml = r#"
name = "x"
snapshot = "s.json"
[[sheets]]
subject = "Anglès"
file = "a.csv"
[detect]
identity_markers = [""]
"#;
        assert!(matches!(
            SyncConfig::from_toml(toml),
            Err(ReconError::ConfigValidation(_))
        ));
    }

    #[test]
    fn missing_field_is_parse_error() {
        let err = SyncConfig::from_toml("name = \"x\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
