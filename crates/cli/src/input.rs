//! File loading for every command. The engine crate never touches the
//! filesystem; everything it needs is read and decoded here.

use std::io::Read;
use std::path::Path;

use gradesync_recon::{AnswerKeyStore, Grid, Snapshot};

use crate::exit_codes::recon_exit_code;
use crate::CliError;

/// Read a file as UTF-8, falling back to Windows-1252 for legacy exports.
pub fn read_file_as_utf8(path: &Path) -> Result<String, CliError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    // Spreadsheet exports often start with a BOM.
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn is_tsv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tsv"))
        .unwrap_or(false)
}

/// `.json` grids are values-API responses; `.tsv` is tab-separated; anything
/// else is delimited text with a sniffed delimiter.
pub fn load_grid(path: &Path) -> Result<Grid, CliError> {
    let content = read_file_as_utf8(path)?;
    let grid = if is_json(path) {
        Grid::from_json_str(&content)
    } else if is_tsv(path) {
        Grid::from_csv_str_with_delimiter(&content, b'\t')
    } else {
        Grid::from_csv_str(&content)
    };
    grid.map_err(|e| CliError::recon(&e).in_file(path))
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, CliError> {
    let content = read_file_as_utf8(path)?;
    Snapshot::from_json(&content).map_err(|e| CliError::recon(&e).in_file(path))
}

/// No path means no answer keys: every question is rubric-graded.
pub fn load_answer_keys(path: Option<&Path>) -> Result<AnswerKeyStore, CliError> {
    let Some(path) = path else {
        return Ok(AnswerKeyStore::new());
    };
    let content = read_file_as_utf8(path)?;
    AnswerKeyStore::from_csv_str(&content).map_err(|e| CliError::recon(&e).in_file(path))
}

/// Pretty-printed JSON for stdout or `--output`.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))
}

pub fn write_file(path: &Path, content: &str) -> Result<(), CliError> {
    std::fs::write(path, content)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

impl CliError {
    pub fn recon(err: &gradesync_recon::ReconError) -> Self {
        Self {
            code: recon_exit_code(err),
            message: err.to_string(),
            hint: None,
        }
    }

    fn in_file(mut self, path: &Path) -> Self {
        self.message = format!("{}: {}", path.display(), self.message);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_INVALID_INPUT, EXIT_IO};

    #[test]
    fn windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // "Matèria" in Windows-1252
        std::fs::write(&path, b"Mat\xe8ria,Pregunta\n").unwrap();
        assert_eq!(read_file_as_utf8(&path).unwrap(), "Matèria,Pregunta\n");
    }

    #[test]
    fn bom_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        std::fs::write(&path, "\u{feff}Email,Pregunta 1\n").unwrap();
        let grid = load_grid(&path).unwrap();
        assert_eq!(grid.cell(0, 0).text(), "Email");
    }

    #[test]
    fn grid_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("g.tsv");
        std::fs::write(&tsv, "Pregunta\t1A - Doe, Jane\nPregunta 1\t3\n").unwrap();
        let grid = load_grid(&tsv).unwrap();
        assert_eq!(grid.cell(0, 1).text(), "1A - Doe, Jane");

        let json = dir.path().join("g.json");
        std::fs::write(&json, r#"{"values":[["Email"],["a@b.c"]]}"#).unwrap();
        assert_eq!(load_grid(&json).unwrap().len(), 2);

        std::fs::write(&json, r#"{"values":[[["nested"]]]}"#).unwrap();
        let err = load_grid(&json).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_INPUT);
        assert!(err.message.contains("g.json"));
    }

    #[test]
    fn missing_file_is_io() {
        let err = load_snapshot(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert_eq!(err.code, EXIT_IO);
    }

    #[test]
    fn no_answer_key_path() {
        assert!(load_answer_keys(None).unwrap().is_empty());
    }
}
