use crate::model::{CellValue, Layout};

/// Header fragments that mark the email column of a form-responses export.
pub const DEFAULT_IDENTITY_MARKERS: &[&str] =
    &["adreça electrònica", "email", "e-mail", "correu", "correo"];

/// Classify the grid layout from its header row using the default markers.
pub fn detect(header: &[CellValue]) -> Layout {
    detect_with_markers(header, DEFAULT_IDENTITY_MARKERS)
}

/// Form layout when any text header cell contains a marker
/// (case-insensitive); the first such column is the join column. Anything
/// else is Matrix.
pub fn detect_with_markers<S: AsRef<str>>(header: &[CellValue], markers: &[S]) -> Layout {
    let markers: Vec<String> = markers
        .iter()
        .map(|m| m.as_ref().trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();

    let identity_column = header.iter().position(|cell| {
        cell.as_str()
            .map(|text| {
                let text = text.to_lowercase();
                markers.iter().any(|m| text.contains(m.as_str()))
            })
            .unwrap_or(false)
    });

    match identity_column {
        Some(identity_column) => Layout::Form { identity_column },
        None => Layout::Matrix,
    }
}
