//! Raw spreadsheet grids.
//!
//! Row 0 is always the header row. Rows may be ragged: missing trailing
//! cells read as `CellValue::Empty`.

use serde::Serialize;
use serde_json::Value;

use crate::error::ReconError;
use crate::model::CellValue;

static EMPTY: CellValue = CellValue::Empty;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// Build a grid of text cells, mostly for tests and fixtures.
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| CellValue::from(c.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> &[CellValue] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Every row after the header, with its absolute row index.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[CellValue])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, r)| (i, r.as_slice()))
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    // -----------------------------------------------------------------------
    // CSV
    // -----------------------------------------------------------------------

    /// Parse delimited text, sniffing the delimiter.
    pub fn from_csv_str(content: &str) -> Result<Self, ReconError> {
        Self::from_csv_str_with_delimiter(content, sniff_delimiter(content))
    }

    pub fn from_csv_str_with_delimiter(content: &str, delimiter: u8) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::GridShape(e.to_string()))?;
            rows.push(record.iter().map(CellValue::from).collect());
        }
        Ok(Self { rows })
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    /// Parse `[[...], ...]` or a values-API response `{"values": [[...]]}`.
    pub fn from_json_str(content: &str) -> Result<Self, ReconError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ReconError::GridShape(e.to_string()))?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, ReconError> {
        let outer = match value {
            Value::Array(rows) => rows,
            Value::Object(map) => match map.get("values") {
                Some(Value::Array(rows)) => rows,
                Some(_) => {
                    return Err(ReconError::GridShape("\"values\" must be an array of rows".into()))
                }
                // An empty sheet comes back without a "values" key at all.
                None => return Ok(Self::default()),
            },
            _ => return Err(ReconError::GridShape("expected an array of rows".into())),
        };

        let mut rows = Vec::with_capacity(outer.len());
        for (row_idx, row) in outer.iter().enumerate() {
            let Value::Array(cells) = row else {
                return Err(ReconError::GridShape(format!("row {row_idx} is not an array")));
            };
            let mut out = Vec::with_capacity(cells.len());
            for (col_idx, cell) in cells.iter().enumerate() {
                out.push(json_cell(cell).ok_or_else(|| {
                    ReconError::GridShape(format!(
                        "cell {}{} is not a scalar",
                        column_letter(col_idx),
                        row_idx + 1
                    ))
                })?);
            }
            rows.push(out);
        }
        Ok(Self { rows })
    }
}

fn json_cell(v: &Value) -> Option<CellValue> {
    match v {
        Value::Null => Some(CellValue::Empty),
        Value::String(s) => Some(CellValue::from(s.as_str())),
        Value::Number(n) => n.as_f64().map(CellValue::Number),
        Value::Bool(b) => Some(CellValue::Text(if *b { "TRUE" } else { "FALSE" }.into())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b','];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Convert column index to letter (0 -> A, 1 -> B, 26 -> AA, etc.)
pub fn column_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_ragged_rows() {
        let grid = Grid::from_csv_str("Email,Pregunta 1,Pregunta 2\njane@x.com,c\n").unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.cell(1, 1), &CellValue::Text("c".into()));
        assert_eq!(grid.cell(1, 2), &CellValue::Empty);
        assert_eq!(grid.cell(9, 9), &CellValue::Empty);
    }

    #[test]
    fn csv_semicolon_sniffed() {
        let grid = Grid::from_csv_str("Pregunta;1A - Doe, Jane\nPregunta 1;3,5\n").unwrap();
        assert_eq!(grid.header().len(), 2);
        assert_eq!(grid.cell(0, 1), &CellValue::Text("1A - Doe, Jane".into()));
        assert_eq!(grid.cell(1, 1), &CellValue::Text("3,5".into()));
    }

    #[test]
    fn csv_quoted_commas_kept() {
        let grid = Grid::from_csv_str("Pregunta,\"1A - Doe, Jane\"\nPregunta 1,3\n").unwrap();
        assert_eq!(grid.cell(0, 1), &CellValue::Text("1A - Doe, Jane".into()));
    }

    #[test]
    fn json_plain_and_values_wrapper() {
        let a = Grid::from_json_str(r#"[["Email","Pregunta 1"],["jane@x.com", 3]]"#).unwrap();
        assert_eq!(a.cell(1, 1), &CellValue::Number(3.0));

        let b = Grid::from_json_str(r#"{"range":"A1:ZZ200","values":[["Email"],["a@x.com"]]}"#)
            .unwrap();
        assert_eq!(b.len(), 2);

        let empty = Grid::from_json_str(r#"{"range":"A1:ZZ200"}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn json_null_is_empty() {
        let g = Grid::from_json_str(r#"[["a", null, ""]]"#).unwrap();
        assert_eq!(g.cell(0, 1), &CellValue::Empty);
        assert_eq!(g.cell(0, 2), &CellValue::Empty);
    }

    #[test]
    fn json_not_two_dimensional() {
        assert!(matches!(
            Grid::from_json_str(r#"["a","b"]"#),
            Err(ReconError::GridShape(_))
        ));
        assert!(matches!(
            Grid::from_json_str(r#"[["a",["nested"]]]"#),
            Err(ReconError::GridShape(msg)) if msg.contains("B1")
        ));
        assert!(matches!(Grid::from_json_str("42"), Err(ReconError::GridShape(_))));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }
}
