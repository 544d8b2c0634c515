use crate::answer_key::{KeyEntry, SubjectKey};
use crate::model::{CellValue, GradeMode, GradeResult, Level};

/// Grade one cell.
///
/// With an answer-key entry for `question_label` the cell is compared
/// against it (trim + lowercase): match -> AE / 1, mismatch -> NA / 0, and
/// the trimmed response is kept. A Manual entry yields nothing. Without an
/// entry the cell is read as a rubric score and snapped to the nearest band.
pub fn grade(
    cell: &CellValue,
    question_label: &str,
    subject_key: Option<&SubjectKey>,
) -> Option<GradeResult> {
    if cell.is_blank() {
        return None;
    }

    match subject_key.and_then(|key| key.lookup(question_label)) {
        Some(KeyEntry::Manual) => None,
        Some(KeyEntry::Answer(expected)) => Some(auto_grade(&cell.text(), expected)),
        None => rubric(cell),
    }
}

fn auto_grade(response: &str, expected: &str) -> GradeResult {
    let correct = response.to_lowercase() == expected.trim().to_lowercase();
    let (level, numeric_value) = if correct {
        (Level::Excellent, 1.0)
    } else {
        (Level::NotAchieved, 0.0)
    };
    GradeResult {
        level,
        numeric_value: Some(numeric_value),
        student_response: Some(response.to_string()),
        mode: GradeMode::AutoGrade,
    }
}

fn rubric(cell: &CellValue) -> Option<GradeResult> {
    let value = match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) | CellValue::Empty => return None,
        CellValue::Text(s) => parse_decimal(s)?,
    };
    let level = snap_to_band(value);
    Some(GradeResult {
        level,
        numeric_value: Some(level.weight()),
        student_response: None,
        mode: GradeMode::Rubric,
    })
}

/// Nearest band by absolute distance; on a tie the lower band (earlier in
/// `Level::ALL`) wins.
pub fn snap_to_band(value: f64) -> Level {
    let mut best = Level::ALL[0];
    for level in Level::ALL.into_iter().skip(1) {
        if (level.weight() - value).abs() < (best.weight() - value).abs() {
            best = level;
        }
    }
    best
}

/// Leading decimal number of `text`, accepting ',' as the decimal separator:
/// "3,5" -> 3.5, "2 punts" -> 2, "abc" -> None.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim().replacen(',', ".", 1);
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end - int_start;

    let mut frac_digits = 0;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut cursor = end + 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        frac_digits = cursor - end - 1;
        if frac_digits > 0 || int_digits > 0 {
            end = cursor;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut cursor = end + 1;
        if cursor < bytes.len() && (bytes[cursor] == b'+' || bytes[cursor] == b'-') {
            cursor += 1;
        }
        let exp_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exp_start {
            end = cursor;
        }
    }

    let mut number = text[..end].to_string();
    if number.ends_with('.') {
        number.pop();
    }
    if int_digits == 0 {
        let sign_len = int_start;
        number.insert(sign_len, '0');
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}
