use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{CellValue, Competency, Student};

/// A header cell or row label resolved to a competency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedQuestion {
    pub competency_id: String,
    /// Label used for answer-key lookup: the numeric token when present,
    /// otherwise the trimmed label.
    pub question_label: String,
    /// Other eligible competencies that matched the same label.
    pub ties: usize,
}

/// Header columns resolved to students.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentColumns {
    pub matched: BTreeMap<usize, String>,
    /// Columns with more than one equally good candidate, left unmatched.
    pub ambiguous: Vec<(usize, String)>,
}

// ---------------------------------------------------------------------------
// Label primitives
// ---------------------------------------------------------------------------

fn numeric_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("static regex"))
}

/// First "integer, optionally dot and sub-integer" token: "Pregunta 4.1" -> "4.1".
pub fn numeric_label(text: &str) -> Option<&str> {
    numeric_label_re().find(text).map(|m| m.as_str())
}

/// Answer-key label for a spreadsheet label.
pub fn question_label(text: &str) -> String {
    let text = text.trim();
    numeric_label(text).unwrap_or(text).to_string()
}

/// Numeric tokens must be string-equal when both sides have one ("1" never
/// matches "12"); otherwise fall back to case-insensitive full equality.
pub fn label_matches(label: &str, description: &str) -> bool {
    let label = label.trim();
    match (numeric_label(label), numeric_label(description)) {
        (Some(a), Some(b)) => a == b,
        _ => normalize(description) == normalize(label),
    }
}

pub(crate) fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Competencies
// ---------------------------------------------------------------------------

/// Resolve a Matrix row label. First eligible competency wins.
pub fn match_row(
    row_label: &str,
    competencies: &[Competency],
    subject_id: &str,
) -> Option<MatchedQuestion> {
    let label = row_label.trim();
    if label.is_empty() {
        return None;
    }

    let mut candidates = competencies
        .iter()
        .filter(|c| c.subject_id == subject_id)
        .filter(|c| label_matches(label, &c.description));

    let first = candidates.next()?;
    let ties = candidates.count();
    if ties > 0 {
        log::warn!("label '{label}' matches {} competencies; using '{}'", ties + 1, first.description);
    }

    Some(MatchedQuestion {
        competency_id: first.id.clone(),
        question_label: question_label(label),
        ties,
    })
}

/// Resolve every header cell to a competency (Form layout).
pub fn match_columns(
    header: &[CellValue],
    competencies: &[Competency],
    subject_id: &str,
) -> BTreeMap<usize, MatchedQuestion> {
    header
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.is_blank())
        .filter_map(|(idx, cell)| {
            let matched = match_row(&cell.text(), competencies, subject_id)?;
            log::debug!("column {idx} -> competency {}", matched.competency_id);
            Some((idx, matched))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// Form layout join: exact case-insensitive email equality.
pub fn match_student_by_email<'a>(email: &str, students: &'a [Student]) -> Option<&'a Student> {
    let email = normalize(email);
    if email.is_empty() {
        return None;
    }
    students
        .iter()
        .find(|s| s.email.as_deref().map(normalize).as_deref() == Some(email.as_str()))
}

/// Matrix layout: resolve header cells like "1A - Doe, Jane" to students.
pub fn match_students(header: &[CellValue], students: &[Student]) -> StudentColumns {
    let mut out = StudentColumns::default();

    for (idx, cell) in header.iter().enumerate() {
        let Some(text) = cell.as_str() else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        match student_candidates(text, students).as_slice() {
            [] => {}
            [one] => {
                log::debug!("column {idx} -> student {}", one.id);
                out.matched.insert(idx, one.id.clone());
            }
            many => {
                log::warn!("header '{}' matches {} students", text.trim(), many.len());
                out.ambiguous.push((idx, text.trim().to_string()));
            }
        }
    }

    out
}

/// Candidates from the first tier that produces any:
/// 1. whole header equals the name,
/// 2. header fragment equals the name,
/// 3. header contains the full name on word boundaries,
/// 4. name contains the fragment on word boundaries.
fn student_candidates<'a>(header: &str, students: &'a [Student]) -> Vec<&'a Student> {
    let header = normalize(header);
    let fragment = header_fragment(&header);

    let names: Vec<(String, &Student)> = students
        .iter()
        .map(|s| (normalize(&s.name), s))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    let tiers: [&dyn Fn(&str) -> bool; 4] = [
        &|name: &str| name == header,
        &|name: &str| !fragment.is_empty() && name == fragment,
        &|name: &str| contains_bounded(&header, name),
        &|name: &str| contains_bounded(name, fragment),
    ];

    for tier in tiers {
        let mut found: Vec<&Student> = Vec::new();
        for (name, student) in &names {
            if tier(name.as_str()) && !found.iter().any(|s| s.id == student.id) {
                found.push(student);
            }
        }
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Text after the group separator ("1a - doe, jane" -> "doe, jane"), or the
/// whole header when there is none. Only a '-' with whitespace before it and
/// whitespace or the end after it separates, so "puig-ferrer" stays whole.
fn header_fragment(header: &str) -> &str {
    let separator = header.char_indices().find(|&(i, c)| {
        c == '-'
            && header[..i].ends_with(char::is_whitespace)
            && header[i + 1..].chars().next().map_or(true, char::is_whitespace)
    });
    match separator {
        Some((i, _)) => header[i + 1..].trim(),
        None => header.trim(),
    }
}

/// Substring containment where the match is not glued to other letters,
/// digits or hyphens ("ana" is not found in "joana", "ferrer" is not found in
/// "puig-ferrer").
fn contains_bounded(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char)
    })
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(id: &str, desc: &str, subject: &str) -> Competency {
        Competency {
            id: id.into(),
            description: desc.into(),
            category: None,
            subject_id: subject.into(),
        }
    }

    fn student(id: &str, name: &str, email: Option<&str>) -> Student {
        Student {
            id: id.into(),
            name: name.into(),
            email: email.map(Into::into),
            group_id: "g1".into(),
        }
    }

    fn header(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn numeric_token_extraction() {
        assert_eq!(numeric_label("Pregunta 12"), Some("12"));
        assert_eq!(numeric_label("P4.1 (opcional)"), Some("4.1"));
        assert_eq!(numeric_label("4."), Some("4"));
        assert_eq!(numeric_label("Comprensió lectora"), None);
        assert_eq!(question_label("  Expressió oral "), "Expressió oral");
        assert_eq!(question_label("Pregunta 9.2"), "9.2");
    }

    #[test]
    fn one_never_matches_twelve() {
        let comps = vec![comp("c1", "Pregunta 1", "mat"), comp("c12", "Pregunta 12", "mat")];
        let m = match_row("Pregunta 12", &comps, "mat").unwrap();
        assert_eq!(m.competency_id, "c12");
        assert_eq!(m.question_label, "12");
        assert_eq!(m.ties, 0);

        let m = match_row("Pregunta 1", &comps, "mat").unwrap();
        assert_eq!(m.competency_id, "c1");
    }

    #[test]
    fn numeric_label_matches_across_prefixes() {
        let comps = vec![comp("c4", "4.1 Interpreta gràfics", "sci")];
        assert_eq!(match_row("P4.1", &comps, "sci").unwrap().competency_id, "c4");
        assert!(match_row("P4", &comps, "sci").is_none());
    }

    #[test]
    fn string_fallback_is_case_insensitive() {
        let comps = vec![comp("c1", "Expressió escrita", "cat")];
        assert_eq!(match_row("EXPRESSIÓ ESCRITA ", &comps, "cat").unwrap().competency_id, "c1");
        assert!(match_row("Expressió", &comps, "cat").is_none());
    }

    #[test]
    fn other_subjects_never_match() {
        let comps = vec![comp("x", "Pregunta 3", "cat"), comp("y", "Pregunta 3", "mat")];
        assert_eq!(match_row("Pregunta 3", &comps, "mat").unwrap().competency_id, "y");
        assert!(match_row("Pregunta 3", &comps, "ang").is_none());
    }

    #[test]
    fn ties_resolve_to_first() {
        let comps = vec![comp("a", "Pregunta 2", "mat"), comp("b", "2. Geometria", "mat")];
        let m = match_row("Pregunta 2", &comps, "mat").unwrap();
        assert_eq!(m.competency_id, "a");
        assert_eq!(m.ties, 1);
    }

    #[test]
    fn columns_skip_blank_and_unmatched() {
        let comps = vec![comp("c1", "Pregunta 1", "mat"), comp("c2", "Pregunta 2", "mat")];
        let h = header(&["Marca de temps", "", "Pregunta 2", "Pregunta 1", "Pregunta 3"]);
        let cols = match_columns(&h, &comps, "mat");
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[&2].competency_id, "c2");
        assert_eq!(cols[&3].competency_id, "c1");
        assert_eq!(cols[&3].question_label, "1");
    }

    #[test]
    fn numeric_header_cells_match() {
        let comps = vec![comp("c7", "Pregunta 7", "mat")];
        let cols = match_columns(&[CellValue::Number(7.0)], &comps, "mat");
        assert_eq!(cols[&0].question_label, "7");
    }

    #[test]
    fn email_join() {
        let students = vec![
            student("s0", "Roe, Ann", None),
            student("s1", "Doe, Jane", Some(" Jane@X.com ")),
        ];
        assert_eq!(match_student_by_email("jane@x.COM", &students).unwrap().id, "s1");
        assert!(match_student_by_email("", &students).is_none());
        assert!(match_student_by_email("ann@x.com", &students).is_none());
    }

    #[test]
    fn matrix_headers_with_group_prefix() {
        let students = vec![student("s1", "Doe, Jane", None), student("s2", "Puig, Marc", None)];
        let h = header(&["Pregunta", "1A - Doe, Jane", "1A - PUIG, MARC", "1A - Roe, Ann"]);
        let cols = match_students(&h, &students);
        assert_eq!(cols.matched.len(), 2);
        assert_eq!(cols.matched[&1], "s1");
        assert_eq!(cols.matched[&2], "s2");
        assert!(cols.ambiguous.is_empty());
    }

    #[test]
    fn matrix_header_without_prefix() {
        let students = vec![student("s1", "Doe, Jane", None)];
        let cols = match_students(&header(&["Doe, Jane"]), &students);
        assert_eq!(cols.matched[&0], "s1");
    }

    #[test]
    fn matrix_name_inside_longer_header() {
        let students = vec![student("s1", "Jane Doe", None)];
        let cols = match_students(&header(&["Jane Doe (1A)"]), &students);
        assert_eq!(cols.matched[&0], "s1");
    }

    #[test]
    fn substring_names_do_not_collide() {
        let students = vec![student("s1", "Ana", None), student("s2", "Joana", None)];
        let cols = match_students(&header(&["1A - Joana"]), &students);
        assert_eq!(cols.matched[&0], "s2");
    }

    #[test]
    fn hyphenated_surname_without_prefix() {
        let students = vec![
            student("s1", "Puig-Ferrer, Marc", None),
            student("s2", "Ferrer, Marc", None),
        ];
        let h = header(&[
            "Pregunta",
            "Puig-Ferrer, Marc",
            "1A - Puig-Ferrer, Marc",
            "Puig-Ferrer, Marc (1A)",
            "1A - Ferrer, Marc",
        ]);
        let cols = match_students(&h, &students);
        assert_eq!(cols.matched[&1], "s1");
        assert_eq!(cols.matched[&2], "s1");
        assert_eq!(cols.matched[&3], "s1");
        assert_eq!(cols.matched[&4], "s2");
        assert!(cols.ambiguous.is_empty());
    }

    #[test]
    fn group_separator_needs_surrounding_space() {
        assert_eq!(header_fragment("1a - doe, jane"), "doe, jane");
        assert_eq!(header_fragment("puig-ferrer, marc"), "puig-ferrer, marc");
        assert_eq!(header_fragment("1a -"), "");
    }

    #[test]
    fn ambiguous_fragment_left_for_review() {
        let students = vec![student("s1", "Garcia, Pau", None), student("s2", "Garcia, Laia", None)];
        let cols = match_students(&header(&["1A - Garcia"]), &students);
        assert!(cols.matched.is_empty());
        assert_eq!(cols.ambiguous, vec![(0, "1A - Garcia".to_string())]);
    }

    #[test]
    fn empty_fragment_matches_nobody() {
        let students = vec![student("s1", "Doe, Jane", None)];
        let cols = match_students(&header(&["1A - "]), &students);
        assert!(cols.matched.is_empty());
        assert!(cols.ambiguous.is_empty());
    }

    #[test]
    fn bounded_containment() {
        assert!(contains_bounded("1a - doe, jane", "doe, jane"));
        assert!(!contains_bounded("joana", "ana"));
        assert!(contains_bounded("ana", "ana"));
        assert!(!contains_bounded("ana", ""));
        assert!(!contains_bounded("puig-ferrer, marc", "ferrer, marc"));
    }
}
