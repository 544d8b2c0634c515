use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::merge::EvaluationStore;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// One raw spreadsheet cell. Values API exports are mostly text; numbers
/// appear when the grid comes from a typed source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// True for `Empty` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Trimmed text form used for every comparison.
    pub fn text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format!("{n}"),
        }
    }

    /// Text cells only. Header markers ignore numeric cells.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

// ---------------------------------------------------------------------------
// Domain snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub group_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub group_id: String,
}

/// An assessable question or rubric item. The description usually embeds a
/// numeric label ("Pregunta 12", "4.1") used for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competency {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub subject_id: String,
}

/// Read-only view of everything the persistence layer knows, plus the
/// evaluation store imports are merged into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub subjects: Vec<Subject>,
    pub students: Vec<Student>,
    pub competencies: Vec<Competency>,
    pub evaluations: EvaluationStore,
}

impl Snapshot {
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        serde_json::from_str(input).map_err(|e| ReconError::SnapshotParse(e.to_string()))
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    /// Students enrolled in the subject's group.
    pub fn students_of(&self, subject: &Subject) -> Vec<Student> {
        self.students
            .iter()
            .filter(|s| s.group_id == subject.group_id)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Achievement band. Each band carries its canonical weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "NP")]
    NotPresented,
    #[serde(rename = "NE")]
    Low,
    #[serde(rename = "NA")]
    NotAchieved,
    #[serde(rename = "AS")]
    Satisfactory,
    #[serde(rename = "AN")]
    Notable,
    #[serde(rename = "AE")]
    Excellent,
}

impl Level {
    /// Bands in ascending weight order. Rubric snapping iterates this order.
    pub const ALL: [Level; 6] = [
        Level::NotPresented,
        Level::Low,
        Level::NotAchieved,
        Level::Satisfactory,
        Level::Notable,
        Level::Excellent,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Level::NotPresented => 0.0,
            Level::Low => 0.5,
            Level::NotAchieved => 1.0,
            Level::Satisfactory => 2.0,
            Level::Notable => 3.0,
            Level::Excellent => 4.0,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Level::NotPresented => "NP",
            Level::Low => "NE",
            Level::NotAchieved => "NA",
            Level::Satisfactory => "AS",
            Level::Notable => "AN",
            Level::Excellent => "AE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::NotPresented => "Not presented",
            Level::Low => "Low",
            Level::NotAchieved => "Not achieved",
            Level::Satisfactory => "Satisfactory",
            Level::Notable => "Notable",
            Level::Excellent => "Excellent",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Grading + evaluations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeMode {
    /// Compared against an answer-key entry.
    AutoGrade,
    /// Free-form number snapped to the nearest band.
    Rubric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeResult {
    pub level: Level,
    pub numeric_value: Option<f64>,
    pub student_response: Option<String>,
    pub mode: GradeMode,
}

/// Engine output unit. At most one per (student_id, competency_id) per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub student_id: String,
    pub competency_id: String,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_response: Option<String>,
}

/// A stored evaluation as the persistence layer keeps it. Manual entries may
/// carry an observation or no level yet; imported ones never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub student_id: String,
    pub competency_id: String,
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_response: Option<String>,
}

impl From<EvaluationResult> for Evaluation {
    fn from(r: EvaluationResult) -> Self {
        Evaluation {
            student_id: r.student_id,
            competency_id: r.competency_id,
            level: Some(r.level),
            observation: None,
            numeric_value: r.numeric_value,
            student_response: r.student_response,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One row per student; `identity_column` holds the email join key.
    Form { identity_column: usize },
    /// One row per question, one column per student.
    Matrix,
}

impl Layout {
    pub fn kind(&self) -> LayoutKind {
        match self {
            Layout::Form { .. } => LayoutKind::Form,
            Layout::Matrix => LayoutKind::Matrix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Form,
    Matrix,
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Form => write!(f, "form"),
            Self::Matrix => write!(f, "matrix"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_key_subject: Option<String>,
    pub question_matches: usize,
    pub student_matches: usize,
    pub skipped_rows: usize,
    pub duplicates: usize,
    pub ambiguous: Vec<String>,
    pub auto_graded: usize,
    pub rubric_graded: usize,
    pub level_counts: BTreeMap<String, usize>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconOutput {
    pub evaluations: Vec<EvaluationResult>,
    pub logs: Vec<String>,
    pub summary: ReconSummary,
}
