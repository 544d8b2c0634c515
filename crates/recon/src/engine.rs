use std::collections::{BTreeSet, HashMap};

use crate::answer_key::{AnswerKeyStore, SubjectKey};
use crate::config::DetectConfig;
use crate::detect::detect_with_markers;
use crate::evidence::{compute_summary, MatchCounts};
use crate::grade::grade;
use crate::grid::{column_letter, Grid};
use crate::matcher::{match_columns, match_row, match_student_by_email, match_students};
use crate::model::{
    Competency, EvaluationResult, GradeMode, GradeResult, Layout, ReconOutput, ReconSummary,
    Student,
};

/// Everything one reconciliation reads. All borrowed, nothing is mutated.
#[derive(Debug, Clone, Copy)]
pub struct ReconInput<'a> {
    pub grid: &'a Grid,
    pub students: &'a [Student],
    /// Competencies of every subject; only `subject_id`'s are eligible.
    pub competencies: &'a [Competency],
    pub subject_id: &'a str,
    pub subject_name: &'a str,
    pub answer_keys: &'a AnswerKeyStore,
}

/// Reconcile a grid with the default identity markers.
pub fn reconcile(input: &ReconInput<'_>) -> ReconOutput {
    reconcile_with(input, &DetectConfig::default())
}

/// Detect the layout, match columns/rows to students and competencies,
/// grade every matched non-blank cell. Never fails: data-quality problems
/// only reduce what is produced and are described in `logs`.
pub fn reconcile_with(input: &ReconInput<'_>, detect: &DetectConfig) -> ReconOutput {
    let mut logs = Vec::new();
    let grid = input.grid;

    if grid.len() < 2 {
        logs.push("Spreadsheet is empty or has no data rows; nothing to import.".to_string());
        log::info!("subject {}: grid has {} row(s), skipping", input.subject_id, grid.len());
        return ReconOutput {
            evaluations: Vec::new(),
            logs,
            summary: ReconSummary::default(),
        };
    }

    let mut counts = MatchCounts::default();

    let subject_key = match input.answer_keys.resolve(input.subject_name) {
        Some((name, key)) => {
            logs.push(format!("Answer key found for: {name}"));
            counts.answer_key_subject = Some(name.to_string());
            Some(key)
        }
        None => None,
    };

    let layout = detect_with_markers(grid.header(), &detect.identity_markers);
    counts.layout = Some(layout.kind());

    let mut batch = Batch::default();
    let mut run = Run {
        input,
        subject_key,
        counts: &mut counts,
        batch: &mut batch,
        logs: &mut logs,
    };
    match layout {
        Layout::Form { identity_column } => run.form(identity_column),
        Layout::Matrix => run.matrix(),
    }

    if batch.duplicates > 0 {
        logs.push(format!(
            "{} repeated student/question pair(s) collapsed; the last occurrence was kept.",
            batch.duplicates
        ));
    }
    counts.duplicates = batch.duplicates;
    logs.push(format!("Processed {} response(s)/score(s).", batch.records.len()));

    log::info!(
        "subject {}: {} layout, {} evaluation(s)",
        input.subject_id,
        layout.kind(),
        batch.records.len()
    );

    let summary = compute_summary(
        batch.records.iter().zip(batch.modes.iter().copied()),
        counts,
    );

    ReconOutput {
        evaluations: batch.records,
        logs,
        summary,
    }
}

// ---------------------------------------------------------------------------
// Output accumulation
// ---------------------------------------------------------------------------

/// One record per (student, competency). A repeat overwrites the earlier
/// record in place.
#[derive(Default)]
struct Batch {
    records: Vec<EvaluationResult>,
    modes: Vec<GradeMode>,
    index: HashMap<(String, String), usize>,
    duplicates: usize,
}

impl Batch {
    fn push(&mut self, student_id: &str, competency_id: &str, graded: GradeResult) {
        let record = EvaluationResult {
            student_id: student_id.to_string(),
            competency_id: competency_id.to_string(),
            level: graded.level,
            numeric_value: graded.numeric_value,
            student_response: graded.student_response,
        };
        let key = (record.student_id.clone(), record.competency_id.clone());
        match self.index.get(&key) {
            Some(&pos) => {
                self.records[pos] = record;
                self.modes[pos] = graded.mode;
                self.duplicates += 1;
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
                self.modes.push(graded.mode);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Layout passes
// ---------------------------------------------------------------------------

struct Run<'r, 'a> {
    input: &'r ReconInput<'a>,
    subject_key: Option<&'r SubjectKey>,
    counts: &'r mut MatchCounts,
    batch: &'r mut Batch,
    logs: &'r mut Vec<String>,
}

impl Run<'_, '_> {
    fn note_ambiguity(&mut self, note: String) {
        log::warn!("{note}");
        self.logs.push(note.clone());
        self.counts.ambiguous.push(note);
    }

    /// Rows are students (joined by email), columns are questions.
    fn form(&mut self, identity_column: usize) {
        let grid = self.input.grid;
        self.logs
            .push("Layout detected: form responses (one row per student).".to_string());

        let mut columns = match_columns(
            grid.header(),
            self.input.competencies,
            self.input.subject_id,
        );
        columns.remove(&identity_column);

        for (&col, question) in &columns {
            if question.ties > 0 {
                self.note_ambiguity(format!(
                    "Column {} ('{}') matches {} competencies; the first one was used.",
                    column_letter(col),
                    grid.cell(0, col).text(),
                    question.ties + 1
                ));
            }
        }
        self.counts.question_matches = columns.len();
        self.logs
            .push(format!("Matched {} question column(s).", columns.len()));

        let mut students_seen = BTreeSet::new();
        for (row_idx, _) in grid.data_rows() {
            let email = grid.cell(row_idx, identity_column).text();
            if email.is_empty() {
                continue;
            }
            let Some(student) = match_student_by_email(&email, self.input.students) else {
                log::debug!("row {}: no student with email '{email}'", row_idx + 1);
                self.counts.skipped_rows += 1;
                continue;
            };
            students_seen.insert(student.id.as_str());

            for (&col, question) in &columns {
                let cell = grid.cell(row_idx, col);
                if let Some(graded) = grade(cell, &question.question_label, self.subject_key) {
                    self.batch.push(&student.id, &question.competency_id, graded);
                }
            }
        }

        self.counts.student_matches = students_seen.len();
        self.logs.push(format!(
            "Matched {} student(s); {} row(s) had no known student.",
            students_seen.len(),
            self.counts.skipped_rows
        ));
    }

    /// Rows are questions (label in column A), columns are students.
    fn matrix(&mut self) {
        let grid = self.input.grid;
        self.logs
            .push("Layout detected: score matrix (one column per student).".to_string());

        let mut columns = match_students(grid.header(), self.input.students);
        columns.matched.remove(&0);
        columns.ambiguous.retain(|(col, _)| *col != 0);

        for (col, text) in std::mem::take(&mut columns.ambiguous) {
            self.note_ambiguity(format!(
                "Column {} ('{text}') matches several students; left for manual review.",
                column_letter(col)
            ));
        }
        self.counts.student_matches = columns.matched.len();
        self.logs
            .push(format!("Matched {} student column(s).", columns.matched.len()));

        let mut question_rows = 0;
        for (row_idx, _) in grid.data_rows() {
            let label = grid.cell(row_idx, 0).text();
            if label.is_empty() {
                continue;
            }
            let Some(question) = match_row(&label, self.input.competencies, self.input.subject_id)
            else {
                log::debug!("row {}: no competency for '{label}'", row_idx + 1);
                self.counts.skipped_rows += 1;
                continue;
            };
            if question.ties > 0 {
                self.note_ambiguity(format!(
                    "Row {} ('{label}') matches {} competencies; the first one was used.",
                    row_idx + 1,
                    question.ties + 1
                ));
            }
            question_rows += 1;

            for (&col, student_id) in &columns.matched {
                let cell = grid.cell(row_idx, col);
                if let Some(graded) = grade(cell, &question.question_label, self.subject_key) {
                    self.batch.push(student_id, &question.competency_id, graded);
                }
            }
        }

        self.counts.question_matches = question_rows;
        self.logs
            .push(format!("Matched {question_rows} question row(s)."));
    }
}
