use std::collections::BTreeMap;

use crate::model::{EvaluationResult, GradeMode, LayoutKind, ReconSummary};

/// Matching-stage counters collected by the engine.
#[derive(Debug, Clone, Default)]
pub struct MatchCounts {
    pub layout: Option<LayoutKind>,
    pub answer_key_subject: Option<String>,
    pub question_matches: usize,
    pub student_matches: usize,
    pub skipped_rows: usize,
    pub duplicates: usize,
    pub ambiguous: Vec<String>,
}

/// Compute summary statistics from graded records.
pub fn compute_summary<'a, I>(graded: I, counts: MatchCounts) -> ReconSummary
where
    I: IntoIterator<Item = (&'a EvaluationResult, GradeMode)>,
{
    let mut level_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut auto_graded = 0;
    let mut rubric_graded = 0;
    let mut total = 0;

    for (record, mode) in graded {
        *level_counts.entry(record.level.code().to_string()).or_insert(0) += 1;
        match mode {
            GradeMode::AutoGrade => auto_graded += 1,
            GradeMode::Rubric => rubric_graded += 1,
        }
        total += 1;
    }

    ReconSummary {
        layout: counts.layout,
        answer_key_subject: counts.answer_key_subject,
        question_matches: counts.question_matches,
        student_matches: counts.student_matches,
        skipped_rows: counts.skipped_rows,
        duplicates: counts.duplicates,
        ambiguous: counts.ambiguous,
        auto_graded,
        rubric_graded,
        level_counts,
        total,
    }
}
