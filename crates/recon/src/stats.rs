use serde::Serialize;

use crate::answer_key::AnswerKeyStore;
use crate::error::ReconError;
use crate::merge::EvaluationStore;
use crate::model::{Competency, Snapshot};

/// Per-student score summary over one subject's competencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub student_id: String,
    pub name: String,
    /// Mean of stored values; `None` until something was evaluated.
    pub average: Option<f64>,
    /// Test items scored 1.
    pub correct: usize,
    pub total_test_items: usize,
    pub total_answered: usize,
}

const TEST_ITEM_MARKER: &str = "pregunta";

fn is_test_item(competency: &Competency, has_answer_key: bool) -> bool {
    has_answer_key && competency.description.to_lowercase().contains(TEST_ITEM_MARKER)
}

/// Summarize one student. `competencies` should be a single subject's.
pub fn student_stats(
    student_id: &str,
    name: &str,
    competencies: &[Competency],
    store: &EvaluationStore,
    has_answer_key: bool,
) -> StudentStats {
    let mut total = 0.0;
    let mut total_answered = 0;
    let mut correct = 0;
    let mut total_test_items = 0;

    for competency in competencies {
        let test_item = is_test_item(competency, has_answer_key);
        if test_item {
            total_test_items += 1;
        }

        let Some(record) = store.get(student_id, &competency.id) else {
            continue;
        };
        let Some(level) = record.level else {
            continue;
        };
        let value = record.numeric_value.unwrap_or_else(|| level.weight());
        total += value;
        total_answered += 1;
        if test_item && value == 1.0 {
            correct += 1;
        }
    }

    StudentStats {
        student_id: student_id.to_string(),
        name: name.to_string(),
        average: (total_answered > 0).then(|| total / total_answered as f64),
        correct,
        total_test_items,
        total_answered,
    }
}

/// Stats for every student in the subject's group, in snapshot order.
pub fn subject_report(
    snapshot: &Snapshot,
    subject_id: &str,
    answer_keys: &AnswerKeyStore,
) -> Result<Vec<StudentStats>, ReconError> {
    let subject = snapshot
        .subject(subject_id)
        .ok_or_else(|| ReconError::UnknownSubject(subject_id.to_string()))?;

    let competencies: Vec<Competency> = snapshot
        .competencies
        .iter()
        .filter(|c| c.subject_id == subject.id)
        .cloned()
        .collect();
    let has_answer_key = answer_keys.resolve(&subject.name).is_some();

    Ok(snapshot
        .students_of(subject)
        .iter()
        .map(|s| {
            student_stats(
                &s.id,
                &s.name,
                &competencies,
                &snapshot.evaluations,
                has_answer_key,
            )
        })
        .collect())
}
