use serde::{Deserialize, Serialize};

use crate::model::{Evaluation, EvaluationResult};

/// Outcome of merging one batch into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
}

/// Persisted evaluations, keyed by (student, competency).
///
/// Records keep their insertion order so a written snapshot diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationStore {
    records: Vec<Evaluation>,
}

impl EvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Evaluation>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Evaluation] {
        &self.records
    }

    pub fn get(&self, student_id: &str, competency_id: &str) -> Option<&Evaluation> {
        self.position(student_id, competency_id).map(|i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Upsert a batch. An existing record for the same pair is replaced
    /// whole (observation included), everything else is appended. Merging
    /// the same batch twice leaves the store unchanged.
    pub fn merge(&mut self, batch: &[EvaluationResult]) -> MergeStats {
        let mut stats = MergeStats::default();
        for result in batch {
            let record = Evaluation::from(result.clone());
            match self.position(&result.student_id, &result.competency_id) {
                Some(i) => {
                    self.records[i] = record;
                    stats.replaced += 1;
                }
                None => {
                    self.records.push(record);
                    stats.inserted += 1;
                }
            }
        }
        log::debug!(
            "merged {} evaluation(s): {} inserted, {} replaced",
            batch.len(),
            stats.inserted,
            stats.replaced
        );
        stats
    }

    fn position(&self, student_id: &str, competency_id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|e| e.student_id == student_id && e.competency_id == competency_id)
    }
}
