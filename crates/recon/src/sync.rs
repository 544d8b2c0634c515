//! Multi-subject sync: every fetched sheet is reconciled against each
//! snapshot subject it targets and merged into the snapshot's store.

use serde::Serialize;

use crate::answer_key::AnswerKeyStore;
use crate::config::DetectConfig;
use crate::engine::{reconcile_with, ReconInput};
use crate::grid::Grid;
use crate::matcher::normalize;
use crate::model::{Snapshot, Subject};

/// One fetched sheet and the subject name it was configured for.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub subject_name: String,
    pub grid: Grid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncMeta {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// One (sheet, target subject) reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub sheet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub produced: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub meta: SyncMeta,
    pub steps: Vec<StepReport>,
    pub total_produced: usize,
    pub total_inserted: usize,
    pub total_replaced: usize,
}

/// Snapshot subjects whose name contains `sheet_subject` (case-insensitive).
pub fn target_subjects<'a>(subjects: &'a [Subject], sheet_subject: &str) -> Vec<&'a Subject> {
    let needle = normalize(sheet_subject);
    if needle.is_empty() {
        return Vec::new();
    }
    subjects
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .collect()
}

/// Reconcile every sheet and merge the results into `snapshot.evaluations`.
/// Sheets later in the list override earlier ones on the same pair.
pub fn run(
    name: &str,
    snapshot: &mut Snapshot,
    sheets: &[SheetGrid],
    answer_keys: &AnswerKeyStore,
    detect: &DetectConfig,
) -> SyncReport {
    let Snapshot {
        subjects,
        students,
        competencies,
        evaluations,
    } = snapshot;
    let (subjects, students, competencies) = (&subjects[..], &students[..], &competencies[..]);

    let mut steps = Vec::new();

    for sheet in sheets {
        let targets = target_subjects(subjects, &sheet.subject_name);
        if targets.is_empty() {
            log::warn!("sheet '{}' matches no subject", sheet.subject_name);
            steps.push(StepReport {
                sheet: sheet.subject_name.clone(),
                subject_id: None,
                subject_name: None,
                produced: 0,
                inserted: 0,
                replaced: 0,
                logs: vec![format!(
                    "No subject matches '{}'; sheet skipped.",
                    sheet.subject_name
                )],
            });
            continue;
        }

        for subject in targets {
            let group: Vec<_> = students
                .iter()
                .filter(|s| s.group_id == subject.group_id)
                .cloned()
                .collect();

            let output = reconcile_with(
                &ReconInput {
                    grid: &sheet.grid,
                    students: &group,
                    competencies,
                    subject_id: &subject.id,
                    subject_name: &subject.name,
                    answer_keys,
                },
                detect,
            );
            let stats = evaluations.merge(&output.evaluations);

            log::info!(
                "sheet '{}' -> subject {}: {} produced, {} inserted, {} replaced",
                sheet.subject_name,
                subject.id,
                output.evaluations.len(),
                stats.inserted,
                stats.replaced
            );

            steps.push(StepReport {
                sheet: sheet.subject_name.clone(),
                subject_id: Some(subject.id.clone()),
                subject_name: Some(subject.name.clone()),
                produced: output.evaluations.len(),
                inserted: stats.inserted,
                replaced: stats.replaced,
                logs: output.logs,
            });
        }
    }

    SyncReport {
        meta: SyncMeta {
            name: name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        total_produced: steps.iter().map(|s| s.produced).sum(),
        total_inserted: steps.iter().map(|s| s.inserted).sum(),
        total_replaced: steps.iter().map(|s| s.replaced).sum(),
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Competency, Level, Student};

    fn snapshot() -> Snapshot {
        Snapshot {
            subjects: vec![
                Subject { id: "mat1a".into(), name: "Matemàtiques 1A".into(), group_id: "1a".into() },
                Subject { id: "mat1b".into(), name: "Matemàtiques 1B".into(), group_id: "1b".into() },
                Subject { id: "cat1a".into(), name: "Català 1A".into(), group_id: "1a".into() },
            ],
            students: vec![
                Student { id: "s1".into(), name: "Doe, Jane".into(), email: Some("jane@x.com".into()), group_id: "1a".into() },
                Student { id: "s2".into(), name: "Roe, Ann".into(), email: Some("ann@x.com".into()), group_id: "1b".into() },
            ],
            competencies: vec![
                Competency { id: "m1a".into(), description: "Pregunta 1".into(), category: None, subject_id: "mat1a".into() },
                Competency { id: "m1b".into(), description: "Pregunta 1".into(), category: None, subject_id: "mat1b".into() },
                Competency { id: "c1a".into(), description: "Pregunta 1".into(), category: None, subject_id: "cat1a".into() },
            ],
            evaluations: Default::default(),
        }
    }

    fn form_sheet(subject: &str) -> SheetGrid {
        SheetGrid {
            subject_name: subject.into(),
            grid: Grid::from_strings(vec![
                vec!["Email", "Pregunta 1"],
                vec!["jane@x.com", "c"],
                vec!["ann@x.com", "a"],
            ]),
        }
    }

    fn keys() -> AnswerKeyStore {
        let mut k = AnswerKeyStore::new();
        k.insert("Matemàtiques", "1", "c");
        k
    }

    #[test]
    fn targets_by_substring() {
        let snap = snapshot();
        let ids: Vec<_> = target_subjects(&snap.subjects, "matemàtiques")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["mat1a", "mat1b"]);
        assert!(target_subjects(&snap.subjects, "  ").is_empty());
    }

    #[test]
    fn sheet_fans_out_per_group() {
        let mut snap = snapshot();
        let report = run("t", &mut snap, &[form_sheet("Matemàtiques")], &keys(), &DetectConfig::default());

        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.total_produced, 2);
        assert_eq!(report.total_inserted, 2);
        assert_eq!(snap.evaluations.get("s1", "m1a").unwrap().level, Some(Level::Excellent));
        assert_eq!(snap.evaluations.get("s2", "m1b").unwrap().level, Some(Level::NotAchieved));
        // no cross-group or cross-subject leakage
        assert!(snap.evaluations.get("s1", "m1b").is_none());
        assert!(snap.evaluations.get("s1", "c1a").is_none());
    }

    #[test]
    fn rerun_replaces_instead_of_duplicating() {
        let mut snap = snapshot();
        let sheets = [form_sheet("Matemàtiques")];
        run("t", &mut snap, &sheets, &keys(), &DetectConfig::default());
        let before = snap.evaluations.clone();
        let report = run("t", &mut snap, &sheets, &keys(), &DetectConfig::default());
        assert_eq!(report.total_inserted, 0);
        assert_eq!(report.total_replaced, 2);
        assert_eq!(snap.evaluations, before);
    }

    #[test]
    fn unknown_sheet_subject_is_a_step_not_an_error() {
        let mut snap = snapshot();
        let report = run("t", &mut snap, &[form_sheet("Anglès")], &keys(), &DetectConfig::default());
        assert_eq!(report.steps.len(), 1);
        assert!(report.steps[0].subject_id.is_none());
        assert_eq!(report.total_produced, 0);
        assert!(snap.evaluations.is_empty());
    }

    #[test]
    fn report_meta() {
        let mut snap = snapshot();
        let report = run("1r trimestre", &mut snap, &[], &keys(), &DetectConfig::default());
        assert_eq!(report.meta.name, "1r trimestre");
        assert_eq!(report.meta.engine_version, env!("CARGO_PKG_VERSION"));
        assert!(report.steps.is_empty());
    }
}
