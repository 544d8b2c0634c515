//! Answer keys: `subject -> question label -> expected answer`.
//!
//! Source format is one `subject,question,answer` record per line, with an
//! optional header line whose first field is "subject" or "materia".

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ReconError;
use crate::matcher::question_label;

/// Reserved answer meaning "grade this question by hand".
pub const MANUAL_SENTINEL: &str = "manual";

const HEADER_MARKERS: &[&str] = &["subject", "materia", "matèria"];

/// What the key says about one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEntry<'a> {
    Manual,
    Answer(&'a str),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectKey {
    questions: BTreeMap<String, String>,
}

impl SubjectKey {
    /// Stores the answer under the question's label form, so "Pregunta 3"
    /// and "3" are the same key.
    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        let question = question_label(&question.into());
        self.questions.insert(question, answer.into());
    }

    /// Entry for a question label as produced by `question_label`. Empty
    /// answers count as absent.
    pub fn lookup(&self, question: &str) -> Option<KeyEntry<'_>> {
        let answer = self.questions.get(question)?.trim();
        if answer.is_empty() {
            None
        } else if answer.eq_ignore_ascii_case(MANUAL_SENTINEL) {
            Some(KeyEntry::Manual)
        } else {
            Some(KeyEntry::Answer(answer))
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.questions.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }
}

impl<Q: Into<String>, A: Into<String>> FromIterator<(Q, A)> for SubjectKey {
    fn from_iter<I: IntoIterator<Item = (Q, A)>>(iter: I) -> Self {
        let mut key = SubjectKey::default();
        for (q, a) in iter {
            key.insert(q, a);
        }
        key
    }
}

/// Immutable-per-call answer keys. Subjects keep their file order because
/// subject resolution is first-match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerKeyStore {
    subjects: Vec<(String, SubjectKey)>,
}

impl AnswerKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_csv_str(input: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes());

        let mut store = Self::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ReconError::AnswerKeyParse {
                line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 1),
                message: e.to_string(),
            })?;

            if record.len() < 3 {
                continue;
            }
            let subject = &record[0];
            let question = &record[1];
            let answer = &record[2];

            if idx == 0 && HEADER_MARKERS.iter().any(|m| subject.to_lowercase() == *m) {
                continue;
            }
            if subject.is_empty() || question.is_empty() {
                continue;
            }
            store.insert(subject, question, answer);
        }
        Ok(store)
    }

    pub fn insert(&mut self, subject: &str, question: &str, answer: &str) {
        self.subject_entry(subject).insert(question, answer);
    }

    pub fn insert_subject(&mut self, subject: impl Into<String>, key: SubjectKey) {
        let subject = subject.into();
        match self.subjects.iter_mut().find(|(name, _)| *name == subject) {
            Some((_, existing)) => *existing = key,
            None => self.subjects.push((subject, key)),
        }
    }

    fn subject_entry(&mut self, subject: &str) -> &mut SubjectKey {
        let pos = match self.subjects.iter().position(|(name, _)| name == subject) {
            Some(pos) => pos,
            None => {
                self.subjects.push((subject.to_string(), SubjectKey::default()));
                self.subjects.len() - 1
            }
        };
        &mut self.subjects[pos].1
    }

    /// Exact subject name lookup.
    pub fn get(&self, subject: &str) -> Option<&SubjectKey> {
        self.subjects
            .iter()
            .find(|(name, _)| name == subject)
            .map(|(_, key)| key)
    }

    /// Key for a target subject: the first stored subject whose name is a
    /// case-insensitive substring of `target_subject_name`.
    pub fn resolve(&self, target_subject_name: &str) -> Option<(&str, &SubjectKey)> {
        let target = target_subject_name.to_lowercase();
        self.subjects
            .iter()
            .find(|(name, _)| !name.is_empty() && target.contains(&name.to_lowercase()))
            .map(|(name, key)| (name.as_str(), key))
    }

    /// Subject-level replacement: subjects in `other` replace whole tables.
    pub fn merge(&mut self, other: AnswerKeyStore) {
        for (subject, key) in other.subjects {
            self.insert_subject(subject, key);
        }
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn subjects(&self) -> impl Iterator<Item = (&str, &SubjectKey)> {
        self.subjects.iter().map(|(name, key)| (name.as_str(), key))
    }
}

impl Serialize for SubjectKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.questions.serialize(serializer)
    }
}

impl Serialize for AnswerKeyStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.subjects.len()))?;
        for (name, key) in &self.subjects {
            map.serialize_entry(name, key)?;
        }
        map.end()
    }
}
