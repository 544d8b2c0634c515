//! `gradesync-recon`: reconciles grading spreadsheets against a class roster
//! and competency catalogue.
//!
//! Pure engine crate: receives pre-loaded grids and snapshots, returns
//! evaluation records. No CLI or IO dependencies.

pub mod answer_key;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod grade;
pub mod grid;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod stats;
pub mod sync;

pub use answer_key::{AnswerKeyStore, SubjectKey};
pub use config::{DetectConfig, SyncConfig};
pub use engine::{reconcile, reconcile_with, ReconInput};
pub use error::ReconError;
pub use grid::Grid;
pub use merge::{EvaluationStore, MergeStats};
pub use model::{
    CellValue, Competency, Evaluation, EvaluationResult, Level, ReconOutput, ReconSummary,
    Snapshot, Student, Subject,
};
pub use sync::{SheetGrid, SyncReport};
