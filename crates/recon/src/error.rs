use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (no sheets, empty subject, etc.).
    ConfigValidation(String),
    /// Grid input is not a rectangular-ish list of rows.
    GridShape(String),
    /// Answer-key text could not be read as delimited records.
    AnswerKeyParse { line: usize, message: String },
    /// Snapshot JSON parse / deserialization error.
    SnapshotParse(String),
    /// A subject id that is not present in the snapshot.
    UnknownSubject(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::GridShape(msg) => write!(f, "invalid grid: {msg}"),
            Self::AnswerKeyParse { line, message } => {
                write!(f, "answer key, line {line}: {message}")
            }
            Self::SnapshotParse(msg) => write!(f, "snapshot parse error: {msg}"),
            Self::UnknownSubject(id) => write!(f, "unknown subject: {id}"),
        }
    }
}

impl std::error::Error for ReconError {}
