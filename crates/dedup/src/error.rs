use std::fmt;

#[derive(Debug)]
pub enum MergeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty separator list, duplicate field key, etc.).
    ConfigValidation(String),
    /// Input file missing, unreadable, or not valid JSON.
    InputUnreadable { path: String, message: String },
    /// Input is JSON but not an array of records.
    InputShape(String),
    /// Output file could not be written. The merged batch is lost.
    OutputWrite { path: String, message: String },
    /// Run stopped by a cancel token before every group was merged.
    Cancelled { completed_groups: usize },
    /// IO error (directory walk, etc.).
    Io(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InputUnreadable { path, message } => {
                write!(f, "cannot read input '{path}': {message}")
            }
            Self::InputShape(msg) => write!(f, "input is not a record array: {msg}"),
            Self::OutputWrite { path, message } => {
                write!(f, "cannot write output '{path}': {message}")
            }
            Self::Cancelled { completed_groups } => {
                write!(f, "merge cancelled after {completed_groups} group(s); nothing written")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_path() {
        let err = MergeError::InputUnreadable {
            path: "data/combined.json".into(),
            message: "No such file or directory".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot read input 'data/combined.json': No such file or directory"
        );
    }

    #[test]
    fn cancelled_reports_progress() {
        let err = MergeError::Cancelled { completed_groups: 12 };
        assert!(err.to_string().contains("12 group(s)"));
    }
}
