use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ApiloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Reports directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
}

/// Why a stats or history file could not be turned into a record.
///
/// Callers in the analysis pipeline log these and carry on with an absent
/// value; the variants exist so that callers who care can tell a file that
/// was never produced apart from one that is malformed.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("File {} not found", .0.display())]
    MissingFile(PathBuf),

    #[error("Error analyzing {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("No data row found in {}", .0.display())]
    NoDataRow(PathBuf),
}

impl ExtractError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ExtractError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
