use thiserror::Error;

#[derive(Error, Debug)]
pub enum LimsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid report draft: {0}")]
    InvalidDraft(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Nothing to save: no result values were entered for the selected tests")]
    NothingToSave,

    #[error("Report not found: {0}")]
    ReportNotFound(String),
}

pub type LimsResult<T> = Result<T, LimsError>;
