use crate::types::SubjectId;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid interval: end {end} precedes start {start}")]
    InvalidInterval { start: NaiveDate, end: NaiveDate },

    #[error("Episode starting {start} matched more than one primary rule: {labels:?}")]
    AmbiguousPrimaryClassification { start: NaiveDate, labels: Vec<String> },

    #[error("Category label '{label}' is not in the priority list")]
    UnknownCategoryLabel { label: String },

    #[error("No adjustment factor for {year}-{month:02}")]
    MissingAdjustmentFactor { year: i32, month: u32 },

    #[error("Subject '{subject_id}' failed: {source}")]
    SubjectFailed {
        subject_id: SubjectId,
        #[source]
        source: Box<PanelError>,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PanelError {
    /// The core error underneath any `SubjectFailed` wrapping.
    pub fn root(&self) -> &PanelError {
        match self {
            PanelError::SubjectFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type PanelResult<T> = Result<T, PanelError>;
