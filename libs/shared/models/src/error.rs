use thiserror::Error;

/// Failures reported by any record store (in-memory or PostgREST backed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The atomic slot guard refused the write: another confirmed booking
    /// already holds that window for the doctor.
    #[error("Slot already taken")]
    SlotTaken,

    #[error("Record not found")]
    NotFound,

    /// A conditional write lost against a concurrent change (e.g. the row
    /// no longer had the expected status).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to decode record: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}
