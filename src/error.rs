use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed response from {student_id} to question {question_id}: {reason}")]
    MalformedResponse {
        student_id: Uuid,
        question_id: Uuid,
        reason: String,
    },

    #[error("failed to read threshold config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid threshold config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
