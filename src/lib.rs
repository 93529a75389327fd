//! Sociometric analysis of peer-nomination surveys.
//!
//! Raw survey answers become directed social relations, which feed per-student
//! indices, cluster detection, network metrics and risk alerts. [`analyze`]
//! runs the whole pipeline for one group and returns an [`AnalysisResult`].

pub mod alerts;
pub mod analysis;
pub mod clusters;
pub mod config;
pub mod error;
pub mod indices;
pub mod models;
pub mod network;
pub mod relations;

pub use analysis::analyze;
pub use config::Thresholds;
pub use error::{AnalysisError, Result};
pub use models::AnalysisResult;
pub use relations::{QuestionBank, QuestionCatalog};
