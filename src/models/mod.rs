//! Data models for the admin pipeline API.

mod pipeline;
mod report;

pub use pipeline::{
    current_book_matches, BookListResponse, BookState, BookStatus, CurrentBook,
    PipelineRunStatus, Progress, RunStatus, Stage,
};
pub use report::{
    HealthCheck, PipelineReport, RelatedDataStats, ReportFailure, ReportSummary, StorageStats,
};

/// Serde adapter for identifiers the server sends as either strings or numbers.
pub(crate) mod string_or_number {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw: Option<Raw> = Option::deserialize(deserializer)?;
        Ok(raw.map(|raw| match raw {
            Raw::Str(s) => s,
            Raw::Int(n) => n.to_string(),
            Raw::Float(f) => f.to_string(),
        }))
    }
}
