use thiserror::Error;

/// Errors raised while reducing report tables into aggregated template rows.
///
/// Data sparsity (an empty extractor table, a missing formula column, a group
/// with zero total weight) is deliberately not represented here: those degrade
/// to empty results or NaN statistics and are only logged.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("cannot combine report values carrying mixed units: {units:?}")]
    MixedUnits { units: Vec<String> },
    #[error("report row {index} of archetype {archetype} references missing dictionary entry {dictionary_index}")]
    MissingDictionaryEntry {
        archetype: String,
        index: i64,
        dictionary_index: i64,
    },
    #[error("Error during aggregation: {0}")]
    FailureInAggregation(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("concurrent sort requires equally sized partitions: {0}")]
    MismatchedPartitions(String),
    #[error("monthly resampling is only defined for hourly profiles, not {0}")]
    NotResamplable(String),
    #[error("Error during profile transform: {0}")]
    FailureInTransform(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("{collection} object \"{referrer}\" references unknown object $id {id}")]
    UnresolvedReference {
        collection: &'static str,
        referrer: String,
        id: String,
    },
    #[error("Error while reading template document: {0}")]
    InvalidDocument(#[from] anyhow::Error),
}
