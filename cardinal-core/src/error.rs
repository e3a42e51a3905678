use crate::ids::SortId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("cardinality limit {limit} reached for sort {sort}")]
    CardinalityLimit { sort: SortId, limit: u32 },
    #[error("no cardinality model for sort {0}")]
    UnknownSort(SortId),
}

pub type Result<T, E = SolverError> = std::result::Result<T, E>;
