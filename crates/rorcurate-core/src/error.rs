use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate affiliation id in query result: {0}")]
    DuplicateId(String),

    #[error("no affiliation record with id {0}")]
    UnknownRecord(String),
}
