use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Database error: {0}\nSuggestion: Check that the database file is writable and not corrupted")]
    Database(#[from] rusqlite::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid row in {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },
}

pub type MetadataResult<T> = Result<T, MetadataError>;
