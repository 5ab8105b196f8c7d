use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown entity name: {0}")]
    EntityNotFound(String),

    #[error("catalog error: {message}")]
    Catalog { message: String },

    #[error("store error: {message}")]
    Store { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, NotifierError>;
