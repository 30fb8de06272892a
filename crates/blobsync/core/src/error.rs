use thiserror::Error;

/// Failures while retrieving or decoding the source document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid storage configuration: {0}")]
    Config(String),

    #[error("request to {location} failed: {reason}")]
    Request { location: String, reason: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage returned {status} for {location}: {body}")]
    Status {
        location: String,
        status: u16,
        body: String,
    },

    #[error("io error reading {location}: {reason}")]
    Io { location: String, reason: String },

    #[error("document is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("malformed JSON document: {0}")]
    Parse(String),
}

/// Failures while talking to the relational store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl DatabaseError {
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DatabaseError::Connection(err.to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

/// Failures of the email side-channel. Only ever logged.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email notification not configured: missing {0}")]
    MissingConfig(&'static str),

    #[error("email transport failed: {0}")]
    Transport(String),

    #[error("email API rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },
}
