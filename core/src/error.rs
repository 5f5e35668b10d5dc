use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored record failed schema validation at the store boundary.
    #[error("Invalid record {id}: {reason}")]
    Validation { id: String, reason: String },

    #[error("Write failed: {0}")]
    WriteFailure(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::Validation {
            id: "abc".to_string(),
            reason: "unsupported schema version 9".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid record abc: unsupported schema version 9");
    }
}
