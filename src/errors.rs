use std::io;

use thiserror::Error;

/// Enumerates high-level errors returned by the registration write path.
///
/// The `Display` output of each variant is the message sent back to the
/// client, so keep it free of anything sensitive.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request body was absent, not JSON, or not a non-empty object.
    #[error("Invalid request: Missing JSON body")]
    MalformedRequest,

    /// The body was longer than the configured maximum.
    #[error("Request body exceeds the maximum of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// One or more required fields were absent, empty, or not strings.
    #[error("Missing required fields")]
    MissingFields(Vec<&'static str>),

    /// The photo could not be decoded or written.
    #[error("Server failed to process and save the photo")]
    PhotoProcessing { source: StoreError },

    /// No connection could be obtained from the pool.
    #[error("Failed to establish a database connection.")]
    DatabaseConnection { source: sqlx::Error },

    /// The ID fingerprint or the voter ID is already taken.
    #[error("A user with this Aadhaar or Voter ID is already registered.")]
    DuplicateRegistration,

    /// Represents any other SQL error.
    #[error("A server-side database error occurred: {source}")]
    Sqlx { source: sqlx::Error },
}

/// Enumerates errors returned by the photo store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The payload was not valid base64, or decoded to nothing.
    #[error("Could not decode photo")]
    Decode {
        #[source]
        source: Option<base64::DecodeError>,
    },

    /// The timestamp for the file name could not be formatted.
    #[error("Could not name photo file")]
    Naming { source: time::error::Format },

    /// The file could not be created, written or synced.
    #[error("Could not write photo to {path}")]
    Write { path: String, source: io::Error },
}

/// Enumerates errors encountered while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The named variable holds a value that can't be parsed.
    #[error("could not parse {name}={value:?}")]
    Invalid { name: &'static str, value: String },
}
