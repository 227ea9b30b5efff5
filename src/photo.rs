use std::fmt;
use std::path::{Path, PathBuf};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::errors::StoreError;

/// Standard alphabet; padding may be present or not.
const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const EXTENSION: &str = "jpeg";

/// Where a stored photo ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoReference(PathBuf);

impl PhotoReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PhotoReference(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The form written to the database.
    pub fn to_db_string(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl fmt::Display for PhotoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Decodes a photo submitted either as bare base64 or as a data URI
/// (`data:image/jpeg;base64,...`). Everything up to the first comma is
/// treated as the header and discarded.
pub fn decode(image_data: &str) -> Result<Vec<u8>, StoreError> {
    let encoded = match image_data.split_once(',') {
        Some((_header, encoded)) => encoded,
        None => image_data,
    };

    let encoded: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = ENGINE
        .decode(encoded.as_bytes())
        .map_err(|e| StoreError::Decode { source: Some(e) })?;

    if bytes.is_empty() {
        return Err(StoreError::Decode { source: None });
    }

    Ok(bytes)
}

/// Builds `<identity_key>_<timestamp>.jpeg`, with the timestamp down to
/// the microsecond so repeated submissions don't collide.
pub fn file_name(identity_key: &str, at: OffsetDateTime) -> Result<String, StoreError> {
    let format = format_description!("[year][month][day][hour][minute][second][subsecond digits:6]");

    let timestamp = at
        .format(format)
        .map_err(|source| StoreError::Naming { source })?;

    Ok(format!("{}_{}.{}", identity_key, timestamp, EXTENSION))
}
