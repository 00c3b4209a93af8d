//! Logical object keys.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::StorageError;

/// Number of lowercase letters required in a filename extension.
const EXTENSION_LEN: usize = 3;

/// Logical key of a stored object: a positive collection id and a filename.
///
/// The filename must be ASCII letters followed by a dot and a three letter
/// lowercase extension (`abc.png`). Both parts are validated on construction,
/// so holding a `StoredObjectPath` means no separator, dot segment or
/// absolute component can reach a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredObjectPath {
    collection_id: u64,
    filename: String,
}

impl StoredObjectPath {
    /// Validates a raw collection id and filename.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if either component is malformed.
    pub fn new(collection_id: &str, filename: &str) -> Result<Self, StorageError> {
        let collection_id = parse_collection_id(collection_id)?;
        validate_filename(filename)?;

        Ok(Self {
            collection_id,
            filename: filename.to_string(),
        })
    }

    /// Collection identifier.
    #[must_use]
    pub const fn collection_id(&self) -> u64 {
        self.collection_id
    }

    /// Filename within the collection.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Lowercase extension without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        // Validation guarantees exactly one dot.
        self.filename
            .rsplit_once('.')
            .map_or("", |(_, extension)| extension)
    }

    /// Canonical `{id}/{filename}` form, used as the object key.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

fn parse_collection_id(raw: &str) -> Result<u64, StorageError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StorageError::invalid_path(format!(
            "collection id '{raw}' must be a positive integer"
        )));
    }

    match raw.parse::<u64>() {
        Ok(0) => Err(StorageError::invalid_path("collection id must be positive")),
        Ok(id) => Ok(id),
        Err(_) => Err(StorageError::invalid_path(format!(
            "collection id '{raw}' is out of range"
        ))),
    }
}

fn validate_filename(raw: &str) -> Result<(), StorageError> {
    let valid = raw.split_once('.').is_some_and(|(stem, extension)| {
        !stem.is_empty()
            && stem.bytes().all(|b| b.is_ascii_alphabetic())
            && extension.len() == EXTENSION_LEN
            && extension.bytes().all(|b| b.is_ascii_lowercase())
    });

    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_path(format!(
            "filename '{raw}' must be letters followed by a 3 letter lowercase extension"
        )))
    }
}

impl fmt::Display for StoredObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection_id, self.filename)
    }
}

impl FromStr for StoredObjectPath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection_id, filename) = s
            .split_once('/')
            .ok_or_else(|| StorageError::invalid_path(format!("'{s}' is not '<id>/<filename>'")))?;
        Self::new(collection_id, filename)
    }
}

impl Serialize for StoredObjectPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
