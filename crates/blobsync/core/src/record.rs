//! The synchronized entity and document decoding.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the `Users` table, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

/// Decode a UTF-8 JSON array of records.
///
/// Extra keys on an element are ignored. A missing or mistyped
/// `id`/`name`/`age` rejects the whole document.
pub fn parse_document(bytes: &[u8]) -> Result<Vec<UserRecord>, FetchError> {
    let text = std::str::from_utf8(bytes).map_err(|e| FetchError::Encoding(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Ids that appear more than once, in ascending order.
pub fn duplicate_ids(records: &[UserRecord]) -> Vec<i64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.id).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect()
}
