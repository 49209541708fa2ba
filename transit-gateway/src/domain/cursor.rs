//! Pagination cursors.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest id a decoded cursor may carry.
///
/// Anything above this did not come from us and would only start an
/// unbounded scan.
pub const MAX_CURSOR_ID: i64 = 1 << 53;

/// Error returned when decoding a malformed cursor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cursor: {reason}")]
pub struct CursorError {
    reason: &'static str,
}

/// A position in a (feed_version_id, id) ordered result set.
///
/// A `feed_version_id` of zero means "compare by entity id only", which is
/// what a bare `after` argument produces.
///
/// # Examples
///
/// ```
/// use transit_gateway::domain::Cursor;
///
/// let c = Cursor::new(3, 1500);
/// let wire = c.encode();
/// assert_eq!(Cursor::decode(&wire).unwrap(), c);
/// assert!(Cursor::decode("not a cursor").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cursor {
    pub feed_version_id: i64,
    pub id: i64,
}

impl Cursor {
    pub fn new(feed_version_id: i64, id: i64) -> Self {
        Self { feed_version_id, id }
    }

    /// Opaque wire form: base64 of "fvid,id".
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{},{}", self.feed_version_id, self.id))
    }

    /// Decode the wire form produced by [`Cursor::encode`].
    pub fn decode(s: &str) -> Result<Self, CursorError> {
        let bytes = STANDARD.decode(s.trim()).map_err(|_| CursorError {
            reason: "not base64",
        })?;
        let text = std::str::from_utf8(&bytes).map_err(|_| CursorError {
            reason: "not utf-8",
        })?;
        let (fvid, id) = text.split_once(',').ok_or(CursorError {
            reason: "expected two comma separated values",
        })?;
        let feed_version_id: i64 = fvid.parse().map_err(|_| CursorError {
            reason: "feed version id is not an integer",
        })?;
        let id: i64 = id.parse().map_err(|_| CursorError {
            reason: "id is not an integer",
        })?;
        if feed_version_id < 0 || id < 0 {
            return Err(CursorError {
                reason: "values must not be negative",
            });
        }
        if feed_version_id > MAX_CURSOR_ID || id > MAX_CURSOR_ID {
            return Err(CursorError {
                reason: "value out of range",
            });
        }
        Ok(Self { feed_version_id, id })
    }

    /// True if a row at (feed_version_id, id) lies strictly after this cursor.
    pub fn admits(&self, feed_version_id: i64, id: i64) -> bool {
        if self.feed_version_id == 0 {
            id > self.id
        } else {
            (feed_version_id, id) > (self.feed_version_id, self.id)
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cursor::decode(&s).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn paging_never_revisits_or_skips(
            rows in prop::collection::btree_set((1i64..20, 1i64..10_000), 0..200),
            page in 1usize..25,
        ) {
            let rows: Vec<(i64, i64)> = rows.into_iter().collect();
            let mut seen = Vec::new();
            let mut cursor: Option<Cursor> = None;
            loop {
                let batch: Vec<(i64, i64)> = rows
                    .iter()
                    .filter(|(fv, id)| cursor.is_none_or(|c| c.admits(*fv, *id)))
                    .take(page)
                    .copied()
                    .collect();
                let Some(&(fv, id)) = batch.last() else { break };
                seen.extend(batch);
                cursor = Some(Cursor::new(fv, id));
            }
            prop_assert_eq!(seen, rows);
        }
    }
}
