//! Graph-native node references.
//!
//! Inside the quad table a node reference is written `<uuid>`; the angle
//! brackets distinguish it from a string literal carrying the same bytes.

use flowline_core::Key;

use crate::error::GraphError;

/// Render a Key in IRI form for storage.
pub(crate) fn to_iri(key: Key) -> String {
    format!("<{key}>")
}

/// Parse a stored node reference back into a Key.
pub(crate) fn from_iri(raw: &str) -> Result<Key, GraphError> {
    let inner = raw.trim_matches(|c| c == '<' || c == '>');
    Key::parse(inner).map_err(|_| GraphError::Corrupt(format!("bad node reference '{raw}'")))
}
