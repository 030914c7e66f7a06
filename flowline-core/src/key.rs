use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable opaque identifier for a graph node.
///
/// Backed by a random v4 UUID (RFC 4122). Equality is byte-wise. The
/// boundary representation is the canonical 36-character hyphenated form;
/// the graph-native IRI form is produced by the storage layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Uuid);

impl Key {
    /// Generate a fresh random Key.
    pub fn random() -> Self {
        Key(Uuid::new_v4())
    }

    /// Parse a Key from its canonical 36-character text form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::try_parse(s).map(Key)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Key {
    fn from(id: Uuid) -> Self {
        Key(id)
    }
}

impl std::str::FromStr for Key {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_keys_are_distinct() {
        assert_ne!(Key::random(), Key::random());
    }

    #[test]
    fn parse_round_trips_display() {
        let key = Key::random();
        let parsed = Key::parse(&key.to_string()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Key::parse("not-a-uuid").is_err());
        assert!(Key::parse("").is_err());
    }

    #[test]
    fn serde_uses_canonical_text_form() {
        let key = Key::parse("936da01f-9abd-4d9d-80c7-02af85c822a8").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"936da01f-9abd-4d9d-80c7-02af85c822a8\"");
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
