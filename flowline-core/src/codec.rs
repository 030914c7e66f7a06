//! Broker coordinate encoding.
//!
//! A received [`Message`] carries its broker coordinates (topic, partition,
//! offset) inside its own metadata map so acknowledgement needs no side
//! channel. Topic is raw UTF-8; partition and offset are zig-zag signed
//! varints (the partition id is widened to 64 bits before encoding).
//! Decoding reads a single varint and tolerates trailing bytes.

use prost::encoding::{decode_varint, encode_varint};

use crate::model::Message;

/// Reserved metadata key for the inbound topic name.
pub const META_TOPIC: &str = "messageTopic";
/// Reserved metadata key for the inbound partition id.
pub const META_PARTITION: &str = "messagePartition";
/// Reserved metadata key for the inbound offset.
pub const META_OFFSET: &str = "messageOffset";

/// Errors raised while reading broker coordinates out of message metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A reserved metadata key is absent.
    MissingMetadata(&'static str),
    /// A reserved metadata key holds bytes that do not decode.
    MalformedMetadata(&'static str),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::MissingMetadata(key) => {
                write!(f, "message metadata is missing '{key}'")
            }
            CodecError::MalformedMetadata(key) => {
                write!(f, "message metadata '{key}' is malformed")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Broker coordinates of a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Encode a signed value as a zig-zag varint.
pub fn encode_signed(value: i64) -> Vec<u8> {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    let mut buf = Vec::with_capacity(10);
    encode_varint(zigzag, &mut buf);
    buf
}

/// Decode a zig-zag varint from the front of `buf`. Trailing bytes after
/// the varint are ignored.
pub fn decode_signed(mut buf: &[u8]) -> Option<i64> {
    let zigzag = decode_varint(&mut buf).ok()?;
    Some(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64))
}

impl Message {
    /// Record the broker coordinates of this message in its metadata.
    pub fn stamp_coordinates(&mut self, topic: &str, partition: i32, offset: i64) {
        self.metadata
            .insert(META_TOPIC.to_string(), topic.as_bytes().to_vec());
        self.metadata
            .insert(META_PARTITION.to_string(), encode_signed(i64::from(partition)));
        self.metadata
            .insert(META_OFFSET.to_string(), encode_signed(offset));
    }

    /// Read the broker coordinates back out of the metadata.
    pub fn coordinates(&self) -> Result<Coordinates, CodecError> {
        let topic = self
            .metadata
            .get(META_TOPIC)
            .ok_or(CodecError::MissingMetadata(META_TOPIC))?;
        let topic = std::str::from_utf8(topic)
            .map_err(|_| CodecError::MalformedMetadata(META_TOPIC))?
            .to_string();

        let partition = self
            .metadata
            .get(META_PARTITION)
            .ok_or(CodecError::MissingMetadata(META_PARTITION))
            .and_then(|raw| {
                decode_signed(raw).ok_or(CodecError::MalformedMetadata(META_PARTITION))
            })?;
        let partition = i32::try_from(partition)
            .map_err(|_| CodecError::MalformedMetadata(META_PARTITION))?;

        let offset = self
            .metadata
            .get(META_OFFSET)
            .ok_or(CodecError::MissingMetadata(META_OFFSET))
            .and_then(|raw| {
                decode_signed(raw).ok_or(CodecError::MalformedMetadata(META_OFFSET))
            })?;

        Ok(Coordinates {
            topic,
            partition,
            offset,
        })
    }

    /// Drop the reserved coordinate keys, leaving all other metadata intact.
    /// Forwarded messages must not carry the inbound record's coordinates.
    pub fn strip_coordinates(&mut self) {
        self.metadata.remove(META_TOPIC);
        self.metadata.remove(META_PARTITION);
        self.metadata.remove(META_OFFSET);
    }
}
