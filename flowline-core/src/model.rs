use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A `(route, type)` pair identifying an endpoint on some transport.
///
/// `route` is the transport-local address (an HTTP path, an MQTT topic);
/// `type` names the transport itself and selects the outbound topic when a
/// message is forwarded to this Path.
///
/// Paths travel on the broker inside [`Message`] (protobuf) and over the
/// admin boundary as JSON.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Path {
    #[prost(string, tag = "1")]
    pub route: String,
    #[prost(string, tag = "2")]
    pub r#type: String,
}

impl Path {
    pub fn new(route: impl Into<String>, r#type: impl Into<String>) -> Self {
        Path {
            route: route.into(),
            r#type: r#type.into(),
        }
    }
}

/// A named unit of work bound to a destination [`Path`].
///
/// Flows are admin-created and never deduplicated; saving one always mints
/// a fresh [`Key`](crate::Key) while upserting the embedded Path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub description: String,
    pub path: Path,
}

impl Flow {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: Path,
    ) -> Self {
        Flow {
            name: name.into(),
            description: description.into(),
            path,
        }
    }
}

/// The uniform unit of traffic through the routing loop.
///
/// `payload` is opaque. `origin` is the Path the message was received on
/// (set by the ingress adapter); `destination` is stamped by the router
/// before forwarding. `metadata` is an open key→bytes map; the reserved
/// `message*` keys (see [`crate::codec`]) carry broker coordinates and all
/// other keys are preserved verbatim across the router.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub origin: Option<Path>,
    #[prost(message, optional, tag = "3")]
    pub destination: Option<Path>,
    #[prost(map = "string, bytes", tag = "4")]
    pub metadata: HashMap<String, Vec<u8>>,
}

impl Message {
    /// Build a message as an ingress adapter would: payload plus the Path
    /// it arrived on.
    pub fn from_origin(payload: impl Into<Vec<u8>>, origin: Path) -> Self {
        Message {
            payload: payload.into(),
            origin: Some(origin),
            ..Default::default()
        }
    }
}
