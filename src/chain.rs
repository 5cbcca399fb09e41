//! Chain identity types shared across the bridging core.
//!
//! The core never interprets these values — they are opaque keys supplied
//! by caller configuration and threaded through to the capability layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// EIP-155 numeric chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messaging-protocol endpoint id for a chain.
///
/// Distinct from the EIP-155 chain id: the protocol assigns its own
/// numbering, and a send targets the destination *endpoint* id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub u32);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One chain as seen by the bridging core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    pub endpoint_id: EndpointId,
    /// Human-readable name used only for logging.
    pub name: String,
}

impl ChainDescriptor {
    pub fn new(chain_id: u64, endpoint_id: u32, name: impl Into<String>) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            endpoint_id: EndpointId(endpoint_id),
            name: name.into(),
        }
    }
}

/// Source/destination pair for one bridging operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub source: ChainDescriptor,
    pub destination: ChainDescriptor,
}

impl Route {
    pub fn new(source: ChainDescriptor, destination: ChainDescriptor) -> Self {
        Self {
            source,
            destination,
        }
    }
}
