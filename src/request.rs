//! Transfer request model.
//!
//! A [`TransferRequest`] describes one NFT to move across chains. Requests
//! are immutable once constructed and owned by the caller; the orchestrator
//! only ever reads them.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// How the token travels across chains.
///
/// Modeled as a tagged variant rather than an optional collection address
/// so both execution paths are exhaustive at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    /// The NFT contract itself speaks the messaging protocol and
    /// burns/mints its own tokens.
    Direct,
    /// An existing collection is bridged through a companion adapter
    /// contract that locks tokens and mints wrapped representations on
    /// the destination. Requires the sender to have approved the adapter
    /// on the original collection.
    ViaAdapter {
        /// The original, unmodified collection being wrapped.
        collection: Address,
    },
}

impl TransferMode {
    /// Returns the original collection address in adapter mode.
    pub fn adapter_collection(&self) -> Option<Address> {
        match self {
            Self::Direct => None,
            Self::ViaAdapter { collection } => Some(*collection),
        }
    }
}

/// One NFT transfer to execute across the configured route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Chain-native token id.
    pub token_id: U256,
    /// The NFT contract holding (or minting) the token on the source chain.
    pub nft_contract: Address,
    /// The contract the send transaction targets — the NFT contract itself
    /// in direct mode, the adapter in adapter mode.
    pub bridge_contract: Address,
    pub mode: TransferMode,
}

impl TransferRequest {
    /// Request for a collection that bridges its own tokens.
    pub fn direct(token_id: U256, nft_contract: Address) -> Self {
        Self {
            token_id,
            nft_contract,
            bridge_contract: nft_contract,
            mode: TransferMode::Direct,
        }
    }

    /// Request for an existing collection bridged through an adapter.
    pub fn via_adapter(token_id: U256, collection: Address, adapter: Address) -> Self {
        Self {
            token_id,
            nft_contract: collection,
            bridge_contract: adapter,
            mode: TransferMode::ViaAdapter { collection },
        }
    }
}
