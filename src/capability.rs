//! Capability traits the bridging core consumes.
//!
//! The core never talks to a chain directly. It is parameterized over
//! three capabilities, injected explicitly by the caller:
//!
//! - [`BridgeSigner`] — signs and submits the bridging transaction.
//! - [`ChainQuery`] — read-only source-chain queries (gas price, token
//!   custody).
//! - [`MessagingEndpoint`] — the cross-chain protocol surface (fee
//!   quotes, peer configuration, delivery status).
//!
//! Each trait carries its own error type; whatever an implementation
//! throws is ingested by [`crate::classify::classify`], so implementations
//! are free to surface provider-specific errors verbatim.

use std::fmt;

use alloy::primitives::{Address, B256, TxHash, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainId, EndpointId, Route};

/// Unique identifier the messaging protocol assigns to one in-flight
/// cross-chain message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageGuid(pub B256);

impl fmt::Debug for MessageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageGuid({})", self.0)
    }
}

impl fmt::Display for MessageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What travels across chains for one token transfer. The wire encoding
/// is the protocol's business; the core only carries the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPayload {
    pub token_id: U256,
    /// Recipient of the token on the destination chain.
    pub recipient: Address,
}

/// Protocol fee quote for one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Fee charged by the protocol for message verification and relay.
    pub protocol_fee: U256,
    /// Execution gas prepaid for delivery on the destination chain.
    pub destination_execution_gas: U256,
}

/// The bridging transaction handed to the signing capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTransaction {
    /// Contract the transaction targets — the NFT contract in direct
    /// mode, the adapter in adapter mode.
    pub to: Address,
    pub destination: EndpointId,
    pub payload: SendPayload,
    /// Native value attached as fee payment (quoted immediately before).
    pub value: U256,
    /// Human-readable operation description for signer dashboards/logs.
    pub note: String,
}

/// Result of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub tx_hash: TxHash,
    /// Message identifier extracted from the emitted protocol event;
    /// absent when the expected event was not found in the receipt.
    pub message_guid: Option<MessageGuid>,
}

/// Signs and submits bridging transactions. One shared signer serves a
/// whole batch run; the orchestrator guarantees only one transaction is
/// in flight against it at a time.
#[async_trait]
pub trait BridgeSigner: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Address the signer submits from (the token holder).
    fn address(&self) -> Address;

    /// Signs, broadcasts and awaits inclusion of one bridging transaction.
    async fn sign_and_send(&self, tx: SendTransaction) -> Result<SendOutcome, Self::Error>;
}

/// Whether the sender holds the token and has approved the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCustody {
    /// Held by the sender and the bridge contract is approved.
    HeldAndApproved,
    /// Held by the sender but the bridge contract lacks approval.
    HeldNotApproved,
    /// Not held by the sender at all.
    NotHeld,
}

/// Read-only source-chain queries.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current gas price on the given chain, in its smallest native unit.
    async fn gas_price(&self, chain: ChainId) -> Result<u128, Self::Error>;

    /// Checks whether `holder` owns `token_id` on `collection` and has
    /// approved `operator` to move it.
    async fn token_custody(
        &self,
        collection: Address,
        token_id: U256,
        holder: Address,
        operator: Address,
    ) -> Result<TokenCustody, Self::Error>;
}

/// Destination-side delivery state of an in-flight message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryState {
    Inflight,
    Delivered,
    Failed,
}

/// The cross-chain messaging protocol surface.
#[async_trait]
pub trait MessagingEndpoint: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Quotes the fee for sending `payload` over `route`. Quotes are
    /// volatile and must be re-requested immediately before submission.
    async fn quote_fee(
        &self,
        route: &Route,
        payload: &SendPayload,
    ) -> Result<FeeQuote, Self::Error>;

    /// Peer contract configured for the given remote endpoint, if any.
    async fn peer(&self, remote: EndpointId) -> Result<Option<Address>, Self::Error>;

    /// Destination-chain delivery state for an in-flight message.
    async fn message_status(&self, guid: MessageGuid) -> Result<DeliveryState, Self::Error>;
}
