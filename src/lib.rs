//! Batch cross-chain NFT bridging orchestration.
//!
//! This crate drives ERC-721 transfers across chains over an omnichain
//! messaging protocol: it estimates the full cost of a send, submits the
//! bridging transaction, classifies anything that goes wrong into
//! actionable categories, sequences whole batches with live progress, and
//! tracks destination-chain delivery of in-flight messages.
//!
//! # Architecture
//!
//! The core is chain-agnostic and talks to the world only through three
//! injected capability traits ([`capability`]): a [`BridgeSigner`] that
//! submits transactions, a [`ChainQuery`] for read-only source-chain state,
//! and a [`MessagingEndpoint`] for protocol fee quotes, peer configuration
//! and delivery status. Production callers back these with real providers;
//! tests use the scripted doubles in [`mock`].
//!
//! Layered on top:
//!
//! - [`classify`] — maps raw provider errors to [`ErrorKind`] with a
//!   retry policy and backoff schedule.
//! - [`gas`] — fresh, line-itemized [`GasBreakdown`] per transfer;
//!   breakdowns in the same unit aggregate field-wise.
//! - [`executor`] — drives one transfer end to end, always producing a
//!   [`BridgeResult`]; an explicit bounded retry loop sits alongside.
//! - [`batch`] — strictly sequential orchestration (one sender, one nonce
//!   sequence) with a synchronous in-order progress callback and partial
//!   success as a first-class outcome.
//! - [`tracker`] — bounded polling of delivery status, yielding snapshots
//!   until a terminal state or timeout.
//!
//! Long-running operations (batch runs, retry waits, status streams) take
//! a [`CancelToken`]; cancellation stops the next step from starting but
//! never interrupts an already-broadcast transaction.
//!
//! # Example
//!
//! ```no_run
//! # async fn run<S, Q, E>(signer: S, query: Q, endpoint: E)
//! # where
//! #     S: onft_bridge::BridgeSigner,
//! #     Q: onft_bridge::ChainQuery,
//! #     E: onft_bridge::MessagingEndpoint,
//! # {
//! use alloy::primitives::{Address, U256};
//! use onft_bridge::{
//!     BatchOrchestrator, BridgeExecutor, CancelToken, ChainDescriptor, Route, TransferRequest,
//! };
//!
//! let route = Route::new(
//!     ChainDescriptor::new(1, 30101, "ethereum"),
//!     ChainDescriptor::new(8453, 30184, "base"),
//! );
//! let collection = Address::repeat_byte(0x11);
//! let requests: Vec<_> = [1u64, 2, 7]
//!     .into_iter()
//!     .map(|id| TransferRequest::direct(U256::from(id), collection))
//!     .collect();
//!
//! let orchestrator = BatchOrchestrator::new(BridgeExecutor::new(signer, query, endpoint));
//! let outcome = orchestrator
//!     .run(
//!         &requests,
//!         &route,
//!         Address::repeat_byte(0x22),
//!         &CancelToken::never(),
//!         |progress| println!("{}/{} resolved", progress.resolved(), progress.total),
//!     )
//!     .await;
//!
//! println!("{} succeeded, {} failed", outcome.succeeded, outcome.failed);
//! # }
//! ```

pub mod batch;
pub mod cancel;
pub mod capability;
pub mod chain;
pub mod classify;
pub mod executor;
pub mod gas;
pub mod mock;
pub mod request;
pub mod tracker;

#[cfg(test)]
mod test_utils;

pub use batch::{BatchBridgeProgress, BatchBridgeResult, BatchOrchestrator};
pub use cancel::{cancellation, CancelHandle, CancelToken};
pub use capability::{
    BridgeSigner, ChainQuery, DeliveryState, FeeQuote, MessageGuid, MessagingEndpoint,
    SendOutcome, SendPayload, SendTransaction, TokenCustody,
};
pub use chain::{ChainDescriptor, ChainId, EndpointId, Route};
pub use classify::{classify, classify_message, ClassifiedError, ErrorKind};
pub use executor::{BridgeExecutor, BridgeResult, RetryPolicy};
pub use gas::{CurrencyUnit, GasBreakdown, GasError};
pub use request::{TransferMode, TransferRequest};
pub use tracker::{DeliveryStatus, MessageTracker, StatusSnapshot, StatusStream, TrackerConfig};
