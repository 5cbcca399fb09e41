//! Shared fixtures for unit tests.

use alloy::primitives::{address, Address};

use crate::chain::{ChainDescriptor, Route};

pub(crate) const SENDER: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub(crate) const RECIPIENT: Address = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

/// Ethereum mainnet to Base, with their LayerZero-style endpoint ids.
pub(crate) fn test_route() -> Route {
    Route::new(
        ChainDescriptor::new(1, 30101, "ethereum"),
        ChainDescriptor::new(8453, 30184, "base"),
    )
}
