//! In-memory capability doubles.
//!
//! Deterministic implementations of the capability traits, driven by
//! scripted outcome queues. Builders push outcomes in call order; once a
//! queue is exhausted the mock falls back to a sensible default (success
//! for the signer, in-flight for delivery status), so simple tests need no
//! scripting at all.
//!
//! Exposed publicly so downstream crates can test their own orchestration
//! against the same doubles.

use std::collections::VecDeque;
use std::sync::Mutex;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::capability::{
    BridgeSigner, ChainQuery, DeliveryState, FeeQuote, MessageGuid, MessagingEndpoint,
    SendOutcome, SendPayload, SendTransaction, TokenCustody,
};
use crate::chain::{ChainId, EndpointId, Route};

/// Error type every mock capability returns. The display string is the
/// scripted message, so classification sees exactly what the test wrote.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MockFailure(pub String);

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Debug, Clone)]
enum SignOutcome {
    Success { with_guid: bool },
    Failure(String),
}

/// Scripted [`BridgeSigner`]. Records every submitted transaction.
pub struct MockSigner {
    address: Address,
    outcomes: Mutex<VecDeque<SignOutcome>>,
    always_fail: Option<String>,
    sent: Mutex<Vec<SendTransaction>>,
}

impl MockSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            outcomes: Mutex::new(VecDeque::new()),
            always_fail: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queues one failing submission with the given error message.
    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.outcomes).push_back(SignOutcome::Failure(message.into()));
        self
    }

    /// Queues one successful submission. Useful for interleaving explicit
    /// successes between scripted failures.
    #[must_use]
    pub fn with_default_success(self) -> Self {
        lock(&self.outcomes).push_back(SignOutcome::Success { with_guid: true });
        self
    }

    /// Queues a submission that confirms but whose receipt carries no
    /// protocol message event.
    #[must_use]
    pub fn with_success_without_guid(self) -> Self {
        lock(&self.outcomes).push_back(SignOutcome::Success { with_guid: false });
        self
    }

    /// Every submission fails with the given message, regardless of the
    /// scripted queue.
    #[must_use]
    pub fn always_failing(mut self, message: impl Into<String>) -> Self {
        self.always_fail = Some(message.into());
        self
    }

    /// Number of transactions submitted so far.
    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }

    /// The most recently submitted transaction.
    pub fn last_sent(&self) -> Option<SendTransaction> {
        lock(&self.sent).last().cloned()
    }

    fn fabricate(n: usize, with_guid: bool) -> SendOutcome {
        // Deterministic per-submission identifiers, distinguishable in
        // assertion output.
        let seed = U256::from(n as u64 + 1);
        SendOutcome {
            tx_hash: B256::from(seed),
            message_guid: with_guid.then(|| MessageGuid(B256::from(seed << 128))),
        }
    }
}

#[async_trait]
impl BridgeSigner for MockSigner {
    type Error = MockFailure;

    fn address(&self) -> Address {
        self.address
    }

    async fn sign_and_send(&self, tx: SendTransaction) -> Result<SendOutcome, Self::Error> {
        let mut sent = lock(&self.sent);
        sent.push(tx);
        let n = sent.len();
        drop(sent);

        if let Some(message) = &self.always_fail {
            return Err(MockFailure(message.clone()));
        }

        match lock(&self.outcomes).pop_front() {
            Some(SignOutcome::Failure(message)) => Err(MockFailure(message)),
            Some(SignOutcome::Success { with_guid }) => Ok(Self::fabricate(n, with_guid)),
            None => Ok(Self::fabricate(n, true)),
        }
    }
}

/// Fixed-answer [`ChainQuery`].
pub struct MockChainQuery {
    gas_price: u128,
    custody: TokenCustody,
}

impl MockChainQuery {
    pub fn new() -> Self {
        Self {
            gas_price: 10,
            custody: TokenCustody::HeldAndApproved,
        }
    }

    #[must_use]
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    #[must_use]
    pub fn with_custody(mut self, custody: TokenCustody) -> Self {
        self.custody = custody;
        self
    }
}

impl Default for MockChainQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainQuery for MockChainQuery {
    type Error = MockFailure;

    async fn gas_price(&self, _chain: ChainId) -> Result<u128, Self::Error> {
        Ok(self.gas_price)
    }

    async fn token_custody(
        &self,
        _collection: Address,
        _token_id: U256,
        _holder: Address,
        _operator: Address,
    ) -> Result<TokenCustody, Self::Error> {
        Ok(self.custody)
    }
}

/// Scripted [`MessagingEndpoint`].
///
/// Fee quoting and peer lookup are fixed-answer; delivery status consumes
/// a scripted queue and falls back to [`DeliveryState::Inflight`] once the
/// queue runs out, so an unscripted message simply never resolves.
pub struct MockEndpoint {
    quote: Result<FeeQuote, String>,
    peer: Option<Address>,
    statuses: Mutex<VecDeque<Result<DeliveryState, String>>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            quote: Ok(FeeQuote {
                protocol_fee: U256::from(1_000u64),
                destination_execution_gas: U256::from(500u64),
            }),
            peer: Some(Address::repeat_byte(0xee)),
            statuses: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn with_fee(mut self, protocol_fee: u64, destination_execution_gas: u64) -> Self {
        self.quote = Ok(FeeQuote {
            protocol_fee: U256::from(protocol_fee),
            destination_execution_gas: U256::from(destination_execution_gas),
        });
        self
    }

    /// Every quote request fails with the given message.
    #[must_use]
    pub fn with_quote_failure(mut self, message: impl Into<String>) -> Self {
        self.quote = Err(message.into());
        self
    }

    /// No peer configured for any remote endpoint.
    #[must_use]
    pub fn without_peer(mut self) -> Self {
        self.peer = None;
        self
    }

    /// Queues one delivery-status answer.
    #[must_use]
    pub fn with_status(self, state: DeliveryState) -> Self {
        lock(&self.statuses).push_back(Ok(state));
        self
    }

    /// Queues one failing delivery-status poll.
    #[must_use]
    pub fn with_status_failure(self, message: impl Into<String>) -> Self {
        lock(&self.statuses).push_back(Err(message.into()));
        self
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingEndpoint for MockEndpoint {
    type Error = MockFailure;

    async fn quote_fee(
        &self,
        _route: &Route,
        _payload: &SendPayload,
    ) -> Result<FeeQuote, Self::Error> {
        self.quote.clone().map_err(MockFailure)
    }

    async fn peer(&self, _remote: EndpointId) -> Result<Option<Address>, Self::Error> {
        Ok(self.peer)
    }

    async fn message_status(&self, _guid: MessageGuid) -> Result<DeliveryState, Self::Error> {
        match lock(&self.statuses).pop_front() {
            Some(Ok(state)) => Ok(state),
            Some(Err(message)) => Err(MockFailure(message)),
            None => Ok(DeliveryState::Inflight),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::chain::EndpointId;

    fn tx() -> SendTransaction {
        SendTransaction {
            to: address!("0x1111111111111111111111111111111111111111"),
            destination: EndpointId(30101),
            payload: SendPayload {
                token_id: U256::from(7),
                recipient: address!("0x2222222222222222222222222222222222222222"),
            },
            value: U256::from(150),
            note: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn signer_scripts_run_in_order_then_default_to_success() {
        let signer = MockSigner::new(Address::repeat_byte(0xaa))
            .with_failure("request timed out")
            .with_success_without_guid();

        let first = signer.sign_and_send(tx()).await;
        assert_eq!(first.unwrap_err().0, "request timed out");

        let second = signer.sign_and_send(tx()).await.unwrap();
        assert!(second.message_guid.is_none());

        let third = signer.sign_and_send(tx()).await.unwrap();
        assert!(third.message_guid.is_some());

        assert_eq!(signer.sent_count(), 3);
        assert_eq!(signer.last_sent().unwrap().value, U256::from(150));
    }

    #[tokio::test]
    async fn fabricated_outcomes_are_distinct_per_submission() {
        let signer = MockSigner::new(Address::repeat_byte(0xaa));

        let a = signer.sign_and_send(tx()).await.unwrap();
        let b = signer.sign_and_send(tx()).await.unwrap();

        assert_ne!(a.tx_hash, b.tx_hash);
        assert_ne!(a.message_guid, b.message_guid);
    }

    #[tokio::test]
    async fn endpoint_status_queue_falls_back_to_inflight() {
        let endpoint = MockEndpoint::new().with_status(DeliveryState::Delivered);
        let guid = MessageGuid(B256::repeat_byte(0x01));

        assert_eq!(
            endpoint.message_status(guid).await.unwrap(),
            DeliveryState::Delivered
        );
        assert_eq!(
            endpoint.message_status(guid).await.unwrap(),
            DeliveryState::Inflight
        );
    }
}
