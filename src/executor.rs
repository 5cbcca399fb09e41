//! Single-item bridge execution.
//!
//! [`BridgeExecutor::execute`] drives one NFT transfer through the
//! required steps — validation, custody check, fresh fee quote, submission,
//! message-id extraction — and always returns a [`BridgeResult`]. Failures
//! never escape as errors; they are classified and attached to the result.
//!
//! Each call submits at most one state-changing transaction on the source
//! chain. The executor does not deduplicate — idempotency is the caller's
//! responsibility.

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::capability::{
    BridgeSigner, ChainQuery, MessageGuid, MessagingEndpoint, SendPayload, SendTransaction,
    TokenCustody,
};
use crate::chain::Route;
use crate::classify::{classify, ClassifiedError, ErrorKind};
use crate::gas::{self, GasBreakdown};
use crate::request::{TransferMode, TransferRequest};

/// Terminal outcome of executing one [`TransferRequest`].
///
/// Created once per execution; immutable after creation. `tx_hash` can be
/// present on failure when the transaction confirmed but a later step
/// (message-id extraction) failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResult {
    pub success: bool,
    pub tx_hash: Option<TxHash>,
    pub message_guid: Option<MessageGuid>,
    pub gas_breakdown: Option<GasBreakdown>,
    /// Peer contract that receives the message on the destination chain.
    pub destination_contract: Option<Address>,
    pub error: Option<ClassifiedError>,
}

impl BridgeResult {
    fn succeeded(
        tx_hash: TxHash,
        message_guid: MessageGuid,
        gas_breakdown: GasBreakdown,
        destination_contract: Address,
    ) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash),
            message_guid: Some(message_guid),
            gas_breakdown: Some(gas_breakdown),
            destination_contract: Some(destination_contract),
            error: None,
        }
    }

    fn failed(error: ClassifiedError) -> Self {
        Self {
            success: false,
            tx_hash: None,
            message_guid: None,
            gas_breakdown: None,
            destination_contract: None,
            error: Some(error),
        }
    }
}

/// Bounds the iterative retry loop in
/// [`BridgeExecutor::execute_with_retry`]. The effective retry count per
/// failure is the minimum of this cap and the classified error's own
/// `max_retries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Executes single NFT transfers over a fixed capability set.
pub struct BridgeExecutor<S, Q, E> {
    signer: S,
    query: Q,
    endpoint: E,
}

impl<S, Q, E> BridgeExecutor<S, Q, E>
where
    S: BridgeSigner,
    Q: ChainQuery,
    E: MessagingEndpoint,
{
    pub fn new(signer: S, query: Q, endpoint: E) -> Self {
        Self {
            signer,
            query,
            endpoint,
        }
    }

    /// Drives one transfer end to end. Never returns an error — every
    /// failure is classified and carried inside the result.
    pub async fn execute(
        &self,
        request: &TransferRequest,
        route: &Route,
        recipient: Address,
    ) -> BridgeResult {
        info!(
            token_id = %request.token_id,
            bridge_contract = %request.bridge_contract,
            source = %route.source.name,
            destination = %route.destination.name,
            "executing bridge transfer"
        );

        match self.try_execute(request, route, recipient).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    token_id = %request.token_id,
                    kind = %error.kind,
                    retryable = error.retryable,
                    "bridge transfer failed: {}",
                    error.message
                );
                BridgeResult::failed(error)
            }
        }
    }

    async fn try_execute(
        &self,
        request: &TransferRequest,
        route: &Route,
        recipient: Address,
    ) -> Result<BridgeResult, ClassifiedError> {
        validate_addresses(request, recipient)?;

        if let TransferMode::ViaAdapter { collection } = request.mode {
            self.check_custody(collection, request).await?;
        }

        let destination_contract = self.configured_peer(route).await?;

        // Quote immediately before submission to minimize staleness.
        let breakdown =
            gas::estimate(request, route, recipient, &self.query, &self.endpoint).await?;
        let value = breakdown
            .payable_fee()
            .map_err(|err| classify(&err))?;

        let outcome = self
            .signer
            .sign_and_send(SendTransaction {
                to: request.bridge_contract,
                destination: route.destination.endpoint_id,
                payload: SendPayload {
                    token_id: request.token_id,
                    recipient,
                },
                value,
                note: format!(
                    "bridge token {} from {} to {}",
                    request.token_id, route.source.name, route.destination.name
                ),
            })
            .await
            .map_err(|err| classify(&err))?;

        let Some(message_guid) = outcome.message_guid else {
            // The transaction confirmed but the protocol event is missing;
            // report the hash so the caller can reconcile manually.
            return Ok(BridgeResult {
                success: false,
                tx_hash: Some(outcome.tx_hash),
                message_guid: None,
                gas_breakdown: Some(breakdown),
                destination_contract: Some(destination_contract),
                error: Some(ClassifiedError::from_kind(
                    ErrorKind::Unknown,
                    "message GUID not found in submission receipt",
                )),
            });
        };

        info!(
            token_id = %request.token_id,
            tx_hash = %outcome.tx_hash,
            guid = %message_guid,
            "bridge transfer submitted"
        );

        Ok(BridgeResult::succeeded(
            outcome.tx_hash,
            message_guid,
            breakdown,
            destination_contract,
        ))
    }

    /// Adapter mode: the sender must hold the token and have approved the
    /// adapter. A missing approval is a distinct, user-actionable failure
    /// rather than a silent one.
    async fn check_custody(
        &self,
        collection: Address,
        request: &TransferRequest,
    ) -> Result<(), ClassifiedError> {
        let custody = self
            .query
            .token_custody(
                collection,
                request.token_id,
                self.signer.address(),
                request.bridge_contract,
            )
            .await
            .map_err(|err| classify(&err))?;

        match custody {
            TokenCustody::HeldAndApproved => Ok(()),
            TokenCustody::HeldNotApproved => Err(ClassifiedError::from_kind(
                ErrorKind::UserRejected,
                format!(
                    "adapter {} needs approval on collection {collection} for token {}",
                    request.bridge_contract, request.token_id
                ),
            )),
            TokenCustody::NotHeld => Err(ClassifiedError::from_kind(
                ErrorKind::Unknown,
                format!(
                    "sender does not hold token {} on collection {collection}",
                    request.token_id
                ),
            )),
        }
    }

    async fn configured_peer(&self, route: &Route) -> Result<Address, ClassifiedError> {
        let peer = self
            .endpoint
            .peer(route.destination.endpoint_id)
            .await
            .map_err(|err| classify(&err))?;

        peer.ok_or_else(|| {
            ClassifiedError::from_kind(
                ErrorKind::PeerNotConfigured,
                format!(
                    "no peer configured for destination endpoint {}",
                    route.destination.endpoint_id
                ),
            )
        })
    }

    /// Re-executes a failed transfer with an explicit iterative retry
    /// loop (bounded, cancellation-aware — no recursion).
    ///
    /// Retries only while the classified error says so, waiting the
    /// error's suggested backoff between attempts. Cancellation between
    /// attempts returns the last result without submitting again.
    pub async fn execute_with_retry(
        &self,
        request: &TransferRequest,
        route: &Route,
        recipient: Address,
        policy: RetryPolicy,
        cancel: &mut CancelToken,
    ) -> BridgeResult {
        let mut attempt = 0u32;

        loop {
            let result = self.execute(request, route, recipient).await;

            let Some(error) = &result.error else {
                return result;
            };

            let retries_allowed = policy.max_retries.min(error.max_retries);
            if !error.retryable || attempt >= retries_allowed || cancel.is_cancelled() {
                return result;
            }

            let delay = error.suggested_delay(attempt).unwrap_or_default();
            debug!(
                token_id = %request.token_id,
                attempt,
                kind = %error.kind,
                ?delay,
                "retrying bridge transfer after classified failure"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return result,
            }

            attempt += 1;
        }
    }
}

fn validate_addresses(
    request: &TransferRequest,
    recipient: Address,
) -> Result<(), ClassifiedError> {
    let invalid = |what: &str| {
        Err(ClassifiedError::from_kind(
            ErrorKind::Unknown,
            format!("{what} address must not be zero"),
        ))
    };

    if recipient == Address::ZERO {
        return invalid("recipient");
    }
    if request.nft_contract == Address::ZERO {
        return invalid("NFT contract");
    }
    if request.bridge_contract == Address::ZERO {
        return invalid("bridge contract");
    }
    if request.mode.adapter_collection() == Some(Address::ZERO) {
        return invalid("adapter collection");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, U256};

    use super::*;
    use crate::cancel::cancellation;
    use crate::mock::{MockChainQuery, MockEndpoint, MockSigner};
    use crate::test_utils::{test_route, RECIPIENT, SENDER};

    const COLLECTION: Address = address!("0x1111111111111111111111111111111111111111");
    const ADAPTER: Address = address!("0x2222222222222222222222222222222222222222");

    fn executor() -> BridgeExecutor<MockSigner, MockChainQuery, MockEndpoint> {
        BridgeExecutor::new(
            MockSigner::new(SENDER),
            MockChainQuery::new(),
            MockEndpoint::new(),
        )
    }

    fn direct_request() -> TransferRequest {
        TransferRequest::direct(U256::from(42), COLLECTION)
    }

    #[tokio::test]
    async fn successful_transfer_populates_all_fields() {
        let executor = executor();

        let result = executor
            .execute(&direct_request(), &test_route(), RECIPIENT)
            .await;

        assert!(result.success, "expected success, got {result:?}");
        assert!(result.tx_hash.is_some());
        assert!(result.message_guid.is_some());
        assert!(result.destination_contract.is_some());
        let breakdown = result.gas_breakdown.expect("breakdown present");
        assert!(breakdown.protocol_fee > U256::ZERO);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn zero_recipient_fails_fast_without_submitting() {
        let executor = executor();

        let result = executor
            .execute(&direct_request(), &test_route(), Address::ZERO)
            .await;

        assert!(!result.success);
        let error = result.error.expect("validation error");
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert!(!error.retryable);
        assert_eq!(executor.signer.sent_count(), 0, "nothing must be submitted");
    }

    #[tokio::test]
    async fn adapter_without_approval_surfaces_user_actionable_error() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER),
            MockChainQuery::new().with_custody(TokenCustody::HeldNotApproved),
            MockEndpoint::new(),
        );
        let request = TransferRequest::via_adapter(U256::from(42), COLLECTION, ADAPTER);

        let result = executor.execute(&request, &test_route(), RECIPIENT).await;

        let error = result.error.expect("approval error");
        assert_eq!(error.kind, ErrorKind::UserRejected);
        assert!(error.kind.requires_user_action());
        assert_eq!(executor.signer.sent_count(), 0);
    }

    #[tokio::test]
    async fn adapter_token_not_held_is_non_retryable() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER),
            MockChainQuery::new().with_custody(TokenCustody::NotHeld),
            MockEndpoint::new(),
        );
        let request = TransferRequest::via_adapter(U256::from(42), COLLECTION, ADAPTER);

        let result = executor.execute(&request, &test_route(), RECIPIENT).await;

        let error = result.error.expect("custody error");
        assert!(!error.retryable);
        assert!(error.message.contains("does not hold"));
    }

    #[tokio::test]
    async fn missing_peer_is_classified_before_quoting() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER),
            MockChainQuery::new(),
            MockEndpoint::new().without_peer(),
        );

        let result = executor
            .execute(&direct_request(), &test_route(), RECIPIENT)
            .await;

        let error = result.error.expect("peer error");
        assert_eq!(error.kind, ErrorKind::PeerNotConfigured);
        assert_eq!(executor.signer.sent_count(), 0);
    }

    #[tokio::test]
    async fn submission_failure_is_classified() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER).with_failure("insufficient funds for gas * price + value"),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );

        let result = executor
            .execute(&direct_request(), &test_route(), RECIPIENT)
            .await;

        let error = result.error.expect("submission error");
        assert_eq!(error.kind, ErrorKind::InsufficientFunds);
        assert!(!error.retryable);
    }

    #[tokio::test]
    async fn missing_guid_fails_but_reports_the_tx_hash() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER).with_success_without_guid(),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );

        let result = executor
            .execute(&direct_request(), &test_route(), RECIPIENT)
            .await;

        assert!(!result.success);
        assert!(result.tx_hash.is_some(), "hash must survive for reconciliation");
        assert!(result.message_guid.is_none());
        assert_eq!(result.error.unwrap().kind, ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn submission_value_is_the_quoted_payable_fee() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER),
            MockChainQuery::new(),
            MockEndpoint::new().with_fee(100, 50),
        );

        executor
            .execute(&direct_request(), &test_route(), RECIPIENT)
            .await;

        let sent = executor.signer.last_sent().expect("one submission");
        assert_eq!(sent.value, U256::from(150));
        assert_eq!(sent.to, COLLECTION);
        assert_eq!(sent.payload.recipient, RECIPIENT);
    }

    #[tokio::test]
    async fn failed_result_serializes_with_its_classification() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER).with_failure("user rejected the request"),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );

        let result = executor
            .execute(&direct_request(), &test_route(), RECIPIENT)
            .await;

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["kind"], "UserRejected");
        assert_eq!(json["error"]["retryable"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_retries_retryable_failures_then_succeeds() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER)
                .with_failure("request timed out")
                .with_failure("request timed out"),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );
        let mut cancel = CancelToken::never();

        let result = executor
            .execute_with_retry(
                &direct_request(),
                &test_route(),
                RECIPIENT,
                RetryPolicy::default(),
                &mut cancel,
            )
            .await;

        assert!(result.success, "third attempt should succeed: {result:?}");
        assert_eq!(executor.signer.sent_count(), 3);
    }

    #[tokio::test]
    async fn retry_loop_does_not_retry_non_retryable_failures() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER).with_failure("user rejected the request"),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );
        let mut cancel = CancelToken::never();

        let result = executor
            .execute_with_retry(
                &direct_request(),
                &test_route(),
                RECIPIENT,
                RetryPolicy::default(),
                &mut cancel,
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, ErrorKind::UserRejected);
        assert_eq!(executor.signer.sent_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_stops_at_the_policy_cap() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER).always_failing("request timed out"),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );
        let mut cancel = CancelToken::never();

        let result = executor
            .execute_with_retry(
                &direct_request(),
                &test_route(),
                RECIPIENT,
                RetryPolicy { max_retries: 2 },
                &mut cancel,
            )
            .await;

        assert!(!result.success);
        // Initial attempt + two retries.
        assert_eq!(executor.signer.sent_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_observes_cancellation_between_attempts() {
        let executor = BridgeExecutor::new(
            MockSigner::new(SENDER).always_failing("request timed out"),
            MockChainQuery::new(),
            MockEndpoint::new(),
        );
        let (handle, mut cancel) = cancellation();
        handle.cancel();

        let result = executor
            .execute_with_retry(
                &direct_request(),
                &test_route(),
                RECIPIENT,
                RetryPolicy::default(),
                &mut cancel,
            )
            .await;

        assert!(!result.success);
        // First attempt ran; cancellation prevented any retry.
        assert_eq!(executor.signer.sent_count(), 1);
    }
}
