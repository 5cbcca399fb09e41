//! Gas and fee estimation for bridging operations.
//!
//! One bridging submission has three cost components: gas spent on the
//! source chain, the messaging protocol's fee, and the execution gas
//! prepaid for the destination chain. [`GasBreakdown`] keeps them separate
//! so callers can render a line-itemized view, and [`GasBreakdown::aggregate`]
//! folds per-item breakdowns into a batch total.
//!
//! Quotes are volatile — protocol fees depend on current verifier and
//! executor pricing and can go stale within seconds — so [`estimate`]
//! re-quotes on every call and nothing here is cached.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{ChainQuery, MessagingEndpoint, SendPayload};
use crate::chain::Route;
use crate::classify::{classify, ClassifiedError, ErrorKind};
use crate::request::TransferRequest;

/// Gas limit assumed for one bridging submission on the source chain.
/// A protocol send moving a single token stays well under this bound.
const SEND_GAS_LIMIT: u64 = 400_000;

/// Currency the breakdown amounts are denominated in — the source chain's
/// native unit. Breakdowns only combine within the same unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyUnit(pub String);

impl CurrencyUnit {
    pub fn wei() -> Self {
        Self("wei".to_string())
    }
}

impl Default for CurrencyUnit {
    fn default() -> Self {
        Self::wei()
    }
}

/// Arithmetic failures when combining breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GasError {
    #[error("cannot combine breakdowns in {left:?} with {right:?}")]
    UnitMismatch {
        left: CurrencyUnit,
        right: CurrencyUnit,
    },
    #[error("gas amount overflowed during aggregation")]
    Overflow,
}

/// Line-itemized cost of one bridging operation.
///
/// All fields are non-negative by construction. Addable: breakdowns in the
/// same unit sum field-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasBreakdown {
    /// Estimated gas cost of the submission transaction itself.
    pub source_chain_gas: U256,
    /// Fee charged by the messaging protocol (verifier + executor pricing).
    pub protocol_fee: U256,
    /// Execution gas prepaid for delivery on the destination chain.
    pub destination_execution_gas: U256,
    pub unit: CurrencyUnit,
}

impl GasBreakdown {
    pub fn zero(unit: CurrencyUnit) -> Self {
        Self {
            source_chain_gas: U256::ZERO,
            protocol_fee: U256::ZERO,
            destination_execution_gas: U256::ZERO,
            unit,
        }
    }

    /// The value that must accompany the submission transaction: protocol
    /// fee plus prepaid destination execution gas.
    pub fn payable_fee(&self) -> Result<U256, GasError> {
        self.protocol_fee
            .checked_add(self.destination_execution_gas)
            .ok_or(GasError::Overflow)
    }

    /// Field-wise sum of two breakdowns in the same unit.
    pub fn combine(&self, other: &Self) -> Result<Self, GasError> {
        if self.unit != other.unit {
            return Err(GasError::UnitMismatch {
                left: self.unit.clone(),
                right: other.unit.clone(),
            });
        }

        let add = |a: U256, b: U256| a.checked_add(b).ok_or(GasError::Overflow);

        Ok(Self {
            source_chain_gas: add(self.source_chain_gas, other.source_chain_gas)?,
            protocol_fee: add(self.protocol_fee, other.protocol_fee)?,
            destination_execution_gas: add(
                self.destination_execution_gas,
                other.destination_execution_gas,
            )?,
            unit: self.unit.clone(),
        })
    }

    /// Field-wise sum of a sequence of breakdowns. The empty sequence
    /// yields the zero breakdown in the default unit. Commutative and
    /// associative.
    pub fn aggregate<'a, I>(breakdowns: I) -> Result<Self, GasError>
    where
        I: IntoIterator<Item = &'a GasBreakdown>,
    {
        let mut iter = breakdowns.into_iter();

        let Some(first) = iter.next() else {
            return Ok(Self::zero(CurrencyUnit::default()));
        };

        iter.try_fold(first.clone(), |total, next| total.combine(next))
    }
}

/// Computes a fresh cost breakdown for one transfer over the given route.
///
/// Obtains the protocol fee quote and the current source-chain gas price;
/// no caching, since quotes go stale within seconds. Any capability
/// failure is routed through the classifier — a quote timeout surfaces as
/// a retryable [`ErrorKind::NetworkTimeout`], an unreachable quote surface
/// as whatever the classifier makes of it.
pub async fn estimate<Q, E>(
    request: &TransferRequest,
    route: &Route,
    recipient: Address,
    query: &Q,
    endpoint: &E,
) -> Result<GasBreakdown, ClassifiedError>
where
    Q: ChainQuery,
    E: MessagingEndpoint,
{
    let payload = SendPayload {
        token_id: request.token_id,
        recipient,
    };

    let quote = endpoint
        .quote_fee(route, &payload)
        .await
        .map_err(|err| classify(&err))?;

    let gas_price = query
        .gas_price(route.source.chain_id)
        .await
        .map_err(|err| classify(&err))?;

    let source_chain_gas = U256::from(gas_price)
        .checked_mul(U256::from(SEND_GAS_LIMIT))
        .ok_or_else(|| {
            ClassifiedError::from_kind(ErrorKind::Unknown, "source gas cost overflowed")
        })?;

    debug!(
        token_id = %request.token_id,
        source = %route.source.name,
        destination = %route.destination.name,
        %source_chain_gas,
        protocol_fee = %quote.protocol_fee,
        destination_execution_gas = %quote.destination_execution_gas,
        "computed fresh gas breakdown"
    );

    Ok(GasBreakdown {
        source_chain_gas,
        protocol_fee: quote.protocol_fee,
        destination_execution_gas: quote.destination_execution_gas,
        unit: CurrencyUnit::wei(),
    })
}
