//! Error taxonomy shared by the routing, quoting, building and relay layers.
//!
//! Every amount-bearing code path returns a [`SwapError`] with a stable,
//! machine-readable kind. Computations that cannot converge or that produce a
//! non-finite/negative result abort with [`SwapError::Unknown`] instead of
//! defaulting to zero or a partial value.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    /// Catalog entry (network, token, pool or program id) is not loaded.
    #[error("not found: {0}")]
    NotFound(String),

    /// Pool record is inconsistent (identical reserves, zero fee denominator, ...).
    #[error("invalid pool {0}")]
    InvalidPool(String),

    /// Requested trade size exceeds what the pool reserves can safely absorb.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    /// Input amount is above the per-trade ceiling for the route.
    #[error("amount too high: {0}")]
    AmountTooHigh(String),

    /// A route hop references a pool whose swap data could not be resolved.
    #[error("swap info missing: {0}")]
    SwapInfoMissing(String),

    /// Signer refused or is not allowed to authorize the transaction.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No intermediary token account/route exists for the fee-compensation swap.
    #[error("intermediary token address not found: {0}")]
    IntermediaryTokenAddressNotFound(String),

    /// The relay protocol produced an unexpected number of transactions.
    #[error("invalid number of transactions: expected {expected}, got {actual}")]
    InvalidNumberOfTransactions { expected: usize, actual: usize },

    /// Relay refused the submission (usage quota exceeded). Never retried.
    #[error("relay rejected: {0}")]
    RelayRejected(String),

    /// Relay endpoint could not be reached. Retried with bounded backoff.
    #[error("relay unreachable: {0}")]
    RelayUnreachable(String),

    /// The recent blockhash aged out before the transaction landed.
    #[error("blockhash expired")]
    BlockhashExpired,

    /// Non-converging or non-finite financial computation, or an unclassified
    /// failure from a collaborator.
    #[error("unknown: {0}")]
    Unknown(String),
}

impl SwapError {
    /// Whether the relay submission loop may retry after this error.
    /// Quota rejections and signer errors are terminal by design.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::RelayUnreachable(_))
    }
}

impl From<anyhow::Error> for SwapError {
    fn from(err: anyhow::Error) -> Self {
        SwapError::Unknown(err.to_string())
    }
}
