//! Fee, curve and retry parameters.

/// Fixed network fee per transaction signature, in lamports.
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// Data size of an SPL token account; drives the rent-exempt minimum.
pub const TOKEN_ACCOUNT_SIZE: usize = 165;

/// Routes are direct or one-intermediate only.
pub const MAX_ROUTE_HOPS: usize = 2;

/// Newton iteration bound for the amplified (stable) curve.
pub const STABLE_CURVE_MAX_ITERATIONS: usize = 32;

/// Convergence tolerance for the stable curve, in minor units.
pub const STABLE_CURVE_TOLERANCE: u128 = 1;

/// A single fill may not take more than `reserve_out / MAX_TRADE_RESERVE_DIVISOR`.
pub const MAX_TRADE_RESERVE_DIVISOR: u64 = 3;

/// Default slippage tolerance, in basis points (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u64 = 50;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Relay submission attempts for transient transport failures.
pub const RELAY_MAX_ATTEMPTS: u32 = 3;

pub const RELAY_BASE_BACKOFF_MS: u64 = 250;

pub const RELAY_MAX_BACKOFF_MS: u64 = 4_000;

/// How many times an expired transaction is rebuilt with a fresh blockhash
/// before the swap fails.
pub const MAX_REBUILD_CYCLES: u32 = 3;
