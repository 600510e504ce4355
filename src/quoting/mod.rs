//! Quote simulation and best-route selection.

pub mod curve;

use crate::catalog::{Catalog, CurveKind, Pool};
use crate::common::balance_cache::BalanceCache;
use crate::common::ledger::LedgerReader;
use crate::constants::fees::{BPS_DENOMINATOR, MAX_TRADE_RESERVE_DIVISOR};
use crate::errors::SwapError;
use crate::routing::{Route, RouteFinder};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

/// Result of simulating one route for one input amount. Immutable; discard
/// after use or once the underlying blockhash has aged out.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub route: Route,
    pub input_amount: u64,
    pub output_amount: u64,
    /// `floor(output * (1 - slippage))`, the least the caller accepts.
    pub minimum_output_amount: u64,
    /// Fractional deviation of the execution price from the pre-trade mid
    /// price. Reporting only.
    pub price_impact: f64,
    /// Input amount fed into each hop; `hop_inputs[0] == input_amount`.
    pub hop_inputs: Vec<u64>,
}

pub struct QuoteEngine {
    catalog: Arc<Catalog>,
    cache: Arc<BalanceCache>,
    ledger: Arc<dyn LedgerReader>,
    route_finder: RouteFinder,
    slippage_bps: u64,
}

impl QuoteEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        cache: Arc<BalanceCache>,
        ledger: Arc<dyn LedgerReader>,
        slippage_bps: u64,
    ) -> Self {
        let route_finder = RouteFinder::new(catalog.clone());
        Self { catalog, cache, ledger, route_finder, slippage_bps }
    }

    pub fn route_finder(&self) -> &RouteFinder {
        &self.route_finder
    }

    /// Last-observed reserve balance, fetching through the ledger on a cache
    /// miss and memoizing the result.
    async fn reserve_balance(&self, account: &Pubkey) -> Result<u64, SwapError> {
        if let Some(balance) = self.cache.get(account) {
            return Ok(balance);
        }
        let balance = self
            .ledger
            .token_balance(account)
            .await
            .map_err(|e| SwapError::Unknown(format!("reserve {account}: {e}")))?;
        self.cache.set(*account, balance);
        Ok(balance)
    }

    fn hop_output(pool: &Pool, input: u64, reserve_in: u64, reserve_out: u64) -> Result<u64, SwapError> {
        let out = match pool.curve {
            CurveKind::ConstantProduct => curve::constant_product_out(
                input,
                reserve_in,
                reserve_out,
                pool.fee_numerator,
                pool.fee_denominator,
            )?,
            CurveKind::Stable => curve::stable_out(
                input,
                reserve_in,
                reserve_out,
                pool.amp.ok_or_else(|| {
                    SwapError::InvalidPool(format!("{}: missing amplification", pool.name))
                })?,
                pool.fee_numerator,
                pool.fee_denominator,
            )?,
        };
        // A fill that drains more than a fraction of the output reserve is
        // outside the curve's trustworthy region.
        if out > reserve_out / MAX_TRADE_RESERVE_DIVISOR {
            return Err(SwapError::AmountTooHigh(format!(
                "output {out} exceeds safe share of reserve {reserve_out} in pool {}",
                pool.name
            )));
        }
        Ok(out)
    }

    /// Apply each hop's pool invariant in sequence, feeding hop *i*'s output
    /// into hop *i+1*.
    pub async fn simulate(&self, route: &Route, input_amount: u64) -> Result<SwapQuote, SwapError> {
        let mut amount = input_amount;
        let mut hop_inputs = Vec::with_capacity(route.hop_count());
        let mut route_mid_price = 1.0f64;

        for (hop, pool_id) in route.pools.iter().enumerate() {
            let pool = self.catalog.pool(pool_id)?;
            let mint_in = route.mints[hop];
            let mint_out = route.mints[hop + 1];
            let reserve_in_account = pool.reserve_for_mint(&mint_in).ok_or_else(|| {
                SwapError::SwapInfoMissing(format!("pool {} lacks {mint_in}", pool.name))
            })?;
            let reserve_out_account = pool.reserve_for_mint(&mint_out).ok_or_else(|| {
                SwapError::SwapInfoMissing(format!("pool {} lacks {mint_out}", pool.name))
            })?;
            let reserve_in = self.reserve_balance(&reserve_in_account).await?;
            let reserve_out = self.reserve_balance(&reserve_out_account).await?;

            route_mid_price *= curve::mid_price(reserve_in, reserve_out, pool.amp)?;

            hop_inputs.push(amount);
            amount = Self::hop_output(&pool, amount, reserve_in, reserve_out)?;
        }

        let price_impact = if input_amount == 0 || route_mid_price <= 0.0 {
            0.0
        } else {
            let execution_price = amount as f64 / input_amount as f64;
            let impact = (execution_price - route_mid_price).abs() / route_mid_price;
            if !impact.is_finite() {
                return Err(SwapError::Unknown("non-finite price impact".into()));
            }
            impact
        };

        Ok(SwapQuote {
            route: route.clone(),
            input_amount,
            output_amount: amount,
            minimum_output_amount: minimum_output(amount, self.slippage_bps),
            price_impact,
            hop_inputs,
        })
    }

    /// Quote every candidate route and keep the one with the highest net
    /// output. `extra_hop_cost` is the fixed network cost of each hop beyond
    /// the first, expressed in output minor units; ties break toward fewer
    /// hops.
    pub async fn quote_best_with_hop_cost(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        input_amount: u64,
        extra_hop_cost: u64,
    ) -> Result<SwapQuote, SwapError> {
        let routes = self.route_finder.find_routes(from, to)?;
        if routes.is_empty() {
            return Err(SwapError::NotFound(format!("no route from {from} to {to}")));
        }

        // Candidates are independent reads; fan out, fan in.
        let simulations =
            futures::future::join_all(routes.iter().map(|r| self.simulate(r, input_amount))).await;

        let mut best: Option<SwapQuote> = None;
        let mut last_rejection: Option<SwapError> = None;
        for result in simulations {
            match result {
                Ok(quote) => {
                    let better = match &best {
                        None => true,
                        Some(current) => {
                            let net = |q: &SwapQuote| {
                                q.output_amount.saturating_sub(
                                    extra_hop_cost
                                        .saturating_mul((q.route.hop_count() as u64).saturating_sub(1)),
                                )
                            };
                            let (candidate, incumbent) = (net(&quote), net(current));
                            candidate > incumbent
                                || (candidate == incumbent
                                    && quote.route.hop_count() < current.route.hop_count())
                        },
                    };
                    if better {
                        best = Some(quote);
                    }
                },
                Err(e) => {
                    log::debug!("route candidate rejected: {e}");
                    last_rejection = Some(e);
                },
            }
        }

        best.ok_or_else(|| {
            last_rejection
                .unwrap_or_else(|| SwapError::NotFound(format!("no viable route {from} -> {to}")))
        })
    }

    /// [`Self::quote_best_with_hop_cost`] with no per-hop charge. Under the
    /// flat per-signature fee model an extra hop adds no signatures, and the
    /// intermediate accounts it needs are created and closed within the same
    /// transaction, so their rent nets out; callers that price hops some
    /// other way use [`Self::quote_best_with_hop_cost`] directly.
    pub async fn quote_best(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        input_amount: u64,
    ) -> Result<SwapQuote, SwapError> {
        self.quote_best_with_hop_cost(from, to, input_amount, 0).await
    }
}

/// `floor(output * (1 - slippage))` in basis points.
pub fn minimum_output(output: u64, slippage_bps: u64) -> u64 {
    let slippage_bps = slippage_bps.min(BPS_DENOMINATOR);
    ((output as u128 * (BPS_DENOMINATOR - slippage_bps) as u128) / BPS_DENOMINATOR as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_output_formula() {
        assert_eq!(minimum_output(10_000, 0), 10_000); // slippage 0 => minimum == output
        assert_eq!(minimum_output(10_000, BPS_DENOMINATOR), 0); // slippage 1 => minimum == 0
        assert_eq!(minimum_output(10_000, 50), 9_950);
        // floor, not round
        assert_eq!(minimum_output(9_999, 1), 9_999 * (BPS_DENOMINATOR - 1) / BPS_DENOMINATOR);
    }

    #[test]
    fn test_minimum_output_clamps_excess_slippage() {
        assert_eq!(minimum_output(10_000, BPS_DENOMINATOR + 500), 0);
    }
}
