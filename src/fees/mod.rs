//! Network fee and rent accounting, plus sizing of the compensation swap
//! used when the user reimburses the relay in a non-native asset.

use crate::catalog::Catalog;
use crate::common::ledger::LedgerReader;
use crate::common::rent_cache::RentCache;
use crate::constants::fees::LAMPORTS_PER_SIGNATURE;
use crate::errors::SwapError;
use crate::quoting::{QuoteEngine, SwapQuote};
use crate::routing::Route;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

/// Accounts a transaction will create and close, and who signs it. Shared
/// between the fee estimator and the transaction builder so both see the
/// same account lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPlan {
    /// Token accounts this transaction creates (temporary wrapped-native
    /// account, missing destination/intermediate accounts).
    pub created_accounts: u64,
    /// Accounts closed within the same transaction, reclaiming their rent.
    pub closed_accounts: u64,
    /// Required signatures: the owner, plus the fee payer when distinct.
    pub signatures: u64,
}

impl AccountPlan {
    pub fn new(created_accounts: u64, closed_accounts: u64, relay_pays: bool) -> Self {
        Self {
            created_accounts,
            closed_accounts,
            signatures: 1 + u64::from(relay_pays),
        }
    }
}

/// Expected cost of one prepared transaction, in lamports.
#[derive(Debug, Clone)]
pub struct FeeEstimate {
    /// Fixed per-signature fee times the number of required signatures.
    pub network_fee: u64,
    /// Rent-exempt deposits owed for accounts created by the transaction.
    pub rent_deposits: u64,
    /// Rent reclaimed from accounts closed within the same transaction.
    pub rent_reclaimed: u64,
    /// Secondary swap reimbursing the relay in a non-native asset.
    pub compensation: Option<SwapQuote>,
}

impl FeeEstimate {
    /// What the fee payer is out of pocket once closes refund their rent.
    pub fn net_fee(&self) -> u64 {
        (self.network_fee + self.rent_deposits).saturating_sub(self.rent_reclaimed)
    }
}

pub struct FeeEstimator {
    catalog: Arc<Catalog>,
    ledger: Arc<dyn LedgerReader>,
    rent: Arc<RentCache>,
    engine: Arc<QuoteEngine>,
}

impl FeeEstimator {
    pub fn new(
        catalog: Arc<Catalog>,
        ledger: Arc<dyn LedgerReader>,
        rent: Arc<RentCache>,
        engine: Arc<QuoteEngine>,
    ) -> Self {
        Self { catalog, ledger, rent, engine }
    }

    /// Expected network fee and rent flows for executing `route` under
    /// `plan`.
    pub async fn estimate(&self, route: &Route, plan: &AccountPlan) -> Result<FeeEstimate, SwapError> {
        if route.hop_count() == 0 {
            return Err(SwapError::SwapInfoMissing("empty route".into()));
        }
        let rent_per_account = self
            .rent
            .token_account_rent(self.ledger.as_ref())
            .await
            .map_err(|e| SwapError::Unknown(format!("rent query: {e}")))?;

        let estimate = FeeEstimate {
            network_fee: LAMPORTS_PER_SIGNATURE * plan.signatures,
            rent_deposits: rent_per_account * plan.created_accounts,
            rent_reclaimed: rent_per_account * plan.closed_accounts,
            compensation: None,
        };
        log::debug!(
            "fee estimate for {} hop(s): network {} + rent {} - reclaimed {}",
            route.hop_count(),
            estimate.network_fee,
            estimate.rent_deposits,
            estimate.rent_reclaimed
        );
        Ok(estimate)
    }

    /// Size the swap that reimburses the native-asset fee in `pay_asset`.
    /// The quote's worst-case (minimum) output covers the full net fee, so
    /// the relay is whole even at the slippage bound.
    pub async fn compensation_quote(
        &self,
        estimate: &FeeEstimate,
        pay_asset: &Pubkey,
    ) -> Result<SwapQuote, SwapError> {
        let native = self.catalog.native_mint()?;
        if *pay_asset == native {
            return Err(SwapError::Unknown(
                "compensation swap is only meaningful for a non-native pay asset".into(),
            ));
        }
        let fee = estimate.net_fee();
        if fee == 0 {
            return Err(SwapError::Unknown("zero fee needs no compensation".into()));
        }
        if self.engine.route_finder().find_routes(pay_asset, &native)?.is_empty() {
            return Err(SwapError::IntermediaryTokenAddressNotFound(format!(
                "no route from {pay_asset} to the native asset"
            )));
        }

        // Exact-out sizing over an exact-in engine: start from a 1:1 guess
        // and rescale linearly until the worst-case output covers the fee.
        let mut input = fee;
        for _ in 0..8 {
            let quote = self.engine.quote_best(pay_asset, &native, input).await?;
            if quote.output_amount == 0 {
                input = input.saturating_mul(2).max(1);
                continue;
            }
            if quote.minimum_output_amount >= fee {
                return Ok(quote);
            }
            let rescaled = (input as u128 * fee as u128) / quote.output_amount as u128;
            // 1% headroom so the next pass clears the slippage floor
            input = ((rescaled + rescaled / 100) as u64).max(input + 1);
        }
        Err(SwapError::Unknown("compensation swap sizing did not converge".into()))
    }
}
