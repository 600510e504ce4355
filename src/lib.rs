pub mod catalog;
pub mod common;
pub mod constants;
pub mod errors;
pub mod fees;
pub mod instruction;
pub mod quoting;
pub mod relay;
pub mod routing;
pub mod trading;

pub use crate::catalog::Catalog;
pub use crate::common::{BalanceCache, LedgerReader, Network, RentCache, RpcLedgerReader, SwapConfig};
pub use crate::errors::SwapError;
pub use crate::fees::{AccountPlan, FeeEstimate, FeeEstimator};
pub use crate::quoting::{QuoteEngine, SwapQuote};
pub use crate::relay::{FeeRelayClient, RetryPolicy, SubmissionState, UsageStatus};
pub use crate::routing::{Route, RouteFinder};
pub use crate::trading::{PreparedTransaction, TransactionBuilder};

use crate::common::SolanaRpcClient;
use crate::constants::fees::{MAX_REBUILD_CYCLES, RELAY_MAX_BACKOFF_MS};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::sync::Arc;
use std::time::Duration;

/// One wallet's swap engine: catalog, quoting, fee accounting, transaction
/// assembly and relay submission composed behind a flat value. Everything
/// expensive (RPC client, catalog, caches) is shared via `Arc`, so cloning
/// the pieces into several tasks is cheap.
pub struct SwapClient {
    pub payer: Arc<Keypair>,
    pub config: SwapConfig,
    pub catalog: Arc<Catalog>,
    pub balances: Arc<BalanceCache>,
    ledger: Arc<dyn LedgerReader>,
    engine: Arc<QuoteEngine>,
    estimator: FeeEstimator,
    builder: TransactionBuilder,
    relay: FeeRelayClient,
}

impl SwapClient {
    /// Client backed by the nonblocking RPC endpoint in `config`.
    pub fn new(payer: Arc<Keypair>, config: SwapConfig) -> Result<Self, SwapError> {
        let rpc = Arc::new(SolanaRpcClient::new_with_commitment(
            config.rpc_url.clone(),
            config.commitment,
        ));
        let ledger: Arc<dyn LedgerReader> = Arc::new(RpcLedgerReader::new(rpc));
        Self::with_ledger(payer, config, ledger)
    }

    /// Client over an arbitrary ledger implementation. Tests inject an
    /// in-memory ledger here.
    pub fn with_ledger(
        payer: Arc<Keypair>,
        config: SwapConfig,
        ledger: Arc<dyn LedgerReader>,
    ) -> Result<Self, SwapError> {
        let catalog = Arc::new(Catalog::new());
        catalog.load(config.network)?;

        let balances = Arc::new(BalanceCache::new());
        let rent = Arc::new(RentCache::new());
        let engine = Arc::new(QuoteEngine::new(
            catalog.clone(),
            balances.clone(),
            ledger.clone(),
            config.slippage_bps,
        ));
        let estimator =
            FeeEstimator::new(catalog.clone(), ledger.clone(), rent.clone(), engine.clone());
        let builder = TransactionBuilder::new(catalog.clone(), ledger.clone(), rent);
        let relay = FeeRelayClient::new(
            config.relay_url.clone(),
            RetryPolicy {
                max_attempts: config.relay_max_attempts,
                base_delay: config.relay_base_backoff,
                max_delay: Duration::from_millis(RELAY_MAX_BACKOFF_MS),
            },
        );

        Ok(Self { payer, config, catalog, balances, ledger, engine, estimator, builder, relay })
    }

    pub fn quote_engine(&self) -> &Arc<QuoteEngine> {
        &self.engine
    }

    pub fn fee_relay(&self) -> &FeeRelayClient {
        &self.relay
    }

    /// Candidate routes between two mints, direct first. Empty when the pair
    /// is unconnected.
    pub fn find_routes(&self, from: &Pubkey, to: &Pubkey) -> Result<Vec<Route>, SwapError> {
        self.engine.route_finder().find_routes(from, to)
    }

    /// Best-output quote across all candidate routes.
    pub async fn quote_best(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        input_amount: u64,
    ) -> Result<SwapQuote, SwapError> {
        self.engine.quote_best(from, to, input_amount).await
    }

    /// Fee and rent flows for executing `quote` from this wallet.
    pub async fn estimate(
        &self,
        quote: &SwapQuote,
        relay_pays: bool,
    ) -> Result<FeeEstimate, SwapError> {
        let owner = self.payer.pubkey();
        let plan = self.builder.plan_accounts(quote, None, &owner, relay_pays).await?;
        self.estimator.estimate(&quote.route, &plan).await
    }

    /// Swap sized so its worst-case output reimburses `estimate`'s net fee
    /// in the native asset, paid from `pay_asset`.
    pub async fn compensation_quote(
        &self,
        estimate: &FeeEstimate,
        pay_asset: &Pubkey,
    ) -> Result<SwapQuote, SwapError> {
        self.estimator.compensation_quote(estimate, pay_asset).await
    }

    /// Assemble the signable transaction for `quote`.
    pub async fn build(
        &self,
        quote: &SwapQuote,
        fee_estimate: &FeeEstimate,
        relay_fee_payer: Option<&Pubkey>,
    ) -> Result<PreparedTransaction, SwapError> {
        let owner = self.payer.pubkey();
        self.builder.build(quote, fee_estimate, &owner, relay_fee_payer).await
    }

    /// This wallet's free-fee quota as the relay sees it.
    pub async fn usage_status(&self) -> Result<UsageStatus, SwapError> {
        self.relay.usage_status(&self.payer.pubkey()).await
    }

    /// Sign and submit through the relay.
    pub async fn submit(
        &self,
        prepared: &PreparedTransaction,
        usage: &mut UsageStatus,
    ) -> Result<Signature, SwapError> {
        self.relay.submit(prepared, usage, &self.payer).await
    }

    /// End-to-end swap: quote, estimate, build, submit, with up to
    /// [`MAX_REBUILD_CYCLES`] rebuilds when the blockhash ages out.
    ///
    /// With a `relay_fee_payer` the relay fronts the fee while free quota
    /// lasts. Once quota is exhausted, a `pay_fee_in` mint keeps the relay
    /// path alive by reimbursing it in that asset; otherwise the swap falls
    /// back to paying the fee itself.
    pub async fn swap(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        input_amount: u64,
        relay_fee_payer: Option<Pubkey>,
        pay_fee_in: Option<Pubkey>,
    ) -> Result<Signature, SwapError> {
        let mut cycles = 0u32;
        loop {
            // Requote each cycle: reserves and the blockhash both move.
            let quote = self.engine.quote_best(from, to, input_amount).await?;
            match self
                .execute_once(&quote, relay_fee_payer.as_ref(), pay_fee_in.as_ref())
                .await
            {
                Err(SwapError::BlockhashExpired) if cycles < MAX_REBUILD_CYCLES => {
                    cycles += 1;
                    log::info!("transaction expired, rebuild cycle {cycles}/{MAX_REBUILD_CYCLES}");
                    self.balances.reload();
                },
                terminal => return terminal,
            }
        }
    }

    async fn execute_once(
        &self,
        quote: &SwapQuote,
        relay_fee_payer: Option<&Pubkey>,
        pay_fee_in: Option<&Pubkey>,
    ) -> Result<Signature, SwapError> {
        let owner = self.payer.pubkey();

        if let Some(relay_payer) = relay_fee_payer {
            let mut usage = self.relay.usage_status(&owner).await?;
            let plan = self.builder.plan_accounts(quote, None, &owner, true).await?;
            let estimate = self.estimator.estimate(&quote.route, &plan).await?;

            if usage.is_free_transaction_fee_available(estimate.net_fee(), true) {
                let prepared =
                    self.builder.build(quote, &estimate, &owner, Some(relay_payer)).await?;
                return self.relay.submit(&prepared, &mut usage, &self.payer).await;
            }

            if let Some(pay_asset) = pay_fee_in {
                let compensation =
                    self.estimator.compensation_quote(&estimate, pay_asset).await?;
                // Reprice with the compensation route's account lifecycle.
                // Its intermediates are created and closed in the same
                // transaction, so the net fee the sizing targeted holds.
                let plan = self
                    .builder
                    .plan_accounts(quote, Some(&compensation), &owner, true)
                    .await?;
                let mut estimate = self.estimator.estimate(&quote.route, &plan).await?;
                estimate.compensation = Some(compensation);
                let prepared =
                    self.builder.build(quote, &estimate, &owner, Some(relay_payer)).await?;
                return self.relay.submit(&prepared, &mut usage, &self.payer).await;
            }

            log::info!("free-fee quota exhausted for {owner}, paying the fee directly");
        }

        self.execute_self_pay(quote).await
    }

    /// No relay involved: the wallet is its own fee payer and the signed
    /// transaction goes straight to the ledger.
    async fn execute_self_pay(&self, quote: &SwapQuote) -> Result<Signature, SwapError> {
        let owner = self.payer.pubkey();
        let plan = self.builder.plan_accounts(quote, None, &owner, false).await?;
        let estimate = self.estimator.estimate(&quote.route, &plan).await?;
        let prepared = self.builder.build(quote, &estimate, &owner, None).await?;

        let mut transaction = prepared.to_transaction();
        transaction.sign(&[self.payer.as_ref()], prepared.blockhash);
        self.ledger.send_transaction(&transaction).await.map_err(|e| {
            let message = e.to_string();
            if message.to_ascii_lowercase().contains("blockhash") {
                SwapError::BlockhashExpired
            } else {
                SwapError::Unknown(message)
            }
        })
    }
}
