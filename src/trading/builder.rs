//! Assembly of the signable swap transaction.
//!
//! Instruction order is fixed: temporary wrapped-native account, missing
//! token accounts, compensation swap, the route's hop swaps, closes. An
//! account is closed only if this transaction created it.

use crate::catalog::{Catalog, ProgramIds};
use crate::common::ledger::LedgerReader;
use crate::common::rent_cache::RentCache;
use crate::constants::fees::TOKEN_ACCOUNT_SIZE;
use crate::errors::SwapError;
use crate::fees::{AccountPlan, FeeEstimate};
use crate::instruction::{spl, token_swap};
use crate::quoting::SwapQuote;
use solana_sdk::{
    hash::Hash, instruction::Instruction, pubkey::Pubkey, transaction::Transaction,
};
use std::sync::Arc;

/// Seed strings for the temporary wrapped-native accounts, derived off the
/// payer so no extra keypair has to sign.
const TEMP_SOURCE_SEED: &str = "swap-relay-wsol-in";
const TEMP_DESTINATION_SEED: &str = "swap-relay-wsol-out";

/// A fully assembled, not-yet-signed transaction. Consumed once by the relay
/// client; rebuilt from scratch if the blockhash expires.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub instructions: Vec<Instruction>,
    pub fee_payer: Pubkey,
    /// Owner key that must sign besides the fee payer.
    pub owner: Pubkey,
    /// Fee the fee payer fronts, for quota checks and later reconciliation
    /// against what the relay reports.
    pub expected_fee: u64,
    /// Whether the transaction reimburses the relay in-band via a
    /// compensation swap, in which case it spends no free quota.
    pub compensated: bool,
    pub blockhash: Hash,
}

impl PreparedTransaction {
    /// Unsigned legacy transaction ready for partial signing.
    pub fn to_transaction(&self) -> Transaction {
        Transaction::new_with_payer(&self.instructions, Some(&self.fee_payer))
    }
}

pub struct TransactionBuilder {
    catalog: Arc<Catalog>,
    ledger: Arc<dyn LedgerReader>,
    rent: Arc<RentCache>,
}

impl TransactionBuilder {
    pub fn new(catalog: Arc<Catalog>, ledger: Arc<dyn LedgerReader>, rent: Arc<RentCache>) -> Self {
        Self { catalog, ledger, rent }
    }

    /// Survey which accounts `build` would create and close for this quote
    /// (and the compensation swap, when one rides along), so the fee
    /// estimator prices the same account lifecycle the builder executes.
    pub async fn plan_accounts(
        &self,
        quote: &SwapQuote,
        compensation: Option<&SwapQuote>,
        payer: &Pubkey,
        relay_pays: bool,
    ) -> Result<AccountPlan, SwapError> {
        let native = self.catalog.native_mint()?;
        let mut created = 0u64;
        let mut closed = 0u64;
        // accounts already counted, so a mint shared between the main and
        // compensation routes is created (and closed) once
        let mut planned: Vec<Pubkey> = Vec::new();

        if quote.route.source_mint() == native {
            created += 1;
            closed += 1;
        }
        if quote.route.destination_mint() == native {
            created += 1;
            closed += 1;
        } else {
            let ata = spl::associated_token_address(payer, &quote.route.destination_mint());
            if !self.ata_exists(payer, &quote.route.destination_mint()).await? {
                created += 1;
                planned.push(ata);
            }
        }
        let intermediates = quote
            .route
            .intermediate_mints()
            .iter()
            .chain(compensation.into_iter().flat_map(|c| c.route.intermediate_mints()));
        for mint in intermediates {
            let ata = spl::associated_token_address(payer, mint);
            if !planned.contains(&ata) && !self.ata_exists(payer, mint).await? {
                created += 1;
                closed += 1;
                planned.push(ata);
            }
        }
        Ok(AccountPlan::new(created, closed, relay_pays))
    }

    /// Assemble the ordered instruction set for `quote` (and the optional
    /// compensation swap carried by `fee_estimate`).
    pub async fn build(
        &self,
        quote: &SwapQuote,
        fee_estimate: &FeeEstimate,
        payer: &Pubkey,
        relay_fee_payer: Option<&Pubkey>,
    ) -> Result<PreparedTransaction, SwapError> {
        if quote.hop_inputs.len() != quote.route.hop_count() {
            return Err(SwapError::SwapInfoMissing("quote lacks per-hop amounts".into()));
        }
        let native = self.catalog.native_mint()?;
        let programs = self.catalog.program_ids()?;
        let rent = self
            .rent
            .token_account_rent(self.ledger.as_ref())
            .await
            .map_err(|e| SwapError::Unknown(format!("rent query: {e}")))?;

        let mut instructions = Vec::new();
        let mut closes: Vec<Instruction> = Vec::new();

        // (1) temporary wrapped-native source, funded with rent + input
        let user_source = if quote.route.source_mint() == native {
            let temp = derive_temp_account(payer, TEMP_SOURCE_SEED)?;
            instructions.push(solana_system_interface::instruction::create_account_with_seed(
                payer,
                &temp,
                payer,
                TEMP_SOURCE_SEED,
                rent + quote.input_amount,
                TOKEN_ACCOUNT_SIZE as u64,
                &crate::constants::programs::TOKEN_PROGRAM,
            ));
            instructions.push(spl::initialize_account(&temp, &native, payer));
            closes.push(spl::close_account(&temp, payer, payer));
            temp
        } else {
            spl::associated_token_address(payer, &quote.route.source_mint())
        };

        // (2) destination and intermediate accounts, for the main route and
        // the compensation route alike. An account shared between the two is
        // created once; intermediates the transaction creates get closed.
        let mut created_atas: Vec<Pubkey> = Vec::new();
        let user_destination = if quote.route.destination_mint() == native {
            // swap into a throwaway wrapped account, unwrap by closing it
            let temp = derive_temp_account(payer, TEMP_DESTINATION_SEED)?;
            instructions.push(solana_system_interface::instruction::create_account_with_seed(
                payer,
                &temp,
                payer,
                TEMP_DESTINATION_SEED,
                rent,
                TOKEN_ACCOUNT_SIZE as u64,
                &crate::constants::programs::TOKEN_PROGRAM,
            ));
            instructions.push(spl::initialize_account(&temp, &native, payer));
            closes.push(spl::close_account(&temp, payer, payer));
            temp
        } else {
            let ata = spl::associated_token_address(payer, &quote.route.destination_mint());
            if !self.ata_exists(payer, &quote.route.destination_mint()).await? {
                instructions.push(spl::create_associated_token_account_idempotent(
                    payer,
                    payer,
                    &quote.route.destination_mint(),
                ));
                created_atas.push(ata);
            }
            ata
        };

        let intermediates = quote.route.intermediate_mints().iter().chain(
            fee_estimate
                .compensation
                .iter()
                .flat_map(|c| c.route.intermediate_mints()),
        );
        for mint in intermediates {
            let ata = spl::associated_token_address(payer, mint);
            if !created_atas.contains(&ata) && !self.ata_exists(payer, mint).await? {
                instructions.push(spl::create_associated_token_account_idempotent(
                    payer, payer, mint,
                ));
                created_atas.push(ata);
                closes.push(spl::close_account(&ata, payer, payer));
            }
        }

        // (3) compensation swap reimbursing the relay in native units; the
        // relay maintains its own native account, so only payer-side
        // accounts are surveyed and created above
        if let Some(compensation) = &fee_estimate.compensation {
            let relay = relay_fee_payer.ok_or_else(|| {
                SwapError::SwapInfoMissing(
                    "compensation swap present but no relay fee payer".into(),
                )
            })?;
            let comp_source =
                spl::associated_token_address(payer, &compensation.route.source_mint());
            let comp_destination = spl::associated_token_address(relay, &native);
            self.push_route_swaps(
                &mut instructions,
                compensation,
                comp_source,
                comp_destination,
                payer,
                &programs,
            )?;
        }

        // (4) the hop swaps themselves
        self.push_route_swaps(
            &mut instructions,
            quote,
            user_source,
            user_destination,
            payer,
            &programs,
        )?;

        // (5) close what this transaction created
        instructions.extend(closes);

        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|e| SwapError::Unknown(format!("blockhash query: {e}")))?;

        Ok(PreparedTransaction {
            instructions,
            fee_payer: relay_fee_payer.copied().unwrap_or(*payer),
            owner: *payer,
            expected_fee: fee_estimate.net_fee(),
            compensated: fee_estimate.compensation.is_some(),
            blockhash,
        })
    }

    /// One swap instruction per hop, wiring each hop's output account into
    /// the next hop's input. Intermediate legs run through the owner's
    /// associated accounts; only the final hop enforces the minimum output.
    fn push_route_swaps(
        &self,
        out: &mut Vec<Instruction>,
        quote: &SwapQuote,
        source: Pubkey,
        destination: Pubkey,
        authority: &Pubkey,
        programs: &ProgramIds,
    ) -> Result<(), SwapError> {
        let last = quote.route.hop_count() - 1;
        for (hop, pool_id) in quote.route.pools.iter().enumerate() {
            let pool = self.catalog.pool(pool_id)?;
            let mint_in = quote.route.mints[hop];
            let mint_out = quote.route.mints[hop + 1];
            let pool_source = pool.reserve_for_mint(&mint_in).ok_or_else(|| {
                SwapError::SwapInfoMissing(format!("pool {} lacks {mint_in}", pool.name))
            })?;
            let pool_destination = pool.reserve_for_mint(&mint_out).ok_or_else(|| {
                SwapError::SwapInfoMissing(format!("pool {} lacks {mint_out}", pool.name))
            })?;
            let user_in =
                if hop == 0 { source } else { spl::associated_token_address(authority, &mint_in) };
            let user_out = if hop == last {
                destination
            } else {
                spl::associated_token_address(authority, &mint_out)
            };
            let minimum_out = if hop == last { quote.minimum_output_amount } else { 0 };
            out.push(token_swap::swap(
                &programs.for_version(pool.program_version),
                &pool,
                authority,
                &user_in,
                &pool_source,
                &pool_destination,
                &user_out,
                quote.hop_inputs[hop],
                minimum_out,
            ));
        }
        Ok(())
    }

    async fn ata_exists(&self, owner: &Pubkey, mint: &Pubkey) -> Result<bool, SwapError> {
        let ata = spl::associated_token_address(owner, mint);
        self.ledger
            .account_exists(&ata)
            .await
            .map_err(|e| SwapError::Unknown(format!("account lookup {ata}: {e}")))
    }
}

fn derive_temp_account(payer: &Pubkey, seed: &str) -> Result<Pubkey, SwapError> {
    Pubkey::create_with_seed(payer, seed, &crate::constants::programs::TOKEN_PROGRAM)
        .map_err(|e| SwapError::Unknown(format!("seed derivation: {e}")))
}
