//! Compensation-swap sizing and assembly: the relay keeps fronting the fee
//! once quota is gone, reimbursed in a non-native asset.

mod common;

use common::{
    MockLedger, RENT, RelayStubResponses, init_logs, pool_between, seed_mainnet_liquidity,
    seed_reserves, spawn_relay_stub,
};
use sol_swap_relay::catalog::{
    Catalog, CurveKind, ExchangeProgramVersion, NetworkRecord, PoolRecord, ProgramIdsRecord,
    TokenRecord,
};
use sol_swap_relay::constants::fees::DEFAULT_SLIPPAGE_BPS;
use sol_swap_relay::constants::programs::{
    ATA_PROGRAM, EXCHANGE_PROGRAM, EXCHANGE_PROGRAM_V2, TOKEN_PROGRAM,
};
use sol_swap_relay::constants::tokens::{USDC_MINT, USDT_MINT, WSOL_MINT};
use sol_swap_relay::instruction::spl;
use sol_swap_relay::{
    BalanceCache, FeeEstimator, LedgerReader, Network, QuoteEngine, RentCache, SwapClient,
    SwapConfig, SwapError, TransactionBuilder,
};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use std::sync::Arc;

fn unique() -> String {
    Pubkey::new_unique().to_string()
}

fn pool_record(name: &str, mint_a: &Pubkey, mint_b: &Pubkey) -> PoolRecord {
    PoolRecord {
        name: name.to_string(),
        id: unique(),
        authority: unique(),
        reserve_a: unique(),
        reserve_b: unique(),
        mint_a: mint_a.to_string(),
        mint_b: mint_b.to_string(),
        pool_token_mint: unique(),
        fee_account: unique(),
        curve: CurveKind::ConstantProduct,
        amp: None,
        fee_numerator: 30,
        fee_denominator: 10_000,
        program_version: ExchangeProgramVersion::V2,
    }
}

fn token_record(symbol: &str, mint: &Pubkey, is_wrapped_native: bool) -> TokenRecord {
    TokenRecord {
        mint: mint.to_string(),
        symbol: symbol.to_string(),
        decimals: if is_wrapped_native { 9 } else { 6 },
        is_wrapped_native,
    }
}

/// A catalog where the fee-payment asset reaches the native asset only
/// through one intermediate hop, while the traded pair is unrelated.
struct TwoHopFixture {
    catalog: Arc<Catalog>,
    fee_asset: Pubkey,
    intermediate: Pubkey,
    traded_in: Pubkey,
    traded_out: Pubkey,
}

fn two_hop_fixture() -> TwoHopFixture {
    let fee_asset = Pubkey::new_unique();
    let intermediate = Pubkey::new_unique();
    let traded_in = Pubkey::new_unique();
    let traded_out = Pubkey::new_unique();

    let record = NetworkRecord {
        tokens: vec![
            token_record("SOL", &WSOL_MINT, true),
            token_record("FEE", &fee_asset, false),
            token_record("MID", &intermediate, false),
            token_record("AAA", &traded_in, false),
            token_record("BBB", &traded_out, false),
        ],
        pools: vec![
            pool_record("AAA/BBB", &traded_in, &traded_out),
            pool_record("FEE/MID", &fee_asset, &intermediate),
            pool_record("MID/SOL", &intermediate, &WSOL_MINT),
        ],
        programs: ProgramIdsRecord {
            exchange_program: EXCHANGE_PROGRAM.to_string(),
            exchange_program_v2: EXCHANGE_PROGRAM_V2.to_string(),
            asset_program: TOKEN_PROGRAM.to_string(),
        },
        routes: [("AAA/BBB".to_string(), vec![vec!["AAA/BBB".to_string()]])]
            .into_iter()
            .collect(),
    };
    let catalog = Catalog::new();
    catalog.load_records(Network::Devnet, record).unwrap();
    TwoHopFixture {
        catalog: Arc::new(catalog),
        fee_asset,
        intermediate,
        traded_in,
        traded_out,
    }
}

fn engine_over(
    catalog: Arc<Catalog>,
    ledger: Arc<MockLedger>,
) -> (Arc<QuoteEngine>, FeeEstimator, TransactionBuilder) {
    let ledger: Arc<dyn LedgerReader> = ledger;
    let balances = Arc::new(BalanceCache::new());
    let rent = Arc::new(RentCache::new());
    let engine = Arc::new(QuoteEngine::new(
        catalog.clone(),
        balances,
        ledger.clone(),
        DEFAULT_SLIPPAGE_BPS,
    ));
    let estimator =
        FeeEstimator::new(catalog.clone(), ledger.clone(), rent.clone(), engine.clone());
    let builder = TransactionBuilder::new(catalog, ledger, rent);
    (engine, estimator, builder)
}

fn is_ata_create_for(ix: &Instruction, ata: &Pubkey) -> bool {
    ix.program_id == ATA_PROGRAM && ix.accounts[1].pubkey == *ata
}

#[tokio::test]
async fn test_two_hop_compensation_creates_and_closes_its_intermediate_account() {
    let fixture = two_hop_fixture();
    let ledger = Arc::new(MockLedger::new(RENT));
    seed_reserves(
        &ledger,
        &pool_between(&fixture.catalog, &fixture.traded_in, &fixture.traded_out),
        (&fixture.traded_in, 1_000_000_000_000),
        (&fixture.traded_out, 1_000_000_000_000),
    );
    seed_reserves(
        &ledger,
        &pool_between(&fixture.catalog, &fixture.fee_asset, &fixture.intermediate),
        (&fixture.fee_asset, 1_000_000_000_000),
        (&fixture.intermediate, 1_000_000_000_000),
    );
    seed_reserves(
        &ledger,
        &pool_between(&fixture.catalog, &fixture.intermediate, &WSOL_MINT),
        (&fixture.intermediate, 1_000_000_000_000),
        (&WSOL_MINT, 10_000_000_000_000),
    );
    let (engine, estimator, builder) = engine_over(fixture.catalog.clone(), ledger);
    let payer = Keypair::new().pubkey();
    let relay = Pubkey::new_unique();

    let quote = engine
        .quote_best(&fixture.traded_in, &fixture.traded_out, 1_000_000_000)
        .await
        .unwrap();
    let plan = builder.plan_accounts(&quote, None, &payer, true).await.unwrap();
    let estimate = estimator.estimate(&quote.route, &plan).await.unwrap();

    let compensation =
        estimator.compensation_quote(&estimate, &fixture.fee_asset).await.unwrap();
    assert_eq!(compensation.route.hop_count(), 2);
    assert_eq!(compensation.route.intermediate_mints(), &[fixture.intermediate]);
    assert!(compensation.minimum_output_amount >= estimate.net_fee());

    // repricing with the compensation route adds its intermediate account,
    // which closes in the same transaction, so the net fee holds
    let plan_with =
        builder.plan_accounts(&quote, Some(&compensation), &payer, true).await.unwrap();
    let mut estimate_with = estimator.estimate(&quote.route, &plan_with).await.unwrap();
    assert_eq!(estimate_with.rent_deposits, estimate.rent_deposits + RENT);
    assert_eq!(estimate_with.rent_reclaimed, estimate.rent_reclaimed + RENT);
    assert_eq!(estimate_with.net_fee(), estimate.net_fee());
    estimate_with.compensation = Some(compensation.clone());

    let prepared =
        builder.build(&quote, &estimate_with, &payer, Some(&relay)).await.unwrap();
    assert!(prepared.compensated);
    assert_eq!(prepared.fee_payer, relay);

    let ix = &prepared.instructions;
    assert_eq!(ix.len(), 6);
    // destination and compensation-intermediate accounts come first
    let destination_ata = spl::associated_token_address(&payer, &fixture.traded_out);
    let mid_ata = spl::associated_token_address(&payer, &fixture.intermediate);
    assert!(is_ata_create_for(&ix[0], &destination_ata));
    assert!(is_ata_create_for(&ix[1], &mid_ata));
    // both compensation hops precede the traded swap; the first writes into
    // the account created above, the last into the relay's native account
    assert_eq!(ix[2].accounts[6].pubkey, mid_ata);
    assert_eq!(u64::from_le_bytes(ix[2].data[9..17].try_into().unwrap()), 0);
    assert_eq!(
        ix[3].accounts[6].pubkey,
        spl::associated_token_address(&relay, &WSOL_MINT)
    );
    assert_eq!(
        u64::from_le_bytes(ix[3].data[9..17].try_into().unwrap()),
        compensation.minimum_output_amount
    );
    assert_eq!(u64::from_le_bytes(ix[4].data[1..9].try_into().unwrap()), quote.input_amount);
    // the intermediate account closes, returning its rent to the payer
    assert_eq!(ix[5].program_id, TOKEN_PROGRAM);
    assert_eq!(ix[5].data, vec![9]);
    assert_eq!(ix[5].accounts[0].pubkey, mid_ata);
}

#[tokio::test]
async fn test_direct_compensation_swap_pays_the_relay_in_native() {
    let ledger = Arc::new(MockLedger::new(RENT));
    let config = SwapConfig::new(
        "http://127.0.0.1:8899".to_string(),
        "http://127.0.0.1:8080".to_string(),
        Network::MainnetBeta,
    );
    let client = SwapClient::with_ledger(Arc::new(Keypair::new()), config, ledger.clone()).unwrap();
    seed_mainnet_liquidity(&client.catalog, &ledger);
    let relay = Pubkey::new_unique();

    let quote = client.quote_best(&USDC_MINT, &USDT_MINT, 1_000_000_000).await.unwrap();
    let mut estimate = client.estimate(&quote, true).await.unwrap();
    let compensation = client.compensation_quote(&estimate, &USDC_MINT).await.unwrap();
    assert!(compensation.route.is_direct());
    assert!(compensation.minimum_output_amount >= estimate.net_fee());
    estimate.compensation = Some(compensation.clone());

    let prepared = client.build(&quote, &estimate, Some(&relay)).await.unwrap();
    assert!(prepared.compensated);

    // destination account create, compensation swap, then the traded swap
    let ix = &prepared.instructions;
    assert_eq!(ix.len(), 3);
    assert_eq!(ix[0].program_id, ATA_PROGRAM);
    assert_eq!(
        u64::from_le_bytes(ix[1].data[1..9].try_into().unwrap()),
        compensation.input_amount
    );
    assert_eq!(
        ix[1].accounts[6].pubkey,
        spl::associated_token_address(&relay, &WSOL_MINT)
    );
    assert_eq!(u64::from_le_bytes(ix[2].data[1..9].try_into().unwrap()), quote.input_amount);
}

#[tokio::test]
async fn test_swap_pays_fee_in_asset_once_quota_is_exhausted() {
    init_logs();
    let signature = Signature::from([11u8; 64]);
    let stub = spawn_relay_stub(RelayStubResponses {
        usage_json:
            r#"{"maxUsage":100,"currentUsage":100,"maxAmount":1000000,"amountUsed":1000000}"#
                .to_string(),
        post: Some(("200 OK".to_string(), format!(r#"{{"signature":"{signature}"}}"#))),
    })
    .await;

    let ledger = Arc::new(MockLedger::new(RENT));
    let config = SwapConfig::new(
        "http://127.0.0.1:8899".to_string(),
        stub.url.clone(),
        Network::MainnetBeta,
    );
    let client = SwapClient::with_ledger(Arc::new(Keypair::new()), config, ledger.clone()).unwrap();
    seed_mainnet_liquidity(&client.catalog, &ledger);

    let relay_payer = Pubkey::new_unique();
    let confirmed = client
        .swap(&USDC_MINT, &USDT_MINT, 1_000_000_000, Some(relay_payer), Some(USDC_MINT))
        .await
        .unwrap();
    assert_eq!(confirmed, signature);

    // the transaction went through the relay, not the ledger
    assert!(ledger.sent.lock().is_empty());
    let requests = stub.requests.lock();
    assert!(requests.iter().any(|r| r.starts_with("POST /relay_transaction")));
}

#[tokio::test]
async fn test_compensation_rejects_native_and_unroutable_pay_assets() {
    let ledger = Arc::new(MockLedger::new(RENT));
    let config = SwapConfig::new(
        "http://127.0.0.1:8899".to_string(),
        "http://127.0.0.1:8080".to_string(),
        Network::MainnetBeta,
    );
    let client = SwapClient::with_ledger(Arc::new(Keypair::new()), config, ledger.clone()).unwrap();
    seed_mainnet_liquidity(&client.catalog, &ledger);

    let quote = client.quote_best(&USDC_MINT, &USDT_MINT, 1_000_000_000).await.unwrap();
    let estimate = client.estimate(&quote, true).await.unwrap();

    // the native asset needs no compensation swap
    assert!(client.compensation_quote(&estimate, &WSOL_MINT).await.is_err());

    // an asset with no path to native cannot reimburse the relay
    let unroutable = Pubkey::new_unique();
    let err = client.compensation_quote(&estimate, &unroutable).await.unwrap_err();
    assert!(matches!(err, SwapError::IntermediaryTokenAddressNotFound(_)));
}
