//! Bundled network record sets.
//!
//! These are the default registries used by tests and local development.
//! Production deployments are expected to fetch the published registry
//! document for the network and feed it through [`Catalog::load_records`];
//! the bundled tables exercise exactly the same path.
//!
//! Pool and reserve addresses are derived deterministically from the pool
//! name under the exchange program, matching the registry naming scheme.
//!
//! [`Catalog::load_records`]: super::Catalog::load_records

use super::{CurveKind, ExchangeProgramVersion, NetworkRecord, PoolRecord, ProgramIdsRecord, TokenRecord};
use crate::common::types::Network;
use crate::constants::programs::{EXCHANGE_PROGRAM, EXCHANGE_PROGRAM_V2, TOKEN_PROGRAM};
use crate::constants::tokens::{RAY_MINT, USDC_MINT, USDT_MINT, WSOL_MINT};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

pub fn records_for(network: Network) -> NetworkRecord {
    match network {
        Network::MainnetBeta => mainnet(),
        // Devnet and testnet registries carry the same reduced pool set.
        Network::Devnet | Network::Testnet => devnet(),
    }
}

fn token(mint: Pubkey, symbol: &str, decimals: u8, is_wrapped_native: bool) -> TokenRecord {
    TokenRecord {
        mint: mint.to_string(),
        symbol: symbol.to_string(),
        decimals,
        is_wrapped_native,
    }
}

fn pool(
    name: &str,
    mint_a: Pubkey,
    mint_b: Pubkey,
    curve: CurveKind,
    amp: Option<u64>,
    fee_numerator: u64,
    fee_denominator: u64,
    program_version: ExchangeProgramVersion,
) -> PoolRecord {
    let program = match program_version {
        ExchangeProgramVersion::V1 => EXCHANGE_PROGRAM,
        ExchangeProgramVersion::V2 => EXCHANGE_PROGRAM_V2,
    };
    let id = Pubkey::find_program_address(&[name.as_bytes()], &program).0;
    let authority = Pubkey::find_program_address(&[id.as_ref()], &program).0;
    let derive = |tag: &[u8]| Pubkey::find_program_address(&[id.as_ref(), tag], &program).0;
    PoolRecord {
        name: name.to_string(),
        id: id.to_string(),
        authority: authority.to_string(),
        reserve_a: derive(b"reserve_a").to_string(),
        reserve_b: derive(b"reserve_b").to_string(),
        mint_a: mint_a.to_string(),
        mint_b: mint_b.to_string(),
        pool_token_mint: derive(b"pool_mint").to_string(),
        fee_account: derive(b"fees").to_string(),
        curve,
        amp,
        fee_numerator,
        fee_denominator,
        program_version,
    }
}

fn programs() -> ProgramIdsRecord {
    ProgramIdsRecord {
        exchange_program: EXCHANGE_PROGRAM.to_string(),
        exchange_program_v2: EXCHANGE_PROGRAM_V2.to_string(),
        asset_program: TOKEN_PROGRAM.to_string(),
    }
}

fn mainnet() -> NetworkRecord {
    use CurveKind::*;
    use ExchangeProgramVersion::*;
    let pools = vec![
        pool("SOL/USDC", WSOL_MINT, USDC_MINT, ConstantProduct, None, 30, 10_000, V2),
        pool("SOL/USDT", WSOL_MINT, USDT_MINT, ConstantProduct, None, 30, 10_000, V2),
        pool("USDC/USDT", USDC_MINT, USDT_MINT, Stable, Some(100), 6, 10_000, V2),
        pool("RAY/USDC", RAY_MINT, USDC_MINT, ConstantProduct, None, 30, 10_000, V1),
        pool("RAY/SOL", RAY_MINT, WSOL_MINT, ConstantProduct, None, 30, 10_000, V1),
    ];

    let mut routes: HashMap<String, Vec<Vec<String>>> = HashMap::new();
    let chains = |list: &[&[&str]]| -> Vec<Vec<String>> {
        list.iter().map(|c| c.iter().map(|s| s.to_string()).collect()).collect()
    };
    routes.insert("SOL/USDC".into(), chains(&[&["SOL/USDC"], &["RAY/SOL", "RAY/USDC"]]));
    routes.insert("SOL/USDT".into(), chains(&[&["SOL/USDT"], &["SOL/USDC", "USDC/USDT"]]));
    routes.insert("USDC/USDT".into(), chains(&[&["USDC/USDT"]]));
    routes.insert("RAY/USDC".into(), chains(&[&["RAY/USDC"], &["RAY/SOL", "SOL/USDC"]]));
    routes.insert("RAY/SOL".into(), chains(&[&["RAY/SOL"]]));
    // RAY/USDT has no curated entry; the route finder discovers it through
    // the pool graph.

    NetworkRecord {
        tokens: vec![
            token(WSOL_MINT, "SOL", 9, true),
            token(USDC_MINT, "USDC", 6, false),
            token(USDT_MINT, "USDT", 6, false),
            token(RAY_MINT, "RAY", 6, false),
        ],
        pools,
        programs: programs(),
        routes,
    }
}

fn devnet() -> NetworkRecord {
    let pools = vec![pool(
        "SOL/USDC",
        WSOL_MINT,
        USDC_MINT,
        CurveKind::ConstantProduct,
        None,
        30,
        10_000,
        ExchangeProgramVersion::V2,
    )];
    let mut routes = HashMap::new();
    routes.insert("SOL/USDC".into(), vec![vec!["SOL/USDC".to_string()]]);
    NetworkRecord {
        tokens: vec![token(WSOL_MINT, "SOL", 9, true), token(USDC_MINT, "USDC", 6, false)],
        pools,
        programs: programs(),
        routes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_routes_reference_known_pools() {
        let record = mainnet();
        let names: Vec<&str> = record.pools.iter().map(|p| p.name.as_str()).collect();
        for chains in record.routes.values() {
            for chain in chains {
                assert!(!chain.is_empty());
                assert!(chain.len() <= 2);
                for name in chain {
                    assert!(names.contains(&name.as_str()), "unknown pool {name}");
                }
            }
        }
    }

    #[test]
    fn test_pool_addresses_are_distinct() {
        let record = mainnet();
        let mut ids: Vec<&str> = record.pools.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), record.pools.len());
    }
}
