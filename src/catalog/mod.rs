//! Pool & token catalog.
//!
//! One [`Catalog`] value per network, owned by the caller, loaded once with
//! [`Catalog::load`] (idempotent) and read by every other component. Records
//! arrive as serde documents so a catalog service can feed the same path as
//! the built-in tables.

pub mod networks;

use crate::errors::SwapError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;

use crate::common::types::Network;

/// Price-curve family implemented by a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveKind {
    ConstantProduct,
    Stable,
}

/// Which deployed exchange program a pool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeProgramVersion {
    V1,
    #[default]
    V2,
}

/// Immutable token description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub mint: Pubkey,
    pub symbol: String,
    pub decimals: u8,
    pub is_wrapped_native: bool,
}

/// Static pool description. Reserve *amounts* are not stored here; they live
/// in the balance cache keyed by the reserve account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub id: Pubkey,
    pub name: String,
    pub authority: Pubkey,
    pub reserve_a: Pubkey,
    pub reserve_b: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub pool_token_mint: Pubkey,
    pub fee_account: Pubkey,
    pub curve: CurveKind,
    pub amp: Option<u64>,
    pub fee_numerator: u64,
    pub fee_denominator: u64,
    pub program_version: ExchangeProgramVersion,
}

impl Pool {
    pub fn contains_mint(&self, mint: &Pubkey) -> bool {
        self.mint_a == *mint || self.mint_b == *mint
    }

    /// The opposite side of the pair, if `mint` is one of the two sides.
    pub fn other_mint(&self, mint: &Pubkey) -> Option<Pubkey> {
        if self.mint_a == *mint {
            Some(self.mint_b)
        } else if self.mint_b == *mint {
            Some(self.mint_a)
        } else {
            None
        }
    }

    /// Reserve account holding `mint`.
    pub fn reserve_for_mint(&self, mint: &Pubkey) -> Option<Pubkey> {
        if self.mint_a == *mint {
            Some(self.reserve_a)
        } else if self.mint_b == *mint {
            Some(self.reserve_b)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<(), SwapError> {
        if self.mint_a == self.mint_b {
            return Err(SwapError::InvalidPool(format!(
                "{}: both reserves resolve to the same mint",
                self.name
            )));
        }
        if self.fee_denominator == 0 || self.fee_numerator >= self.fee_denominator {
            return Err(SwapError::InvalidPool(format!("{}: malformed fee fraction", self.name)));
        }
        if self.curve == CurveKind::Stable && self.amp.is_none() {
            return Err(SwapError::InvalidPool(format!(
                "{}: stable curve without amplification coefficient",
                self.name
            )));
        }
        Ok(())
    }
}

/// Program ids deployed on the loaded network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub exchange_program: Pubkey,
    pub exchange_program_v2: Pubkey,
    pub asset_program: Pubkey,
}

impl ProgramIds {
    pub fn for_version(&self, version: ExchangeProgramVersion) -> Pubkey {
        match version {
            ExchangeProgramVersion::V1 => self.exchange_program,
            ExchangeProgramVersion::V2 => self.exchange_program_v2,
        }
    }
}

// -------- wire records --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub is_wrapped_native: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRecord {
    pub name: String,
    pub id: String,
    pub authority: String,
    pub reserve_a: String,
    pub reserve_b: String,
    pub mint_a: String,
    pub mint_b: String,
    pub pool_token_mint: String,
    pub fee_account: String,
    pub curve: CurveKind,
    #[serde(default)]
    pub amp: Option<u64>,
    pub fee_numerator: u64,
    pub fee_denominator: u64,
    #[serde(default)]
    pub program_version: ExchangeProgramVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramIdsRecord {
    pub exchange_program: String,
    pub exchange_program_v2: String,
    pub asset_program: String,
}

/// Everything the catalog needs to describe one network. The route table maps
/// `"SYM_A/SYM_B"` to chains of pool names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub tokens: Vec<TokenRecord>,
    pub pools: Vec<PoolRecord>,
    pub programs: ProgramIdsRecord,
    #[serde(default)]
    pub routes: HashMap<String, Vec<Vec<String>>>,
}

// -------- catalog --------

struct CatalogState {
    network: Network,
    tokens: HashMap<Pubkey, Token>,
    symbols: HashMap<String, Pubkey>,
    pools: HashMap<Pubkey, Pool>,
    programs: ProgramIds,
    /// Normalized mint pair -> chains of pool ids.
    route_table: HashMap<(Pubkey, Pubkey), Vec<Vec<Pubkey>>>,
}

/// Normalize a mint pair so `(a, b)` and `(b, a)` share one table slot.
/// A pool chain serves both directions.
fn pair_key(a: &Pubkey, b: &Pubkey) -> (Pubkey, Pubkey) {
    if a.to_bytes() <= b.to_bytes() { (*a, *b) } else { (*b, *a) }
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, SwapError> {
    Pubkey::from_str(value)
        .map_err(|e| SwapError::Unknown(format!("catalog record {field} '{value}': {e}")))
}

#[derive(Default)]
pub struct Catalog {
    state: RwLock<Option<CatalogState>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { state: RwLock::new(None) }
    }

    /// Load the built-in record set for `network`. Idempotent: reloading the
    /// same network is a no-op, switching networks replaces the state.
    pub fn load(&self, network: Network) -> Result<(), SwapError> {
        if self.state.read().as_ref().map(|s| s.network) == Some(network) {
            return Ok(());
        }
        self.load_records(network, networks::records_for(network))
    }

    /// Load an explicit record set, e.g. fetched from a catalog service.
    pub fn load_records(&self, network: Network, record: NetworkRecord) -> Result<(), SwapError> {
        let mut tokens = HashMap::new();
        let mut symbols = HashMap::new();
        for t in &record.tokens {
            let mint = parse_pubkey("token.mint", &t.mint)?;
            symbols.insert(t.symbol.clone(), mint);
            tokens.insert(
                mint,
                Token {
                    mint,
                    symbol: t.symbol.clone(),
                    decimals: t.decimals,
                    is_wrapped_native: t.is_wrapped_native,
                },
            );
        }

        let mut pools = HashMap::new();
        let mut pool_names: HashMap<String, Pubkey> = HashMap::new();
        for p in &record.pools {
            let pool = Pool {
                id: parse_pubkey("pool.id", &p.id)?,
                name: p.name.clone(),
                authority: parse_pubkey("pool.authority", &p.authority)?,
                reserve_a: parse_pubkey("pool.reserve_a", &p.reserve_a)?,
                reserve_b: parse_pubkey("pool.reserve_b", &p.reserve_b)?,
                mint_a: parse_pubkey("pool.mint_a", &p.mint_a)?,
                mint_b: parse_pubkey("pool.mint_b", &p.mint_b)?,
                pool_token_mint: parse_pubkey("pool.pool_token_mint", &p.pool_token_mint)?,
                fee_account: parse_pubkey("pool.fee_account", &p.fee_account)?,
                curve: p.curve,
                amp: p.amp,
                fee_numerator: p.fee_numerator,
                fee_denominator: p.fee_denominator,
                program_version: p.program_version,
            };
            pool.validate()?;
            pool_names.insert(pool.name.clone(), pool.id);
            pools.insert(pool.id, pool);
        }

        let programs = ProgramIds {
            exchange_program: parse_pubkey("programs.exchange", &record.programs.exchange_program)?,
            exchange_program_v2: parse_pubkey(
                "programs.exchange_v2",
                &record.programs.exchange_program_v2,
            )?,
            asset_program: parse_pubkey("programs.asset", &record.programs.asset_program)?,
        };

        let mut route_table: HashMap<(Pubkey, Pubkey), Vec<Vec<Pubkey>>> = HashMap::new();
        for (pair, chains) in &record.routes {
            let (sym_a, sym_b) = pair
                .split_once('/')
                .ok_or_else(|| SwapError::Unknown(format!("malformed route pair '{pair}'")))?;
            let mint_a = *symbols
                .get(sym_a)
                .ok_or_else(|| SwapError::NotFound(format!("route token '{sym_a}'")))?;
            let mint_b = *symbols
                .get(sym_b)
                .ok_or_else(|| SwapError::NotFound(format!("route token '{sym_b}'")))?;
            let mut resolved = Vec::with_capacity(chains.len());
            for chain in chains {
                let mut ids = Vec::with_capacity(chain.len());
                for name in chain {
                    let id = *pool_names
                        .get(name)
                        .ok_or_else(|| SwapError::NotFound(format!("route pool '{name}'")))?;
                    ids.push(id);
                }
                resolved.push(ids);
            }
            route_table.insert(pair_key(&mint_a, &mint_b), resolved);
        }

        log::info!(
            "catalog loaded for {network}: {} tokens, {} pools, {} route pairs",
            tokens.len(),
            pools.len(),
            route_table.len()
        );

        *self.state.write() =
            Some(CatalogState { network, tokens, symbols, pools, programs, route_table });
        Ok(())
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&CatalogState) -> Result<T, SwapError>,
    ) -> Result<T, SwapError> {
        let guard = self.state.read();
        let state =
            guard.as_ref().ok_or_else(|| SwapError::NotFound("catalog not loaded".into()))?;
        f(state)
    }

    pub fn network(&self) -> Option<Network> {
        self.state.read().as_ref().map(|s| s.network)
    }

    /// Immutable token snapshot.
    pub fn tokens(&self) -> Result<Vec<Token>, SwapError> {
        self.with_state(|s| Ok(s.tokens.values().cloned().collect()))
    }

    /// Immutable pool snapshot.
    pub fn pools(&self) -> Result<Vec<Pool>, SwapError> {
        self.with_state(|s| Ok(s.pools.values().cloned().collect()))
    }

    pub fn token(&self, mint: &Pubkey) -> Result<Token, SwapError> {
        self.with_state(|s| {
            s.tokens
                .get(mint)
                .cloned()
                .ok_or_else(|| SwapError::NotFound(format!("token {mint}")))
        })
    }

    pub fn mint_for_symbol(&self, symbol: &str) -> Result<Pubkey, SwapError> {
        self.with_state(|s| {
            s.symbols
                .get(symbol)
                .copied()
                .ok_or_else(|| SwapError::NotFound(format!("token symbol {symbol}")))
        })
    }

    pub fn pool(&self, id: &Pubkey) -> Result<Pool, SwapError> {
        self.with_state(|s| {
            s.pools.get(id).cloned().ok_or_else(|| SwapError::NotFound(format!("pool {id}")))
        })
    }

    pub fn program_ids(&self) -> Result<ProgramIds, SwapError> {
        self.with_state(|s| Ok(s.programs))
    }

    /// Curated hop-chains for a mint pair, if the route table has one.
    pub fn routes_for(&self, from: &Pubkey, to: &Pubkey) -> Result<Vec<Vec<Pubkey>>, SwapError> {
        self.with_state(|s| Ok(s.route_table.get(&pair_key(from, to)).cloned().unwrap_or_default()))
    }

    /// All pools with `mint` on either side. Feeds the BFS fallback.
    pub fn pools_with_mint(&self, mint: &Pubkey) -> Result<Vec<Pool>, SwapError> {
        self.with_state(|s| {
            Ok(s.pools.values().filter(|p| p.contains_mint(mint)).cloned().collect())
        })
    }

    /// Mint of the network's wrapped-native token.
    pub fn native_mint(&self) -> Result<Pubkey, SwapError> {
        self.with_state(|s| {
            s.tokens
                .values()
                .find(|t| t.is_wrapped_native)
                .map(|t| t.mint)
                .ok_or_else(|| SwapError::NotFound("wrapped-native token".into()))
        })
    }
}
