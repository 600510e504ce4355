//! Route enumeration over the pool graph.
//!
//! Candidate routes come from the curated route table derived at catalog
//! load; when a pair is absent the finder falls back to a breadth-first walk
//! over the pool graph bounded to two hops. Deeper routes are excluded: the
//! extra fixed fee and price impact outweigh the gain.

use crate::catalog::{Catalog, Pool};
use crate::constants::fees::MAX_ROUTE_HOPS;
use crate::errors::SwapError;
use smallvec::SmallVec;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, non-empty chain of pools connecting a source and destination
/// mint. `mints` carries the asset at each boundary, so
/// `mints.len() == pools.len() + 1`, `mints[0]` is the source and the last
/// entry the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pools: SmallVec<[Pubkey; MAX_ROUTE_HOPS]>,
    pub mints: SmallVec<[Pubkey; MAX_ROUTE_HOPS + 1]>,
}

impl Route {
    /// Resolve a pool-id chain against the catalog, checking that consecutive
    /// hops share exactly one asset and that the chain ends at `to`.
    pub fn resolve(
        catalog: &Catalog,
        from: &Pubkey,
        to: &Pubkey,
        pool_ids: &[Pubkey],
    ) -> Result<Self, SwapError> {
        if pool_ids.is_empty() {
            return Err(SwapError::SwapInfoMissing("empty pool chain".into()));
        }
        let mut mints: SmallVec<[Pubkey; MAX_ROUTE_HOPS + 1]> = SmallVec::new();
        let mut pools: SmallVec<[Pubkey; MAX_ROUTE_HOPS]> = SmallVec::new();
        let mut current = *from;
        mints.push(current);
        for id in pool_ids {
            let pool = catalog.pool(id)?;
            let next = pool.other_mint(&current).ok_or_else(|| {
                SwapError::SwapInfoMissing(format!(
                    "pool {} does not trade asset {current}",
                    pool.name
                ))
            })?;
            pools.push(pool.id);
            mints.push(next);
            current = next;
        }
        if current != *to {
            return Err(SwapError::SwapInfoMissing(format!(
                "chain ends at {current}, expected {to}"
            )));
        }
        Ok(Self { pools, mints })
    }

    pub fn hop_count(&self) -> usize {
        self.pools.len()
    }

    pub fn is_direct(&self) -> bool {
        self.pools.len() == 1
    }

    pub fn source_mint(&self) -> Pubkey {
        self.mints[0]
    }

    pub fn destination_mint(&self) -> Pubkey {
        self.mints[self.mints.len() - 1]
    }

    /// Intermediate assets traversed between source and destination.
    pub fn intermediate_mints(&self) -> &[Pubkey] {
        &self.mints[1..self.mints.len() - 1]
    }
}

pub struct RouteFinder {
    catalog: Arc<Catalog>,
}

impl RouteFinder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Every viable hop-sequence between two assets: direct pools first, then
    /// routes through one intermediate asset. Empty when no path exists.
    pub fn find_routes(&self, from: &Pubkey, to: &Pubkey) -> Result<Vec<Route>, SwapError> {
        if from == to {
            return Ok(vec![]);
        }

        let mut routes = Vec::new();
        for chain in self.catalog.routes_for(from, to)? {
            match Route::resolve(&self.catalog, from, to, &chain) {
                Ok(route) => routes.push(route),
                // Curated chains are orientation-agnostic; a chain listed for
                // the reverse direction resolves once flipped.
                Err(_) => {
                    let flipped: Vec<Pubkey> = chain.iter().rev().copied().collect();
                    match Route::resolve(&self.catalog, from, to, &flipped) {
                        Ok(route) => routes.push(route),
                        Err(e) => log::warn!("dropping unresolvable curated chain: {e}"),
                    }
                },
            }
        }

        if routes.is_empty() {
            routes = self.discover(from, to)?;
        }

        routes.sort_by_key(Route::hop_count);
        Ok(routes)
    }

    /// Breadth-first fallback over the pool graph, bounded to two hops.
    fn discover(&self, from: &Pubkey, to: &Pubkey) -> Result<Vec<Route>, SwapError> {
        let mut routes = Vec::new();
        let mut seen: HashSet<(Pubkey, Pubkey)> = HashSet::new();
        let source_pools: Vec<Pool> = self.catalog.pools_with_mint(from)?;

        for pool in &source_pools {
            if pool.contains_mint(to) {
                routes.push(Route::resolve(&self.catalog, from, to, &[pool.id])?);
            }
        }

        for first in &source_pools {
            let Some(mid) = first.other_mint(from) else { continue };
            if mid == *to {
                continue;
            }
            for second in self.catalog.pools_with_mint(&mid)? {
                if second.id == first.id || !second.contains_mint(to) {
                    continue;
                }
                if !seen.insert((first.id, second.id)) {
                    continue;
                }
                routes.push(Route::resolve(&self.catalog, from, to, &[first.id, second.id])?);
            }
        }

        Ok(routes)
    }
}
