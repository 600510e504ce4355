//! Last-observed reserve/account balances.
//!
//! A pure memoization layer with an explicit lifecycle: no TTL, last write
//! wins, cleared only by [`BalanceCache::reload`]. Callers decide when
//! staleness matters and reload before quotes that must be fresh.

use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;

#[derive(Default)]
pub struct BalanceCache {
    balances: DashMap<Pubkey, u64>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self { balances: DashMap::new() }
    }

    pub fn get(&self, account: &Pubkey) -> Option<u64> {
        self.balances.get(account).map(|entry| *entry)
    }

    pub fn set(&self, account: Pubkey, balance: u64) {
        self.balances.insert(account, balance);
    }

    /// Drop every entry. The next read goes back to the ledger.
    pub fn reload(&self) {
        self.balances.clear();
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let cache = BalanceCache::new();
        let account = Pubkey::new_unique();
        assert_eq!(cache.get(&account), None);
        cache.set(account, 1_000_000);
        assert_eq!(cache.get(&account), Some(1_000_000));
    }

    #[test]
    fn test_last_write_wins() {
        let cache = BalanceCache::new();
        let account = Pubkey::new_unique();
        cache.set(account, 1);
        cache.set(account, 2);
        assert_eq!(cache.get(&account), Some(2));
    }

    #[test]
    fn test_reload_clears_everything() {
        let cache = BalanceCache::new();
        cache.set(Pubkey::new_unique(), 1);
        cache.set(Pubkey::new_unique(), 2);
        assert_eq!(cache.len(), 2);
        cache.reload();
        assert!(cache.is_empty());
    }
}
