//! Rent-exemption minimums, fetched once and reused by the fee estimator and
//! transaction builder. Refreshed explicitly; rent changes only with feature
//! activations, so a warm value is good for the life of the process.

use crate::common::ledger::LedgerReader;
use crate::common::types::AnyResult;
use crate::constants::fees::TOKEN_ACCOUNT_SIZE;
use parking_lot::RwLock;

#[derive(Default)]
pub struct RentCache {
    token_account_rent: RwLock<Option<u64>>,
}

impl RentCache {
    pub fn new() -> Self {
        Self { token_account_rent: RwLock::new(None) }
    }

    /// Fetch the token-account rent minimum from the ledger and cache it.
    pub async fn warm(&self, ledger: &dyn LedgerReader) -> AnyResult<()> {
        let rent = ledger.minimum_rent_exemption(TOKEN_ACCOUNT_SIZE).await?;
        *self.token_account_rent.write() = Some(rent);
        Ok(())
    }

    /// Rent-exempt minimum for an SPL token account, fetching on first use.
    pub async fn token_account_rent(&self, ledger: &dyn LedgerReader) -> AnyResult<u64> {
        if let Some(rent) = *self.token_account_rent.read() {
            return Ok(rent);
        }
        self.warm(ledger).await?;
        Ok(self.token_account_rent.read().expect("warmed above"))
    }

    /// Seed the cache with a known rent value (offline flows and tests).
    pub fn with_token_account_rent(rent: u64) -> Self {
        Self { token_account_rent: RwLock::new(Some(rent)) }
    }
}
