//! Ledger-access capability trait.
//!
//! The engine only ever needs a handful of read operations plus raw
//! submission; everything else the RPC client offers stays out of the seam so
//! tests can provide an in-memory ledger.

use crate::common::types::{AnyResult, SolanaRpcClient};
use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::sync::Arc;

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Token amount held by an SPL token account, in minor units.
    async fn token_balance(&self, account: &Pubkey) -> AnyResult<u64>;

    /// Minimum lamports an account of `data_len` bytes must hold to be
    /// rent-exempt.
    async fn minimum_rent_exemption(&self, data_len: usize) -> AnyResult<u64>;

    async fn latest_blockhash(&self) -> AnyResult<Hash>;

    async fn account_exists(&self, account: &Pubkey) -> AnyResult<bool>;

    /// Submit a fully signed transaction directly (self-pay path, no relay).
    async fn send_transaction(&self, transaction: &Transaction) -> AnyResult<Signature>;
}

/// [`LedgerReader`] backed by the nonblocking Solana RPC client.
pub struct RpcLedgerReader {
    rpc: Arc<SolanaRpcClient>,
}

impl RpcLedgerReader {
    pub fn new(rpc: Arc<SolanaRpcClient>) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &Arc<SolanaRpcClient> {
        &self.rpc
    }
}

#[async_trait]
impl LedgerReader for RpcLedgerReader {
    async fn token_balance(&self, account: &Pubkey) -> AnyResult<u64> {
        let amount = self.rpc.get_token_account_balance(account).await?;
        Ok(amount.amount.parse::<u64>()?)
    }

    async fn minimum_rent_exemption(&self, data_len: usize) -> AnyResult<u64> {
        Ok(self.rpc.get_minimum_balance_for_rent_exemption(data_len).await?)
    }

    async fn latest_blockhash(&self) -> AnyResult<Hash> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn account_exists(&self, account: &Pubkey) -> AnyResult<bool> {
        Ok(self.rpc.get_account(account).await.is_ok())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> AnyResult<Signature> {
        Ok(self.rpc.send_and_confirm_transaction(transaction).await?)
    }
}
