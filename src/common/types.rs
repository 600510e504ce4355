use crate::constants::fees::{DEFAULT_SLIPPAGE_BPS, RELAY_BASE_BACKOFF_MS, RELAY_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use std::time::Duration;

pub type SolanaRpcClient = solana_client::nonblocking::rpc_client::RpcClient;
pub type AnyResult<T> = anyhow::Result<T>;

/// Networks the built-in catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    MainnetBeta,
    Devnet,
    Testnet,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::MainnetBeta => write!(f, "mainnet-beta"),
            Network::Devnet => write!(f, "devnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// Client configuration. Wallet-independent; one value can back several
/// clients that share the same RPC endpoint and relay.
#[derive(Debug, Clone)]
pub struct SwapConfig {
    pub rpc_url: String,
    pub relay_url: String,
    pub network: Network,
    pub commitment: CommitmentConfig,
    /// Slippage tolerance applied to quotes, in basis points.
    pub slippage_bps: u64,
    /// Relay submission retry policy for transient network failures.
    pub relay_max_attempts: u32,
    pub relay_base_backoff: Duration,
}

impl SwapConfig {
    pub fn new(rpc_url: String, relay_url: String, network: Network) -> Self {
        Self {
            rpc_url,
            relay_url,
            network,
            commitment: CommitmentConfig::confirmed(),
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            relay_max_attempts: RELAY_MAX_ATTEMPTS,
            relay_base_backoff: Duration::from_millis(RELAY_BASE_BACKOFF_MS),
        }
    }

    pub fn with_slippage_bps(mut self, slippage_bps: u64) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }
}
