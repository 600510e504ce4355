pub mod balance_cache;
pub mod ledger;
pub mod rent_cache;
pub mod types;

pub use balance_cache::BalanceCache;
pub use ledger::{LedgerReader, RpcLedgerReader};
pub use rent_cache::RentCache;
pub use types::{AnyResult, Network, SolanaRpcClient, SwapConfig};
