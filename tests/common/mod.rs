//! Shared fixtures: an in-memory ledger and a canned fee-relay endpoint.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sol_swap_relay::catalog::{Catalog, Pool};
use sol_swap_relay::common::{AnyResult, LedgerReader};
use sol_swap_relay::constants::tokens::{RAY_MINT, USDC_MINT, USDT_MINT, WSOL_MINT};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const RENT: u64 = 2_039_280;

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory ledger. Token balances and account existence are seeded by the
/// test; submitted transactions are recorded instead of broadcast.
pub struct MockLedger {
    rent: u64,
    token_balances: Mutex<HashMap<Pubkey, u64>>,
    existing: Mutex<HashSet<Pubkey>>,
    pub sent: Mutex<Vec<Transaction>>,
}

impl MockLedger {
    pub fn new(rent: u64) -> Self {
        Self {
            rent,
            token_balances: Mutex::new(HashMap::new()),
            existing: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_token_balance(&self, account: Pubkey, amount: u64) {
        self.token_balances.lock().insert(account, amount);
        self.existing.lock().insert(account);
    }

    pub fn mark_existing(&self, account: Pubkey) {
        self.existing.lock().insert(account);
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn token_balance(&self, account: &Pubkey) -> AnyResult<u64> {
        self.token_balances
            .lock()
            .get(account)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no token account {account}"))
    }

    async fn minimum_rent_exemption(&self, _data_len: usize) -> AnyResult<u64> {
        Ok(self.rent)
    }

    async fn latest_blockhash(&self) -> AnyResult<Hash> {
        Ok(Hash::new_from_array([7u8; 32]))
    }

    async fn account_exists(&self, account: &Pubkey) -> AnyResult<bool> {
        Ok(self.existing.lock().contains(account))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> AnyResult<Signature> {
        let signature = transaction.signatures.first().copied().unwrap_or_default();
        self.sent.lock().push(transaction.clone());
        Ok(signature)
    }
}

pub fn pool_between(catalog: &Catalog, a: &Pubkey, b: &Pubkey) -> Pool {
    catalog
        .pools()
        .unwrap()
        .into_iter()
        .find(|p| p.contains_mint(a) && p.contains_mint(b))
        .expect("catalog pool for pair")
}

pub fn seed_reserves(ledger: &MockLedger, pool: &Pool, side_a: (&Pubkey, u64), side_b: (&Pubkey, u64)) {
    ledger.set_token_balance(pool.reserve_for_mint(side_a.0).unwrap(), side_a.1);
    ledger.set_token_balance(pool.reserve_for_mint(side_b.0).unwrap(), side_b.1);
}

/// Deep liquidity everywhere; direct routes beat two-hop alternatives.
pub fn seed_mainnet_liquidity(catalog: &Catalog, ledger: &MockLedger) {
    let sol_usdc = pool_between(catalog, &WSOL_MINT, &USDC_MINT);
    let sol_usdt = pool_between(catalog, &WSOL_MINT, &USDT_MINT);
    let usdc_usdt = pool_between(catalog, &USDC_MINT, &USDT_MINT);
    let ray_usdc = pool_between(catalog, &RAY_MINT, &USDC_MINT);
    let ray_sol = pool_between(catalog, &RAY_MINT, &WSOL_MINT);

    // 10k SOL against 1M of each stable, 2M RAY legs
    seed_reserves(ledger, &sol_usdc, (&WSOL_MINT, 10_000_000_000_000), (&USDC_MINT, 1_000_000_000_000));
    seed_reserves(ledger, &sol_usdt, (&WSOL_MINT, 10_000_000_000_000), (&USDT_MINT, 1_000_000_000_000));
    seed_reserves(ledger, &usdc_usdt, (&USDC_MINT, 1_000_000_000_000), (&USDT_MINT, 1_000_000_000_000));
    seed_reserves(ledger, &ray_usdc, (&RAY_MINT, 2_000_000_000_000), (&USDC_MINT, 1_000_000_000_000));
    seed_reserves(ledger, &ray_sol, (&RAY_MINT, 2_000_000_000_000), (&WSOL_MINT, 10_000_000_000_000));
}

/// What the canned relay answers.
pub struct RelayStubResponses {
    pub usage_json: String,
    /// Status line and body for `POST /relay_transaction`; `None` answers
    /// 402 with a quota error.
    pub post: Option<(String, String)>,
}

pub struct RelayStub {
    pub url: String,
    /// Request lines seen, in order.
    pub requests: Arc<Mutex<Vec<String>>>,
}

/// One-connection-at-a-time HTTP responder standing in for the relay.
pub async fn spawn_relay_stub(responses: RelayStubResponses) -> RelayStub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    let responses = Arc::new(responses);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let seen = seen.clone();
            let responses = responses.clone();
            tokio::spawn(async move {
                let mut buffer = vec![0u8; 16 * 1024];
                let mut read = 0usize;
                loop {
                    match socket.read(&mut buffer[read..]).await {
                        Ok(0) => break,
                        Ok(n) => {
                            read += n;
                            if buffer[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                            if read == buffer.len() {
                                break;
                            }
                        },
                        Err(_) => return,
                    }
                }
                let head = String::from_utf8_lossy(&buffer[..read]).to_string();
                let line = head.lines().next().unwrap_or_default().to_string();
                seen.lock().push(line.clone());

                let (status, body) = if line.starts_with("GET /usage_status/") {
                    ("200 OK".to_string(), responses.usage_json.clone())
                } else if let Some((status, body)) = &responses.post {
                    (status.clone(), body.clone())
                } else {
                    ("402 Payment Required".to_string(), r#"{"error":"usage quota exceeded"}"#.to_string())
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    RelayStub { url: format!("http://{addr}"), requests }
}
