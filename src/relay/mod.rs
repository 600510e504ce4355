//! Fee-relay submission client.
//!
//! The relay fronts the network fee for a signed transaction, counter-signs
//! as fee payer and broadcasts it, subject to per-user usage quotas. Client
//! counters are advisory; the relay's are authoritative and reconciled after
//! every successful submission.

use crate::constants::fees::{RELAY_BASE_BACKOFF_MS, RELAY_MAX_ATTEMPTS, RELAY_MAX_BACKOFF_MS};
use crate::errors::SwapError;
use crate::trading::PreparedTransaction;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

/// Server-tracked free-fee quota. The client copy is advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatus {
    pub max_usage: u64,
    pub current_usage: u64,
    pub max_amount: u64,
    pub amount_used: u64,
}

impl UsageStatus {
    /// Whether the relay would still front `fee` for free. With
    /// `for_next_transaction` the check reserves one more usage slot:
    /// `current_usage < max_usage && amount_used + fee <= max_amount`.
    pub fn is_free_transaction_fee_available(&self, fee: u64, for_next_transaction: bool) -> bool {
        // server-supplied counter; saturate rather than trust it not to be
        // at the numeric ceiling
        let projected_usage = self.current_usage.saturating_add(u64::from(for_next_transaction));
        projected_usage <= self.max_usage
            && self.amount_used.saturating_add(fee) <= self.max_amount
    }

    /// Optimistic local bump after a successful relay, pending the server's
    /// authoritative numbers.
    pub fn record(&mut self, fee: u64) {
        self.current_usage += 1;
        self.amount_used = self.amount_used.saturating_add(fee);
    }

    fn is_consistent(&self) -> bool {
        self.current_usage <= self.max_usage && self.amount_used <= self.max_amount
    }
}

/// Submission lifecycle of one prepared transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Built,
    Submitted,
    Confirmed,
    Failed,
    /// The blockhash aged out; the transaction must be rebuilt.
    Expired,
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubmissionState::Built => "built",
            SubmissionState::Submitted => "submitted",
            SubmissionState::Confirmed => "confirmed",
            SubmissionState::Failed => "failed",
            SubmissionState::Expired => "expired",
        };
        write!(f, "{name}")
    }
}

/// One retry policy for every relay submission site: bounded exponential
/// backoff with jitter, applied only to transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RELAY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RELAY_BASE_BACKOFF_MS),
            max_delay: Duration::from_millis(RELAY_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubled per attempt
    /// with up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
            .min(self.max_delay);
        let jitter = rand::rng().random_range(0..=exponential.as_millis() as u64 / 4);
        exponential + Duration::from_millis(jitter)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayTransactionRequest<'a> {
    serialized_transaction: &'a str,
}

#[derive(Deserialize)]
struct RelayTransactionResponse {
    signature: String,
}

#[derive(Deserialize, Default)]
struct RelayErrorBody {
    #[serde(default)]
    error: Option<String>,
}

pub struct FeeRelayClient {
    endpoint: String,
    http: Client,
    retry: RetryPolicy,
    /// Submission is sequential per user: every prepared transaction spends
    /// the same funding account and blockhash window.
    in_flight: Mutex<()>,
}

impl FeeRelayClient {
    pub fn new(endpoint: String, retry: RetryPolicy) -> Self {
        let http = Client::builder()
            .pool_idle_timeout(Duration::from_secs(120))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(3))
            .build()
            .expect("reqwest client construction cannot fail with static config");
        Self { endpoint: endpoint.trim_end_matches('/').to_string(), http, retry, in_flight: Mutex::new(()) }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Authoritative quota counters for `account`.
    pub async fn usage_status(&self, account: &Pubkey) -> Result<UsageStatus, SwapError> {
        let url = format!("{}/usage_status/{account}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SwapError::RelayUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SwapError::RelayUnreachable(format!(
                "usage_status returned {}",
                response.status()
            )));
        }
        response
            .json::<UsageStatus>()
            .await
            .map_err(|e| SwapError::RelayUnreachable(format!("malformed usage_status: {e}")))
    }

    /// Sign `prepared` with the owner key and hand it to the relay, which
    /// counter-signs as fee payer and broadcasts. On success the advisory
    /// `usage` copy is bumped, then replaced with the server's numbers.
    ///
    /// Transport failures retry under the policy; quota rejections, signer
    /// errors and blockhash expiry do not.
    pub async fn submit(
        &self,
        prepared: &PreparedTransaction,
        usage: &mut UsageStatus,
        owner: &Keypair,
    ) -> Result<Signature, SwapError> {
        let _guard = self.in_flight.lock().await;

        if owner.pubkey() != prepared.owner {
            return Err(SwapError::Unauthorized(format!(
                "signer {} does not own this transaction",
                owner.pubkey()
            )));
        }
        // Compensated transactions pay the relay in-band and spend no quota.
        if !prepared.compensated
            && !usage.is_free_transaction_fee_available(prepared.expected_fee, true)
        {
            return Err(SwapError::RelayRejected(format!(
                "free-fee quota exhausted ({}/{} uses, {}/{} lamports)",
                usage.current_usage, usage.max_usage, usage.amount_used, usage.max_amount
            )));
        }

        let mut transaction = prepared.to_transaction();
        transaction.partial_sign(&[owner], prepared.blockhash);
        let bytes = bincode::serialize(&transaction)
            .map_err(|e| SwapError::Unknown(format!("transaction serialization: {e}")))?;
        let encoded = STANDARD.encode(bytes);

        let mut attempt = 1u32;
        loop {
            log::debug!("relay submission attempt {attempt}, state {}", SubmissionState::Submitted);
            match self.relay_transaction_once(&encoded).await {
                Ok(signature) => {
                    if !prepared.compensated {
                        usage.record(prepared.expected_fee);
                    }
                    self.reconcile(usage, &owner.pubkey()).await;
                    log::info!("relay {}: {signature}", SubmissionState::Confirmed);
                    return Ok(signature);
                },
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    log::warn!("relay attempt {attempt} failed ({e}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    log::warn!(
                        "relay {}: {e}",
                        if matches!(e, SwapError::BlockhashExpired) {
                            SubmissionState::Expired
                        } else {
                            SubmissionState::Failed
                        }
                    );
                    return Err(e);
                },
            }
        }
    }

    async fn relay_transaction_once(&self, serialized: &str) -> Result<Signature, SwapError> {
        let url = format!("{}/relay_transaction", self.endpoint);
        let request = RelayTransactionRequest { serialized_transaction: serialized };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SwapError::RelayUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: RelayTransactionResponse = response
                .json()
                .await
                .map_err(|e| SwapError::Unknown(format!("malformed relay response: {e}")))?;
            return Signature::from_str(&body.signature)
                .map_err(|e| SwapError::Unknown(format!("malformed relay signature: {e}")));
        }

        let message = response
            .json::<RelayErrorBody>()
            .await
            .unwrap_or_default()
            .error
            .unwrap_or_else(|| format!("relay returned {status}"));

        if message.to_ascii_lowercase().contains("blockhash") {
            return Err(SwapError::BlockhashExpired);
        }
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED | StatusCode::FORBIDDEN => {
                Err(SwapError::RelayRejected(message))
            },
            s if s.is_server_error() => Err(SwapError::RelayUnreachable(message)),
            _ => Err(SwapError::Unknown(message)),
        }
    }

    /// Replace the advisory counters with the relay's authoritative ones.
    /// A transient fetch failure keeps the optimistic local values.
    async fn reconcile(&self, usage: &mut UsageStatus, account: &Pubkey) {
        match self.usage_status(account).await {
            Ok(server) => {
                if !server.is_consistent() {
                    log::warn!(
                        "relay reported inconsistent usage: {}/{} uses, {}/{} lamports",
                        server.current_usage,
                        server.max_usage,
                        server.amount_used,
                        server.max_amount
                    );
                }
                *usage = server;
            },
            Err(e) => log::debug!("usage reconciliation deferred: {e}"),
        }
    }
}
