use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use crate::execution::tx::{Command, Transaction};
use crate::execution::types::ExecutionEffects;

/// Connected account plus its sign-and-execute capability.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// `None` while no account is connected.
    fn address(&self) -> Option<String>;

    async fn sign_and_execute(&self, tx: &Transaction) -> Result<ExecutionEffects>;
}

/// Forwards transactions to a signer service that holds the account keys.
pub struct RelayWallet {
    client: Client,
    signer_url: String,
    address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    transaction: &'a Transaction,
    options: ExecuteOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteOptions {
    show_raw_effects: bool,
    show_object_changes: bool,
}

impl RelayWallet {
    pub fn new(signer_url: &str, address: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            signer_url: signer_url.trim_end_matches('/').to_string(),
            address,
        })
    }
}

#[async_trait]
impl Wallet for RelayWallet {
    fn address(&self) -> Option<String> {
        self.address.clone()
    }

    async fn sign_and_execute(&self, tx: &Transaction) -> Result<ExecutionEffects> {
        let request = ExecuteRequest {
            transaction: tx,
            options: ExecuteOptions {
                show_raw_effects: true,
                show_object_changes: true,
            },
        };

        let effects: ExecutionEffects = self.client
            .post(format!("{}/sign-and-execute", self.signer_url))
            .json(&request)
            .send()
            .await
            .context("Failed to reach signer")?
            .error_for_status()
            .context("Signer rejected the transaction")?
            .json()
            .await
            .context("Failed to parse execution effects")?;

        Ok(effects)
    }
}

/// Logs transactions instead of executing them and reports success.
pub struct DryRunWallet {
    address: Option<String>,
    submitted: Mutex<Vec<Transaction>>,
}

impl DryRunWallet {
    pub fn new(address: Option<String>) -> Self {
        info!("Dry-run wallet initialized for {}", address.as_deref().unwrap_or("<no account>"));

        Self {
            address,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Transactions received so far, oldest first.
    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted
            .lock()
            .map(|txs| txs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Wallet for DryRunWallet {
    fn address(&self) -> Option<String> {
        self.address.clone()
    }

    async fn sign_and_execute(&self, tx: &Transaction) -> Result<ExecutionEffects> {
        let digest = format!("dryrun-{:016x}", rand::thread_rng().gen::<u64>());

        for command in &tx.commands {
            match command {
                Command::MoveCall { target, arguments } => {
                    info!("[dry-run {}] call {} ({} args)", digest, target, arguments.len())
                }
                Command::SplitCoins { amounts, .. } => {
                    info!("[dry-run {}] split {} amount(s)", digest, amounts.len())
                }
                Command::MergeCoins { sources, .. } => {
                    info!("[dry-run {}] merge {} coin(s)", digest, sources.len())
                }
            }
        }

        if let Ok(mut txs) = self.submitted.lock() {
            txs.push(tx.clone());
        }

        Ok(ExecutionEffects {
            digest,
            success: true,
            error: None,
        })
    }
}
