use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::core::wallet::{WalletError, WalletProvider};

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Talks to a wallet node over JSON-RPC 2.0 (`eth_accounts`,
/// `eth_requestAccounts`) and remembers the selected account.
pub struct JsonRpcWalletProvider {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    selected: RwLock<Option<String>>,
}

impl JsonRpcWalletProvider {
    /// Connects to `url` and reads the account it already exposes, if any.
    pub async fn connect(url: &str) -> Result<Self, WalletError> {
        let provider = Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            selected: RwLock::new(None),
        };
        let accounts = provider.accounts("eth_accounts").await?;
        provider.select(accounts.first().cloned());
        Ok(provider)
    }

    fn select(&self, address: Option<String>) {
        *self.selected.write().unwrap_or_else(|e| e.into_inner()) = address;
    }

    async fn accounts(&self, rpc_method: &str) -> Result<Vec<String>, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": rpc_method,
            "params": [],
        });
        debug!(method = rpc_method, url = %self.url, "Sending wallet request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WalletError::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        if let Some(err) = rpc.error {
            return Err(WalletError::Rejected(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }

        serde_json::from_value(rpc.result.unwrap_or(Value::Null))
            .map_err(|e| WalletError::Transport(format!("Unexpected accounts payload: {e}")))
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let accounts = self.accounts("eth_requestAccounts").await?;
        self.select(accounts.first().cloned());
        Ok(accounts)
    }

    fn selected_address(&self) -> Option<String> {
        self.selected
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
