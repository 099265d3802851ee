//! Wallet connection state, independent of the conversion flow.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CONNECT_LABEL: &str = "Connect Wallet";
pub const CONNECTING_LABEL: &str = "Connecting...";
pub const GENERIC_ERROR: &str = "An error occurred";

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Please install a valid wallet!")]
    NoProvider,
    #[error("Wallet rejected the request: {0}")]
    Rejected(String),
    #[error("Wallet transport failed: {0}")]
    Transport(String),
}

/// An injected account provider (EIP-1193 style).
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Asks the wallet for account access.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// The account the wallet currently exposes, if any.
    fn selected_address(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletState {
    Disconnected,
    Connecting,
    Connected { address: String },
    /// Disconnected after a failed attempt; `reason` is kept for logs only.
    Failed { reason: String },
}

/// `first 6 chars...last 4 chars`, counted in characters.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{head}...{tail}")
}

/// A pending account request. It owns the provider handle, so the
/// connector stays free to answer `label()` and further clicks meanwhile.
pub struct ConnectRequest {
    provider: Option<Arc<dyn WalletProvider>>,
}

impl ConnectRequest {
    pub async fn send(self) -> Result<Vec<String>, WalletError> {
        match self.provider {
            Some(provider) => provider.request_accounts().await,
            None => Err(WalletError::NoProvider),
        }
    }
}

pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
    state: WalletState,
}

impl WalletConnector {
    /// Creates the connector, picking up an address the provider already
    /// exposes without asking for access again.
    pub fn mount(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let state = match provider.as_ref().and_then(|p| p.selected_address()) {
            Some(address) => {
                debug!(%address, "Wallet already connected");
                WalletState::Connected { address }
            }
            None => WalletState::Disconnected,
        };
        Self { provider, state }
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, WalletState::Connected { .. })
    }

    pub fn address(&self) -> Option<&str> {
        match &self.state {
            WalletState::Connected { address } => Some(address),
            _ => None,
        }
    }

    /// The wallet button: disconnects when connected, otherwise starts a
    /// connection attempt (see [`Self::begin_connect`]).
    pub fn press(&mut self) -> Option<ConnectRequest> {
        if self.is_connected() {
            self.disconnect();
            return None;
        }
        self.begin_connect()
    }

    /// Presses the button and waits for the attempt it started, if any.
    pub async fn click(&mut self) -> &WalletState {
        if let Some(request) = self.press() {
            let result = request.send().await;
            self.finish_connect(result);
        }
        &self.state
    }

    /// Moves to `Connecting` and hands back the account request to await.
    /// Returns `None` while an attempt is already running or an account is
    /// connected.
    pub fn begin_connect(&mut self) -> Option<ConnectRequest> {
        match self.state {
            WalletState::Connecting => {
                debug!("Wallet connection already in progress, ignoring click");
                None
            }
            WalletState::Connected { .. } => None,
            WalletState::Disconnected | WalletState::Failed { .. } => {
                self.state = WalletState::Connecting;
                Some(ConnectRequest {
                    provider: self.provider.clone(),
                })
            }
        }
    }

    /// Applies the outcome of a request from [`Self::begin_connect`].
    pub fn finish_connect(&mut self, result: Result<Vec<String>, WalletError>) {
        if self.state != WalletState::Connecting {
            debug!(state = ?self.state, "No connection attempt running, dropping wallet response");
            return;
        }

        self.state = match result {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(address) => {
                    info!(%address, "Wallet connected");
                    WalletState::Connected { address }
                }
                None => {
                    debug!("Wallet returned no accounts");
                    WalletState::Disconnected
                }
            },
            Err(e) => {
                warn!(error = %e, "Wallet connection failed");
                WalletState::Failed {
                    reason: e.to_string(),
                }
            }
        };
    }

    /// Forgets the account locally. Nothing is sent to the provider.
    pub fn disconnect(&mut self) {
        debug!("Wallet disconnected");
        self.state = WalletState::Disconnected;
    }

    pub fn label(&self) -> String {
        match &self.state {
            WalletState::Connecting => CONNECTING_LABEL.to_string(),
            WalletState::Connected { address } => truncate_address(address),
            WalletState::Disconnected | WalletState::Failed { .. } => CONNECT_LABEL.to_string(),
        }
    }

    pub fn error_message(&self) -> Option<&'static str> {
        matches!(self.state, WalletState::Failed { .. }).then_some(GENERIC_ERROR)
    }
}
