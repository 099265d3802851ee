//! Application-wide state, created once at start-up and torn down on exit.

use crate::core::config::AppConfig;
use crate::core::currency::CurrencyRateProvider;
use crate::core::session::{ConverterSession, SessionOptions};
use crate::core::wallet::{WalletConnector, WalletProvider};
use crate::providers::jsonrpc_wallet::JsonRpcWalletProvider;
use crate::providers::uphold::UpholdTickerProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AppContext {
    pub converter: ConverterSession,
    pub wallet: WalletConnector,
}

impl AppContext {
    pub fn new(
        rates: Arc<dyn CurrencyRateProvider>,
        wallet: Option<Arc<dyn WalletProvider>>,
        options: SessionOptions,
    ) -> Self {
        Self {
            converter: ConverterSession::new(rates, options),
            wallet: WalletConnector::mount(wallet),
        }
    }

    /// Builds the providers named in `config`. An unreachable wallet node
    /// leaves the connector without a provider rather than failing start-up.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let rates = Arc::new(UpholdTickerProvider::new(config.uphold_base_url())?);

        let wallet: Option<Arc<dyn WalletProvider>> = match &config.providers.wallet {
            Some(wallet_config) => match JsonRpcWalletProvider::connect(&wallet_config.rpc_url).await
            {
                Ok(provider) => Some(Arc::new(provider)),
                Err(e) => {
                    warn!(error = %e, url = %wallet_config.rpc_url, "Wallet provider unavailable");
                    None
                }
            },
            None => None,
        };

        info!(base = %config.base_currency, "Application context ready");
        Ok(Self::new(rates, wallet, config.session_options()))
    }

    pub fn shutdown(self) {
        self.converter.shutdown();
        info!("Application context closed");
    }
}
