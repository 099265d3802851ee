//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod debounce;
pub mod log;
pub mod projector;
pub mod rates;
pub mod session;
pub mod wallet;

// Re-export main types for cleaner imports
pub use currency::{Currency, CurrencyRateProvider, Pair};
pub use projector::Conversion;
pub use rates::{FailurePolicy, Rate};
pub use session::{ConverterSession, SessionOptions, Snapshot};
pub use wallet::{WalletConnector, WalletProvider, WalletState};
