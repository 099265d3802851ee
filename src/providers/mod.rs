pub mod jsonrpc_wallet;
pub mod uphold;
