// Chain Module - Solana RPC access
//
// This module reads balances and broadcasts signed transactions

pub mod rpc;

pub use rpc::{BalanceReader, SolanaRpc, TransactionSender};
