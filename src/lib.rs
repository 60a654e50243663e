//! Client-side logic for Nereus prediction markets on Sui.
//!
//! `data` reads markets, holdings, chat and rankings; `execution` turns user
//! order entry into programmable transactions handed to a wallet.

pub mod config;
pub mod data;
pub mod execution;
pub mod monitoring;

pub use config::{Config, EnvConfig};
pub use data::store::AppState;
pub use data::types::{Market, Side};
pub use execution::errors::TradeError;
pub use execution::flow::{TradeFlow, TradeState};
pub use execution::trader::Trader;
