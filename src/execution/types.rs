use serde::{Deserialize, Serialize};
use std::fmt;
use crate::data::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => f.write_str("MARKET"),
            OrderType::Limit => f.write_str("LIMIT"),
        }
    }
}

/// Order entry as typed by the user. Inputs stay raw strings until submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderDraft {
    pub side: Option<Side>,
    pub order_type: OrderType,
    pub quantity: String,
    pub limit_price: String,
}

/// A validated order ready for transaction building.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderRequest {
    /// Whole shares at the market's current price.
    MarketBuy { side: Side, quantity: u64 },
    /// Amount and price fixed-point 1e9.
    LimitOrder { side: Side, amount: u64, price: u64 },
}

impl OrderRequest {
    pub fn side(&self) -> Side {
        match self {
            OrderRequest::MarketBuy { side, .. } | OrderRequest::LimitOrder { side, .. } => *side,
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderRequest::MarketBuy { .. } => OrderType::Market,
            OrderRequest::LimitOrder { .. } => OrderType::Limit,
        }
    }
}

/// What the chain client reports back after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEffects {
    pub digest: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
