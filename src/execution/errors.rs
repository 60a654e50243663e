use crate::data::types::Side;

/// Why a trade action did not go through. Returned to the caller, never only logged.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("No side selected")]
    NoSideSelected,

    #[error("Invalid quantity: {0:?}")]
    InvalidQuantity(String),

    #[error("Invalid limit price: {0:?}")]
    InvalidLimitPrice(String),

    #[error("Market {0} has no {1} price")]
    NoMarketPrice(String, Side),

    #[error("Market {0} has ended")]
    MarketEnded(String),

    #[error("No connected wallet")]
    NoWallet,

    #[error("No USDC found for {0}")]
    NoFundingCoin(String),

    #[error("Insufficient USDC: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Transaction {digest} failed: {reason}")]
    Rejected { digest: String, reason: String },

    #[error("Remote call failed: {0}")]
    Remote(#[from] anyhow::Error),
}

impl TradeError {
    /// Input problems the user can fix in the form; nothing was sent.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TradeError::NoSideSelected | TradeError::InvalidQuantity(_) | TradeError::InvalidLimitPrice(_)
        )
    }
}
