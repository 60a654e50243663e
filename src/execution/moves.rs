use crate::config::PackageConfig;
use crate::data::types::Side;
use crate::execution::tx::{Argument, TransactionBuilder};

/// Buy whole shares of one outcome at the market price, paying with `payment`.
pub fn buy(
    tb: &mut TransactionBuilder,
    packages: &PackageConfig,
    market: &str,
    side: Side,
    payment: Argument,
    quantity: u64,
) -> Argument {
    let function = match side {
        Side::Yes => "buy_yes",
        Side::No => "buy_no",
    };
    tb.move_call(
        format!("{}::market::{}", packages.market, function),
        vec![
            Argument::object(market),
            payment,
            Argument::u64(quantity),
            Argument::object(&packages.clock),
        ],
    )
}

/// Resting order on the market's book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
    /// Fixed-point 1e9.
    pub amount: u64,
    /// Fixed-point 1e9.
    pub price: u64,
    pub is_bid: bool,
    pub side: Side,
    /// 0 keeps the order until cancelled.
    pub expiry: u64,
    /// Caller-chosen nonce distinguishing otherwise identical orders.
    pub salt: u64,
}

pub fn create_order(
    tb: &mut TransactionBuilder,
    packages: &PackageConfig,
    owner: &str,
    market: &str,
    params: &OrderParams,
    coin: Argument,
) -> Argument {
    tb.move_call(
        format!("{}::orderbook::create_order", packages.market),
        vec![
            Argument::address(owner),
            Argument::object(market),
            Argument::u64(params.amount),
            Argument::u64(params.price),
            Argument::u8(params.is_bid as u8),
            Argument::u8(params.side.as_flag()),
            Argument::u64(params.expiry),
            Argument::u64(params.salt),
            coin,
        ],
    )
}

pub fn provide_liquidity(
    tb: &mut TransactionBuilder,
    packages: &PackageConfig,
    market: &str,
    coin: Argument,
    amount: u64,
) -> Argument {
    tb.move_call(
        format!("{}::market::provide_liquidity", packages.market),
        vec![Argument::object(market), coin, Argument::u64(amount)],
    )
}

pub fn create_market(
    tb: &mut TransactionBuilder,
    packages: &PackageConfig,
    topic: &str,
    description: &str,
    start_time: u64,
    end_time: u64,
) -> Argument {
    tb.move_call(
        format!("{}::market::create_market", packages.market),
        vec![
            Argument::string(topic),
            Argument::string(description),
            Argument::u64(start_time),
            Argument::u64(end_time),
        ],
    )
}

/// Register resolution code and its stored prompt, then wrap the config in a
/// truth-oracle holder. Returns `(holder, config)`.
pub fn create_oracle(
    tb: &mut TransactionBuilder,
    packages: &PackageConfig,
    code_hash: &str,
    blob_id: &str,
) -> (Argument, Argument) {
    let config = tb.move_call(
        format!("{}::oracle::create_config", packages.oracle),
        vec![Argument::string(code_hash), Argument::string(blob_id)],
    );
    let holder = tb.move_call(
        format!("{}::oracle::create_truth_oracle_holder", packages.oracle),
        vec![config.clone()],
    );
    (holder, config)
}
