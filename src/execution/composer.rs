use crate::data::normalize::{side_price, PRICE_SCALE};
use crate::data::types::{Market, Side};
use crate::execution::errors::TradeError;
use crate::execution::types::{OrderDraft, OrderRequest, OrderType};

pub const LIMIT_PRICE_HINT: &str = "Please enter a valid limit price.";

/// Parse user input as a finite number above zero. Blank or non-numeric input is invalid,
/// never zero.
pub fn parse_positive(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// MARKET orders buy whole shares: a plain positive integer such as "25".
pub fn parse_whole_shares(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|q| *q > 0)
}

/// Cost estimate and validation state for the current draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub side: Option<Side>,
    pub order_type: OrderType,
    /// 0 when no usable price is available yet.
    pub price_per_share: f64,
    pub quantity: Option<f64>,
    /// Four decimals; "0.0000" when quantity or price is unusable.
    pub total: String,
    pub quantity_valid: bool,
    /// Quantity is a whole number of shares, as MARKET orders require.
    pub whole_shares: bool,
    pub limit_price_valid: bool,
    /// Inline hint, only once something invalid was typed in LIMIT mode.
    pub limit_price_hint: Option<&'static str>,
}

impl Estimate {
    pub fn price_display(&self) -> String {
        format!("{:.4}", self.price_per_share)
    }

    pub fn quantity_display(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }

    /// Whether the confirm control should be enabled. Agrees with `build_request`
    /// and additionally needs a price to trade at.
    pub fn can_submit(&self) -> bool {
        let order_ok = match self.order_type {
            OrderType::Market => self.whole_shares,
            OrderType::Limit => self.limit_price_valid,
        };
        self.side.is_some() && self.quantity_valid && order_ok && self.price_per_share > 0.0
    }
}

/// Pure function of the draft and the normalized price for the draft's side.
pub fn compose(draft: &OrderDraft, market_price: f64) -> Estimate {
    let quantity = parse_positive(&draft.quantity);
    let limit_price = parse_positive(&draft.limit_price);

    let price_per_share = match draft.order_type {
        OrderType::Market => market_price,
        OrderType::Limit => limit_price.unwrap_or(0.0),
    };

    let total = match quantity {
        Some(q) if price_per_share > 0.0 => format!("{:.4}", price_per_share * q),
        _ => "0.0000".to_string(),
    };

    let limit_price_hint = (draft.order_type == OrderType::Limit
        && limit_price.is_none()
        && !draft.limit_price.is_empty())
    .then_some(LIMIT_PRICE_HINT);

    Estimate {
        side: draft.side,
        order_type: draft.order_type,
        price_per_share,
        quantity,
        total,
        quantity_valid: quantity.is_some(),
        whole_shares: parse_whole_shares(&draft.quantity).is_some(),
        limit_price_valid: limit_price.is_some(),
        limit_price_hint,
    }
}

/// Compose against the market's current price for the selected side.
pub fn compose_for_market(draft: &OrderDraft, market: &Market) -> Estimate {
    let market_price = draft
        .side
        .and_then(|side| side_price(market, side))
        .unwrap_or(0.0);
    compose(draft, market_price)
}

fn to_fixed(value: f64) -> Option<u64> {
    let scaled = (value * PRICE_SCALE).floor();
    (scaled >= 1.0 && scaled <= u64::MAX as f64).then_some(scaled as u64)
}

/// Turn a draft into an order request. MARKET orders take whole shares only.
pub fn build_request(draft: &OrderDraft) -> Result<OrderRequest, TradeError> {
    let side = draft.side.ok_or(TradeError::NoSideSelected)?;

    match draft.order_type {
        OrderType::Market => {
            let quantity = parse_whole_shares(&draft.quantity)
                .ok_or_else(|| TradeError::InvalidQuantity(draft.quantity.clone()))?;
            Ok(OrderRequest::MarketBuy { side, quantity })
        }
        OrderType::Limit => {
            let amount = parse_positive(&draft.quantity)
                .and_then(to_fixed)
                .ok_or_else(|| TradeError::InvalidQuantity(draft.quantity.clone()))?;
            let price = parse_positive(&draft.limit_price)
                .and_then(to_fixed)
                .ok_or_else(|| TradeError::InvalidLimitPrice(draft.limit_price.clone()))?;
            Ok(OrderRequest::LimitOrder { side, amount, price })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(order_type: OrderType, quantity: &str, limit_price: &str) -> OrderDraft {
        OrderDraft {
            side: Some(Side::Yes),
            order_type,
            quantity: quantity.to_string(),
            limit_price: limit_price.to_string(),
        }
    }

    #[test]
    fn test_market_estimate() {
        let estimate = compose(&draft(OrderType::Market, "100", ""), 0.275);

        assert_eq!(estimate.total, "27.5000");
        assert_eq!(estimate.price_display(), "0.2750");
        assert!(estimate.can_submit());
        assert_eq!(estimate.limit_price_hint, None);
    }

    #[test]
    fn test_invalid_quantity_is_not_a_zero_trade() {
        for raw in ["", "   ", "abc", "0", "-3", "NaN", "inf"] {
            let estimate = compose(&draft(OrderType::Market, raw, ""), 0.5);
            assert!(!estimate.quantity_valid, "{:?} should be invalid", raw);
            assert_eq!(estimate.total, "0.0000");
            assert_eq!(estimate.quantity_display(), 0.0);
            assert!(!estimate.can_submit());
        }
    }

    #[test]
    fn test_limit_without_valid_price_estimates_zero() {
        let unset = compose(&draft(OrderType::Limit, "100", ""), 0.5);
        assert_eq!(unset.total, "0.0000");
        assert_eq!(unset.price_per_share, 0.0);
        assert_eq!(unset.limit_price_hint, None);
        assert!(!unset.can_submit());

        let invalid = compose(&draft(OrderType::Limit, "100", "x"), 0.5);
        assert_eq!(invalid.total, "0.0000");
        assert_eq!(invalid.limit_price_hint, Some(LIMIT_PRICE_HINT));
    }

    #[test]
    fn test_limit_price_overrides_market_price() {
        let estimate = compose(&draft(OrderType::Limit, "40", "0.25"), 0.9);

        assert_eq!(estimate.price_per_share, 0.25);
        assert_eq!(estimate.total, "10.0000");
        assert!(estimate.can_submit());
    }

    #[test]
    fn test_zero_market_price_estimates_zero() {
        let estimate = compose(&draft(OrderType::Market, "10", ""), 0.0);
        assert_eq!(estimate.total, "0.0000");
    }

    #[test]
    fn test_market_request_requires_whole_shares() {
        assert_eq!(
            build_request(&draft(OrderType::Market, " 25 ", "")).unwrap(),
            OrderRequest::MarketBuy { side: Side::Yes, quantity: 25 }
        );
        assert!(matches!(
            build_request(&draft(OrderType::Market, "2.5", "")),
            Err(TradeError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_fractional_market_quantity_cannot_submit() {
        for raw in ["2.5", "1e3"] {
            let d = draft(OrderType::Market, raw, "");
            let estimate = compose(&d, 0.275);

            assert!(estimate.quantity_valid, "{:?} is still a positive number", raw);
            assert!(!estimate.can_submit(), "{:?} is not whole shares", raw);
            assert!(build_request(&d).is_err());
        }

        let limit = compose(&draft(OrderType::Limit, "2.5", "0.3"), 0.275);
        assert!(limit.can_submit());
    }

    #[test]
    fn test_market_without_price_cannot_submit() {
        let mut m = crate::data::store::tests::market("0xm", 1);
        m.yes_price = None;

        let estimate = compose_for_market(&draft(OrderType::Market, "10", ""), &m);

        assert_eq!(estimate.total, "0.0000");
        assert!(estimate.quantity_valid);
        assert!(!estimate.can_submit());
    }

    #[test]
    fn test_limit_request_scales_to_fixed_point() {
        assert_eq!(
            build_request(&draft(OrderType::Limit, "2", "0.5")).unwrap(),
            OrderRequest::LimitOrder { side: Side::Yes, amount: 2_000_000_000, price: 500_000_000 }
        );
        assert!(matches!(
            build_request(&draft(OrderType::Limit, "2", "")),
            Err(TradeError::InvalidLimitPrice(_))
        ));
    }

    #[test]
    fn test_request_without_side() {
        let mut d = draft(OrderType::Market, "1", "");
        d.side = None;
        assert!(matches!(build_request(&d), Err(TradeError::NoSideSelected)));
    }
}
