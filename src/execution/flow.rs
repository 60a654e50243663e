//! Per-market trade entry state machine.
//!
//! `Idle -> SideSelected -> Submitting -> Idle`, with `Closed` as a terminal
//! state once the market's end time has passed.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use crate::data::types::{Market, Side};
use crate::execution::composer::{build_request, compose_for_market, Estimate};
use crate::execution::errors::TradeError;
use crate::execution::trader::Trader;
use crate::execution::types::{ExecutionEffects, OrderDraft, OrderRequest, OrderType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeState {
    Idle,
    SideSelected(Side),
    Submitting(Side),
    Closed,
}

/// Which market actions are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub trading: bool,
    pub add_liquidity: bool,
    pub resolve: bool,
}

pub fn controls(market: &Market, now: DateTime<Utc>) -> Controls {
    Controls {
        trading: !market.is_ended_at(now),
        add_liquidity: true,
        resolve: true,
    }
}

pub struct TradeFlow {
    market: Market,
    draft: OrderDraft,
    state: TradeState,
}

impl TradeFlow {
    pub fn new(market: Market) -> Self {
        Self::new_at(market, Utc::now())
    }

    pub fn new_at(market: Market, now: DateTime<Utc>) -> Self {
        let state = if market.is_ended_at(now) {
            TradeState::Closed
        } else {
            TradeState::Idle
        };

        Self {
            market,
            draft: OrderDraft::default(),
            state,
        }
    }

    /// Close the flow once `now` reaches the market's end time.
    pub fn refresh_clock(&mut self, now: DateTime<Utc>) -> TradeState {
        if self.state != TradeState::Closed && self.market.is_ended_at(now) {
            info!("Market {} ended, trading closed", self.market.address);
            self.state = TradeState::Closed;
        }
        self.state
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn state(&self) -> TradeState {
        self.state
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn controls(&self, now: DateTime<Utc>) -> Controls {
        let mut c = controls(&self.market, now);
        c.trading &= self.state != TradeState::Closed;
        c
    }

    fn is_open(&self) -> bool {
        matches!(self.state, TradeState::Idle | TradeState::SideSelected(_))
    }

    /// Returns false when the flow does not accept input right now.
    pub fn select_side(&mut self, side: Side) -> bool {
        if !self.is_open() {
            return false;
        }
        self.draft.side = Some(side);
        self.state = TradeState::SideSelected(side);
        true
    }

    pub fn clear_side(&mut self) {
        if let TradeState::SideSelected(_) = self.state {
            self.draft.side = None;
            self.state = TradeState::Idle;
        }
    }

    pub fn set_quantity(&mut self, raw: &str) -> bool {
        if !matches!(self.state, TradeState::SideSelected(_)) {
            return false;
        }
        self.draft.quantity = raw.to_string();
        true
    }

    pub fn set_limit_price(&mut self, raw: &str) -> bool {
        if !matches!(self.state, TradeState::SideSelected(_)) {
            return false;
        }
        self.draft.limit_price = raw.to_string();
        true
    }

    /// Switching order type keeps both the quantity and any typed limit price.
    pub fn set_order_type(&mut self, order_type: OrderType) -> bool {
        if !self.is_open() {
            return false;
        }
        self.draft.order_type = order_type;
        true
    }

    /// Composer output; suppressed until a side is chosen.
    pub fn estimate(&self) -> Option<Estimate> {
        match self.state {
            TradeState::SideSelected(_) => Some(compose_for_market(&self.draft, &self.market)),
            _ => None,
        }
    }

    pub fn estimate_visible(&self) -> bool {
        matches!(self.state, TradeState::SideSelected(_)) && !self.draft.quantity.trim().is_empty()
    }

    /// Validate the draft and enter `Submitting`. Input errors leave the draft as typed.
    pub fn begin_submit(&mut self) -> Result<OrderRequest, TradeError> {
        self.refresh_clock(Utc::now());

        let side = match self.state {
            TradeState::Closed => return Err(TradeError::MarketEnded(self.market.address.clone())),
            TradeState::Submitting(_) => return Err(TradeError::SubmissionInProgress),
            TradeState::Idle => return Err(TradeError::NoSideSelected),
            TradeState::SideSelected(side) => side,
        };

        let request = build_request(&self.draft)?;
        debug!("Submitting {:?} on {}", request, self.market.address);
        self.state = TradeState::Submitting(side);
        Ok(request)
    }

    /// Leave `Submitting` whatever the outcome: quantity and side are cleared.
    pub fn complete_submit(&mut self) {
        self.draft.quantity.clear();
        self.draft.side = None;
        self.state = if self.market.is_ended() {
            TradeState::Closed
        } else {
            TradeState::Idle
        };
    }

    pub async fn confirm(&mut self, trader: &Trader) -> Result<ExecutionEffects, TradeError> {
        let request = self.begin_submit()?;
        let result = trader.submit(&self.market, &request).await;
        self.complete_submit();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::tests::market;
    use crate::execution::trader::tests::{index_with_coins, trader, RejectingWallet, FAR_FUTURE};
    use crate::execution::wallet::DryRunWallet;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn open_flow() -> TradeFlow {
        TradeFlow::new(market("0xm", FAR_FUTURE))
    }

    #[test]
    fn test_estimate_hidden_until_side_and_amount() {
        let mut flow = open_flow();
        assert_eq!(flow.state(), TradeState::Idle);
        assert!(flow.estimate().is_none());
        assert!(!flow.set_quantity("10"));

        assert!(flow.select_side(Side::Yes));
        assert!(!flow.estimate_visible());

        flow.set_quantity("100");
        assert!(flow.estimate_visible());
        assert_eq!(flow.estimate().unwrap().total, "27.5000");
    }

    #[test]
    fn test_order_type_toggle_preserves_inputs() {
        let mut flow = open_flow();
        flow.select_side(Side::No);
        flow.set_quantity("12");
        flow.set_order_type(OrderType::Limit);
        flow.set_limit_price("0.4");
        flow.set_order_type(OrderType::Market);
        flow.set_order_type(OrderType::Limit);

        assert_eq!(flow.draft().quantity, "12");
        assert_eq!(flow.draft().limit_price, "0.4");
        assert_eq!(flow.estimate().unwrap().total, "4.8000");
    }

    #[test]
    fn test_ended_market_is_closed() {
        let mut flow = TradeFlow::new(market("0xm", 1_000));
        let now = Utc::now();

        assert_eq!(flow.state(), TradeState::Closed);
        assert!(!flow.select_side(Side::Yes));
        assert!(!flow.set_order_type(OrderType::Limit));
        assert!(flow.estimate().is_none());
        assert!(matches!(flow.begin_submit(), Err(TradeError::MarketEnded(_))));
        assert_eq!(
            flow.controls(now),
            Controls {
                trading: false,
                add_liquidity: true,
                resolve: true,
            }
        );
    }

    #[test]
    fn test_clock_closes_open_flow() {
        let mut flow = TradeFlow::new_at(market("0xm", 2_000), Utc.timestamp_millis_opt(0).unwrap());
        flow.select_side(Side::Yes);

        assert_eq!(flow.refresh_clock(Utc::now()), TradeState::Closed);
        assert!(!flow.set_quantity("1"));
    }

    #[test]
    fn test_input_error_keeps_draft() {
        let mut flow = open_flow();
        flow.select_side(Side::Yes);
        flow.set_quantity("2.5");

        assert!(matches!(flow.begin_submit(), Err(TradeError::InvalidQuantity(_))));
        assert_eq!(flow.state(), TradeState::SideSelected(Side::Yes));
        assert_eq!(flow.draft().quantity, "2.5");
    }

    #[test]
    fn test_second_submit_is_refused() {
        let mut flow = open_flow();
        flow.select_side(Side::Yes);
        flow.set_quantity("3");

        assert!(flow.begin_submit().is_ok());
        assert_eq!(flow.state(), TradeState::Submitting(Side::Yes));
        assert!(matches!(flow.begin_submit(), Err(TradeError::SubmissionInProgress)));

        flow.complete_submit();
        assert_eq!(flow.state(), TradeState::Idle);
    }

    #[tokio::test]
    async fn test_confirm_clears_amount_and_side_on_success() {
        let wallet = Arc::new(DryRunWallet::new(Some("0xa11ce".to_string())));
        let t = trader(index_with_coins(&[100_000_000_000]), wallet.clone());
        let mut flow = open_flow();
        flow.select_side(Side::Yes);
        flow.set_quantity("10");

        let effects = flow.confirm(&t).await.unwrap();

        assert!(effects.success);
        assert_eq!(wallet.submitted().len(), 1);
        assert_eq!(flow.state(), TradeState::Idle);
        assert_eq!(flow.draft().side, None);
        assert!(flow.draft().quantity.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_clears_amount_and_side_on_failure() {
        let t = trader(index_with_coins(&[100_000_000_000]), Arc::new(RejectingWallet));
        let mut flow = open_flow();
        flow.select_side(Side::No);
        flow.set_order_type(OrderType::Limit);
        flow.set_quantity("10");
        flow.set_limit_price("0.3");

        assert!(matches!(flow.confirm(&t).await, Err(TradeError::Rejected { .. })));
        assert_eq!(flow.state(), TradeState::Idle);
        assert_eq!(flow.draft().side, None);
        assert!(flow.draft().quantity.is_empty());
        assert_eq!(flow.draft().order_type, OrderType::Limit);
        assert_eq!(flow.draft().limit_price, "0.3");
    }

    #[tokio::test]
    async fn test_confirm_without_wallet_still_resets() {
        let t = trader(index_with_coins(&[1]), Arc::new(DryRunWallet::new(None)));
        let mut flow = open_flow();
        flow.select_side(Side::Yes);
        flow.set_quantity("1");

        assert!(matches!(flow.confirm(&t).await, Err(TradeError::NoWallet)));
        assert_eq!(flow.state(), TradeState::Idle);
    }
}
