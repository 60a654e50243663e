use anyhow::Result;
use dashmap::DashMap;
use tracing::{info, warn};
use crate::data::graphql::MarketIndex;
use crate::data::types::{Market, UserHoldings};

/// Application state owned by the composition root and shared by reference.
///
/// Each map is only written by its own refresh function; readers always see
/// either the previous or the new entry for a key.
pub struct AppState {
    markets: DashMap<String, Market>,
    holdings: DashMap<String, UserHoldings>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            markets: DashMap::new(),
            holdings: DashMap::new(),
        }
    }

    /// Replace the market list, dropping markets the index no longer returns
    pub fn replace_markets(&self, markets: Vec<Market>) {
        let keep: std::collections::HashSet<String> =
            markets.iter().map(|m| m.address.clone()).collect();
        self.markets.retain(|address, _| keep.contains(address));

        for market in markets {
            self.markets.insert(market.address.clone(), market);
        }
    }

    /// Markets ordered by end time, soonest first.
    pub fn markets(&self) -> Vec<Market> {
        let mut list: Vec<Market> = self.markets.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| a.end_time.cmp(&b.end_time).then_with(|| a.address.cmp(&b.address)));
        list
    }

    pub fn market(&self, address: &str) -> Option<Market> {
        self.markets.get(address).map(|e| e.value().clone())
    }

    pub fn set_holdings(&self, holdings: UserHoldings) {
        self.holdings.insert(holdings.owner.clone(), holdings);
    }

    pub fn holdings(&self, owner: &str) -> Option<UserHoldings> {
        self.holdings.get(owner).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Refetch the market list. On failure the previous list stays in place.
    pub async fn refresh_markets(&self, index: &dyn MarketIndex) -> Result<usize> {
        match index.fetch_markets().await {
            Ok(markets) => {
                let count = markets.len();
                self.replace_markets(markets);
                info!("Market list refreshed: {} markets", count);
                Ok(count)
            }
            Err(e) => {
                warn!("Market refresh failed, keeping {} cached markets: {:#}", self.len(), e);
                Err(e)
            }
        }
    }

    pub async fn refresh_holdings(&self, index: &dyn MarketIndex, owner: &str) -> Result<UserHoldings> {
        match index.fetch_holdings(owner).await {
            Ok(holdings) => {
                self.set_holdings(holdings.clone());
                Ok(holdings)
            }
            Err(e) => {
                warn!("Holdings refresh failed for {}: {:#}", owner, e);
                Err(e)
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub(crate) fn market(address: &str, end_time: u64) -> Market {
        Market {
            address: address.to_string(),
            topic: format!("Market {}", address),
            description: String::new(),
            yes: 300,
            no: 100,
            start_time: 0,
            end_time,
            balance: 0,
            yes_price: Some(275_000_000),
            no_price: Some(725_000_000),
            oracle_config: String::new(),
        }
    }

    /// In-memory index; `None` markets makes every market fetch fail.
    pub(crate) struct FakeIndex {
        pub markets: Mutex<Option<Vec<Market>>>,
        pub holdings: Mutex<Option<UserHoldings>>,
    }

    #[async_trait]
    impl MarketIndex for FakeIndex {
        async fn fetch_markets(&self) -> Result<Vec<Market>> {
            self.markets
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("index unavailable"))
        }

        async fn fetch_holdings(&self, owner: &str) -> Result<UserHoldings> {
            let holdings = self
                .holdings
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("index unavailable"))?;
            Ok(UserHoldings {
                owner: owner.to_string(),
                ..holdings
            })
        }
    }

    #[test]
    fn test_replace_drops_missing_markets() {
        let state = AppState::new();
        state.replace_markets(vec![market("0xa", 2), market("0xb", 1)]);
        state.replace_markets(vec![market("0xb", 1), market("0xc", 3)]);

        let addresses: Vec<String> = state.markets().into_iter().map(|m| m.address).collect();
        assert_eq!(addresses, vec!["0xb", "0xc"]);
        assert!(state.market("0xa").is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let state = AppState::new();
        let index = FakeIndex {
            markets: Mutex::new(Some(vec![market("0xa", 1)])),
            holdings: Mutex::new(None),
        };

        assert_eq!(state.refresh_markets(&index).await.unwrap(), 1);

        *index.markets.lock().unwrap() = None;
        assert!(state.refresh_markets(&index).await.is_err());
        assert_eq!(state.len(), 1);
    }
}
