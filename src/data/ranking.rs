use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::data::normalize::fixed_to_decimal;
use crate::data::types::{BuyerRankEntry, Side};

/// Entries shown per side.
pub const RANKING_DISPLAY_LIMIT: usize = 10;

#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn fetch_buyers(&self, market: &str, side: Side) -> Result<Vec<BuyerRankEntry>>;
}

pub struct RankingClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BuyersResponse {
    #[serde(default)]
    buyers: Vec<BuyerRankEntry>,
}

impl RankingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn buyers_url(&self, market: &str, side: Side) -> String {
        let side = match side {
            Side::Yes => "Yes",
            Side::No => "No",
        };
        format!("{}/api/market/{}/buyers?side={}", self.base_url, market, side)
    }
}

#[async_trait]
impl RankingSource for RankingClient {
    async fn fetch_buyers(&self, market: &str, side: Side) -> Result<Vec<BuyerRankEntry>> {
        let response: BuyersResponse = self.client
            .get(self.buyers_url(market, side))
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} buyers", side))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} buyers", side))?;

        Ok(response.buyers)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rankings {
    pub yes: Vec<BuyerRankEntry>,
    pub no: Vec<BuyerRankEntry>,
}

impl Rankings {
    pub fn side(&self, side: Side) -> &[BuyerRankEntry] {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }

    /// The leading entries as displayed, in server order.
    pub fn top(&self, side: Side) -> &[BuyerRankEntry] {
        let entries = self.side(side);
        &entries[..entries.len().min(RANKING_DISPLAY_LIMIT)]
    }
}

pub fn display_amount(entry: &BuyerRankEntry) -> f64 {
    fixed_to_decimal(entry.buy_amount)
}

/// Both sides are requested together and must both succeed.
pub async fn fetch_rankings(source: &dyn RankingSource, market: &str) -> Result<Rankings> {
    let (yes, no) = tokio::try_join!(
        source.fetch_buyers(market, Side::Yes),
        source.fetch_buyers(market, Side::No),
    )?;

    Ok(Rankings { yes, no })
}

/// Ranking panel; refetches only when the viewed market changes.
pub struct RankingPanel {
    source: Arc<dyn RankingSource>,
    market: Option<String>,
    rankings: Rankings,
}

impl RankingPanel {
    pub fn new(source: Arc<dyn RankingSource>) -> Self {
        Self {
            source,
            market: None,
            rankings: Rankings::default(),
        }
    }

    /// Show rankings for `market`. Returns whether a fetch happened.
    ///
    /// A failed fetch leaves the panel empty for the new market; the error is
    /// returned to the caller.
    pub async fn show(&mut self, market: &str) -> Result<bool> {
        if market.is_empty() || self.market.as_deref() == Some(market) {
            return Ok(false);
        }

        self.market = Some(market.to_string());
        self.rankings = Rankings::default();

        match fetch_rankings(&*self.source, market).await {
            Ok(rankings) => {
                info!(
                    "Rankings for {}: {} YES holders, {} NO holders",
                    market,
                    rankings.yes.len(),
                    rankings.no.len()
                );
                self.rankings = rankings;
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to fetch buyer rankings for {}: {:#}", market, e);
                self.market = None;
                Err(e)
            }
        }
    }

    pub fn rankings(&self) -> &Rankings {
        &self.rankings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry(address: &str, amount: u64) -> BuyerRankEntry {
        BuyerRankEntry {
            address: address.to_string(),
            buy_amount: amount,
            last_buy_time: Utc.timestamp_opt(0, 0).unwrap(),
            transaction_count: 1,
        }
    }

    struct FakeRanking {
        calls: AtomicUsize,
        fail_no: bool,
        yes_count: usize,
    }

    #[async_trait]
    impl RankingSource for FakeRanking {
        async fn fetch_buyers(&self, _market: &str, side: Side) -> Result<Vec<BuyerRankEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match side {
                Side::Yes => Ok((0..self.yes_count)
                    .map(|i| entry(&format!("0xy{}", i), 1_000_000_000 * (i as u64 + 1)))
                    .collect()),
                Side::No if self.fail_no => anyhow::bail!("no side down"),
                Side::No => Ok(vec![entry("0xn", 2_500_000_000)]),
            }
        }
    }

    fn source(fail_no: bool, yes_count: usize) -> Arc<FakeRanking> {
        Arc::new(FakeRanking {
            calls: AtomicUsize::new(0),
            fail_no,
            yes_count,
        })
    }

    #[tokio::test]
    async fn test_fetch_is_all_or_nothing() {
        let failing = source(true, 3);
        assert!(fetch_rankings(&*failing, "0xm").await.is_err());

        let mut panel = RankingPanel::new(failing);
        assert!(panel.show("0xm").await.is_err());
        assert_eq!(panel.rankings(), &Rankings::default());
    }

    #[tokio::test]
    async fn test_panel_fetches_once_per_market() {
        let src = source(false, 2);
        let mut panel = RankingPanel::new(src.clone());

        assert!(panel.show("0xm").await.unwrap());
        assert!(!panel.show("0xm").await.unwrap());
        assert_eq!(src.calls.load(Ordering::SeqCst), 2);

        assert!(panel.show("0xother").await.unwrap());
        assert_eq!(src.calls.load(Ordering::SeqCst), 4);
        assert_eq!(display_amount(&panel.rankings().no[0]), 2.5);
    }

    #[tokio::test]
    async fn test_top_is_capped() {
        let src = source(false, 14);
        let rankings = fetch_rankings(&*src, "0xm").await.unwrap();

        assert_eq!(rankings.yes.len(), 14);
        assert_eq!(rankings.top(Side::Yes).len(), RANKING_DISPLAY_LIMIT);
        assert_eq!(rankings.top(Side::No).len(), 1);
    }

    /// Each side only answers once the other side's request is also in flight.
    struct LockstepRanking {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl RankingSource for LockstepRanking {
        async fn fetch_buyers(&self, _market: &str, side: Side) -> Result<Vec<BuyerRankEntry>> {
            self.barrier.wait().await;
            Ok(vec![entry(&format!("0x{}", side), 1_000_000_000)])
        }
    }

    #[tokio::test]
    async fn test_both_sides_are_requested_together() {
        let src = LockstepRanking {
            barrier: tokio::sync::Barrier::new(2),
        };

        let rankings = tokio::time::timeout(Duration::from_secs(2), fetch_rankings(&src, "0xm"))
            .await
            .expect("YES and NO requests must be in flight at the same time")
            .unwrap();

        assert_eq!(rankings.yes[0].address, "0xYES");
        assert_eq!(rankings.no[0].address, "0xNO");
    }

    #[test]
    fn test_buyers_url() {
        let client = RankingClient::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.buyers_url("0xm", Side::No),
            "http://localhost:3000/api/market/0xm/buyers?side=No"
        );
    }
}
