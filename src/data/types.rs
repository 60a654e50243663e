use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

/// Outcome side of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Outcome flag as encoded in move-call arguments (YES = 1, NO = 0).
    pub fn as_flag(self) -> u8 {
        match self {
            Side::Yes => 1,
            Side::No => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Yes => "YES",
            Side::No => "NO",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Side::Yes),
            "no" | "n" => Ok(Side::No),
            other => anyhow::bail!("Unknown side: {}", other),
        }
    }
}

/// A market object as read from the chain index. Never mutated client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub address: String,
    pub topic: String,
    pub description: String,
    /// Cumulative YES volume.
    pub yes: u64,
    /// Cumulative NO volume.
    pub no: u64,
    /// Milliseconds since the unix epoch.
    pub start_time: u64,
    /// Milliseconds since the unix epoch.
    pub end_time: u64,
    /// Pool balance, fixed-point 1e9.
    pub balance: u64,
    /// Fixed-point 1e9; `None` when the market carries no price for the side.
    pub yes_price: Option<u64>,
    pub no_price: Option<u64>,
    pub oracle_config: String,
}

impl Market {
    pub fn fixed_price(&self, side: Side) -> Option<u64> {
        let raw = match side {
            Side::Yes => self.yes_price,
            Side::No => self.no_price,
        };
        raw.filter(|p| *p > 0)
    }

    pub fn volume(&self, side: Side) -> u64 {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    pub fn is_ended_at(&self, now: DateTime<Utc>) -> bool {
        let now_ms = now.timestamp_millis().max(0) as u64;
        now_ms >= self.end_time
    }

    pub fn is_ended(&self) -> bool {
        self.is_ended_at(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned identifier, when the endpoint provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub address: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRankEntry {
    pub address: String,
    /// Fixed-point 1e9.
    pub buy_amount: u64,
    pub last_buy_time: DateTime<Utc>,
    pub transaction_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRef {
    pub object_id: String,
    pub balance: u64,
}

/// Funding coins held by one owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserHoldings {
    pub owner: String,
    pub usdc: Vec<CoinRef>,
}

impl UserHoldings {
    pub fn total_usdc(&self) -> u64 {
        self.usdc.iter().fold(0u64, |acc, c| acc.saturating_add(c.balance))
    }

    /// Largest coin first, so the primary coin can absorb the rest in a merge.
    pub fn funding_coins(&self) -> Vec<&CoinRef> {
        let mut coins: Vec<&CoinRef> = self.usdc.iter().collect();
        coins.sort_by(|a, b| b.balance.cmp(&a.balance));
        coins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn market(end_time: u64) -> Market {
        Market {
            address: "0xabc".to_string(),
            topic: "Will it rain?".to_string(),
            description: String::new(),
            yes: 0,
            no: 0,
            start_time: 0,
            end_time,
            balance: 0,
            yes_price: Some(0),
            no_price: Some(725_000_000),
            oracle_config: String::new(),
        }
    }

    #[test]
    fn test_market_ends_at_end_time() {
        let m = market(1_700_000_000_000);
        let before = Utc.timestamp_millis_opt(1_699_999_999_999).unwrap();
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        assert!(!m.is_ended_at(before));
        assert!(m.is_ended_at(at));
    }

    #[test]
    fn test_zero_price_is_no_price() {
        let m = market(0);
        assert_eq!(m.fixed_price(Side::Yes), None);
        assert_eq!(m.fixed_price(Side::No), Some(725_000_000));
    }

    #[test]
    fn test_total_usdc_saturates() {
        let holdings = UserHoldings {
            owner: "0x1".to_string(),
            usdc: vec![
                CoinRef { object_id: "0xc0".to_string(), balance: u64::MAX },
                CoinRef { object_id: "0xc1".to_string(), balance: 5 },
            ],
        };

        assert_eq!(holdings.total_usdc(), u64::MAX);
        assert_eq!(holdings.funding_coins()[0].object_id, "0xc0");
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("yes".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!("NO".parse::<Side>().unwrap(), Side::No);
        assert!("maybe".parse::<Side>().is_err());
    }

    #[test]
    fn test_buyer_entry_wire_format() {
        let json = r#"{"address":"0x1","buyAmount":2500000000,"lastBuyTime":"2025-01-02T03:04:05Z","transactionCount":3}"#;
        let entry: BuyerRankEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.buy_amount, 2_500_000_000);
        assert_eq!(entry.transaction_count, 3);
    }
}
