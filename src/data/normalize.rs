use chrono::{DateTime, Utc};
use crate::data::types::{Market, Side};

/// On-chain prices and balances are fixed-point with nine decimals.
pub const PRICE_SCALE: f64 = 1e9;

pub fn fixed_to_decimal(raw: u64) -> f64 {
    raw as f64 / PRICE_SCALE
}

/// Decimal price per share for one side, `None` when the market has no price.
pub fn side_price(market: &Market, side: Side) -> Option<f64> {
    market.fixed_price(side).map(fixed_to_decimal)
}

/// Share of total volume, rounded to the nearest whole percent.
pub fn percentage(value: u64, total: u64) -> u32 {
    share(value, total as u128)
}

fn share(value: u64, total: u128) -> u32 {
    if total == 0 {
        return 0;
    }
    ((value as f64 / total as f64) * 100.0).round() as u32
}

/// (YES %, NO %) of cumulative volume; both 0 on an empty market.
pub fn volume_percentages(yes: u64, no: u64) -> (u32, u32) {
    let total = yes as u128 + no as u128;
    (share(yes, total), share(no, total))
}

pub fn market_percentages(market: &Market) -> (u32, u32) {
    volume_percentages(market.yes, market.no)
}

pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("{}", p),
        None => "-".to_string(),
    }
}

pub fn format_pool(balance: u64) -> String {
    format!("{:.2} U", fixed_to_decimal(balance))
}

/// "Y: 0.275 | N: 0.725"
pub fn format_current_prices(market: &Market) -> String {
    format!(
        "Y: {:.3} | N: {:.3}",
        side_price(market, Side::Yes).unwrap_or(0.0),
        side_price(market, Side::No).unwrap_or(0.0)
    )
}

/// Time left until `end_time` (ms), coarsest two units.
pub fn format_countdown(end_time: u64, now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis().max(0) as u64;
    if end_time <= now_ms {
        return "Ended".to_string();
    }

    let left = end_time - now_ms;
    let day = 24 * 60 * 60 * 1000;
    let hour = 60 * 60 * 1000;
    let minute = 60 * 1000;

    let days = left / day;
    let hours = (left % day) / hour;
    let minutes = (left % hour) / minute;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// "0x1234...abcd"; short addresses are returned untouched.
pub fn short_address(address: &str) -> String {
    if address.len() > 10 && address.is_ascii() {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}
