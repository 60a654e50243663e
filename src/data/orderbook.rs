//! Display-only order book.
//!
//! There is no live book behind this: levels are static illustrative data and
//! nothing here matches or routes orders.

use crate::data::types::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderLevel {
    /// Price tier in cents.
    pub price: u32,
    pub shares: f64,
    /// Aggregate notional in USDC.
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookSide {
    /// Best ask first.
    pub asks: Vec<OrderLevel>,
    /// Best bid first.
    pub bids: Vec<OrderLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSummary {
    pub best_ask: Option<u32>,
    pub best_bid: Option<u32>,
    pub last: Option<u32>,
    pub spread: Option<u32>,
}

const fn level(price: u32, shares: f64, total: f64) -> OrderLevel {
    OrderLevel { price, shares, total }
}

const YES_ASKS: [OrderLevel; 5] = [
    level(18, 49375.6, 112220.1),
    level(17, 128698.21, 103332.49),
    level(16, 196494.86, 81453.79),
    level(15, 245533.96, 50014.61),
    level(14, 94175.14, 13184.52),
];

const YES_BIDS: [OrderLevel; 5] = [
    level(13, 33857.25, 4401.44),
    level(12, 220154.23, 30819.95),
    level(11, 200509.39, 52875.98),
    level(10, 85210.14, 61396.99),
    level(9, 44498.85, 65401.89),
];

const NO_ASKS: [OrderLevel; 3] = [
    level(78, 30000.0, 23400.0),
    level(77, 150000.0, 115500.0),
    level(76, 90000.0, 68400.0),
];

const NO_BIDS: [OrderLevel; 3] = [
    level(75, 45000.0, 33750.0),
    level(74, 120000.0, 88800.0),
    level(73, 80000.0, 58400.0),
];

pub fn illustrative_book(side: Side) -> BookSide {
    match side {
        Side::Yes => BookSide {
            asks: YES_ASKS.to_vec(),
            bids: YES_BIDS.to_vec(),
        },
        Side::No => BookSide {
            asks: NO_ASKS.to_vec(),
            bids: NO_BIDS.to_vec(),
        },
    }
}

impl BookSide {
    pub fn summary(&self) -> BookSummary {
        let best_ask = self.asks.first().map(|l| l.price);
        let best_bid = self.bids.first().map(|l| l.price);
        let spread = match (best_ask, best_bid) {
            (Some(ask), Some(bid)) => Some(ask.saturating_sub(bid)),
            _ => None,
        };

        BookSummary {
            best_ask,
            best_bid,
            last: best_bid.or(best_ask),
            spread,
        }
    }
}

/// "14¢", or "--" when there is no price.
pub fn format_cents(price: Option<u32>) -> String {
    match price {
        Some(p) => format!("{}¢", p),
        None => "--".to_string(),
    }
}

/// Up to two decimals with thousands separators, trailing zeros dropped.
pub fn format_amount(n: f64) -> String {
    let rounded = format!("{:.2}", n);
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_book_summary() {
        let summary = illustrative_book(Side::Yes).summary();

        assert_eq!(summary.best_ask, Some(18));
        assert_eq!(summary.best_bid, Some(13));
        assert_eq!(summary.last, Some(13));
        assert_eq!(summary.spread, Some(5));
    }

    #[test]
    fn test_one_sided_book() {
        let book = BookSide {
            asks: vec![level(40, 1.0, 0.4)],
            bids: vec![],
        };
        let summary = book.summary();

        assert_eq!(summary.last, Some(40));
        assert_eq!(summary.spread, None);
        assert_eq!(format_cents(summary.spread), "--");
        assert_eq!(format_cents(summary.last), "40¢");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(49375.6), "49,375.6");
        assert_eq!(format_amount(112220.1), "112,220.1");
        assert_eq!(format_amount(30000.0), "30,000");
        assert_eq!(format_amount(999.999), "1,000");
        assert_eq!(format_amount(12.5), "12.5");
    }
}
