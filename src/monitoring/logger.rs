use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// One row of the trade journal.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub timestamp: DateTime<Utc>,
    pub market: String,
    /// buy, limit, add_liquidity, create_market, ...
    pub action: String,
    pub side: Option<String>,
    pub quantity: Option<u64>,
    pub price: Option<u64>,
    pub digest: Option<String>,
    /// ok, failed, or the error text
    pub status: String,
}

const HEADER: &str = "timestamp,market,action,side,quantity,price,digest,status";

/// Append-only CSV journal of trade actions.
pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    /// Open the journal, writing the header row when the file is new.
    pub fn new(log_path: String) -> Result<Self> {
        if !Path::new(&log_path).exists() {
            let mut file = File::create(&log_path)
                .with_context(|| format!("Failed to create trade journal: {}", log_path))?;
            writeln!(file, "{}", HEADER)?;
        }

        Ok(Self { log_path })
    }

    pub fn log_submission(&self, record: &SubmissionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open trade journal: {}", self.log_path))?;

        writeln!(
            file,
            "{},{},{},{},{},{},{},{}",
            record.timestamp.to_rfc3339(),
            record.market,
            record.action,
            record.side.as_deref().unwrap_or(""),
            record.quantity.map(|q| q.to_string()).unwrap_or_default(),
            record.price.map(|p| p.to_string()).unwrap_or_default(),
            record.digest.as_deref().unwrap_or(""),
            escape(&record.status)
        )?;

        Ok(())
    }

    /// Non-transaction action on `market`, such as a resolve request.
    pub fn log_event(&self, market: &str, event: &str) -> Result<()> {
        self.log_submission(&SubmissionRecord {
            timestamp: Utc::now(),
            market: market.to_string(),
            action: "event".to_string(),
            side: None,
            quantity: None,
            price: None,
            digest: None,
            status: event.to_string(),
        })
    }
}

/// Error texts may carry commas and quotes.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_rows() {
        let path = std::env::temp_dir().join(format!("nereus-journal-{}.csv", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        let logger = CsvLogger::new(path_str.clone()).unwrap();
        logger
            .log_submission(&SubmissionRecord {
                timestamp: Utc::now(),
                market: "0xm".to_string(),
                action: "buy".to_string(),
                side: Some("YES".to_string()),
                quantity: Some(10),
                price: Some(275_000_000),
                digest: Some("D1".to_string()),
                status: "failed: a, b".to_string(),
            })
            .unwrap();
        logger.log_event("0xm", "resolve requested").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].ends_with(",0xm,buy,YES,10,275000000,D1,\"failed: a, b\""));
        assert!(lines[2].ends_with(",0xm,event,,,,,resolve requested"));

        let _ = std::fs::remove_file(&path);
    }
}
