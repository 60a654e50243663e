use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use crate::data::types::{CoinRef, Market, UserHoldings};

/// Read side of the chain index: market objects and funding coins.
#[async_trait]
pub trait MarketIndex: Send + Sync {
    async fn fetch_markets(&self) -> Result<Vec<Market>>;

    async fn fetch_holdings(&self, owner: &str) -> Result<UserHoldings>;
}

const MARKETS_QUERY: &str = r#"
query Markets($type: String!) {
  objects(filter: { type: $type }) {
    nodes {
      address
      digest
      asMoveObject {
        contents {
          json
        }
      }
    }
  }
}
"#;

const COINS_QUERY: &str = r#"
query Coins($owner: SuiAddress!, $type: String!) {
  address(address: $owner) {
    coins(type: $type) {
      nodes {
        address
        coinBalance
      }
    }
  }
}
"#;

pub struct SuiGraphqlClient {
    client: Client,
    endpoint: String,
    market_type: String,
    usdc_type: String,
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ObjectsData {
    objects: NodeList<ObjectNode>,
}

#[derive(Debug, Deserialize)]
struct NodeList<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectNode {
    address: String,
    #[allow(dead_code)]
    digest: Option<String>,
    as_move_object: Option<MoveObject>,
}

#[derive(Debug, Deserialize)]
struct MoveObject {
    contents: Option<MoveContents>,
}

#[derive(Debug, Deserialize)]
struct MoveContents {
    json: Value,
}

/// Field layout of the on-chain `market::Market` struct.
#[derive(Debug, Deserialize)]
struct MarketFields {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "de_u64")]
    yes: u64,
    #[serde(default, deserialize_with = "de_u64")]
    no: u64,
    #[serde(default, deserialize_with = "de_u64")]
    start_time: u64,
    #[serde(default, deserialize_with = "de_u64")]
    end_time: u64,
    #[serde(default, deserialize_with = "de_u64")]
    balance: u64,
    #[serde(default, rename = "yesprice", deserialize_with = "de_opt_u64")]
    yes_price: Option<u64>,
    #[serde(default, rename = "noprice", deserialize_with = "de_opt_u64")]
    no_price: Option<u64>,
    #[serde(default)]
    oracle_config: Value,
}

#[derive(Debug, Deserialize)]
struct CoinsData {
    address: Option<CoinOwner>,
}

#[derive(Debug, Deserialize)]
struct CoinOwner {
    coins: NodeList<CoinNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinNode {
    address: String,
    #[serde(default, deserialize_with = "de_u64")]
    coin_balance: u64,
}

impl SuiGraphqlClient {
    pub fn new(endpoint: String, market_package: &str, usdc_type: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            market_type: format!("{}::market::Market", market_package),
            usdc_type,
        })
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response: GraphqlResponse<T> = self.client
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .context("Failed to reach GraphQL endpoint")?
            .error_for_status()
            .context("GraphQL endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse GraphQL response")?;

        into_data(response)
    }
}

#[async_trait]
impl MarketIndex for SuiGraphqlClient {
    /// Fetch every market object of the configured package
    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let data: ObjectsData = self
            .query(MARKETS_QUERY, serde_json::json!({ "type": self.market_type }))
            .await?;

        let markets = convert_objects(data);
        debug!("Fetched {} markets", markets.len());
        Ok(markets)
    }

    async fn fetch_holdings(&self, owner: &str) -> Result<UserHoldings> {
        let data: CoinsData = self
            .query(
                COINS_QUERY,
                serde_json::json!({ "owner": owner, "type": self.usdc_type }),
            )
            .await?;

        Ok(convert_coins(owner, data))
    }
}

/// Partial data is still returned when the server also reports errors.
fn into_data<T>(response: GraphqlResponse<T>) -> Result<T> {
    for err in &response.errors {
        warn!("GraphQL error: {}", err.message);
    }

    match response.data {
        Some(data) => Ok(data),
        None => {
            let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
            anyhow::bail!("GraphQL query returned no data: {}", messages.join("; "))
        }
    }
}

fn convert_objects(data: ObjectsData) -> Vec<Market> {
    data.objects
        .nodes
        .into_iter()
        .filter_map(|node| {
            let address = node.address.clone();
            match convert_market(node) {
                Ok(market) => Some(market),
                Err(e) => {
                    warn!("Skipping market object {}: {}", address, e);
                    None
                }
            }
        })
        .collect()
}

/// Convert an indexed Move object into our Market type
fn convert_market(node: ObjectNode) -> Result<Market> {
    let json = node
        .as_move_object
        .and_then(|o| o.contents)
        .map(|c| c.json)
        .context("Object has no Move contents")?;

    let fields: MarketFields = serde_json::from_value(json).context("Unexpected market layout")?;

    let oracle_config = match fields.oracle_config {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };

    Ok(Market {
        address: node.address,
        topic: fields.topic,
        description: fields.description,
        yes: fields.yes,
        no: fields.no,
        start_time: fields.start_time,
        end_time: fields.end_time,
        balance: fields.balance,
        yes_price: fields.yes_price,
        no_price: fields.no_price,
        oracle_config,
    })
}

fn convert_coins(owner: &str, data: CoinsData) -> UserHoldings {
    let usdc = data
        .address
        .map(|a| a.coins.nodes)
        .unwrap_or_default()
        .into_iter()
        .map(|c| CoinRef {
            object_id: c.address,
            balance: c.coin_balance,
        })
        .collect();

    UserHoldings {
        owner: owner.to_string(),
        usdc,
    }
}

/// Move u64 values are rendered as strings; balances as `{ "value": "..." }`.
fn value_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        Value::Object(map) => map.get("value").and_then(value_to_u64),
        _ => None,
    }
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(0);
    }
    value_to_u64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected an unsigned integer, got {}", value)))
}

fn de_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    value_to_u64(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("expected an unsigned integer, got {}", value)))
}
