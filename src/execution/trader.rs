use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::config::{LiquidityConfig, PackageConfig};
use crate::data::graphql::MarketIndex;
use crate::data::store::AppState;
use crate::data::types::{Market, Side};
use crate::execution::errors::TradeError;
use crate::execution::moves::{self, OrderParams};
use crate::execution::tx::{Argument, Transaction, TransactionBuilder};
use crate::execution::types::{ExecutionEffects, OrderRequest};
use crate::execution::wallet::Wallet;
use crate::monitoring::logger::{CsvLogger, SubmissionRecord};

/// Outcome of the resolve affordance. Resolution itself runs in the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveIntent {
    pub market: String,
    pub requested_at: DateTime<Utc>,
    pub market_ended: bool,
}

/// Builds funded transactions for the connected account and hands them to the wallet.
pub struct Trader {
    state: Arc<AppState>,
    index: Arc<dyn MarketIndex>,
    wallet: Arc<dyn Wallet>,
    packages: PackageConfig,
    liquidity: LiquidityConfig,
    journal: Option<CsvLogger>,
}

impl Trader {
    pub fn new(
        state: Arc<AppState>,
        index: Arc<dyn MarketIndex>,
        wallet: Arc<dyn Wallet>,
        packages: PackageConfig,
        liquidity: LiquidityConfig,
    ) -> Self {
        Self {
            state,
            index,
            wallet,
            packages,
            liquidity,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: CsvLogger) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn address(&self) -> Option<String> {
        self.wallet.address().filter(|a| !a.is_empty())
    }

    fn owner(&self) -> Result<String, TradeError> {
        self.address().ok_or(TradeError::NoWallet)
    }

    /// Start a transaction whose first command merges all USDC into the largest coin.
    async fn funded_builder(&self, owner: &str, need: u64) -> Result<(TransactionBuilder, Argument), TradeError> {
        let holdings = self.state.refresh_holdings(&*self.index, owner).await?;
        let coins = holdings.funding_coins();

        let primary = match coins.first() {
            Some(coin) => Argument::object(&coin.object_id),
            None => return Err(TradeError::NoFundingCoin(owner.to_string())),
        };

        let have = holdings.total_usdc();
        if have < need {
            return Err(TradeError::InsufficientFunds { need, have });
        }

        let mut tb = TransactionBuilder::new(owner)?;
        let rest = coins[1..].iter().map(|c| Argument::object(&c.object_id)).collect();
        tb.merge_coins(primary.clone(), rest);

        Ok((tb, primary))
    }

    async fn execute(&self, tx: &Transaction) -> Result<ExecutionEffects, TradeError> {
        let effects = self.wallet.sign_and_execute(tx).await?;

        if effects.success {
            info!("Transaction {} executed ({} commands)", effects.digest, tx.commands.len());
            Ok(effects)
        } else {
            let reason = effects.error.unwrap_or_else(|| "unknown failure".to_string());
            error!("Transaction {} failed: {}", effects.digest, reason);
            Err(TradeError::Rejected {
                digest: effects.digest,
                reason,
            })
        }
    }

    /// Execute a composed order against `market`.
    pub async fn submit(&self, market: &Market, request: &OrderRequest) -> Result<ExecutionEffects, TradeError> {
        let side = request.side();
        let (action, quantity, price) = match request {
            OrderRequest::MarketBuy { quantity, .. } => ("buy", *quantity, market.fixed_price(side)),
            OrderRequest::LimitOrder { amount, price, .. } => ("limit", *amount, Some(*price)),
        };

        let result = self.submit_inner(market, request).await;
        if let Err(e) = &result {
            warn!("{} {} on {} not executed: {}", action, side, market.address, e);
        }
        self.record(&market.address, action, Some(side), Some(quantity), price, &result);
        result
    }

    async fn submit_inner(&self, market: &Market, request: &OrderRequest) -> Result<ExecutionEffects, TradeError> {
        if market.is_ended() {
            return Err(TradeError::MarketEnded(market.address.clone()));
        }
        let owner = self.owner()?;

        let tx = match request {
            OrderRequest::MarketBuy { side, quantity } => {
                let price = market
                    .fixed_price(*side)
                    .ok_or_else(|| TradeError::NoMarketPrice(market.address.clone(), *side))?;
                let cost = u64::try_from(*quantity as u128 * price as u128)
                    .map_err(|_| TradeError::InvalidQuantity(quantity.to_string()))?;

                let (mut tb, primary) = self.funded_builder(&owner, cost).await?;
                let payment = tb.split_coin(primary, cost);
                moves::buy(&mut tb, &self.packages, &market.address, *side, payment, *quantity);
                tb.finish()
            }
            OrderRequest::LimitOrder { side, amount, price } => {
                let (mut tb, primary) = self.funded_builder(&owner, *amount).await?;
                let coin = tb.split_coin(primary, *amount);
                let params = OrderParams {
                    amount: *amount,
                    price: *price,
                    is_bid: true,
                    side: *side,
                    expiry: 0,
                    salt: new_salt(),
                };
                moves::create_order(&mut tb, &self.packages, &owner, &market.address, &params, coin);
                tb.finish()
            }
        };

        self.execute(&tx).await
    }

    /// Seed the pool and both sides of the book. Stays available after the market ends.
    pub async fn add_liquidity(&self, market: &Market) -> Result<ExecutionEffects, TradeError> {
        let result = self.add_liquidity_inner(market).await;
        if let Err(e) = &result {
            warn!("Add liquidity on {} not executed: {}", market.address, e);
        }
        self.record(
            &market.address,
            "add_liquidity",
            None,
            Some(self.liquidity.lp_amount),
            Some(self.liquidity.seed_order_price),
            &result,
        );
        result
    }

    async fn add_liquidity_inner(&self, market: &Market) -> Result<ExecutionEffects, TradeError> {
        let owner = self.owner()?;
        let cfg = &self.liquidity;
        let need = cfg.lp_amount.saturating_add(cfg.seed_order_amount.saturating_mul(2));

        let (mut tb, primary) = self.funded_builder(&owner, need).await?;
        let lp_coin = tb.split_coin(primary.clone(), cfg.lp_amount);
        let yes_coin = tb.split_coin(primary.clone(), cfg.seed_order_amount);
        let no_coin = tb.split_coin(primary, cfg.seed_order_amount);

        moves::provide_liquidity(&mut tb, &self.packages, &market.address, lp_coin, cfg.lp_amount);
        for (side, coin) in [(Side::Yes, yes_coin), (Side::No, no_coin)] {
            let params = OrderParams {
                amount: cfg.seed_order_amount,
                price: cfg.seed_order_price,
                is_bid: true,
                side,
                expiry: 0,
                salt: new_salt(),
            };
            moves::create_order(&mut tb, &self.packages, &owner, &market.address, &params, coin);
        }

        self.execute(&tb.finish()).await
    }

    pub fn resolve(&self, market: &Market) -> ResolveIntent {
        info!("Resolve requested for market {}", market.address);
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.log_event(&market.address, "resolve requested") {
                warn!("Failed to write trade journal: {:#}", e);
            }
        }

        ResolveIntent {
            market: market.address.clone(),
            requested_at: Utc::now(),
            market_ended: market.is_ended(),
        }
    }

    pub async fn create_market(
        &self,
        topic: &str,
        description: &str,
        start_time: u64,
        end_time: u64,
    ) -> Result<ExecutionEffects, TradeError> {
        let owner = self.owner()?;
        if topic.trim().is_empty() {
            return Err(anyhow::anyhow!("Market topic is empty").into());
        }
        if end_time <= start_time {
            return Err(anyhow::anyhow!("End time {} is not after start time {}", end_time, start_time).into());
        }

        let mut tb = TransactionBuilder::new(&owner)?;
        moves::create_market(&mut tb, &self.packages, topic, description, start_time, end_time);

        let result = self.execute(&tb.finish()).await;
        self.record("", "create_market", None, None, None, &result);
        result
    }

    /// Register resolution code and its prompt blob with the oracle.
    pub async fn create_oracle_config(&self, code_hash: &str, blob_id: &str) -> Result<ExecutionEffects, TradeError> {
        let owner = self.owner()?;

        let mut tb = TransactionBuilder::new(&owner)?;
        moves::create_oracle(&mut tb, &self.packages, code_hash, blob_id);

        let result = self.execute(&tb.finish()).await;
        self.record("", "create_oracle_config", None, None, None, &result);
        result
    }

    fn record(
        &self,
        market: &str,
        action: &str,
        side: Option<Side>,
        quantity: Option<u64>,
        price: Option<u64>,
        result: &Result<ExecutionEffects, TradeError>,
    ) {
        if let Some(journal) = &self.journal {
            let (digest, status) = match result {
                Ok(effects) => (Some(effects.digest.clone()), "ok".to_string()),
                Err(TradeError::Rejected { digest, reason }) => (Some(digest.clone()), format!("failed: {}", reason)),
                Err(e) => (None, format!("error: {}", e)),
            };

            let record = SubmissionRecord {
                timestamp: Utc::now(),
                market: market.to_string(),
                action: action.to_string(),
                side: side.map(|s| s.label().to_string()),
                quantity,
                price,
                digest,
                status,
            };
            if let Err(e) = journal.log_submission(&record) {
                warn!("Failed to write trade journal: {:#}", e);
            }
        }
    }
}

/// Nonce distinguishing otherwise identical orders.
fn new_salt() -> u64 {
    rand::thread_rng().gen()
}
