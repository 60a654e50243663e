use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use nereus_client::config::{Config, EnvConfig};
use nereus_client::data::blob::WalrusPublisher;
use nereus_client::data::chat::{ChatClient, ChatSession};
use nereus_client::data::graphql::{MarketIndex, SuiGraphqlClient};
use nereus_client::data::normalize::{
    format_countdown, format_current_prices, format_pool, market_percentages, short_address,
};
use nereus_client::data::orderbook::{format_amount, format_cents, illustrative_book};
use nereus_client::data::ranking::{display_amount, RankingClient, RankingPanel};
use nereus_client::data::store::AppState;
use nereus_client::data::types::{Market, Side};
use nereus_client::execution::flow::{controls, TradeFlow};
use nereus_client::execution::trader::Trader;
use nereus_client::execution::types::OrderType;
use nereus_client::execution::wallet::{DryRunWallet, RelayWallet, Wallet};
use nereus_client::monitoring::logger::CsvLogger;

#[derive(Parser)]
#[command(name = "nereus", version, about = "Nereus prediction market client")]
struct Cli {
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List markets with prices, volume split and time left
    Markets,
    /// Estimate an order without submitting it
    Quote(OrderArgs),
    /// Submit a market buy, or a limit order when --limit is given
    Buy(OrderArgs),
    /// Seed a market's pool and both sides of its book
    AddLiquidity { market: String },
    /// Record a resolve request for a market
    Resolve { market: String },
    /// Show a market's chat, optionally posting first
    Chat {
        market: String,
        #[arg(long)]
        send: Option<String>,
        /// Keep polling until interrupted
        #[arg(long)]
        follow: bool,
    },
    /// Top buyers per side
    Rankings { market: String },
    /// Illustrative order book
    Book {
        #[arg(long, default_value = "yes")]
        side: Side,
    },
    /// Store a resolution prompt, optionally registering an oracle config for it
    UploadPrompt {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        code_hash: Option<String>,
    },
    /// Create a market open for --hours from --start
    CreateMarket {
        topic: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Start time in ms since the epoch; defaults to now
        #[arg(long)]
        start: Option<u64>,
        #[arg(long, default_value_t = 24)]
        hours: u64,
    },
}

#[derive(clap::Args)]
struct OrderArgs {
    market: String,
    #[arg(long)]
    side: Side,
    #[arg(long)]
    quantity: String,
    /// Limit price per share; switches to a LIMIT order
    #[arg(long)]
    limit: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    info!("🚀 Nereus client starting...");

    let env_config = EnvConfig::load()?;
    let mut config = Config::load(&cli.config)?;
    config.apply_env(&env_config);

    info!("Dry run mode: {}", config.system.dry_run);
    info!("GraphQL endpoint: {}", config.network.graphql_url);

    let timeout = config.network.request_timeout();
    let state = Arc::new(AppState::new());
    let index: Arc<dyn MarketIndex> = Arc::new(SuiGraphqlClient::new(
        config.network.graphql_url.clone(),
        &config.packages.market,
        config.packages.usdc_type.clone(),
        timeout,
    )?);

    match cli.command {
        Command::Markets => {
            state.refresh_markets(&*index).await?;
            print_markets(&state.markets());
        }
        Command::Quote(args) => {
            let market = load_market(&state, &*index, &args.market).await?;
            let flow = order_flow(market, &args)?;
            print_estimate(&flow)?;
        }
        Command::Buy(args) => {
            let market = load_market(&state, &*index, &args.market).await?;
            let trader = build_trader(&config, &env_config, state.clone(), index.clone())?;
            let mut flow = order_flow(market, &args)?;
            print_estimate(&flow)?;

            let effects = flow.confirm(&trader).await?;
            println!("Submitted: {}", effects.digest);
        }
        Command::AddLiquidity { market } => {
            let market = load_market(&state, &*index, &market).await?;
            let trader = build_trader(&config, &env_config, state.clone(), index.clone())?;

            let effects = trader.add_liquidity(&market).await?;
            println!("Liquidity added: {}", effects.digest);
        }
        Command::Resolve { market } => {
            let market = load_market(&state, &*index, &market).await?;
            let trader = build_trader(&config, &env_config, state.clone(), index.clone())?;

            let intent = trader.resolve(&market);
            println!(
                "Resolve requested for {} at {} (ended: {})",
                intent.market,
                intent.requested_at.to_rfc3339(),
                intent.market_ended
            );
        }
        Command::Chat { market, send, follow } => {
            let api = Arc::new(ChatClient::new(&config.network.app_url, timeout)?);
            run_chat(api, &market, send, follow, &config, &env_config).await?;
        }
        Command::Rankings { market } => {
            let mut panel = RankingPanel::new(Arc::new(RankingClient::new(&config.network.app_url, timeout)?));
            panel.show(&market).await?;

            for side in [Side::Yes, Side::No] {
                println!("{} buyers", side);
                for (rank, entry) in panel.rankings().top(side).iter().enumerate() {
                    println!(
                        "  {:>2}. {}  {:.2} U  ({} trades)",
                        rank + 1,
                        short_address(&entry.address),
                        display_amount(entry),
                        entry.transaction_count
                    );
                }
            }
        }
        Command::Book { side } => {
            let book = illustrative_book(side);
            let summary = book.summary();

            println!("{:>8} {:>14} {:>14}", "PRICE", "SHARES", "TOTAL");
            for level in book.asks.iter().chain(book.bids.iter()) {
                println!(
                    "{:>8} {:>14} {:>14}",
                    format_cents(Some(level.price)),
                    format_amount(level.shares),
                    format_amount(level.total)
                );
            }
            println!(
                "Last {}  Spread {}",
                format_cents(summary.last),
                format_cents(summary.spread)
            );
        }
        Command::UploadPrompt { prompt, title, code_hash } => {
            let publisher = WalrusPublisher::new(
                &config.network.walrus_publisher_url,
                config.walrus.epochs,
                config.walrus.deletable,
                timeout,
            )?;
            let upload = publisher.upload_prompt(&title, &prompt).await?;
            println!("Blob: {} (object {})", upload.blob_id, upload.id.as_deref().unwrap_or("-"));

            if let Some(code_hash) = code_hash {
                let trader = build_trader(&config, &env_config, state.clone(), index.clone())?;
                let effects = trader.create_oracle_config(&code_hash, &upload.blob_id).await?;
                println!("Oracle config created: {}", effects.digest);
            }
        }
        Command::CreateMarket { topic, description, start, hours } => {
            let start = start.unwrap_or_else(|| Utc::now().timestamp_millis().max(0) as u64);
            let end = start.saturating_add(hours.saturating_mul(60 * 60 * 1000));
            let trader = build_trader(&config, &env_config, state.clone(), index.clone())?;

            let effects = trader.create_market(&topic, &description, start, end).await?;
            println!("Market created: {}", effects.digest);
        }
    }

    Ok(())
}

fn build_trader(
    config: &Config,
    env: &EnvConfig,
    state: Arc<AppState>,
    index: Arc<dyn MarketIndex>,
) -> Result<Trader> {
    let wallet: Arc<dyn Wallet> = if config.system.dry_run {
        Arc::new(DryRunWallet::new(env.wallet_address.clone()))
    } else {
        let signer = env
            .signer_url
            .as_deref()
            .context("NEREUS_SIGNER_URL must be set when dry_run is disabled")?;
        Arc::new(RelayWallet::new(signer, env.wallet_address.clone(), config.network.request_timeout())?)
    };

    let mut trader = Trader::new(state, index, wallet, config.packages.clone(), config.liquidity.clone());
    if config.monitoring.csv_logging {
        trader = trader.with_journal(CsvLogger::new(config.monitoring.csv_log_path.clone())?);
    }
    Ok(trader)
}

async fn load_market(state: &AppState, index: &dyn MarketIndex, address: &str) -> Result<Market> {
    state.refresh_markets(index).await?;
    state
        .market(address)
        .with_context(|| format!("Market {} not found", address))
}

fn order_flow(market: Market, args: &OrderArgs) -> Result<TradeFlow> {
    let mut flow = TradeFlow::new(market);
    if !flow.select_side(args.side) {
        bail!("Market {} has ended", flow.market().address);
    }
    if let Some(limit) = &args.limit {
        flow.set_order_type(OrderType::Limit);
        flow.set_limit_price(limit);
    }
    flow.set_quantity(&args.quantity);
    Ok(flow)
}

fn print_estimate(flow: &TradeFlow) -> Result<()> {
    let estimate = flow.estimate().context("No side selected")?;

    println!("{} {} on {}", estimate.order_type, side_label(estimate.side), flow.market().topic);
    println!("  Price/share: {}", estimate.price_display());
    println!("  Quantity:    {}", estimate.quantity_display());
    println!("  Total:       {}", estimate.total);
    if let Some(hint) = estimate.limit_price_hint {
        println!("  {}", hint);
    }
    if !estimate.can_submit() {
        bail!("Order is not complete");
    }
    Ok(())
}

fn side_label(side: Option<Side>) -> String {
    side.map(|s| s.to_string()).unwrap_or_default()
}

fn print_markets(markets: &[Market]) {
    let now = Utc::now();
    for market in markets {
        let (yes_pct, no_pct) = market_percentages(market);
        let trading = if controls(market, now).trading { "" } else { "  [closed]" };
        println!(
            "{}  {}{}\n    {}  YES {}% / NO {}%  pool {}  {}",
            short_address(&market.address),
            market.topic,
            trading,
            format_current_prices(market),
            yes_pct,
            no_pct,
            format_pool(market.balance),
            format_countdown(market.end_time, now)
        );
    }
}

async fn run_chat(
    api: Arc<ChatClient>,
    market: &str,
    send: Option<String>,
    follow: bool,
    config: &Config,
    env: &EnvConfig,
) -> Result<()> {
    let session = ChatSession::start(api, market, config.chat.polling_interval());

    if let Some(text) = send {
        session.send(env.wallet_address.as_deref(), &text).await?;
    }
    session.refresh().await?;

    let mut shown = print_new_messages(&session, 0).await;
    if !follow {
        return Ok(());
    }

    let mut ticker = tokio::time::interval(config.chat.polling_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                shown = print_new_messages(&session, shown).await;
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}

async fn print_new_messages(session: &ChatSession, shown: usize) -> usize {
    let messages = session.messages().await;
    for message in messages.iter().skip(shown) {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            short_address(&message.address),
            message.message
        );
    }
    messages.len().max(shown)
}
