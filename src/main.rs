//! stock-watch: print live quotes for a set of symbols

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use stock_feed::{init_tracing, FeedMessage, GatewayConfig, PollerConfig, QuotePoller, StockGateway};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Poll Alpha Vantage quotes and print them as they arrive")]
struct Cli {
    /// Ticker symbols to watch
    #[arg(default_values = ["AAPL", "MSFT"])]
    symbols: Vec<String>,

    /// Polling interval in milliseconds (floored at 1000)
    #[arg(long, default_value_t = 3000)]
    interval_ms: u64,

    /// Jitter each delivered quote by up to ±1%
    #[arg(long)]
    simulate: bool,

    /// Print the popular stocks snapshot before polling
    #[arg(long)]
    popular: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = GatewayConfig::from_env()?;
    info!("Using {} (cache ttl {:?})", config.base_url, config.cache_ttl);
    let gateway = Arc::new(StockGateway::new(&config)?);

    if cli.popular {
        match gateway.get_popular_stocks().await.into_result() {
            Ok(stocks) => {
                for stock in stocks {
                    println!(
                        "{:<6} {:>10.2} {:>+8.2} ({:>+6.2}%)",
                        stock.symbol, stock.price, stock.change, stock.change_percent
                    );
                }
            }
            Err(e) => warn!("Popular stocks unavailable: {}", e),
        }
    }

    let poller = QuotePoller::with_config(
        gateway.clone(),
        PollerConfig::new(Duration::from_millis(cli.interval_ms)),
    );
    poller.subscribe_to_connection_status(|status| {
        info!(
            "Feed {} (last connected: {})",
            if status.connected { "connected" } else { "disconnected" },
            status.last_connected.as_deref().unwrap_or("never")
        );
    });

    for symbol in cli.symbols {
        let symbol = symbol.trim().to_uppercase();
        if cli.simulate {
            poller.subscribe_with_simulation(symbol, print_message);
        } else {
            poller.subscribe(symbol, print_message);
        }
    }

    match cli.duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c().await?,
    }

    poller.disconnect();
    Ok(())
}

fn print_message(message: FeedMessage) {
    match message {
        FeedMessage::Quote { symbol, data } => println!(
            "{} {:<6} {:>10.2} {:>+8.2} ({:>+6.2}%) vol {}",
            data.timestamp, symbol, data.price, data.change, data.change_percent, data.volume
        ),
        FeedMessage::Error { symbol, message } => warn!("{}: {}", symbol, message),
    }
}
