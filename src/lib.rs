//! Stock Feed - Market Data Acquisition
//!
//! A cached gateway in front of the Alpha Vantage API plus a polling
//! subscription service that pushes fresh quotes to per-symbol callbacks.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod poller;
pub mod provider;
pub mod rate_limiter;

pub use config::{GatewayConfig, PollerConfig};
pub use error::{AppError, Result};
pub use filter::{SortBy, SortOrder, StockFilter};
pub use gateway::StockGateway;
pub use models::{ApiResponse, ChartInterval, ChartPoint, Overview, Quote, SearchMatch, Stock};
pub use poller::{ConnectionStatus, FeedMessage, QuotePoller, QuoteSource};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` when set. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_feed=debug,stock_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
