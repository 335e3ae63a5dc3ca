//! Upstream provider module
//!
//! The `Upstream` trait is the single seam through which market data leaves
//! the process. `HttpUpstream` is the production transport; tests swap in
//! in-memory implementations.

pub mod alpha_vantage;
mod http;

pub use http::HttpUpstream;

use crate::error::Result;
use crate::models::ChartInterval;
use async_trait::async_trait;
use serde_json::Value;

/// One provider call, described by its query parameters (minus the api key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamRequest {
    SymbolSearch { keywords: String },
    GlobalQuote { symbol: String },
    TimeSeries { symbol: String, interval: ChartInterval },
    Overview { symbol: String },
}

impl UpstreamRequest {
    /// Value of the provider's `function` parameter
    pub fn function(&self) -> &'static str {
        match self {
            UpstreamRequest::SymbolSearch { .. } => "SYMBOL_SEARCH",
            UpstreamRequest::GlobalQuote { .. } => "GLOBAL_QUOTE",
            UpstreamRequest::TimeSeries { interval, .. } => match interval {
                ChartInterval::Daily => "TIME_SERIES_DAILY",
                ChartInterval::Weekly => "TIME_SERIES_WEEKLY",
                ChartInterval::Monthly => "TIME_SERIES_MONTHLY",
            },
            UpstreamRequest::Overview { .. } => "OVERVIEW",
        }
    }

    /// Query parameters in the order they are sent
    pub fn query_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("function", self.function())];
        match self {
            UpstreamRequest::SymbolSearch { keywords } => {
                params.push(("keywords", keywords.as_str()))
            }
            UpstreamRequest::GlobalQuote { symbol }
            | UpstreamRequest::TimeSeries { symbol, .. }
            | UpstreamRequest::Overview { symbol } => params.push(("symbol", symbol.as_str())),
        }
        params
    }

    /// Cache key for the response to this request
    pub fn cache_key(&self) -> String {
        match self {
            UpstreamRequest::SymbolSearch { keywords } => format!("search_{}", keywords),
            UpstreamRequest::GlobalQuote { symbol } => format!("quote_{}", symbol),
            UpstreamRequest::TimeSeries { symbol, interval } => {
                format!("chart_{}_{}", symbol, interval)
            }
            UpstreamRequest::Overview { symbol } => format!("overview_{}", symbol),
        }
    }
}

/// Transport that all provider implementations must implement
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Provider ID used in logs
    fn id(&self) -> &'static str;

    /// Perform the call and return the decoded JSON body.
    ///
    /// Only transport-level failures (connectivity, non-2xx, undecodable
    /// body) are errors here; embedded provider errors are left in the body.
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value>;
}
