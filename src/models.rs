//! Typed market data records
//!
//! These are the shapes handed to the view layer. Field names serialize in
//! camelCase to match what the dashboard consumes.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current time as an RFC 3339 string with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Latest trade snapshot for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: i64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub timestamp: String,
}

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Bar period for chart requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartInterval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl ChartInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartInterval::Daily => "daily",
            ChartInterval::Weekly => "weekly",
            ChartInterval::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ChartInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChartInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(ChartInterval::Daily),
            "weekly" => Ok(ChartInterval::Weekly),
            "monthly" => Ok(ChartInterval::Monthly),
            other => Err(format!("Unknown chart interval: {}", other)),
        }
    }
}

/// Symbol search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub region: String,
    pub market_open: String,
    pub market_close: String,
    pub timezone: String,
    pub currency: String,
    /// Always within `[0, 1]`
    pub match_score: f64,
}

/// Company fundamentals
///
/// Absent or unparseable provider fields are `0` / empty, never missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: i64,
    pub pe_ratio: f64,
    pub peg_ratio: f64,
    pub book_value: f64,
    pub dividend_per_share: f64,
    pub dividend_yield: f64,
    pub eps: f64,
    #[serde(rename = "revenuePerShareTTM")]
    pub revenue_per_share_ttm: f64,
    pub profit_margin: f64,
    #[serde(rename = "operatingMarginTTM")]
    pub operating_margin_ttm: f64,
    #[serde(rename = "returnOnAssetsTTM")]
    pub return_on_assets_ttm: f64,
    #[serde(rename = "returnOnEquityTTM")]
    pub return_on_equity_ttm: f64,
    #[serde(rename = "revenueTTM")]
    pub revenue_ttm: f64,
    #[serde(rename = "grossProfitTTM")]
    pub gross_profit_ttm: f64,
    #[serde(rename = "dilutedEPSTTM")]
    pub diluted_eps_ttm: f64,
    #[serde(rename = "quarterlyEarningsGrowthYOY")]
    pub quarterly_earnings_growth_yoy: f64,
    #[serde(rename = "quarterlyRevenueGrowthYOY")]
    pub quarterly_revenue_growth_yoy: f64,
    pub analyst_target_price: f64,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: f64,
    #[serde(rename = "forwardPE")]
    pub forward_pe: f64,
    #[serde(rename = "priceToSalesRatioTTM")]
    pub price_to_sales_ratio_ttm: f64,
    pub price_to_book_ratio: f64,
    pub ev_to_revenue: f64,
    pub ev_to_ebitda: f64,
    pub beta: f64,
    pub week52_high: f64,
    pub week52_low: f64,
    pub day50_moving_average: f64,
    pub day200_moving_average: f64,
    pub shares_outstanding: i64,
    pub shares_float: i64,
    pub shares_short: i64,
    pub shares_short_prior_month: i64,
    pub short_ratio: f64,
    pub short_percent_outstanding: f64,
    pub short_percent_float: f64,
    pub percent_insiders: f64,
    pub percent_institutions: f64,
    pub forward_annual_dividend_rate: f64,
    pub forward_annual_dividend_yield: f64,
    pub payout_ratio: f64,
    pub dividend_date: String,
    pub ex_dividend_date: String,
    pub last_split_factor: String,
    pub last_split_date: String,
}

/// List-row summary used by the popular and search views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub last_update: String,
}

impl Stock {
    /// Summary named after its own symbol
    pub fn from_quote(quote: &Quote) -> Self {
        Self::named(quote.symbol.clone(), quote.symbol.clone(), quote)
    }

    /// Row listed under `symbol` and `name`, priced from `quote`
    pub fn named(symbol: impl Into<String>, name: impl Into<String>, quote: &Quote) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
            market_cap: None,
            sector: None,
            industry: None,
            last_update: quote.timestamp.clone(),
        }
    }

    /// Placeholder row for a symbol whose quote could not be fetched
    pub fn unpriced(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            volume: 0,
            market_cap: None,
            sector: None,
            industry: None,
            last_update: now_timestamp(),
        }
    }

    /// Refresh price fields from a newer quote for the same symbol.
    /// Returns false (and leaves the row untouched) on a symbol mismatch.
    pub fn apply_quote(&mut self, quote: &Quote) -> bool {
        if self.symbol != quote.symbol {
            return false;
        }
        self.price = quote.price;
        self.change = quote.change;
        self.change_percent = quote.change_percent;
        self.volume = quote.volume;
        self.last_update = quote.timestamp.clone();
        true
    }
}

/// Uniform result envelope returned by every gateway operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            timestamp: now_timestamp(),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            timestamp: now_timestamp(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    /// Collapse into a std `Result`, keeping the error text
    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Err("No data available".to_string()),
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Error envelope for list-returning calls: empty list instead of null
    pub fn err_empty(error: impl Into<String>) -> Self {
        Self {
            data: Some(Vec::new()),
            error: Some(error.into()),
            timestamp: now_timestamp(),
        }
    }
}
