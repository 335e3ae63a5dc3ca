//! Alpha Vantage wire format
//!
//! The provider returns every number as a string, under numbered keys such as
//! `"05. price"`. Key names here are a compatibility boundary and must match
//! what the provider sends byte for byte.

use crate::error::{AppError, Result};
use crate::models::{ChartInterval, ChartPoint, Overview, Quote, SearchMatch};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

const ERROR_MESSAGE_KEY: &str = "Error Message";
const NOTE_KEY: &str = "Note";
const INFORMATION_KEY: &str = "Information";
const GLOBAL_QUOTE_KEY: &str = "Global Quote";
const BEST_MATCHES_KEY: &str = "bestMatches";

/// Key holding the bar map for each chart interval
pub fn time_series_key(interval: ChartInterval) -> &'static str {
    match interval {
        ChartInterval::Daily => "Time Series (Daily)",
        ChartInterval::Weekly => "Weekly Time Series",
        ChartInterval::Monthly => "Monthly Time Series",
    }
}

/// Reject bodies that carry an embedded error or rate-limit notice.
///
/// An explicit error message wins over a rate-limit note when both appear.
pub fn check_body(body: &Value) -> Result<()> {
    if let Some(message) = non_empty_str(body.get(ERROR_MESSAGE_KEY)) {
        return Err(AppError::Upstream(message.to_string()));
    }
    let notice = [NOTE_KEY, INFORMATION_KEY]
        .iter()
        .any(|key| non_empty_str(body.get(*key)).is_some());
    if notice {
        return Err(AppError::RateLimited);
    }
    Ok(())
}

pub fn parse_search(body: &Value) -> Vec<SearchMatch> {
    let Some(matches) = body.get(BEST_MATCHES_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    matches
        .iter()
        .filter_map(Value::as_object)
        .map(|m| {
            let f = Fields(m);
            SearchMatch {
                symbol: f.text("1. symbol"),
                name: f.text("2. name"),
                kind: f.text("3. type"),
                region: f.text("4. region"),
                market_open: f.text("5. marketOpen"),
                market_close: f.text("6. marketClose"),
                timezone: f.text("7. timezone"),
                currency: f.text("8. currency"),
                match_score: f.float("9. matchScore").clamp(0.0, 1.0),
            }
        })
        .collect()
}

/// Parse a `GLOBAL_QUOTE` body. `symbol` fills in when the block omits it.
pub fn parse_quote(body: &Value, symbol: &str) -> Result<Quote> {
    let block = body
        .get(GLOBAL_QUOTE_KEY)
        .and_then(Value::as_object)
        .filter(|block| !block.is_empty())
        .ok_or_else(|| AppError::NoData("No quote data available".to_string()))?;

    let f = Fields(block);
    let reported = f.text("01. symbol");
    Ok(Quote {
        symbol: if reported.is_empty() { symbol.to_string() } else { reported },
        price: f.float("05. price").max(0.0),
        change: f.float("09. change"),
        change_percent: f.percent("10. change percent"),
        volume: f.int("06. volume"),
        high: f.float("03. high"),
        low: f.float("04. low"),
        open: f.float("02. open"),
        previous_close: f.float("08. previous close"),
        timestamp: f.text("07. latest trading day"),
    })
}

/// Parse a time series body into bars sorted ascending by timestamp
pub fn parse_chart(body: &Value, interval: ChartInterval) -> Result<Vec<ChartPoint>> {
    let series = body
        .get(time_series_key(interval))
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::NoData("No chart data available".to_string()))?;

    let mut points: Vec<ChartPoint> = series
        .iter()
        .filter_map(|(timestamp, bar)| {
            let f = Fields(bar.as_object()?);
            Some(ChartPoint {
                timestamp: timestamp.clone(),
                open: f.float("1. open"),
                high: f.float("2. high"),
                low: f.float("3. low"),
                close: f.float("4. close"),
                volume: f.int("5. volume"),
            })
        })
        .collect();

    points.sort_by_cached_key(|p| (parse_bar_time(&p.timestamp), p.timestamp.clone()));
    Ok(points)
}

pub fn parse_overview(body: &Value) -> Result<Overview> {
    let no_data = || AppError::NoData("No overview data available".to_string());
    let object = body.as_object().ok_or_else(no_data)?;
    let f = Fields(object);

    let symbol = f.text("Symbol");
    if symbol.is_empty() {
        return Err(no_data());
    }

    Ok(Overview {
        symbol,
        name: f.text("Name"),
        description: f.text("Description"),
        sector: f.text("Sector"),
        industry: f.text("Industry"),
        market_cap: f.int("MarketCapitalization"),
        pe_ratio: f.float("PERatio"),
        peg_ratio: f.float("PEGRatio"),
        book_value: f.float("BookValue"),
        dividend_per_share: f.float("DividendPerShare"),
        dividend_yield: f.float("DividendYield"),
        eps: f.float("EPS"),
        revenue_per_share_ttm: f.float("RevenuePerShareTTM"),
        profit_margin: f.float("ProfitMargin"),
        operating_margin_ttm: f.float("OperatingMarginTTM"),
        return_on_assets_ttm: f.float("ReturnOnAssetsTTM"),
        return_on_equity_ttm: f.float("ReturnOnEquityTTM"),
        revenue_ttm: f.float("RevenueTTM"),
        gross_profit_ttm: f.float("GrossProfitTTM"),
        diluted_eps_ttm: f.float("DilutedEPSTTM"),
        quarterly_earnings_growth_yoy: f.float("QuarterlyEarningsGrowthYOY"),
        quarterly_revenue_growth_yoy: f.float("QuarterlyRevenueGrowthYOY"),
        analyst_target_price: f.float("AnalystTargetPrice"),
        trailing_pe: f.float("TrailingPE"),
        forward_pe: f.float("ForwardPE"),
        price_to_sales_ratio_ttm: f.float("PriceToSalesRatioTTM"),
        price_to_book_ratio: f.float("PriceToBookRatio"),
        ev_to_revenue: f.float("EVToRevenue"),
        ev_to_ebitda: f.float("EVToEBITDA"),
        beta: f.float("Beta"),
        week52_high: f.float("52WeekHigh"),
        week52_low: f.float("52WeekLow"),
        day50_moving_average: f.float("50DayMovingAverage"),
        day200_moving_average: f.float("200DayMovingAverage"),
        shares_outstanding: f.int("SharesOutstanding"),
        shares_float: f.int("SharesFloat"),
        shares_short: f.int("SharesShort"),
        shares_short_prior_month: f.int("SharesShortPriorMonth"),
        short_ratio: f.float("ShortRatio"),
        short_percent_outstanding: f.float("ShortPercentOutstanding"),
        short_percent_float: f.float("ShortPercentFloat"),
        percent_insiders: f.float("PercentInsiders"),
        percent_institutions: f.float("PercentInstitutions"),
        forward_annual_dividend_rate: f.float("ForwardAnnualDividendRate"),
        forward_annual_dividend_yield: f.float("ForwardAnnualDividendYield"),
        payout_ratio: f.float("PayoutRatio"),
        dividend_date: f.text("DividendDate"),
        ex_dividend_date: f.text("ExDividendDate"),
        last_split_factor: f.text("LastSplitFactor"),
        last_split_date: f.text("LastSplitDate"),
    })
}

/// Lenient field access over one provider object
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    fn float(&self, key: &str) -> f64 {
        match self.0.get(key) {
            Some(Value::String(s)) => parse_f64(s),
            Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn int(&self, key: &str) -> i64 {
        match self.0.get(key) {
            Some(Value::String(s)) => parse_i64(s),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|v| v as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    fn percent(&self, key: &str) -> f64 {
        match self.0.get(key) {
            Some(Value::String(s)) => parse_percent(s),
            _ => self.float(key),
        }
    }
}

/// Parse a provider decimal; anything unparseable (including "None") is 0
pub fn parse_f64(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse a provider integer, truncating decimals; unparseable is 0
pub fn parse_i64(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        })
        .unwrap_or(0)
}

/// Parse a percentage such as `"1.69%"`
pub fn parse_percent(raw: &str) -> f64 {
    let raw = raw.trim();
    parse_f64(raw.strip_suffix('%').unwrap_or(raw))
}

fn parse_bar_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}
