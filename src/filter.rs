//! Stock list filtering and sorting

use crate::models::Stock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Price,
    Change,
    Volume,
    #[default]
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// View-side filter over stock summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    pub sector: Option<String>,
    pub price_range: Option<Range>,
    pub volume_range: Option<Range>,
    pub change_range: Option<Range>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl StockFilter {
    /// Sorted copy of `stocks` keeping only rows inside every set bound.
    ///
    /// The sector bound only applies to rows that carry a sector.
    pub fn apply(&self, stocks: &[Stock]) -> Vec<Stock> {
        let mut sorted = stocks.to_vec();
        sorted.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        sorted.retain(|stock| self.matches(stock));
        sorted
    }

    pub fn matches(&self, stock: &Stock) -> bool {
        let in_range =
            |range: &Option<Range>, value: f64| range.map_or(true, |r| r.contains(value));

        let sector_ok = match (&self.sector, &stock.sector) {
            (Some(wanted), Some(sector)) => wanted.eq_ignore_ascii_case(sector),
            _ => true,
        };

        sector_ok
            && in_range(&self.price_range, stock.price)
            && in_range(&self.volume_range, stock.volume as f64)
            && in_range(&self.change_range, stock.change_percent)
    }

    fn compare(&self, a: &Stock, b: &Stock) -> Ordering {
        match self.sort_by {
            SortBy::Price => a.price.total_cmp(&b.price),
            SortBy::Change => a.change_percent.total_cmp(&b.change_percent),
            SortBy::Volume => a.volume.cmp(&b.volume),
            SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}
