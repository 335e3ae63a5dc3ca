//! Demo price simulation
//!
//! Perturbs real quotes by up to ±1% so a dashboard polled every few seconds
//! visibly ticks even when the provider returns the same snapshot.

use super::FeedMessage;
use crate::models::{now_timestamp, Quote};
use rand::Rng;

/// Largest relative move applied to a price
pub const MAX_PRICE_MOVE: f64 = 0.01;

/// Uniform factor in `[-MAX_PRICE_MOVE, MAX_PRICE_MOVE]`
pub fn random_factor() -> f64 {
    rand::thread_rng().gen_range(-MAX_PRICE_MOVE..=MAX_PRICE_MOVE)
}

pub fn simulate_price_change(base_price: f64, factor: f64) -> f64 {
    base_price * (1.0 + factor)
}

/// Apply `factor` to the price and recompute change against the untouched
/// previous close. The timestamp is restamped to now.
pub fn perturb_quote(quote: &Quote, factor: f64) -> Quote {
    let price = simulate_price_change(quote.price, factor).max(0.0);
    let change = price - quote.previous_close;
    let change_percent = if quote.previous_close != 0.0 {
        change / quote.previous_close * 100.0
    } else {
        0.0
    };

    Quote {
        price,
        change,
        change_percent,
        timestamp: now_timestamp(),
        ..quote.clone()
    }
}

/// Perturb quote messages; everything else passes through unchanged
pub fn simulate_message(message: FeedMessage) -> FeedMessage {
    match message {
        FeedMessage::Quote { symbol, data } => FeedMessage::Quote {
            symbol,
            data: perturb_quote(&data, random_factor()),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            price: 150.0,
            change: 2.5,
            change_percent: 1.69,
            volume: 50_000_000,
            high: 152.0,
            low: 148.0,
            open: 149.0,
            previous_close: 147.5,
            timestamp: "2025-01-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_perturb_recomputes_change() {
        let perturbed = perturb_quote(&quote(), 0.01);
        assert!((perturbed.price - 151.5).abs() < 1e-9);
        assert!((perturbed.change - 4.0).abs() < 1e-9);
        assert!((perturbed.change_percent - 4.0 / 147.5 * 100.0).abs() < 1e-9);
        assert_eq!(perturbed.previous_close, 147.5);
        assert_eq!(perturbed.volume, 50_000_000);
        assert_ne!(perturbed.timestamp, "2025-01-01T12:00:00Z");
    }

    #[test]
    fn test_random_factor_bounds() {
        for _ in 0..1000 {
            let factor = random_factor();
            assert!((-MAX_PRICE_MOVE..=MAX_PRICE_MOVE).contains(&factor));
        }
    }

    #[test]
    fn test_zero_previous_close() {
        let mut base = quote();
        base.previous_close = 0.0;
        let perturbed = perturb_quote(&base, 0.005);
        assert_eq!(perturbed.change_percent, 0.0);
        assert!(perturbed.change_percent.is_finite());
    }

    #[test]
    fn test_error_passes_through() {
        let message = FeedMessage::Error {
            symbol: "AAPL".into(),
            message: "boom".into(),
        };
        assert_eq!(simulate_message(message.clone()), message);
    }

    #[test]
    fn test_quote_message_keeps_symbol() {
        let message = simulate_message(FeedMessage::Quote {
            symbol: "AAPL".into(),
            data: quote(),
        });
        match message {
            FeedMessage::Quote { symbol, data } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(data.symbol, "AAPL");
                assert!((data.price - 150.0).abs() <= 1.5 + 1e-9);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
