use serde::Serialize;
use thiserror::Error;

// ─── Order Book ──────────────────────────────────────────────────────────────

/// Available liquidity at one price on one side of a book.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

impl PriceLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

/// Latest depth snapshot for one symbol, as decoded from the stream.
/// Bids are price-descending, asks price-ascending; feed order is trusted.
#[derive(Clone, Debug)]
pub struct OrderBookTick {
    pub symbol: String,
    /// Monotonic exchange update id. Informational only; ticks are applied
    /// last-writer-wins without staleness checks.
    pub update_id: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    /// Nanoseconds since epoch, stamped at receipt by the ingress.
    pub tick_init_time: i64,
    /// Verbatim message text, carried through to the result sink.
    pub raw_payload: String,
}

impl OrderBookTick {
    #[inline]
    pub fn best_bid_price(&self) -> f64 {
        self.bids.first().map_or(0.0, |l| l.price)
    }

    #[inline]
    pub fn best_bid_qty(&self) -> f64 {
        self.bids.first().map_or(0.0, |l| l.quantity)
    }

    #[inline]
    pub fn best_ask_price(&self) -> f64 {
        self.asks.first().map_or(0.0, |l| l.price)
    }

    #[inline]
    pub fn best_ask_qty(&self) -> f64 {
        self.asks.first().map_or(0.0, |l| l.quantity)
    }
}

// ─── Arbitrage Path ──────────────────────────────────────────────────────────

/// One conversion in the three-leg cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeLeg {
    pub symbol: String,
    /// True when the leg converts the pair's quote currency into its base
    /// (a buy): walk the asks and invert the quote-per-base VWAP.
    /// False when it converts base into quote (a sell): walk the bids.
    pub requires_inversion: bool,
}

impl TradeLeg {
    pub fn new(symbol: &str, requires_inversion: bool) -> Self {
        Self {
            symbol: symbol.to_string(),
            requires_inversion,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PathParseError {
    #[error("missing start currency delimiter ':'")]
    MissingStartDelimiter,
    #[error("invalid leg segment: {0}")]
    InvalidLeg(String),
    #[error("invalid action in leg: {0}")]
    InvalidAction(String),
    #[error("expected exactly 3 legs, got {0}")]
    WrongLegCount(usize),
}

/// A fixed three-leg cycle: leg k's output currency is leg k+1's input, and
/// leg 3 closes back to `start_currency`. Immutable for the process lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct ArbitragePath {
    pub start_currency: String,
    pub legs: [TradeLeg; 3],
}

impl ArbitragePath {
    /// Parses the textual form `start:sym1:ACTION,sym2:ACTION,sym3:ACTION`
    /// with ACTION ∈ {BUY, SELL}, e.g. `btc:btcusdt:BUY,ethusdt:SELL,ethbtc:BUY`.
    ///
    /// BUY maps to a non-inverted leg, SELL to an inverted one.
    pub fn parse(s: &str) -> Result<Self, PathParseError> {
        let (start, legs_str) = s
            .split_once(':')
            .ok_or(PathParseError::MissingStartDelimiter)?;

        let mut legs: Vec<TradeLeg> = Vec::with_capacity(3);
        for segment in legs_str.split(',') {
            if segment.is_empty() {
                continue;
            }
            let last_colon = match segment.rfind(':') {
                Some(0) | None => {
                    return Err(PathParseError::InvalidLeg(segment.to_string()))
                }
                Some(i) => i,
            };
            let symbol = &segment[..last_colon];
            let action = &segment[last_colon + 1..];

            let requires_inversion = match action {
                "SELL" => true,
                "BUY" => false,
                other => return Err(PathParseError::InvalidAction(other.to_string())),
            };
            legs.push(TradeLeg::new(symbol, requires_inversion));
        }

        let legs: [TradeLeg; 3] = legs
            .try_into()
            .map_err(|v: Vec<TradeLeg>| PathParseError::WrongLegCount(v.len()))?;

        Ok(Self {
            start_currency: start.to_string(),
            legs,
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.legs.iter().map(|l| l.symbol.as_str())
    }
}

// ─── Evaluation Output ───────────────────────────────────────────────────────

/// The largest starting amount all three legs can jointly absorb, and the
/// leg that saturates first. Ordered by notional only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StartingNotional {
    pub notional: f64,
    pub bottleneck_leg: String,
}

impl StartingNotional {
    pub fn new(notional: f64, bottleneck_leg: &str) -> Self {
        Self {
            notional,
            bottleneck_leg: bottleneck_leg.to_string(),
        }
    }
}

/// One line of output per evaluated tick.
#[derive(Clone, Debug, Serialize)]
pub struct ArbitrageResult {
    pub symbol: String,
    pub raw_payload: String,
    pub tick_init_time: i64,
    /// Nanoseconds since epoch, stamped when evaluation of the tick finished.
    pub process_time: i64,
    pub unrealised_pnl: f64,
    pub traded_notional: f64,
    pub bottleneck_leg: String,
    pub is_opportunity: bool,
    /// Effective per-leg conversion rates, in path order.
    pub rates: [f64; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario: the canonical btc→eth→btc cycle string.
    /// Expected: start currency "btc", BUY legs non-inverted, SELL leg inverted.
    #[test]
    fn test_parse_path_valid() {
        let path = ArbitragePath::parse("btc:btcusdt:BUY,ethusdt:SELL,ethbtc:BUY").unwrap();
        assert_eq!(path.start_currency, "btc");
        assert_eq!(path.legs[0], TradeLeg::new("btcusdt", false));
        assert_eq!(path.legs[1], TradeLeg::new("ethusdt", true));
        assert_eq!(path.legs[2], TradeLeg::new("ethbtc", false));
    }

    /// Scenario: no ':' anywhere in the string.
    /// Expected: MissingStartDelimiter.
    #[test]
    fn test_parse_path_missing_start_delimiter() {
        assert_eq!(
            ArbitragePath::parse("btcusdt,ethusdt,ethbtc"),
            Err(PathParseError::MissingStartDelimiter)
        );
    }

    /// Scenario: a leg segment without its own ':' separator.
    /// Expected: InvalidLeg naming the offending segment.
    #[test]
    fn test_parse_path_invalid_leg_segment() {
        assert_eq!(
            ArbitragePath::parse("btc:btcusdt:BUY,ethusdt,ethbtc:BUY"),
            Err(PathParseError::InvalidLeg("ethusdt".to_string()))
        );
    }

    /// Scenario: an action other than BUY or SELL.
    /// Expected: InvalidAction with the unknown action.
    #[test]
    fn test_parse_path_invalid_action() {
        assert_eq!(
            ArbitragePath::parse("btc:btcusdt:BUY,ethusdt:HOLD,ethbtc:BUY"),
            Err(PathParseError::InvalidAction("HOLD".to_string()))
        );
    }

    /// Scenario: only two legs supplied.
    /// Expected: WrongLegCount(2).
    #[test]
    fn test_parse_path_wrong_leg_count() {
        assert_eq!(
            ArbitragePath::parse("btc:btcusdt:BUY,ethusdt:SELL"),
            Err(PathParseError::WrongLegCount(2))
        );
    }

    /// Scenario: trailing comma producing an empty segment.
    /// Expected: empty segments are skipped, the three real legs still parse.
    #[test]
    fn test_parse_path_trailing_comma() {
        let path = ArbitragePath::parse("btc:btcusdt:BUY,ethusdt:SELL,ethbtc:BUY,").unwrap();
        assert_eq!(path.legs.len(), 3);
    }

    /// Scenario: best-of-book accessors on a tick with empty sides.
    /// Expected: all return 0.0 rather than panicking.
    #[test]
    fn test_empty_tick_best_levels() {
        let tick = OrderBookTick {
            symbol: "btcusdt".to_string(),
            update_id: 0,
            bids: vec![],
            asks: vec![],
            tick_init_time: 0,
            raw_payload: String::new(),
        };
        assert_eq!(tick.best_bid_price(), 0.0);
        assert_eq!(tick.best_bid_qty(), 0.0);
        assert_eq!(tick.best_ask_price(), 0.0);
        assert_eq!(tick.best_ask_qty(), 0.0);
    }
}
