use crate::types::ArbitragePath;

const DEFAULT_ARBITRAGE_PATH: &str = "btc:btcusdt:BUY,ethusdt:SELL,ethbtc:BUY";
const BINANCE_STREAM_BASE: &str = "wss://stream.binance.com:9443/stream";

/// Configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// Textual path, parsed into an [`ArbitragePath`] at startup.
    pub arbitrage_path: String,
    /// Explicit stream URL; when unset one is derived from the path.
    pub stream_target: Option<String>,

    // Evaluation
    pub profit_threshold: f64,
    pub taker_fee: f64,
    pub max_starting_notional_fraction: f64,
    pub max_starting_notional_recalc_interval: u64,
    pub use_first_level_only: bool,

    /// Append results here; no sink is attached when unset or empty.
    pub result_sink_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            arbitrage_path: std::env::var("ARBITRAGE_PATH")
                .unwrap_or_else(|_| DEFAULT_ARBITRAGE_PATH.into()),
            stream_target: std::env::var("STREAM_TARGET").ok().filter(|s| !s.is_empty()),
            profit_threshold: std::env::var("PROFIT_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0001),
            taker_fee: std::env::var("TAKER_FEE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            max_starting_notional_fraction: std::env::var("MAX_STARTING_NOTIONAL_FRACTION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.8),
            max_starting_notional_recalc_interval: std::env::var(
                "MAX_STARTING_NOTIONAL_RECALC_INTERVAL",
            )
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
            use_first_level_only: std::env::var("USE_FIRST_LEVEL_ONLY")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(true),
            result_sink_path: std::env::var("RESULT_SINK_PATH")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// The stream URL to connect to: the explicit override, or the combined
    /// depth5@100ms stream over the path's three symbols.
    pub fn stream_target(&self, path: &ArbitragePath) -> String {
        self.stream_target.clone().unwrap_or_else(|| {
            let streams: Vec<String> = path
                .symbols()
                .map(|s| format!("{s}@depth5@100ms"))
                .collect();
            format!("{}?streams={}", BINANCE_STREAM_BASE, streams.join("/"))
        })
    }
}
