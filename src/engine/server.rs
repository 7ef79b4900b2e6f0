//! Tick-driven evaluator. One instance owns the book cache, the cached
//! bottleneck and the recalc counter; the ingress drives it synchronously,
//! so no state is shared and nothing locks.

use std::collections::HashMap;

use crate::engine::calculator::{
    effective_rate, starting_notional_first_level, starting_notional_full_depth,
};
use crate::telemetry::writer::ResultSink;
use crate::types::{ArbitragePath, ArbitrageResult, OrderBookTick, StartingNotional};

/// Immutable evaluation parameters, fixed at startup.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Fractional profit margin a tick must clear to count as an opportunity.
    /// Stored raw; the `1 + threshold` offset is applied at compare time.
    pub profit_threshold: f64,
    /// Survival factor after three taker fees: `(1 - fee)^3`.
    pub fee_multiplier: f64,
    /// Safety haircut applied to the bottleneck notional, in (0, 1].
    pub max_starting_notional_fraction: f64,
    /// Ticks between bottleneck recomputations; 0 recomputes on every tick.
    pub max_starting_notional_recalc_interval: u64,
    /// Use the top-of-book bottleneck estimate instead of full depth.
    pub use_first_level_only: bool,
}

impl ServerConfig {
    pub fn new(
        profit_threshold: f64,
        taker_fee: f64,
        max_starting_notional_fraction: f64,
        max_starting_notional_recalc_interval: u64,
        use_first_level_only: bool,
    ) -> Self {
        Self {
            profit_threshold,
            fee_multiplier: (1.0 - taker_fee).powi(3),
            max_starting_notional_fraction,
            max_starting_notional_recalc_interval,
            use_first_level_only,
        }
    }
}

/// The evaluator. Warms up until all three path symbols have a cached book,
/// then emits one result per tick (unless a leg runs dry).
pub struct Server {
    path: ArbitragePath,
    config: ServerConfig,
    books: HashMap<String, OrderBookTick>,
    starting_notional: StartingNotional,
    ticks_remaining_before_recalc: u64,
    current_notional: f64,
    sink: Option<Box<dyn ResultSink>>,
}

impl Server {
    pub fn new(path: ArbitragePath, config: ServerConfig, sink: Option<Box<dyn ResultSink>>) -> Self {
        Self {
            path,
            config,
            books: HashMap::with_capacity(3),
            starting_notional: StartingNotional::default(),
            ticks_remaining_before_recalc: 0,
            current_notional: 0.0,
            sink,
        }
    }

    /// Ingest one depth update and evaluate the cycle against the latest
    /// books. Runs to completion without suspending; the caller must not
    /// deliver ticks concurrently.
    pub fn on_update(&mut self, update: OrderBookTick) {
        let symbol = update.symbol.clone();
        let tick_init_time = update.tick_init_time;
        self.books.insert(symbol.clone(), update);

        // Still warming: evaluate only once every leg has a book.
        if !self.path.symbols().all(|s| self.books.contains_key(s)) {
            return;
        }

        self.recalc_starting_notional();

        let initial_notional =
            self.starting_notional.notional * self.config.max_starting_notional_fraction;
        let mut notional = initial_notional;
        let mut rates = [0.0f64; 3];

        for (i, leg) in self.path.legs.iter().enumerate() {
            let Some(leg_tick) = self.books.get(&leg.symbol) else {
                return;
            };
            let rate = effective_rate(leg, leg_tick, notional);

            // A dry leg means the bottleneck estimate is stale; skip this
            // tick and let the next recalc correct it.
            if rate <= 0.0 {
                return;
            }

            rates[i] = rate;
            notional *= rate;
        }

        notional *= self.config.fee_multiplier;

        let unrealised_pnl = notional - initial_notional;

        let mut is_opportunity = false;
        if notional >= initial_notional * (1.0 + self.config.profit_threshold) {
            self.current_notional = notional;
            is_opportunity = true;
        }

        let process_time = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let raw_payload = self
            .books
            .get(&symbol)
            .map(|t| t.raw_payload.clone())
            .unwrap_or_default();

        let result = ArbitrageResult {
            symbol,
            raw_payload,
            tick_init_time,
            process_time,
            unrealised_pnl,
            traded_notional: initial_notional,
            bottleneck_leg: self.starting_notional.bottleneck_leg.clone(),
            is_opportunity,
            rates,
        };

        if let Some(sink) = self.sink.as_mut() {
            sink.write(&result);
        }
    }

    /// Counter-gated bottleneck refresh. Interval 0 recomputes on every tick;
    /// otherwise one recomputation per `interval` ticks.
    fn recalc_starting_notional(&mut self) {
        if self.ticks_remaining_before_recalc == 0 {
            self.ticks_remaining_before_recalc = self.config.max_starting_notional_recalc_interval;
            self.starting_notional = if self.config.use_first_level_only {
                starting_notional_first_level(&self.path, &self.books)
            } else {
                starting_notional_full_depth(&self.path, &self.books)
            };
        } else {
            self.ticks_remaining_before_recalc -= 1;
        }
    }

    /// Final notional of the last tick classified as an opportunity.
    pub fn current_notional(&self) -> f64 {
        self.current_notional
    }
}
