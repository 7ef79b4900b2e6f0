//! Liquidity walking for the three-leg cycle.
//!
//! Two VWAP kernels (bid side consumes base quantity, ask side consumes quote
//! notional), the per-leg rate dispatch, and the two bottleneck calculators
//! (full-depth and first-level-only).

use std::collections::HashMap;

use crate::types::{ArbitragePath, OrderBookTick, PriceLevel, StartingNotional, TradeLeg};

// ─── VWAP kernels ────────────────────────────────────────────────────────────

/// Average execution price for selling `desired_quantity` of base into the
/// bids, walking levels in book order. Returns 0.0 when the input is
/// non-positive or cumulative depth cannot fill it.
pub fn vwap_bid(levels: &[PriceLevel], desired_quantity: f64) -> f64 {
    if desired_quantity <= 0.0 {
        return 0.0;
    }

    let mut total_price_x_quantity = 0.0;
    let mut total_quantity_filled = 0.0;
    let mut remaining = desired_quantity;

    for level in levels {
        if remaining <= 0.0 {
            break;
        }
        let fill = level.quantity.min(remaining);
        total_price_x_quantity += level.price * fill;
        total_quantity_filled += fill;
        remaining -= fill;
    }

    let epsilon = f64::EPSILON * desired_quantity;
    if desired_quantity - total_quantity_filled > epsilon || total_quantity_filled <= 0.0 {
        return 0.0;
    }

    total_price_x_quantity / total_quantity_filled
}

/// Average execution price for spending `quote_notional` into the asks.
/// Whole levels are swept while affordable; the last level is partially
/// bought at `remaining / price`. Returns 0.0 when the input is non-positive
/// or the notional cannot be fully spent.
pub fn vwap_ask(levels: &[PriceLevel], quote_notional: f64) -> f64 {
    if quote_notional <= 0.0 {
        return 0.0;
    }

    let epsilon = f64::EPSILON * quote_notional;

    let mut total_base_acquired = 0.0;
    let mut quote_spent = 0.0;
    let mut remaining = quote_notional;

    for level in levels {
        let cost_to_sweep = level.price * level.quantity;

        if remaining >= cost_to_sweep {
            total_base_acquired += level.quantity;
            quote_spent += cost_to_sweep;
            remaining -= cost_to_sweep;
        } else {
            total_base_acquired += remaining / level.price;
            quote_spent += remaining;
            remaining = 0.0;
            break;
        }

        if remaining <= epsilon {
            remaining = 0.0;
            break;
        }
    }

    if total_base_acquired > 0.0 && remaining <= epsilon {
        quote_spent / total_base_acquired
    } else {
        0.0
    }
}

// ─── Leg rate ────────────────────────────────────────────────────────────────

/// Effective conversion rate for pushing `notional_in` (denominated in the
/// previous leg's output currency) through one leg of the cycle.
///
/// Inverted legs buy base with quote: VWAP over the asks, reciprocal taken so
/// the rate is base-per-quote. Non-inverted legs sell base into the bids and
/// use the quote-per-base VWAP directly. Multiplying `notional_in` by the
/// returned rate yields the notional in the leg's output currency; 0.0 means
/// the leg cannot absorb the flow.
pub fn effective_rate(leg: &TradeLeg, tick: &OrderBookTick, notional_in: f64) -> f64 {
    if notional_in <= 0.0 || tick.bids.is_empty() || tick.asks.is_empty() {
        return 0.0;
    }

    if leg.requires_inversion {
        let quote_per_base = vwap_ask(&tick.asks, notional_in);
        if quote_per_base > 0.0 {
            1.0 / quote_per_base
        } else {
            0.0
        }
    } else {
        vwap_bid(&tick.bids, notional_in)
    }
}

// ─── Starting-notional calculators ───────────────────────────────────────────

/// Sum over one book side: base quantities, or quote values (price × qty).
fn book_side_value(levels: &[PriceLevel], sum_base_quantity: bool) -> f64 {
    if sum_base_quantity {
        levels.iter().map(|l| l.quantity).sum()
    } else {
        levels.iter().map(|l| l.price * l.quantity).sum()
    }
}

/// Smallest of the three candidates; earlier legs win ties.
fn min_of(candidates: [StartingNotional; 3]) -> StartingNotional {
    let [first, second, third] = candidates;
    let mut min = first;
    for candidate in [second, third] {
        if candidate.notional < min.notional {
            min = candidate;
        }
    }
    min
}

/// Maximum starting notional the whole book depth can absorb, expressed in
/// the path's starting currency, with the saturating leg identified.
///
/// Leg 1's capacity is its total quote value when inverted (the starting
/// currency sits on the quote side) or its total base quantity otherwise.
/// Leg 2's capacity is measured in the intermediate currency and translated
/// back through leg 1's effective VWAP: multiplied when leg 1 was a buy
/// (the intermediate currency is the coin), divided when it was a sell.
/// Leg 3 closes the cycle, so its side sum is already in the starting
/// currency and needs no translation.
pub fn starting_notional_full_depth(
    path: &ArbitragePath,
    books: &HashMap<String, OrderBookTick>,
) -> StartingNotional {
    let [leg1, leg2, leg3] = &path.legs;
    let (Some(tick1), Some(tick2), Some(tick3)) = (
        books.get(&leg1.symbol),
        books.get(&leg2.symbol),
        books.get(&leg3.symbol),
    ) else {
        return StartingNotional::default();
    };

    // Leg 1: one pass yields both sums; their ratio is the leg's effective
    // VWAP, reused below for leg 2's translation.
    let levels1 = if leg1.requires_inversion {
        &tick1.asks
    } else {
        &tick1.bids
    };
    let mut total_quote_value_1 = 0.0;
    let mut total_base_qty_1 = 0.0;
    for level in levels1 {
        total_quote_value_1 += level.price * level.quantity;
        total_base_qty_1 += level.quantity;
    }
    let first_leg_value = if leg1.requires_inversion {
        total_quote_value_1
    } else {
        total_base_qty_1
    };

    // Leg 2, in the intermediate currency.
    let levels2 = if leg2.requires_inversion {
        &tick2.asks
    } else {
        &tick2.bids
    };
    let second_leg_intermediate = book_side_value(levels2, !leg2.requires_inversion);

    let effective_price_leg1 = if total_base_qty_1 > 0.0 {
        total_quote_value_1 / total_base_qty_1
    } else {
        0.0
    };
    let second_leg_value = if leg1.requires_inversion {
        second_leg_intermediate * effective_price_leg1
    } else if effective_price_leg1 > 0.0 {
        second_leg_intermediate / effective_price_leg1
    } else {
        0.0
    };

    // Leg 3: base sum when inverted (output is the pair's base, the starting
    // currency), quote sum otherwise.
    let levels3 = if leg3.requires_inversion {
        &tick3.asks
    } else {
        &tick3.bids
    };
    let third_leg_value = book_side_value(levels3, leg3.requires_inversion);

    min_of([
        StartingNotional::new(first_leg_value, &leg1.symbol),
        StartingNotional::new(second_leg_value, &leg2.symbol),
        StartingNotional::new(third_leg_value, &leg3.symbol),
    ])
}

/// Cheap variant of [`starting_notional_full_depth`] that looks only at the
/// top level of each book. Same algebra per leg, suitable for recomputation
/// on every tick. Agrees with the full-depth mode on one-level books.
pub fn starting_notional_first_level(
    path: &ArbitragePath,
    books: &HashMap<String, OrderBookTick>,
) -> StartingNotional {
    let [leg1, leg2, leg3] = &path.legs;
    let (Some(tick1), Some(tick2), Some(tick3)) = (
        books.get(&leg1.symbol),
        books.get(&leg2.symbol),
        books.get(&leg3.symbol),
    ) else {
        return StartingNotional::default();
    };

    let first_leg_value = if leg1.requires_inversion {
        tick1.best_ask_qty() * tick1.best_ask_price()
    } else {
        tick1.best_bid_qty()
    };

    let second_leg_intermediate = if leg2.requires_inversion {
        tick2.best_ask_qty() * tick2.best_ask_price()
    } else {
        tick2.best_bid_qty()
    };
    let second_leg_value = if leg1.requires_inversion {
        second_leg_intermediate * tick1.best_ask_price()
    } else if tick1.best_bid_price() > 0.0 {
        second_leg_intermediate / tick1.best_bid_price()
    } else {
        0.0
    };

    let third_leg_value = if leg3.requires_inversion {
        tick3.best_ask_qty()
    } else {
        tick3.best_bid_qty() * tick3.best_bid_price()
    };

    min_of([
        StartingNotional::new(first_leg_value, &leg1.symbol),
        StartingNotional::new(second_leg_value, &leg2.symbol),
        StartingNotional::new(third_leg_value, &leg3.symbol),
    ])
}
