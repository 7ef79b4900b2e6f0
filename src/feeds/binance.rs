//! WebSocket ingress for the Binance combined partial-depth stream.
//!
//! Owns the evaluator and drives it synchronously from the read loop: a
//! decoded tick goes straight into `Server::on_update` with nothing queued
//! in between. Reconnects keep the same parameters and the same evaluator
//! state.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::engine::server::Server;
use crate::types::{OrderBookTick, PriceLevel};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const MAX_CONSECUTIVE_CONNECT_FAILURES: u32 = 10;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("giving up after {0} consecutive failed connection attempts")]
    ReconnectsExhausted(u32),
}

/// Connects to the combined depth stream and pumps ticks into the evaluator
/// until the peer closes gracefully (Ok) or too many consecutive connection
/// attempts fail (Err). Read errors and reconnect gaps are absorbed here;
/// the evaluator only ever sees well-formed ticks.
pub async fn binance_feed(mut server: Server, stream_target: String) -> Result<(), FeedError> {
    let mut backoff_ms: u64 = 1000;
    let mut failed_connects: u32 = 0;

    loop {
        eprintln!("[FEED] Connecting to {}", stream_target);

        let connect = tokio::time::timeout(
            tokio::time::Duration::from_secs(CONNECT_TIMEOUT_SECS),
            connect_async(&stream_target),
        )
        .await;

        let ws = match connect {
            Ok(Ok((ws, _))) => {
                eprintln!("[FEED] Connected");
                backoff_ms = 1000;
                failed_connects = 0;
                ws
            }
            Ok(Err(e)) => {
                failed_connects += 1;
                if failed_connects >= MAX_CONSECUTIVE_CONNECT_FAILURES {
                    return Err(FeedError::ReconnectsExhausted(failed_connects));
                }
                eprintln!("[FEED] Connect failed: {}, retrying in {}ms", e, backoff_ms);
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(10_000);
                continue;
            }
            Err(_) => {
                failed_connects += 1;
                if failed_connects >= MAX_CONSECUTIVE_CONNECT_FAILURES {
                    return Err(FeedError::ReconnectsExhausted(failed_connects));
                }
                eprintln!(
                    "[FEED] Connect timed out after {}s, retrying in {}ms",
                    CONNECT_TIMEOUT_SECS, backoff_ms
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(10_000);
                continue;
            }
        };

        let (mut write, mut read) = ws.split();

        while let Some(msg) = read.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("[FEED] WS error: {}, reconnecting", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let tick_init_time =
                        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
                    match parse_depth_message(&text, tick_init_time) {
                        Some(tick) => server.on_update(tick),
                        None => eprintln!("[FEED] Dropping malformed message"),
                    }
                }
                Message::Ping(payload) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Message::Close(_) => {
                    eprintln!("[FEED] Connection closed gracefully");
                    return Ok(());
                }
                _ => {}
            }
        }

        eprintln!("[FEED] Disconnected, reconnecting in {}ms", backoff_ms);
        tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
        backoff_ms = (backoff_ms * 2).min(10_000);
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Combined-stream envelope: `{"stream": "<symbol>@depth<N>@<interval>ms",
/// "data": {...}}`.
#[derive(serde::Deserialize)]
struct StreamEnvelope {
    stream: String,
    data: DepthData,
}

#[derive(serde::Deserialize)]
struct DepthData {
    #[serde(rename = "lastUpdateId")]
    last_update_id: u64,
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

/// Decodes one combined-stream depth message. The symbol is the stream name
/// up to the first '@'; levels arrive as `[price, quantity]` string pairs in
/// the book's natural order (bids descending, asks ascending), which is
/// trusted as-is. Returns None on any malformed field.
fn parse_depth_message(text: &str, tick_init_time: i64) -> Option<OrderBookTick> {
    let envelope: StreamEnvelope = serde_json::from_str(text).ok()?;

    let symbol = envelope.stream.split('@').next()?;
    if symbol.is_empty() {
        return None;
    }

    Some(OrderBookTick {
        symbol: symbol.to_string(),
        update_id: envelope.data.last_update_id,
        bids: parse_levels(&envelope.data.bids)?,
        asks: parse_levels(&envelope.data.asks)?,
        tick_init_time,
        raw_payload: text.to_string(),
    })
}

fn parse_levels(raw: &[[String; 2]]) -> Option<Vec<PriceLevel>> {
    raw.iter()
        .map(|[price, quantity]| {
            Some(PriceLevel::new(
                price.parse().ok()?,
                quantity.parse().ok()?,
            ))
        })
        .collect()
}
