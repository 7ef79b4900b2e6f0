use binance_triarb::config::Config;
use binance_triarb::engine::server::{Server, ServerConfig};
use binance_triarb::feeds::binance::binance_feed;
use binance_triarb::telemetry::writer::{ResultSink, ResultWriter};
use binance_triarb::types::ArbitragePath;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = Config::from_env();

    let path = match ArbitragePath::parse(&config.arbitrage_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[CONFIG] Invalid arbitrage path {:?}: {}", config.arbitrage_path, e);
            std::process::exit(1);
        }
    };
    let stream_target = config.stream_target(&path);

    eprintln!("╔══════════════════════════════════════════════════╗");
    eprintln!("║  Triangular Arbitrage Monitor");
    eprintln!(
        "║  Path: {} → {}",
        path.start_currency,
        path.legs
            .iter()
            .map(|l| format!(
                "{}:{}",
                l.symbol,
                if l.requires_inversion { "SELL" } else { "BUY" }
            ))
            .collect::<Vec<_>>()
            .join(","),
    );
    eprintln!(
        "║  Threshold: {} | Fee/leg: {} | Haircut: {:.0}%",
        config.profit_threshold,
        config.taker_fee,
        config.max_starting_notional_fraction * 100.0,
    );
    eprintln!(
        "║  Bottleneck: {} | Recalc every {} tick(s)",
        if config.use_first_level_only { "first level" } else { "full depth" },
        config.max_starting_notional_recalc_interval.max(1),
    );
    eprintln!("╚══════════════════════════════════════════════════╝");

    let sink: Option<Box<dyn ResultSink>> = match &config.result_sink_path {
        Some(sink_path) => match ResultWriter::open(sink_path) {
            Ok(writer) => {
                eprintln!("[MAIN] Appending results to {}", sink_path);
                Some(Box::new(writer))
            }
            Err(e) => {
                eprintln!("[MAIN] Cannot open result sink {}: {}", sink_path, e);
                std::process::exit(1);
            }
        },
        None => {
            eprintln!("[MAIN] No result sink configured, results are not persisted");
            None
        }
    };

    let server_config = ServerConfig::new(
        config.profit_threshold,
        config.taker_fee,
        config.max_starting_notional_fraction,
        config.max_starting_notional_recalc_interval,
        config.use_first_level_only,
    );
    let server = Server::new(path, server_config, sink);

    if let Err(e) = binance_feed(server, stream_target).await {
        eprintln!("[MAIN] Feed terminated: {}", e);
        std::process::exit(1);
    }
}
