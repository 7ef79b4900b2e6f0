//! Append-only result output. One JSON object per line, full f64 precision.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use crate::types::ArbitrageResult;

/// One-way sink for evaluation output. Called inline from the evaluator, so
/// implementations must not block beyond a buffered write.
pub trait ResultSink {
    fn write(&mut self, result: &ArbitrageResult);
}

/// Appends one serialized result per line to a file. A failed write is
/// logged and answered with a single reopen-and-retry; if that also fails
/// the record is dropped and the next write tries again.
pub struct ResultWriter {
    path: String,
    file: Option<BufWriter<File>>,
}

impl ResultWriter {
    pub fn open(path: &str) -> std::io::Result<Self> {
        let file = Self::open_appender(path)?;
        Ok(Self {
            path: path.to_string(),
            file: Some(file),
        })
    }

    fn open_appender(path: &str) -> std::io::Result<BufWriter<File>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => writeln!(file, "{line}"),
            None => Err(std::io::Error::other("sink file not open")),
        }
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl ResultSink for ResultWriter {
    fn write(&mut self, result: &ArbitrageResult) {
        let line = match serde_json::to_string(result) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("[SINK] Encode failed: {e}, dropping record");
                return;
            }
        };

        if self.write_line(&line).is_ok() {
            return;
        }

        eprintln!("[SINK] Write failed, reopening {}", self.path);
        match Self::open_appender(&self.path) {
            Ok(file) => {
                self.file = Some(file);
                if let Err(e) = self.write_line(&line) {
                    eprintln!("[SINK] Retry failed: {e}, dropping record");
                }
            }
            Err(e) => {
                self.file = None;
                eprintln!("[SINK] Reopen failed: {e}, dropping record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, pnl: f64) -> ArbitrageResult {
        ArbitrageResult {
            symbol: symbol.to_string(),
            raw_payload: "{\"stream\":\"btcusdt@depth5@100ms\"}".to_string(),
            tick_init_time: 1_609_459_200_000_000_000,
            process_time: 1_609_459_200_000_001_234,
            unrealised_pnl: pnl,
            traded_notional: 3.9976446695521055,
            bottleneck_leg: "ethusdt".to_string(),
            is_opportunity: pnl > 0.0,
            rates: [99.0, 1.0 / 3742.12, 0.03171],
        }
    }

    /// Scenario: two results written, writer dropped (flushing the buffer),
    /// file read back.
    /// Expected: two JSON lines whose f64 fields round-trip bit-exactly.
    #[test]
    fn test_writes_one_json_line_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let path = path.to_str().unwrap();

        let mut writer = ResultWriter::open(path).unwrap();
        writer.write(&result("btcusdt", -0.001));
        writer.write(&result("ethbtc", 0.0025));
        drop(writer);

        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["symbol"], "btcusdt");
        assert_eq!(first["bottleneck_leg"], "ethusdt");
        assert_eq!(first["is_opportunity"], false);
        assert_eq!(
            first["traded_notional"].as_f64().unwrap(),
            3.9976446695521055
        );
        assert_eq!(first["rates"][1].as_f64().unwrap(), 1.0 / 3742.12);
        assert_eq!(first["tick_init_time"].as_i64().unwrap(), 1_609_459_200_000_000_000);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["symbol"], "ethbtc");
        assert_eq!(second["is_opportunity"], true);
    }

    /// Scenario: the writer reopened against a file that already has a line.
    /// Expected: append mode preserves the existing record.
    #[test]
    fn test_open_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let path = path.to_str().unwrap();

        let mut writer = ResultWriter::open(path).unwrap();
        writer.write(&result("btcusdt", 0.0));
        drop(writer);

        let mut writer = ResultWriter::open(path).unwrap();
        writer.write(&result("ethusdt", 0.0));
        drop(writer);

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
